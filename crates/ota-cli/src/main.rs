//! `ota-rollout` binary
//!
//! Logs go to stderr; stdout carries only the JSON result.

use anyhow::Context;
use ota_cli::{cli, execute, Invocation, JsonFileChannelStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let invocation = Invocation::from_matches(&matches)?;
    init_tracing(invocation.verbose);

    tracing::debug!(
        store = %invocation.store.display(),
        channel = %invocation.channel,
        "running command"
    );

    let mut store = JsonFileChannelStore::new(&invocation.store);
    let output = execute(&mut store, &invocation)?;
    let rendered = serde_json::to_string_pretty(&output).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

//! Command-line surface and command execution
//!
//! Every command reads one channel from a [`ChannelStore`], works on its
//! branch mapping and reports JSON. Mutations print the update payload and
//! only persist it when asked to.

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use ota_channel::{BranchMappingUpdate, ChannelStore, UpdateChannel};
use ota_rollout::{
    edit_legacy_rollout, edit_rtv_constrained_rollout_for_runtime_version, end_rollout,
    get_rollout, get_rollout_info_from_branch_mapping,
    insert_constrained_rollout_branch_mapping_for_runtime_version, is_rollout,
    is_unconstrained_rollout, remove_constrained_rollout_for_runtime_version,
    ConstrainedRolloutInsertion, Percent, RolloutOutcome,
};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Parsed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Channel file backing the store
    pub store: PathBuf,
    /// Name of the channel to work on
    pub channel: String,
    /// Persist mutations back to the store
    pub write: bool,
    /// Emit debug logging
    pub verbose: bool,
    /// What to do
    pub command: RolloutCommand,
}

/// Operation on a channel's rollout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloutCommand {
    /// Report which rollout dialect, if any, the channel carries
    Classify,
    /// Report the composed rollout
    Info,
    /// Add a runtime-version-scoped rollout
    Insert(ConstrainedRolloutInsertion),
    /// Change the percent of an existing rollout
    Edit {
        /// New percent
        percent: Percent,
        /// Constrained rollout to edit; the unconstrained one when absent
        runtime_version: Option<String>,
    },
    /// End an unconstrained rollout
    End(RolloutOutcome),
    /// Drop the constrained rollout for one runtime version
    Remove {
        /// Runtime version whose entry is dropped
        runtime_version: String,
    },
}

fn channel_arg() -> Arg {
    Arg::new("channel")
        .required(true)
        .help("Name of the channel to operate on")
}

fn percent_arg() -> Arg {
    Arg::new("percent")
        .long("percent")
        .required(true)
        .value_parser(value_parser!(Percent))
        .help("Integer percent of clients routed to the rolled-out branch (0-100)")
}

fn runtime_version_arg() -> Arg {
    Arg::new("runtime-version")
        .long("runtime-version")
        .help("Runtime version the rollout is scoped to")
}

/// Command-line definition of the `ota-rollout` binary
#[must_use]
pub fn cli() -> Command {
    Command::new("ota-rollout")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect and edit branch-mapping rollouts of update channels")
        .subcommand_required(true)
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .default_value("channels.json")
                .value_parser(value_parser!(PathBuf))
                .help("JSON file holding the channel records"),
        )
        .arg(
            Arg::new("write")
                .long("write")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Persist the edited branch mapping back to the store"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging on stderr"),
        )
        .subcommand(
            Command::new("classify")
                .about("Report whether the channel carries a rollout")
                .arg(channel_arg()),
        )
        .subcommand(
            Command::new("info")
                .about("Show the rollout joined with its branches")
                .arg(channel_arg()),
        )
        .subcommand(
            Command::new("insert")
                .about("Add a rollout scoped to one runtime version")
                .arg(channel_arg())
                .arg(
                    Arg::new("branch")
                        .long("branch")
                        .required(true)
                        .help("Id of the branch to roll out"),
                )
                .arg(percent_arg())
                .arg(runtime_version_arg().required(true)),
        )
        .subcommand(
            Command::new("edit")
                .about("Change the rollout percent")
                .arg(channel_arg())
                .arg(percent_arg())
                .arg(runtime_version_arg()),
        )
        .subcommand(
            Command::new("end")
                .about("End a rollout, or drop the one scoped to a runtime version")
                .arg(channel_arg())
                .arg(
                    Arg::new("outcome")
                        .long("outcome")
                        .value_parser(["revert", "promote"])
                        .default_value("revert")
                        .help(
                            "Route everyone to the default (revert) or rolled-out (promote) branch",
                        ),
                )
                .arg(runtime_version_arg().conflicts_with("outcome")),
        )
}

fn required<'a>(args: &'a ArgMatches, id: &str) -> anyhow::Result<&'a String> {
    args.get_one::<String>(id)
        .with_context(|| format!("missing argument '{id}'"))
}

fn percent(args: &ArgMatches) -> anyhow::Result<Percent> {
    args.get_one::<Percent>("percent")
        .copied()
        .context("missing argument 'percent'")
}

impl Invocation {
    /// Build an invocation from parsed matches of [`cli`]
    ///
    /// # Errors
    /// Returns an error if a required argument is absent.
    pub fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let Some((name, args)) = matches.subcommand() else {
            bail!("no subcommand given");
        };
        let command = match name {
            "classify" => RolloutCommand::Classify,
            "info" => RolloutCommand::Info,
            "insert" => RolloutCommand::Insert(ConstrainedRolloutInsertion::new(
                required(args, "branch")?.clone(),
                percent(args)?,
                required(args, "runtime-version")?.clone(),
            )),
            "edit" => RolloutCommand::Edit {
                percent: percent(args)?,
                runtime_version: args.get_one::<String>("runtime-version").cloned(),
            },
            "end" => match args.get_one::<String>("runtime-version") {
                Some(runtime_version) => RolloutCommand::Remove {
                    runtime_version: runtime_version.clone(),
                },
                None => RolloutCommand::End(match required(args, "outcome")?.as_str() {
                    "promote" => RolloutOutcome::PromoteRolledOut,
                    _ => RolloutOutcome::RevertToDefault,
                }),
            },
            other => bail!("unknown subcommand '{other}'"),
        };

        Ok(Self {
            store: args
                .get_one::<PathBuf>("store")
                .cloned()
                .context("missing argument 'store'")?,
            channel: required(args, "channel")?.clone(),
            write: args.get_flag("write"),
            verbose: args.get_flag("verbose"),
            command,
        })
    }
}

fn classify(channel: &UpdateChannel) -> anyhow::Result<Value> {
    let mapping = channel.parsed_branch_mapping()?;
    let runtime_versions = if is_rollout(&mapping) {
        get_rollout_info_from_branch_mapping(&mapping)?
            .runtime_versions()
            .into_iter()
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };
    Ok(json!({
        "channel": channel.name,
        "isRollout": is_rollout(&mapping),
        "unconstrained": is_unconstrained_rollout(&mapping),
        "runtimeVersions": runtime_versions,
    }))
}

fn edited_mapping(
    channel: &UpdateChannel,
    command: &RolloutCommand,
) -> anyhow::Result<ota_branch_mapping::BranchMapping> {
    let mapping = channel.parsed_branch_mapping()?;
    let edited = match command {
        RolloutCommand::Insert(insertion) => {
            insert_constrained_rollout_branch_mapping_for_runtime_version(&mapping, insertion)?
        }
        RolloutCommand::Edit {
            percent,
            runtime_version: Some(runtime_version),
        } => edit_rtv_constrained_rollout_for_runtime_version(&mapping, runtime_version, *percent)?,
        RolloutCommand::Edit {
            percent,
            runtime_version: None,
        } => edit_legacy_rollout(&mapping, *percent)?,
        RolloutCommand::End(outcome) => end_rollout(&mapping, *outcome)?,
        RolloutCommand::Remove { runtime_version } => {
            remove_constrained_rollout_for_runtime_version(&mapping, runtime_version)?
        }
        RolloutCommand::Classify | RolloutCommand::Info => {
            bail!("{command:?} does not edit the branch mapping")
        }
    };
    Ok(edited)
}

/// Run one command against the store
///
/// # Errors
/// Returns store failures and branch-mapping validation failures unchanged.
pub fn execute<S>(store: &mut S, invocation: &Invocation) -> anyhow::Result<Value>
where
    S: ChannelStore,
{
    let channel = store
        .fetch_channel(&invocation.channel)
        .with_context(|| format!("failed to fetch channel '{}'", invocation.channel))?;

    match &invocation.command {
        RolloutCommand::Classify => classify(&channel),
        RolloutCommand::Info => Ok(serde_json::to_value(get_rollout(&channel)?)?),
        command => {
            let mapping = edited_mapping(&channel, command)?;
            let update = BranchMappingUpdate::new(channel.id.clone(), &mapping)?;
            if invocation.write {
                store
                    .update_branch_mapping(&update)
                    .with_context(|| format!("failed to update channel '{}'", channel.name))?;
            }
            Ok(json!({ "update": update, "written": invocation.write }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> anyhow::Result<Invocation> {
        let matches = cli().try_get_matches_from(args)?;
        Invocation::from_matches(&matches)
    }

    #[test]
    fn parses_insert() {
        let invocation = parse(&[
            "ota-rollout",
            "--store",
            "c.json",
            "insert",
            "production",
            "--branch",
            "B2",
            "--percent",
            "10",
            "--runtime-version",
            "1.0.0",
        ])
        .unwrap();
        assert_eq!(invocation.store, PathBuf::from("c.json"));
        assert_eq!(invocation.channel, "production");
        assert!(!invocation.write);
        assert_eq!(
            invocation.command,
            RolloutCommand::Insert(ConstrainedRolloutInsertion::new(
                "B2",
                Percent::new(10).unwrap(),
                "1.0.0"
            ))
        );
    }

    #[test]
    fn rejects_fractional_and_out_of_range_percent() {
        for bad in ["0.1", "101", "-1"] {
            assert!(
                parse(&["ota-rollout", "edit", "production", "--percent", bad]).is_err(),
                "{bad}"
            );
        }
    }

    #[test]
    fn parses_end_outcome_and_global_flags() {
        let invocation = parse(&[
            "ota-rollout",
            "end",
            "production",
            "--outcome",
            "promote",
            "--write",
            "-v",
        ])
        .unwrap();
        assert_eq!(
            invocation.command,
            RolloutCommand::End(RolloutOutcome::PromoteRolledOut)
        );
        assert!(invocation.write);
        assert!(invocation.verbose);
        assert_eq!(invocation.store, PathBuf::from("channels.json"));
    }

    #[test]
    fn end_with_runtime_version_removes_constrained_entry() {
        let invocation = parse(&[
            "ota-rollout",
            "end",
            "production",
            "--runtime-version",
            "1.0.0",
        ])
        .unwrap();
        assert_eq!(
            invocation.command,
            RolloutCommand::Remove {
                runtime_version: "1.0.0".into()
            }
        );
    }

    #[test]
    fn edit_without_runtime_version_is_legacy() {
        let invocation = parse(&["ota-rollout", "edit", "production", "--percent", "40"]).unwrap();
        assert_eq!(
            invocation.command,
            RolloutCommand::Edit {
                percent: Percent::new(40).unwrap(),
                runtime_version: None
            }
        );
    }
}

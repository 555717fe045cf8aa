//! Commands executed against a channel file on disk

use ota_branch_mapping::{get_always_true_branch_mapping, BranchMapping};
use ota_channel::{ChannelStore, UpdateChannel};
use ota_cli::{cli, execute, Invocation, JsonFileChannelStore, StoreError};
use ota_rollout::{get_rollout_info_from_branch_mapping, is_rollout};
use ota_test_utils::{channel_with, unconstrained_rollout_mapping};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn store_with(dir: &TempDir, channels: &[UpdateChannel]) -> JsonFileChannelStore {
    let path = dir.path().join("channels.json");
    std::fs::write(&path, serde_json::to_string(channels).unwrap()).unwrap();
    JsonFileChannelStore::new(path)
}

fn invocation(store: &Path, args: &[&str]) -> Invocation {
    let store = store.to_str().unwrap();
    let mut argv = vec!["ota-rollout", "--store", store];
    argv.extend_from_slice(args);
    Invocation::from_matches(&cli().try_get_matches_from(argv).unwrap()).unwrap()
}

fn stored_mapping(store: &JsonFileChannelStore) -> BranchMapping {
    store
        .fetch_channel("production")
        .unwrap()
        .parsed_branch_mapping()
        .unwrap()
}

#[test]
fn classify_reports_unconstrained_rollout() {
    let dir = TempDir::new().unwrap();
    let mapping = unconstrained_rollout_mapping("B2", 0.15, "B1");
    let mut store = store_with(&dir, &[channel_with(&mapping, &["B1", "B2"])]);

    let command = invocation(store.path(), &["classify", "production"]);
    let output = execute(&mut store, &command).unwrap();
    assert_eq!(
        output,
        json!({
            "channel": "production",
            "isRollout": true,
            "unconstrained": true,
            "runtimeVersions": [],
        })
    );
}

#[test]
fn info_composes_branches() {
    let dir = TempDir::new().unwrap();
    let mapping = unconstrained_rollout_mapping("B2", 0.15, "B1");
    let mut store = store_with(&dir, &[channel_with(&mapping, &["B1", "B2"])]);

    let command = invocation(store.path(), &["info", "production"]);
    let output = execute(&mut store, &command).unwrap();
    assert_eq!(output["percentRolledOut"], 15);
    assert_eq!(output["rolledOutBranch"]["name"], "branch-B2");
    assert_eq!(output["defaultBranch"]["id"], "B1");
}

#[test]
fn insert_without_write_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let base = get_always_true_branch_mapping("B1");
    let mut store = store_with(&dir, &[channel_with(&base, &["B1", "B2"])]);

    let args = [
        "insert",
        "production",
        "--branch",
        "B2",
        "--percent",
        "10",
        "--runtime-version",
        "1.0.0",
    ];
    let command = invocation(store.path(), &args);
    let output = execute(&mut store, &command).unwrap();

    assert_eq!(output["written"], false);
    assert_eq!(output["update"]["channelId"], "channel-1");
    let raw = output["update"]["branchMapping"].as_str().unwrap();
    let proposed = BranchMapping::parse(raw).unwrap();
    assert_eq!(proposed.len(), 2);
    assert!(is_rollout(&proposed));

    assert_eq!(stored_mapping(&store), base);
}

#[test]
fn insert_edit_end_with_write_persists_each_step() {
    let dir = TempDir::new().unwrap();
    let mut store = store_with(
        &dir,
        &[channel_with(&get_always_true_branch_mapping("B1"), &["B1", "B2", "B3"])],
    );
    let path = store.path().to_path_buf();

    let steps: [&[&str]; 3] = [
        &[
            "insert",
            "production",
            "--branch",
            "B2",
            "--percent",
            "10",
            "--runtime-version",
            "1.0.0",
            "--write",
        ],
        &[
            "insert",
            "production",
            "--branch",
            "B3",
            "--percent",
            "50",
            "--runtime-version",
            "2.0.0",
            "--write",
        ],
        &[
            "edit",
            "production",
            "--percent",
            "25",
            "--runtime-version",
            "1.0.0",
            "--write",
        ],
    ];
    for args in steps {
        let output = execute(&mut store, &invocation(&path, args)).unwrap();
        assert_eq!(output["written"], true);
    }

    let info = get_rollout_info_from_branch_mapping(&stored_mapping(&store)).unwrap();
    assert_eq!(info.runtime_versions(), vec!["2.0.0", "1.0.0"]);
    assert_eq!(info.for_runtime_version("1.0.0").unwrap().percent_rolled_out.get(), 25);
    assert_eq!(info.for_runtime_version("2.0.0").unwrap().percent_rolled_out.get(), 50);

    execute(
        &mut store,
        &invocation(&path, &["end", "production", "--runtime-version", "2.0.0", "--write"]),
    )
    .unwrap();
    let info = get_rollout_info_from_branch_mapping(&stored_mapping(&store)).unwrap();
    assert_eq!(info.runtime_versions(), vec!["1.0.0"]);
}

#[test]
fn promote_collapses_to_rolled_out_branch() {
    let dir = TempDir::new().unwrap();
    let mapping = unconstrained_rollout_mapping("B2", 0.4, "B1");
    let mut store = store_with(&dir, &[channel_with(&mapping, &["B1", "B2"])]);
    let path = store.path().to_path_buf();

    execute(
        &mut store,
        &invocation(&path, &["end", "production", "--outcome", "promote", "--write"]),
    )
    .unwrap();
    assert_eq!(stored_mapping(&store), get_always_true_branch_mapping("B2"));
}

#[test]
fn editing_a_non_rollout_fails() {
    let dir = TempDir::new().unwrap();
    let mut store = store_with(
        &dir,
        &[channel_with(&get_always_true_branch_mapping("B1"), &["B1"])],
    );
    let path = store.path().to_path_buf();

    let edit = invocation(&path, &["edit", "production", "--percent", "20"]);
    assert!(execute(&mut store, &edit).is_err());
    let info = invocation(&path, &["info", "production"]);
    assert!(execute(&mut store, &info).is_err());
}

#[test]
fn unknown_channel_is_reported() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&dir, &[]);

    let err = store.fetch_channel("staging").unwrap_err();
    assert!(matches!(err, StoreError::ChannelNotFound(name) if name == "staging"));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileChannelStore::new(dir.path().join("absent.json"));

    assert!(matches!(
        store.fetch_channel("production"),
        Err(StoreError::Io { .. })
    ));
}

//! Testing utilities for OTA workspace
//!
//! Shared fixtures: canonical rollout nodes and mappings, branch and channel
//! records.

#![allow(missing_docs)]

use ota_branch_mapping::{
    always_true, and_statement, equals_operator, hash_lt_operator, BranchMapping,
    BranchMappingEntry, BranchMappingNode, BranchMappingOperator, BranchMappingPredicate,
    ROLLOUT_TOKEN_KEY, RUNTIME_VERSION_KEY,
};
use ota_channel::{UpdateBranch, UpdateChannel};

pub fn rollout_token_predicate(
    operator: BranchMappingOperator,
    fraction: f64,
) -> BranchMappingNode {
    BranchMappingPredicate::new(ROLLOUT_TOKEN_KEY, operator, fraction).into()
}

pub fn rollout_predicate(fraction: f64) -> BranchMappingNode {
    rollout_token_predicate(hash_lt_operator(), fraction)
}

pub fn runtime_version_predicate(runtime_version: &str) -> BranchMappingNode {
    BranchMappingPredicate::new(RUNTIME_VERSION_KEY, equals_operator(), runtime_version).into()
}

pub fn constrained_node(runtime_version: &str, fraction: f64) -> BranchMappingNode {
    and_statement(vec![
        runtime_version_predicate(runtime_version),
        rollout_predicate(fraction),
    ])
}

pub fn mapping_of(entries: Vec<(&str, BranchMappingNode)>) -> BranchMapping {
    BranchMapping::new(
        entries
            .into_iter()
            .map(|(id, logic)| BranchMappingEntry::new(id, logic))
            .collect(),
    )
}

pub fn unconstrained_rollout_mapping(
    rolled_out: &str,
    fraction: f64,
    default: &str,
) -> BranchMapping {
    mapping_of(vec![
        (rolled_out, rollout_predicate(fraction)),
        (default, always_true()),
    ])
}

pub fn constrained_rollout_mapping(
    rolled_out: &str,
    runtime_version: &str,
    fraction: f64,
    default: &str,
) -> BranchMapping {
    mapping_of(vec![
        (rolled_out, constrained_node(runtime_version, fraction)),
        (default, always_true()),
    ])
}

pub fn branch(id: &str) -> UpdateBranch {
    UpdateBranch::new(id, format!("branch-{id}"))
}

pub fn channel_with(mapping: &BranchMapping, branch_ids: &[&str]) -> UpdateChannel {
    UpdateChannel {
        id: "channel-1".to_string(),
        name: "production".to_string(),
        branch_mapping: mapping.to_json().unwrap(),
        branches: branch_ids.iter().map(|id| branch(id)).collect(),
    }
}

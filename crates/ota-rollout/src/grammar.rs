//! Rollout shapes within the generic branch-mapping tree
//!
//! Two dialects are recognised, both ending in an always-true fallback entry:
//!
//! ```text
//! unconstrained:  [ {rolloutToken hash_lt f}                          -> rolled out,
//!                   "true"                                            -> default ]
//! constrained:    [ ["and", {runtimeVersion == v}, {rolloutToken hash_lt f}] -> rolled out,
//!                   ... one entry per runtime version ...,
//!                   "true"                                            -> default ]
//! ```
//!
//! Classification is purely structural, so hand-authored mappings of the same
//! shape are recognised too. Predicate order inside the `and` is irrelevant;
//! entry order in the mapping is not.

use ota_branch_mapping::{
    equals_operator, hash_lt_operator, is_always_true, BranchMapping, BranchMappingEntry,
    BranchMappingNode, BranchMappingOperand, BranchMappingPredicate, BranchMappingStatement,
    ROLLOUT_TOKEN_KEY, RUNTIME_VERSION_KEY,
};

fn is_rollout_predicate(predicate: &BranchMappingPredicate) -> bool {
    predicate.matches(ROLLOUT_TOKEN_KEY, hash_lt_operator())
        && matches!(predicate.operand, BranchMappingOperand::Number(n) if (0.0..=1.0).contains(&n))
}

fn runtime_version_of(predicate: &BranchMappingPredicate) -> Option<&str> {
    if !predicate.matches(RUNTIME_VERSION_KEY, equals_operator()) {
        return None;
    }
    match &predicate.operand {
        BranchMappingOperand::String(version) => Some(version),
        _ => None,
    }
}

/// Runtime version and rollout predicate of a constrained rollout node
pub(crate) fn constrained_rollout_parts(
    node: &BranchMappingNode,
) -> Option<(&str, &BranchMappingPredicate)> {
    let BranchMappingNode::Statement(BranchMappingStatement::And(nodes)) = node else {
        return None;
    };
    let [BranchMappingNode::Predicate(a), BranchMappingNode::Predicate(b)] = nodes.as_slice()
    else {
        return None;
    };
    match (runtime_version_of(a), runtime_version_of(b)) {
        (Some(version), _) if is_rollout_predicate(b) => Some((version, b)),
        (_, Some(version)) if is_rollout_predicate(a) => Some((version, a)),
        _ => None,
    }
}

/// Rollout, default entries and rollout predicate of an unconstrained rollout
pub(crate) fn unconstrained_rollout_parts(
    mapping: &BranchMapping,
) -> Option<(&BranchMappingEntry, &BranchMappingPredicate, &BranchMappingEntry)> {
    let [rollout, default] = mapping.data.as_slice() else {
        return None;
    };
    let BranchMappingNode::Predicate(predicate) = &rollout.branch_mapping_logic else {
        return None;
    };
    (is_rollout_predicate(predicate) && is_always_true(&default.branch_mapping_logic))
        .then_some((rollout, predicate, default))
}

/// The rollout predicate inside a rollout node of either dialect
pub(crate) fn rollout_predicate_mut(
    node: &mut BranchMappingNode,
) -> Option<&mut BranchMappingPredicate> {
    match node {
        BranchMappingNode::Predicate(predicate) => {
            is_rollout_predicate(predicate).then_some(predicate)
        }
        BranchMappingNode::Statement(BranchMappingStatement::And(nodes)) => {
            nodes.iter_mut().find_map(|n| match n {
                BranchMappingNode::Predicate(predicate) => {
                    is_rollout_predicate(predicate).then_some(predicate)
                }
                _ => None,
            })
        }
        _ => None,
    }
}

/// First always-true entry; entries after it are unreachable
pub(crate) fn fallback_entry(mapping: &BranchMapping) -> Option<&BranchMappingEntry> {
    mapping
        .data
        .iter()
        .find(|e| is_always_true(&e.branch_mapping_logic))
}

/// Check for a bare `rolloutToken hash_lt <fraction>` predicate
#[must_use]
pub fn is_rollout_node(node: &BranchMappingNode) -> bool {
    matches!(node, BranchMappingNode::Predicate(p) if is_rollout_predicate(p))
}

/// Check for an `and` of a runtime-version predicate and a rollout predicate
#[must_use]
pub fn is_rtv_constrained_rollout_node(node: &BranchMappingNode) -> bool {
    constrained_rollout_parts(node).is_some()
}

/// Runtime version targeted by a constrained rollout node
#[must_use]
pub fn get_runtime_version_from_node(node: &BranchMappingNode) -> Option<&str> {
    constrained_rollout_parts(node).map(|(version, _)| version)
}

/// Check for the unconstrained ("legacy") dialect
///
/// Exactly two entries: a rollout predicate first, the always-true fallback
/// second. The swapped order is not this dialect.
#[must_use]
pub fn is_unconstrained_rollout(mapping: &BranchMapping) -> bool {
    let matched = unconstrained_rollout_parts(mapping).is_some();
    tracing::trace!(matched, "unconstrained rollout check");
    matched
}

/// Check for a constrained rollout entry targeting `runtime_version`
///
/// The mapping's final entry must be the always-true fallback.
#[must_use]
pub fn has_constrained_rollout_for_runtime_version(
    mapping: &BranchMapping,
    runtime_version: &str,
) -> bool {
    let ends_in_fallback = mapping
        .last_entry()
        .is_some_and(|e| is_always_true(&e.branch_mapping_logic));
    let matched = ends_in_fallback
        && mapping
            .data
            .iter()
            .any(|e| {
                get_runtime_version_from_node(&e.branch_mapping_logic) == Some(runtime_version)
            });
    tracing::trace!(runtime_version, matched, "constrained rollout check");
    matched
}

/// General rollout detector, independent of any runtime version
///
/// Accepts the unconstrained dialect, or any mapping holding at least one
/// constrained rollout entry plus an always-true entry anywhere in its data.
/// This is deliberately more permissive than the constructors and editors.
#[must_use]
pub fn is_rollout(mapping: &BranchMapping) -> bool {
    if is_unconstrained_rollout(mapping) {
        return true;
    }
    fallback_entry(mapping).is_some()
        && mapping
            .data
            .iter()
            .any(|e| is_rtv_constrained_rollout_node(&e.branch_mapping_logic))
}

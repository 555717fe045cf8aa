//! Constructing and editing rollouts
//!
//! Every operation takes the current mapping by reference and returns a new
//! one; the input is never modified.

use crate::grammar::{
    get_runtime_version_from_node, has_constrained_rollout_for_runtime_version,
    rollout_predicate_mut, unconstrained_rollout_parts,
};
use crate::percent::Percent;
use ota_branch_mapping::{
    and_statement, equals_operator, get_always_true_branch_mapping, hash_lt_operator,
    BranchMapping, BranchMappingEntry, BranchMappingNode, BranchMappingOperand,
    BranchMappingPredicate, BranchMappingResult, BranchMappingValidationError, ROLLOUT_TOKEN_KEY,
    RUNTIME_VERSION_KEY,
};

/// Request to add a runtime-version-scoped rollout to a mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstrainedRolloutInsertion {
    /// Branch receiving the rolled-out share
    pub rollout_branch_id: String,
    /// Share of clients on `runtime_version` routed to the branch
    pub percent: Percent,
    /// Runtime version the rollout is scoped to
    pub runtime_version: String,
}

impl ConstrainedRolloutInsertion {
    /// Create insertion request
    #[inline]
    #[must_use]
    pub fn new(
        rollout_branch_id: impl Into<String>,
        percent: Percent,
        runtime_version: impl Into<String>,
    ) -> Self {
        Self {
            rollout_branch_id: rollout_branch_id.into(),
            percent,
            runtime_version: runtime_version.into(),
        }
    }
}

/// How an unconstrained rollout is collapsed when it ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutOutcome {
    /// Route every client back to the default branch
    RevertToDefault,
    /// Route every client to the rolled-out branch
    PromoteRolledOut,
}

/// `rolloutToken hash_lt percent/100`
#[must_use]
pub fn rollout_node(percent: Percent) -> BranchMappingNode {
    BranchMappingPredicate::new(ROLLOUT_TOKEN_KEY, hash_lt_operator(), percent.to_operand()).into()
}

/// `["and", runtimeVersion == version, rolloutToken hash_lt percent/100]`
#[must_use]
pub fn rtv_constrained_rollout_node(
    runtime_version: impl Into<String>,
    percent: Percent,
) -> BranchMappingNode {
    and_statement(vec![
        BranchMappingPredicate::new(
            RUNTIME_VERSION_KEY,
            equals_operator(),
            runtime_version.into(),
        )
        .into(),
        rollout_node(percent),
    ])
}

/// Prepend a constrained rollout entry to an existing mapping
///
/// The new entry goes ahead of every existing entry so that it is tried
/// before broader entries, the trailing default included.
///
/// # Errors
/// Returns [`BranchMappingValidationError::PostconditionFailed`] if the result
/// is not recognised as a constrained rollout for the runtime version, e.g.
/// when `existing` has no always-true fallback.
pub fn insert_constrained_rollout_branch_mapping_for_runtime_version(
    existing: &BranchMapping,
    insertion: &ConstrainedRolloutInsertion,
) -> BranchMappingResult<BranchMapping> {
    let entry = BranchMappingEntry::new(
        insertion.rollout_branch_id.clone(),
        rtv_constrained_rollout_node(insertion.runtime_version.clone(), insertion.percent),
    );
    let mut data = Vec::with_capacity(existing.data.len() + 1);
    data.push(entry);
    data.extend(existing.data.iter().cloned());
    let mapping = BranchMapping {
        version: existing.version,
        data,
    };

    if !has_constrained_rollout_for_runtime_version(&mapping, &insertion.runtime_version) {
        return Err(BranchMappingValidationError::PostconditionFailed {
            runtime_version: insertion.runtime_version.clone(),
        });
    }

    tracing::debug!(
        runtime_version = %insertion.runtime_version,
        branch_id = %insertion.rollout_branch_id,
        percent = insertion.percent.get(),
        entries = mapping.len(),
        "inserted constrained rollout"
    );
    Ok(mapping)
}

fn set_rollout_operand(node: &mut BranchMappingNode, percent: Percent) -> bool {
    match rollout_predicate_mut(node) {
        Some(predicate) => {
            predicate.operand = BranchMappingOperand::Number(percent.to_operand());
            true
        }
        None => false,
    }
}

/// Change the percent of the constrained rollout for one runtime version
///
/// Only the operand of the first matching entry changes; every other entry,
/// sibling runtime-version rollouts included, is left as it was.
///
/// # Errors
/// Returns [`BranchMappingValidationError::NoMatchingRollout`] if no entry
/// holds a constrained rollout for `runtime_version`.
pub fn edit_rtv_constrained_rollout_for_runtime_version(
    mapping: &BranchMapping,
    runtime_version: &str,
    percent: Percent,
) -> BranchMappingResult<BranchMapping> {
    let no_match = || BranchMappingValidationError::NoMatchingRollout {
        runtime_version: runtime_version.to_string(),
    };
    if !has_constrained_rollout_for_runtime_version(mapping, runtime_version) {
        return Err(no_match());
    }

    let mut edited = mapping.clone();
    let entry = edited
        .data
        .iter_mut()
        .find(|e| get_runtime_version_from_node(&e.branch_mapping_logic) == Some(runtime_version))
        .ok_or_else(no_match)?;
    if !set_rollout_operand(&mut entry.branch_mapping_logic, percent) {
        return Err(no_match());
    }

    tracing::debug!(runtime_version, percent = percent.get(), "edited constrained rollout");
    Ok(edited)
}

/// Change the percent of an unconstrained rollout
///
/// # Errors
/// Returns [`BranchMappingValidationError::NotARollout`] if the mapping is not
/// the unconstrained dialect.
pub fn edit_legacy_rollout(
    mapping: &BranchMapping,
    percent: Percent,
) -> BranchMappingResult<BranchMapping> {
    if unconstrained_rollout_parts(mapping).is_none() {
        return Err(BranchMappingValidationError::not_a_rollout(mapping));
    }

    let mut edited = mapping.clone();
    let updated = edited
        .data
        .first_mut()
        .is_some_and(|e| set_rollout_operand(&mut e.branch_mapping_logic, percent));
    if !updated {
        return Err(BranchMappingValidationError::not_a_rollout(mapping));
    }

    tracing::debug!(percent = percent.get(), "edited unconstrained rollout");
    Ok(edited)
}

/// Drop the constrained rollout entry for one runtime version
///
/// # Errors
/// Returns [`BranchMappingValidationError::NoMatchingRollout`] if no entry
/// holds a constrained rollout for `runtime_version`.
pub fn remove_constrained_rollout_for_runtime_version(
    mapping: &BranchMapping,
    runtime_version: &str,
) -> BranchMappingResult<BranchMapping> {
    let position = mapping
        .data
        .iter()
        .position(|e| {
            get_runtime_version_from_node(&e.branch_mapping_logic) == Some(runtime_version)
        })
        .filter(|_| has_constrained_rollout_for_runtime_version(mapping, runtime_version))
        .ok_or_else(|| BranchMappingValidationError::NoMatchingRollout {
            runtime_version: runtime_version.to_string(),
        })?;

    let mut remaining = mapping.clone();
    remaining.data.remove(position);
    tracing::debug!(runtime_version, entries = remaining.len(), "removed constrained rollout");
    Ok(remaining)
}

/// Collapse an unconstrained rollout into a single always-true mapping
///
/// # Errors
/// Returns [`BranchMappingValidationError::UnexpectedShape`] if the mapping is
/// not the unconstrained dialect.
pub fn end_rollout(
    mapping: &BranchMapping,
    outcome: RolloutOutcome,
) -> BranchMappingResult<BranchMapping> {
    let (rollout, _, default) = unconstrained_rollout_parts(mapping).ok_or_else(|| {
        BranchMappingValidationError::unexpected_shape("an unconstrained rollout", mapping)
    })?;
    let branch_id = match outcome {
        RolloutOutcome::RevertToDefault => &default.branch_id,
        RolloutOutcome::PromoteRolledOut => &rollout.branch_id,
    };
    tracing::debug!(?outcome, %branch_id, "ended rollout");
    Ok(get_always_true_branch_mapping(branch_id.clone()))
}

//! Composition of rollout information with branch records
//!
//! Ids recorded in the tree must match the ids of the branch records they are
//! paired with; a mismatch is a hard failure, never silently corrected.

use crate::grammar::is_rollout;
use crate::info::{
    get_rollout_info_from_branch_mapping, ConstrainedRolloutInfo, RolloutInfo, RolloutRecord,
    UnconstrainedRolloutInfo,
};
use ota_branch_mapping::{BranchMappingResult, BranchMappingValidationError};
use ota_channel::{get_branch_from_channel, UpdateBranch, UpdateChannel};
use serde::Serialize;

/// Rollout record joined with the branches it references
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rollout<I> {
    /// Rollout record the branches were checked against
    #[serde(flatten)]
    pub info: I,
    /// Branch receiving the rolled-out share
    pub rolled_out_branch: UpdateBranch,
    /// Branch receiving every other client
    pub default_branch: UpdateBranch,
}

/// Composed rollout of a channel, in either dialect
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelRollout {
    /// Rollout targeting every runtime version
    Unconstrained(Rollout<UnconstrainedRolloutInfo>),
    /// One rollout per targeted runtime version
    Constrained(Vec<Rollout<ConstrainedRolloutInfo>>),
}

fn check_id(role: &'static str, expected: &str, branch: &UpdateBranch) -> BranchMappingResult<()> {
    if branch.id == expected {
        Ok(())
    } else {
        Err(BranchMappingValidationError::branch_id_mismatch(
            role,
            expected,
            branch.id.clone(),
        ))
    }
}

/// Join a rollout record with its default and rolled-out branches
///
/// # Errors
/// Returns [`BranchMappingValidationError::BranchIdMismatch`] naming the
/// expected and actual ids if either branch disagrees with `info`.
pub fn compose_rollout<I: RolloutRecord>(
    info: I,
    default_branch: UpdateBranch,
    rolled_out_branch: UpdateBranch,
) -> BranchMappingResult<Rollout<I>> {
    check_id("default", info.default_branch_id(), &default_branch)?;
    check_id("rolled out", info.rolled_out_branch_id(), &rolled_out_branch)?;
    tracing::trace!(
        default = %default_branch.id,
        rolled_out = %rolled_out_branch.id,
        percent = info.percent_rolled_out().get(),
        "composed rollout record"
    );
    Ok(Rollout {
        info,
        rolled_out_branch,
        default_branch,
    })
}

fn compose_from_channel<I: RolloutRecord>(
    channel: &UpdateChannel,
    info: I,
) -> BranchMappingResult<Rollout<I>> {
    let default_branch = get_branch_from_channel(channel, info.default_branch_id())?.clone();
    let rolled_out_branch = get_branch_from_channel(channel, info.rolled_out_branch_id())?.clone();
    compose_rollout(info, default_branch, rolled_out_branch)
}

/// Rollout information of a channel's branch mapping
///
/// # Errors
/// Returns a parse, version or not-a-rollout error.
pub fn get_rollout_info(channel: &UpdateChannel) -> BranchMappingResult<RolloutInfo> {
    get_rollout_info_from_branch_mapping(&channel.parsed_branch_mapping()?)
}

/// Check whether a channel currently carries a rollout
///
/// Unreadable mappings are not rollouts.
#[must_use]
pub fn is_rollout_channel(channel: &UpdateChannel) -> bool {
    channel
        .parsed_branch_mapping()
        .is_ok_and(|mapping| is_rollout(&mapping))
}

/// Composed rollout of a channel
///
/// # Errors
/// Fails whenever a step fails: the mapping is not a rollout, a referenced
/// branch is missing from the channel, or ids disagree.
pub fn get_rollout(channel: &UpdateChannel) -> BranchMappingResult<ChannelRollout> {
    let rollout = match get_rollout_info(channel)? {
        RolloutInfo::Unconstrained(info) => {
            ChannelRollout::Unconstrained(compose_from_channel(channel, info)?)
        }
        RolloutInfo::Constrained(infos) => ChannelRollout::Constrained(
            infos
                .into_iter()
                .map(|info| compose_from_channel(channel, info))
                .collect::<BranchMappingResult<Vec<_>>>()?,
        ),
    };
    tracing::debug!(channel = %channel.name, "composed rollout");
    Ok(rollout)
}

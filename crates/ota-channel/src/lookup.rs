//! Lookups resolving branch-mapping references against a channel
//!
//! A miss is a logic error for every caller, so lookups fail loudly instead
//! of returning `Option`.

use crate::channel::{UpdateBranch, UpdateChannel};
use ota_branch_mapping::{BranchMappingResult, BranchMappingValidationError};

/// Find a branch of the channel by id
///
/// # Errors
/// Returns [`BranchMappingValidationError::BranchNotFound`] naming the channel and id.
pub fn get_branch_from_channel<'a>(
    channel: &'a UpdateChannel,
    branch_id: &str,
) -> BranchMappingResult<&'a UpdateBranch> {
    channel
        .branches
        .iter()
        .find(|b| b.id == branch_id)
        .ok_or_else(|| BranchMappingValidationError::BranchNotFound {
            channel: channel.name.clone(),
            branch_id: branch_id.to_string(),
        })
}

/// Branch id of a channel routing every client to one branch
///
/// # Errors
/// Returns a parse/version error for an unreadable mapping, or
/// [`BranchMappingValidationError::NotStandardMapping`] when the mapping is
/// not a single always-true entry (a rollout, an empty mapping, ...).
pub fn get_standard_branch_id(channel: &UpdateChannel) -> BranchMappingResult<String> {
    let mapping = channel.parsed_branch_mapping()?;
    let branch_id = ota_branch_mapping::get_standard_branch_id(&mapping)
        .map_err(|_| BranchMappingValidationError::NotStandardMapping {
            channel: channel.name.clone(),
            mapping: channel.branch_mapping.clone(),
        })?
        .to_string();
    tracing::trace!(channel = %channel.name, %branch_id, "resolved standard branch");
    Ok(branch_id)
}

//! OTA Rollout
//!
//! Staged, percentage-based rollouts expressed as shapes within a channel's
//! branch mapping.
//!
//! # Core Operations
//!
//! - **Classify**: [`is_rollout`], [`is_unconstrained_rollout`],
//!   [`has_constrained_rollout_for_runtime_version`]
//! - **Extract**: [`get_rollout_info_from_branch_mapping`] into a [`RolloutInfo`]
//! - **Construct / edit**: [`insert_constrained_rollout_branch_mapping_for_runtime_version`],
//!   [`edit_rtv_constrained_rollout_for_runtime_version`], [`edit_legacy_rollout`]
//! - **Compose**: [`compose_rollout`] / [`get_rollout`] join the info with branch records
//!
//! # Architecture
//!
//! ```text
//! channel.branchMapping ─parse─→ BranchMapping ─classify─→ RolloutInfo ─compose─→ Rollout
//!                                      ↑                                           │
//!                                      └──────── edit (returns a new mapping) ←────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use ota_branch_mapping::get_always_true_branch_mapping;
//! use ota_rollout::{
//!     get_rollout_info_from_branch_mapping,
//!     insert_constrained_rollout_branch_mapping_for_runtime_version,
//!     ConstrainedRolloutInsertion, Percent, RolloutInfo,
//! };
//!
//! let base = get_always_true_branch_mapping("default-branch");
//! let percent = Percent::new(10).unwrap();
//! let insertion = ConstrainedRolloutInsertion::new("new-branch", percent, "1.0.0");
//! let mapping =
//!     insert_constrained_rollout_branch_mapping_for_runtime_version(&base, &insertion).unwrap();
//!
//! let info = get_rollout_info_from_branch_mapping(&mapping).unwrap();
//! assert_eq!(info.runtime_versions(), vec!["1.0.0"]);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod compose;
pub mod edit;
pub mod grammar;
pub mod info;
pub mod percent;

// Re-exports
pub use compose::{
    compose_rollout, get_rollout, get_rollout_info, is_rollout_channel, ChannelRollout, Rollout,
};
pub use edit::{
    edit_legacy_rollout, edit_rtv_constrained_rollout_for_runtime_version, end_rollout,
    insert_constrained_rollout_branch_mapping_for_runtime_version,
    remove_constrained_rollout_for_runtime_version, rollout_node, rtv_constrained_rollout_node,
    ConstrainedRolloutInsertion, RolloutOutcome,
};
pub use grammar::{
    get_runtime_version_from_node, has_constrained_rollout_for_runtime_version, is_rollout,
    is_rollout_node, is_rtv_constrained_rollout_node, is_unconstrained_rollout,
};
pub use info::{
    does_target_rollout, get_rollout_info_from_branch_mapping, ConstrainedRolloutInfo,
    RolloutInfo, RolloutRecord, UnconstrainedRolloutInfo,
};
pub use ota_branch_mapping::{BranchMappingResult, BranchMappingValidationError};
pub use percent::Percent;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for rollout operations
    pub use crate::{
        ChannelRollout, ConstrainedRolloutInfo, ConstrainedRolloutInsertion, Percent, Rollout,
        RolloutInfo, RolloutOutcome, RolloutRecord, UnconstrainedRolloutInfo,
    };
    pub use ota_branch_mapping::prelude::*;
}

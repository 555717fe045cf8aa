//! OTA Channel
//!
//! Channel and branch records as delivered by the update service, and the
//! lookups resolving a channel's branch mapping against its branch list.
//!
//! # Example
//!
//! ```rust
//! use ota_branch_mapping::get_always_true_branch_mapping;
//! use ota_channel::{get_branch_from_channel, get_standard_branch_id, UpdateBranch, UpdateChannel};
//!
//! let channel = UpdateChannel {
//!     id: "channel-1".into(),
//!     name: "production".into(),
//!     branch_mapping: get_always_true_branch_mapping("branch-1").to_json().unwrap(),
//!     branches: vec![UpdateBranch::new("branch-1", "main")],
//! };
//!
//! let branch_id = get_standard_branch_id(&channel).unwrap();
//! assert_eq!(get_branch_from_channel(&channel, &branch_id).unwrap().name, "main");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod channel;
pub mod lookup;

// Re-exports
pub use channel::{BranchMappingUpdate, ChannelStore, UpdateBranch, UpdateChannel};
pub use lookup::{get_branch_from_channel, get_standard_branch_id};
pub use ota_branch_mapping::{BranchMappingResult, BranchMappingValidationError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

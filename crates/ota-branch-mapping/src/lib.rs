//! OTA Branch Mapping
//!
//! The expression tree a channel uses to decide, per client, which branch's
//! update bundle to serve.
//!
//! # Core Concepts
//!
//! - [`BranchMappingNode`]: closed sum of always-true, predicate and statement
//! - [`BranchMapping`]: versioned, ordered list of `{branchId, branchMappingLogic}`
//! - [`BranchMappingValidationError`]: the single failure kind of this crate family
//!
//! # Example
//!
//! ```rust
//! use ota_branch_mapping::{
//!     get_always_true_branch_mapping, has_standard_branch_map, BranchMapping,
//! };
//!
//! let mapping = get_always_true_branch_mapping("branch-1");
//! let raw = mapping.to_json().unwrap();
//!
//! let parsed = BranchMapping::parse(&raw).unwrap();
//! assert_eq!(parsed, mapping);
//! assert!(has_standard_branch_map(&parsed));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod mapping;
pub mod node;

// Re-exports for convenience
pub use error::{BranchMappingResult, BranchMappingValidationError};
pub use mapping::{
    assert_version, get_always_true_branch_mapping, get_branch_ids, get_empty_branch_mapping,
    get_standard_branch_id, has_empty_branch_map, has_standard_branch_map, parse_branch_mapping,
    BranchMapping, BranchMappingEntry, BRANCH_MAPPING_VERSION,
};
pub use node::{
    always_true, and_statement, assert_and_statement, assert_number, assert_predicate_object,
    assert_statement, assert_string, equals_operator, get_nodes_from_statement, hash_lt_operator,
    is_always_true, is_and_statement, is_not_statement, is_or_statement, is_predicate_object,
    is_statement, BranchMappingNode, BranchMappingOperand, BranchMappingOperator,
    BranchMappingPredicate, BranchMappingStatement, ALWAYS_TRUE_LITERAL, ROLLOUT_TOKEN_KEY,
    RUNTIME_VERSION_KEY,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with branch mappings
    pub use crate::error::{BranchMappingResult, BranchMappingValidationError};
    pub use crate::mapping::{BranchMapping, BranchMappingEntry, BRANCH_MAPPING_VERSION};
    pub use crate::node::{
        BranchMappingNode, BranchMappingOperand, BranchMappingOperator, BranchMappingPredicate,
        BranchMappingStatement,
    };
}

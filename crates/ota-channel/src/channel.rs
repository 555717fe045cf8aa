//! Channel and branch records exchanged with the update service
//!
//! These types mirror the collaborator's channel record; the branch mapping
//! travels as a JSON string, not as a structured value.

use ota_branch_mapping::{
    assert_version, BranchMapping, BranchMappingResult, BRANCH_MAPPING_VERSION,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named, ordered sequence of published update bundles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateBranch {
    /// Branch id referenced by branch mappings
    pub id: String,
    /// Human-readable branch name
    pub name: String,
    /// Remaining fields of the record, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UpdateBranch {
    /// Create branch record with no extra fields
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }
}

/// Named routing point clients query to learn which branch to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChannel {
    /// Channel id
    pub id: String,
    /// Channel name
    pub name: String,
    /// Serialized [`BranchMapping`]
    pub branch_mapping: String,
    /// Branches the channel can route to
    #[serde(default)]
    pub branches: Vec<UpdateBranch>,
}

impl UpdateChannel {
    /// Parse the channel's raw branch mapping and check its version
    ///
    /// # Errors
    /// Returns a parse or version-mismatch error.
    pub fn parsed_branch_mapping(&self) -> BranchMappingResult<BranchMapping> {
        let mapping = BranchMapping::parse(&self.branch_mapping)?;
        assert_version(&mapping, BRANCH_MAPPING_VERSION)?;
        Ok(mapping)
    }

    /// Copy of this channel carrying `mapping` instead of its current one
    ///
    /// # Errors
    /// Returns a serialize error if the mapping cannot be encoded.
    pub fn with_branch_mapping(&self, mapping: &BranchMapping) -> BranchMappingResult<Self> {
        Ok(Self {
            branch_mapping: mapping.to_json()?,
            ..self.clone()
        })
    }
}

/// Payload of the persistence mutation replacing a channel's branch mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchMappingUpdate {
    /// Channel being updated
    pub channel_id: String,
    /// Serialized replacement mapping
    pub branch_mapping: String,
}

impl BranchMappingUpdate {
    /// Serialize `mapping` into an update for `channel_id`
    ///
    /// # Errors
    /// Returns a serialize error if the mapping cannot be encoded.
    pub fn new(
        channel_id: impl Into<String>,
        mapping: &BranchMapping,
    ) -> BranchMappingResult<Self> {
        Ok(Self {
            channel_id: channel_id.into(),
            branch_mapping: mapping.to_json()?,
        })
    }
}

/// Source and sink of channel records
///
/// Reading a channel, editing its mapping and writing it back is one logical
/// unit for the caller; concurrency control belongs to the implementation.
pub trait ChannelStore {
    /// Failure reported by the backing store
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch a channel record by name
    fn fetch_channel(&self, channel_name: &str) -> Result<UpdateChannel, Self::Error>;

    /// Replace a channel's branch mapping, returning the updated record
    fn update_branch_mapping(
        &mut self,
        update: &BranchMappingUpdate,
    ) -> Result<UpdateChannel, Self::Error>;
}

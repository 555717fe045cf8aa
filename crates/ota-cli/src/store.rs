//! Channel store backed by a JSON file
//!
//! The file holds an array of channel records as returned by the update
//! service. Every update rewrites the whole file.

use ota_channel::{BranchMappingUpdate, ChannelStore, UpdateChannel};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors reading or writing the channel file
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error on the channel file
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// Channel file
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Channel file is not a JSON array of channel records
    #[error("invalid channel file {}: {source}", path.display())]
    Json {
        /// Channel file
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: serde_json::Error,
    },

    /// No channel with the requested name or id
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
}

/// [`ChannelStore`] over a JSON file of channel records
#[derive(Debug, Clone)]
pub struct JsonFileChannelStore {
    path: PathBuf,
}

impl JsonFileChannelStore {
    /// Create store over the file at `path`
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<UpdateChannel>, StoreError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, channels: &[UpdateChannel]) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(channels).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, raw).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl ChannelStore for JsonFileChannelStore {
    type Error = StoreError;

    fn fetch_channel(&self, channel_name: &str) -> Result<UpdateChannel, Self::Error> {
        self.load()?
            .into_iter()
            .find(|c| c.name == channel_name)
            .ok_or_else(|| StoreError::ChannelNotFound(channel_name.to_string()))
    }

    fn update_branch_mapping(
        &mut self,
        update: &BranchMappingUpdate,
    ) -> Result<UpdateChannel, Self::Error> {
        let mut channels = self.load()?;
        let channel = channels
            .iter_mut()
            .find(|c| c.id == update.channel_id)
            .ok_or_else(|| StoreError::ChannelNotFound(update.channel_id.clone()))?;
        channel.branch_mapping.clone_from(&update.branch_mapping);
        let updated = channel.clone();

        self.save(&channels)?;
        tracing::info!(
            channel = %updated.name,
            path = %self.path.display(),
            "persisted branch mapping"
        );
        Ok(updated)
    }
}

//! OTA rollout operator tooling
//!
//! Drives the rollout library against channel records kept in a JSON file.
//! The [`commands`] module defines the command line and executes commands over
//! any [`ota_channel::ChannelStore`]; [`store`] provides the file-backed store.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod commands;
pub mod store;

pub use commands::{cli, execute, Invocation, RolloutCommand};
pub use store::{JsonFileChannelStore, StoreError};

//! Core types for docforge
//!
//! This crate provides the shared foundations of the service:
//! configuration loading, the artifact-kind table, and the uniform
//! response envelope every endpoint returns.

pub mod config;
pub mod kind;
pub mod response;

// Re-exports
pub use config::{
    AuthConfig, DocforgeConfig, DownloadConfig, ServerConfig, StorageConfig, UpstreamConfig,
};
pub use kind::ArtifactKind;
pub use response::ServiceResponse;

//! Generated-file lifecycle for docforge
//!
//! Kind-scoped filesystem storage for generated documents, plus the
//! retention sweeper that reclaims disk space by deleting artifacts older
//! than the configured window.

mod store;
mod sweeper;

pub use store::{ArtifactError, ArtifactStore, Result};
pub use sweeper::{RetentionSweeper, SweepReport, SweeperHandle};

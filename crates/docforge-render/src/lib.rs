//! Document renderers for docforge
//!
//! Each generator kind supplies a [`Renderer`]: parse the request JSON into
//! its typed spec and produce the finished document bytes. The narrow
//! `render(spec) -> bytes` contract is the seam between the HTTP pipeline
//! and the document formats; everything format-specific stays behind it.

mod document;
mod ooxml;
mod presentation;
mod spreadsheet;

use docforge_core::ArtifactKind;
use serde_json::Value;
use thiserror::Error;

pub use document::DocumentRenderer;
pub use presentation::PresentationRenderer;
pub use spreadsheet::SpreadsheetRenderer;

#[derive(Error, Debug)]
pub enum RenderError {
    /// The request body did not deserialize into the renderer's spec.
    #[error("malformed request: {0}")]
    InvalidSpec(String),

    /// Assembling the document package failed.
    #[error("failed to assemble document package: {0}")]
    Package(String),
}

/// A document renderer: one per artifact kind.
pub trait Renderer: Send + Sync {
    fn kind(&self) -> ArtifactKind;

    /// JSON field holding the request's primary content array; the endpoint
    /// rejects requests where this field is absent or empty.
    fn primary_field(&self) -> &'static str;

    /// Human label for the primary field, used in validation messages.
    fn primary_label(&self) -> &'static str;

    /// Produce the document bytes for a request body.
    fn render(&self, spec: &Value) -> Result<Vec<u8>, RenderError>;
}

//! Outbound web tools for docforge
//!
//! Thin reqwest-backed clients: a web page reader, a video transcript
//! fetcher, and an image-generation client. Each call carries a bounded
//! timeout; failures keep the upstream message so callers can diagnose
//! third-party configuration.

mod image_generation;
mod transcript;
mod web_page_reader;

use thiserror::Error;

pub use image_generation::{GeneratedImage, StabilityClient};
pub use transcript::{Transcript, TranscriptFetcher, TranscriptSegment};
pub use web_page_reader::{PageContent, WebPageReader};

#[derive(Error, Debug)]
pub enum WebToolError {
    /// The caller's input was unusable before any network traffic.
    #[error("{0}")]
    InvalidInput(String),

    /// The upstream did not answer within the configured timeout.
    #[error("upstream request timed out: {0}")]
    Timeout(String),

    /// Transport-level or HTTP-status failure from the upstream.
    #[error("upstream request failed: {0}")]
    Http(String),

    /// The upstream answered but the payload was not what we expected.
    #[error("unexpected upstream response: {0}")]
    Payload(String),
}

impl From<reqwest::Error> for WebToolError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            WebToolError::Timeout(error.to_string())
        } else {
            WebToolError::Http(error.to_string())
        }
    }
}

pub(crate) const USER_AGENT: &str = "docforge/0.1";

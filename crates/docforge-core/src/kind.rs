//! The artifact-kind table: one row per document generator.
//!
//! Everything the rest of the service needs to know about a kind hangs off
//! this enum, so adding a generator means adding a row here and a renderer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Spreadsheet,
    Presentation,
    Document,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Spreadsheet,
        ArtifactKind::Presentation,
        ArtifactKind::Document,
    ];

    /// Directory name under the storage root holding this kind's files.
    pub fn dir_name(self) -> &'static str {
        match self {
            ArtifactKind::Spreadsheet => "excel-exports",
            ArtifactKind::Presentation => "powerpoint-exports",
            ArtifactKind::Document => "word-exports",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Spreadsheet => "xlsx",
            ArtifactKind::Presentation => "pptx",
            ArtifactKind::Document => "docx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArtifactKind::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ArtifactKind::Presentation => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            ArtifactKind::Document => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    /// File name prefix for generated artifacts of this kind.
    pub fn file_prefix(self) -> &'static str {
        match self {
            ArtifactKind::Spreadsheet => "excel-file",
            ArtifactKind::Presentation => "presentation-file",
            ArtifactKind::Document => "word-file",
        }
    }

    /// First path segment of this kind's HTTP routes.
    pub fn route_base(self) -> &'static str {
        match self {
            ArtifactKind::Spreadsheet => "excel-generator",
            ArtifactKind::Presentation => "powerpoint-generator",
            ArtifactKind::Document => "word-generator",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_table_is_consistent() {
        for kind in ArtifactKind::ALL {
            assert!(kind.dir_name().ends_with("-exports"));
            assert!(kind.route_base().ends_with("-generator"));
            assert!(kind.content_type().starts_with("application/vnd.openxmlformats"));
            assert!(!kind.extension().is_empty());
        }
    }

    #[test]
    fn test_document_kind_matches_word_routes() {
        let kind = ArtifactKind::Document;
        assert_eq!(kind.dir_name(), "word-exports");
        assert_eq!(kind.file_prefix(), "word-file");
        assert_eq!(kind.route_base(), "word-generator");
        assert_eq!(kind.extension(), "docx");
    }
}

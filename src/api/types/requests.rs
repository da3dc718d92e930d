//! API request types.

use std::path::PathBuf;

use serde::Serialize;

/// Request to unapprove and reopen an issue.
#[derive(Debug, Clone, Serialize)]
pub struct UnapproveRequest {
    pub reason: String,
}

/// Query parameters for the branch commit listing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 0-indexed page number
    pub page: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Commit hash prefix; the server returns the page containing it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locate: Option<String>,
}

/// A single file entry for archive generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveFileRequest {
    pub repository_file: PathBuf,
    pub commit: String,
    pub milestone: Option<String>,
    pub approved: Option<bool>,
}

/// Request to generate an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveGenerateRequest {
    pub output_path: String,
    pub flatten: bool,
    pub files: Vec<ArchiveFileRequest>,
}

//! Error kinds for the ingestion pipeline.
//!
//! Every pipeline operation fails fast with a [`PipelineError`]. The HTTP
//! and CLI layers only need the [`FailureStage`] to tell the caller where a
//! run stopped.

use serde::Serialize;

/// Where a full update stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Resolving the head commit of the branch to a tree identifier.
    CommitLookup,
    /// Retrieving the recursive tree listing.
    TreeFetch,
    /// Wiping, materializing, or resolving directory content.
    Processing,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::CommitLookup => "commit_lookup",
            FailureStage::TreeFetch => "tree_fetch",
            FailureStage::Processing => "processing",
        }
    }

    /// Short human summary, used in HTTP error payloads.
    pub fn summary(&self) -> &'static str {
        match self {
            FailureStage::CommitLookup => "Failed to get latest commit",
            FailureStage::TreeFetch => "Failed to get tree",
            FailureStage::Processing => "Failed to process tree",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to resolve head tree for '{reference}': {message}")]
    CommitLookup { reference: String, message: String },

    #[error("failed to list tree {tree_id}: {message}")]
    ListingFetch { tree_id: String, message: String },

    #[error("failed to fetch blob {blob_id}: {message}")]
    BlobFetch { blob_id: String, message: String },

    #[error("failed to decode blob {blob_id}: {message}")]
    Decode { blob_id: String, message: String },

    #[error("invalid repository path '{0}'")]
    InvalidPath(String),

    #[error("persistence error: {0:#}")]
    Persistence(#[source] anyhow::Error),
}

impl PipelineError {
    pub fn stage(&self) -> FailureStage {
        match self {
            PipelineError::CommitLookup { .. } => FailureStage::CommitLookup,
            PipelineError::ListingFetch { .. } => FailureStage::TreeFetch,
            PipelineError::BlobFetch { .. }
            | PipelineError::Decode { .. }
            | PipelineError::InvalidPath(_)
            | PipelineError::Persistence(_) => FailureStage::Processing,
        }
    }

    pub fn blob_fetch(blob_id: &str, message: impl Into<String>) -> Self {
        PipelineError::BlobFetch {
            blob_id: blob_id.to_string(),
            message: message.into(),
        }
    }

    pub fn decode(blob_id: &str, message: impl Into<String>) -> Self {
        PipelineError::Decode {
            blob_id: blob_id.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

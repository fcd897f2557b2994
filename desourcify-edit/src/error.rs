//! Error types for desourcify-edit.
//!
//! This module defines error types that distinguish between:
//! - Policy blocks (exit code 2): the workspace changed under the scan, refusing to act
//! - Runtime errors (exit code 1): I/O errors, parse errors, tool failures

use thiserror::Error;

/// The top-level error type for desourcify-edit operations.
#[derive(Debug, Error)]
pub enum EditError {
    /// A policy block occurred (exit code 2).
    #[error("policy block: {0}")]
    PolicyBlock(#[from] PolicyBlockError),

    /// A runtime/tool error occurred (exit code 1).
    #[error("runtime error: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

/// Policy block errors that should result in exit code 2.
#[derive(Debug, Error)]
pub enum PolicyBlockError {
    /// The source manifest no longer matches what the scan saw.
    #[error("manifest changed since scan: {message}")]
    ManifestChanged {
        /// Which manifest changed and how.
        message: String,
    },
}

impl EditError {
    /// Returns true if this is a policy block error (exit code 2).
    pub fn is_policy_block(&self) -> bool {
        matches!(self, EditError::PolicyBlock(_))
    }

    /// Returns the recommended exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            EditError::PolicyBlock(_) => 2,
            EditError::Runtime(_) => 1,
        }
    }
}

/// Result type alias using EditError.
pub type EditResult<T> = Result<T, EditError>;

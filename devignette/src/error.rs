//! Error types for estimation and correction.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced at the boundary of the estimation and correction core.
///
/// Infeasible search candidates and intensity saturation are not errors and
/// never appear here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Radial profile unavailable: {reason}")]
    ProfileUnavailable { reason: String },

    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode or encode image '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image_lib::ImageError,
    },

    #[error("Unsupported model file '{path}': {source}")]
    ModelFormat {
        path: PathBuf,
        #[source]
        source: common::FileExtensionError,
    },

    #[error("Model record serialization failed: {0}")]
    Serialization(#[from] common::SerdeFormatError),
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn profile_unavailable(reason: impl Into<String>) -> Self {
        Self::ProfileUnavailable {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message() {
        let err = Error::invalid("image is empty");
        assert_eq!(err.to_string(), "Invalid input: image is empty");
    }

    #[test]
    fn test_profile_unavailable_message() {
        let err = Error::profile_unavailable("only 2 rings supported");
        assert!(err.to_string().contains("only 2 rings supported"));
        assert!(matches!(err, Error::ProfileUnavailable { .. }));
    }

    #[test]
    fn test_io_error_message() {
        let err = Error::Io {
            path: PathBuf::from("/models/lens.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        assert!(err.to_string().contains("/models/lens.yaml"));
        assert!(err.to_string().contains("file not found"));
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// Boxed source error carried by the predictor and image variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors for the feature and mask pipeline.
///
/// No variant carries a partial result: a request either yields a full
/// feature map or mask, or fails.
#[derive(Error, Debug)]
pub enum ImgFeatError {
    #[error("Invalid input: {operation} failed: {reason}")]
    InvalidInput { operation: String, reason: String },

    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Predictor error: {operation} failed")]
    Predictor {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Schema mismatch: missing features {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ImgFeatError>;

impl ImgFeatError {
    pub fn invalid_input(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn predictor(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Predictor {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// I/O errors without path context. Callers that know the path construct
/// `ImgFeatError::FileSystem` directly.
impl From<std::io::Error> for ImgFeatError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

/// Decoding and encoding failures from the image crate are input errors:
/// the bytes handed to the pipeline could not be turned into pixels.
impl From<image::ImageError> for ImgFeatError {
    fn from(err: image::ImageError) -> Self {
        Self::InvalidInput {
            operation: "image codec".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Shape errors only come from model tensors.
impl From<ndarray::ShapeError> for ImgFeatError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Predictor {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = ImgFeatError::DimensionMismatch {
            expected: (10, 20),
            actual: (5, 5),
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch: expected (10, 20), got (5, 5)"
        );
    }

    #[test]
    fn test_schema_mismatch_lists_every_name() {
        let err = ImgFeatError::SchemaMismatch {
            missing: vec!["Mean_RGB_R".to_string(), "LBP_3".to_string()],
        };
        assert!(err.to_string().ends_with("Mean_RGB_R, LBP_3"));
    }

    #[test]
    fn test_predictor_error_keeps_source() {
        use std::error::Error as _;

        let err = ImgFeatError::predictor("inference", "model not loaded");
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("model not loaded".to_string())
        );
    }
}

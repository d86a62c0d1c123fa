/// Typed error hierarchy for steal pipelines and usage accounting.
/// Classifies errors as client-side (validation) or server-side (transcoding, storage).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum StealError {
    // Client errors: the request itself is unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("invalid parameter {param} for {operation}: {value} not in [{min}, {max}]")]
    InvalidParameter {
        operation: String,
        param: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
    #[error("user not found: {0}")]
    UserNotFound(String),

    // Server errors
    #[error("processing error: {0}")]
    Processing(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl StealError {
    /// Shorthand for a range-check failure on an operation parameter.
    pub fn out_of_range(
        operation: &str,
        param: &str,
        value: f64,
        range: std::ops::RangeInclusive<f64>,
    ) -> Self {
        Self::InvalidParameter {
            operation: operation.to_string(),
            param: param.to_string(),
            value,
            min: *range.start(),
            max: *range.end(),
        }
    }

    /// Machine-readable code for the request boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidFormat(_) => "INVALID_FORMAT",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::UnknownOperation(_) => "UNKNOWN_OPERATION",
            Self::UnknownPreset(_) => "UNKNOWN_PRESET",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::Processing(_) => "PROCESSING_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// HTTP-appropriate severity.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidInput(_)
            | Self::InvalidFormat(_)
            | Self::InvalidParameter { .. }
            | Self::UnknownOperation(_)
            | Self::UnknownPreset(_) => 400,
            Self::UserNotFound(_) => 404,
            Self::Processing(_) | Self::Storage(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}

impl From<serde_json::Error> for StealError {
    fn from(e: serde_json::Error) -> Self {
        StealError::InvalidInput(format!("malformed operation params: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, StealError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_classification() {
        assert!(StealError::InvalidInput("empty".into()).is_client_error());
        assert!(StealError::InvalidFormat("RIFF".into()).is_client_error());
        assert!(StealError::out_of_range("volume", "level", 3.0, 0.0..=2.0).is_client_error());
        assert!(StealError::UnknownOperation("reverb".into()).is_client_error());
        assert!(StealError::UnknownPreset("turbo".into()).is_client_error());
        assert!(StealError::UserNotFound("u1".into()).is_client_error());
    }

    #[test]
    fn server_classification() {
        assert!(!StealError::Processing("ffmpeg exited 1".into()).is_client_error());
        assert!(!StealError::Storage("locked".into()).is_client_error());
        assert_eq!(StealError::Processing("x".into()).status(), 500);
    }

    #[test]
    fn codes() {
        assert_eq!(StealError::Processing("x".into()).code(), "PROCESSING_ERROR");
        assert_eq!(StealError::UserNotFound("x".into()).code(), "USER_NOT_FOUND");
        assert_eq!(StealError::UserNotFound("x".into()).status(), 404);
        assert_eq!(
            StealError::out_of_range("speedup", "rate", 0.1, 0.25..=100.0).code(),
            "INVALID_PARAMETER"
        );
    }

    #[test]
    fn out_of_range_display() {
        let err = StealError::out_of_range("volume", "level", 2.5, 0.0..=2.0);
        assert_eq!(
            err.to_string(),
            "invalid parameter level for volume: 2.5 not in [0, 2]"
        );
    }
}

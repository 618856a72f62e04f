//! Error types for magecheck

use std::path::PathBuf;
use thiserror::Error;

/// magecheck error type
#[derive(Error, Debug)]
pub enum MagecheckError {
    /// Required pattern list does not exist
    #[error("pattern list not found: {}", .0.display())]
    PatternsNotFound(PathBuf),

    /// Pattern set has no usable fragments
    #[error("pattern set '{0}' is empty")]
    EmptyPatternSet(String),

    /// Fragment could not be compiled
    #[error("invalid pattern in '{set}': {reason}")]
    InvalidPattern {
        /// Pattern set name
        set: String,
        /// Compiler message
        reason: String,
    },

    /// Traffic log source does not exist
    #[error("traffic log not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Traffic log is structurally invalid
    #[error("invalid traffic log: {0}")]
    InvalidLog(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl MagecheckError {
    /// Problems with the pattern configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::PatternsNotFound(_) | Self::EmptyPatternSet(_) | Self::InvalidPattern { .. }
        )
    }

    /// Problems with the supplied traffic log
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::SourceNotFound(_) | Self::InvalidLog(_))
    }
}

/// Result type for magecheck
pub type Result<T> = std::result::Result<T, MagecheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_taxonomy() {
        assert!(MagecheckError::EmptyPatternSet("indicators".into()).is_config_error());
        assert!(MagecheckError::PatternsNotFound("url-patterns.txt".into()).is_config_error());
        assert!(MagecheckError::InvalidLog("missing entries".into()).is_input_error());
        assert!(!MagecheckError::InvalidLog("x".into()).is_config_error());
    }

    #[test]
    fn test_error_messages() {
        let err = MagecheckError::InvalidPattern {
            set: "indicators".into(),
            reason: "unclosed group".into(),
        };
        assert_eq!(err.to_string(), "invalid pattern in 'indicators': unclosed group");
    }
}

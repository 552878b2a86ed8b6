use thiserror::Error;

/// Errors produced while watching a page and driving recovery
#[derive(Debug, Error)]
pub enum RerunError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Script evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Failed to parse DOM snapshot: {0}")]
    DomParseFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Interaction '{method}' failed: {reason}")]
    InteractionFailed { method: String, reason: String },

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, RerunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_error_message() {
        let err = RerunError::InteractionFailed { method: "native".to_string(), reason: "detached".to_string() };
        assert_eq!(err.to_string(), "Interaction 'native' failed: detached");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: RerunError = parse.unwrap_err().into();
        assert!(matches!(err, RerunError::Json(_)));
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("Type mismatch in {operation}: {message}")]
    TypeMismatch { operation: String, message: String },

    #[error("Query returned {count} results where at most one was expected")]
    NonUniqueResult { count: usize },

    #[error("Unknown team: {name}")]
    UnknownTeam { name: String },

    #[error("Projection error: {message}")]
    ProjectionError { message: String },

    #[error("Store error: {message}")]
    StoreError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Query,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl QueryError {
    pub fn type_mismatch(operation: &str, message: impl Into<String>) -> Self {
        QueryError::TypeMismatch {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            QueryError::ConfigError { .. }
            | QueryError::ConfigValidationError { .. }
            | QueryError::InvalidConfigValueError { .. }
            | QueryError::MissingConfigError { .. }
            | QueryError::UnknownTeam { .. } => ErrorCategory::Configuration,
            QueryError::UnknownFunction { .. }
            | QueryError::TypeMismatch { .. }
            | QueryError::NonUniqueResult { .. }
            | QueryError::ProjectionError { .. } => ErrorCategory::Query,
            QueryError::StoreError { .. } => ErrorCategory::Storage,
            QueryError::IoError(_) | QueryError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Query => match self {
                // 多筆結果只是查詢條件不夠精確
                QueryError::NonUniqueResult { .. } => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            QueryError::IoError(e) => format!("Could not read or write a file: {}", e),
            QueryError::UnknownTeam { name } => {
                format!("Member fixture refers to team '{}' which is not defined", name)
            }
            QueryError::NonUniqueResult { count } => {
                format!("Expected a single member but found {}", count)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the fixture file and command line arguments",
            ErrorCategory::Query => "Narrow the search criteria or fix the query expression",
            ErrorCategory::Storage => "Retry the operation; the store may be in an inconsistent state",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let err = QueryError::MissingConfigError {
            field: "teams".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = QueryError::NonUniqueResult { count: 2 };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains('2'));
    }
}

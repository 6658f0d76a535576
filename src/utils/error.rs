use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Azure DevOps API returned {status}: {message}")]
    AzureDevOpsApi { status: u16, message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Remote,
    Authentication,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EstimatorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EstimatorError::Http(_) => ErrorCategory::Network,
            EstimatorError::AzureDevOpsApi { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Authentication
            }
            EstimatorError::AzureDevOpsApi { .. } => ErrorCategory::Remote,
            EstimatorError::Unauthorized { .. } => ErrorCategory::Authentication,
            EstimatorError::Serialization(_) => ErrorCategory::Data,
            EstimatorError::Io(_) => ErrorCategory::System,
            EstimatorError::ConfigError { .. }
            | EstimatorError::MissingConfigError { .. }
            | EstimatorError::InvalidConfigValueError { .. }
            | EstimatorError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 遠端暫時性錯誤，可重試
            ErrorCategory::Network | ErrorCategory::Remote => ErrorSeverity::Medium,
            ErrorCategory::Authentication | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity to dev.azure.com and retry",
            ErrorCategory::Remote => "Inspect the Azure DevOps response and retry later",
            ErrorCategory::Authentication => {
                "Verify the personal access token has Work Items (Read & Write) and Project (Read) scopes"
            }
            ErrorCategory::Configuration => "Review config.toml and the command line flags",
            ErrorCategory::Data => "Check that the work item fields hold numeric values",
            ErrorCategory::System => "Check file permissions and available resources",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EstimatorError::Http(e) if e.is_timeout() => {
                "Azure DevOps did not answer in time".to_string()
            }
            EstimatorError::Http(_) => "Could not reach Azure DevOps".to_string(),
            EstimatorError::AzureDevOpsApi { status, message } => {
                format!("Azure DevOps rejected the request ({}): {}", status, message)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EstimatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_auth_failures_are_authentication_errors() {
        let err = EstimatorError::AzureDevOpsApi {
            status: 401,
            message: "TF400813".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = EstimatorError::AzureDevOpsApi {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Remote);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = EstimatorError::MissingConfigError {
            field: "azure_devops.organization_url".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.to_string().contains("azure_devops.organization_url"));
    }

    #[test]
    fn test_user_friendly_message_includes_remote_detail() {
        let err = EstimatorError::AzureDevOpsApi {
            status: 400,
            message: "VS402337: bad field".to_string(),
        };
        assert_eq!(
            err.user_friendly_message(),
            "Azure DevOps rejected the request (400): VS402337: bad field"
        );
    }
}

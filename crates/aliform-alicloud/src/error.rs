//! Alibaba Cloud provider error types

use aliform_cloud::CloudError;
use thiserror::Error;

/// Error codes returned by the Alibaba Cloud APIs this provider reacts to
pub mod codes {
    pub const VPC_QUOTA_EXCEEDED: &str = "QuotaExceeded.Vpc";
    pub const TASK_CONFLICT: &str = "TaskConflict";
    pub const UNKNOWN_ERROR: &str = "UnknownError";
    pub const THROTTLING: &str = "Throttling";
    pub const OPERATION_CONFLICT: &str = "OperationConflict";
    pub const SERVICE_UNAVAILABLE: &str = "ServiceUnavailable";
    pub const DEPENDENCY_VIOLATION: &str = "DependencyViolation";
    pub const INCORRECT_VSWITCH_STATUS: &str = "IncorrectVSwitchStatus";

    pub const INVALID_VPC_ID_NOT_FOUND: &str = "InvalidVpcID.NotFound";
    pub const FORBIDDEN_VPC_NOT_FOUND: &str = "Forbidden.VpcNotFound";
    pub const INVALID_VSWITCH_ID_NOT_FOUND: &str = "InvalidVSwitchId.NotFound";
    pub const INVALID_DB_INSTANCE_ID_NOT_FOUND: &str = "InvalidDBInstanceId.NotFound";

    /// Codes meaning the addressed object does not exist
    pub const NOT_FOUND: &[&str] = &[
        INVALID_VPC_ID_NOT_FOUND,
        FORBIDDEN_VPC_NOT_FOUND,
        INVALID_VSWITCH_ID_NOT_FOUND,
        INVALID_DB_INSTANCE_ID_NOT_FOUND,
    ];
}

#[derive(Error, Debug)]
pub enum AlicloudError {
    #[error("[{code}] {action} failed: {message} (RequestId: {request_id})")]
    Api {
        action: String,
        code: String,
        message: String,
        request_id: String,
    },

    #[error("{resource} {id} does not exist")]
    NotFound { resource: &'static str, id: String },

    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<AlicloudError>,
    },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unexpected response from {action}: {message}")]
    UnexpectedResponse { action: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] CloudError),
}

impl AlicloudError {
    /// Wrap the error with a description of what was being attempted
    pub fn context(self, message: impl Into<String>) -> Self {
        AlicloudError::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// API error code, looking through context wrappers
    pub fn code(&self) -> Option<&str> {
        match self {
            AlicloudError::Api { code, .. } => Some(code),
            AlicloudError::Context { source, .. } => source.code(),
            _ => None,
        }
    }

    /// Whether the error is an API error carrying one of `codes`
    ///
    /// A code embedded in the message also matches; some services report
    /// the specific condition only there.
    pub fn is_expected_error(&self, codes: &[&str]) -> bool {
        match self {
            AlicloudError::Api { code, message, .. } => codes
                .iter()
                .any(|c| code.as_str() == *c || message.contains(*c)),
            AlicloudError::Context { source, .. } => source.is_expected_error(codes),
            _ => false,
        }
    }

    /// Whether the addressed object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            AlicloudError::NotFound { .. } => true,
            AlicloudError::Context { source, .. } => source.is_not_found(),
            other => other.is_expected_error(codes::NOT_FOUND),
        }
    }
}

impl From<AlicloudError> for CloudError {
    fn from(err: AlicloudError) -> Self {
        match err {
            AlicloudError::CloudError(inner) => inner,
            e @ AlicloudError::NotFound { .. } => CloudError::ResourceNotFound(e.to_string()),
            e @ (AlicloudError::MissingCredentials(_) | AlicloudError::InvalidConfig(_)) => {
                CloudError::InvalidConfig(e.to_string())
            }
            other => CloudError::ApiError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AlicloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: &str, message: &str) -> AlicloudError {
        AlicloudError::Api {
            action: "CreateVpc".to_string(),
            code: code.to_string(),
            message: message.to_string(),
            request_id: "req-1".to_string(),
        }
    }

    #[test]
    fn test_expected_error_matches_code_and_message() {
        let err = api_error(codes::THROTTLING, "Request was denied due to flow control.");
        assert!(err.is_expected_error(&[codes::TASK_CONFLICT, codes::THROTTLING]));
        assert!(!err.is_expected_error(&[codes::TASK_CONFLICT]));

        let err = api_error("Forbidden", "The VPC is in TaskConflict state");
        assert!(err.is_expected_error(&[codes::TASK_CONFLICT]));
    }

    #[test]
    fn test_not_found_through_context() {
        let err = api_error(codes::INVALID_VPC_ID_NOT_FOUND, "not found").context("DeleteVpc");
        assert!(err.is_not_found());
        assert_eq!(err.code(), Some(codes::INVALID_VPC_ID_NOT_FOUND));

        let err = AlicloudError::NotFound {
            resource: "Vpc",
            id: "vpc-1".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!api_error(codes::THROTTLING, "slow down").is_not_found());
    }

    #[test]
    fn test_into_cloud_error() {
        let err: CloudError = AlicloudError::CloudError(CloudError::Timeout("x".into())).into();
        assert!(matches!(err, CloudError::Timeout(_)));

        let err: CloudError = api_error(codes::UNKNOWN_ERROR, "boom").into();
        match err {
            CloudError::ApiError(msg) => assert!(msg.contains("UnknownError")),
            other => panic!("unexpected {:?}", other),
        }
    }
}

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Structural config error in {path}: {reason}")]
    StructuralConfig { path: PathBuf, reason: String },

    #[error("Packaging {path} failed: {reason}")]
    Packaging { path: PathBuf, reason: String },

    #[error("Service '{service}' is missing required credential '{field}'")]
    MissingCredentialField { service: String, field: String },

    #[error("Invalid version '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },

    #[error("Service binding error: {message}")]
    ServiceBindings { message: String },

    #[error("Runtime extraction from {path} failed: {reason}")]
    Extraction { path: PathBuf, reason: String },

    #[error("Linking library {path} failed: {reason}")]
    LibraryLink { path: PathBuf, reason: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Runtime,
    Packaging,
    Credentials,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DeployError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DeployError::ConfigError { .. }
            | DeployError::MissingConfigError { .. }
            | DeployError::InvalidConfigValueError { .. }
            | DeployError::InvalidVersion { .. }
            | DeployError::ServiceBindings { .. }
            | DeployError::SerializationError(_) => ErrorCategory::Configuration,
            DeployError::StructuralConfig { .. }
            | DeployError::XmlError(_)
            | DeployError::Extraction { .. }
            | DeployError::LibraryLink { .. } => ErrorCategory::Runtime,
            DeployError::Packaging { .. } | DeployError::ZipError(_) => ErrorCategory::Packaging,
            DeployError::MissingCredentialField { .. } => ErrorCategory::Credentials,
            DeployError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Credentials => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Runtime | ErrorCategory::Packaging => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DeployError::StructuralConfig { .. } | DeployError::XmlError(_) => {
                "Check that the runtime archive ships conf/server.xml and conf/context.xml with <Server> and <Context> roots"
            }
            DeployError::Packaging { .. } | DeployError::ZipError(_) => {
                "Check free disk space and write permission on the sandbox deploy directory"
            }
            DeployError::MissingCredentialField { .. } => {
                "Re-bind the database service so its credentials carry jdbcUrl, hostname, username and password"
            }
            DeployError::InvalidVersion { .. } => {
                "Use a three-part runtime version such as 7.0.50 or 8.0.30"
            }
            DeployError::ServiceBindings { .. } | DeployError::SerializationError(_) => {
                "Make sure VCAP_SERVICES (or the configured vcap_file) contains valid JSON"
            }
            DeployError::Extraction { .. } => {
                "Verify the runtime archive is a readable .tar.gz with a single top-level directory"
            }
            DeployError::LibraryLink { .. } => {
                "Verify the additional library paths exist and the application WEB-INF is writable"
            }
            DeployError::ConfigError { .. }
            | DeployError::MissingConfigError { .. }
            | DeployError::InvalidConfigValueError { .. } => {
                "Review provision.toml and the command line arguments"
            }
            DeployError::IoError(_) => "Check file system permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DeployError::StructuralConfig { path, .. } => {
                format!("Tomcat configuration {} is malformed", path.display())
            }
            DeployError::Packaging { path, .. } => {
                format!("Could not package the application into {}", path.display())
            }
            DeployError::MissingCredentialField { service, field } => {
                format!("Service '{}' has no '{}' credential", service, field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_are_medium_severity() {
        let err = DeployError::MissingCredentialField {
            service: "lf-mysqldb-1".to_string(),
            field: "password".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Credentials);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("password"));
    }

    #[test]
    fn test_io_errors_are_critical() {
        let err = DeployError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_structural_error_message_names_file() {
        let err = DeployError::StructuralConfig {
            path: PathBuf::from("conf/server.xml"),
            reason: "no <Server> root".to_string(),
        };
        assert!(err.user_friendly_message().contains("conf/server.xml"));
        assert!(err.to_string().contains("no <Server> root"));
    }
}

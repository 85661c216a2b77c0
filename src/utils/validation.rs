use crate::domain::model::Version;
use crate::utils::error::{DeployError, Result};
use regex::Regex;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| DeployError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 應用名稱會成為 deploy/ 底下的檔名，不可含路徑分隔符
pub fn validate_file_stem(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty_string(field_name, value)?;
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be a plain file name".to_string(),
        });
    }
    Ok(())
}

pub fn validate_version(field_name: &str, value: &str) -> Result<Version> {
    value.parse::<Version>().map_err(|e| DeployError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

pub fn validate_regex(field_name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| DeployError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: pattern.to_string(),
        reason: format!("Invalid regular expression: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("sandbox.root", "/tmp/sandbox").is_ok());
        assert!(validate_path("sandbox.root", "").is_err());
        assert!(validate_path("sandbox.root", "  ").is_err());
        assert!(validate_path("sandbox.root", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_file_stem() {
        assert!(validate_file_stem("application.name", "portal").is_ok());
        assert!(validate_file_stem("application.name", "a/b").is_err());
        assert!(validate_file_stem("application.name", "..").is_err());
    }

    #[test]
    fn test_validate_version() {
        assert_eq!(
            validate_version("runtime.version", "7.0.50").unwrap(),
            Version::new(7, 0, 50)
        );
        assert!(validate_version("runtime.version", "7.0").is_err());
    }

    #[test]
    fn test_validate_regex() {
        assert!(validate_regex("services.filter", "lf-mysqldb").is_ok());
        assert!(validate_regex("services.filter", "lf-(mysql").is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let present = Some("x".to_string());
        let absent: Option<String> = None;
        assert!(validate_required_field("application.root", &present).is_ok());
        assert!(matches!(
            validate_required_field("application.root", &absent),
            Err(DeployError::MissingConfigError { .. })
        ));
    }
}

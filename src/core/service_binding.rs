use crate::domain::model::ServiceBinding;
use crate::utils::error::{DeployError, Result};
use regex::Regex;
use std::path::Path;

/// Liferay 的 MySQL 服務名稱樣式
pub const MYSQL_SERVICE_FILTER: &str = "lf-mysqldb";

pub const VCAP_SERVICES_ENV: &str = "VCAP_SERVICES";

pub const VCAP_APPLICATION_ENV: &str = "VCAP_APPLICATION";

/// 找出第一個 name、label 或任一 tag 符合 `filter` 的服務。
///
/// 比對是 regex 搜尋 (區分大小寫、子字串即可)，不是完全相等。
pub fn find_service<'a>(bindings: &'a [ServiceBinding], filter: &Regex) -> Option<&'a ServiceBinding> {
    bindings.iter().find(|binding| {
        filter.is_match(&binding.name)
            || filter.is_match(&binding.label)
            || binding.tags.iter().any(|tag| filter.is_match(tag))
    })
}

/// 解析 VCAP_SERVICES 格式的 JSON：`{ "<label>": [ { "name": ..., "credentials": {...} } ] }`。
///
/// 回傳順序與文件相同 (label 之間、同一 label 內皆是)。
pub fn parse_vcap_services(content: &str) -> Result<Vec<ServiceBinding>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let grouped: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(content).map_err(|e| DeployError::ServiceBindings {
            message: format!("invalid VCAP_SERVICES document: {}", e),
        })?;

    let mut bindings = Vec::new();
    for (label, services) in grouped {
        let services: Vec<ServiceBinding> =
            serde_json::from_value(services).map_err(|e| DeployError::ServiceBindings {
                message: format!("invalid services under '{}': {}", label, e),
            })?;
        for mut service in services {
            if service.label.is_empty() {
                service.label = label.clone();
            }
            bindings.push(service);
        }
    }
    Ok(bindings)
}

/// 從檔案讀取服務綁定；沒有指定檔案時改讀 `VCAP_SERVICES` 環境變數
pub fn load_service_bindings(vcap_file: Option<&Path>) -> Result<Vec<ServiceBinding>> {
    match vcap_file {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| DeployError::ServiceBindings {
                message: format!("cannot read {}: {}", path.display(), e),
            })?;
            parse_vcap_services(&content)
        }
        None => match std::env::var(VCAP_SERVICES_ENV) {
            Ok(content) => parse_vcap_services(&content),
            Err(_) => {
                tracing::debug!("{} is not set, assuming no bound services", VCAP_SERVICES_ENV);
                Ok(Vec::new())
            }
        },
    }
}

/// 從 VCAP_APPLICATION 格式的 JSON 取出 `application_name`；沒有或是空字串時回傳 None
pub fn parse_application_name(content: &str) -> Result<Option<String>> {
    if content.trim().is_empty() {
        return Ok(None);
    }

    let details: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(content).map_err(|e| DeployError::ConfigError {
            message: format!("invalid {} document: {}", VCAP_APPLICATION_ENV, e),
        })?;

    Ok(details
        .get("application_name")
        .and_then(|name| name.as_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Credentials;

    fn filter() -> Regex {
        Regex::new(MYSQL_SERVICE_FILTER).unwrap()
    }

    #[test]
    fn test_find_service_by_name_substring() {
        let bindings = vec![
            ServiceBinding::new("redis-cache", Credentials::default()),
            ServiceBinding::new("lf-mysqldb-1", Credentials::default()),
            ServiceBinding::new("lf-mysqldb-2", Credentials::default()),
        ];

        let found = find_service(&bindings, &filter()).unwrap();
        assert_eq!(found.name, "lf-mysqldb-1");
    }

    #[test]
    fn test_find_service_by_label_or_tag() {
        let mut by_label = ServiceBinding::new("primary-db", Credentials::default());
        by_label.label = "lf-mysqldb".to_string();
        assert!(find_service(&[by_label], &filter()).is_some());

        let mut by_tag = ServiceBinding::new("primary-db", Credentials::default());
        by_tag.tags = vec!["mysql".to_string(), "lf-mysqldb".to_string()];
        assert!(find_service(&[by_tag], &filter()).is_some());
    }

    #[test]
    fn test_find_service_is_case_sensitive() {
        let bindings = vec![ServiceBinding::new("LF-MYSQLDB", Credentials::default())];
        assert!(find_service(&bindings, &filter()).is_none());
    }

    #[test]
    fn test_find_service_no_match() {
        assert!(find_service(&[], &filter()).is_none());
        let bindings = vec![ServiceBinding::new("postgres", Credentials::default())];
        assert!(find_service(&bindings, &filter()).is_none());
    }

    #[test]
    fn test_parse_vcap_services() {
        let content = r#"{
            "user-provided": [
                {
                    "name": "lf-mysqldb-1",
                    "tags": [],
                    "credentials": {
                        "jdbcUrl": "jdbc:mysql://h/db",
                        "hostname": "h",
                        "port": 3306,
                        "username": "u",
                        "password": "p"
                    }
                }
            ],
            "cleardb": [
                { "name": "other", "credentials": {} }
            ]
        }"#;

        let bindings = parse_vcap_services(content).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].label, "user-provided");
        assert_eq!(bindings[1].label, "cleardb");

        let mysql = find_service(&bindings, &filter()).unwrap();
        assert_eq!(
            mysql.credentials.get_string("jdbcUrl").as_deref(),
            Some("jdbc:mysql://h/db")
        );
        assert_eq!(mysql.credentials.get_string("port").as_deref(), Some("3306"));
    }

    #[test]
    fn test_first_match_follows_document_order_across_labels() {
        let content = r#"{
            "zz-provider": [{ "name": "lf-mysqldb-primary" }],
            "aa-provider": [{ "name": "lf-mysqldb-secondary" }]
        }"#;

        let bindings = parse_vcap_services(content).unwrap();
        let labels: Vec<&str> = bindings.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["zz-provider", "aa-provider"]);

        let found = find_service(&bindings, &filter()).unwrap();
        assert_eq!(found.name, "lf-mysqldb-primary");
    }

    #[test]
    fn test_parse_services_with_wrong_shape() {
        let err = parse_vcap_services(r#"{"p-mysql": {"name": "lf-mysqldb-1"}}"#).unwrap_err();
        assert!(err.to_string().contains("p-mysql"));
    }

    #[test]
    fn test_parse_empty_vcap_services() {
        assert!(parse_vcap_services("").unwrap().is_empty());
        assert!(parse_vcap_services("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_vcap_services() {
        let err = parse_vcap_services("[1, 2]").unwrap_err();
        assert!(matches!(err, DeployError::ServiceBindings { .. }));
    }

    #[test]
    fn test_parse_application_name() {
        let content = r#"{"application_id": "f1d2", "application_name": "liferay-portal", "space_name": "dev"}"#;
        assert_eq!(
            parse_application_name(content).unwrap().as_deref(),
            Some("liferay-portal")
        );

        assert_eq!(parse_application_name("").unwrap(), None);
        assert_eq!(parse_application_name(r#"{"name": "other"}"#).unwrap(), None);
        assert_eq!(parse_application_name(r#"{"application_name": ""}"#).unwrap(), None);
        assert!(matches!(
            parse_application_name("not json"),
            Err(DeployError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_load_service_bindings_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{"p-mysql": [{"name": "lf-mysqldb-1", "credentials": {"username": "u"}}]}"#,
        )
        .unwrap();

        let bindings = load_service_bindings(Some(file.path())).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].label, "p-mysql");
    }
}

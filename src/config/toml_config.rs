use crate::core::provisioner::ProvisionRequest;
use crate::core::service_binding::{
    load_service_bindings, parse_application_name, MYSQL_SERVICE_FILTER, VCAP_APPLICATION_ENV,
};
use crate::domain::model::{ApplicationDetails, SandboxLayout};
use crate::utils::error::{DeployError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// provision.toml 的內容；每個欄位都可以由命令列覆寫
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub application: ApplicationConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub libraries: LibrariesConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub version: Option<String>,
    pub archive: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub root: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    pub root: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub vcap_file: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcesConfig {
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrariesConfig {
    #[serde(default)]
    pub additional: Vec<String>,
}

impl ProvisionConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DeployError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DeployError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DB_PASSWORD})；未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DeployError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn service_filter(&self) -> &str {
        self.services
            .filter
            .as_deref()
            .unwrap_or(MYSQL_SERVICE_FILTER)
    }

    /// war 的名稱：設定值優先，其次是 VCAP_APPLICATION 的 `application_name`，最後才用應用根目錄的名稱
    pub fn application_name(&self) -> Result<String> {
        let vcap_application = std::env::var(VCAP_APPLICATION_ENV).ok();
        self.resolve_application_name(vcap_application.as_deref())
    }

    fn resolve_application_name(&self, vcap_application: Option<&str>) -> Result<String> {
        if let Some(name) = &self.application.name {
            return Ok(name.clone());
        }
        if let Some(name) = vcap_application.map(parse_application_name).transpose()?.flatten() {
            return Ok(name);
        }

        self.application
            .root
            .as_deref()
            .and_then(|root| Path::new(root).file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DeployError::MissingConfigError {
                field: "application.name".to_string(),
            })
    }

    /// 驗證並組出 ProvisionRequest；服務綁定在此讀入
    pub fn to_request(&self) -> Result<ProvisionRequest> {
        self.validate()?;

        let version = validation::validate_version(
            "runtime.version",
            validation::validate_required_field("runtime.version", &self.runtime.version)?,
        )?;
        let archive = validation::validate_required_field("runtime.archive", &self.runtime.archive)?;
        let root = validation::validate_required_field("application.root", &self.application.root)?;
        let sandbox = validation::validate_required_field("sandbox.root", &self.sandbox.root)?;
        let name = self.application_name()?;
        let service_filter = validation::validate_regex("services.filter", self.service_filter())?;

        let vcap_file = self.services.vcap_file.as_deref().map(Path::new);
        let services = load_service_bindings(vcap_file)?;

        Ok(ProvisionRequest {
            version,
            runtime_archive: PathBuf::from(archive),
            application: ApplicationDetails::new(root, &name, services),
            sandbox: SandboxLayout::new(sandbox),
            service_filter,
            additional_libraries: self.libraries.additional.iter().map(PathBuf::from).collect(),
        })
    }
}

impl Validate for ProvisionConfig {
    fn validate(&self) -> Result<()> {
        let version = validation::validate_required_field("runtime.version", &self.runtime.version)?;
        validation::validate_version("runtime.version", version)?;

        let archive = validation::validate_required_field("runtime.archive", &self.runtime.archive)?;
        validation::validate_path("runtime.archive", archive)?;

        let root = validation::validate_required_field("application.root", &self.application.root)?;
        validation::validate_path("application.root", root)?;

        let sandbox = validation::validate_required_field("sandbox.root", &self.sandbox.root)?;
        validation::validate_path("sandbox.root", sandbox)?;

        validation::validate_file_stem("application.name", &self.application_name()?)?;

        validation::validate_regex("services.filter", self.service_filter())?;

        if let Some(vcap_file) = &self.services.vcap_file {
            validation::validate_path("services.vcap_file", vcap_file)?;
        }
        if let Some(directory) = &self.resources.directory {
            validation::validate_path("resources.directory", directory)?;
        }
        for library in &self.libraries.additional {
            validation::validate_path("libraries.additional", library)?;
        }

        Ok(())
    }
}

use crate::utils::error::DeployError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 三段式版本號 (major.minor.patch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn is_below(&self, boundary: &Version) -> bool {
        self < boundary
    }
}

impl FromStr for Version {
    type Err = DeployError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| DeployError::InvalidVersion {
            value: value.to_string(),
            reason,
        };

        let parts: Vec<&str> = value.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(invalid(format!(
                "expected 3 components, found {}",
                parts.len()
            )));
        }

        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| invalid(format!("'{}' is not a number", part)))?;
        }

        Ok(Version::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// 服務憑證；Debug 輸出會遮蔽密碼
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(pub BTreeMap<String, serde_json::Value>);

impl Credentials {
    /// 取出字串欄位；數字欄位 (例如 port) 轉成字串
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0
            .insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Credentials {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut credentials = Credentials::default();
        for (key, value) in pairs {
            credentials.insert(key, value);
        }
        credentials
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.0 {
            if key.to_ascii_lowercase().contains("password") {
                map.entry(key, &"***");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

/// VCAP_SERVICES 中的單一服務綁定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceBinding {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub credentials: Credentials,
}

impl ServiceBinding {
    pub fn new(name: &str, credentials: Credentials) -> Self {
        Self {
            name: name.to_string(),
            label: String::new(),
            tags: Vec::new(),
            credentials,
        }
    }
}

/// 要部署的應用 (已展開的 war 目錄)
#[derive(Debug, Clone)]
pub struct ApplicationDetails {
    pub root: PathBuf,
    pub name: String,
    pub services: Vec<ServiceBinding>,
}

impl ApplicationDetails {
    pub fn new(root: impl Into<PathBuf>, name: &str, services: Vec<ServiceBinding>) -> Self {
        Self {
            root: root.into(),
            name: name.to_string(),
            services,
        }
    }

    pub fn web_inf_lib(&self) -> PathBuf {
        self.root.join("WEB-INF").join("lib")
    }
}

/// Tomcat sandbox 的固定目錄結構
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxLayout {
    root: PathBuf,
}

impl SandboxLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn conf_dir(&self) -> PathBuf {
        self.root.join("conf")
    }

    pub fn server_xml(&self) -> PathBuf {
        self.conf_dir().join("server.xml")
    }

    pub fn context_xml(&self) -> PathBuf {
        self.conf_dir().join("context.xml")
    }

    pub fn webapps_root(&self) -> PathBuf {
        self.root.join("webapps").join("ROOT")
    }

    pub fn portal_ext_properties(&self) -> PathBuf {
        self.webapps_root()
            .join("WEB-INF")
            .join("classes")
            .join("portal-ext.properties")
    }

    pub fn deploy_dir(&self) -> PathBuf {
        self.root.join("deploy")
    }

    pub fn artifact_path(&self, application_name: &str) -> PathBuf {
        self.deploy_dir().join(format!("{}.war", application_name))
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    pub fn datasource_jar(&self) -> PathBuf {
        self.lib_dir().join("tomcat-jdbc.jar")
    }
}

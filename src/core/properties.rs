use crate::domain::model::ServiceBinding;
use crate::utils::error::{DeployError, Result};
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const MYSQL_DRIVER: &str = "com.mysql.jdbc.Driver";

const POOL_SETTINGS: [(&str, &str); 7] = [
    ("jdbc.default.acquireIncrement", "5"),
    (
        "jdbc.default.connectionCustomizerClassName",
        "com.liferay.portal.dao.jdbc.pool.c3p0.PortalConnectionCustomizer",
    ),
    ("jdbc.default.idleConnectionTestPeriod", "60"),
    ("jdbc.default.maxIdleTime", "3600"),
    ("jdbc.default.maxPoolSize", "20"),
    ("jdbc.default.minPoolSize", "10"),
    ("jdbc.default.numHelperThreads", "3"),
];

const AUTO_DEPLOY_SETTINGS: [(&str, &str); 3] = [
    ("auto.deploy.dest.dir", "${catalina.home}/deploy"),
    ("auto.deploy.dir", "${catalina.home}/deploy"),
    ("auto.deploy.deploy.dir", "${catalina.home}/deploy"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertiesOutcome {
    Created,
    /// 檔案已存在 (手動修改或先前產生)，不覆寫
    Skipped,
}

/// 從服務憑證取出的 MySQL 連線資訊
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub jdbc_url: String,
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("jdbc_url", &self.jdbc_url)
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl DatabaseCredentials {
    /// 四個欄位 (jdbcUrl、hostname、username、password) 缺一不可
    pub fn from_binding(binding: &ServiceBinding) -> Result<Self> {
        let field = |key: &str| {
            binding
                .credentials
                .get_string(key)
                .ok_or_else(|| DeployError::MissingCredentialField {
                    service: binding.name.clone(),
                    field: key.to_string(),
                })
        };

        Ok(Self {
            jdbc_url: field("jdbcUrl")?,
            hostname: field("hostname")?,
            username: field("username")?,
            password: field("password")?,
        })
    }
}

/// 產生 portal-ext.properties 的內容，順序固定
pub fn render_portal_ext(credentials: &DatabaseCredentials) -> String {
    let mut out = String::new();

    section(&mut out, "MySQL");
    entry(&mut out, "jdbc.default.driverClassName", MYSQL_DRIVER);
    entry(&mut out, "jdbc.default.url", &escape_value(&credentials.jdbc_url));
    entry(&mut out, "jdbc.default.username", &escape_value(&credentials.username));
    entry(&mut out, "jdbc.default.password", &escape_value(&credentials.password));

    section(&mut out, "Configuration Connection Pool");
    for (key, value) in POOL_SETTINGS {
        entry(&mut out, key, value);
    }

    section(&mut out, "Configuration of the auto deploy folder");
    for (key, value) in AUTO_DEPLOY_SETTINGS {
        entry(&mut out, key, value);
    }

    out
}

/// 只有在 `path` 不存在時才寫入；檔案本身就是「已設定過」的標記。
pub fn write_if_absent(path: &Path, binding: &ServiceBinding) -> Result<PropertiesOutcome> {
    if path.exists() {
        tracing::info!(
            "{} already exists, skipping MySQL configuration",
            path.display()
        );
        return Ok(PropertiesOutcome::Skipped);
    }

    let credentials = DatabaseCredentials::from_binding(binding)?;
    tracing::debug!("Resolved credentials from '{}': {:?}", binding.name, credentials);

    let parent = path.parent().ok_or_else(|| DeployError::ConfigError {
        message: format!("{} has no parent directory", path.display()),
    })?;
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(render_portal_ext(&credentials).as_bytes())?;
    temp.as_file().sync_all()?;

    match temp.persist_noclobber(path) {
        Ok(_) => Ok(PropertiesOutcome::Created),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            tracing::info!("{} appeared concurrently, keeping it", path.display());
            Ok(PropertiesOutcome::Skipped)
        }
        Err(e) => Err(e.error.into()),
    }
}

/// java.util.Properties 的值跳脫規則 (鍵不受影響)。
///
/// `Properties.load(InputStream)` 以 ISO-8859-1 讀檔，所以 ASCII 以外的字元
/// 一律寫成 `\uXXXX` (超出 BMP 的字元拆成 UTF-16 代理對)。
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (index, c) in value.chars().enumerate() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{0c}' => escaped.push_str("\\f"),
            ' ' if index == 0 => escaped.push_str("\\ "),
            ' '..='~' => escaped.push(c),
            other => {
                let mut units = [0u16; 2];
                for unit in other.encode_utf16(&mut units) {
                    let _ = write!(escaped, "\\u{:04X}", unit);
                }
            }
        }
    }
    escaped
}

fn section(out: &mut String, title: &str) {
    let _ = write!(out, "#\n# {}\n#\n", title);
}

fn entry(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "{}={}", key, value);
}

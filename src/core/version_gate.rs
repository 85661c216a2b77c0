use crate::domain::model::Version;

/// Tomcat 8 起 context.xml 的 allowLinking 移到 `<Resources>`，JasperListener 也被移除
pub const TOMCAT_8: Version = Version::new(8, 0, 0);

pub fn is_below(version: &Version, boundary: &Version) -> bool {
    version.is_below(boundary)
}

/// 依版本選定一次的設定檔 schema，之後傳給每個改寫點
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSchema {
    /// Tomcat 7 及更早：`<Context allowLinking="true">` + JasperListener
    Legacy,
    /// Tomcat 8+：`<Resources allowLinking="true"/>`，不加 listener
    Modern,
}

impl ConfigSchema {
    pub fn for_version(version: &Version) -> Self {
        if is_below(version, &TOMCAT_8) {
            ConfigSchema::Legacy
        } else {
            ConfigSchema::Modern
        }
    }

    pub fn needs_jasper_listener(&self) -> bool {
        matches!(self, ConfigSchema::Legacy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_below_boundary() {
        for version in ["0.0.0", "6.0.45", "7.0.50", "7.99.99"] {
            let version: Version = version.parse().unwrap();
            assert_eq!(ConfigSchema::for_version(&version), ConfigSchema::Legacy);
        }
    }

    #[test]
    fn test_schema_at_and_above_boundary() {
        for version in ["8.0.0", "8.0.30", "8.5.11", "9.0.1", "10.1.0"] {
            let version: Version = version.parse().unwrap();
            assert_eq!(ConfigSchema::for_version(&version), ConfigSchema::Modern);
        }
    }

    #[test]
    fn test_jasper_listener_only_for_legacy() {
        assert!(ConfigSchema::Legacy.needs_jasper_listener());
        assert!(!ConfigSchema::Modern.needs_jasper_listener());
    }

    #[test]
    fn test_is_below_is_strict() {
        assert!(!is_below(&TOMCAT_8, &TOMCAT_8));
        assert!(is_below(&Version::new(7, 0, 0), &TOMCAT_8));
    }
}

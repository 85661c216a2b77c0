use crate::config::toml_config::ProvisionConfig;
use clap::Parser;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "liferay-provision")]
#[command(about = "Provision a Tomcat sandbox for a Liferay portal deployment")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Resolved Tomcat version (major.minor.patch)
    #[arg(long = "tomcat-version")]
    pub tomcat_version: Option<String>,

    /// Downloaded Tomcat .tar.gz
    #[arg(long)]
    pub archive: Option<String>,

    #[arg(long)]
    pub app_root: Option<String>,

    #[arg(long)]
    pub app_name: Option<String>,

    #[arg(long)]
    pub sandbox: Option<String>,

    /// VCAP_SERVICES JSON file (defaults to the VCAP_SERVICES variable)
    #[arg(long)]
    pub vcap_file: Option<String>,

    /// Directory copied over the sandbox after extraction
    #[arg(long)]
    pub resources: Option<String>,

    /// Extra jars linked into WEB-INF/lib
    #[arg(long, value_delimiter = ',')]
    pub libraries: Vec<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,

    /// Show what would be done without touching the file system
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// 命令列的值覆寫設定檔
    pub fn apply_to(&self, config: &mut ProvisionConfig) {
        override_with(&mut config.runtime.version, &self.tomcat_version);
        override_with(&mut config.runtime.archive, &self.archive);
        override_with(&mut config.application.root, &self.app_root);
        override_with(&mut config.application.name, &self.app_name);
        override_with(&mut config.sandbox.root, &self.sandbox);
        override_with(&mut config.services.vcap_file, &self.vcap_file);
        override_with(&mut config.resources.directory, &self.resources);
        if !self.libraries.is_empty() {
            config.libraries.additional = self.libraries.clone();
        }
    }
}

fn override_with(target: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value {
        *target = Some(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = CliConfig::parse_from([
            "liferay-provision",
            "--tomcat-version",
            "8.0.30",
            "--app-root",
            "/app",
            "--libraries",
            "a.jar,b.jar",
            "--dry-run",
        ]);

        assert_eq!(cli.tomcat_version.as_deref(), Some("8.0.30"));
        assert_eq!(cli.libraries, vec!["a.jar", "b.jar"]);
        assert!(cli.dry_run);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config = ProvisionConfig::default();
        config.runtime.version = Some("7.0.50".to_string());
        config.sandbox.root = Some("/from/file".to_string());

        let cli = CliConfig {
            tomcat_version: Some("8.0.30".to_string()),
            ..Default::default()
        };
        cli.apply_to(&mut config);

        assert_eq!(config.runtime.version.as_deref(), Some("8.0.30"));
        assert_eq!(config.sandbox.root.as_deref(), Some("/from/file"));
    }
}

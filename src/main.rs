use anyhow::Context;
use clap::Parser;
use liferay_provision::utils::error::ErrorSeverity;
use liferay_provision::utils::{logger, validation::Validate};
use liferay_provision::{CliConfig, ProvisionConfig, Provisioner};

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_logger(cli.verbose, cli.json_logs);

    tracing::info!("Starting liferay-provision");

    // 載入設定檔，再套用命令列覆寫
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            ProvisionConfig::from_file(path)
                .with_context(|| format!("failed to load config file '{}'", path))?
        }
        None => ProvisionConfig::default(),
    };
    cli.apply_to(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let request = match config.to_request() {
        Ok(request) => request,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let provisioner = Provisioner::with_filesystem(config.resources.directory.clone().map(Into::into));

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No files will be written");
        let plan = provisioner.plan(&request);
        println!("Config schema:   {:?}", plan.schema);
        println!("Artifact:        {}", plan.artifact.display());
        match &plan.service {
            Some(service) if plan.properties_exists => println!(
                "Service:         {} ({} exists, would skip)",
                service,
                plan.properties_path.display()
            ),
            Some(service) => println!(
                "Service:         {} (would create {})",
                service,
                plan.properties_path.display()
            ),
            None => println!("Service:         none matching '{}'", request.service_filter),
        }
        for library in &plan.libraries {
            println!("Library:         {}", library.display());
        }
        return Ok(());
    }

    match provisioner.run(&request) {
        Ok(report) => {
            println!("✅ Tomcat sandbox ready at {}", request.sandbox.root().display());
            println!("📦 Artifact: {}", report.artifact.display());
        }
        Err(e) => {
            tracing::error!(
                "❌ Provisioning failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 依錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

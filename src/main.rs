use clap::Parser;
use sit_publisher::utils::{logger, validation::Validate};
use sit_publisher::{
    CliConfig, HttpComplianceClient, LocalStorage, PublishEngine, PublishError, PublisherConfig,
};

fn fail(e: &PublishError) -> ! {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        e.phase(),
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting sit-publish");
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = cli.validate() {
        fail(&e);
    }

    let root = cli.root_dir();
    let config_path = cli.config_path();
    tracing::info!("📁 Repository root: {}", root.display());
    tracing::info!("📁 Loading configuration from: {}", config_path.display());

    let config = match PublisherConfig::from_file(&config_path).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    let options = cli.run_options(config.publish.fallback_to_import);
    tracing::debug!("Run options: {:?}", options);

    let service = match HttpComplianceClient::from_config(&config) {
        Ok(service) => service,
        Err(e) => fail(&e),
    };

    let storage = LocalStorage::new(root);
    let engine = PublishEngine::new(storage, service, config, options);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ sit-publish completed successfully!");
            print!("{}", summary);
        }
        Err(e) => fail(&e),
    }
}

use clap::Parser;
use ifsc_finder::app::dashboard;
use ifsc_finder::app::shutdown::shutdown_signal;
use ifsc_finder::utils::logger;
use ifsc_finder::{
    BotEngine, BotSettings, CliConfig, CsvQueryLog, IfscDirectory, IfscError, LocalStorage,
    TelegramClient, TomlConfig,
};

fn resolve_settings(cli: &CliConfig) -> Result<BotSettings, IfscError> {
    match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let mut config = TomlConfig::from_file(path)?;
            // 應用命令列覆蓋設定
            config.apply_cli_overrides(cli);
            BotSettings::from_provider(&config)
        }
        None => BotSettings::from_provider(cli),
    }
}

fn exit_with(e: &IfscError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(cli.verbose, cli.json_logs);

    tracing::info!("🚀 Starting IFSC Finder bot");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let settings = match resolve_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => exit_with(&e),
    };
    tracing::info!("✅ Configuration loaded and validated successfully");

    let storage = LocalStorage::default();
    let directory = match IfscDirectory::load(&storage, &settings.dataset_path).await {
        Ok(directory) if !directory.is_empty() => directory,
        Ok(_) => exit_with(&IfscError::DatasetError {
            message: format!("'{}' contains no branches", settings.dataset_path),
        }),
        Err(e) => exit_with(&e),
    };

    if let Some(port) = settings.health_port {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
        tracing::info!("🩺 Health endpoint listening on port {}", port);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, dashboard::health_router()).await {
                tracing::error!("❌ Health server stopped: {}", e);
            }
        });
    }

    let client = TelegramClient::new(&settings.api_base_url, &settings.token)?;
    match client.get_me().await {
        Ok(me) => tracing::info!(
            "🤖 Authorized as @{}",
            me.get("username").and_then(|u| u.as_str()).unwrap_or("unknown")
        ),
        Err(e) if e.is_retryable() => {
            tracing::warn!("⚠️ Could not verify bot token yet: {}", e);
        }
        Err(e) => exit_with(&e),
    }

    let query_log = CsvQueryLog::open(settings.query_log_path.clone());
    tracing::info!("📝 Query log: {}", query_log.path());

    let mut engine = BotEngine::new(client, query_log, directory, settings.conversation.clone())
        .with_polling(settings.poll_timeout_seconds, settings.retry_delay);

    if let Err(e) = engine.run(shutdown_signal()).await {
        exit_with(&e);
    }

    Ok(())
}

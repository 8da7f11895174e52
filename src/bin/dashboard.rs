use clap::Parser;
use ifsc_finder::app::dashboard::{self, SharedQueryLog};
use ifsc_finder::app::shutdown::shutdown_signal;
use ifsc_finder::config::DEFAULT_QUERY_LOG_PATH;
use ifsc_finder::utils::logger;
use ifsc_finder::utils::validation::{self, Validate};
use ifsc_finder::{CsvQueryLog, IfscError};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "ifsc-dashboard")]
#[command(about = "Web dashboard for the IFSC Finder query log")]
struct Args {
    /// Query log CSV written by the bot
    #[arg(long, default_value = DEFAULT_QUERY_LOG_PATH)]
    query_log: String,

    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    json_logs: bool,
}

impl Validate for Args {
    fn validate(&self) -> ifsc_finder::Result<()> {
        validation::validate_path("query_log", &self.query_log)?;
        validation::validate_non_empty_string("host", &self.host)?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    logger::init_logger(args.verbose, args.json_logs);
    tracing::info!("🚀 Starting IFSC Finder dashboard");

    if let Err(e) = args.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let query_log: SharedQueryLog = Arc::new(CsvQueryLog::open(args.query_log.clone()));
    let app = dashboard::router(query_log);

    let listener = match tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            let e = IfscError::IoError(e);
            tracing::error!("❌ Could not bind {}:{}: {}", args.host, args.port, e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };
    tracing::info!("📊 Dashboard listening on http://{}:{}", args.host, args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

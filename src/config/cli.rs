use crate::adapters::telegram::DEFAULT_API_BASE_URL;
use crate::config::{DEFAULT_DATASET_PATH, DEFAULT_POLL_TIMEOUT_SECONDS, DEFAULT_QUERY_LOG_PATH};
use crate::core::conversation::{
    DEFAULT_CONVERSATION_TIMEOUT, DEFAULT_MATCH_THRESHOLD, DEFAULT_WEBSITE_URL,
};
use crate::domain::ports::ConfigProvider;
use clap::Parser;

#[derive(Clone, Parser)]
#[command(name = "ifsc-finder")]
#[command(about = "Telegram bot for finding Indian bank branch IFSC codes")]
pub struct CliConfig {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to a TOML configuration file. Flags given here override its
    /// values; token and port only fill what it leaves out
    #[arg(short, long)]
    pub config: Option<String>,

    /// IFSC dataset CSV [default: ifsc.csv]
    #[arg(long)]
    pub dataset: Option<String>,

    /// Website linked from replies [default: https://pmetromart.in/ifsc/]
    #[arg(long)]
    pub website_url: Option<String>,

    /// Seconds of inactivity before a conversation is dropped [default: 60]
    #[arg(long)]
    pub conversation_timeout: Option<u64>,

    /// Minimum fuzzy match score, 0-100 [default: 60]
    #[arg(long)]
    pub match_threshold: Option<f64>,

    /// Long-poll timeout passed to getUpdates [default: 30]
    #[arg(long)]
    pub poll_timeout: Option<u64>,

    /// Query log CSV [default: queries_log.csv]
    #[arg(long)]
    pub query_log: Option<String>,

    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Serve a health endpoint on this port (hosting platforms set PORT)
    #[arg(long, env = "PORT")]
    pub health_port: Option<u16>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

// token 不可出現在日誌中
impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("config", &self.config)
            .field("dataset", &self.dataset)
            .field("website_url", &self.website_url)
            .field("conversation_timeout", &self.conversation_timeout)
            .field("match_threshold", &self.match_threshold)
            .field("poll_timeout", &self.poll_timeout)
            .field("query_log", &self.query_log)
            .field("api_base_url", &self.api_base_url)
            .field("health_port", &self.health_port)
            .finish()
    }
}

impl ConfigProvider for CliConfig {
    fn bot_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    fn poll_timeout_seconds(&self) -> u64 {
        self.poll_timeout.unwrap_or(DEFAULT_POLL_TIMEOUT_SECONDS)
    }

    fn dataset_path(&self) -> &str {
        self.dataset.as_deref().unwrap_or(DEFAULT_DATASET_PATH)
    }

    fn website_url(&self) -> &str {
        self.website_url.as_deref().unwrap_or(DEFAULT_WEBSITE_URL)
    }

    fn conversation_timeout_seconds(&self) -> u64 {
        self.conversation_timeout
            .unwrap_or(DEFAULT_CONVERSATION_TIMEOUT.as_secs())
    }

    fn match_threshold(&self) -> f64 {
        self.match_threshold.unwrap_or(DEFAULT_MATCH_THRESHOLD)
    }

    fn query_log_path(&self) -> &str {
        self.query_log.as_deref().unwrap_or(DEFAULT_QUERY_LOG_PATH)
    }

    fn health_port(&self) -> Option<u16> {
        self.health_port
    }
}

#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

use crate::core::conversation::ConversationSettings;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{IfscError, Result};
use crate::utils::validation::{self, Validate};
use std::time::Duration;

pub const DEFAULT_DATASET_PATH: &str = "ifsc.csv";
pub const DEFAULT_QUERY_LOG_PATH: &str = "queries_log.csv";
pub const DEFAULT_POLL_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Fully resolved runtime settings for the bot process.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub token: String,
    pub api_base_url: String,
    pub poll_timeout_seconds: u64,
    pub retry_delay: Duration,
    pub dataset_path: String,
    pub query_log_path: String,
    pub health_port: Option<u16>,
    pub conversation: ConversationSettings,
}

impl BotSettings {
    pub fn from_provider<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let token = config
            .bot_token()
            .map(str::trim)
            // 未替換的 ${VAR} 視為未設定
            .filter(|t| !t.is_empty() && !t.starts_with("${"))
            .ok_or_else(|| IfscError::MissingConfigError {
                field: "telegram.token (TELEGRAM_BOT_TOKEN)".to_string(),
            })?;

        let settings = Self {
            token: token.to_string(),
            api_base_url: config.api_base_url().to_string(),
            poll_timeout_seconds: config.poll_timeout_seconds(),
            retry_delay: DEFAULT_RETRY_DELAY,
            dataset_path: config.dataset_path().to_string(),
            query_log_path: config.query_log_path().to_string(),
            health_port: config.health_port(),
            conversation: ConversationSettings {
                match_threshold: config.match_threshold(),
                timeout: Duration::from_secs(config.conversation_timeout_seconds()),
                website_url: config.website_url().to_string(),
            },
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for BotSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("telegram.token", &self.token)?;
        validation::validate_url("telegram.api_base_url", &self.api_base_url)?;
        validation::validate_range("telegram.poll_timeout_seconds", self.poll_timeout_seconds, 0, 50)?;
        validation::validate_path("dataset.path", &self.dataset_path)?;
        validation::validate_file_extension("dataset.path", &self.dataset_path, &["csv"])?;
        validation::validate_path("query_log.path", &self.query_log_path)?;
        validation::validate_positive_number(
            "conversation.timeout_seconds",
            self.conversation.timeout.as_secs(),
            1,
        )?;
        validation::validate_range(
            "conversation.match_threshold",
            self.conversation.match_threshold,
            0.0,
            100.0,
        )?;
        validation::validate_url("conversation.website_url", &self.conversation.website_url)?;
        Ok(())
    }
}

use crate::adapters::telegram::DEFAULT_API_BASE_URL;
use crate::config::{DEFAULT_DATASET_PATH, DEFAULT_POLL_TIMEOUT_SECONDS, DEFAULT_QUERY_LOG_PATH};
use crate::core::conversation::{
    DEFAULT_CONVERSATION_TIMEOUT, DEFAULT_MATCH_THRESHOLD, DEFAULT_WEBSITE_URL,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{IfscError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub query_log: QueryLogConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub api_base_url: Option<String>,
    pub poll_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationConfig {
    pub timeout_seconds: Option<u64>,
    pub match_threshold: Option<f64>,
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryLogConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(IfscError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| IfscError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TELEGRAM_BOT_TOKEN})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| IfscError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 命令列明確給定的參數覆蓋檔案設定；token 與 port 通常來自環境變數，
    /// 只在檔案未設定時套用
    #[cfg(feature = "cli")]
    pub fn apply_cli_overrides(&mut self, cli: &crate::config::CliConfig) {
        let token_missing = self
            .telegram
            .token
            .as_deref()
            .map(|t| t.trim().is_empty() || t.starts_with("${"))
            .unwrap_or(true);
        if token_missing {
            self.telegram.token = cli.token.clone();
        }
        if self.server.port.is_none() {
            self.server.port = cli.health_port;
        }

        if cli.api_base_url.is_some() {
            self.telegram.api_base_url = cli.api_base_url.clone();
        }
        if cli.poll_timeout.is_some() {
            self.telegram.poll_timeout_seconds = cli.poll_timeout;
        }
        if cli.dataset.is_some() {
            self.dataset.path = cli.dataset.clone();
        }
        if cli.website_url.is_some() {
            self.conversation.website_url = cli.website_url.clone();
        }
        if cli.conversation_timeout.is_some() {
            self.conversation.timeout_seconds = cli.conversation_timeout;
        }
        if cli.match_threshold.is_some() {
            self.conversation.match_threshold = cli.match_threshold;
        }
        if cli.query_log.is_some() {
            self.query_log.path = cli.query_log.clone();
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn bot_token(&self) -> Option<&str> {
        self.telegram.token.as_deref()
    }

    fn api_base_url(&self) -> &str {
        self.telegram
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
    }

    fn poll_timeout_seconds(&self) -> u64 {
        self.telegram
            .poll_timeout_seconds
            .unwrap_or(DEFAULT_POLL_TIMEOUT_SECONDS)
    }

    fn dataset_path(&self) -> &str {
        self.dataset.path.as_deref().unwrap_or(DEFAULT_DATASET_PATH)
    }

    fn website_url(&self) -> &str {
        self.conversation
            .website_url
            .as_deref()
            .unwrap_or(DEFAULT_WEBSITE_URL)
    }

    fn conversation_timeout_seconds(&self) -> u64 {
        self.conversation
            .timeout_seconds
            .unwrap_or(DEFAULT_CONVERSATION_TIMEOUT.as_secs())
    }

    fn match_threshold(&self) -> f64 {
        self.conversation
            .match_threshold
            .unwrap_or(DEFAULT_MATCH_THRESHOLD)
    }

    fn query_log_path(&self) -> &str {
        self.query_log
            .path
            .as_deref()
            .unwrap_or(DEFAULT_QUERY_LOG_PATH)
    }

    fn health_port(&self) -> Option<u16> {
        self.server.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotSettings;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[telegram]
token = "123:ABC"
poll_timeout_seconds = 10

[dataset]
path = "data/ifsc.csv"

[conversation]
timeout_seconds = 120
match_threshold = 75.0

[query_log]
path = "logs/queries.csv"

[server]
port = 10000
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        let settings = BotSettings::from_provider(&config).unwrap();

        assert_eq!(settings.token, "123:ABC");
        assert_eq!(settings.poll_timeout_seconds, 10);
        assert_eq!(settings.dataset_path, "data/ifsc.csv");
        assert_eq!(settings.conversation.timeout.as_secs(), 120);
        assert_eq!(settings.conversation.match_threshold, 75.0);
        assert_eq!(settings.query_log_path, "logs/queries.csv");
        assert_eq!(settings.health_port, Some(10000));
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.dataset_path(), "ifsc.csv");
        assert_eq!(config.conversation_timeout_seconds(), 60);
        assert_eq!(config.website_url(), DEFAULT_WEBSITE_URL);
        assert!(config.bot_token().is_none());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("IFSC_TEST_BOT_TOKEN", "999:XYZ");

        let toml_content = r#"
[telegram]
token = "${IFSC_TEST_BOT_TOKEN}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.bot_token(), Some("999:XYZ"));

        std::env::remove_var("IFSC_TEST_BOT_TOKEN");
    }

    #[test]
    fn test_unresolved_token_is_missing() {
        let toml_content = r#"
[telegram]
token = "${IFSC_TEST_UNSET_VARIABLE}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        let err = BotSettings::from_provider(&config).unwrap_err();
        assert!(matches!(err, IfscError::MissingConfigError { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let err = TomlConfig::from_toml_str("[telegram\ntoken=").unwrap_err();
        assert!(matches!(err, IfscError::ConfigValidationError { .. }));
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_explicit_cli_flags_override_file() {
        use crate::config::CliConfig;
        use clap::Parser;

        let toml_content = r#"
[telegram]
token = "123:ABC"

[dataset]
path = "data/ifsc.csv"

[conversation]
match_threshold = 75.0
"#;
        let mut config = TomlConfig::from_toml_str(toml_content).unwrap();
        let cli = CliConfig::parse_from([
            "ifsc-finder",
            "--config",
            "ifsc-finder.toml",
            "--dataset",
            "other.csv",
            "--token",
            "999:CLI",
        ]);
        config.apply_cli_overrides(&cli);

        let settings = BotSettings::from_provider(&config).unwrap();
        assert_eq!(settings.dataset_path, "other.csv");
        // 未指定的參數保留檔案值
        assert_eq!(settings.conversation.match_threshold, 75.0);
        // 檔案中的 token 優先於環境變數/命令列
        assert_eq!(settings.token, "123:ABC");
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[telegram]\ntoken = \"1:A\"\n[server]\nport = 8080\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.health_port(), Some(8080));
    }
}

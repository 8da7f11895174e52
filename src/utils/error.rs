use thiserror::Error;

#[derive(Error, Debug)]
pub enum IfscError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Telegram API error {code}: {description}")]
    TelegramApiError { code: i64, description: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Dataset error: {message}")]
    DatasetError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl IfscError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IfscError::ApiError(_) | IfscError::TelegramApiError { .. } => ErrorCategory::Network,
            IfscError::CsvError(_) | IfscError::DatasetError { .. } => ErrorCategory::Data,
            IfscError::ConfigError { .. }
            | IfscError::MissingConfigError { .. }
            | IfscError::InvalidConfigValueError { .. }
            | IfscError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            IfscError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            IfscError::ApiError(_) => ErrorSeverity::Medium,
            // 401/404 代表 token 錯誤，重試沒有意義
            IfscError::TelegramApiError { code, .. } if *code == 401 || *code == 404 => {
                ErrorSeverity::High
            }
            IfscError::TelegramApiError { .. } => ErrorSeverity::Medium,
            IfscError::CsvError(_) | IfscError::DatasetError { .. } => ErrorSeverity::High,
            IfscError::ConfigError { .. }
            | IfscError::MissingConfigError { .. }
            | IfscError::InvalidConfigValueError { .. }
            | IfscError::ConfigValidationError { .. } => ErrorSeverity::High,
            IfscError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Network && self.severity() == ErrorSeverity::Medium
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            IfscError::ApiError(_) => {
                "Check network connectivity to the Telegram Bot API".to_string()
            }
            IfscError::TelegramApiError { code, .. } if *code == 401 || *code == 404 => {
                "Verify TELEGRAM_BOT_TOKEN with @BotFather".to_string()
            }
            IfscError::TelegramApiError { code, .. } if *code == 409 => {
                "Another instance is polling with the same token; stop it or remove the webhook"
                    .to_string()
            }
            IfscError::TelegramApiError { .. } => "Retry later".to_string(),
            IfscError::CsvError(_) | IfscError::DatasetError { .. } => {
                "Make sure the dataset is a CSV file with Bank, IFSC, Branch and State columns"
                    .to_string()
            }
            IfscError::IoError(_) => "Check that the file exists and is readable".to_string(),
            IfscError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            IfscError::InvalidConfigValueError { field, .. }
            | IfscError::ConfigValidationError { field, .. } => {
                format!("Fix the value of '{}'", field)
            }
            IfscError::ConfigError { .. } => "Review the configuration file".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not talk to Telegram: {}", self),
            ErrorCategory::Data => format!("Could not read IFSC data: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// 依嚴重程度對應的結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, IfscError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_auth_errors_are_not_retryable() {
        let unauthorized = IfscError::TelegramApiError {
            code: 401,
            description: "Unauthorized".to_string(),
        };
        assert_eq!(unauthorized.severity(), ErrorSeverity::High);
        assert!(!unauthorized.is_retryable());
        assert_eq!(unauthorized.exit_code(), 1);

        let busy = IfscError::TelegramApiError {
            code: 429,
            description: "Too Many Requests".to_string(),
        };
        assert!(busy.is_retryable());
    }

    #[test]
    fn test_categories() {
        let err = IfscError::MissingConfigError {
            field: "telegram.token".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.recovery_suggestion().contains("telegram.token"));

        let err = IfscError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "x"));
        assert_eq!(err.category(), ErrorCategory::System);
        assert_eq!(err.exit_code(), 3);
    }
}

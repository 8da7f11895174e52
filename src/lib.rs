pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use crate::adapters::{query_log::CsvQueryLog, storage::LocalStorage, telegram::TelegramClient};
pub use crate::config::{toml_config::TomlConfig, BotSettings};
pub use crate::core::{bot::BotEngine, directory::IfscDirectory};
pub use utils::error::{IfscError, Result};

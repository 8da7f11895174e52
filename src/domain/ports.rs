use crate::domain::model::{NewQueryLogEntry, OutgoingMessage, QueryLogEntry, Update};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn bot_token(&self) -> Option<&str>;
    fn api_base_url(&self) -> &str;
    fn poll_timeout_seconds(&self) -> u64;
    fn dataset_path(&self) -> &str;
    fn website_url(&self) -> &str;
    fn conversation_timeout_seconds(&self) -> u64;
    fn match_threshold(&self) -> f64;
    fn query_log_path(&self) -> &str;
    fn health_port(&self) -> Option<u16>;
}

/// 與聊天平台溝通的介面
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn get_updates(&self, offset: Option<i64>, timeout_seconds: u64) -> Result<Vec<Update>>;
    async fn send_message(&self, message: &OutgoingMessage) -> Result<()>;
}

#[async_trait]
pub trait QueryLog: Send + Sync {
    async fn append(&self, entry: NewQueryLogEntry) -> Result<QueryLogEntry>;
    /// Newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<QueryLogEntry>>;
}

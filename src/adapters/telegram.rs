//! Telegram Bot API client.
//!
//! Long-polling via `getUpdates` for inbound messages and `sendMessage` for
//! replies. Every Bot API response uses the same envelope
//! (`{"ok": bool, "result": ..., "error_code": ..., "description": ...}`),
//! including 4xx responses, so the body is decoded before looking at the
//! status code.

use crate::domain::model::{OutgoingMessage, Update};
use crate::domain::ports::ChatTransport;
use crate::utils::error::{IfscError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T> {
        // 不要把 URL 寫進日誌，裡面有 token
        tracing::debug!("Calling Telegram method: {}", method);
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await?;

        if !envelope.ok {
            return Err(IfscError::TelegramApiError {
                code: envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: envelope
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        envelope.result.ok_or_else(|| IfscError::TelegramApiError {
            code: i64::from(status.as_u16()),
            description: format!("{} returned no result", method),
        })
    }

    /// `getMe`, used at startup to verify the token.
    pub async fn get_me(&self) -> Result<serde_json::Value> {
        self.call("getMe", &serde_json::json!({}), Duration::from_secs(15))
            .await
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn get_updates(&self, offset: Option<i64>, timeout_seconds: u64) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_seconds,
            allowed_updates: &["message"],
        };
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &request,
                Duration::from_secs(timeout_seconds + 10),
            )
            .await?;
        tracing::debug!("Received {} updates", updates.len());
        Ok(updates)
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<()> {
        let _sent: serde_json::Value = self
            .call("sendMessage", message, Duration::from_secs(15))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::InlineKeyboardMarkup;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_get_updates_sends_offset_and_parses_messages() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/botTEST:TOKEN/getUpdates")
                .json_body(serde_json::json!({
                    "offset": 11,
                    "timeout": 0,
                    "allowed_updates": ["message"]
                }));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "ok": true,
                    "result": [{
                        "update_id": 11,
                        "message": {
                            "message_id": 1,
                            "chat": {"id": 42, "type": "private"},
                            "from": {"id": 7, "is_bot": false, "first_name": "Ravi", "username": "ravi"},
                            "date": 0,
                            "text": "/start"
                        }
                    }]
                }));
        });

        let client = TelegramClient::new(&server.base_url(), "TEST:TOKEN").unwrap();
        let updates = client.get_updates(Some(11), 0).await.unwrap();

        api_mock.assert();
        assert_eq!(updates.len(), 1);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.text.as_deref(), Some("/start"));
        assert_eq!(message.from.as_ref().unwrap().username.as_deref(), Some("ravi"));
    }

    #[tokio::test]
    async fn test_send_message_posts_markup() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/botTEST:TOKEN/sendMessage")
                .json_body(serde_json::json!({
                    "chat_id": 42,
                    "text": "hello",
                    "parse_mode": "Markdown",
                    "reply_markup": {"inline_keyboard": [[{"text": "Go", "url": "https://example.com"}]]}
                }));
            then.status(200)
                .json_body(serde_json::json!({"ok": true, "result": {"message_id": 5}}));
        });

        let client = TelegramClient::new(&server.base_url(), "TEST:TOKEN").unwrap();
        let message = OutgoingMessage {
            chat_id: 42,
            text: "hello".to_string(),
            parse_mode: Some("Markdown".to_string()),
            reply_markup: Some(InlineKeyboardMarkup::single_link("Go", "https://example.com")),
        };
        client.send_message(&message).await.unwrap();

        api_mock.assert();
    }

    #[tokio::test]
    async fn test_api_error_envelope() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/botBAD/getUpdates");
            then.status(401).json_body(serde_json::json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            }));
        });

        let client = TelegramClient::new(&server.base_url(), "BAD").unwrap();
        let err = client.get_updates(None, 0).await.unwrap_err();

        match err {
            IfscError::TelegramApiError { code, description } => {
                assert_eq!(code, 401);
                assert_eq!(description, "Unauthorized");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_response_is_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/botTEST/sendMessage");
            then.status(502).body("Bad Gateway");
        });

        let client = TelegramClient::new(&server.base_url(), "TEST").unwrap();
        let message = OutgoingMessage {
            chat_id: 1,
            text: "x".to_string(),
            parse_mode: None,
            reply_markup: None,
        };
        let err = client.send_message(&message).await.unwrap_err();
        assert!(matches!(err, IfscError::ApiError(_)));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 資料集中缺值時使用的字串
pub const NOT_AVAILABLE: &str = "N/A";

/// One row of the IFSC dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub bank: String,
    pub ifsc: String,
    pub micr: String,
    pub branch: String,
    pub address: String,
    pub contact: String,
    pub city: String,
    pub district: String,
    pub state: String,
}

/// A syntactically valid IFSC code: four bank letters, a literal `0`, then a
/// six character branch code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IfscCode(String);

impl IfscCode {
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_ascii_uppercase();
        let bytes = code.as_bytes();
        if bytes.len() != 11 {
            return None;
        }
        let valid = bytes[..4].iter().all(u8::is_ascii_alphabetic)
            && bytes[4] == b'0'
            && bytes[5..].iter().all(u8::is_ascii_alphanumeric);
        valid.then_some(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IfscCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a user currently is in the guided lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingState,
    AwaitingBank {
        state: String,
    },
    AwaitingBranch {
        state: String,
        bank: String,
    },
}

impl ConversationState {
    pub fn is_active(&self) -> bool {
        !matches!(self, ConversationState::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    Found,
    StateNotFound,
    BankNotFound,
    NoBranches,
    BranchNotFound,
    Cancelled,
    IfscFound,
    IfscNotFound,
    InvalidIfsc,
}

impl QueryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOutcome::Found => "found",
            QueryOutcome::StateNotFound => "state_not_found",
            QueryOutcome::BankNotFound => "bank_not_found",
            QueryOutcome::NoBranches => "no_branches",
            QueryOutcome::BranchNotFound => "branch_not_found",
            QueryOutcome::Cancelled => "cancelled",
            QueryOutcome::IfscFound => "ifsc_found",
            QueryOutcome::IfscNotFound => "ifsc_not_found",
            QueryOutcome::InvalidIfsc => "invalid_ifsc",
        }
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lookup that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQueryLogEntry {
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub state: Option<String>,
    pub bank: Option<String>,
    pub branch: Option<String>,
    pub ifsc: Option<String>,
    pub outcome: QueryOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub state: Option<String>,
    pub bank: Option<String>,
    pub branch: Option<String>,
    pub ifsc: Option<String>,
    pub outcome: QueryOutcome,
}

impl QueryLogEntry {
    pub const COLUMNS: [&'static str; 10] = [
        "id", "timestamp", "chat_id", "user_id", "username", "state", "bank", "branch", "ifsc",
        "outcome",
    ];

    /// 依 `COLUMNS` 順序輸出欄位文字
    pub fn cells(&self) -> Vec<String> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            self.id.to_string(),
            self.timestamp.to_rfc3339(),
            self.chat_id.to_string(),
            self.user_id.map(|id| id.to_string()).unwrap_or_default(),
            opt(&self.username),
            opt(&self.state),
            opt(&self.bank),
            opt(&self.branch),
            opt(&self.ifsc),
            self.outcome.to_string(),
        ]
    }
}

// ---- Telegram Bot API wire types ----

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub url: String,
}

impl InlineKeyboardMarkup {
    /// 單一網址按鈕
    pub fn single_link(text: &str, url: &str) -> Self {
        Self {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: text.to_string(),
                url: url.to_string(),
            }]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifsc_code_parse() {
        let code = IfscCode::parse(" sbin0001234 ").unwrap();
        assert_eq!(code.as_str(), "SBIN0001234");

        assert!(IfscCode::parse("HDFC0ABC123").is_some());
        assert!(IfscCode::parse("SBIN1001234").is_none());
        assert!(IfscCode::parse("SBI00001234").is_none());
        assert!(IfscCode::parse("SBIN000123").is_none());
        assert!(IfscCode::parse("SBIN0-01234").is_none());
        assert!(IfscCode::parse("").is_none());
    }

    #[test]
    fn test_outgoing_message_skips_empty_fields() {
        let msg = OutgoingMessage {
            chat_id: 7,
            text: "hi".to_string(),
            parse_mode: None,
            reply_markup: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({"chat_id": 7, "text": "hi"}));

        let markup = InlineKeyboardMarkup::single_link("Go", "https://example.com");
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["inline_keyboard"][0][0]["url"], "https://example.com");
    }

    #[test]
    fn test_update_deserializes_without_message() {
        let update: Update = serde_json::from_value(serde_json::json!({
            "update_id": 10,
            "edited_message": {"message_id": 1}
        }))
        .unwrap();
        assert_eq!(update.update_id, 10);
        assert!(update.message.is_none());
    }

    #[test]
    fn test_query_log_cells_follow_columns() {
        let entry = QueryLogEntry {
            id: 3,
            timestamp: Utc::now(),
            chat_id: 42,
            user_id: None,
            username: Some("ravi".to_string()),
            state: Some("BIHAR".to_string()),
            bank: None,
            branch: None,
            ifsc: None,
            outcome: QueryOutcome::BankNotFound,
        };
        let cells = entry.cells();
        assert_eq!(cells.len(), QueryLogEntry::COLUMNS.len());
        assert_eq!(cells[0], "3");
        assert_eq!(cells[3], "");
        assert_eq!(cells[9], "bank_not_found");
    }
}

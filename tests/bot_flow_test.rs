use httpmock::prelude::*;
use ifsc_finder::core::conversation::ConversationSettings;
use ifsc_finder::core::QueryLog;
use ifsc_finder::domain::model::QueryOutcome;
use ifsc_finder::{BotEngine, CsvQueryLog, IfscDirectory, LocalStorage, TelegramClient};
use std::time::Duration;
use tempfile::TempDir;

const DATASET: &str = "\
Bank,IFSC,MICR,Branch,Address,Contact,City,District,State
State Bank of India,SBIN0000001,800002001,Patna Main,Gandhi Maidan,0612-220000,Patna,Patna,Bihar
State Bank of India,SBIN0000002,,Boring Road,Boring Road,,Patna,Patna,Bihar
HDFC Bank,HDFC0000004,682240002,Ernakulam,MG Road,,Kochi,Ernakulam,Kerala
";

fn message(update_id: i64, chat_id: i64, text: &str) -> serde_json::Value {
    serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "chat": {"id": chat_id, "type": "private"},
            "from": {"id": chat_id, "is_bot": false, "first_name": "Asha", "username": "asha"},
            "date": 1_700_000_000,
            "text": text
        }
    })
}

async fn setup(temp_dir: &TempDir) -> (IfscDirectory, CsvQueryLog) {
    let base = temp_dir.path().to_str().unwrap().to_string();
    std::fs::write(temp_dir.path().join("ifsc.csv"), DATASET).unwrap();

    let storage = LocalStorage::new(base.clone());
    let directory = IfscDirectory::load(&storage, "ifsc.csv").await.unwrap();
    let query_log = CsvQueryLog::new(LocalStorage::new(base), "queries_log.csv");
    (directory, query_log)
}

#[tokio::test]
async fn test_end_to_end_guided_lookup() {
    let temp_dir = TempDir::new().unwrap();
    let (directory, query_log) = setup(&temp_dir).await;

    let server = MockServer::start();
    let updates_mock = server.mock(|when, then| {
        when.method(POST).path("/botTEST/getUpdates");
        then.status(200).json_body(serde_json::json!({
            "ok": true,
            "result": [
                message(100, 42, "/start"),
                message(101, 42, "bihar"),
                message(102, 42, "sbi"),
                message(103, 42, "boring road")
            ]
        }));
    });
    let ok = serde_json::json!({"ok": true, "result": {"message_id": 1}});
    let welcome_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/botTEST/sendMessage")
            .body_contains("Welcome to IFSC Finder");
        then.status(200).json_body(ok.clone());
    });
    let ask_bank_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/botTEST/sendMessage")
            .body_contains("*Bank*");
        then.status(200).json_body(ok.clone());
    });
    let ask_branch_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/botTEST/sendMessage")
            .body_contains("*Branch*");
        then.status(200).json_body(ok.clone());
    });
    let details_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/botTEST/sendMessage")
            .body_contains("SBIN0000002");
        then.status(200).json_body(ok.clone());
    });

    let client = TelegramClient::new(&server.base_url(), "TEST").unwrap();
    let mut engine = BotEngine::new(client, query_log, directory, ConversationSettings::default())
        .with_polling(0, Duration::from_millis(10));

    let processed = engine.poll_once().await.unwrap();

    assert_eq!(processed, 4);
    assert_eq!(engine.offset(), Some(104));
    updates_mock.assert();
    welcome_mock.assert();
    ask_bank_mock.assert();
    ask_branch_mock.assert();
    details_mock.assert();

    let log = CsvQueryLog::new(
        LocalStorage::new(temp_dir.path().to_str().unwrap().to_string()),
        "queries_log.csv",
    );
    let entries = log.recent(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, QueryOutcome::Found);
    assert_eq!(entries[0].ifsc.as_deref(), Some("SBIN0000002"));
    assert_eq!(entries[0].username.as_deref(), Some("asha"));
    assert_eq!(entries[0].chat_id, 42);
}

#[tokio::test]
async fn test_direct_ifsc_message_and_failed_send_is_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let (directory, query_log) = setup(&temp_dir).await;

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/botTEST/getUpdates");
        then.status(200).json_body(serde_json::json!({
            "ok": true,
            "result": [message(7, 9, "hdfc0000004")]
        }));
    });
    let send_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/botTEST/sendMessage")
            .body_contains("HDFC0000004");
        then.status(400).json_body(serde_json::json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: can't parse entities"
        }));
    });

    let client = TelegramClient::new(&server.base_url(), "TEST").unwrap();
    let mut engine = BotEngine::new(client, query_log, directory, ConversationSettings::default())
        .with_polling(0, Duration::from_millis(10));

    assert_eq!(engine.poll_once().await.unwrap(), 1);
    send_mock.assert();

    // 回覆失敗仍然記錄查詢
    let log = CsvQueryLog::new(
        LocalStorage::new(temp_dir.path().to_str().unwrap().to_string()),
        "queries_log.csv",
    );
    let entries = log.recent(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, QueryOutcome::IfscFound);
}

#[tokio::test]
async fn test_poll_once_surfaces_api_errors() {
    let temp_dir = TempDir::new().unwrap();
    let (directory, query_log) = setup(&temp_dir).await;

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/botTEST/getUpdates");
        then.status(409).json_body(serde_json::json!({
            "ok": false,
            "error_code": 409,
            "description": "Conflict: terminated by other getUpdates request"
        }));
    });

    let client = TelegramClient::new(&server.base_url(), "TEST").unwrap();
    let mut engine = BotEngine::new(client, query_log, directory, ConversationSettings::default())
        .with_polling(0, Duration::from_millis(10));

    let err = engine.poll_once().await.unwrap_err();
    assert!(err.is_retryable());
    assert!(err.recovery_suggestion().contains("Another instance"));
    assert_eq!(engine.offset(), None);
}

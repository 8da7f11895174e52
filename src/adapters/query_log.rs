use crate::adapters::storage::LocalStorage;
use crate::domain::model::{NewQueryLogEntry, QueryLogEntry};
use crate::domain::ports::{QueryLog, Storage};
use crate::utils::error::{IfscError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Render entries as CSV with a header row.
pub fn to_csv(entries: &[QueryLogEntry]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(QueryLogEntry::COLUMNS)?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer
        .into_inner()
        .map_err(|e| IfscError::IoError(e.into_error()))
}

/// Parse the log keeping only the last `keep` rows, oldest first.
///
/// The file is append-only, so its last rows are the newest entries. Memory
/// stays bounded by `keep`, but the whole file is still scanned on every call.
// TODO: seek to the end of the file and read backwards once logs grow past a few MB.
fn parse_tail(data: &[u8], keep: usize) -> VecDeque<QueryLogEntry> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data);
    let mut entries = VecDeque::with_capacity(keep.min(1024));
    if keep == 0 {
        return entries;
    }
    for row in reader.deserialize::<QueryLogEntry>() {
        match row {
            Ok(entry) => {
                if entries.len() == keep {
                    entries.pop_front();
                }
                entries.push_back(entry);
            }
            Err(e) => tracing::warn!("⚠️ Skipping malformed query log row: {}", e),
        }
    }
    entries
}

/// Append-only query log stored as a CSV file.
pub struct CsvQueryLog<S: Storage = LocalStorage> {
    storage: S,
    path: String,
    // None 代表尚未從檔案讀取最後的 id
    next_id: Mutex<Option<u64>>,
}

impl<S: Storage> CsvQueryLog<S> {
    pub fn new(storage: S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
            next_id: Mutex::new(None),
        }
    }

    async fn read_tail(&self, keep: usize) -> Result<VecDeque<QueryLogEntry>> {
        match self.storage.read_file(&self.path).await {
            Ok(data) => Ok(parse_tail(&data, keep)),
            Err(IfscError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(VecDeque::new()),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl CsvQueryLog<LocalStorage> {
    /// Log file resolved relative to the working directory.
    pub fn open(path: impl Into<String>) -> Self {
        Self::new(LocalStorage::default(), path)
    }
}

#[async_trait]
impl<S: Storage> QueryLog for CsvQueryLog<S> {
    async fn append(&self, entry: NewQueryLogEntry) -> Result<QueryLogEntry> {
        let mut next_id = self.next_id.lock().await;

        let (id, needs_header) = match *next_id {
            Some(id) => (id, false),
            None => match self.storage.read_file(&self.path).await {
                Ok(data) => {
                    let last = parse_tail(&data, 1).back().map(|e| e.id).unwrap_or(0);
                    (last + 1, data.is_empty())
                }
                Err(IfscError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => (1, true),
                Err(e) => return Err(e),
            },
        };

        let record = QueryLogEntry {
            id,
            timestamp: Utc::now(),
            chat_id: entry.chat_id,
            user_id: entry.user_id,
            username: entry.username,
            state: entry.state,
            bank: entry.bank,
            branch: entry.branch,
            ifsc: entry.ifsc,
            outcome: entry.outcome,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if needs_header {
            writer.write_record(QueryLogEntry::COLUMNS)?;
        }
        writer.serialize(&record)?;
        let bytes = writer
            .into_inner()
            .map_err(|e| IfscError::IoError(e.into_error()))?;

        self.storage.append_file(&self.path, &bytes).await?;
        *next_id = Some(id + 1);

        tracing::debug!("📝 Logged query #{} ({})", record.id, record.outcome);
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<QueryLogEntry>> {
        let entries = self.read_tail(limit).await?;
        Ok(entries.into_iter().rev().collect())
    }
}

use crate::core::fuzzy;
use crate::domain::model::{BranchRecord, IfscCode, NOT_AVAILABLE};
use crate::domain::ports::Storage;
use crate::utils::error::{IfscError, Result};
use std::collections::{HashMap, HashSet};

/// Short names users commonly type instead of the full bank name.
pub const BANK_ALIASES: [(&str, &str); 8] = [
    ("sbi", "STATE BANK OF INDIA"),
    ("pnb", "PUNJAB NATIONAL BANK"),
    ("bob", "BANK OF BARODA"),
    ("hdfc", "HDFC BANK"),
    ("icici", "ICICI BANK"),
    ("axis", "AXIS BANK"),
    ("canara", "CANARA BANK"),
    ("union", "UNION BANK OF INDIA"),
];

/// Longest user input, in chars, that is fuzzy matched. Telegram messages
/// can be 4096 chars; no state, bank or branch name comes close to this.
pub const MAX_QUERY_CHARS: usize = 100;

const REQUIRED_COLUMNS: [&str; 4] = ["Bank", "IFSC", "Branch", "State"];

#[derive(Debug)]
pub enum BranchMatch<'a> {
    /// 該州與銀行沒有任何分行
    NoBranches,
    NotFound,
    Found(&'a BranchRecord),
}

/// In-memory IFSC dataset with the lookups the conversation needs.
#[derive(Debug, Clone)]
pub struct IfscDirectory {
    records: Vec<BranchRecord>,
    states: Vec<String>,
    banks: Vec<String>,
    by_ifsc: HashMap<String, usize>,
}

/// Latin-1 每個位元組對應同值的 Unicode 碼位
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Trim user input and cut it to `MAX_QUERY_CHARS`.
pub fn clip_query(input: &str) -> &str {
    let trimmed = input.trim();
    match trimmed.char_indices().nth(MAX_QUERY_CHARS) {
        Some((end, _)) => trimmed[..end].trim_end(),
        None => trimmed,
    }
}

fn unique_upper<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        let upper = value.to_uppercase();
        if seen.insert(upper.clone()) {
            out.push(upper);
        }
    }
    out
}

impl IfscDirectory {
    pub fn from_records(records: Vec<BranchRecord>) -> Self {
        let states = unique_upper(records.iter().map(|r| r.state.as_str()));
        let banks = unique_upper(records.iter().map(|r| r.bank.as_str()));

        let mut by_ifsc = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            by_ifsc
                .entry(record.ifsc.trim().to_ascii_uppercase())
                .or_insert(index);
        }

        Self {
            records,
            states,
            banks,
            by_ifsc,
        }
    }

    /// 從 Latin-1 編碼的 CSV 位元組建立資料集
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let text = decode_latin1(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);

        for required in REQUIRED_COLUMNS {
            if column(required).is_none() {
                return Err(IfscError::DatasetError {
                    message: format!("missing required column '{}'", required),
                });
            }
        }

        let idx_bank = column("Bank");
        let idx_ifsc = column("IFSC");
        let idx_micr = column("MICR");
        let idx_branch = column("Branch");
        let idx_address = column("Address");
        let idx_contact = column("Contact");
        let idx_city = column("City");
        let idx_district = column("District");
        let idx_state = column("State");

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let cell = |idx: Option<usize>| {
                idx.and_then(|i| row.get(i))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .unwrap_or(NOT_AVAILABLE)
                    .to_string()
            };
            records.push(BranchRecord {
                bank: cell(idx_bank),
                ifsc: cell(idx_ifsc),
                micr: cell(idx_micr),
                branch: cell(idx_branch),
                address: cell(idx_address),
                contact: cell(idx_contact),
                city: cell(idx_city),
                district: cell(idx_district),
                state: cell(idx_state),
            });
        }

        Ok(Self::from_records(records))
    }

    pub async fn load<S: Storage>(storage: &S, path: &str) -> Result<Self> {
        tracing::debug!("Loading IFSC dataset from: {}", path);
        let bytes = storage.read_file(path).await?;
        let directory = Self::from_csv_bytes(&bytes)?;
        tracing::info!(
            "📂 Loaded {} branches ({} states, {} banks)",
            directory.len(),
            directory.states.len(),
            directory.banks.len()
        );
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn banks(&self) -> &[String] {
        &self.banks
    }

    pub fn match_state(&self, input: &str, threshold: f64) -> Option<&str> {
        let query = clip_query(input).to_uppercase();
        match fuzzy::extract_one(&query, &self.states) {
            Some((state, score, _)) if score >= threshold => Some(state),
            _ => None,
        }
    }

    /// Alias lookup first, then fuzzy match against all banks.
    pub fn normalize_bank_name(&self, input: &str, threshold: f64) -> Option<String> {
        let trimmed = clip_query(input);
        let key = trimmed.to_lowercase();
        if let Some((_, canonical)) = BANK_ALIASES.iter().find(|(alias, _)| *alias == key) {
            return Some((*canonical).to_string());
        }

        let query = trimmed.to_uppercase();
        match fuzzy::extract_one(&query, &self.banks) {
            Some((bank, score, _)) if score >= threshold => Some(bank.to_string()),
            _ => None,
        }
    }

    pub fn branches_in(&self, state: &str, bank: &str) -> Vec<&BranchRecord> {
        let state = state.to_uppercase();
        let bank = bank.to_uppercase();
        self.records
            .iter()
            .filter(|r| r.state.to_uppercase() == state && r.bank.to_uppercase() == bank)
            .collect()
    }

    pub fn match_branch(&self, state: &str, bank: &str, input: &str, threshold: f64) -> BranchMatch<'_> {
        let subset = self.branches_in(state, bank);
        if subset.is_empty() {
            return BranchMatch::NoBranches;
        }

        let names: Vec<String> = subset.iter().map(|r| r.branch.to_uppercase()).collect();
        let query = clip_query(input).to_uppercase();
        match fuzzy::extract_one(&query, &names) {
            // extract_one 回傳第一個同名分行的索引
            Some((_, score, index)) if score >= threshold => BranchMatch::Found(subset[index]),
            _ => BranchMatch::NotFound,
        }
    }

    pub fn lookup_ifsc(&self, code: &IfscCode) -> Option<&BranchRecord> {
        self.by_ifsc.get(code.as_str()).map(|&i| &self.records[i])
    }
}

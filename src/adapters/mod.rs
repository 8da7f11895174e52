// Adapters layer: concrete implementations for external systems (storage, http, query log).

pub mod query_log;
pub mod storage;
pub mod telegram;

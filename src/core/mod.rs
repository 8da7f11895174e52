pub mod bot;
pub mod conversation;
pub mod directory;
pub mod fuzzy;

pub use crate::domain::model::{BranchRecord, IfscCode, QueryLogEntry};
pub use crate::domain::ports::{ChatTransport, ConfigProvider, QueryLog, Storage};
pub use crate::utils::error::Result;

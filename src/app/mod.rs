pub mod dashboard;
pub mod shutdown;

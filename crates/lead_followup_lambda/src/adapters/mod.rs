pub mod chat;
pub mod lead_store;
pub mod memory_store;
pub mod notifier;
pub mod s3_store;

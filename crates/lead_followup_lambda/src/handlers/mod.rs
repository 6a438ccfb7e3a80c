pub mod chat;
pub mod http;
pub mod intake;
pub mod mark_replied;
pub mod sweep;

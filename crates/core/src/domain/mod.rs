pub mod agent;
pub mod chat;
pub mod config_entry;

pub mod connection;
pub mod factory;
pub mod migrations;
pub mod repositories;
pub mod store;

pub use connection::{connect, connect_with_settings, DbPool};
pub use factory::{RealizationScope, TemplateAgentFactory};
pub use store::{ConfigStore, NewAgent};

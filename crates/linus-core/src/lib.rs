//! Linus Core: topic table, grid data model, configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod text;
pub mod topics;

pub use config::{LinusConfig, RemoteClassifierConfig, Thresholds};
pub use error::{Error, Result};
pub use models::*;
pub use topics::{DEFAULT_TOPIC_ID, TOPICS, TopicDefinition, TopicId, topic};

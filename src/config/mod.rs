//! Configuration module - typed settings loaded from file and environment

pub mod settings;

pub use settings::{EditConfig, InvokeConfig, LoggingConfig, ServerConfig, Settings, StorageConfig};

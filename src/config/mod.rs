/// Application settings loaded from config.toml
pub mod app;

/// Database configuration and connection management
pub mod database;

/// Secrets loaded from environment variables
pub mod secrets;

pub use app::{
    AppConfig, AuthConfig, EmailConfig, PaymentConfig, ServerConfig, ShopConfig, StorageBackend,
    StorageConfig, load_app_configuration, load_config,
};
pub use secrets::Secrets;

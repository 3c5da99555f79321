//! Application configuration loading from config.toml
//!
//! Every section and field has a default, so a missing file is not an error: the shop starts
//! with the defaults and logs that it did so. A file that exists but cannot be parsed is fatal.
//! A couple of deployment knobs (`PORT`, `DATABASE_URL`) can be overridden from the environment.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{
    net::IpAddr,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Default location of the configuration file, overridable with `CONFIG_PATH`
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub shop: ShopConfig,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
    pub email: EmailConfig,
}

/// `[server]` section
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes (product image uploads)
    pub max_upload_bytes: usize,
    /// Reverse proxies whose `X-Forwarded-For` header is believed. Requests from any other
    /// peer are keyed by the peer address alone.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_upload_bytes: 8 * 1024 * 1024,
            trusted_proxies: Vec::new(),
        }
    }
}

/// Which repository implementation backs the collections
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON array file per collection
    #[default]
    Json,
    /// `SeaORM` over `SQLite`
    Sqlite,
}

/// `[storage]` section
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory holding `products.json`, `categories.json` and `orders.json`
    pub data_dir: PathBuf,
    /// Used when `backend = "sqlite"`
    pub database_url: String,
    /// Directory where uploaded product images are written
    pub upload_dir: PathBuf,
    /// URL path segment under which uploaded images are served and referenced
    pub image_url_prefix: String,
    /// Static storefront files served at `/`
    pub public_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            data_dir: PathBuf::from("data"),
            database_url: "sqlite://data/bakery.sqlite?mode=rwc".to_string(),
            upload_dir: PathBuf::from("public/productos"),
            image_url_prefix: "productos".to_string(),
            public_dir: PathBuf::from("public"),
        }
    }
}

/// `[shop]` section
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ShopConfig {
    pub name: String,
    /// Number (international format, digits only) receiving WhatsApp orders
    pub whatsapp_number: String,
    /// Smallest order total accepted at checkout; 0 disables the check
    pub minimum_purchase: f64,
    pub currency: String,
    /// Category shown first in the grouped catalog view
    pub featured_category: String,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            name: "Bakery".to_string(),
            whatsapp_number: String::new(),
            minimum_purchase: 0.0,
            currency: "ARS".to_string(),
            featured_category: "combos".to_string(),
        }
    }
}

/// `[auth]` section
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of admin session tokens
    pub session_ttl_hours: i64,
    /// Password attempts a client may burst before being throttled
    pub attempt_capacity: f64,
    /// Attempts regained per second
    pub attempt_refill_per_sec: f64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24,
            attempt_capacity: 10.0,
            attempt_refill_per_sec: 0.2,
        }
    }
}

/// `[payment]` section
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PaymentConfig {
    pub api_base: String,
    pub success_url: String,
    pub failure_url: String,
    pub pending_url: String,
    pub statement_descriptor: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.mercadopago.com".to_string(),
            success_url: "http://localhost:3000/shop.html?payment=success".to_string(),
            failure_url: "http://localhost:3000/shop.html?payment=failure".to_string(),
            pending_url: "http://localhost:3000/shop.html?payment=pending".to_string(),
            statement_descriptor: "BAKERY".to_string(),
        }
    }
}

/// `[email]` section
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EmailConfig {
    /// HTTP endpoint of the email relay; notifications are disabled when absent
    pub relay_url: Option<String>,
    /// Sender, e.g. `"Bakery Web <web@example.com>"`
    pub from: String,
    /// Shop inbox receiving order and contact notifications
    pub to: String,
}

impl AppConfig {
    /// Applies environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|e| Error::Config {
                message: format!("Invalid PORT value '{port}': {e}"),
            })?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.storage.database_url = url;
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file, falling back to defaults when the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or is not valid TOML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);

    let contents = match std::fs::read_to_string(path_ref) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("{:?} not found, using default configuration", path_ref);
            return Ok(AppConfig::default());
        }
        Err(e) => {
            return Err(Error::Config {
                message: format!("Failed to read config file {path_ref:?}: {e}"),
            });
        }
    };

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse TOML from config file {path_ref:?}: {e}"),
    })
}

/// Loads the configuration from `CONFIG_PATH` (or ./config.toml) and applies env overrides.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_config(&path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    info!(
        "Configuration loaded: backend={:?}, port={}",
        config.storage.backend, config.server.port
    );
    Ok(config)
}

//! Shared test utilities for the bakery shop.
//!
//! This module provides common helper functions for setting up test stores, building fixture
//! records with sensible defaults, and fake collaborators (mailer, payment gateway) that record
//! what they were asked to do.
#![allow(clippy::unwrap_used)]

use crate::{
    api::AppState,
    auth::AdminAuth,
    config::{AppConfig, database::create_tables},
    core::category,
    errors::{Error, Result},
    models::{Category, Customer, Order, OrderItem, OrderStatus},
    notify::{Email, Mailer},
    payment::{PaymentGateway, Preference, PreferenceRequest},
    store::{NewProduct, SqliteStore, Store},
    uploads::UploadStore,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Plaintext admin password accepted by [`setup_test_app`].
pub const TEST_ADMIN_PASSWORD: &str = "horno-caliente";

/// Installs a test-writer subscriber so `tracing` output shows up under `cargo test -- --nocapture`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Creates a JSON store in a fresh temporary directory.
/// Keep the returned `TempDir` alive for as long as the store is used.
pub async fn setup_json_store() -> Result<(TempDir, Store)> {
    let dir = tempfile::tempdir()?;
    let store = crate::store::JsonStore::open(dir.path()).await?;
    Ok((dir, Store::Json(store)))
}

/// Creates an in-memory `SQLite` store with all tables initialized.
pub async fn setup_sqlite_store() -> Result<Store> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    create_tables(&db).await?;
    Ok(Store::Sqlite(SqliteStore::from_connection(db)))
}

/// Creates a category through the normal slug derivation, so `"Panes"` gets id `"panes"`.
pub async fn create_test_category(store: &Store, name: &str) -> Result<Category> {
    category::create_category(store, name).await
}

/// Builds a new product with sensible defaults.
///
/// # Defaults
/// * price: 1000.0, no promo
/// * stock: 10
/// * image: `productos/test.jpg`
pub fn new_test_product(name: &str, category: &str) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: format!("{name} casero"),
        price: 1000.0,
        promo_price: None,
        stock: 10,
        category: category.to_string(),
        image: "productos/test.jpg".to_string(),
    }
}

pub fn test_customer() -> Customer {
    Customer {
        name: "Ana Pérez".to_string(),
        email: Some("ana@example.com".to_string()),
        phone: "11 2233-4455".to_string(),
        delivery_method: "Retiro en local".to_string(),
        ..Customer::default()
    }
}

/// A pending order with a single line of two units at 500.
pub fn test_order(id: &str) -> Order {
    Order {
        id: id.to_string(),
        customer: test_customer(),
        items: vec![OrderItem {
            id: 1,
            name: "Baguette".to_string(),
            price: 500.0,
            quantity: 2,
        }],
        total: 1000.0,
        payment_method: "Efectivo".to_string(),
        date: chrono::Utc::now(),
        status: OrderStatus::Pending,
        version: 0,
    }
}

/// Mailer that keeps every email in memory, optionally failing each send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<()> {
        if self.fail {
            return Err(Error::ExternalService {
                service: "email",
                message: "relay unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Payment gateway returning a canned preference and recording the requests it saw.
#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<PreferenceRequest>>,
    pub fail: bool,
}

impl FakeGateway {
    pub fn failing() -> Self {
        Self {
            requests: Mutex::default(),
            fail: true,
        }
    }

    pub fn requests(&self) -> Vec<PreferenceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(Error::ExternalService {
                service: "payment gateway",
                message: "status 400: invalid items".to_string(),
            });
        }
        Ok(Preference {
            id: "pref-123".to_string(),
            init_point: "https://pay.example.com/checkout?pref_id=pref-123".to_string(),
        })
    }
}

/// Everything an HTTP test needs: the state, its fakes, and the directory holding its files.
pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub gateway: Arc<FakeGateway>,
}

/// Sets up a JSON-backed application with uploads in a temp dir, a fast bcrypt hash of
/// [`TEST_ADMIN_PASSWORD`], and recording fakes for email and payments.
pub async fn setup_test_app() -> Result<TestApp> {
    setup_test_app_with(AppConfig::default()).await
}

pub async fn setup_test_app_with(mut config: AppConfig) -> Result<TestApp> {
    init_test_tracing();
    let dir = tempfile::tempdir()?;
    config.storage.data_dir = dir.path().join("data");
    config.storage.upload_dir = dir.path().join("public").join("productos");
    config.storage.public_dir = dir.path().join("public");
    config.shop.whatsapp_number = "5491100000000".to_string();
    config.email.to = "shop@example.com".to_string();

    let store = Store::open(&config.storage).await?;
    let uploads = UploadStore::new(&config.storage.upload_dir, &config.storage.image_url_prefix);
    let hash = bcrypt::hash(TEST_ADMIN_PASSWORD, 4).unwrap();
    let auth = AdminAuth::new(Some(hash), &config.auth);
    let mailer = Arc::new(RecordingMailer::default());
    let gateway = Arc::new(FakeGateway::default());

    let state = AppState::new(
        config,
        store,
        uploads,
        auth,
        Arc::clone(&mailer) as Arc<dyn Mailer>,
        Arc::clone(&gateway) as Arc<dyn PaymentGateway>,
    );

    Ok(TestApp {
        dir,
        state,
        mailer,
        gateway,
    })
}

use bakery_shop::{
    api::{self, AppState},
    auth::{self, AdminAuth},
    config::{self, Secrets},
    errors::{Error, Result},
    notify,
    payment::{PaymentGateway, mercadopago::MercadoPagoClient},
    store::Store,
    uploads::UploadStore,
};
use dotenvy::dotenv;
use std::{env, process::ExitCode, sync::Arc, time::Duration};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    let mut args = env::args().skip(1);
    let result = match args.next().as_deref() {
        Some("hash-password") => print_password_hash(args.next()),
        Some(other) => {
            error!("Unknown command '{}'. Usage: bakery-shop [hash-password <password>]", other);
            return ExitCode::FAILURE;
        }
        None => run().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Prints a bcrypt hash suitable for `ADMIN_PASSWORD_HASH`.
fn print_password_hash(password: Option<String>) -> Result<()> {
    let password = password.unwrap_or_default();
    let hash = auth::hash_password(&password)?;
    println!("{hash}");
    Ok(())
}

async fn run() -> Result<()> {
    // 3. Load the application configuration and secrets
    let app_config = config::load_app_configuration()?;
    let secrets = Secrets::from_env();
    secrets.warn_missing();

    // 4. Open the repository backend
    let store = Store::open(&app_config.storage)
        .await
        .inspect(|_| info!("Store opened successfully."))
        .inspect_err(|e| error!("Failed to open store: {}", e))?;

    // 5. Build the collaborators
    let uploads = UploadStore::new(
        &app_config.storage.upload_dir,
        &app_config.storage.image_url_prefix,
    );
    let admin_auth = AdminAuth::new(secrets.admin_password_hash.clone(), &app_config.auth);
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| Error::Config {
            message: format!("Failed to build HTTP client: {e}"),
        })?;
    let mailer = notify::build_mailer(&http, &app_config.email, secrets.email_relay_token.clone());
    let gateway: Arc<dyn PaymentGateway> = Arc::new(MercadoPagoClient::new(
        http,
        app_config.payment.clone(),
        secrets.payment_access_token.clone(),
    ));

    // 6. Serve
    let state = AppState::new(app_config, store, uploads, admin_auth, mailer, gateway);
    api::serve(state).await
}

//! Mercado Pago Checkout Pro client.
//!
//! Creates preferences with `POST {api_base}/checkout/preferences`, authenticated with the
//! account's access token. Any transport failure, non-2xx answer, or answer without
//! `id`/`init_point` is reported as [`Error::ExternalService`].

use crate::{
    config::PaymentConfig,
    errors::{Error, Result},
    payment::{Payer, PaymentGateway, Preference, PreferenceItem, PreferenceRequest},
};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument, warn};

const SERVICE: &str = "payment gateway";

#[derive(Serialize)]
struct BackUrls<'a> {
    success: &'a str,
    failure: &'a str,
    pending: &'a str,
}

#[derive(Serialize)]
struct PreferenceBody<'a> {
    items: &'a [PreferenceItem],
    #[serde(skip_serializing_if = "Option::is_none")]
    payer: Option<&'a Payer>,
    back_urls: BackUrls<'a>,
    auto_return: &'static str,
    statement_descriptor: &'a str,
}

pub struct MercadoPagoClient {
    http: reqwest::Client,
    config: PaymentConfig,
    access_token: Option<String>,
}

impl MercadoPagoClient {
    #[must_use]
    pub const fn new(
        http: reqwest::Client,
        config: PaymentConfig,
        access_token: Option<String>,
    ) -> Self {
        Self {
            http,
            config,
            access_token,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/checkout/preferences",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| Error::ExternalService {
                service: SERVICE,
                message: "access token is not configured".to_string(),
            })?;

        let body = PreferenceBody {
            items: &request.items,
            payer: request.payer.as_ref(),
            back_urls: BackUrls {
                success: &self.config.success_url,
                failure: &self.config.failure_url,
                pending: &self.config.pending_url,
            },
            auto_return: "approved",
            statement_descriptor: &self.config.statement_descriptor,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ExternalService {
                service: SERVICE,
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Preference rejected with {}: {}", status, detail);
            return Err(Error::ExternalService {
                service: SERVICE,
                message: format!("status {status}: {detail}"),
            });
        }

        let preference: Preference = response.json().await.map_err(|e| Error::ExternalService {
            service: SERVICE,
            message: format!("invalid response: {e}"),
        })?;
        info!("Created payment preference {}", preference.id);
        Ok(preference)
    }
}

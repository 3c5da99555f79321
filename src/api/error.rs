//! Mapping of [`Error`] onto HTTP responses.
//!
//! Every failure is answered with `{"success": false, "message": "..."}`. Server-side
//! failures are logged here and answered with a generic message.

use crate::errors::Error;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error};

impl Error {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationMissing => StatusCode::UNAUTHORIZED,
            Self::AuthenticationDenied => StatusCode::FORBIDDEN,
            Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            Self::AuthenticationSystem { .. }
            | Self::Config { .. }
            | Self::Storage { .. }
            | Self::Io(_)
            | Self::Database(_)
            | Self::Json(_)
            | Self::IntConversion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::AuthenticationSystem { .. } => {
                "Authentication could not be completed on the server".to_string()
            }
            Self::Config { .. }
            | Self::Storage { .. }
            | Self::Io(_)
            | Self::Database(_)
            | Self::Json(_)
            | Self::IntConversion(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        } else {
            debug!("Request rejected with {}: {}", status, self);
        }

        let body = Json(json!({
            "success": false,
            "message": self.public_message(),
        }));
        (status, body).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

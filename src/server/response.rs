//! JSON error responses

use crate::utils::errors::RepoChatError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Headline used when the chat pipeline fails upstream
pub const CHAT_FAILURE: &str = "Unable to process chat message";

/// Wire shape of every error: `{error, details?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// An error on its way out of a handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
    category: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                details,
            },
            category: "request",
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, None)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, None)
    }

    /// Chat failures: server-side faults get the fixed headline with the cause in `details`
    pub fn chat(err: RepoChatError) -> Self {
        let mut api = Self::from(err);
        if api.status.is_server_error() {
            let cause = std::mem::replace(&mut api.body.error, CHAT_FAILURE.to_string());
            api.body.details = api.body.details.or(Some(cause));
        }
        api
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorBody {
        &self.body
    }
}

impl From<RepoChatError> for ApiError {
    fn from(err: RepoChatError) -> Self {
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            body: ErrorBody {
                error: err.to_string(),
                details: err.details(),
            },
            category: err.category(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), category = self.category, error = %self.body.error, "request failed");
        } else {
            warn!(status = self.status.as_u16(), category = self.category, error = %self.body.error, "request rejected");
        }
        (self.status, Json(self.body)).into_response()
    }
}

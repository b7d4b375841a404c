//! HTTP mapping for billing errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use remit_billing::BillingError;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

/// Billing error carried to the HTTP boundary
#[derive(Debug)]
pub struct ApiError(BillingError);

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            BillingError::InvoiceNotFound(_) | BillingError::CustomerNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            BillingError::UnknownStatus(_) | BillingError::UnknownCurrency(_) => {
                StatusCode::BAD_REQUEST
            }
            BillingError::Database(_) | BillingError::Scheduler(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "Internal server error");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

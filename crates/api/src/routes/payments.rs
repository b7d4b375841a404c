//! Payment trigger endpoints.
//!
//! A fully successful batch answers 200; a batch where some invoice could
//! not be paid answers 202 with a pointer to the payment provider.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct PaymentOutcome {
    paid: bool,
    message: &'static str,
}

type PaymentResponse = (StatusCode, Json<PaymentOutcome>);

fn outcome(paid: bool, on_success: &'static str, on_failure: &'static str) -> PaymentResponse {
    if paid {
        (
            StatusCode::OK,
            Json(PaymentOutcome {
                paid,
                message: on_success,
            }),
        )
    } else {
        (
            StatusCode::ACCEPTED,
            Json(PaymentOutcome {
                paid,
                message: on_failure,
            }),
        )
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payments/invoices/{id}", post(pay_invoice))
        .route(
            "/payments/invoices/status/{status}",
            post(pay_invoices_by_status),
        )
        .route("/payments/customers/{id}", post(pay_customer_invoices))
        .route(
            "/payments/customers/{id}/status/{status}",
            post(pay_customer_invoices_by_status),
        )
}

async fn pay_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<PaymentResponse> {
    let paid = state.engine.process_invoice(id).await?;
    Ok(outcome(
        paid,
        "The invoice has been paid correctly",
        "The invoice cannot be paid. Please consult the payment provider",
    ))
}

async fn pay_invoices_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> ApiResult<PaymentResponse> {
    let paid = state
        .engine
        .process_invoices_by_status(&status, None)
        .await?;
    Ok(outcome(
        paid,
        "The invoices have been paid correctly",
        "Some of the invoices cannot be paid. Please consult the payment provider",
    ))
}

async fn pay_customer_invoices(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<PaymentResponse> {
    let paid = state
        .engine
        .process_invoices_by_customer(id, None, None)
        .await?;
    Ok(outcome(
        paid,
        "The customer's invoices have been paid correctly",
        "The customer's invoices cannot be paid. Please consult the payment provider",
    ))
}

async fn pay_customer_invoices_by_status(
    State(state): State<AppState>,
    Path((id, status)): Path<(i64, String)>,
) -> ApiResult<PaymentResponse> {
    let paid = state
        .engine
        .process_invoices_by_customer(id, Some(&status), None)
        .await?;
    Ok(outcome(
        paid,
        "The customer's invoices have been paid correctly",
        "The customer's invoices cannot be paid. Please consult the payment provider",
    ))
}

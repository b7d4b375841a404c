//! Invoice read endpoints.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use remit_shared::Invoice;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices))
        .route("/invoices/{id}", get(get_invoice))
        .route("/invoices/status/{status}", get(list_invoices_by_status))
}

async fn list_invoices(State(state): State<AppState>) -> ApiResult<Json<Vec<Invoice>>> {
    Ok(Json(state.invoices.fetch_all().await?))
}

async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.invoices.fetch(id).await?))
}

async fn list_invoices_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> ApiResult<Json<Vec<Invoice>>> {
    Ok(Json(state.invoices.fetch_by_status(&status).await?))
}

//! Customer read endpoints.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use remit_shared::Customer;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers))
        .route("/customers/{id}", get(get_customer))
}

async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.customers.fetch_all().await?))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.customers.fetch(id).await?))
}

//! URL endpoints for the rest app.

pub mod customers;
pub mod invoices;
pub mod payments;

use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/rest/health", get(health))
        .nest(
            "/rest/v1",
            Router::new()
                .merge(invoices::router())
                .merge(customers::router())
                .merge(payments::router()),
        )
        .with_state(state)
}

/// Route to check whether the app is running
async fn health() -> Json<&'static str> {
    Json("ok")
}

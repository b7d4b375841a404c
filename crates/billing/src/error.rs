//! Error types for the billing crate.

use remit_shared::{UnknownCurrency, UnknownStatus};
use tokio_cron_scheduler::JobSchedulerError;

pub type BillingResult<T> = Result<T, BillingError>;

/// Errors surfaced by the billing services.
///
/// Provider-side charge failures are not represented here: the engine
/// resolves them into invoice statuses and batch results (see
/// [`crate::provider::PaymentError`]). What remains is what callers can
/// actually act on: bad input, missing entities and infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("invoice {0} not found")]
    InvoiceNotFound(i64),

    #[error("customer {0} not found")]
    CustomerNotFound(i64),

    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),

    #[error(transparent)]
    UnknownCurrency(#[from] UnknownCurrency),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),
}

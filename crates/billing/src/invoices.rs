//! Invoice access service.
//!
//! Thin translation layer between callers and the store: validates status
//! names, turns missing rows into typed not-found errors, and shields
//! status writes with a short jittered retry before the failure is
//! propagated.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use remit_shared::{Invoice, InvoicePage, InvoiceStatus};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::error::{BillingError, BillingResult};
use crate::store::InvoiceStore;

// Jittered backoff for status writes: 10ms, 100ms, 1000ms, then give up.
const UPDATE_RETRY_BASE_MS: u64 = 10;
const UPDATE_RETRY_MAX: Duration = Duration::from_millis(1000);
const UPDATE_RETRIES: usize = 3;

#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn InvoiceStore>,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn InvoiceStore>) -> Self {
        Self { store }
    }

    /// Validate a status name from an external caller
    pub fn resolve_status(&self, name: &str) -> BillingResult<InvoiceStatus> {
        Ok(InvoiceStatus::from_str(name)?)
    }

    pub async fn fetch(&self, id: i64) -> BillingResult<Invoice> {
        self.store
            .fetch_invoice(id)
            .await?
            .ok_or(BillingError::InvoiceNotFound(id))
    }

    pub async fn fetch_all(&self) -> BillingResult<Vec<Invoice>> {
        self.store.fetch_invoices().await
    }

    pub async fn fetch_by_status(&self, status_name: &str) -> BillingResult<Vec<Invoice>> {
        let status = self.resolve_status(status_name)?;
        self.store.fetch_invoices_by_status(status).await
    }

    pub async fn fetch_page_by_status(
        &self,
        status: InvoiceStatus,
        page_size: i64,
        marker: Option<i64>,
    ) -> BillingResult<InvoicePage> {
        self.store
            .fetch_page_by_status(status, page_size, marker)
            .await
    }

    pub async fn fetch_page_by_customer(
        &self,
        customer_id: i64,
        status: InvoiceStatus,
        page_size: i64,
        marker: Option<i64>,
    ) -> BillingResult<InvoicePage> {
        self.store
            .fetch_page_by_customer(customer_id, status, page_size, marker)
            .await
    }

    /// Persist a status transition.
    ///
    /// The state machine depends on this write landing, so transient store
    /// hiccups are retried with jittered backoff; if the write still fails
    /// the error propagates as fatal for the invoice's attempt.
    pub async fn update_status(
        &self,
        id: i64,
        new_status: InvoiceStatus,
    ) -> BillingResult<Invoice> {
        let strategy = ExponentialBackoff::from_millis(UPDATE_RETRY_BASE_MS)
            .max_delay(UPDATE_RETRY_MAX)
            .map(jitter)
            .take(UPDATE_RETRIES);

        let updated = Retry::spawn(strategy, || self.store.update_status(id, new_status)).await?;

        updated.ok_or(BillingError::InvoiceNotFound(id))
    }

    /// Return fences older than `max_age` to `PENDING`.
    ///
    /// `max_age` must exceed the longest possible charge attempt including
    /// its full retry budget; rows younger than that may belong to a live
    /// attempt.
    pub async fn release_stale_fences(&self, max_age: Duration) -> BillingResult<u64> {
        let released = self.store.release_stale_fences(max_age).await?;
        if released > 0 {
            tracing::warn!(
                released = released,
                max_age_secs = max_age.as_secs(),
                "Released stale payment fences back to PENDING"
            );
        }
        Ok(released)
    }
}

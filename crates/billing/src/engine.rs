//! Billing engine.
//!
//! Drives the idempotent per-invoice state machine, the retry/backoff
//! policy around the external charge call, the circuit breaker, and the
//! marker-driven pagination walks. Batch results are the logical AND of
//! the individual invoice results; one invoice's failure never stops the
//! rest of the batch.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use remit_shared::{Invoice, InvoicePage, InvoiceStatus};

use crate::breaker::CircuitBreaker;
use crate::config::BillingConfig;
use crate::error::{BillingError, BillingResult};
use crate::invoices::InvoiceService;
use crate::provider::{PaymentError, PaymentProvider};

/// Failure of a single charge attempt.
///
/// `Transient` asks the retry policy to try again; `Fatal` carries a
/// persistence failure the state machine cannot proceed past.
enum AttemptError {
    Transient(PaymentError),
    Fatal(BillingError),
}

#[derive(Clone)]
pub struct BillingEngine {
    invoices: InvoiceService,
    provider: Arc<dyn PaymentProvider>,
    breaker: CircuitBreaker,
    config: BillingConfig,
}

impl BillingEngine {
    pub fn new(
        invoices: InvoiceService,
        provider: Arc<dyn PaymentProvider>,
        config: BillingConfig,
    ) -> Self {
        let breaker = CircuitBreaker::new(config.breaker.clone());
        Self {
            invoices,
            provider,
            breaker,
            config,
        }
    }

    /// Process one invoice by id. Idempotent: a settled or in-flight
    /// invoice is reported successful without contacting the provider.
    pub async fn process_invoice(&self, id: i64) -> BillingResult<bool> {
        let invoice = self.invoices.fetch(id).await?;
        Ok(self.process_batch(vec![invoice]).await)
    }

    /// Walk and process every invoice in the given status
    pub async fn process_invoices_by_status(
        &self,
        status_name: &str,
        page_size: Option<i64>,
    ) -> BillingResult<bool> {
        let status = self.invoices.resolve_status(status_name)?;
        let page_size = page_size.unwrap_or(self.config.page_size);

        let mut result = true;
        let mut marker = None;
        loop {
            let InvoicePage {
                invoices,
                is_last,
                marker: page_marker,
            } = self
                .invoices
                .fetch_page_by_status(status, page_size, marker)
                .await?;

            result = self.process_batch(invoices).await && result;

            if is_last {
                break;
            }
            marker = page_marker;
        }
        Ok(result)
    }

    /// Walk and process one customer's invoices in the given status
    /// (`PENDING` when none is named)
    pub async fn process_invoices_by_customer(
        &self,
        customer_id: i64,
        status_name: Option<&str>,
        page_size: Option<i64>,
    ) -> BillingResult<bool> {
        let status = match status_name {
            Some(name) => self.invoices.resolve_status(name)?,
            None => InvoiceStatus::Pending,
        };
        let page_size = page_size.unwrap_or(self.config.page_size);

        let mut result = true;
        let mut marker = None;
        loop {
            let InvoicePage {
                invoices,
                is_last,
                marker: page_marker,
            } = self
                .invoices
                .fetch_page_by_customer(customer_id, status, page_size, marker)
                .await?;

            result = self.process_batch(invoices).await && result;

            if is_last {
                break;
            }
            marker = page_marker;
        }
        Ok(result)
    }

    /// Process a batch of invoices as a bounded concurrent stream.
    ///
    /// Infrastructure errors are contained here: logged and folded into
    /// the aggregate as a failure. An empty batch is vacuously successful.
    async fn process_batch(&self, invoices: Vec<Invoice>) -> bool {
        stream::iter(invoices)
            .map(|invoice| async move {
                let invoice_id = invoice.id;
                match self.charge_with_retry(&invoice).await {
                    Ok(paid) => paid,
                    Err(e) => {
                        tracing::error!(
                            invoice_id = invoice_id,
                            error = %e,
                            "Exception processing the invoice"
                        );
                        false
                    }
                }
            })
            .buffer_unordered(self.config.charge_concurrency.max(1))
            .fold(true, |acc, paid| async move { acc && paid })
            .await
    }

    /// Bounded retry loop around a single charge attempt.
    ///
    /// Only transient provider failures re-enter the loop; each re-entry
    /// runs the full state machine again (the fence was released when the
    /// failure surfaced). Backoff suspends only this invoice's future.
    async fn charge_with_retry(&self, invoice: &Invoice) -> BillingResult<bool> {
        let mut attempt: u32 = 0;
        loop {
            match self.attempt_charge(invoice).await {
                Ok(paid) => return Ok(paid),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Transient(e)) => {
                    if attempt >= self.config.max_retries {
                        tracing::warn!(
                            invoice_id = invoice.id,
                            tries = attempt + 1,
                            error = %e,
                            "Retry budget exhausted, invoice stays PENDING"
                        );
                        return Ok(false);
                    }
                    attempt += 1;
                    let delay = self.config.backoff_delay(attempt);
                    tracing::debug!(
                        invoice_id = invoice.id,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient provider failure, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One pass through the per-invoice state machine.
    ///
    /// The fence (`STARTED_PAYMENT`) is persisted before the provider is
    /// contacted, and the resolving status is persisted before the attempt
    /// reports its result.
    async fn attempt_charge(&self, invoice: &Invoice) -> Result<bool, AttemptError> {
        tracing::debug!(invoice_id = invoice.id, "Processing invoice");

        match invoice.status {
            InvoiceStatus::Paid => {
                tracing::debug!(invoice_id = invoice.id, "Invoice already paid, skipping");
                return Ok(true);
            }
            InvoiceStatus::StartedPayment => {
                tracing::info!(
                    invoice_id = invoice.id,
                    "Invoice has a payment attempt in flight, skipping"
                );
                return Ok(true);
            }
            _ => {}
        }

        if !self.breaker.try_acquire() {
            tracing::warn!(
                invoice_id = invoice.id,
                "Circuit breaker open, skipping charge"
            );
            return Ok(false);
        }

        self.persist(invoice.id, InvoiceStatus::StartedPayment)
            .await?;

        match self.provider.charge(invoice).await {
            Ok(authorized) => {
                self.breaker.record_success();
                let resolved = if authorized {
                    InvoiceStatus::Paid
                } else {
                    InvoiceStatus::Pending
                };
                self.persist(invoice.id, resolved).await?;
                tracing::info!(
                    invoice_id = invoice.id,
                    result = authorized,
                    "Processed invoice"
                );
                Ok(authorized)
            }
            Err(e) if e.is_transient() => {
                self.breaker.record_failure();
                tracing::error!(invoice_id = invoice.id, error = %e, "Network error processing invoice");
                // Release the fence before handing the failure to the retry policy.
                self.persist(invoice.id, InvoiceStatus::Pending).await?;
                Err(AttemptError::Transient(e))
            }
            Err(PaymentError::CustomerNotFound(customer_id)) => {
                self.breaker.record_success();
                tracing::error!(
                    invoice_id = invoice.id,
                    customer_id = customer_id,
                    "Provider does not know the invoice's customer"
                );
                self.persist(invoice.id, InvoiceStatus::MissingCustomer)
                    .await?;
                Ok(false)
            }
            Err(PaymentError::CurrencyMismatch(customer_id)) => {
                self.breaker.record_success();
                tracing::error!(
                    invoice_id = invoice.id,
                    customer_id = customer_id,
                    "Invoice currency does not match the customer's currency"
                );
                self.persist(invoice.id, InvoiceStatus::CurrencyMismatch)
                    .await?;
                Ok(false)
            }
            Err(e) => {
                self.breaker.record_failure();
                tracing::error!(invoice_id = invoice.id, error = %e, "Unclassified provider failure");
                self.persist(invoice.id, InvoiceStatus::Pending).await?;
                Ok(false)
            }
        }
    }

    async fn persist(&self, id: i64, status: InvoiceStatus) -> Result<Invoice, AttemptError> {
        self.invoices
            .update_status(id, status)
            .await
            .map_err(AttemptError::Fatal)
    }
}

// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! remit billing core
//!
//! Charges the payment provider for outstanding invoices and records the
//! outcome durably, without double-charging and without letting transient
//! provider failures abort a whole batch.
//!
//! ## Features
//!
//! - **Idempotent charge attempts**: `STARTED_PAYMENT` fences every
//!   in-flight attempt so an invoice is never charged twice
//! - **Retry with backoff**: transient provider failures are retried with
//!   linear capped backoff
//! - **Circuit breaking**: a degraded provider is short-circuited for a
//!   cooldown window instead of being hammered
//! - **Paginated walks**: unbounded invoice sets are processed in
//!   bounded-size pages
//! - **Scheduled fan-out**: cron-driven settlement, one task per customer

pub mod breaker;
pub mod config;
pub mod customers;
pub mod engine;
pub mod error;
pub mod http;
pub mod invoices;
pub mod provider;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod testing;

// Breaker
pub use breaker::{CircuitBreaker, CircuitBreakerConfig};

// Config
pub use config::BillingConfig;

// Customers
pub use customers::CustomerService;

// Engine
pub use engine::BillingEngine;

// Error
pub use error::{BillingError, BillingResult};

// Provider
pub use http::HttpPaymentProvider;
pub use provider::{PaymentError, PaymentProvider};

// Invoices
pub use invoices::InvoiceService;

// Scheduler
pub use scheduler::{PaymentScheduler, ScheduleHandle};

// Store
pub use store::{InvoiceStore, PgInvoiceStore};

use std::sync::Arc;

use sqlx::PgPool;

/// Main billing service that wires the core together
pub struct Billing {
    pub invoices: InvoiceService,
    pub customers: CustomerService,
    pub engine: BillingEngine,
    pub scheduler: PaymentScheduler,
}

impl Billing {
    /// Create a billing service over an arbitrary store and provider
    pub fn new(
        store: Arc<dyn InvoiceStore>,
        provider: Arc<dyn PaymentProvider>,
        config: BillingConfig,
    ) -> Self {
        let invoices = InvoiceService::new(store.clone());
        let customers = CustomerService::new(store);
        let engine = BillingEngine::new(invoices.clone(), provider, config);
        let scheduler = PaymentScheduler::new(engine.clone(), customers.clone());

        Self {
            invoices,
            customers,
            engine,
            scheduler,
        }
    }

    /// Create a billing service over the Postgres store
    pub fn from_pool(
        pool: PgPool,
        provider: Arc<dyn PaymentProvider>,
        config: BillingConfig,
    ) -> Self {
        Self::new(Arc::new(PgInvoiceStore::new(pool)), provider, config)
    }
}

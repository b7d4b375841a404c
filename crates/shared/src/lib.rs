// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shared foundation for the remit workspace
//!
//! Holds the domain model (invoices, customers, money) and the database
//! plumbing both binaries build on.

pub mod db;
pub mod models;

pub use db::{create_pool, run_migrations};
pub use models::{
    Currency, Customer, Invoice, InvoicePage, InvoiceStatus, Money, UnknownCurrency,
    UnknownStatus,
};

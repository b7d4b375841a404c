//! Customer access service.

use std::sync::Arc;

use remit_shared::Customer;

use crate::error::{BillingError, BillingResult};
use crate::store::InvoiceStore;

#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn InvoiceStore>,
}

impl CustomerService {
    pub fn new(store: Arc<dyn InvoiceStore>) -> Self {
        Self { store }
    }

    pub async fn fetch(&self, id: i64) -> BillingResult<Customer> {
        self.store
            .fetch_customer(id)
            .await?
            .ok_or(BillingError::CustomerNotFound(id))
    }

    pub async fn fetch_all(&self) -> BillingResult<Vec<Customer>> {
        self.store.fetch_customers().await
    }
}

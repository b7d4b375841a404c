//! Application state

use remit_billing::{Billing, BillingEngine, CustomerService, InvoiceService};

#[derive(Clone)]
pub struct AppState {
    pub invoices: InvoiceService,
    pub customers: CustomerService,
    pub engine: BillingEngine,
}

impl AppState {
    pub fn new(billing: &Billing) -> Self {
        Self {
            invoices: billing.invoices.clone(),
            customers: billing.customers.clone(),
            engine: billing.engine.clone(),
        }
    }
}

//! In-memory test doubles for the store and the payment provider.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use remit_shared::{Currency, Customer, Invoice, InvoicePage, InvoiceStatus, Money};
use rust_decimal_macros::dec;

use crate::error::{BillingError, BillingResult};
use crate::provider::{PaymentError, PaymentProvider};
use crate::store::InvoiceStore;

pub(crate) fn an_invoice(id: i64, customer_id: i64, status: InvoiceStatus) -> Invoice {
    Invoice {
        id,
        customer_id,
        amount: Money {
            value: dec!(100.00),
            currency: Currency::Dkk,
        },
        status,
    }
}

/// Store double over a BTreeMap (ascending-id iteration for free).
///
/// Records every status write and the marker of every page fetch so tests
/// can assert ordering and pagination shape.
#[derive(Default)]
pub(crate) struct InMemoryStore {
    invoices: Mutex<BTreeMap<i64, Invoice>>,
    customers: Mutex<Vec<Customer>>,
    fenced_at: Mutex<HashMap<i64, Instant>>,
    pub(crate) status_writes: Mutex<Vec<(i64, InvoiceStatus)>>,
    pub(crate) page_markers: Mutex<Vec<Option<i64>>>,
    pub(crate) fail_status_writes: AtomicBool,
}

impl InMemoryStore {
    pub(crate) fn with_invoices(invoices: impl IntoIterator<Item = Invoice>) -> Self {
        let store = Self::default();
        {
            let mut map = store.invoices.lock().unwrap();
            for invoice in invoices {
                map.insert(invoice.id, invoice);
            }
        }
        store
    }

    pub(crate) fn add_customer(&self, customer: Customer) {
        self.customers.lock().unwrap().push(customer);
    }

    pub(crate) fn status_of(&self, id: i64) -> InvoiceStatus {
        self.invoices.lock().unwrap()[&id].status
    }

    pub(crate) fn writes_for(&self, id: i64) -> Vec<InvoiceStatus> {
        self.status_writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(written_id, _)| *written_id == id)
            .map(|(_, status)| *status)
            .collect()
    }

    pub(crate) fn page_fetches(&self) -> usize {
        self.page_markers.lock().unwrap().len()
    }

    fn page(&self, invoices: Vec<Invoice>, page_size: i64, marker: Option<i64>) -> InvoicePage {
        self.page_markers.lock().unwrap().push(marker);
        let rows: Vec<Invoice> = invoices
            .into_iter()
            .filter(|invoice| marker.map_or(true, |m| invoice.id > m))
            .take(page_size as usize)
            .collect();
        InvoicePage::from_rows(rows, page_size)
    }
}

#[async_trait]
impl InvoiceStore for InMemoryStore {
    async fn fetch_invoice(&self, id: i64) -> BillingResult<Option<Invoice>> {
        Ok(self.invoices.lock().unwrap().get(&id).cloned())
    }

    async fn fetch_invoices(&self) -> BillingResult<Vec<Invoice>> {
        Ok(self.invoices.lock().unwrap().values().cloned().collect())
    }

    async fn fetch_invoices_by_status(
        &self,
        status: InvoiceStatus,
    ) -> BillingResult<Vec<Invoice>> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|invoice| invoice.status == status)
            .cloned()
            .collect())
    }

    async fn fetch_page_by_status(
        &self,
        status: InvoiceStatus,
        page_size: i64,
        marker: Option<i64>,
    ) -> BillingResult<InvoicePage> {
        let matching: Vec<Invoice> = self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|invoice| invoice.status == status)
            .cloned()
            .collect();
        Ok(self.page(matching, page_size, marker))
    }

    async fn fetch_page_by_customer(
        &self,
        customer_id: i64,
        status: InvoiceStatus,
        page_size: i64,
        marker: Option<i64>,
    ) -> BillingResult<InvoicePage> {
        let matching: Vec<Invoice> = self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|invoice| invoice.customer_id == customer_id && invoice.status == status)
            .cloned()
            .collect();
        Ok(self.page(matching, page_size, marker))
    }

    async fn update_status(
        &self,
        id: i64,
        new_status: InvoiceStatus,
    ) -> BillingResult<Option<Invoice>> {
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(BillingError::Database(sqlx::Error::PoolClosed));
        }

        self.status_writes.lock().unwrap().push((id, new_status));

        let mut fences = self.fenced_at.lock().unwrap();
        if new_status == InvoiceStatus::StartedPayment {
            fences.insert(id, Instant::now());
        } else {
            fences.remove(&id);
        }
        drop(fences);

        let mut invoices = self.invoices.lock().unwrap();
        Ok(invoices.get_mut(&id).map(|invoice| {
            invoice.status = new_status;
            invoice.clone()
        }))
    }

    async fn release_stale_fences(&self, max_age: Duration) -> BillingResult<u64> {
        let stale: Vec<i64> = self
            .fenced_at
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, fenced)| fenced.elapsed() >= max_age)
            .map(|(id, _)| *id)
            .collect();

        let mut invoices = self.invoices.lock().unwrap();
        let mut fences = self.fenced_at.lock().unwrap();
        for id in &stale {
            if let Some(invoice) = invoices.get_mut(id) {
                invoice.status = InvoiceStatus::Pending;
            }
            fences.remove(id);
        }
        Ok(stale.len() as u64)
    }

    async fn fetch_customer(&self, id: i64) -> BillingResult<Option<Customer>> {
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|customer| customer.id == id)
            .copied())
    }

    async fn fetch_customers(&self) -> BillingResult<Vec<Customer>> {
        Ok(self.customers.lock().unwrap().clone())
    }
}

/// Provider double driven by a script of outcomes.
///
/// Each charge call consumes the next scripted outcome; once the script
/// runs dry the default outcome repeats. Counts every call.
pub(crate) struct ScriptedProvider {
    script: Mutex<VecDeque<Result<bool, PaymentError>>>,
    default: Result<bool, PaymentError>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn always(outcome: Result<bool, PaymentError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default: outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn script(
        outcomes: impl IntoIterator<Item = Result<bool, PaymentError>>,
        then: Result<bool, PaymentError>,
    ) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            default: then,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    async fn charge(&self, _invoice: &Invoice) -> Result<bool, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

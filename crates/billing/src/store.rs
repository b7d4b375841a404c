//! Invoice store boundary and its Postgres implementation.
//!
//! The billing services only depend on [`InvoiceStore`]; `PgInvoiceStore`
//! is the production implementation. Pagination is keyset-based: pages are
//! ordered by id and the marker is the exclusive lower bound of the next
//! page.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use remit_shared::{Currency, Customer, Invoice, InvoicePage, InvoiceStatus, Money};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::{BillingError, BillingResult};

/// Durable store of invoices and customers
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn fetch_invoice(&self, id: i64) -> BillingResult<Option<Invoice>>;

    async fn fetch_invoices(&self) -> BillingResult<Vec<Invoice>>;

    async fn fetch_invoices_by_status(&self, status: InvoiceStatus)
        -> BillingResult<Vec<Invoice>>;

    async fn fetch_page_by_status(
        &self,
        status: InvoiceStatus,
        page_size: i64,
        marker: Option<i64>,
    ) -> BillingResult<InvoicePage>;

    async fn fetch_page_by_customer(
        &self,
        customer_id: i64,
        status: InvoiceStatus,
        page_size: i64,
        marker: Option<i64>,
    ) -> BillingResult<InvoicePage>;

    /// Persist a status change. Returns the updated invoice, or `None`
    /// when the id does not exist.
    async fn update_status(
        &self,
        id: i64,
        new_status: InvoiceStatus,
    ) -> BillingResult<Option<Invoice>>;

    /// Return `STARTED_PAYMENT` rows whose last status write is older than
    /// `max_age` to `PENDING`. Returns how many rows were released.
    async fn release_stale_fences(&self, max_age: Duration) -> BillingResult<u64>;

    async fn fetch_customer(&self, id: i64) -> BillingResult<Option<Customer>>;

    async fn fetch_customers(&self) -> BillingResult<Vec<Customer>>;
}

/// Row type for invoice queries
#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: i64,
    customer_id: i64,
    amount: Decimal,
    currency: String,
    status: String,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = BillingError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: row.id,
            customer_id: row.customer_id,
            amount: Money {
                value: row.amount,
                currency: Currency::from_str(&row.currency)?,
            },
            status: InvoiceStatus::from_str(&row.status)?,
        })
    }
}

/// Row type for customer queries
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    currency: String,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = BillingError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Customer {
            id: row.id,
            currency: Currency::from_str(&row.currency)?,
        })
    }
}

/// sqlx-backed invoice store
#[derive(Clone)]
pub struct PgInvoiceStore {
    pool: PgPool,
}

impl PgInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn rows_to_invoices(rows: Vec<InvoiceRow>) -> BillingResult<Vec<Invoice>> {
        rows.into_iter().map(Invoice::try_from).collect()
    }
}

#[async_trait]
impl InvoiceStore for PgInvoiceStore {
    async fn fetch_invoice(&self, id: i64) -> BillingResult<Option<Invoice>> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, amount, currency, status
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Invoice::try_from).transpose()
    }

    async fn fetch_invoices(&self) -> BillingResult<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, amount, currency, status
            FROM invoices
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Self::rows_to_invoices(rows)
    }

    async fn fetch_invoices_by_status(
        &self,
        status: InvoiceStatus,
    ) -> BillingResult<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, amount, currency, status
            FROM invoices
            WHERE status = $1
            ORDER BY id
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Self::rows_to_invoices(rows)
    }

    async fn fetch_page_by_status(
        &self,
        status: InvoiceStatus,
        page_size: i64,
        marker: Option<i64>,
    ) -> BillingResult<InvoicePage> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, amount, currency, status
            FROM invoices
            WHERE status = $1
              AND ($2::BIGINT IS NULL OR id > $2)
            ORDER BY id
            LIMIT $3
            "#,
        )
        .bind(status.as_str())
        .bind(marker)
        .bind(page_size)
        .fetch_all(&self.pool)
        .await?;

        Ok(InvoicePage::from_rows(
            Self::rows_to_invoices(rows)?,
            page_size,
        ))
    }

    async fn fetch_page_by_customer(
        &self,
        customer_id: i64,
        status: InvoiceStatus,
        page_size: i64,
        marker: Option<i64>,
    ) -> BillingResult<InvoicePage> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, amount, currency, status
            FROM invoices
            WHERE customer_id = $1
              AND status = $2
              AND ($3::BIGINT IS NULL OR id > $3)
            ORDER BY id
            LIMIT $4
            "#,
        )
        .bind(customer_id)
        .bind(status.as_str())
        .bind(marker)
        .bind(page_size)
        .fetch_all(&self.pool)
        .await?;

        Ok(InvoicePage::from_rows(
            Self::rows_to_invoices(rows)?,
            page_size,
        ))
    }

    async fn update_status(
        &self,
        id: i64,
        new_status: InvoiceStatus,
    ) -> BillingResult<Option<Invoice>> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            r#"
            UPDATE invoices
            SET status = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, customer_id, amount, currency, status
            "#,
        )
        .bind(id)
        .bind(new_status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Invoice::try_from).transpose()
    }

    async fn release_stale_fences(&self, max_age: Duration) -> BillingResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = 'PENDING',
                updated_at = NOW()
            WHERE status = 'STARTED_PAYMENT'
              AND updated_at < NOW() - make_interval(secs => $1)
            "#,
        )
        .bind(max_age.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn fetch_customer(&self, id: i64) -> BillingResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, currency
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    async fn fetch_customers(&self) -> BillingResult<Vec<Customer>> {
        let rows: Vec<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, currency
            FROM customers
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Customer::try_from).collect()
    }
}

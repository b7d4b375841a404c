//! Domain model: invoices, customers and monetary amounts.
//!
//! Statuses and currencies travel as their SCREAMING_SNAKE_CASE names on
//! the wire and in the database; both enums convert to and from those
//! names with a typed error for unknown values.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raised when a status name does not match any [`InvoiceStatus`]
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown invoice status: {0}")]
pub struct UnknownStatus(pub String);

/// Raised when a currency code does not match any [`Currency`]
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown currency: {0}")]
pub struct UnknownCurrency(pub String);

/// Lifecycle state of an invoice.
///
/// `StartedPayment` is the idempotency fence: it marks a charge attempt in
/// flight and is always resolved to exactly one of `Paid`, `Pending`,
/// `MissingCustomer` or `CurrencyMismatch`. The last three of those plus
/// `Paid` are never left once entered, except that `Pending` re-enters the
/// machine on the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    StartedPayment,
    Paid,
    MissingCustomer,
    CurrencyMismatch,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::StartedPayment => "STARTED_PAYMENT",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::MissingCustomer => "MISSING_CUSTOMER",
            InvoiceStatus::CurrencyMismatch => "CURRENCY_MISMATCH",
        }
    }

    /// Whether the status can never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Paid | InvoiceStatus::MissingCustomer | InvoiceStatus::CurrencyMismatch
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(InvoiceStatus::Pending),
            "STARTED_PAYMENT" => Ok(InvoiceStatus::StartedPayment),
            "PAID" => Ok(InvoiceStatus::Paid),
            "MISSING_CUSTOMER" => Ok(InvoiceStatus::MissingCustomer),
            "CURRENCY_MISMATCH" => Ok(InvoiceStatus::CurrencyMismatch),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Settlement currencies accepted by the payment provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Dkk,
    Eur,
    Gbp,
    Sek,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Dkk => "DKK",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Sek => "SEK",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DKK" => Ok(Currency::Dkk),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "SEK" => Ok(Currency::Sek),
            "USD" => Ok(Currency::Usd),
            other => Err(UnknownCurrency(other.to_string())),
        }
    }
}

/// A decimal amount in a settlement currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub value: Decimal,
    pub currency: Currency,
}

/// An invoice owned by a customer.
///
/// The id is assigned by the store, is immutable, and increases
/// monotonically; pagination markers are invoice ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub customer_id: i64,
    pub amount: Money,
    pub status: InvoiceStatus,
}

/// A customer and the currency their invoices settle in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub currency: Currency,
}

/// One page of a marker-driven invoice walk.
///
/// `is_last` is true iff the page holds fewer rows than were requested;
/// `marker` is the last invoice id in the page (`None` only when the page
/// is empty) and is the exclusive lower bound for the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePage {
    pub invoices: Vec<Invoice>,
    pub is_last: bool,
    pub marker: Option<i64>,
}

impl InvoicePage {
    /// Build a page from the rows a `LIMIT page_size` query returned,
    /// deriving `is_last` and `marker` per the pagination contract.
    pub fn from_rows(invoices: Vec<Invoice>, page_size: i64) -> Self {
        let is_last = (invoices.len() as i64) < page_size;
        let marker = invoices.last().map(|invoice| invoice.id);
        Self {
            invoices,
            is_last,
            marker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_names() {
        for status in [
            InvoiceStatus::Pending,
            InvoiceStatus::StartedPayment,
            InvoiceStatus::Paid,
            InvoiceStatus::MissingCustomer,
            InvoiceStatus::CurrencyMismatch,
        ] {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "SETTLED".parse::<InvoiceStatus>().unwrap_err();
        assert_eq!(err.0, "SETTLED");
    }

    #[test]
    fn terminal_statuses() {
        assert!(InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::MissingCustomer.is_terminal());
        assert!(InvoiceStatus::CurrencyMismatch.is_terminal());
        assert!(!InvoiceStatus::Pending.is_terminal());
        assert!(!InvoiceStatus::StartedPayment.is_terminal());
    }

    #[test]
    fn currency_round_trips_through_codes() {
        for currency in [
            Currency::Dkk,
            Currency::Eur,
            Currency::Gbp,
            Currency::Sek,
            Currency::Usd,
        ] {
            assert_eq!(currency.as_str().parse::<Currency>().unwrap(), currency);
        }
    }

    #[test]
    fn status_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&InvoiceStatus::StartedPayment).unwrap();
        assert_eq!(json, "\"STARTED_PAYMENT\"");
    }
}

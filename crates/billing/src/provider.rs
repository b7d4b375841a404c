//! Payment provider boundary.
//!
//! The engine only ever sees this trait; the production implementation is
//! [`crate::http::HttpPaymentProvider`], tests script their own.

use async_trait::async_trait;
use remit_shared::Invoice;

/// Failure modes of a charge call.
///
/// `Network` is the only transient kind; the retry policy acts on it and
/// nothing else. `CustomerNotFound` and `CurrencyMismatch` are terminal
/// for the invoice. Anything the provider surfaces outside this taxonomy
/// lands in `Unclassified` and is treated conservatively as non-terminal.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PaymentError {
    #[error("network failure reaching payment provider: {0}")]
    Network(String),

    #[error("payment provider does not know customer {0}")]
    CustomerNotFound(i64),

    #[error("invoice currency does not match customer {0}'s settlement currency")]
    CurrencyMismatch(i64),

    #[error("payment provider error: {0}")]
    Unclassified(String),
}

impl PaymentError {
    /// Whether the retry policy should act on this failure
    pub fn is_transient(&self) -> bool {
        matches!(self, PaymentError::Network(_))
    }
}

/// External capability that charges a customer account for an invoice.
///
/// `Ok(true)` means the charge went through; `Ok(false)` means the
/// provider explicitly declined (e.g. insufficient funds).
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn charge(&self, invoice: &Invoice) -> Result<bool, PaymentError>;
}

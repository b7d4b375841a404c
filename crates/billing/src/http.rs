//! HTTP implementation of the payment provider.
//!
//! Speaks a small JSON protocol: `POST {base_url}/charges` with the
//! invoice identity and amount, answered with `{"authorized": bool}` on
//! 2xx or `{"code": "..."}` on a 4xx decline. Transport failures and 5xx
//! responses are transient; decline codes map onto the domain errors.

use std::time::Duration;

use async_trait::async_trait;
use remit_shared::Invoice;
use serde::{Deserialize, Serialize};

use crate::provider::{PaymentError, PaymentProvider};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ChargeRequest<'a> {
    invoice_id: i64,
    customer_id: i64,
    amount: &'a rust_decimal::Decimal,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    authorized: bool,
}

#[derive(Debug, Deserialize)]
struct DeclineResponse {
    code: String,
}

/// Payment provider backed by an HTTP charge endpoint
#[derive(Clone)]
pub struct HttpPaymentProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, PaymentError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Unclassified(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn charge(&self, invoice: &Invoice) -> Result<bool, PaymentError> {
        let request = ChargeRequest {
            invoice_id: invoice.id,
            customer_id: invoice.customer_id,
            amount: &invoice.amount.value,
            currency: invoice.amount.currency.as_str(),
        };

        let response = self
            .client
            .post(format!("{}/charges", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        let status = response.status();

        if status.is_server_error() {
            return Err(PaymentError::Network(format!(
                "provider returned {status}"
            )));
        }

        if status.is_client_error() {
            let decline: DeclineResponse = response
                .json()
                .await
                .map_err(|e| PaymentError::Unclassified(e.to_string()))?;
            return Err(match decline.code.as_str() {
                "customer_not_found" => PaymentError::CustomerNotFound(invoice.customer_id),
                "currency_mismatch" => PaymentError::CurrencyMismatch(invoice.customer_id),
                other => PaymentError::Unclassified(format!("decline code {other}")),
            });
        }

        let body: ChargeResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Unclassified(e.to_string()))?;

        Ok(body.authorized)
    }
}

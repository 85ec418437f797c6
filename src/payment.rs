//! Payment settlement for completed charging sessions
//!
//! Computes the amount due from a captured record and routes the submission:
//! wallet payments go through the backend's atomic debit-and-record
//! operation, every other method through the on-site record operation whose
//! final confirmation happens at the counter.

use crate::api::ChargingApi;
use crate::config::PricingConfig;
use crate::error::Result;
use crate::logging::get_logger;
use crate::persistence::PendingPaymentRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Accepted payment methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Cash,
    Wallet,
    Qr,
    EWallet,
    BankTransfer,
    CreditCard,
    DebitCard,
}

impl PaymentMethod {
    /// Wire name of the method
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Qr => "qr",
            PaymentMethod::EWallet => "e-wallet",
            PaymentMethod::BankTransfer => "bank-transfer",
            PaymentMethod::CreditCard => "credit-card",
            PaymentMethod::DebitCard => "debit-card",
        }
    }
}

/// Settlement outcome reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Settled; nothing further is owed
    Completed,

    /// Recorded; a staff confirmation step finalizes it
    Pending,
}

/// Result of a settlement submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    /// Settlement status
    pub status: PaymentStatus,

    /// Backend transaction reference, when one was issued
    pub reference: Option<String>,
}

/// Structured summary emitted after a successful submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementSummary {
    /// Session the settlement belongs to
    pub session_id: String,

    /// Method used
    pub method: PaymentMethod,

    /// Amount submitted
    pub amount: f64,

    /// Outcome reported by the backend
    pub status: PaymentStatus,
}

/// Amount due for a captured record.
///
/// Pure in `(energy, price)`; the fallback unit price applies only when the
/// backend assigned none at capture time.
pub fn compute_amount(
    energy_consumed: f64,
    price_per_kwh: Option<f64>,
    fallback_price_per_kwh: f64,
) -> f64 {
    energy_consumed * price_per_kwh.unwrap_or(fallback_price_per_kwh)
}

/// Settlement routing and amount policy
pub struct PaymentReconciler {
    api: Arc<dyn ChargingApi>,
    fallback_price_per_kwh: f64,
    currency_symbol: String,
    logger: crate::logging::StructuredLogger,
}

impl PaymentReconciler {
    /// Create a reconciler over the given backend and pricing policy
    pub fn new(api: Arc<dyn ChargingApi>, pricing: &PricingConfig) -> Self {
        let logger = get_logger("payment");
        Self {
            api,
            fallback_price_per_kwh: pricing.fallback_price_per_kwh,
            currency_symbol: pricing.currency_symbol.clone(),
            logger,
        }
    }

    /// Amount due for the captured record
    pub fn amount_due(&self, record: &PendingPaymentRecord) -> f64 {
        compute_amount(
            record.energy_consumed,
            record.price_per_kwh,
            self.fallback_price_per_kwh,
        )
    }

    /// Submit a settlement for the captured record.
    ///
    /// The caller owns the state effects: it clears the recovery store and
    /// advances the tracker only after this returns `Ok`, preserving the
    /// detect → persist → submit ordering.
    pub async fn settle(
        &self,
        record: &PendingPaymentRecord,
        method: PaymentMethod,
        user_id: &str,
    ) -> Result<SettlementSummary> {
        let amount = self.amount_due(record);

        let result = if method == PaymentMethod::Wallet {
            self.api
                .submit_wallet_payment(
                    &record.session_id,
                    user_id,
                    record.energy_consumed,
                    record
                        .price_per_kwh
                        .unwrap_or(self.fallback_price_per_kwh),
                )
                .await?
        } else {
            self.api
                .submit_onsite_payment(&record.session_id, user_id, amount, method)
                .await?
        };

        let summary = SettlementSummary {
            session_id: record.session_id.clone(),
            method,
            amount,
            status: result.status,
        };
        self.logger.info(&format!(
            "Settlement recorded for session {}: {} {}{} ({:?})",
            summary.session_id,
            method.as_str(),
            self.currency_symbol,
            summary.amount,
            summary.status
        ));
        Ok(summary)
    }
}

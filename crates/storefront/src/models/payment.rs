//! Mock payment domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pazar_core::payment::CardBrand;
use pazar_core::{OrderId, PaymentId, PaymentStatus, Price, UserId};

/// A payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    /// Set once a successful payment has created its order.
    pub order_id: Option<OrderId>,
    pub amount: Price,
    /// Single-use token handed to the payer.
    pub token: Uuid,
    pub status: PaymentStatus,
    pub delivery_address: String,
    pub card_brand: Option<CardBrand>,
    pub card_last4: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for starting a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: UserId,
    pub amount: Price,
    pub token: Uuid,
    pub delivery_address: String,
}

/// Terminal outcome recorded when a payment leaves `PENDING`.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub status: PaymentStatus,
    pub order_id: Option<OrderId>,
    pub card_brand: Option<CardBrand>,
    pub card_last4: Option<String>,
    pub failure_reason: Option<String>,
}

/// Card data submitted by the payer. Never stored.
#[derive(Clone, Deserialize)]
pub struct CardDetails {
    pub card_number: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub cvv: String,
    #[serde(default)]
    pub holder: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("card_number", &"[REDACTED]")
            .field("expiry", &"[REDACTED]")
            .field("cvv", &"[REDACTED]")
            .field("holder", &self.holder)
            .finish()
    }
}

/// Returned when a payment is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    pub token: Uuid,
    pub amount: Price,
}

/// Returned when a payment is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentResult {
    pub succeeded: bool,
    pub status: PaymentStatus,
    pub message: String,
    pub order_id: Option<OrderId>,
}

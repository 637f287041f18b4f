//! Mock card evaluation.
//!
//! There is no payment network. A card number alone decides the outcome:
//! the sentinel [`FAILURE_CARD_NUMBER`] is always declined, any other 13 to 19
//! digit number is approved, and everything else fails validation. Expiry,
//! CVV and holder name are accepted but never change the outcome.

use serde::{Deserialize, Serialize};

use crate::types::PaymentStatus;

/// Card number that is always declined.
pub const FAILURE_CARD_NUMBER: &str = "4000000000000002";

const MIN_CARD_DIGITS: usize = 13;
const MAX_CARD_DIGITS: usize = 19;

/// Card network, derived from the issuer identification number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "pazar.card_brand", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CardBrand {
    Visa,
    Mastercard,
    AmericanExpress,
    Troy,
    Discover,
    Other,
}

impl CardBrand {
    /// Identify the brand from a digits-only card number.
    #[must_use]
    pub fn from_digits(digits: &str) -> Self {
        let prefix = |len: usize| digits.get(..len).and_then(|p| p.parse::<u32>().ok());

        if digits.starts_with('4') {
            Self::Visa
        } else if matches!(prefix(2), Some(51..=55)) || matches!(prefix(4), Some(2221..=2720)) {
            Self::Mastercard
        } else if matches!(prefix(2), Some(34 | 37)) {
            Self::AmericanExpress
        } else if prefix(4) == Some(9792) {
            Self::Troy
        } else if prefix(4) == Some(6011)
            || prefix(2) == Some(65)
            || matches!(prefix(3), Some(644..=649))
        {
            Self::Discover
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for CardBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Visa => write!(f, "Visa"),
            Self::Mastercard => write!(f, "Mastercard"),
            Self::AmericanExpress => write!(f, "American Express"),
            Self::Troy => write!(f, "Troy"),
            Self::Discover => write!(f, "Discover"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// Strip the separators people type into card fields.
#[must_use]
pub fn normalize_card_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Result of evaluating a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardCheck {
    /// `Succeeded` or `Failed`.
    pub outcome: PaymentStatus,
    pub message: String,
    /// Present only for numbers that passed validation.
    pub brand: Option<CardBrand>,
    pub last4: Option<String>,
}

impl CardCheck {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.outcome, PaymentStatus::Succeeded)
    }
}

/// Decide the outcome of a mock charge.
#[must_use]
pub fn evaluate_card(raw_number: &str) -> CardCheck {
    let digits = normalize_card_number(raw_number);
    let well_formed = (MIN_CARD_DIGITS..=MAX_CARD_DIGITS).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit());

    if !well_formed {
        return CardCheck {
            outcome: PaymentStatus::Failed,
            message: format!(
                "card number must be {MIN_CARD_DIGITS} to {MAX_CARD_DIGITS} digits"
            ),
            brand: None,
            last4: None,
        };
    }

    let brand = Some(CardBrand::from_digits(&digits));
    let last4 = digits.get(digits.len() - 4..).map(str::to_owned);

    if digits == FAILURE_CARD_NUMBER {
        CardCheck {
            outcome: PaymentStatus::Failed,
            message: "card declined".to_owned(),
            brand,
            last4,
        }
    } else {
        CardCheck {
            outcome: PaymentStatus::Succeeded,
            message: "payment approved".to_owned(),
            brand,
            last4,
        }
    }
}

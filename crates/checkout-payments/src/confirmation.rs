//! Checkout Confirmation Flow
//!
//! Browser-side half of the handshake as an explicit state machine:
//!
//! ```text
//! Editing ──submit──▶ CreatingIntent ──intent_created──▶ AwaitingConfirmation
//!    ▲                      │                                 │
//!    │               request_failed               confirmation_result
//!    │                      ▼                                 ▼
//!    └────── reset ──── Failed ◀──────── error ──────── Succeeded
//! ```
//!
//! Phase one asks the backend for a client secret; phase two redeems it
//! directly with the processor. The backend never sees card data.

use std::fmt;

use crate::config::DEFAULT_MIN_AMOUNT;
use crate::intent::{ClientSecret, CreatedIntent, IntentStatus};

/// Form state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmationState {
    /// Collecting amount and card details
    Editing,
    /// Waiting for the backend to create the intent
    CreatingIntent { amount: i64, currency: String },
    /// Holding the client secret while the processor confirms
    AwaitingConfirmation {
        intent_id: String,
        client_secret: ClientSecret,
    },
    Succeeded { intent_id: String },
    /// Message shown to the user verbatim
    Failed { message: String },
}

/// Transition not allowed from the current state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: &'static str,
    pub action: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {} while {}", self.action, self.from)
    }
}

impl std::error::Error for InvalidTransition {}

impl ConfirmationState {
    const fn name(&self) -> &'static str {
        match self {
            Self::Editing => "editing",
            Self::CreatingIntent { .. } => "creating intent",
            Self::AwaitingConfirmation { .. } => "awaiting confirmation",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Drives one checkout attempt
#[derive(Debug)]
pub struct ConfirmationFlow {
    state: ConfirmationState,
    min_amount: i64,
}

impl Default for ConfirmationFlow {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_AMOUNT)
    }
}

impl ConfirmationFlow {
    pub const fn new(min_amount: i64) -> Self {
        Self {
            state: ConfirmationState::Editing,
            min_amount,
        }
    }

    pub const fn state(&self) -> &ConfirmationState {
        &self.state
    }

    pub const fn is_busy(&self) -> bool {
        matches!(
            self.state,
            ConfirmationState::CreatingIntent { .. }
                | ConfirmationState::AwaitingConfirmation { .. }
        )
    }

    /// Submit the form. Amount is the text the user typed in major units.
    ///
    /// Client-side validation failures move to `Failed` without a request.
    pub fn submit(
        &mut self,
        amount: &str,
        currency: &str,
    ) -> Result<&ConfirmationState, InvalidTransition> {
        if !matches!(self.state, ConfirmationState::Editing | ConfirmationState::Failed { .. }) {
            return Err(self.invalid("submit"));
        }

        self.state = match parse_major_amount(amount) {
            Some(minor) if minor >= self.min_amount => ConfirmationState::CreatingIntent {
                amount: minor,
                currency: currency.to_lowercase(),
            },
            Some(_) => ConfirmationState::Failed {
                message: format!(
                    "Amount must be at least {}",
                    format_minor(self.min_amount, currency)
                ),
            },
            None => ConfirmationState::Failed {
                message: "Invalid amount".into(),
            },
        };
        Ok(&self.state)
    }

    /// Phase one finished: the backend returned a client secret
    pub fn intent_created(
        &mut self,
        created: CreatedIntent,
    ) -> Result<&ConfirmationState, InvalidTransition> {
        if !matches!(self.state, ConfirmationState::CreatingIntent { .. }) {
            return Err(self.invalid("accept an intent"));
        }
        self.state = ConfirmationState::AwaitingConfirmation {
            intent_id: created.intent.id,
            client_secret: created.client_secret,
        };
        Ok(&self.state)
    }

    /// Backend answered with an error body; show its `error` field verbatim
    pub fn request_failed(
        &mut self,
        message: impl Into<String>,
    ) -> Result<&ConfirmationState, InvalidTransition> {
        if !matches!(self.state, ConfirmationState::CreatingIntent { .. }) {
            return Err(self.invalid("fail a request"));
        }
        self.state = ConfirmationState::Failed {
            message: message.into(),
        };
        Ok(&self.state)
    }

    /// Phase two finished: the processor reported the confirmation result
    pub fn confirmation_result(
        &mut self,
        result: Result<IntentStatus, String>,
    ) -> Result<&ConfirmationState, InvalidTransition> {
        let ConfirmationState::AwaitingConfirmation { intent_id, .. } = &self.state else {
            return Err(self.invalid("confirm"));
        };
        let intent_id = intent_id.clone();

        self.state = match result {
            Ok(IntentStatus::Succeeded) => ConfirmationState::Succeeded { intent_id },
            Ok(status) => ConfirmationState::Failed {
                message: format!("Payment {status}"),
            },
            Err(message) => ConfirmationState::Failed { message },
        };
        Ok(&self.state)
    }

    /// Back to an empty form
    pub fn reset(&mut self) {
        self.state = ConfirmationState::Editing;
    }

    /// Secret to redeem with the processor, only while awaiting confirmation
    pub const fn client_secret(&self) -> Option<&ClientSecret> {
        match &self.state {
            ConfirmationState::AwaitingConfirmation { client_secret, .. } => Some(client_secret),
            _ => None,
        }
    }

    const fn invalid(&self, action: &'static str) -> InvalidTransition {
        InvalidTransition {
            from: self.state.name(),
            action,
        }
    }
}

/// Parse "20", "20.5" or "20.00" into minor units without floating point.
///
/// Assumes a two-decimal currency. Returns `None` for anything else.
pub fn parse_major_amount(input: &str) -> Option<i64> {
    let input = input.trim();
    let (whole, frac) = input.split_once('.').unwrap_or((input, ""));

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };

    whole.checked_mul(100)?.checked_add(cents)
}

fn format_minor(amount: i64, currency: &str) -> String {
    let symbol = if currency.eq_ignore_ascii_case("usd") { "$" } else { "" };
    format!(
        "{symbol}{}.{:02} {}",
        amount / 100,
        amount % 100,
        currency.to_uppercase()
    )
}

//! Payment Intent Model
//!
//! The processor owns every intent; these types are the backend's read-only
//! view of one, plus the single-use client secret handed to the browser.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// Lifecycle of a payment intent as reported by the processor
///
/// ```text
/// requires_payment_method ─▶ requires_confirmation ─▶ processing ─┬▶ succeeded
///          ▲                         │                             ├▶ payment_failed
///          └──── requires_action ◀───┘                             └▶ canceled
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Succeeded,
    Canceled,
    PaymentFailed,
}

impl IntentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::Processing => "processing",
            Self::RequiresCapture => "requires_capture",
            Self::Succeeded => "succeeded",
            Self::Canceled => "canceled",
            Self::PaymentFailed => "payment_failed",
        }
    }

    /// Terminal states accept no further transitions
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Canceled | Self::PaymentFailed)
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requires_payment_method" | "requires_source" => Ok(Self::RequiresPaymentMethod),
            "requires_confirmation" => Ok(Self::RequiresConfirmation),
            "requires_action" | "requires_source_action" => Ok(Self::RequiresAction),
            "processing" => Ok(Self::Processing),
            "requires_capture" => Ok(Self::RequiresCapture),
            "succeeded" => Ok(Self::Succeeded),
            "canceled" => Ok(Self::Canceled),
            "payment_failed" => Ok(Self::PaymentFailed),
            other => Err(PaymentError::upstream(format!("unknown intent status '{other}'"))),
        }
    }
}

/// Read-only snapshot of an intent, shaped like the public API response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentView {
    pub id: String,

    /// Minor currency units
    pub amount: i64,

    /// Lowercase ISO 4217 code
    pub currency: String,

    pub status: IntentStatus,

    /// Seconds since the Unix epoch
    pub created: i64,
}

/// Single-use token that lets the browser confirm one intent.
///
/// Formatting never reveals the value; call [`ClientSecret::expose`] at the
/// one place it is written into a response.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Stripe client secrets are `<intent id>_secret_<random>`
    pub fn intent_id(&self) -> Option<&str> {
        self.0.split_once("_secret_").map(|(id, _)| id)
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret([REDACTED])")
    }
}

impl fmt::Display for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Parameters for a new intent after validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateIntentParams {
    pub amount: i64,
    pub currency: String,

    /// Let the processor choose eligible payment methods
    pub automatic_payment_methods: bool,
}

/// Phase one of the confirmation handshake: the intent plus its secret
#[derive(Clone, Debug)]
pub struct CreatedIntent {
    pub intent: PaymentIntentView,
    pub client_secret: ClientSecret,
}

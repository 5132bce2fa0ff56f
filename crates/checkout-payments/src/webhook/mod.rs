//! Stripe Webhook Handling
//!
//! Inbound notifications are authenticated over the raw request body, parsed
//! into a typed event, and routed to handlers at most once per event id.
//!
//! ```text
//! raw body + Stripe-Signature
//!        │
//!        ▼
//! ┌────────────────┐   ┌────────────────┐   ┌──────────────────────┐
//! │ WebhookVerifier│──▶│  WebhookEvent  │──▶│  WebhookDispatcher   │
//! │ HMAC + window  │   │  typed kind    │   │  seen ids ─▶ handler │
//! └────────────────┘   └────────────────┘   └──────────────────────┘
//! ```

mod dedupe;
mod dispatch;
mod signature;

pub use dedupe::RecentEvents;
pub use dispatch::{DispatchOutcome, IntentStatusHandler, WebhookDispatcher, WebhookHandler};
pub use signature::{SIGNATURE_HEADER, WebhookVerifier, sign_payload};

use std::fmt;

use serde::Deserialize;

use crate::error::{PaymentError, Result};
use crate::intent::{IntentStatus, PaymentIntentView};

/// Event kinds this backend understands, plus everything else
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    IntentCreated,
    IntentProcessing,
    IntentRequiresAction,
    IntentAmountCapturableUpdated,
    IntentSucceeded,
    IntentPaymentFailed,
    IntentCanceled,
    /// Any type not listed above; acknowledged, never an error
    Other(String),
}

impl EventType {
    /// Every payment-intent kind
    pub const INTENT_EVENTS: [Self; 7] = [
        Self::IntentCreated,
        Self::IntentProcessing,
        Self::IntentRequiresAction,
        Self::IntentAmountCapturableUpdated,
        Self::IntentSucceeded,
        Self::IntentPaymentFailed,
        Self::IntentCanceled,
    ];

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "payment_intent.created" => Self::IntentCreated,
            "payment_intent.processing" => Self::IntentProcessing,
            "payment_intent.requires_action" => Self::IntentRequiresAction,
            "payment_intent.amount_capturable_updated" => Self::IntentAmountCapturableUpdated,
            "payment_intent.succeeded" => Self::IntentSucceeded,
            "payment_intent.payment_failed" => Self::IntentPaymentFailed,
            "payment_intent.canceled" => Self::IntentCanceled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::IntentCreated => "payment_intent.created",
            Self::IntentProcessing => "payment_intent.processing",
            Self::IntentRequiresAction => "payment_intent.requires_action",
            Self::IntentAmountCapturableUpdated => "payment_intent.amount_capturable_updated",
            Self::IntentSucceeded => "payment_intent.succeeded",
            Self::IntentPaymentFailed => "payment_intent.payment_failed",
            Self::IntentCanceled => "payment_intent.canceled",
            Self::Other(tag) => tag,
        }
    }

    pub const fn is_intent_event(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Status implied by the event itself, overriding the object's field.
    ///
    /// Stripe sends a failed intent back as `requires_payment_method`, so the
    /// event type is the only place the failure shows up.
    const fn implied_status(&self) -> Option<IntentStatus> {
        match self {
            Self::IntentProcessing => Some(IntentStatus::Processing),
            Self::IntentRequiresAction => Some(IntentStatus::RequiresAction),
            Self::IntentAmountCapturableUpdated => Some(IntentStatus::RequiresCapture),
            Self::IntentSucceeded => Some(IntentStatus::Succeeded),
            Self::IntentPaymentFailed => Some(IntentStatus::PaymentFailed),
            Self::IntentCanceled => Some(IntentStatus::Canceled),
            Self::IntentCreated | Self::Other(_) => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified webhook event
#[derive(Clone, Debug)]
pub struct WebhookEvent {
    /// Processor event id (`evt_...`), the de-duplication key
    pub id: String,

    pub event_type: EventType,

    /// Seconds since the Unix epoch
    pub created: i64,

    /// Typed intent snapshot for payment-intent events
    pub intent: Option<PaymentIntentView>,

    /// `data.object` exactly as delivered
    pub payload: serde_json::Value,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct RawIntent {
    id: String,
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    created: i64,
}

impl WebhookEvent {
    /// Parse an already-verified body
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let event: RawEvent =
            serde_json::from_slice(raw).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

        let event_type = EventType::from_tag(&event.event_type);
        let object = event.data.object;

        let intent = if event_type.is_intent_event() {
            Some(parse_intent(&event_type, &object)?)
        } else {
            None
        };

        Ok(Self {
            id: event.id,
            event_type,
            created: event.created,
            intent,
            payload: object,
        })
    }
}

fn parse_intent(event_type: &EventType, object: &serde_json::Value) -> Result<PaymentIntentView> {
    if object.get("object").and_then(|o| o.as_str()) != Some("payment_intent") {
        return Err(PaymentError::WebhookParse(format!(
            "{event_type} event without a payment_intent object"
        )));
    }

    let raw =
        RawIntent::deserialize(object).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;
    let status = match event_type.implied_status() {
        Some(status) => status,
        None => raw.status.parse().map_err(|_| {
            PaymentError::WebhookParse(format!("unknown intent status '{}'", raw.status))
        })?,
    };

    Ok(PaymentIntentView {
        id: raw.id,
        amount: raw.amount,
        currency: raw.currency,
        status,
        created: raw.created,
    })
}

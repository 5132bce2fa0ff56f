//! # checkout-payments
//!
//! Payment intent tracking and webhook verification for checkout-gateway.
//!
//! ## Stripe Elements (Embedded) flow
//!
//! The card form lives in the browser; card data goes straight to Stripe.
//! The backend only creates intents and listens for the outcome.
//!
//! ```text
//! ┌──────────┐  1. amount    ┌──────────────┐  2. create   ┌──────────┐
//! │ Browser  │──────────────▶│ IntentTracker│─────────────▶│  Stripe  │
//! │          │◀──────────────│              │◀─────────────│          │
//! │          │ client secret └──────────────┘              │          │
//! │          │                                              │          │
//! │          │──────────── 3. confirm (client secret) ─────▶│          │
//! └──────────┘                                              └────┬─────┘
//!                            ┌───────────────────┐   4. webhook  │
//!                            │ WebhookVerifier + │◀──────────────┘
//!                            │ WebhookDispatcher │
//!                            └───────────────────┘
//! ```
//!
//! Stripe is the source of truth for every intent. The local
//! [`MemoryIntentStore`] is a cache that never lets a late webhook undo a
//! terminal status.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use checkout_payments::{CheckoutConfig, IntentTracker, MemoryIntentStore, StripeProcessor};
//!
//! let config = CheckoutConfig::from_env()?;
//! let processor = Arc::new(StripeProcessor::new(&config.secret_key));
//! let tracker = IntentTracker::new(processor, Arc::new(MemoryIntentStore::new()), config);
//!
//! let created = tracker.create_intent(2000, Some("usd")).await?;
//! // Hand created.client_secret.expose() to the browser
//! ```

mod config;
mod confirmation;
mod error;
mod intent;
mod processor;
mod store;
mod tracker;
mod webhook;

pub use config::{CheckoutConfig, PublicConfig, is_currency_code};
pub use confirmation::{ConfirmationFlow, ConfirmationState, InvalidTransition, parse_major_amount};
pub use error::{PaymentError, Result, scrub_secrets};
pub use intent::{ClientSecret, CreateIntentParams, CreatedIntent, IntentStatus, PaymentIntentView};
pub use processor::{MockProcessor, PaymentProcessor, StripeProcessor};
pub use store::{IntentRecord, IntentStore, MemoryIntentStore, StatusUpdate};
pub use tracker::IntentTracker;
pub use webhook::{
    DispatchOutcome, EventType, IntentStatusHandler, RecentEvents, SIGNATURE_HEADER,
    WebhookDispatcher, WebhookEvent, WebhookHandler, WebhookVerifier, sign_payload,
};

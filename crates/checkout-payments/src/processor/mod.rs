//! Payment Processor Integration
//!
//! The processor is the source of truth for every intent. This module only
//! defines the calls the backend makes against it.

mod mock;
mod stripe_intents;

pub use self::mock::MockProcessor;
pub use self::stripe_intents::StripeProcessor;

use async_trait::async_trait;

use crate::error::Result;
use crate::intent::{CreateIntentParams, CreatedIntent, PaymentIntentView};

/// Payment processor client (Strategy pattern)
///
/// Implement this for each processor. Every method is a network boundary and
/// the only place request handling suspends.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create an intent and return it together with its client secret
    async fn create_intent(&self, params: &CreateIntentParams) -> Result<CreatedIntent>;

    /// Fetch an intent by id. Unknown or malformed ids are `NotFound`.
    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntentView>;

    /// Processor name
    fn name(&self) -> &str;
}

//! Application State

use std::sync::Arc;

use checkout_payments::{
    CheckoutConfig, IntentTracker, MemoryIntentStore, PaymentError, PaymentProcessor,
    WebhookDispatcher, WebhookVerifier,
};

/// Payment components built from one `CheckoutConfig`
pub struct Payments {
    /// Creates and reads payment intents
    pub tracker: IntentTracker,

    /// Authenticates inbound webhook bodies
    pub verifier: WebhookVerifier,

    /// Routes verified events to handlers
    pub dispatcher: WebhookDispatcher,

    /// Local status cache shared by tracker and dispatcher
    pub store: Arc<MemoryIntentStore>,
}

impl Payments {
    pub fn new(config: CheckoutConfig, processor: Arc<dyn PaymentProcessor>) -> Self {
        let store = Arc::new(MemoryIntentStore::new());
        let verifier =
            WebhookVerifier::new(config.webhook_secret.clone(), config.webhook_tolerance);
        let dispatcher =
            WebhookDispatcher::with_intent_store(store.clone(), config.dedupe_window);
        let tracker = IntentTracker::new(processor, store.clone(), config);

        Self {
            tracker,
            verifier,
            dispatcher,
            store,
        }
    }
}

/// Shared application state
#[derive(Clone, Default)]
pub struct AppState {
    /// Payment components (optional - None if Stripe is not configured)
    pub payments: Option<Arc<Payments>>,
}

impl AppState {
    pub fn new(payments: Payments) -> Self {
        Self {
            payments: Some(Arc::new(payments)),
        }
    }

    /// State with payments switched off; payment routes answer 503
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn payments(&self) -> Result<&Payments, PaymentError> {
        self.payments
            .as_deref()
            .ok_or_else(|| PaymentError::Config("Stripe is not configured".into()))
    }
}

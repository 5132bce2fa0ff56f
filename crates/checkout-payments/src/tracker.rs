//! Intent Tracker
//!
//! Validates checkout requests before anything reaches the processor, creates
//! intents with automatic payment-method selection, and reads them back.

use std::future::Future;
use std::sync::Arc;

use crate::config::{CheckoutConfig, PublicConfig, is_currency_code};
use crate::error::{PaymentError, Result};
use crate::intent::{CreateIntentParams, CreatedIntent, PaymentIntentView};
use crate::processor::PaymentProcessor;
use crate::store::{IntentStore, StatusUpdate};

/// Phase one of checkout: turns a request into a processor intent
pub struct IntentTracker {
    processor: Arc<dyn PaymentProcessor>,
    store: Arc<dyn IntentStore>,
    config: CheckoutConfig,
}

impl IntentTracker {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        store: Arc<dyn IntentStore>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            processor,
            store,
            config,
        }
    }

    pub const fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Publishable key for the browser. Never fails.
    pub fn public_config(&self) -> PublicConfig {
        self.config.public()
    }

    /// Check amount and currency without touching the processor
    pub fn validate(&self, amount: i64, currency: Option<&str>) -> Result<CreateIntentParams> {
        if amount <= 0 || amount < self.config.min_amount || amount > self.config.max_amount {
            return Err(PaymentError::InvalidArgument("Invalid amount".into()));
        }

        let currency = match currency.map(str::trim) {
            None | Some("") => self.config.default_currency.clone(),
            Some(code) => code.to_ascii_lowercase(),
        };
        if !is_currency_code(&currency) {
            return Err(PaymentError::InvalidArgument("Invalid currency".into()));
        }

        Ok(CreateIntentParams {
            amount,
            currency,
            automatic_payment_methods: true,
        })
    }

    /// Create a payment intent and return its client secret
    pub async fn create_intent(
        &self,
        amount: i64,
        currency: Option<&str>,
    ) -> Result<CreatedIntent> {
        let params = self.validate(amount, currency)?;

        let created = self
            .bounded(self.processor.create_intent(&params))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error creating payment intent"))?;

        self.observe(&created.intent);

        tracing::info!(
            intent_id = %created.intent.id,
            amount = created.intent.amount,
            currency = %created.intent.currency,
            "Payment intent created"
        );

        Ok(created)
    }

    /// Fetch an intent by id
    pub async fn get_intent(&self, id: &str) -> Result<PaymentIntentView> {
        let id = id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(PaymentError::NotFound(format!("No such payment_intent: '{id}'")));
        }

        let intent = self
            .bounded(self.processor.retrieve_intent(id))
            .await
            .inspect_err(|e| {
                tracing::warn!(intent_id = %id, error = %e, "Error retrieving payment intent");
            })?;

        self.observe(&intent);
        Ok(intent)
    }

    /// Run a processor call under the configured timeout
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.processor_timeout, call)
            .await
            .map_err(|_| {
                tracing::warn!(
                    processor = self.processor.name(),
                    timeout = ?self.config.processor_timeout,
                    "Payment processor call timed out"
                );
                PaymentError::upstream("Payment processor timed out")
            })?
    }

    /// Cache failures never fail the request; the processor already has the truth
    fn observe(&self, intent: &PaymentIntentView) {
        match self.store.record(&intent.id, intent.status) {
            Ok(StatusUpdate::IgnoredTerminal { current }) => tracing::debug!(
                intent_id = %intent.id,
                current = %current,
                observed = %intent.status,
                "Ignoring status after terminal state"
            ),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(intent_id = %intent.id, error = %e, "Failed to cache intent status");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentStatus;
    use crate::processor::MockProcessor;
    use crate::store::MemoryIntentStore;
    use std::time::Duration;

    fn tracker() -> (IntentTracker, Arc<MockProcessor>, Arc<MemoryIntentStore>) {
        let processor = Arc::new(MockProcessor::new());
        let store = Arc::new(MemoryIntentStore::new());
        let config = CheckoutConfig::new("sk_test_x", "pk_test_x", "whsec_x");
        let tracker = IntentTracker::new(processor.clone(), store.clone(), config);
        (tracker, processor, store)
    }

    #[tokio::test]
    async fn test_non_positive_amounts_never_reach_processor() {
        let (tracker, processor, _) = tracker();

        for amount in [0, -1, -2000, i64::MIN, 10, 49] {
            let result = tracker.create_intent(amount, Some("usd")).await;
            assert!(
                matches!(
                    &result,
                    Err(PaymentError::InvalidArgument(msg)) if msg == "Invalid amount"
                ),
                "amount {amount} should be rejected"
            );
        }
        assert!(tracker.create_intent(100_000_000, None).await.is_err());
        assert_eq!(processor.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_currency_default_and_validation() {
        let (tracker, processor, _) = tracker();

        let created = tracker.create_intent(2000, None).await.unwrap();
        assert_eq!(created.intent.currency, "usd");

        let created = tracker.create_intent(2000, Some("EUR")).await.unwrap();
        assert_eq!(created.intent.currency, "eur");

        let result = tracker.create_intent(2000, Some("dollars")).await;
        assert!(matches!(result, Err(PaymentError::InvalidArgument(_))));
        assert_eq!(processor.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_client_secret_confirms_same_intent() {
        let (tracker, processor, store) = tracker();

        let created = tracker.create_intent(2000, Some("usd")).await.unwrap();
        assert!(created.intent.id.starts_with("pi_"));
        assert_eq!(
            store.get(&created.intent.id).unwrap().unwrap().status,
            IntentStatus::RequiresPaymentMethod
        );

        let confirmed = processor.confirm(created.client_secret.expose()).await.unwrap();
        assert_eq!(confirmed.id, created.intent.id);

        let fetched = tracker.get_intent(&created.intent.id).await.unwrap();
        assert_eq!(fetched.status, IntentStatus::Succeeded);
        assert_eq!(fetched.amount, 2000);
        assert_eq!(
            store.get(&created.intent.id).unwrap().unwrap().status,
            IntentStatus::Succeeded
        );
    }

    #[tokio::test]
    async fn test_get_intent_not_found() {
        let (tracker, processor, _) = tracker();

        assert!(matches!(tracker.get_intent("").await, Err(PaymentError::NotFound(_))));
        assert_eq!(processor.retrieve_calls(), 0);

        assert!(matches!(
            tracker.get_intent("pi_doesnotexist").await,
            Err(PaymentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_processor_errors_are_scrubbed() {
        let (tracker, processor, _) = tracker();
        processor
            .fail_next("Invalid API Key provided: sk_test_abcdef123456")
            .await;

        let err = tracker.create_intent(2000, None).await.unwrap_err();
        assert!(matches!(err, PaymentError::Upstream(_)));
        assert!(!err.client_message().contains("sk_test_abcdef123456"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_processor_times_out() {
        let processor = Arc::new(MockProcessor::new());
        let mut config = CheckoutConfig::new("sk_test_x", "pk_test_x", "whsec_x");
        config.processor_timeout = Duration::from_secs(2);
        let store = Arc::new(MemoryIntentStore::new());
        let tracker = IntentTracker::new(processor.clone(), store, config);

        processor.set_latency(Duration::from_secs(60)).await;

        let err = tracker.create_intent(2000, None).await.unwrap_err();
        assert!(matches!(
            &err,
            PaymentError::Upstream(msg) if msg == "Payment processor timed out"
        ));
        assert_eq!(err.status_code(), 500);

        let err = tracker.get_intent("pi_123").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(processor.create_calls(), 1);
        assert_eq!(processor.retrieve_calls(), 1);
    }
}

//! Mock Processor
//!
//! For testing and local demos. Keeps intents in memory, hands out
//! Stripe-shaped ids and secrets, and lets a test play the browser's
//! confirmation step.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::PaymentProcessor;
use crate::config::is_currency_code;
use crate::error::{PaymentError, Result};
use crate::intent::{
    ClientSecret, CreateIntentParams, CreatedIntent, IntentStatus, PaymentIntentView,
};

struct MockIntent {
    view: PaymentIntentView,
    secret: ClientSecret,
}

/// In-memory processor with call counters
#[derive(Default)]
pub struct MockProcessor {
    intents: RwLock<HashMap<String, MockIntent>>,
    create_calls: AtomicUsize,
    retrieve_calls: AtomicUsize,
    next_failure: Mutex<Option<String>>,
    latency: Mutex<Option<Duration>>,
}

impl MockProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_intent` calls that reached the processor
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `retrieve_intent` calls that reached the processor
    pub fn retrieve_calls(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }

    /// Make the next processor call fail with this message
    pub async fn fail_next(&self, message: impl Into<String>) {
        *self.next_failure.lock().await = Some(message.into());
    }

    /// Delay every later processor call, as a slow or hung upstream would
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.lock().await = Some(latency);
    }

    /// Play the browser: redeem a client secret and settle the intent
    pub async fn confirm(&self, client_secret: &str) -> Result<PaymentIntentView> {
        let mut intents = self.intents.write().await;
        let intent = intents
            .values_mut()
            .find(|i| i.secret.expose() == client_secret)
            .ok_or_else(|| PaymentError::upstream("No such client secret"))?;

        if intent.view.status.is_terminal() {
            return Err(PaymentError::upstream(format!(
                "PaymentIntent is already {}",
                intent.view.status
            )));
        }

        intent.view.status = IntentStatus::Succeeded;
        Ok(intent.view.clone())
    }

    /// Move an intent to any status, as the processor would on its own
    pub async fn set_status(&self, id: &str, status: IntentStatus) -> Result<()> {
        let mut intents = self.intents.write().await;
        let intent = intents
            .get_mut(id)
            .ok_or_else(|| PaymentError::NotFound(format!("No such payment_intent: '{id}'")))?;
        intent.view.status = status;
        Ok(())
    }

    async fn respond(&self) -> Result<()> {
        let latency = *self.latency.lock().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.take_failure().await
    }

    async fn take_failure(&self) -> Result<()> {
        match self.next_failure.lock().await.take() {
            Some(message) => Err(PaymentError::upstream(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentProcessor for MockProcessor {
    async fn create_intent(&self, params: &CreateIntentParams) -> Result<CreatedIntent> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;

        if !is_currency_code(&params.currency) {
            return Err(PaymentError::upstream(format!(
                "Invalid currency: {}",
                params.currency
            )));
        }

        let id = format!("pi_{}", uuid::Uuid::new_v4().simple());
        let secret = ClientSecret::new(format!("{id}_secret_{}", uuid::Uuid::new_v4().simple()));
        let view = PaymentIntentView {
            id: id.clone(),
            amount: params.amount,
            currency: params.currency.clone(),
            status: IntentStatus::RequiresPaymentMethod,
            created: Utc::now().timestamp(),
        };

        self.intents.write().await.insert(
            id,
            MockIntent {
                view: view.clone(),
                secret: secret.clone(),
            },
        );

        Ok(CreatedIntent {
            intent: view,
            client_secret: secret,
        })
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntentView> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;

        self.intents
            .read()
            .await
            .get(id)
            .map(|i| i.view.clone())
            .ok_or_else(|| PaymentError::NotFound(format!("No such payment_intent: '{id}'")))
    }

    fn name(&self) -> &str {
        "MockProcessor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(amount: i64) -> CreateIntentParams {
        CreateIntentParams {
            amount,
            currency: "usd".into(),
            automatic_payment_methods: true,
        }
    }

    #[tokio::test]
    async fn test_mock_create_and_confirm() {
        let processor = MockProcessor::new();

        let created = processor.create_intent(&params(2000)).await.unwrap();
        assert!(created.intent.id.starts_with("pi_"));
        assert_eq!(created.client_secret.intent_id(), Some(created.intent.id.as_str()));

        let confirmed = processor.confirm(created.client_secret.expose()).await.unwrap();
        assert_eq!(confirmed.id, created.intent.id);
        assert_eq!(confirmed.status, IntentStatus::Succeeded);

        // Secrets are single-use
        assert!(processor.confirm(created.client_secret.expose()).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_unknown_intent() {
        let processor = MockProcessor::new();
        let result = processor.retrieve_intent("pi_missing").await;
        assert!(matches!(result, Err(PaymentError::NotFound(_))));
        assert_eq!(processor.retrieve_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_injected_failure() {
        let processor = MockProcessor::new();
        processor.fail_next("rate limited").await;
        assert!(matches!(
            processor.create_intent(&params(500)).await,
            Err(PaymentError::Upstream(_))
        ));
        assert!(processor.create_intent(&params(500)).await.is_ok());
        assert_eq!(processor.create_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_latency() {
        let processor = MockProcessor::new();
        processor.set_latency(Duration::from_secs(5)).await;

        let started = tokio::time::Instant::now();
        processor.create_intent(&params(500)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}

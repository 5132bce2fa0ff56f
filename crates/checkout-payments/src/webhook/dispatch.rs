//! Webhook Dispatch
//!
//! Routes verified events to handlers by type. Stripe delivers at least once,
//! so each event id is claimed before its handler runs. Only ids whose
//! handling completed are acknowledged as duplicates; a redelivery that
//! races a still-running attempt is refused so the processor retries later.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{EventType, RecentEvents, WebhookEvent};
use crate::error::{PaymentError, Result};
use crate::intent::IntentStatus;
use crate::store::{IntentStore, StatusUpdate};

/// Handler for one or more event types. Must be safe to run twice.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(&self, event: &WebhookEvent) -> Result<()>;
}

/// What happened to a delivered event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A registered handler ran successfully
    Handled,
    /// Event id already processed within the window
    Duplicate,
    /// No handler for this type; acknowledged
    Unhandled,
}

/// Event ids currently being handled and ids already handled
#[derive(Debug)]
struct Deliveries {
    in_flight: HashSet<String>,
    completed: RecentEvents,
}

enum Claim<'a> {
    Acquired(DeliveryGuard<'a>),
    Running,
    Completed,
}

/// Marks an event id in flight until dropped; `complete` also records it as handled
struct DeliveryGuard<'a> {
    deliveries: &'a Mutex<Deliveries>,
    event_id: String,
}

impl DeliveryGuard<'_> {
    fn complete(self) -> Result<()> {
        lock(self.deliveries)?.completed.insert(&self.event_id);
        Ok(())
    }
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.in_flight.remove(&self.event_id);
        }
    }
}

fn lock(deliveries: &Mutex<Deliveries>) -> Result<MutexGuard<'_, Deliveries>> {
    deliveries
        .lock()
        .map_err(|_| PaymentError::Storage("webhook delivery log lock poisoned".into()))
}

/// Routes events by type, skipping recently handled ids
pub struct WebhookDispatcher {
    handlers: HashMap<EventType, Arc<dyn WebhookHandler>>,
    deliveries: Mutex<Deliveries>,
}

impl WebhookDispatcher {
    /// Empty dispatcher remembering up to `window` handled event ids
    pub fn new(window: usize) -> Self {
        Self {
            handlers: HashMap::new(),
            deliveries: Mutex::new(Deliveries {
                in_flight: HashSet::new(),
                completed: RecentEvents::new(window),
            }),
        }
    }

    /// Dispatcher with the intent status handler on every payment-intent event
    pub fn with_intent_store(store: Arc<dyn IntentStore>, window: usize) -> Self {
        let mut dispatcher = Self::new(window);
        let handler: Arc<dyn WebhookHandler> = Arc::new(IntentStatusHandler::new(store));
        for event_type in EventType::INTENT_EVENTS {
            dispatcher.register(event_type, handler.clone());
        }
        dispatcher
    }

    /// Register (or replace) the handler for an event type
    pub fn register(&mut self, event_type: EventType, handler: Arc<dyn WebhookHandler>) {
        self.handlers.insert(event_type, handler);
    }

    pub async fn dispatch(&self, event: &WebhookEvent) -> Result<DispatchOutcome> {
        tracing::info!(event_id = %event.id, event_type = %event.event_type, "Webhook received");

        let claim = match self.claim(&event.id)? {
            Claim::Acquired(claim) => claim,
            Claim::Completed => {
                tracing::info!(event_id = %event.id, "Duplicate webhook event, skipping");
                return Ok(DispatchOutcome::Duplicate);
            }
            Claim::Running => {
                tracing::warn!(event_id = %event.id, "Webhook event already in flight, refusing");
                return Err(PaymentError::Handler(
                    "Webhook event is already being processed".into(),
                ));
            }
        };

        let Some(handler) = self.handlers.get(&event.event_type) else {
            tracing::info!(event_type = %event.event_type, "Unhandled event type");
            claim.complete()?;
            return Ok(DispatchOutcome::Unhandled);
        };

        if let Err(e) = handler.handle(event).await {
            tracing::error!(event_id = %event.id, error = %e, "Webhook handler failed");
            return Err(e);
        }

        claim.complete()?;
        Ok(DispatchOutcome::Handled)
    }

    fn claim(&self, event_id: &str) -> Result<Claim<'_>> {
        let mut deliveries = lock(&self.deliveries)?;
        if deliveries.completed.contains(event_id) {
            return Ok(Claim::Completed);
        }
        if !deliveries.in_flight.insert(event_id.to_string()) {
            return Ok(Claim::Running);
        }
        Ok(Claim::Acquired(DeliveryGuard {
            deliveries: &self.deliveries,
            event_id: event_id.to_string(),
        }))
    }
}

/// Records observed intent statuses without regressing terminal ones
pub struct IntentStatusHandler {
    store: Arc<dyn IntentStore>,
}

impl IntentStatusHandler {
    pub fn new(store: Arc<dyn IntentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WebhookHandler for IntentStatusHandler {
    async fn handle(&self, event: &WebhookEvent) -> Result<()> {
        let Some(intent) = &event.intent else {
            return Ok(());
        };

        let update = self.store.record(&intent.id, intent.status)?;
        if let StatusUpdate::IgnoredTerminal { current } = update {
            tracing::info!(
                intent_id = %intent.id,
                current = %current,
                observed = %intent.status,
                "Late event after terminal status ignored"
            );
            return Ok(());
        }

        match intent.status {
            IntentStatus::Succeeded => {
                tracing::info!(intent_id = %intent.id, amount = intent.amount, "Payment succeeded");
            }
            IntentStatus::PaymentFailed => {
                tracing::warn!(intent_id = %intent.id, "Payment failed");
            }
            IntentStatus::Canceled => {
                tracing::info!(intent_id = %intent.id, "Payment canceled");
            }
            status => {
                tracing::debug!(intent_id = %intent.id, status = %status, "Payment intent updated");
            }
        }

        Ok(())
    }
}

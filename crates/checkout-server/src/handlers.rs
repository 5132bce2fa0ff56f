//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};

use checkout_payments::{
    DispatchOutcome, PaymentError, PaymentIntentView, PublicConfig, SIGNATURE_HEADER,
};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Minor currency units (e.g. 1000 = $10.00)
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

/// Fallback header name for non-Stripe senders
const GENERIC_SIGNATURE_HEADER: &str = "signature";

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.payments.is_some(),
    })
}

/// Publishable key for the browser
pub async fn get_config(State(state): State<AppState>) -> Result<Json<PublicConfig>, PaymentError> {
    Ok(Json(state.payments()?.tracker.public_config()))
}

/// Create a payment intent
pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentIntentRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentIntentResponse>, PaymentError> {
    let payments = state.payments()?;
    let Json(request) = payload.map_err(|e| PaymentError::InvalidArgument(e.body_text()))?;

    let created = payments
        .tracker
        .create_intent(request.amount, request.currency.as_deref())
        .await?;

    Ok(Json(CreatePaymentIntentResponse {
        client_secret: created.client_secret.expose().to_owned(),
        payment_intent_id: created.intent.id,
    }))
}

/// Stripe webhook endpoint. The body is taken as raw bytes for verification.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, PaymentError> {
    let payments = state.payments()?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .or_else(|| headers.get(GENERIC_SIGNATURE_HEADER))
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PaymentError::SignatureInvalid("Missing signature header".into()))?;

    let event = payments
        .verifier
        .verify_and_parse(&body, signature)
        .inspect_err(|e| tracing::warn!(error = %e, "Webhook signature verification failed"))?;

    let outcome = payments.dispatcher.dispatch(&event).await?;
    if outcome == DispatchOutcome::Duplicate {
        tracing::debug!(event_id = %event.id, "Acknowledged duplicate delivery");
    }

    Ok(Json(WebhookResponse { received: true }))
}

/// Payment intent details by id
pub async fn get_payment_intent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentIntentView>, PaymentError> {
    let intent = state.payments()?.tracker.get_intent(&id).await?;
    Ok(Json(intent))
}

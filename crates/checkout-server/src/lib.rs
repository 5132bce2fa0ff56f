//! checkout-gateway HTTP surface
//!
//! Axum router exposing the payment-intent API and the Stripe webhook.

pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    create_payment_intent, get_config, get_payment_intent, health_check, stripe_webhook,
};
pub use crate::state::{AppState, Payments};

/// Build the application router
pub fn router(state: AppState) -> Router {
    // Any origin; scope this before going to production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let payments = Router::new()
        .route("/config", get(get_config))
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/webhook", post(stripe_webhook))
        .route("/payment-intent/{id}", get(get_payment_intent));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/payment", payments)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

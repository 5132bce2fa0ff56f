//! checkout-gateway HTTP Server
//!
//! Axum-based server for the Stripe payment-intent checkout flow.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_payments::{CheckoutConfig, StripeProcessor};
use checkout_server::{AppState, Payments, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize payments
    let state = match CheckoutConfig::from_env() {
        Ok(config) => {
            tracing::info!(
                default_currency = %config.default_currency,
                min_amount = config.min_amount,
                "✓ Stripe configured"
            );
            let processor = Arc::new(StripeProcessor::new(&config.secret_key));
            AppState::new(Payments::new(config, processor))
        }
        Err(e) => {
            tracing::warn!("⚠ Stripe not configured - payments disabled ({e})");
            tracing::warn!(
                "  Set STRIPE_SECRET_KEY, STRIPE_PUBLISHABLE_KEY and STRIPE_WEBHOOK_SECRET in .env"
            );
            AppState::disabled()
        }
    };

    let app = router(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 checkout-server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                              - Health check");
    tracing::info!("  GET  /api/payment/config                  - Publishable key");
    tracing::info!("  POST /api/payment/create-payment-intent   - Create payment intent");
    tracing::info!("  POST /api/payment/webhook                 - Stripe webhook");
    tracing::info!("  GET  /api/payment/payment-intent/{{id}}     - Payment intent details");

    axum::serve(listener, app).await?;

    Ok(())
}

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use checkout_payments::{
    CheckoutConfig, IntentStatus, IntentStore, MockProcessor, sign_payload,
};
use checkout_server::{AppState, Payments, router};

const WEBHOOK_SECRET: &str = "whsec_test_secret";

struct TestApp {
    app: Router,
    processor: Arc<MockProcessor>,
    state: AppState,
}

fn test_app() -> TestApp {
    let processor = Arc::new(MockProcessor::new());
    let config = CheckoutConfig::new("sk_test_123", "pk_test_123", WEBHOOK_SECRET);
    let state = AppState::new(Payments::new(config, processor.clone()));
    TestApp {
        app: router(state.clone()),
        processor,
        state,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn webhook(body: &[u8], signature: &str) -> Request<Body> {
    Request::post("/api/payment/webhook")
        .header("content-type", "application/json")
        .header("Stripe-Signature", signature)
        .body(Body::from(body.to_vec()))
        .unwrap()
}

fn event_body(event_id: &str, event_type: &str, intent_id: &str, status: &str) -> Vec<u8> {
    json!({
        "id": event_id,
        "object": "event",
        "type": event_type,
        "created": unix_now(),
        "data": {
            "object": {
                "id": intent_id,
                "object": "payment_intent",
                "amount": 2000,
                "currency": "usd",
                "status": status,
                "created": unix_now()
            }
        }
    })
    .to_string()
    .into_bytes()
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
        .try_into()
        .unwrap()
}

fn store_status(state: &AppState, intent_id: &str) -> Option<IntentStatus> {
    let payments = state.payments().unwrap();
    payments.store.get(intent_id).unwrap().map(|r| r.status)
}

#[tokio::test]
async fn test_config_returns_only_publishable_key() {
    let t = test_app();
    let (status, body) = send(&t.app, get("/api/payment/config")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "publishableKey": "pk_test_123" }));
}

#[tokio::test]
async fn test_create_and_fetch_intent() {
    let t = test_app();

    let (status, body) = send(
        &t.app,
        post_json(
            "/api/payment/create-payment-intent",
            &json!({ "amount": 2000, "currency": "usd" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let intent_id = body["paymentIntentId"].as_str().unwrap().to_string();
    let client_secret = body["clientSecret"].as_str().unwrap().to_string();
    assert!(intent_id.starts_with("pi_"));
    assert!(client_secret.starts_with(&format!("{intent_id}_secret_")));

    // Phase two happens between the browser and the processor
    let confirmed = t.processor.confirm(&client_secret).await.unwrap();
    assert_eq!(confirmed.id, intent_id);

    let (status, body) = send(
        &t.app,
        get(&format!("/api/payment/payment-intent/{intent_id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], intent_id.as_str());
    assert_eq!(body["amount"], 2000);
    assert_eq!(body["currency"], "usd");
    assert_eq!(body["status"], "succeeded");
    assert!(body["created"].is_i64());
}

#[tokio::test]
async fn test_invalid_amounts_are_rejected() {
    let t = test_app();

    for amount in [10, 0, -500] {
        let (status, body) = send(
            &t.app,
            post_json(
                "/api/payment/create-payment-intent",
                &json!({ "amount": amount, "currency": "usd" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid amount");
    }

    let (status, body) = send(
        &t.app,
        post_json("/api/payment/create-payment-intent", &json!({ "amount": "lots" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    assert_eq!(t.processor.create_calls(), 0);
}

#[tokio::test]
async fn test_processor_failure_is_500() {
    let t = test_app();
    t.processor.fail_next("Rate limit exceeded for sk_live_abcdef").await;

    let (status, body) = send(
        &t.app,
        post_json("/api/payment/create-payment-intent", &json!({ "amount": 2000 })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("Rate limit exceeded"));
    assert!(!error.contains("sk_live_abcdef"));
}

#[tokio::test(start_paused = true)]
async fn test_processor_timeout_is_500() {
    let t = test_app();
    t.processor.set_latency(Duration::from_secs(120)).await;

    let (status, body) = send(
        &t.app,
        post_json("/api/payment/create-payment-intent", &json!({ "amount": 2000 })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Payment processor timed out");
    assert_eq!(body["code"], "PROCESSOR_ERROR");
    assert_eq!(t.processor.create_calls(), 1);
}

#[tokio::test]
async fn test_unknown_intent_is_404() {
    let t = test_app();
    let (status, body) = send(&t.app, get("/api/payment/payment-intent/pi_missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_signed_webhook_updates_status() {
    let t = test_app();
    let raw = event_body("evt_1", "payment_intent.succeeded", "pi_abc", "succeeded");
    let signature = sign_payload(&raw, WEBHOOK_SECRET, unix_now()).unwrap();

    let (status, body) = send(&t.app, webhook(&raw, &signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));
    assert_eq!(store_status(&t.state, "pi_abc"), Some(IntentStatus::Succeeded));

    // Redelivery is acknowledged again
    let (status, _) = send(&t.app, webhook(&raw, &signature)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_tampered_webhook_is_rejected() {
    let t = test_app();
    let raw = event_body("evt_1", "payment_intent.succeeded", "pi_abc", "succeeded");
    let signature = sign_payload(&raw, WEBHOOK_SECRET, unix_now()).unwrap();

    let tampered = String::from_utf8(raw).unwrap().replace("2000", "9000");
    let (status, body) = send(&t.app, webhook(tampered.as_bytes(), &signature)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Webhook Error"));
    assert_eq!(store_status(&t.state, "pi_abc"), None);
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let t = test_app();
    let raw = event_body("evt_1", "payment_intent.succeeded", "pi_abc", "succeeded");
    let request = Request::post("/api/payment/webhook")
        .body(Body::from(raw))
        .unwrap();

    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_late_webhook_does_not_regress_terminal_status() {
    let t = test_app();

    let succeeded = event_body("evt_2", "payment_intent.succeeded", "pi_abc", "succeeded");
    let processing = event_body("evt_1", "payment_intent.processing", "pi_abc", "processing");

    for raw in [succeeded, processing] {
        let signature = sign_payload(&raw, WEBHOOK_SECRET, unix_now()).unwrap();
        let (status, _) = send(&t.app, webhook(&raw, &signature)).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(store_status(&t.state, "pi_abc"), Some(IntentStatus::Succeeded));
}

#[tokio::test]
async fn test_unconfigured_payments_answer_503() {
    let app = router(AppState::disabled());

    let (status, body) = send(&app, get("/api/payment/config")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "PAYMENTS_DISABLED");

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stripe_configured"], false);
}

//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Caller supplied a bad amount, currency or id format
    #[error("{0}")]
    InvalidArgument(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    SignatureInvalid(String),

    /// Webhook payload parsing failed (after a valid signature)
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Payment intent unknown to the processor
    #[error("Payment intent not found: {0}")]
    NotFound(String),

    /// Processor rejected or failed the call. Message is already scrubbed.
    #[error("Payment processor error: {0}")]
    Upstream(String),

    /// A webhook handler failed transiently
    #[error("Webhook handler error: {0}")]
    Handler(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PaymentError {
    /// Build an upstream error, removing anything that looks like key material
    pub fn upstream(message: impl AsRef<str>) -> Self {
        Self::Upstream(scrub_secrets(message.as_ref()))
    }

    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Upstream(_) | Self::Handler(_) | Self::Storage(_)
        )
    }

    /// HTTP status this error maps to
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) | Self::SignatureInvalid(_) | Self::WebhookParse(_) => 400,
            Self::NotFound(_) => 404,
            Self::Config(_) => 503,
            Self::Upstream(_) | Self::Handler(_) | Self::Storage(_) => 500,
        }
    }

    /// Stable machine-readable code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::SignatureInvalid(_) => "INVALID_SIGNATURE",
            Self::WebhookParse(_) => "INVALID_PAYLOAD",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Upstream(_) => "PROCESSOR_ERROR",
            Self::Handler(_) => "WEBHOOK_ERROR",
            Self::Config(_) => "PAYMENTS_DISABLED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Message safe to show the end user verbatim
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidArgument(msg) | Self::NotFound(msg) | Self::Upstream(msg) => msg.clone(),
            Self::SignatureInvalid(msg) | Self::WebhookParse(msg) => {
                format!("Webhook Error: {msg}")
            }
            Self::Handler(_) => "Webhook processing failed".into(),
            Self::Config(_) => "Payments not configured".into(),
            Self::Storage(_) => "An error occurred processing your request.".into(),
        }
    }
}

const SECRET_PREFIXES: [&str; 3] = ["sk_", "rk_", "whsec_"];

/// Replace API keys, webhook secrets and client secrets with a placeholder.
pub fn scrub_secrets(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut token = String::new();

    for ch in message.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            token.push(ch);
        } else {
            push_token(&mut out, &token);
            token.clear();
            out.push(ch);
        }
    }
    push_token(&mut out, &token);
    out
}

fn push_token(out: &mut String, token: &str) {
    let secret = SECRET_PREFIXES.iter().any(|p| token.starts_with(p)) || token.contains("_secret_");
    if secret {
        out.push_str("[REDACTED]");
    } else {
        out.push_str(token);
    }
}

#[cfg(feature = "axum-handlers")]
mod response {
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use serde::Serialize;

    use super::PaymentError;

    #[derive(Serialize)]
    struct ErrorBody {
        error: String,
        code: &'static str,
    }

    impl IntoResponse for PaymentError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = ErrorBody {
                error: self.client_message(),
                code: self.code(),
            };
            (status, Json(body)).into_response()
        }
    }
}

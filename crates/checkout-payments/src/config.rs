//! Checkout Configuration
//!
//! Keys and limits are read once at startup and handed to each component by
//! reference. Secrets are redacted from `Debug` output.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::{PaymentError, Result};

/// Stripe's floor for USD card payments, in cents
pub const DEFAULT_MIN_AMOUNT: i64 = 50;

/// Stripe accepts at most eight digits of minor units
pub const DEFAULT_MAX_AMOUNT: i64 = 99_999_999;

pub const DEFAULT_CURRENCY: &str = "usd";

/// Stripe's default signature tolerance
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

pub const DEFAULT_PROCESSOR_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DEDUPE_WINDOW: usize = 10_000;

/// Everything the checkout components need to talk to the processor
#[derive(Clone)]
pub struct CheckoutConfig {
    /// Server-side API key (`sk_...`)
    pub secret_key: String,

    /// Browser-safe key (`pk_...`)
    pub publishable_key: String,

    /// Webhook signing secret (`whsec_...`)
    pub webhook_secret: String,

    /// Currency used when a request names none
    pub default_currency: String,

    /// Smallest accepted amount in minor units
    pub min_amount: i64,

    /// Largest accepted amount in minor units
    pub max_amount: i64,

    /// Maximum age (either direction) of a webhook signature timestamp
    pub webhook_tolerance: Duration,

    /// Upper bound on a single processor call
    pub processor_timeout: Duration,

    /// How many recent webhook event ids are remembered for de-duplication
    pub dedupe_window: usize,
}

impl CheckoutConfig {
    /// Create a config with default limits
    pub fn new(
        secret_key: impl Into<String>,
        publishable_key: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            secret_key: secret_key.into(),
            publishable_key: publishable_key.into(),
            webhook_secret: webhook_secret.into(),
            default_currency: DEFAULT_CURRENCY.into(),
            min_amount: DEFAULT_MIN_AMOUNT,
            max_amount: DEFAULT_MAX_AMOUNT,
            webhook_tolerance: Duration::from_secs(DEFAULT_WEBHOOK_TOLERANCE_SECS),
            processor_timeout: Duration::from_secs(DEFAULT_PROCESSOR_TIMEOUT_SECS),
            dedupe_window: DEFAULT_DEDUPE_WINDOW,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary key lookup (environment, file, test map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PaymentError::Config(format!("{key} not set")))
        };

        let mut config = Self::new(
            required("STRIPE_SECRET_KEY")?,
            required("STRIPE_PUBLISHABLE_KEY")?,
            required("STRIPE_WEBHOOK_SECRET")?,
        );

        if let Some(currency) = lookup("CHECKOUT_DEFAULT_CURRENCY") {
            config.default_currency = currency.trim().to_lowercase();
        }
        if let Some(min) = parse_opt(&lookup, "CHECKOUT_MIN_AMOUNT")? {
            config.min_amount = min;
        }
        if let Some(max) = parse_opt(&lookup, "CHECKOUT_MAX_AMOUNT")? {
            config.max_amount = max;
        }
        if let Some(secs) = parse_opt(&lookup, "WEBHOOK_TOLERANCE_SECS")? {
            config.webhook_tolerance = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_opt(&lookup, "PROCESSOR_TIMEOUT_SECS")? {
            config.processor_timeout = Duration::from_secs(secs);
        }
        if let Some(window) = parse_opt(&lookup, "WEBHOOK_DEDUPE_WINDOW")? {
            config.dedupe_window = window;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject limits that could never accept a payment
    pub fn validate(&self) -> Result<()> {
        if self.min_amount <= 0 {
            return Err(PaymentError::Config("minimum amount must be positive".into()));
        }
        if self.max_amount < self.min_amount {
            return Err(PaymentError::Config(
                "maximum amount is below the minimum".into(),
            ));
        }
        if self.webhook_tolerance.is_zero() {
            return Err(PaymentError::Config("webhook tolerance must be positive".into()));
        }
        if self.processor_timeout.is_zero() {
            return Err(PaymentError::Config("processor timeout must be positive".into()));
        }
        if self.dedupe_window == 0 {
            return Err(PaymentError::Config("webhook dedupe window must be positive".into()));
        }
        if !is_currency_code(&self.default_currency) {
            return Err(PaymentError::Config(format!(
                "invalid default currency '{}'",
                self.default_currency
            )));
        }
        Ok(())
    }

    /// The only piece of configuration the browser may see
    pub fn public(&self) -> PublicConfig {
        PublicConfig {
            publishable_key: self.publishable_key.clone(),
        }
    }
}

impl fmt::Debug for CheckoutConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutConfig")
            .field("secret_key", &"[REDACTED]")
            .field("publishable_key", &self.publishable_key)
            .field("webhook_secret", &"[REDACTED]")
            .field("default_currency", &self.default_currency)
            .field("min_amount", &self.min_amount)
            .field("max_amount", &self.max_amount)
            .field("webhook_tolerance", &self.webhook_tolerance)
            .field("processor_timeout", &self.processor_timeout)
            .field("dedupe_window", &self.dedupe_window)
            .finish()
    }
}

/// Configuration returned to the browser
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub publishable_key: String,
}

/// Lowercase three-letter ISO 4217 shape
pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_lowercase())
}

fn parse_opt<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| PaymentError::Config(format!("{key} is not a valid number: {raw}")))
        })
        .transpose()
}

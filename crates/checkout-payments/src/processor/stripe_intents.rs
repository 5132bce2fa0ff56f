//! Stripe Payment Intents
//!
//! Implements the "Stripe Elements (Embedded)" approach: the backend creates
//! the intent, the browser confirms it with the client secret.

use async_trait::async_trait;
use stripe::{
    Client, CreatePaymentIntent, CreatePaymentIntentAutomaticPaymentMethods, Currency,
    PaymentIntent, PaymentIntentId, StripeError,
};

use super::PaymentProcessor;
use crate::error::{PaymentError, Result};
use crate::intent::{ClientSecret, CreateIntentParams, CreatedIntent, PaymentIntentView};

/// Stripe client wrapper
pub struct StripeProcessor {
    client: Client,
}

impl StripeProcessor {
    /// Create a new Stripe processor
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    /// Get the underlying Stripe client
    pub const fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn create_intent(&self, params: &CreateIntentParams) -> Result<CreatedIntent> {
        let currency = parse_currency(&params.currency)?;

        let mut create = CreatePaymentIntent::new(params.amount, currency);
        create.automatic_payment_methods = Some(CreatePaymentIntentAutomaticPaymentMethods {
            enabled: params.automatic_payment_methods,
            ..Default::default()
        });

        let intent = PaymentIntent::create(&self.client, create)
            .await
            .map_err(|e| map_stripe_error(&e, None))?;

        let client_secret = intent
            .client_secret
            .clone()
            .map(ClientSecret::new)
            .ok_or_else(|| PaymentError::upstream("No client secret returned"))?;

        Ok(CreatedIntent {
            intent: to_view(&intent)?,
            client_secret,
        })
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntentView> {
        let intent_id: PaymentIntentId = id
            .parse()
            .map_err(|_| PaymentError::NotFound(format!("No such payment_intent: '{id}'")))?;

        let intent = PaymentIntent::retrieve(&self.client, &intent_id, &[])
            .await
            .map_err(|e| map_stripe_error(&e, Some(id)))?;

        to_view(&intent)
    }

    fn name(&self) -> &str {
        "stripe"
    }
}

/// Currencies deserialize from their lowercase ISO code
fn parse_currency(code: &str) -> Result<Currency> {
    serde_json::from_value(serde_json::Value::String(code.to_owned()))
        .map_err(|_| PaymentError::InvalidArgument("Invalid currency".into()))
}

fn to_view(intent: &PaymentIntent) -> Result<PaymentIntentView> {
    Ok(PaymentIntentView {
        id: intent.id.to_string(),
        amount: intent.amount,
        currency: intent.currency.to_string(),
        status: intent.status.as_str().parse()?,
        created: intent.created,
    })
}

fn map_stripe_error(err: &StripeError, id: Option<&str>) -> PaymentError {
    match (err, id) {
        (StripeError::Stripe(request), Some(id)) if request.http_status == 404 => {
            PaymentError::NotFound(format!("No such payment_intent: '{id}'"))
        }
        (StripeError::Stripe(request), _) => {
            tracing::error!(
                http_status = request.http_status,
                error_type = ?request.error_type,
                "Stripe rejected request"
            );
            PaymentError::upstream(
                request
                    .message
                    .clone()
                    .unwrap_or_else(|| err.to_string()),
            )
        }
        _ => {
            let mapped = PaymentError::upstream(err.to_string());
            tracing::error!(error = %mapped, "Stripe call failed");
            mapped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("usd").unwrap(), Currency::USD);
        assert_eq!(parse_currency("eur").unwrap(), Currency::EUR);
    }
}

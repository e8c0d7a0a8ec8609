//! Stripe payment-intent client.
//!
//! Holds are created with `capture_method=manual` so funds are reserved at
//! booking but only settled when the capture sweep runs. All requests carry
//! explicit connect and request timeouts; the processor's own state checks
//! (a captured intent cannot be captured again) are the safety net against
//! overlapping sweep runs, so "unexpected state" rejections are reported as
//! `GatewayError::Rejected`, never a panic.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::{to_minor_units, GatewayError, PaymentGateway, PaymentIntent, CURRENCY};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

pub struct StripeClient {
    base_url: String,
    secret_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl StripeClient {
    pub fn new(base_url: &str, secret_key: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            client,
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }

    fn post_form(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{}{path}", self.base_url);
        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(form);
        self.execute(request)
    }

    fn execute(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<PaymentIntent, GatewayError> {
        let response = request.send().map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(parse_rejection(status.as_u16(), &body));
        }

        response
            .json::<PaymentIntent>()
            .map_err(|e| GatewayError::ResponseParsing(e.to_string()))
    }

    fn map_transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_connect() {
            GatewayError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            GatewayError::Timeout(self.timeout_secs)
        } else {
            GatewayError::Http(e.to_string())
        }
    }
}

impl PaymentGateway for StripeClient {
    fn create_hold(
        &self,
        amount: Decimal,
        customer_ref: &str,
        metadata: &[(&str, &str)],
    ) -> Result<PaymentIntent, GatewayError> {
        let minor = to_minor_units(amount)?;

        let mut form = vec![
            ("amount".to_string(), minor.to_string()),
            ("currency".to_string(), CURRENCY.to_string()),
            ("customer".to_string(), customer_ref.to_string()),
            ("capture_method".to_string(), "manual".to_string()),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{key}]"), value.to_string()));
        }

        self.post_form("/v1/payment_intents", &form)
    }

    fn capture(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        self.post_form(&format!("/v1/payment_intents/{intent_id}/capture"), &[])
    }

    fn cancel(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        self.post_form(&format!("/v1/payment_intents/{intent_id}/cancel"), &[])
    }

    fn check_status(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{}/v1/payment_intents/{intent_id}", self.base_url);
        let request = self.client.get(&url).bearer_auth(&self.secret_key);
        self.execute(request)
    }
}

#[derive(Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

fn parse_rejection(status: u16, body: &str) -> GatewayError {
    match serde_json::from_str::<StripeErrorEnvelope>(body) {
        Ok(envelope) => GatewayError::Rejected {
            code: envelope
                .error
                .code
                .or(envelope.error.error_type)
                .unwrap_or_else(|| format!("http_{status}")),
            message: envelope
                .error
                .message
                .unwrap_or_else(|| "no error message provided".to_string()),
        },
        Err(_) => GatewayError::Rejected {
            code: format!("http_{status}"),
            message: body.chars().take(200).collect(),
        },
    }
}

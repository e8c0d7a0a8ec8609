//! Payment processor gateway — pre-authorization primitives.
//!
//! A hold reserves funds on the patient's card at booking time without
//! settling them; `capture` settles it shortly before the consultation and
//! `cancel` releases it without charging. The trait is the seam between the
//! sweeps and the processor: `StripeClient` talks to the real API,
//! `MockGateway` records calls for tests.

pub mod stripe;

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use thiserror::Error;

pub use stripe::StripeClient;

/// Settlement currency for all consultation charges.
pub const CURRENCY: &str = "brl";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("charge amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("could not reach payment processor at {0}")]
    Connection(String),

    #[error("payment processor request timed out after {0}s")]
    Timeout(u64),

    #[error("payment processor rejected the request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("unexpected processor response: {0}")]
    ResponseParsing(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Processor-side lifecycle state of a payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Succeeded,
    Canceled,
}

/// The slice of the processor's intent object the sweeps care about.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: IntentStatus,
    /// Amount in minor currency units (centavos).
    pub amount: i64,
    pub currency: String,
}

pub trait PaymentGateway: Send + Sync {
    /// Reserve `amount` (major currency units) on the customer's payment
    /// method without settling. Capture is manual: funds move only when
    /// `capture` is called near the consultation time.
    fn create_hold(
        &self,
        amount: Decimal,
        customer_ref: &str,
        metadata: &[(&str, &str)],
    ) -> Result<PaymentIntent, GatewayError>;

    /// Settle a previously authorized hold. The intent must still be in the
    /// processor-side "authorized, not captured" state.
    fn capture(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;

    /// Release a hold without charging. Same state preconditions as capture.
    fn cancel(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;

    /// Read-only lookup, for diagnostics.
    fn check_status(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
}

/// Convert a major-unit amount to processor minor units (×100, half-up).
pub fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    if amount <= Decimal::ZERO {
        return Err(GatewayError::InvalidAmount(amount));
    }
    (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(GatewayError::InvalidAmount(amount))
}

/// Mock gateway for testing — records every call and fails on demand.
#[derive(Default)]
pub struct MockGateway {
    inner: Mutex<MockInner>,
}

#[derive(Default)]
struct MockInner {
    calls: Vec<(&'static str, String)>,
    failing: HashSet<String>,
    amounts: HashMap<String, i64>,
    next_id: u32,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make capture/cancel fail for this intent with a processor rejection.
    pub fn fail_intent(&self, intent_id: &str) {
        self.lock().failing.insert(intent_id.to_string());
    }

    /// Every recorded call, in order, as (operation, reference).
    pub fn calls(&self) -> Vec<(&'static str, String)> {
        self.lock().calls.clone()
    }

    /// References passed to a given operation, in order.
    pub fn calls_for(&self, operation: &str) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|(op, _)| *op == operation)
            .map(|(_, reference)| reference.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PaymentGateway for MockGateway {
    fn create_hold(
        &self,
        amount: Decimal,
        customer_ref: &str,
        _metadata: &[(&str, &str)],
    ) -> Result<PaymentIntent, GatewayError> {
        let minor = to_minor_units(amount)?;
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = format!("pi_mock_{}", inner.next_id);
        inner.amounts.insert(id.clone(), minor);
        inner.calls.push(("create_hold", customer_ref.to_string()));
        Ok(PaymentIntent {
            id,
            status: IntentStatus::RequiresCapture,
            amount: minor,
            currency: CURRENCY.to_string(),
        })
    }

    fn capture(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let mut inner = self.lock();
        inner.calls.push(("capture", intent_id.to_string()));
        if inner.failing.contains(intent_id) {
            return Err(GatewayError::Rejected {
                code: "payment_intent_unexpected_state".into(),
                message: format!("intent {intent_id} cannot be captured"),
            });
        }
        let amount = inner.amounts.get(intent_id).copied().unwrap_or(0);
        Ok(PaymentIntent {
            id: intent_id.to_string(),
            status: IntentStatus::Succeeded,
            amount,
            currency: CURRENCY.to_string(),
        })
    }

    fn cancel(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let mut inner = self.lock();
        inner.calls.push(("cancel", intent_id.to_string()));
        if inner.failing.contains(intent_id) {
            return Err(GatewayError::Rejected {
                code: "payment_intent_unexpected_state".into(),
                message: format!("intent {intent_id} cannot be canceled"),
            });
        }
        let amount = inner.amounts.get(intent_id).copied().unwrap_or(0);
        Ok(PaymentIntent {
            id: intent_id.to_string(),
            status: IntentStatus::Canceled,
            amount,
            currency: CURRENCY.to_string(),
        })
    }

    fn check_status(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let mut inner = self.lock();
        inner.calls.push(("check_status", intent_id.to_string()));
        let amount = inner.amounts.get(intent_id).copied().unwrap_or(0);
        Ok(PaymentIntent {
            id: intent_id.to_string(),
            status: IntentStatus::RequiresCapture,
            amount,
            currency: CURRENCY.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn minor_units_conversion() {
        assert_eq!(to_minor_units(dec!(250)).unwrap(), 25000);
        assert_eq!(to_minor_units(dec!(79.99)).unwrap(), 7999);
        // Half-up on the sub-centavo boundary
        assert_eq!(to_minor_units(dec!(0.005)).unwrap(), 1);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(matches!(
            to_minor_units(dec!(0)),
            Err(GatewayError::InvalidAmount(_))
        ));
        assert!(matches!(
            to_minor_units(dec!(-10)),
            Err(GatewayError::InvalidAmount(_))
        ));
    }

    #[test]
    fn mock_records_calls_in_order() {
        let gateway = MockGateway::new();
        let intent = gateway
            .create_hold(dec!(150), "cus_1", &[("appointment_id", "a1")])
            .unwrap();
        assert_eq!(intent.status, IntentStatus::RequiresCapture);
        assert_eq!(intent.amount, 15000);

        gateway.capture(&intent.id).unwrap();
        gateway.cancel("pi_other").unwrap();

        let calls = gateway.calls();
        assert_eq!(calls[0].0, "create_hold");
        assert_eq!(calls[1], ("capture", intent.id.clone()));
        assert_eq!(calls[2], ("cancel", "pi_other".to_string()));
        assert_eq!(gateway.calls_for("capture"), vec![intent.id]);
    }

    #[test]
    fn mock_fail_intent_rejects_capture_and_cancel() {
        let gateway = MockGateway::new();
        gateway.fail_intent("pi_bad");

        assert!(matches!(
            gateway.capture("pi_bad"),
            Err(GatewayError::Rejected { .. })
        ));
        assert!(matches!(
            gateway.cancel("pi_bad"),
            Err(GatewayError::Rejected { .. })
        ));
        // Other intents unaffected
        assert!(gateway.capture("pi_good").is_ok());
    }
}

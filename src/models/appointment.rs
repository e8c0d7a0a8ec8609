use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AppointmentStatus, PaymentStatus};

/// A scheduled consultation and its payment state.
///
/// `status` and `payment_status` are independent: a cancelled appointment may
/// still carry an outstanding authorized hold until the expiry sweep releases
/// it. At most one active `payment_intent_id` exists per appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Scheduled consultation time (UTC).
    pub date: NaiveDateTime,
    /// Emergency consultations are billed immediately at request time and
    /// never enter the scheduled capture flow.
    pub is_emergency: bool,
    pub status: AppointmentStatus,
    /// Processor reference to the pre-authorized hold, present only when a
    /// hold was created at booking time.
    pub payment_intent_id: Option<String>,
    /// `None` when no hold was ever created (e.g. free plan).
    pub payment_status: Option<PaymentStatus>,
    pub payment_captured_at: Option<NaiveDateTime>,
    /// Append-only audit trail; the sweeps add lines, never replace.
    pub notes: Option<String>,
}

//! Payment capture sweep.
//!
//! Runs hourly and settles holds for appointments whose consultation time is
//! 12–13 hours away. The selection window is exactly as wide as the sweep
//! cadence, so as the window slides forward each qualifying appointment is
//! visited once. A failed capture leaves `payment_status` at `authorized`,
//! keeping the appointment selectable on the next sweep (or for an operator);
//! if an overlapping run captures the same intent twice, the processor
//! rejects the second attempt and the rejection is absorbed per item.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

use super::error::BillingError;
use super::types::SweepSummary;
use crate::db::repository::{appointment as appointments, notification as notifications};
use crate::gateway::PaymentGateway;
use crate::models::enums::NotificationType;
use crate::models::{Appointment, Notification};

/// Hours before the consultation at which the hold is settled.
pub const CAPTURE_LEAD_HOURS: i64 = 12;

/// Width of the selection slice. Must match the sweep cadence so the sliding
/// window leaves no gaps and produces no duplicate selections.
pub const CAPTURE_WINDOW_HOURS: i64 = 1;

/// The `[start, end)` slice of consultation times this run is responsible for.
pub fn capture_window(now: DateTime<Utc>) -> (NaiveDateTime, NaiveDateTime) {
    let start = now + Duration::hours(CAPTURE_LEAD_HOURS);
    let end = start + Duration::hours(CAPTURE_WINDOW_HOURS);
    (start.naive_utc(), end.naive_utc())
}

/// One capture run. Only the candidate query can fail the whole run;
/// everything else is handled per item.
pub fn run_capture_sweep(
    conn: &Connection,
    gateway: &dyn PaymentGateway,
    now: DateTime<Utc>,
) -> Result<SweepSummary, BillingError> {
    let started = std::time::Instant::now();
    let (window_start, window_end) = capture_window(now);

    let candidates =
        appointments::get_appointments_for_payment_processing(conn, window_start, window_end)?;

    let mut summary = SweepSummary::empty();
    summary.candidates = candidates.len() as u32;

    for appointment in &candidates {
        match capture_one(conn, gateway, appointment, now) {
            Ok(()) => summary.succeeded += 1,
            Err(e) => {
                summary.failed += 1;
                summary.errors.push(format!("appointment {}: {e}", appointment.id));
            }
        }
    }

    summary.duration_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        candidates = summary.candidates,
        captured = summary.succeeded,
        failed = summary.failed,
        duration_ms = summary.duration_ms,
        "Payment capture sweep completed"
    );
    Ok(summary)
}

fn capture_one(
    conn: &Connection,
    gateway: &dyn PaymentGateway,
    appointment: &Appointment,
    now: DateTime<Utc>,
) -> Result<(), BillingError> {
    let Some(intent_id) = appointment.payment_intent_id.as_deref() else {
        // The query filters these out; tolerate a stale row anyway.
        tracing::warn!(
            appointment_id = %appointment.id,
            "Selected appointment has no payment intent, skipping"
        );
        return Ok(());
    };

    match gateway.capture(intent_id) {
        Ok(intent) => {
            appointments::set_payment_captured(conn, &appointment.id, now.naive_utc())?;
            appointments::append_payment_note(
                conn,
                &appointment.id,
                &format!(
                    "{} payment captured ({intent_id})",
                    now.format("%Y-%m-%d %H:%M")
                ),
            )?;
            notifications::insert_notification(conn, &payment_confirmed(appointment, now))?;
            tracing::info!(
                appointment_id = %appointment.id,
                intent = intent_id,
                status = ?intent.status,
                "Captured pre-authorized payment"
            );
            Ok(())
        }
        Err(e) => {
            tracing::warn!(
                appointment_id = %appointment.id,
                intent = intent_id,
                error = %e,
                "Payment capture failed, appointment stays selectable for the next sweep"
            );
            appointments::append_payment_note(
                conn,
                &appointment.id,
                &format!(
                    "{} payment capture failed: {e}",
                    now.format("%Y-%m-%d %H:%M")
                ),
            )?;
            notifications::insert_notification(conn, &payment_failed(appointment, now))?;
            Err(e.into())
        }
    }
}

fn payment_confirmed(appointment: &Appointment, now: DateTime<Utc>) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id: appointment.user_id,
        notification_type: NotificationType::Payment,
        title: "Payment processed".to_string(),
        message: format!(
            "The payment for your consultation on {} was processed successfully.",
            appointment.date.format("%d/%m/%Y %H:%M")
        ),
        is_read: false,
        data: Some(json!({ "appointmentId": appointment.id })),
        created_at: now.naive_utc(),
    }
}

// Processor error text never reaches the patient; they get a generic
// instruction to contact support.
fn payment_failed(appointment: &Appointment, now: DateTime<Utc>) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id: appointment.user_id,
        notification_type: NotificationType::Error,
        title: "Payment issue".to_string(),
        message: format!(
            "We could not process the payment for your consultation on {}. \
             Please contact support.",
            appointment.date.format("%d/%m/%Y %H:%M")
        ),
        is_read: false,
        data: Some(json!({ "appointmentId": appointment.id })),
        created_at: now.naive_utc(),
    }
}

//! Pre-authorization expiry sweep.
//!
//! Appointments cancelled before their capture window still hold a card
//! pre-authorization; this sweep runs every 6 hours and releases those
//! holds so patients are not left with an indefinite reservation.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::error::BillingError;
use super::types::SweepSummary;
use crate::db::repository::appointment as appointments;
use crate::gateway::PaymentGateway;
use crate::models::Appointment;

/// One expiry run. Same isolation discipline as the capture sweep: a failed
/// release is logged and retried on the next run.
pub fn run_expiry_sweep(
    conn: &Connection,
    gateway: &dyn PaymentGateway,
    now: DateTime<Utc>,
) -> Result<SweepSummary, BillingError> {
    let started = std::time::Instant::now();

    let candidates = appointments::get_cancelled_appointments_with_pending_payment(conn)?;

    let mut summary = SweepSummary::empty();
    summary.candidates = candidates.len() as u32;

    for appointment in &candidates {
        match release_one(conn, gateway, appointment, now) {
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
        released = summary.succeeded,
        failed = summary.failed,
        duration_ms = summary.duration_ms,
        "Pre-authorization expiry sweep completed"
    );
    Ok(summary)
}

fn release_one(
    conn: &Connection,
    gateway: &dyn PaymentGateway,
    appointment: &Appointment,
    now: DateTime<Utc>,
) -> Result<(), BillingError> {
    let Some(intent_id) = appointment.payment_intent_id.as_deref() else {
        tracing::warn!(
            appointment_id = %appointment.id,
            "Cancelled appointment has no payment intent, skipping"
        );
        return Ok(());
    };

    match gateway.cancel(intent_id) {
        Ok(_) => {
            appointments::set_payment_cancelled(conn, &appointment.id)?;
            appointments::append_payment_note(
                conn,
                &appointment.id,
                &format!(
                    "{} pre-authorization released ({intent_id})",
                    now.format("%Y-%m-%d %H:%M")
                ),
            )?;
            tracing::info!(
                appointment_id = %appointment.id,
                intent = intent_id,
                "Released hold for cancelled appointment"
            );
            Ok(())
        }
        Err(e) => {
            tracing::warn!(
                appointment_id = %appointment.id,
                intent = intent_id,
                error = %e,
                "Hold release failed, left for the next sweep"
            );
            Err(e.into())
        }
    }
}

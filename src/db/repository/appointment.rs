//! Appointment store accessors used by the payment sweeps.
//!
//! Each mutation is a single-row UPDATE; the capture and expiry sweeps touch
//! disjoint rows, so no cross-appointment transaction is needed. The
//! `payment_status = 'authorized'` guard on the payment mutators keeps
//! `completed`/`cancelled` terminal even if a sweep double-selects a row.

use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, PaymentStatus};
use crate::models::Appointment;

const COLUMNS: &str = "id, user_id, date, is_emergency, status, \
     payment_intent_id, payment_status, payment_captured_at, notes";

pub fn insert_appointment(
    conn: &Connection,
    appointment: &Appointment,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments
         (id, user_id, date, is_emergency, status,
          payment_intent_id, payment_status, payment_captured_at, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            appointment.id.to_string(),
            appointment.user_id.to_string(),
            format_datetime(&appointment.date),
            appointment.is_emergency as i32,
            appointment.status.as_str(),
            appointment.payment_intent_id,
            appointment.payment_status.map(|s| s.as_str()),
            appointment.payment_captured_at.as_ref().map(format_datetime),
            appointment.notes,
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Appointment, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {COLUMNS} FROM appointments WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id.to_string()], read_row)?;

    match rows.next() {
        Some(row) => parse_row(row?),
        None => Err(DatabaseError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        }),
    }
}

/// Non-emergency appointments with an authorized hold whose consultation time
/// falls in `[window_start, window_end)` — the capture sweep's candidates.
pub fn get_appointments_for_payment_processing(
    conn: &Connection,
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM appointments
         WHERE is_emergency = 0
           AND payment_intent_id IS NOT NULL
           AND payment_status = 'authorized'
           AND date >= ?1
           AND date < ?2
         ORDER BY date ASC"
    ))?;

    let rows = stmt.query_map(
        params![
            format_datetime(&window_start),
            format_datetime(&window_end)
        ],
        read_row,
    )?;

    collect_appointments(rows)
}

/// Cancelled appointments whose hold was never released — the expiry sweep's
/// candidates.
pub fn get_cancelled_appointments_with_pending_payment(
    conn: &Connection,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM appointments
         WHERE status = 'cancelled'
           AND payment_status = 'authorized'
           AND payment_intent_id IS NOT NULL
         ORDER BY date ASC"
    ))?;

    let rows = stmt.query_map([], read_row)?;
    collect_appointments(rows)
}

/// Record a successful capture. No-op unless the hold is still `authorized`.
pub fn set_payment_captured(
    conn: &Connection,
    id: &Uuid,
    captured_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE appointments
         SET payment_status = 'completed', payment_captured_at = ?2
         WHERE id = ?1 AND payment_status = 'authorized'",
        params![id.to_string(), format_datetime(&captured_at)],
    )?;
    Ok(())
}

/// Record a released hold. No-op unless the hold is still `authorized`.
pub fn set_payment_cancelled(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE appointments
         SET payment_status = 'cancelled'
         WHERE id = ?1 AND payment_status = 'authorized'",
        params![id.to_string()],
    )?;
    Ok(())
}

/// Append a line to the appointment's audit trail. Existing content is never
/// replaced.
pub fn append_payment_note(conn: &Connection, id: &Uuid, note: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE appointments
         SET notes = CASE
             WHEN notes IS NULL OR notes = '' THEN ?2
             ELSE notes || char(10) || ?2
         END
         WHERE id = ?1",
        params![id.to_string(), note],
    )?;
    Ok(())
}

struct AppointmentRow {
    id: String,
    user_id: String,
    date: String,
    is_emergency: i32,
    status: String,
    payment_intent_id: Option<String>,
    payment_status: Option<String>,
    payment_captured_at: Option<String>,
    notes: Option<String>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        is_emergency: row.get(3)?,
        status: row.get(4)?,
        payment_intent_id: row.get(5)?,
        payment_status: row.get(6)?,
        payment_captured_at: row.get(7)?,
        notes: row.get(8)?,
    })
}

fn parse_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid("appointments.id", &row.id)?,
        user_id: parse_uuid("appointments.user_id", &row.user_id)?,
        date: parse_datetime("appointments.date", &row.date)?,
        is_emergency: row.is_emergency != 0,
        status: AppointmentStatus::from_str(&row.status)?,
        payment_intent_id: row.payment_intent_id,
        payment_status: row
            .payment_status
            .as_deref()
            .map(PaymentStatus::from_str)
            .transpose()?,
        payment_captured_at: row
            .payment_captured_at
            .as_deref()
            .map(|s| parse_datetime("appointments.payment_captured_at", s))
            .transpose()?,
        notes: row.notes,
    })
}

fn collect_appointments(
    rows: impl Iterator<Item = rusqlite::Result<AppointmentRow>>,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(parse_row(row?)?);
    }
    Ok(appointments)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn authorized_appointment(date: NaiveDateTime, intent: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            date,
            is_emergency: false,
            status: AppointmentStatus::Scheduled,
            payment_intent_id: Some(intent.to_string()),
            payment_status: Some(PaymentStatus::Authorized),
            payment_captured_at: None,
            notes: None,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let appt = authorized_appointment(dt(2026, 3, 10, 14, 30), "pi_abc");
        insert_appointment(&conn, &appt).unwrap();

        let loaded = get_appointment(&conn, &appt.id).unwrap();
        assert_eq!(loaded.id, appt.id);
        assert_eq!(loaded.user_id, appt.user_id);
        assert_eq!(loaded.date, appt.date);
        assert_eq!(loaded.payment_intent_id.as_deref(), Some("pi_abc"));
        assert_eq!(loaded.payment_status, Some(PaymentStatus::Authorized));
        assert!(loaded.payment_captured_at.is_none());
        assert!(loaded.notes.is_none());
    }

    #[test]
    fn get_missing_appointment_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = get_appointment(&conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn payment_window_is_inclusive_start_exclusive_end() {
        let conn = open_memory_database().unwrap();
        let start = dt(2026, 3, 10, 20, 0);
        let end = dt(2026, 3, 10, 21, 0);

        let at_start = authorized_appointment(start, "pi_start");
        let inside = authorized_appointment(dt(2026, 3, 10, 20, 30), "pi_inside");
        let at_end = authorized_appointment(end, "pi_end");
        let before = authorized_appointment(dt(2026, 3, 10, 19, 59), "pi_before");
        for appt in [&at_start, &inside, &at_end, &before] {
            insert_appointment(&conn, appt).unwrap();
        }

        let selected = get_appointments_for_payment_processing(&conn, start, end).unwrap();
        let ids: Vec<Uuid> = selected.iter().map(|a| a.id).collect();
        assert!(ids.contains(&at_start.id));
        assert!(ids.contains(&inside.id));
        assert!(!ids.contains(&at_end.id));
        assert!(!ids.contains(&before.id));
    }

    #[test]
    fn emergency_and_intentless_appointments_are_never_selected() {
        let conn = open_memory_database().unwrap();
        let start = dt(2026, 3, 10, 20, 0);
        let end = dt(2026, 3, 10, 21, 0);
        let inside = dt(2026, 3, 10, 20, 15);

        let mut emergency = authorized_appointment(inside, "pi_emergency");
        emergency.is_emergency = true;
        insert_appointment(&conn, &emergency).unwrap();

        let mut free_plan = authorized_appointment(inside, "unused");
        free_plan.payment_intent_id = None;
        free_plan.payment_status = None;
        insert_appointment(&conn, &free_plan).unwrap();

        let selected = get_appointments_for_payment_processing(&conn, start, end).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn terminal_payment_states_are_never_selected() {
        let conn = open_memory_database().unwrap();
        let start = dt(2026, 3, 10, 20, 0);
        let end = dt(2026, 3, 10, 21, 0);
        let inside = dt(2026, 3, 10, 20, 15);

        let mut captured = authorized_appointment(inside, "pi_done");
        captured.payment_status = Some(PaymentStatus::Completed);
        insert_appointment(&conn, &captured).unwrap();

        let mut released = authorized_appointment(inside, "pi_released");
        released.payment_status = Some(PaymentStatus::Cancelled);
        insert_appointment(&conn, &released).unwrap();

        let selected = get_appointments_for_payment_processing(&conn, start, end).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn cancelled_with_pending_payment_selects_only_dangling_holds() {
        let conn = open_memory_database().unwrap();

        let mut dangling = authorized_appointment(dt(2026, 3, 12, 9, 0), "pi_dangling");
        dangling.status = AppointmentStatus::Cancelled;
        insert_appointment(&conn, &dangling).unwrap();

        // Cancelled but already released
        let mut released = authorized_appointment(dt(2026, 3, 12, 10, 0), "pi_released");
        released.status = AppointmentStatus::Cancelled;
        released.payment_status = Some(PaymentStatus::Cancelled);
        insert_appointment(&conn, &released).unwrap();

        // Still scheduled: hold stays until its capture window
        let scheduled = authorized_appointment(dt(2026, 3, 12, 11, 0), "pi_active");
        insert_appointment(&conn, &scheduled).unwrap();

        let selected = get_cancelled_appointments_with_pending_payment(&conn).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, dangling.id);
    }

    #[test]
    fn set_payment_captured_marks_completed_with_timestamp() {
        let conn = open_memory_database().unwrap();
        let appt = authorized_appointment(dt(2026, 3, 10, 20, 0), "pi_cap");
        insert_appointment(&conn, &appt).unwrap();

        let captured_at = dt(2026, 3, 10, 8, 0);
        set_payment_captured(&conn, &appt.id, captured_at).unwrap();

        let loaded = get_appointment(&conn, &appt.id).unwrap();
        assert_eq!(loaded.payment_status, Some(PaymentStatus::Completed));
        assert_eq!(loaded.payment_captured_at, Some(captured_at));
    }

    #[test]
    fn payment_mutators_leave_terminal_states_untouched() {
        let conn = open_memory_database().unwrap();
        let mut appt = authorized_appointment(dt(2026, 3, 10, 20, 0), "pi_term");
        appt.payment_status = Some(PaymentStatus::Completed);
        appt.payment_captured_at = Some(dt(2026, 3, 9, 8, 0));
        insert_appointment(&conn, &appt).unwrap();

        set_payment_cancelled(&conn, &appt.id).unwrap();
        set_payment_captured(&conn, &appt.id, dt(2026, 3, 10, 8, 0)).unwrap();

        let loaded = get_appointment(&conn, &appt.id).unwrap();
        assert_eq!(loaded.payment_status, Some(PaymentStatus::Completed));
        assert_eq!(loaded.payment_captured_at, Some(dt(2026, 3, 9, 8, 0)));
    }

    #[test]
    fn append_payment_note_preserves_existing_lines() {
        let conn = open_memory_database().unwrap();
        let mut appt = authorized_appointment(dt(2026, 3, 10, 20, 0), "pi_notes");
        appt.notes = Some("booked via app".to_string());
        insert_appointment(&conn, &appt).unwrap();

        append_payment_note(&conn, &appt.id, "payment captured (pi_notes)").unwrap();
        append_payment_note(&conn, &appt.id, "receipt sent").unwrap();

        let loaded = get_appointment(&conn, &appt.id).unwrap();
        assert_eq!(
            loaded.notes.as_deref(),
            Some("booked via app\npayment captured (pi_notes)\nreceipt sent")
        );
    }

    #[test]
    fn append_payment_note_starts_empty_trail() {
        let conn = open_memory_database().unwrap();
        let appt = authorized_appointment(dt(2026, 3, 10, 20, 0), "pi_first");
        insert_appointment(&conn, &appt).unwrap();

        append_payment_note(&conn, &appt.id, "first line").unwrap();

        let loaded = get_appointment(&conn, &appt.id).unwrap();
        assert_eq!(loaded.notes.as_deref(), Some("first line"));
    }
}

//! Notification store: the sweeps' only user-visible output channel.

use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::NotificationType;
use crate::models::Notification;

pub fn insert_notification(
    conn: &Connection,
    notification: &Notification,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO notifications
         (id, user_id, type, title, message, is_read, data, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            notification.id.to_string(),
            notification.user_id.to_string(),
            notification.notification_type.as_str(),
            notification.title,
            notification.message,
            notification.is_read as i32,
            notification.data.as_ref().map(|d| d.to_string()),
            format_datetime(&notification.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_notifications_for_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<Notification>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, type, title, message, is_read, data, created_at
         FROM notifications
         WHERE user_id = ?1
         ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![user_id.to_string()], read_row)?;

    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(parse_row(row?)?);
    }
    Ok(notifications)
}

pub fn count_unread(conn: &Connection, user_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
        params![user_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

struct NotificationRow {
    id: String,
    user_id: String,
    notification_type: String,
    title: String,
    message: String,
    is_read: i32,
    data: Option<String>,
    created_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        notification_type: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        data: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn parse_row(row: NotificationRow) -> Result<Notification, DatabaseError> {
    let data = row
        .data
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e: serde_json::Error| DatabaseError::InvalidField {
            field: "notifications.data".into(),
            reason: e.to_string(),
        })?;

    Ok(Notification {
        id: parse_uuid("notifications.id", &row.id)?,
        user_id: parse_uuid("notifications.user_id", &row.user_id)?,
        notification_type: NotificationType::from_str(&row.notification_type)?,
        title: row.title,
        message: row.message,
        is_read: row.is_read != 0,
        data,
        created_at: parse_datetime("notifications.created_at", &row.created_at)?,
    })
}

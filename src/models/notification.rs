use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::NotificationType;

/// User-facing notification record created by the payment sweeps.
/// Created once, never mutated by the jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    /// Structured payload; carries `appointmentId` for traceability.
    pub data: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

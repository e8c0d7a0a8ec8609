pub mod appointment;
pub mod notification;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::DatabaseError;

/// Timestamp format for all TEXT datetime columns (UTC). Lexicographic order
/// matches chronological order, so range queries compare strings directly.
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FMT).to_string()
}

pub(crate) fn parse_datetime(field: &str, value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FMT).map_err(|e| DatabaseError::InvalidField {
        field: field.into(),
        reason: e.to_string(),
    })
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::InvalidField {
        field: field.into(),
        reason: e.to_string(),
    })
}

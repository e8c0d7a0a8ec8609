//! Billing-specific error type for the payment sweeps.
//!
//! Wraps the store and gateway errors at the job boundary; per-item failures
//! are caught inside a sweep and only run-level failures (the candidate query
//! itself) propagate out.

use thiserror::Error;

use crate::db::DatabaseError;
use crate::gateway::GatewayError;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

//! Appointment payment billing — the pre-authorization capture workflow.
//!
//! Four pieces:
//! - `pricing`: plan-tier discount and emergency-charge policy (pure functions)
//! - `capture`: hourly sweep settling holds 12–13h before the consultation
//! - `expiry`: 6-hourly sweep releasing holds on cancelled appointments
//! - `background`: fixed-interval job threads driving both sweeps

pub mod background;
pub mod capture;
pub mod error;
pub mod expiry;
pub mod pricing;
pub mod types;

pub use error::BillingError;

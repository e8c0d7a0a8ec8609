//! Result types shared by the capture and expiry sweeps.

/// Outcome of one sweep run. Per-item failures are collected here rather
/// than aborting the batch.
#[derive(Debug, Default)]
pub struct SweepSummary {
    /// Appointments selected by the candidate query.
    pub candidates: u32,
    /// Items whose gateway call and store writes all succeeded.
    pub succeeded: u32,
    /// Items that failed; they stay selectable for the next sweep.
    pub failed: u32,
    /// Human-readable description of each per-item failure.
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl SweepSummary {
    pub fn empty() -> Self {
        Self::default()
    }
}

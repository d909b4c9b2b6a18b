//! Error taxonomy for the conversion pipeline.
//!
//! Load-time structural errors are fatal for the run; per-lookup feed errors
//! are fatal only for the affected transaction, which still gets posted with
//! best-effort defaults.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// Malformed rule set rejected at load time.
    #[error("invalid rule set: {0}")]
    RuleSetInvalid(String),

    /// Network or transport failure reaching the price feed, including
    /// timeouts. Transient: a retry wrapper may try again.
    #[error("price feed unavailable: {0}")]
    FeedUnavailable(String),

    /// The feed responded but the payload has no parseable header or zero
    /// valid data rows. Permanent for this window.
    #[error("price feed malformed: {0}")]
    FeedMalformed(String),

    /// Trading-day advance exceeded its bound. Signals a calendar
    /// configuration bug, not a data problem.
    #[error("no trading day within {limit} days of {start}")]
    CalendarUnbounded { start: NaiveDate, limit: u32 },
}

impl ConvertError {
    /// Whether a caller-side retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ConvertError::FeedUnavailable(_))
    }
}

//! NAV feed abstraction and core types.

use crate::error::ConvertError;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

/// One published NAV observation for a scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct NavRow {
    pub scheme_code: String,
    pub date: NaiveDate,
    pub nav: f64,
}

/// All rows fetched for one feed window, shared cheaply between the cache
/// and its callers.
pub type NavTable = Arc<Vec<NavRow>>;

#[async_trait]
pub trait NavProvider: Send + Sync {
    /// Fetches all NAV rows the feed publishes for a fund house over the
    /// inclusive date window.
    async fn fetch_window(
        &self,
        mf_number: u32,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<NavTable, ConvertError>;
}

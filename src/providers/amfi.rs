//! AMFI NAV history report provider.
//!
//! The portal serves a semicolon-delimited text report. A preamble of report
//! titles and scheme-category lines precedes the header row, and fund-house
//! name lines are interleaved with the data, so parsing anchors on the
//! literal `Scheme Code;` header and keeps only well-formed 8-field rows.

use crate::error::ConvertError;
use crate::nav_provider::{NavProvider, NavRow, NavTable};
use crate::providers::util::with_retry;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const FEED_FIELD_COUNT: usize = 8;
const FEED_DATE_FORMAT: &str = "%d-%b-%Y";

pub struct AmfiProvider {
    base_url: String,
    timeout: Duration,
}

impl AmfiProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[async_trait]
impl NavProvider for AmfiProvider {
    async fn fetch_window(
        &self,
        mf_number: u32,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<NavTable, ConvertError> {
        let url = format!(
            "{}/DownloadNAVHistoryReport_Po.aspx?mf={}&tp=1&frmdt={}&todt={}",
            self.base_url,
            mf_number,
            from.format(FEED_DATE_FORMAT),
            to.format(FEED_DATE_FORMAT),
        );
        debug!("Requesting NAV history from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("bankimport/0.2")
            .timeout(self.timeout)
            .build()
            .map_err(|e| ConvertError::FeedUnavailable(e.to_string()))?;

        let response = with_retry(
            || async { client.get(&url).send().await },
            3,
            Duration::from_millis(500),
        )
        .await
        .map_err(|e| ConvertError::FeedUnavailable(format!("request for mf {mf_number}: {e}")))?;

        let response = response.error_for_status().map_err(|e| {
            ConvertError::FeedUnavailable(format!("feed returned error status: {e}"))
        })?;

        let body = response
            .text()
            .await
            .map_err(|e| ConvertError::FeedUnavailable(format!("reading feed body: {e}")))?;

        let rows = parse_nav_report(&body)?;
        debug!(
            "Fetched {} NAV rows for mf {} window {}..{}",
            rows.len(),
            mf_number,
            from,
            to
        );
        Ok(Arc::new(rows))
    }
}

/// Parses the report body into NAV rows.
///
/// Rows with the wrong field count, or whose date/NAV fields do not parse,
/// are silently dropped. A missing header or an empty result after filtering
/// is a malformed feed.
pub fn parse_nav_report(body: &str) -> Result<Vec<NavRow>, ConvertError> {
    let mut lines = body.lines();
    let header = lines
        .find(|line| line.starts_with("Scheme Code;"))
        .ok_or_else(|| ConvertError::FeedMalformed("header row not found".to_string()))?;

    let columns: Vec<&str> = header.split(';').collect();
    let scheme_idx = column_index(&columns, "Scheme Code")?;
    let nav_idx = column_index(&columns, "Net Asset Value")?;
    let date_idx = column_index(&columns, "Date")?;

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() != FEED_FIELD_COUNT {
            continue;
        }
        let Ok(date) = NaiveDate::parse_from_str(fields[date_idx].trim(), FEED_DATE_FORMAT) else {
            continue;
        };
        let Ok(nav) = fields[nav_idx].trim().parse::<f64>() else {
            continue;
        };
        rows.push(NavRow {
            scheme_code: fields[scheme_idx].trim().to_string(),
            date,
            nav,
        });
    }

    if rows.is_empty() {
        return Err(ConvertError::FeedMalformed(
            "no valid NAV data rows".to_string(),
        ));
    }
    Ok(rows)
}

fn column_index(columns: &[&str], name: &str) -> Result<usize, ConvertError> {
    columns
        .iter()
        .position(|c| c.trim() == name)
        .ok_or_else(|| ConvertError::FeedMalformed(format!("missing '{name}' column")))
}

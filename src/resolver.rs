//! Resolves a transaction date to the applicable NAV for a scheme.

use crate::cache::Cache;
use crate::calendar::TradingCalendar;
use crate::error::ConvertError;
use crate::nav_provider::{NavProvider, NavTable};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

/// Cache key: one entry per fetched feed window.
type WindowKey = (u32, NaiveDate, NaiveDate);

pub struct PriceResolver {
    provider: Arc<dyn NavProvider>,
    calendar: TradingCalendar,
    cache: Cache<WindowKey, NavTable>,
}

impl PriceResolver {
    pub fn new(provider: Arc<dyn NavProvider>, calendar: TradingCalendar) -> Self {
        Self {
            provider,
            calendar,
            cache: Cache::new(),
        }
    }

    /// Returns the NAV applicable to `requested_date` for the scheme.
    ///
    /// The requested date is first advanced to the next trading day, and a
    /// single-day feed window for that day is fetched through the cache.
    /// Within the window an exact-date row wins; otherwise the most recent
    /// row on or before the trading date is used (the feed may publish a
    /// scheme's NAV late while other schemes have rows for the day).
    /// `Ok(None)` means the feed had no usable row, which callers treat as
    /// best-effort pricing, not an error. The search window is never widened
    /// automatically on a miss.
    pub async fn resolve_nav(
        &self,
        scheme_code: &str,
        mf_number: u32,
        requested_date: NaiveDate,
    ) -> Result<Option<f64>, ConvertError> {
        let trading_date = self.calendar.next_trading_day(requested_date)?;
        if trading_date != requested_date {
            debug!(
                "Adjusted {} to trading day {} for scheme {}",
                requested_date, trading_date, scheme_code
            );
        }

        let provider = Arc::clone(&self.provider);
        let table = self
            .cache
            .get_or_try_insert_with((mf_number, trading_date, trading_date), || async move {
                provider
                    .fetch_window(mf_number, trading_date, trading_date)
                    .await
            })
            .await?;

        Ok(nav_on_or_before(&table, scheme_code, trading_date))
    }
}

// A zero NAV row is a feed placeholder, never a usable price.
fn nav_on_or_before(table: &NavTable, scheme_code: &str, trading_date: NaiveDate) -> Option<f64> {
    let exact = table
        .iter()
        .find(|row| row.scheme_code == scheme_code && row.date == trading_date && row.nav > 0.0);
    if let Some(row) = exact {
        return Some(row.nav);
    }

    table
        .iter()
        .filter(|row| row.scheme_code == scheme_code && row.date <= trading_date && row.nav > 0.0)
        .max_by_key(|row| row.date)
        .map(|row| row.nav)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav_provider::NavRow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockNavProvider {
        rows: Vec<NavRow>,
        call_count: AtomicUsize,
    }

    impl MockNavProvider {
        fn new(rows: Vec<NavRow>) -> Self {
            Self {
                rows,
                call_count: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NavProvider for MockNavProvider {
        async fn fetch_window(
            &self,
            _mf_number: u32,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<NavTable, ConvertError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(self.rows.clone()))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(scheme: &str, d: NaiveDate, nav: f64) -> NavRow {
        NavRow {
            scheme_code: scheme.to_string(),
            date: d,
            nav,
        }
    }

    fn resolver_with(rows: Vec<NavRow>) -> (PriceResolver, Arc<MockNavProvider>) {
        let mock = Arc::new(MockNavProvider::new(rows));
        let provider: Arc<dyn NavProvider> = Arc::clone(&mock) as Arc<dyn NavProvider>;
        let resolver = PriceResolver::new(provider, TradingCalendar::default());
        (resolver, mock)
    }

    #[tokio::test]
    async fn test_exact_date_match() {
        // 2025-06-04 is a Wednesday.
        let trading = date(2025, 6, 4);
        let (resolver, _) = resolver_with(vec![row("122639", trading, 81.9)]);

        let nav = resolver.resolve_nav("122639", 64, trading).await.unwrap();
        assert_eq!(nav, Some(81.9));
    }

    #[tokio::test]
    async fn test_weekend_advances_to_trading_day() {
        // Saturday 2025-06-07 resolves against Monday's row.
        let (resolver, _) = resolver_with(vec![row("122639", date(2025, 6, 9), 82.5)]);

        let nav = resolver
            .resolve_nav("122639", 64, date(2025, 6, 7))
            .await
            .unwrap();
        assert_eq!(nav, Some(82.5));
    }

    #[tokio::test]
    async fn test_falls_back_to_latest_prior_row() {
        // No row on the trading date itself; the most recent earlier row
        // for the scheme wins.
        let trading = date(2025, 6, 4);
        let (resolver, _) = resolver_with(vec![
            row("122639", date(2025, 6, 1), 80.0),
            row("122639", date(2025, 6, 2), 81.0),
            row("999999", trading, 55.0),
        ]);

        let nav = resolver.resolve_nav("122639", 64, trading).await.unwrap();
        assert_eq!(nav, Some(81.0));
    }

    #[tokio::test]
    async fn test_no_row_for_scheme_is_none() {
        let trading = date(2025, 6, 4);
        let (resolver, _) = resolver_with(vec![row("999999", trading, 55.0)]);

        let nav = resolver.resolve_nav("122639", 64, trading).await.unwrap();
        assert_eq!(nav, None);
    }

    #[tokio::test]
    async fn test_future_rows_are_ignored() {
        let trading = date(2025, 6, 4);
        let (resolver, _) = resolver_with(vec![row("122639", date(2025, 6, 5), 99.0)]);

        let nav = resolver.resolve_nav("122639", 64, trading).await.unwrap();
        assert_eq!(nav, None);
    }

    #[tokio::test]
    async fn test_zero_nav_rows_are_not_prices() {
        let trading = date(2025, 6, 4);
        let (resolver, _) = resolver_with(vec![
            row("122639", trading, 0.0),
            row("122639", date(2025, 6, 2), 81.0),
        ]);

        let nav = resolver.resolve_nav("122639", 64, trading).await.unwrap();
        assert_eq!(nav, Some(81.0));
    }

    #[tokio::test]
    async fn test_same_window_fetched_once() {
        let trading = date(2025, 6, 4);
        let (resolver, mock) = resolver_with(vec![
            row("122639", trading, 81.9),
            row("122640", trading, 76.4),
        ]);

        let first = resolver.resolve_nav("122639", 64, trading).await.unwrap();
        let second = resolver.resolve_nav("122640", 64, trading).await.unwrap();

        assert_eq!(first, Some(81.9));
        assert_eq!(second, Some(76.4));
        assert_eq!(mock.call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_fund_number_is_a_separate_window() {
        let trading = date(2025, 6, 4);
        let (resolver, mock) = resolver_with(vec![row("122639", trading, 81.9)]);

        resolver.resolve_nav("122639", 64, trading).await.unwrap();
        resolver.resolve_nav("122639", 28, trading).await.unwrap();

        assert_eq!(mock.call_count.load(Ordering::SeqCst), 2);
    }
}

use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Runs a request closure up to `1 + retries` times, sleeping `delay`
/// between attempts. Returns the first success or the last transport error.
pub async fn with_retry<F, Fut, T>(mut request: F, retries: usize, delay: Duration) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    for attempt in 1..=retries {
        match request().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                debug!(attempt, retries, %err, "Feed request failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
    request().await.map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let client = reqwest::Client::new();
        let attempts = AtomicUsize::new(0);

        // An unroutable port fails fast; after exhausting retries the last
        // error is surfaced.
        let result: Result<reqwest::Response, _> = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                client.get("http://127.0.0.1:1/nav").send()
            },
            2,
            Duration::from_millis(1),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}

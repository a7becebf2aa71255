//! Timed series: N totals to one recipient with a fixed inter-send delay.
//!
//! Each iteration is independent: a fresh clip and phrase, a single
//! delivery attempt, and a log line. Per-item failures never abort the
//! series; only cancellation or the final item ends it.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    delivery::{DeliveryOutcome, DeliveryService},
    domain::UserId,
    totals::TotalLibrary,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeriesOutcome {
    pub delivered: u32,
    pub attempted: u32,
    pub cancelled: bool,
}

pub async fn run_series(
    delivery: &DeliveryService,
    totals: &TotalLibrary,
    recipient: UserId,
    count: u32,
    interval: Duration,
    token: &CancellationToken,
) -> SeriesOutcome {
    tracing::info!(user = recipient.0, count, ?interval, "series started");

    let mut delivered = 0u32;
    let mut attempted = 0u32;
    let mut cancelled = false;

    for i in 0..count {
        if token.is_cancelled() {
            cancelled = true;
            break;
        }

        attempted += 1;
        let item = i + 1;

        let country = match delivery.directory().get_user(recipient).await {
            Ok(Some(user)) => user.country,
            Ok(None) => {
                tracing::warn!(user = recipient.0, item, "recipient left the directory");
                String::new()
            }
            Err(e) => {
                tracing::error!(user = recipient.0, item, "directory lookup failed: {e}");
                String::new()
            }
        };

        match totals.total_content(delivery.locales(), &country).await {
            Ok(Some(content)) => {
                // Single attempt: a stuck series must not stall on one recipient.
                match delivery.deliver(recipient, &content).await {
                    DeliveryOutcome::Delivered => {
                        delivered += 1;
                        tracing::info!(user = recipient.0, item, count, "series item delivered");
                    }
                    outcome => {
                        tracing::warn!(user = recipient.0, item, ?outcome, "series item not delivered");
                    }
                }
            }
            Ok(None) => {
                tracing::warn!(user = recipient.0, item, "no clip available for series item");
            }
            Err(e) => {
                tracing::error!(user = recipient.0, item, "series item failed to build: {e}");
            }
        }

        if item < count {
            tokio::select! {
                _ = token.cancelled() => {
                    cancelled = true;
                    break;
                }
                _ = sleep(interval) => {}
            }
        }
    }

    tracing::info!(
        user = recipient.0,
        delivered,
        attempted,
        cancelled,
        "series finished"
    );

    SeriesOutcome {
        delivered,
        attempted,
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::{
        delivery::DeliveryService,
        locale::LocaleStore,
        messaging::SendError,
        testutil::{directory_with, record, FakeTransport},
    };

    fn clip_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("avio-series-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.gif"), b"clip").unwrap();
        dir
    }

    async fn fixture(transport: Arc<FakeTransport>) -> DeliveryService {
        let dir = directory_with(&[record(5, None, "Russia")]).await;
        DeliveryService::new(
            transport,
            Arc::new(dir),
            Arc::new(LocaleStore::new("/nonexistent-lang-dir")),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_items_but_not_after_the_last() {
        let transport = Arc::new(FakeTransport::new());
        let delivery = fixture(transport.clone()).await;
        let totals = TotalLibrary::new(clip_dir("timing"));
        let interval = Duration::from_secs(60);

        let started = tokio::time::Instant::now();
        let outcome = run_series(
            &delivery,
            &totals,
            UserId(5),
            3,
            interval,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.delivered, 3);
        assert_eq!(transport.send_count().await, 3);
        // Two intervals for three items.
        let elapsed = started.elapsed();
        assert!(elapsed >= interval * 2, "elapsed {elapsed:?}");
        assert!(elapsed < interval * 3, "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn continues_past_per_item_failures() {
        let transport = Arc::new(FakeTransport::new());
        transport.fail_next(5, SendError::Forbidden).await;
        let delivery = fixture(transport.clone()).await;
        let totals = TotalLibrary::new(clip_dir("failures"));

        let outcome = run_series(
            &delivery,
            &totals,
            UserId(5),
            3,
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.delivered, 2);
        assert!(!outcome.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_series_mid_sleep() {
        let transport = Arc::new(FakeTransport::new());
        let delivery = fixture(transport.clone()).await;
        let totals = TotalLibrary::new(clip_dir("cancel"));
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            cancel.cancel();
        });

        let outcome = run_series(
            &delivery,
            &totals,
            UserId(5),
            10,
            Duration::from_secs(60),
            &token,
        )
        .await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.attempted, 1);
        assert_eq!(transport.send_count().await, 1);
    }
}

//! Replay scheduler
//!
//! Re-sends a historical batch of packages so that wall-clock gaps between
//! deliveries approximate the gaps between record timestamps. The pacing
//! baseline resets to the completion instant of each delivery attempt, so
//! drift never accumulates backward but a slow delivery shifts the rest of
//! the schedule unless later records have slack.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::time::{sleep, Duration, Instant};

use crate::models::PackageRecord;

/// Errors from delivering a single package
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned status {0}")]
    Status(StatusCode),
}

/// Errors from running a whole replay
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("no valid records to replay")]
    NoValidRecords,
}

/// Downstream delivery target for paced packages
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, package: &PackageRecord) -> Result<(), DeliveryError>;
}

/// Delivers packages as JSON POSTs to the ingestion endpoint.
pub struct HttpSink {
    client: Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(timeout_secs))
            .build()?;
        Ok(HttpSink {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl DeliverySink for HttpSink {
    async fn deliver(&self, package: &PackageRecord) -> Result<(), DeliveryError> {
        let response = self.client.post(&self.endpoint).json(package).send().await?;
        if !response.status().is_success() {
            return Err(DeliveryError::Status(response.status()));
        }
        Ok(())
    }
}

/// Outcome counts for one replay run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub sent: usize,
    pub failed: usize,
}

/// Paces a batch of records through a delivery sink.
pub struct ReplayScheduler<S: DeliverySink> {
    sink: S,
}

impl<S: DeliverySink> ReplayScheduler<S> {
    pub fn new(sink: S) -> Self {
        ReplayScheduler { sink }
    }

    /// Replay `records` in timestamp order, sleeping between deliveries so
    /// that each record goes out no earlier than its offset from the first
    /// record's timestamp, measured against the previous attempt's
    /// completion. A failed delivery is logged and counted, never fatal.
    pub async fn run(
        &self,
        mut records: Vec<PackageRecord>,
    ) -> Result<ReplaySummary, ReplayError> {
        if records.is_empty() {
            return Err(ReplayError::NoValidRecords);
        }

        // Stable sort: equal timestamps keep their input order
        records.sort_by_key(|r| r.timestamp);

        let first_time = records[0].timestamp;
        let mut last_send = Instant::now();
        let mut summary = ReplaySummary::default();

        for record in &records {
            let offset = (record.timestamp - first_time) as f64;
            let delay = offset - last_send.elapsed().as_secs_f64();
            if delay > 0.0 {
                sleep(Duration::from_secs_f64(delay)).await;
            }

            match self.sink.deliver(record).await {
                Ok(()) => {
                    log::info!("Sent package from {} at {}", record.ip, record.timestamp);
                    summary.sent += 1;
                }
                Err(e) => {
                    log::warn!("Failed to send package from {}: {}", record.ip, e);
                    summary.failed += 1;
                }
            }

            // Baseline resets to the post-attempt instant, success or not
            last_send = Instant::now();
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingSink {
        start: Instant,
        deliveries: Mutex<Vec<(i64, f64)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            RecordingSink {
                start: Instant::now(),
                deliveries: Mutex::new(Vec::new()),
            }
        }

        fn offsets(&self) -> Vec<(i64, f64)> {
            self.deliveries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeliverySink for RecordingSink {
        async fn deliver(&self, package: &PackageRecord) -> Result<(), DeliveryError> {
            self.deliveries
                .lock()
                .unwrap()
                .push((package.timestamp, self.start.elapsed().as_secs_f64()));
            Ok(())
        }
    }

    struct FlakySink {
        calls: AtomicUsize,
        fail_index: usize,
    }

    #[async_trait]
    impl DeliverySink for FlakySink {
        async fn deliver(&self, _package: &PackageRecord) -> Result<(), DeliveryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_index {
                Err(DeliveryError::Status(StatusCode::INTERNAL_SERVER_ERROR))
            } else {
                Ok(())
            }
        }
    }

    fn record(ip: &str, timestamp: i64) -> PackageRecord {
        PackageRecord {
            ip: ip.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            timestamp,
            suspicious: false,
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_an_error() {
        let scheduler = ReplayScheduler::new(RecordingSink::new());
        assert!(matches!(
            scheduler.run(Vec::new()).await,
            Err(ReplayError::NoValidRecords)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_record_sends_immediately() {
        let scheduler = ReplayScheduler::new(RecordingSink::new());
        let summary = scheduler.run(vec![record("1.1.1.1", 1700000000)]).await.unwrap();

        assert_eq!(summary.sent, 1);
        let offsets = scheduler.sink.offsets();
        assert!(offsets[0].1 < 0.001, "first record must not be delayed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_reconstructs_gaps() {
        let scheduler = ReplayScheduler::new(RecordingSink::new());
        // Shuffled input; timestamps 0, 5, 5, 10 relative to the base
        let base = 1700000000;
        let records = vec![
            record("d", base + 10),
            record("a", base),
            record("b", base + 5),
            record("c", base + 5),
        ];

        let summary = scheduler.run(records).await.unwrap();
        assert_eq!(summary.sent, 4);

        let offsets = scheduler.sink.offsets();
        let timestamps: Vec<i64> = offsets.iter().map(|(t, _)| *t).collect();
        assert_eq!(timestamps, vec![base, base + 5, base + 5, base + 10]);

        // The baseline resets after each send, so each record waits out its
        // offset from the first timestamp again: sends land at 0, 5, 10, 20.
        let sent_at: Vec<f64> = offsets.iter().map(|(_, at)| *at).collect();
        assert!(sent_at[0] < 0.001);
        assert!((sent_at[1] - 5.0).abs() < 0.01);
        assert!((sent_at[2] - 10.0).abs() < 0.01);
        assert!((sent_at[3] - 20.0).abs() < 0.01);

        // Spec floor: the fourth delivery never completes before +10s
        assert!(sent_at[3] >= 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliveries_are_timestamp_ordered() {
        let scheduler = ReplayScheduler::new(RecordingSink::new());
        let records = vec![
            record("c", 30),
            record("a", 10),
            record("b", 20),
        ];
        scheduler.run(records).await.unwrap();

        let timestamps: Vec<i64> = scheduler.sink.offsets().iter().map(|(t, _)| *t).collect();
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_abort_the_schedule() {
        let sink = FlakySink {
            calls: AtomicUsize::new(0),
            fail_index: 1,
        };
        let scheduler = ReplayScheduler::new(sink);
        let records = vec![record("a", 0), record("b", 1), record("c", 2)];

        let summary = scheduler.run(records).await.unwrap();
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(scheduler.sink.calls.load(Ordering::SeqCst), 3);
    }
}

//! Polling worker bound to one feed source
//!
//! Each worker runs as its own task. It hands readings to the pool through a
//! small ring buffer that displaces the oldest entry when full, so a slow
//! consumer never blocks the producer. Teardown is a two-signal handshake: the
//! pool requests a stop, then waits for the task to confirm before it releases
//! the queue.

use chrono::Utc;
use crossbeam::queue::ArrayQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, info, trace, warn};

use rates_core::Reading;
use crate::source::FeedSource;

/// Worker lifecycle as seen by the owning pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Stopping,
    Stopped,
}

/// Pool-side handle of a running worker task
#[derive(Debug)]
pub struct Worker {
    title: String,
    queue: Arc<ArrayQueue<Reading>>,
    stop_tx: Option<oneshot::Sender<()>>,
    stopped_rx: Option<oneshot::Receiver<()>>,
    last_reading: Option<Reading>,
    state: WorkerState,
}

impl Worker {
    /// Spawn the polling task for `source` on the current runtime
    pub fn spawn(source: FeedSource, poll_interval: Duration, queue_capacity: usize) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (stopped_tx, stopped_rx) = oneshot::channel();
        let queue = Arc::new(ArrayQueue::new(queue_capacity.max(1)));
        let title = source.id().to_string();

        tokio::spawn(run(source, Arc::clone(&queue), poll_interval, stop_rx, stopped_tx));

        Self {
            title,
            queue,
            stop_tx: Some(stop_tx),
            stopped_rx: Some(stopped_rx),
            last_reading: None,
            state: WorkerState::Running,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn last_reading(&self) -> Option<&Reading> {
        self.last_reading.as_ref()
    }

    /// Empty the queue without blocking, keeping only the newest reading.
    ///
    /// Returns true if anything new arrived.
    pub fn drain(&mut self) -> bool {
        let mut received = false;

        while let Some(reading) = self.queue.pop() {
            trace!("Received rate {:.5} from {}", reading.value, reading.source_id);
            self.last_reading = Some(reading);
            received = true;
        }

        received
    }

    /// Request a stop and wait until the task confirms it will not write again.
    ///
    /// The handle stays usable afterwards and reports `WorkerState::Stopped`.
    pub async fn stop(&mut self) {
        self.state = WorkerState::Stopping;
        debug!("Stopping worker {}", self.title);

        if let Some(stop_tx) = self.stop_tx.take() {
            // The task may already be gone; its confirmation below still resolves.
            let _ = stop_tx.send(());
        }

        if let Some(stopped_rx) = self.stopped_rx.take() {
            debug!("Waiting for worker {} to stop", self.title);
            if stopped_rx.await.is_err() {
                warn!("Worker {} exited without confirming stop", self.title);
            }
        }

        self.state = WorkerState::Stopped;
        info!("Stopped worker {}", self.title);
    }
}

async fn run(
    mut source: FeedSource,
    queue: Arc<ArrayQueue<Reading>>,
    poll_interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
    stopped_tx: oneshot::Sender<()>,
) {
    debug!("Worker {} started", source.id());

    loop {
        // A dropped sender means the pool is gone, which is also a stop request.
        if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
            break;
        }

        match source.sample(Utc::now()).await {
            Ok(reading) => {
                trace!("Source {} queued rate {:.6}", source.id(), reading.value);
                if let Some(displaced) = queue.force_push(reading) {
                    trace!(
                        "Queue for {} full, displaced rate {:.6}",
                        source.id(),
                        displaced.value
                    );
                }
            }
            Err(e) => {
                debug!("Source {} fails to return rate: {}", source.id(), e);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = &mut stop_rx => break,
        }
    }

    debug!("Stop signal received for {}", source.id());
    // Fails only when the handle was dropped without waiting for confirmation.
    let _ = stopped_tx.send(());
}

#[cfg(test)]
impl Worker {
    /// Handle with no task behind it, fed directly through the returned queue
    pub(crate) fn detached(title: &str, queue_capacity: usize) -> (Self, Arc<ArrayQueue<Reading>>) {
        let (stop_tx, _stop_rx) = oneshot::channel();
        let (stopped_tx, stopped_rx) = oneshot::channel();
        let _ = stopped_tx.send(());
        let queue = Arc::new(ArrayQueue::new(queue_capacity));

        let worker = Self {
            title: title.to_string(),
            queue: Arc::clone(&queue),
            stop_tx: Some(stop_tx),
            stopped_rx: Some(stopped_rx),
            last_reading: None,
            state: WorkerState::Running,
        };

        (worker, queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::mock::Script;
    use chrono::TimeZone;
    use rates_core::ExtractError;

    fn reading(value: f64) -> Reading {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Reading::new(value, t0, chrono::Duration::seconds(30), "a")
    }

    async fn wait_for_reading(worker: &mut Worker) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !worker.drain() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("worker produced no reading");
    }

    #[test]
    fn test_full_queue_displaces_oldest() {
        let (mut worker, queue) = Worker::detached("a", 2);

        assert!(queue.force_push(reading(1.0)).is_none());
        assert!(queue.force_push(reading(2.0)).is_none());
        let displaced = queue.force_push(reading(3.0));

        assert_eq!(displaced.map(|r| r.value), Some(1.0));
        assert!(worker.drain());
        assert_eq!(worker.last_reading().map(|r| r.value), Some(3.0));
        assert!(!worker.drain());
        assert_eq!(worker.last_reading().map(|r| r.value), Some(3.0));
    }

    #[tokio::test]
    async fn test_worker_delivers_readings() {
        let script = Script::returning("$64,000.50");
        let source = FeedSource::new("a", script.extractor(), 30);
        let mut worker = Worker::spawn(source, Duration::from_millis(10), 2);

        wait_for_reading(&mut worker).await;

        let last = worker.last_reading().unwrap();
        assert_eq!(last.value, 64000.5);
        assert_eq!(last.source_id, "a");
        assert_eq!(worker.state(), WorkerState::Running);

        worker.stop().await;
    }

    #[tokio::test]
    async fn test_stop_confirms_and_halts_polling() {
        let script = Script::returning("1");
        let source = FeedSource::new("a", script.extractor(), 1);
        let mut worker = Worker::spawn(source, Duration::from_millis(5), 2);

        wait_for_reading(&mut worker).await;
        tokio::time::timeout(Duration::from_secs(5), worker.stop())
            .await
            .expect("stop did not complete");
        assert_eq!(worker.state(), WorkerState::Stopped);

        let calls = script.calls();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(script.calls(), calls);
    }

    #[tokio::test]
    async fn test_stop_interrupts_sleep() {
        let script = Script::returning("1");
        let source = FeedSource::new("a", script.extractor(), 30);
        let mut worker = Worker::spawn(source, Duration::from_secs(3600), 2);

        wait_for_reading(&mut worker).await;
        tokio::time::timeout(Duration::from_secs(5), worker.stop())
            .await
            .expect("stop waited for the full poll interval");
        assert_eq!(worker.state(), WorkerState::Stopped);
        assert_eq!(worker.last_reading().map(|r| r.value), Some(1.0));
    }

    #[tokio::test]
    async fn test_repeated_stop_is_harmless() {
        let (mut worker, _queue) = Worker::detached("a", 2);
        assert_eq!(worker.state(), WorkerState::Running);

        worker.stop().await;
        assert_eq!(worker.state(), WorkerState::Stopped);

        worker.stop().await;
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_failing_source_produces_nothing() {
        let script = Script::failing(ExtractError::Transport("refused".into()));
        let source = FeedSource::new("a", script.extractor(), 30);
        let mut worker = Worker::spawn(source, Duration::from_millis(5), 2);

        tokio::time::timeout(Duration::from_secs(5), async {
            while script.calls() < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("worker stopped polling");

        assert!(!worker.drain());
        assert!(worker.last_reading().is_none());
        worker.stop().await;
    }
}

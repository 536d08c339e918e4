//! Rate pool - coordinates the workers of one instrument

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, trace, warn};

use rates_core::{AggregateResult, FeedDescriptor, PoolConfig};
use crate::feeds::ExtractorRegistry;
use crate::source::FeedSource;
use crate::worker::Worker;

/// Workers polling every configured feed of one instrument
///
/// `add_source` and `shutdown` must not race each other. `aggregate` only
/// touches the worker queues and can run while the workers are busy.
#[derive(Debug)]
pub struct Pool {
    config: PoolConfig,
    registry: Arc<ExtractorRegistry>,
    workers: Vec<Worker>,
}

impl Pool {
    pub fn new(config: PoolConfig, registry: Arc<ExtractorRegistry>) -> Self {
        Self {
            config,
            registry,
            workers: vec![],
        }
    }

    /// Build a pool and add every feed, skipping the ones that fail to configure
    pub fn from_feeds(
        config: PoolConfig,
        registry: Arc<ExtractorRegistry>,
        feeds: &[FeedDescriptor],
    ) -> Self {
        let mut pool = Self::new(config, registry);

        for feed in feeds {
            pool.add_source(feed);
        }

        info!(
            "{} pool started with {} of {} sources",
            pool.config.title,
            pool.len(),
            feeds.len()
        );

        pool
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Start a worker for `feed`. A feed that cannot be built is logged and skipped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn add_source(&mut self, feed: &FeedDescriptor) {
        let source = match FeedSource::from_descriptor(feed, &self.registry) {
            Ok(source) => source,
            Err(e) => {
                warn!("Can not init source {:?}, skipping: {}", feed.title, e);
                return;
            }
        };

        let worker = Worker::spawn(source, self.config.poll_interval, self.config.queue_capacity);
        info!("Started worker {} in {} pool", worker.title(), self.config.title);
        self.workers.push(worker);
    }

    /// Mean of every worker's last reading that is still valid at `now`
    pub fn aggregate(&mut self, now: DateTime<Utc>) -> AggregateResult {
        let mut sum = 0.0;
        let mut contributing = 0;

        for worker in &mut self.workers {
            worker.drain();

            if let Some(reading) = worker.last_reading() {
                if reading.is_valid_at(now) {
                    trace!("Sum a rate from {}", reading.source_id);
                    sum += reading.value;
                    contributing += 1;
                }
            }
        }

        AggregateResult::from_sum(sum, contributing, self.workers.len())
    }

    /// Stop every worker in registration order, waiting for each to confirm
    pub async fn shutdown(&mut self) {
        info!(
            "Destroy {} pool, has {} sources",
            self.config.title,
            self.workers.len()
        );

        for worker in &mut self.workers {
            worker.stop().await;
        }
        self.workers.clear();

        info!("{} pool stopped", self.config.title);
    }
}

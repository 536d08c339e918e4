//! Concurrent rate polling and aggregation
//!
//! Features:
//! - One polling task per configured feed
//! - TTL cache per feed, invalidated on failed samples
//! - Bounded handoff queues that never block the producer
//! - Blocking, leak-free pool shutdown

pub mod aggregator;
pub mod feeds;
pub mod source;
pub mod worker;

pub use aggregator::Pool;
pub use feeds::{Extractor, ExtractorRegistry, JsonExtractor};
pub use source::FeedSource;
pub use worker::{Worker, WorkerState};

//! Core type definitions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One TTL-bounded sample of a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub valid_until: DateTime<Utc>,
    pub source_id: String,
}

impl Reading {
    /// Expiry saturates at the latest representable time instead of overflowing
    pub fn new(value: f64, sampled_at: DateTime<Utc>, ttl: Duration, source_id: impl Into<String>) -> Self {
        Self {
            value,
            valid_until: sampled_at
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            source_id: source_id.into(),
        }
    }

    /// Expiry is exclusive: a reading is no longer valid at `valid_until`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.valid_until
    }
}

/// Mean over the sources of one pool that currently hold a fresh reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateResult {
    pub mean_value: f64,
    pub contributing_count: usize,
    pub total_count: usize,
}

impl AggregateResult {
    pub fn from_sum(sum: f64, contributing_count: usize, total_count: usize) -> Self {
        let mean_value = if contributing_count > 0 {
            sum / contributing_count as f64
        } else {
            0.0
        };

        Self {
            mean_value,
            contributing_count,
            total_count,
        }
    }

    pub fn meets_quorum(&self, min_sources: usize) -> bool {
        self.contributing_count >= min_sources
    }
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} of {})",
            self.mean_value, self.contributing_count, self.total_count
        )
    }
}

//! Instrument session - one pool per quoted instrument

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::info;

use rates_core::{AggregateResult, MonitorConfig};
use rates_price_feed::{ExtractorRegistry, Pool};

pub const BITCOIN: &str = "Bitcoin";
pub const EURO: &str = "Euro";

/// Bitcoin and Euro pools plus the quorum each needs to be trusted
#[derive(Debug)]
pub struct InstrumentSession {
    bitcoin: Pool,
    euro: Pool,
    min_bitcoin: usize,
    min_euro: usize,
}

impl InstrumentSession {
    pub fn new(config: &MonitorConfig, registry: Arc<ExtractorRegistry>) -> Self {
        let bitcoin = Pool::from_feeds(
            config.pool_config(BITCOIN),
            Arc::clone(&registry),
            &config.bitcoin_feeds,
        );
        let euro = Pool::from_feeds(config.pool_config(EURO), registry, &config.euro_feeds);

        Self::from_pools(bitcoin, euro, config.min_bitcoin, config.min_euro)
    }

    pub fn from_pools(bitcoin: Pool, euro: Pool, min_bitcoin: usize, min_euro: usize) -> Self {
        Self {
            bitcoin,
            euro,
            min_bitcoin,
            min_euro,
        }
    }

    pub fn status(&mut self, now: DateTime<Utc>) -> StatusLine {
        StatusLine {
            bitcoin: self.bitcoin.aggregate(now),
            euro: self.euro.aggregate(now),
            min_bitcoin: self.min_bitcoin,
            min_euro: self.min_euro,
        }
    }

    /// Stop the Euro workers, then the Bitcoin workers
    pub async fn shutdown(&mut self) {
        self.euro.shutdown().await;
        self.bitcoin.shutdown().await;
        info!("All pools stopped");
    }
}

/// One rendered snapshot of both instruments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusLine {
    pub bitcoin: AggregateResult,
    pub euro: AggregateResult,
    pub min_bitcoin: usize,
    pub min_euro: usize,
}

impl StatusLine {
    pub fn btc_usd(&self) -> Option<f64> {
        self.bitcoin
            .meets_quorum(self.min_bitcoin)
            .then_some(self.bitcoin.mean_value)
    }

    pub fn eur_usd(&self) -> Option<f64> {
        self.euro
            .meets_quorum(self.min_euro)
            .then_some(self.euro.mean_value)
    }

    /// Cross rate, only when both instruments meet their quorum
    pub fn btc_eur(&self) -> Option<f64> {
        let btc = self.btc_usd()?;
        let eur = self.eur_usd()?;

        Some(if eur > 0.0 { btc / eur } else { 0.0 })
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.btc_usd() {
            Some(rate) => write!(f, "BTC/USD: {:.2}", rate)?,
            None => write!(f, "BTC/USD: Undefined")?,
        }

        match self.eur_usd() {
            Some(rate) => write!(f, "\tEUR/USD: {:.5}", rate)?,
            None => write!(f, "\tEUR/USD: Undefined")?,
        }

        match self.btc_eur() {
            Some(rate) => write!(f, "\tBTC/EUR: {:.2}", rate)?,
            None => write!(f, "\tBTC/EUR: Undefined")?,
        }

        write!(
            f,
            "\tActive sources: BTC/USD ({} of {})  EUR/USD ({} of {})",
            self.bitcoin.contributing_count,
            self.bitcoin.total_count,
            self.euro.contributing_count,
            self.euro.total_count
        )
    }
}

//! Feed source with a TTL cache of its last good reading
//!
//! A source is owned by exactly one worker, so the cache needs no locking.

use chrono::{DateTime, Duration, Utc};
use tracing::{trace, warn};

use rates_core::{
    normalize_ttl, parse_rate, ConfigError, ConfigResult, FeedDescriptor, Reading, SourceError,
    SourceResult,
};
use crate::feeds::{Extractor, ExtractorRegistry};

pub struct FeedSource {
    id: String,
    extractor: Box<dyn Extractor>,
    ttl: Duration,
    last_reading: Option<Reading>,
}

impl FeedSource {
    pub fn new(id: impl Into<String>, extractor: Box<dyn Extractor>, ttl_seconds: i64) -> Self {
        Self {
            id: id.into(),
            extractor,
            ttl: Duration::seconds(normalize_ttl(ttl_seconds)),
            last_reading: None,
        }
    }

    /// Build a source from its descriptor, resolving the extractor by kind
    pub fn from_descriptor(
        descriptor: &FeedDescriptor,
        registry: &ExtractorRegistry,
    ) -> ConfigResult<Self> {
        if descriptor.title.is_empty() {
            return Err(ConfigError::MissingField("title"));
        }
        descriptor.validate_ttl()?;

        let extractor = registry.build(&descriptor.extractor, &descriptor.url, &descriptor.options)?;

        Ok(Self::new(
            descriptor.title.clone(),
            extractor,
            descriptor.ttl_seconds,
        ))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn last_reading(&self) -> Option<&Reading> {
        self.last_reading.as_ref()
    }

    /// Return the cached reading while it is fresh, otherwise fetch a new one.
    ///
    /// A failed fetch or parse clears the cache.
    pub async fn sample(&mut self, now: DateTime<Utc>) -> SourceResult<Reading> {
        if let Some(reading) = &self.last_reading {
            if reading.is_valid_at(now) {
                trace!("Rate for {} is cached until {}", self.id, reading.valid_until);
                return Ok(reading.clone());
            }
        }

        let raw = match self.extractor.fetch().await {
            Ok(raw) => raw,
            Err(error) => {
                self.last_reading = None;
                warn!("Source {} fetch failed: {}", self.id, error);
                return Err(SourceError::Extract {
                    source_id: self.id.clone(),
                    error,
                });
            }
        };

        let value = match parse_rate(&raw) {
            Ok(value) => value,
            Err(error) => {
                self.last_reading = None;
                warn!("Source {} returned unparsable rate: {}", self.id, error);
                return Err(SourceError::Parse {
                    source_id: self.id.clone(),
                    error,
                });
            }
        };

        let reading = Reading::new(value, now, self.ttl, self.id.clone());
        trace!("Source {} returns rate {:.7}", self.id, value);
        self.last_reading = Some(reading.clone());

        Ok(reading)
    }
}

impl std::fmt::Debug for FeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSource")
            .field("id", &self.id)
            .field("kind", &self.extractor.kind())
            .field("ttl", &self.ttl)
            .field("last_reading", &self.last_reading)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::mock::{self, Script};
    use chrono::TimeZone;
    use rates_core::{
        ExtractError, ExtractorOptions, SourceErrorKind, DEFAULT_TTL_SECONDS, MAX_TTL_SECONDS,
    };

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn test_cache_hit_skips_extractor() {
        let script = Script::returning("$100.00");
        let mut source = FeedSource::new("a", script.extractor(), 30);

        let first = source.sample(t0()).await.unwrap();
        assert_eq!(first.value, 100.0);
        assert_eq!(first.valid_until, t0() + Duration::seconds(30));
        assert_eq!(first.source_id, "a");

        script.set(Ok("200".into()));
        let cached = source.sample(t0() + Duration::seconds(29)).await.unwrap();
        assert_eq!(cached, first);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_at_expiry() {
        let script = Script::returning("100");
        let mut source = FeedSource::new("a", script.extractor(), 30);
        source.sample(t0()).await.unwrap();

        script.set(Ok("105.5".into()));
        let refreshed = source.sample(t0() + Duration::seconds(30)).await.unwrap();

        assert_eq!(refreshed.value, 105.5);
        assert_eq!(refreshed.valid_until, t0() + Duration::seconds(60));
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_clears_cache() {
        let script = Script::returning("100");
        let mut source = FeedSource::new("a", script.extractor(), 10);
        source.sample(t0()).await.unwrap();

        script.set(Err(ExtractError::Transport("timeout".into())));
        let err = source.sample(t0() + Duration::seconds(10)).await.unwrap_err();

        assert_eq!(err.kind(), SourceErrorKind::Extract);
        assert!(source.last_reading().is_none());

        script.set(Ok("101".into()));
        let recovered = source.sample(t0() + Duration::seconds(11)).await.unwrap();
        assert_eq!(recovered.value, 101.0);
    }

    #[tokio::test]
    async fn test_parse_failure_clears_cache() {
        let script = Script::returning("100");
        let mut source = FeedSource::new("a", script.extractor(), 5);
        source.sample(t0()).await.unwrap();

        script.set(Ok("n/a".into()));
        let err = source.sample(t0() + Duration::seconds(5)).await.unwrap_err();

        assert_eq!(err.kind(), SourceErrorKind::Parse);
        assert!(matches!(err, SourceError::Parse { .. }));
        assert!(source.last_reading().is_none());
    }

    #[tokio::test]
    async fn test_payload_error_counts_as_parse() {
        let script = Script::failing(ExtractError::Payload("no value at bpi/USD".into()));
        let mut source = FeedSource::new("a", script.extractor(), 5);

        let err = source.sample(t0()).await.unwrap_err();
        assert_eq!(err.kind(), SourceErrorKind::Parse);
        assert_eq!(err.source_id(), "a");
    }

    #[test]
    fn test_ttl_defaults() {
        let script = Script::returning("1");
        assert_eq!(
            FeedSource::new("a", script.extractor(), 0).ttl(),
            Duration::seconds(DEFAULT_TTL_SECONDS)
        );
        assert_eq!(
            FeedSource::new("a", script.extractor(), -1).ttl(),
            Duration::seconds(DEFAULT_TTL_SECONDS)
        );
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_capped() {
        let script = Script::returning("42");
        let mut source = FeedSource::new("a", script.extractor(), i64::MAX);
        assert_eq!(source.ttl(), Duration::seconds(MAX_TTL_SECONDS));

        let reading = source.sample(t0()).await.unwrap();
        assert_eq!(reading.valid_until, t0() + Duration::seconds(MAX_TTL_SECONDS));

        let cached = source.sample(t0() + Duration::days(300)).await.unwrap();
        assert_eq!(cached, reading);
        assert_eq!(script.calls(), 1);
    }

    #[test]
    fn test_from_descriptor_rejects_oversized_ttl() {
        let registry = mock::registry(vec![("mock://a", Script::returning("1"))]);
        let descriptor = FeedDescriptor {
            title: "a".into(),
            url: "mock://a".into(),
            extractor: "scripted".into(),
            options: ExtractorOptions::default(),
            ttl_seconds: i64::MAX,
        };

        assert!(matches!(
            FeedSource::from_descriptor(&descriptor, &registry),
            Err(ConfigError::TtlOutOfRange { ttl_seconds: i64::MAX, .. })
        ));
    }

    #[test]
    fn test_from_descriptor() {
        let registry = mock::registry(vec![("mock://a", Script::returning("1"))]);
        let mut descriptor = FeedDescriptor {
            title: "a".into(),
            url: "mock://a".into(),
            extractor: "scripted".into(),
            options: ExtractorOptions::default(),
            ttl_seconds: 12,
        };

        let source = FeedSource::from_descriptor(&descriptor, &registry).unwrap();
        assert_eq!(source.id(), "a");
        assert_eq!(source.ttl(), Duration::seconds(12));

        descriptor.extractor = "json".into();
        assert_eq!(
            FeedSource::from_descriptor(&descriptor, &registry).err().map(|e| e.to_string()),
            Some(ConfigError::UnknownExtractor("json".into()).to_string())
        );

        descriptor.extractor = "scripted".into();
        descriptor.title.clear();
        assert!(matches!(
            FeedSource::from_descriptor(&descriptor, &registry),
            Err(ConfigError::MissingField("title"))
        ));
    }
}

//! Source extractors and the registry that builds them by kind

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use rates_core::{ConfigError, ConfigResult, ExtractError, ExtractResult, ExtractorOptions};

/// Upper bound on a single HTTP fetch
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches raw rate text from one external source
#[async_trait]
pub trait Extractor: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Fetch and return the raw text of the current rate
    async fn fetch(&self) -> ExtractResult<String>;
}

/// Builds an extractor from a feed url and its options
pub type ExtractorFactory =
    Box<dyn Fn(&str, &ExtractorOptions) -> ConfigResult<Box<dyn Extractor>> + Send + Sync>;

/// Maps an extractor kind tag to its constructor
pub struct ExtractorRegistry {
    factories: HashMap<String, ExtractorFactory>,
}

impl ExtractorRegistry {
    /// Registry with no kinds registered
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in extractor kind
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(JsonExtractor::KIND, build_json);
        registry
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&str, &ExtractorOptions) -> ConfigResult<Box<dyn Extractor>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn build(
        &self,
        kind: &str,
        url: &str,
        options: &ExtractorOptions,
    ) -> ConfigResult<Box<dyn Extractor>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| ConfigError::UnknownExtractor(kind.to_string()))?;

        factory(url, options)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

fn build_json(url: &str, options: &ExtractorOptions) -> ConfigResult<Box<dyn Extractor>> {
    Ok(Box::new(JsonExtractor::new(url, options)?))
}

/// HTTP JSON extractor
///
/// `opt1` holds a slash-separated path to the rate inside the JSON document,
/// e.g. `bpi/USD/rate`. Numeric segments index into arrays.
pub struct JsonExtractor {
    url: reqwest::Url,
    data_path: Vec<String>,
    client: reqwest::Client,
}

impl JsonExtractor {
    pub const KIND: &'static str = "json";

    pub fn new(url: &str, options: &ExtractorOptions) -> ConfigResult<Self> {
        if url.is_empty() {
            return Err(ConfigError::MissingField("url"));
        }

        let parsed = reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let data_path: Vec<String> = options
            .opt1
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        if data_path.is_empty() {
            return Err(ConfigError::MissingField("options.opt1 (data path)"));
        }

        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            url: parsed,
            data_path,
            client,
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn data_path(&self) -> &[String] {
        &self.data_path
    }
}

#[async_trait]
impl Extractor for JsonExtractor {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    async fn fetch(&self) -> ExtractResult<String> {
        debug!("Fetching {}", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExtractError::Transport(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| ExtractError::Transport(e.to_string()))?;

        let document: Value = serde_json::from_str(&body)
            .map_err(|e| ExtractError::Payload(format!("invalid JSON: {}", e)))?;

        extract_path(&document, &self.data_path)
    }
}

/// Walk `path` through `document` and render the scalar found at its end
pub fn extract_path(document: &Value, path: &[String]) -> ExtractResult<String> {
    let mut node = document;

    for (depth, key) in path.iter().enumerate() {
        let next = match node {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => {
                return Err(ExtractError::Payload(format!(
                    "path {} is not deep enough, {} is a single value",
                    path.join("/"),
                    path[..depth].join("/")
                )))
            }
        };

        node = next.ok_or_else(|| {
            ExtractError::Payload(format!("no value at {}", path[..=depth].join("/")))
        })?;
    }

    match node {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(render_number(number)),
        Value::Array(_) | Value::Object(_) => Err(ExtractError::Payload(format!(
            "value at {} is a collection, not a single value",
            path.join("/")
        ))),
        Value::Bool(_) | Value::Null => Err(ExtractError::Payload(format!(
            "value at {} is not a number or string",
            path.join("/")
        ))),
    }
}

/// Plain decimal text for a JSON number.
///
/// serde_json prints small and large floats in exponent form (`1.2e-7`), which
/// the digit filter in `parse_rate` would misread.
fn render_number(number: &serde_json::Number) -> String {
    if let Some(v) = number.as_u64() {
        return v.to_string();
    }
    if let Some(v) = number.as_i64() {
        return v.to_string();
    }
    // f64 Display never uses exponent notation
    number.as_f64().map(|v| v.to_string()).unwrap_or_else(|| number.to_string())
}

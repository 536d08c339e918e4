//! Error types

use thiserror::Error;

/// Numeric extraction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("No numeric characters in {0:?}")]
    Empty(String),

    #[error("Invalid number {cleaned:?} extracted from {raw:?}")]
    Invalid { raw: String, cleaned: String },
}

/// Extractor errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The source could not be reached or answered with a failure status
    #[error("Transport error: {0}")]
    Transport(String),

    /// The payload arrived but did not have the expected shape
    #[error("Unexpected payload: {0}")]
    Payload(String),
}

/// Feed construction and settings errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Required field not provided: {0}")]
    MissingField(&'static str),

    #[error("Extractor kind not found: {0}")]
    UnknownExtractor(String),

    #[error("Invalid feed url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("TTL of {ttl_seconds}s exceeds the maximum of {max_seconds}s")]
    TtlOutOfRange { ttl_seconds: i64, max_seconds: i64 },

    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("Failed to load settings: {0}")]
    Load(String),
}

/// Which side of the taxonomy a sample failure falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Extract,
    Parse,
}

/// A failed sample of one feed source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Source {source_id}: {error}")]
    Extract {
        source_id: String,
        #[source]
        error: ExtractError,
    },

    #[error("Source {source_id}: {error}")]
    Parse {
        source_id: String,
        #[source]
        error: ParseError,
    },
}

impl SourceError {
    pub fn kind(&self) -> SourceErrorKind {
        match self {
            SourceError::Extract { error: ExtractError::Transport(_), .. } => SourceErrorKind::Extract,
            SourceError::Extract { error: ExtractError::Payload(_), .. } => SourceErrorKind::Parse,
            SourceError::Parse { .. } => SourceErrorKind::Parse,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            SourceError::Extract { source_id, .. } | SourceError::Parse { source_id, .. } => source_id,
        }
    }
}

/// Result type alias
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ExtractResult<T> = Result<T, ExtractError>;
pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_kind() {
        let transport = SourceError::Extract {
            source_id: "a".into(),
            error: ExtractError::Transport("connection refused".into()),
        };
        let payload = SourceError::Extract {
            source_id: "a".into(),
            error: ExtractError::Payload("missing key".into()),
        };
        let parse = SourceError::Parse {
            source_id: "b".into(),
            error: ParseError::Empty("n/a".into()),
        };

        assert_eq!(transport.kind(), SourceErrorKind::Extract);
        assert_eq!(payload.kind(), SourceErrorKind::Parse);
        assert_eq!(parse.kind(), SourceErrorKind::Parse);
        assert_eq!(parse.source_id(), "b");
    }
}

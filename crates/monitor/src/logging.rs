//! Log sink selection

use anyhow::Context;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Where log events go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    File(PathBuf),
    Disabled,
}

impl LogSink {
    /// "stdout", a file path, or empty for no logging
    pub fn from_setting(value: &str) -> Self {
        match value.trim() {
            "" => LogSink::Disabled,
            "stdout" => LogSink::Stdout,
            path => LogSink::File(PathBuf::from(path)),
        }
    }
}

/// Install the global subscriber for `sink`
pub fn init(sink: &LogSink) -> anyhow::Result<()> {
    let (writer, ansi) = match sink {
        LogSink::Disabled => return Ok(()),
        LogSink::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
        LogSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("error opening log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_from_setting() {
        assert_eq!(LogSink::from_setting(""), LogSink::Disabled);
        assert_eq!(LogSink::from_setting("stdout"), LogSink::Stdout);
        assert_eq!(
            LogSink::from_setting("/var/log/rates.log"),
            LogSink::File(PathBuf::from("/var/log/rates.log"))
        );
    }

    #[test]
    fn test_disabled_sink_installs_nothing() {
        assert!(init(&LogSink::Disabled).is_ok());
    }
}

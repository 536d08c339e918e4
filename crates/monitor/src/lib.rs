//! Rates monitor
//!
//! Runs one rate pool per quoted instrument and renders their averages

pub mod logging;
pub mod session;
pub mod settings;

pub use logging::LogSink;
pub use session::{InstrumentSession, StatusLine};

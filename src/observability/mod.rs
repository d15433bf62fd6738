//! Structured logging
//!
//! Logging is read-only with respect to query execution: nothing here can
//! fail a read or a write.

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Logs an event at INFO, or FATAL for fatal events
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

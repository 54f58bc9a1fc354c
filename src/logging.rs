//! Logging capabilities handed to resolvers and web actions.
//!
//! The library only emits [`tracing`] records; [`init_tracing`] is for the
//! binary (and anything else that owns the process) to install a subscriber.

use std::sync::Mutex;

use serde_json::Value;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Structured event sink for resolvers: an event name plus optional JSON meta.
pub trait EventLogger: Send + Sync {
    fn log(&self, event: &str, meta: Option<Value>);
    fn error(&self, event: &str, meta: Option<Value>);
}

/// Forwards events to `tracing` under the `mesh` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLogger;

impl EventLogger for TracingEventLogger {
    fn log(&self, event: &str, meta: Option<Value>) {
        match meta {
            Some(meta) => tracing::info!(target: "mesh", event, %meta),
            None => tracing::info!(target: "mesh", event),
        }
    }

    fn error(&self, event: &str, meta: Option<Value>) {
        match meta {
            Some(meta) => tracing::error!(target: "mesh", event, %meta),
            None => tracing::error!(target: "mesh", event),
        }
    }
}

/// Severity recorded by [`RecordingLogger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Log,
    Error,
}

/// One captured event.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub level: EventLevel,
    pub event: String,
    pub meta: Option<Value>,
}

/// Keeps every event in memory, for assertions.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<LoggedEvent>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LoggedEvent> {
        self.lock().clone()
    }

    /// Names of all events, in order.
    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.event.clone()).collect()
    }

    pub fn errors(&self) -> Vec<LoggedEvent> {
        self.lock()
            .iter()
            .filter(|e| e.level == EventLevel::Error)
            .cloned()
            .collect()
    }

    fn push(&self, level: EventLevel, event: &str, meta: Option<Value>) {
        self.lock().push(LoggedEvent {
            level,
            event: event.to_owned(),
            meta,
        });
    }

    // A panic while holding the lock only poisons test bookkeeping.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LoggedEvent>> {
        self.events.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl EventLogger for RecordingLogger {
    fn log(&self, event: &str, meta: Option<Value>) {
        self.push(EventLevel::Log, event, meta);
    }

    fn error(&self, event: &str, meta: Option<Value>) {
        self.push(EventLevel::Error, event, meta);
    }
}

/// Named, level-filtered logger for a single web action invocation.
///
/// The level comes from the action's `LOG_LEVEL` parameter; records below it
/// are dropped before they reach `tracing`.
#[derive(Debug, Clone)]
pub struct ActionLogger {
    name: String,
    level: Level,
}

impl ActionLogger {
    /// `level` is parsed leniently; anything unrecognised falls back to `info`.
    pub fn new(name: impl Into<String>, level: Option<&str>) -> Self {
        let level = level
            .and_then(|l| l.trim().parse::<Level>().ok())
            .unwrap_or(Level::INFO);
        Self {
            name: name.into(),
            level,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// `true` when records at `level` pass this logger's filter.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    pub fn debug(&self, message: &str) {
        if self.enabled(Level::DEBUG) {
            tracing::debug!(action = %self.name, "{message}");
        }
    }

    pub fn info(&self, message: &str) {
        if self.enabled(Level::INFO) {
            tracing::info!(action = %self.name, "{message}");
        }
    }

    pub fn error(&self, message: &str) {
        tracing::error!(action = %self.name, "{message}");
    }
}

/// Installs a global `fmt` subscriber. `RUST_LOG` wins over `default_level`.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

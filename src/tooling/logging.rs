use std::cell::RefCell;
use std::io::{stderr, stdout, Write};
use std::sync::{Arc, OnceLock, RwLock};

use humantime::format_rfc3339;
use serde_json::{Map, Value};

const LOG_LEVEL_ENV: &str = "SCENE_INSPECTOR_LOG";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }

    pub fn parse(text: &str) -> Option<Level> {
        match text.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "fatal" => Some(Level::Fatal),
            _ => None,
        }
    }
}

/// Destination for structured log entries.
pub trait LogSink: Send + Sync {
    fn write(&self, entry: &Map<String, Value>);
}

impl<F> LogSink for F
where
    F: Fn(&Map<String, Value>) + Send + Sync,
{
    fn write(&self, entry: &Map<String, Value>) {
        (self)(entry)
    }
}

fn global_sink() -> &'static RwLock<Option<Arc<dyn LogSink>>> {
    static SINK: OnceLock<RwLock<Option<Arc<dyn LogSink>>>> = OnceLock::new();
    SINK.get_or_init(|| RwLock::new(None))
}

thread_local! {
    static THREAD_SINK: RefCell<Option<Arc<dyn LogSink>>> = const { RefCell::new(None) };
    static TAG_STACK: RefCell<Vec<Map<String, Value>>> = const { RefCell::new(Vec::new()) };
}

/// Replaces the process-wide sink, returning the previous one.
pub fn set_log_sink(sink: Option<Arc<dyn LogSink>>) -> Option<Arc<dyn LogSink>> {
    let mut guard = global_sink().write().expect("log sink poisoned");
    std::mem::replace(&mut *guard, sink)
}

/// Routes this thread's entries to `sink` until the guard is dropped.
pub fn scoped_sink(sink: Arc<dyn LogSink>) -> SinkGuard {
    let previous = THREAD_SINK.with(|slot| slot.borrow_mut().replace(sink));
    SinkGuard { previous }
}

pub struct SinkGuard {
    previous: Option<Arc<dyn LogSink>>,
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        THREAD_SINK.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Tags merged into every entry logged on this thread while the scope lives.
pub struct LogScope {
    pushed: bool,
}

impl LogScope {
    pub fn enter(tags: Value) -> LogScope {
        let tags = stable_tags(Some(tags));
        if tags.is_empty() {
            return LogScope { pushed: false };
        }
        TAG_STACK.with(|stack| stack.borrow_mut().push(tags));
        LogScope { pushed: true }
    }
}

impl Drop for LogScope {
    fn drop(&mut self) {
        if self.pushed {
            TAG_STACK.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
    }
}

fn current_timestamp() -> String {
    let now = std::time::SystemTime::now();
    format_rfc3339(now).to_string()
}

fn stable_tags(value: Option<Value>) -> Map<String, Value> {
    let mut out = Map::new();
    if let Some(Value::Object(obj)) = value {
        for (key, val) in obj {
            match val {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                    out.insert(key, val);
                }
                _ => {}
            }
        }
    }
    out
}

fn scope_tags() -> Map<String, Value> {
    let mut merged = Map::new();
    TAG_STACK.with(|stack| {
        for map in stack.borrow().iter() {
            for (k, v) in map {
                merged.insert(k.clone(), v.clone());
            }
        }
    });
    merged
}

fn minimum_level() -> Level {
    static MINIMUM: OnceLock<Level> = OnceLock::new();
    *MINIMUM.get_or_init(|| {
        std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|value| Level::parse(&value))
            .unwrap_or(Level::Warn)
    })
}

fn write_fallback(level: Level, entry: &Map<String, Value>) {
    if level < minimum_level() {
        return;
    }
    if let Ok(serialized) = serde_json::to_string(entry) {
        if matches!(level, Level::Error | Level::Fatal) {
            let _ = writeln!(stderr(), "{}", serialized);
        } else {
            let _ = writeln!(stdout(), "{}", serialized);
        }
    }
}

/// Builds and routes one entry. The entry is returned so callers can attach it
/// to reports.
pub fn log(
    level: Level,
    message: &str,
    data: Option<Value>,
    tags: Option<Value>,
) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert("level".to_string(), Value::String(level.as_str().to_string()));
    entry.insert("message".to_string(), Value::String(message.to_string()));

    if let Some(data) = data {
        if matches!(data, Value::Object(_)) {
            entry.insert("data".to_string(), data);
        }
    }

    let mut merged = scope_tags();
    for (k, v) in stable_tags(tags) {
        merged.insert(k, v);
    }
    if !merged.is_empty() {
        entry.insert("tags".to_string(), Value::Object(merged));
    }
    entry.insert("timestamp".to_string(), Value::String(current_timestamp()));

    let thread_sink = THREAD_SINK.with(|slot| slot.borrow().clone());
    if let Some(sink) = thread_sink {
        sink.write(&entry);
        return entry;
    }
    let global = global_sink().read().expect("log sink poisoned").clone();
    match global {
        Some(sink) => sink.write(&entry),
        None => write_fallback(level, &entry),
    }
    entry
}

pub fn log_trace(message: &str, data: Option<Value>, tags: Option<Value>) {
    log(Level::Trace, message, data, tags);
}

pub fn log_debug(message: &str, data: Option<Value>, tags: Option<Value>) {
    log(Level::Debug, message, data, tags);
}

pub fn log_info(message: &str, data: Option<Value>, tags: Option<Value>) {
    log(Level::Info, message, data, tags);
}

pub fn log_warn(message: &str, data: Option<Value>, tags: Option<Value>) {
    log(Level::Warn, message, data, tags);
}

pub fn log_error(message: &str, data: Option<Value>, tags: Option<Value>) {
    log(Level::Error, message, data, tags);
}

//! JSON-lines `log` backend tagged with the run id and config fingerprint.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use log::kv::{self, Key, Source, VisitSource};
use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;
use stream_config_errors::{ErrorCode, StreamConfigError};
use uuid::Uuid;

use crate::policy::StreamConfigPolicy;

const ERRORS_TARGET: &str = "event_stream_config::errors";

thread_local! {
    static ACTIVE_ERROR_CODE: Cell<Option<ErrorCode>> = const { Cell::new(None) };
}

// Holds `None` when another `log` backend was already installed.
static INSTALLED: OnceCell<Option<&'static JsonLinesLogger>> = OnceCell::new();

fn installed() -> Option<&'static JsonLinesLogger> {
    INSTALLED.get().copied().flatten()
}

/// Install the JSON-lines logger as the process-wide `log` backend.
///
/// Meant for binaries and tests; the library never calls it. `RUST_LOG`
/// replaces `default_filter` when it parses. Only the first call has an
/// effect, and it does nothing if another backend is already installed.
pub fn init_logging_with_default(default_filter: &str) {
    INSTALLED.get_or_init(|| {
        let fallback = Directives::parse(default_filter, LevelFilter::Warn)
            .unwrap_or_else(|| Directives::global(LevelFilter::Warn));
        let active = std::env::var("RUST_LOG")
            .ok()
            .and_then(|value| Directives::parse(&value, fallback.global))
            .unwrap_or_else(|| fallback.clone());
        let max_level = active.max_level();

        let logger: &'static JsonLinesLogger =
            Box::leak(Box::new(JsonLinesLogger::new(fallback, active)));
        match log::set_logger(logger) {
            Ok(()) => {
                log::set_max_level(max_level);
                Some(logger)
            }
            Err(_) => None,
        }
    });
}

pub(crate) fn apply_logger_policy(policy: &StreamConfigPolicy) {
    if let Some(logger) = installed() {
        logger.reconfigure(policy);
    }
}

/// Run `op` with every record it logs on this thread tagged with `code`.
pub fn with_error_code<F, R>(code: ErrorCode, op: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = ACTIVE_ERROR_CODE.with(|cell| cell.replace(Some(code)));
    let result = op();
    ACTIVE_ERROR_CODE.with(|cell| cell.set(previous));
    result
}

/// Attach the fingerprint of the loaded configuration to subsequent records.
pub fn set_config_fingerprint(fingerprint: Option<String>) {
    if let Some(logger) = installed() {
        *write_lock(&logger.fingerprint) = fingerprint;
    }
}

pub fn log_stream_config_error(label: &str, err: &StreamConfigError) {
    with_error_code(err.code, || {
        log::error!(target: ERRORS_TARGET, "{}: {}", label, err);
    });
}

/// Run id and current fingerprint, when the crate logger is installed.
pub(crate) fn run_context() -> Option<(&'static str, Option<String>)> {
    installed().map(|logger| {
        (
            logger.run_id.as_str(),
            read_lock(&logger.fingerprint).clone(),
        )
    })
}

struct JsonLinesLogger {
    run_id: String,
    fingerprint: RwLock<Option<String>>,
    fallback: Directives,
    directives: RwLock<Directives>,
    log_file: Mutex<Option<File>>,
}

impl JsonLinesLogger {
    fn new(fallback: Directives, active: Directives) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            fingerprint: RwLock::new(None),
            fallback,
            directives: RwLock::new(active),
            log_file: Mutex::new(None),
        }
    }

    fn reconfigure(&self, policy: &StreamConfigPolicy) {
        let directives = match policy.log_level.as_deref().map(str::trim) {
            None | Some("") => self.fallback.clone(),
            Some(value) => Directives::parse(value, self.fallback.global).unwrap_or_else(|| {
                with_error_code(ErrorCode::InvalidPolicyValue, || {
                    log::warn!("ignoring invalid log level filter '{}'", value);
                });
                self.fallback.clone()
            }),
        };
        log::set_max_level(directives.max_level());
        *write_lock(&self.directives) = directives;

        let file = policy.log_file.as_deref().and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Some(file),
                Err(err) => {
                    with_error_code(ErrorCode::Io, || {
                        log::warn!(
                            "cannot open log file '{}', logging to stderr: {}",
                            path.display(),
                            err
                        );
                    });
                    None
                }
            }
        });
        *lock(&self.log_file) = file;
    }
}

impl Log for JsonLinesLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        read_lock(&self.directives).level_for(metadata.target()) >= metadata.level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut fields = FieldCollector::default();
        let _ = record.key_values().visit(&mut fields);
        let fingerprint = read_lock(&self.fingerprint).clone();

        let line = JsonLine {
            ts_millis: unix_millis(),
            level: record.level().as_str(),
            target: record.target(),
            run_id: &self.run_id,
            config_fingerprint: fingerprint.as_deref(),
            message: record.args().to_string(),
            error_code: ACTIVE_ERROR_CODE.with(Cell::get).map(ErrorCode::as_str),
            fields: fields.0,
        };
        let Ok(mut bytes) = serde_json::to_vec(&line) else {
            return;
        };
        bytes.push(b'\n');

        let mut file = lock(&self.log_file);
        let written = match file.as_mut() {
            Some(file) => file.write_all(&bytes),
            None => io::stderr().lock().write_all(&bytes),
        };
        if written.is_err() && file.is_some() {
            let _ = io::stderr().lock().write_all(&bytes);
        }
    }

    fn flush(&self) {
        if let Some(file) = lock(&self.log_file).as_mut() {
            let _ = file.flush();
        }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    ts_millis: u64,
    level: &'a str,
    target: &'a str,
    run_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_fingerprint: Option<&'a str>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    fields: BTreeMap<String, Value>,
}

/// Key-values attached to a record; booleans and integers keep their type.
#[derive(Default)]
struct FieldCollector(BTreeMap<String, Value>);

impl<'kvs> VisitSource<'kvs> for FieldCollector {
    fn visit_pair(&mut self, key: Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        let json = if let Some(flag) = value.to_bool() {
            Value::Bool(flag)
        } else if let Some(number) = value.to_i64() {
            Value::from(number)
        } else {
            Value::String(value.to_string())
        };
        self.0.insert(key.as_str().to_string(), json);
        Ok(())
    }
}

/// `RUST_LOG`-style level directives: a global level plus per-target levels.
#[derive(Clone, Debug)]
struct Directives {
    global: LevelFilter,
    targets: Vec<(String, LevelFilter)>,
}

impl Directives {
    fn global(level: LevelFilter) -> Self {
        Self {
            global: level,
            targets: Vec::new(),
        }
    }

    /// `None` when any level is unknown. A bare level replaces `global`.
    fn parse(value: &str, global: LevelFilter) -> Option<Self> {
        let mut directives = Self::global(global);
        for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            match part.split_once('=') {
                Some((target, level)) => {
                    let level = LevelFilter::from_str(level.trim()).ok()?;
                    directives.targets.push((target.trim().to_string(), level));
                }
                None => directives.global = LevelFilter::from_str(part).ok()?,
            }
        }
        Some(directives)
    }

    /// Level of the longest target prefix covering `target`.
    fn level_for(&self, target: &str) -> LevelFilter {
        self.targets
            .iter()
            .filter(|(prefix, _)| covers(prefix, target))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.global, |(_, level)| *level)
    }

    fn max_level(&self) -> LevelFilter {
        self.targets
            .iter()
            .map(|(_, level)| *level)
            .fold(self.global, <LevelFilter as Ord>::max)
    }
}

fn covers(prefix: &str, target: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() * 1_000 + u64::from(elapsed.subsec_millis()))
        .unwrap_or_default()
}

// A panic while logging must not disable the logger.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_target_prefix_wins() {
        let directives = Directives::parse(
            "warn,event_stream_config=info,event_stream_config::stream_config::registry=debug",
            LevelFilter::Error,
        )
        .expect("valid directives");
        assert_eq!(directives.level_for("other_crate"), LevelFilter::Warn);
        assert_eq!(
            directives.level_for("event_stream_config::loader"),
            LevelFilter::Info
        );
        assert_eq!(
            directives.level_for("event_stream_config::stream_config::registry"),
            LevelFilter::Debug
        );
        assert_eq!(directives.level_for("event_stream_configs"), LevelFilter::Warn);
        assert_eq!(directives.max_level(), LevelFilter::Debug);
    }

    #[test]
    fn target_only_directives_keep_given_global() {
        let directives = Directives::parse("event_stream_config=trace", LevelFilter::Error)
            .expect("valid directives");
        assert_eq!(directives.level_for("other_crate"), LevelFilter::Error);
        assert_eq!(directives.max_level(), LevelFilter::Trace);
    }

    #[test]
    fn unknown_levels_are_rejected() {
        assert!(Directives::parse("loud", LevelFilter::Warn).is_none());
        assert!(Directives::parse("a=loud", LevelFilter::Warn).is_none());
    }

    #[test]
    fn error_code_tag_is_scoped_and_nests() {
        with_error_code(ErrorCode::Io, || {
            with_error_code(ErrorCode::ConfigParse, || {
                assert_eq!(
                    ACTIVE_ERROR_CODE.with(Cell::get),
                    Some(ErrorCode::ConfigParse)
                );
            });
            assert_eq!(ACTIVE_ERROR_CODE.with(Cell::get), Some(ErrorCode::Io));
        });
        assert_eq!(ACTIVE_ERROR_CODE.with(Cell::get), None);
    }
}

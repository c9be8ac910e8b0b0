//! Policy data structures and in-memory management.

use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

static POLICY: OnceCell<RwLock<StreamConfigPolicy>> = OnceCell::new();

fn policy_cell() -> &'static RwLock<StreamConfigPolicy> {
    POLICY.get_or_init(|| RwLock::new(StreamConfigPolicy::default()))
}

fn read_policy() -> RwLockReadGuard<'static, StreamConfigPolicy> {
    policy_cell()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_policy() -> RwLockWriteGuard<'static, StreamConfigPolicy> {
    policy_cell()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-wide runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamConfigPolicy {
    /// Log filter spec (`info`, `event_stream_config=debug`, ...).
    pub log_level: Option<String>,
    /// File receiving log records instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Mirror fatal configuration errors to stderr as JSON lines.
    pub json_errors: bool,
    /// Configuration files loaded by the bootstrap, in override order.
    pub config_paths: Vec<PathBuf>,
}

impl StreamConfigPolicy {
    pub(crate) fn apply_update(&mut self, update: PolicyUpdate) {
        if let Some(level) = update.log_level {
            self.log_level = match level.trim() {
                "" => None,
                other => Some(other.to_string()),
            };
        }
        if let Some(path) = update.log_file {
            self.log_file = match path {
                PolicyPath::Clear => None,
                PolicyPath::Value(pb) => Some(pb),
            };
        }
        if let Some(json_errors) = update.json_errors {
            self.json_errors = json_errors;
        }
        if let Some(paths) = update.config_paths {
            self.config_paths = paths;
        }
    }
}

/// Path update: clear the setting or replace it.
#[derive(Debug, Clone)]
pub enum PolicyPath {
    Clear,
    Value(PathBuf),
}

/// Mutation record for the policy; `None` fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct PolicyUpdate {
    pub log_level: Option<String>,
    pub log_file: Option<PolicyPath>,
    pub json_errors: Option<bool>,
    pub config_paths: Option<Vec<PathBuf>>,
}

/// Snapshot the current policy.
pub fn policy_snapshot() -> StreamConfigPolicy {
    read_policy().clone()
}

/// Apply `update` to the global policy and propagate logging changes.
pub fn configure_policy(update: PolicyUpdate) {
    let mut guard = write_policy();
    guard.apply_update(update);
    crate::logging::apply_policy(&guard);
}

#[cfg(test)]
pub(crate) fn reset_policy_for_tests() {
    let mut guard = write_policy();
    *guard = StreamConfigPolicy::default();
    crate::logging::apply_policy(&guard);
}

/// Serializes tests touching the global policy or process environment.
#[cfg(test)]
pub(crate) fn policy_test_guard() -> std::sync::MutexGuard<'static, ()> {
    static GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());
    GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

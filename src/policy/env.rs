//! Environment variable parsing for policy overrides.

use crate::policy::model::{configure_policy, PolicyPath, PolicyUpdate};
use std::env;
use stream_config_errors::{usage, ErrorCode, StreamConfigResult};

/// Environment variable controlling the log filter.
pub const ENV_LOG_LEVEL: &str = "EVENT_STREAM_CONFIG_LOG_LEVEL";
/// Environment variable pointing to a log destination file.
pub const ENV_LOG_FILE: &str = "EVENT_STREAM_CONFIG_LOG_FILE";
/// Environment variable enabling JSON error trailers on stderr.
pub const ENV_JSON_ERRORS: &str = "EVENT_STREAM_CONFIG_JSON_ERRORS";
/// Environment variable listing configuration files (platform path separator).
pub const ENV_CONFIG_PATHS: &str = "EVENT_STREAM_CONFIG_PATHS";

/// Load policy overrides from environment variables.
///
/// Nothing is applied when any variable holds an invalid value.
pub fn configure_policy_from_env() -> StreamConfigResult<()> {
    let mut update = PolicyUpdate::default();

    if let Ok(value) = env::var(ENV_LOG_LEVEL) {
        update.log_level = Some(value);
    }

    if let Ok(value) = env::var(ENV_LOG_FILE) {
        let path = if value.trim().is_empty() {
            PolicyPath::Clear
        } else {
            PolicyPath::Value(value.into())
        };
        update.log_file = Some(path);
    }

    if let Ok(value) = env::var(ENV_JSON_ERRORS) {
        update.json_errors = Some(parse_bool(&value)?);
    }

    if let Some(value) = env::var_os(ENV_CONFIG_PATHS) {
        let paths = env::split_paths(&value)
            .filter(|path| !path.as_os_str().is_empty())
            .collect();
        update.config_paths = Some(paths);
    }

    configure_policy(update);
    Ok(())
}

fn parse_bool(value: &str) -> StreamConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Ok(true),
        "0" | "false" | "f" | "no" | "n" => Ok(false),
        other => Err(usage!(
            ErrorCode::InvalidPolicyValue,
            "invalid boolean value '{}' (expected true/false)",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::model::{policy_snapshot, policy_test_guard, reset_policy_for_tests};
    use std::path::PathBuf;

    #[test]
    fn configure_policy_from_env_updates_fields() {
        let _lock = policy_test_guard();
        let _guard = EnvGuard;
        reset_policy_for_tests();
        let paths = env::join_paths(["/etc/streams/base.toml", "/etc/streams/site.json"])
            .expect("joinable paths");
        env::set_var(ENV_LOG_LEVEL, "info");
        env::set_var(ENV_LOG_FILE, "/tmp/out.log");
        env::set_var(ENV_JSON_ERRORS, "yes");
        env::set_var(ENV_CONFIG_PATHS, &paths);

        configure_policy_from_env().expect("configure from env");
        let snap = policy_snapshot();
        assert_eq!(snap.log_level.as_deref(), Some("info"));
        assert_eq!(snap.log_file, Some(PathBuf::from("/tmp/out.log")));
        assert!(snap.json_errors);
        assert_eq!(
            snap.config_paths,
            vec![
                PathBuf::from("/etc/streams/base.toml"),
                PathBuf::from("/etc/streams/site.json")
            ]
        );
        reset_policy_for_tests();
    }

    #[test]
    fn invalid_boolean_leaves_policy_untouched() {
        let _lock = policy_test_guard();
        let _guard = EnvGuard;
        reset_policy_for_tests();
        env::set_var(ENV_LOG_LEVEL, "debug");
        env::set_var(ENV_JSON_ERRORS, "sometimes");

        let err = configure_policy_from_env().expect_err("invalid bool should error");
        assert_eq!(err.code, ErrorCode::InvalidPolicyValue);
        assert!(policy_snapshot().log_level.is_none());
    }

    #[test]
    fn parse_bool_accepts_aliases() {
        assert!(parse_bool(" Yes ").expect("yes"));
        assert!(!parse_bool("0").expect("zero"));
        assert!(parse_bool("sometimes").is_err());
    }

    struct EnvGuard;

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in [ENV_LOG_LEVEL, ENV_LOG_FILE, ENV_JSON_ERRORS, ENV_CONFIG_PATHS] {
                env::remove_var(key);
            }
        }
    }
}

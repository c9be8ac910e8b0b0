//! A single stream config entry: merged settings, key matching, topics.

use serde_json::Value;
use stream_config_errors::{usage, ErrorCode, StreamConfigResult};

use crate::stream_config::matching::{is_partial_match, DEFAULT_MAX_DEPTH};
use crate::stream_config::model::{
    Settings, STREAM_SETTING, TOPICS_SETTING, TOPIC_PREFIXES_SETTING,
};
use crate::stream_config::pattern::{prefix_pattern, StreamPattern};
use crate::stream_config::settings::{coerce_to_string, merge_settings};

/// Configuration of one stream name or stream pattern.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    stream: String,
    pattern: Option<StreamPattern>,
    settings: Settings,
}

impl StreamConfig {
    /// Build an entry for `stream`, merging `settings` over `default_settings`.
    ///
    /// Fails when `stream` is empty, when it starts with `/` but is not a
    /// valid pattern, or when `topics` / `topic_prefixes` are not string lists.
    pub fn new(
        stream: &str,
        settings: &Settings,
        default_settings: &Settings,
    ) -> StreamConfigResult<Self> {
        if stream.is_empty() {
            return Err(usage!(
                ErrorCode::InvalidStreamKey,
                "'{}' must be a non-empty string",
                STREAM_SETTING
            ));
        }

        let pattern = if StreamPattern::looks_like_pattern(stream) {
            let compiled = StreamPattern::parse(stream).map_err(|err| {
                usage!(
                    ErrorCode::InvalidStreamPattern,
                    "invalid regex '{}': {}",
                    stream,
                    err
                )
                .with_context("stream", stream)
            })?;
            Some(compiled)
        } else {
            None
        };

        let mut merged = merge_settings(default_settings, settings);
        merged.insert(STREAM_SETTING.to_string(), Value::String(stream.to_string()));

        for key in [TOPICS_SETTING, TOPIC_PREFIXES_SETTING] {
            string_list(&merged, key).map_err(|err| err.with_context("stream", stream))?;
        }

        Ok(StreamConfig {
            stream: stream.to_string(),
            pattern,
            settings: merged,
        })
    }

    /// Build an entry from a raw settings value that must be a mapping.
    pub fn from_value(
        stream: &str,
        settings: &Value,
        default_settings: &Settings,
    ) -> StreamConfigResult<Self> {
        match settings {
            Value::Object(map) => Self::new(stream, map, default_settings),
            Value::Null => Self::new(stream, &Settings::new(), default_settings),
            other => Err(usage!(
                ErrorCode::InvalidSettingType,
                "settings for stream '{}' must be a mapping, got {}",
                stream,
                value_kind(other)
            )),
        }
    }

    /// The stream name or pattern this entry was registered under.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn is_pattern(&self) -> bool {
        self.pattern.is_some()
    }

    /// Merged settings, including the injected `stream` key.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// True if this entry applies to the stream named `candidate`.
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.is_match(candidate),
            None => self.stream == candidate,
        }
    }

    /// Topics for `target` (defaults to this entry's own stream key).
    pub fn topics(&self, target: Option<&str>) -> Vec<String> {
        let target = target.unwrap_or(&self.stream);

        // Validated at construction, so these lookups cannot fail.
        if let Ok(Some(topics)) = string_list(&self.settings, TOPICS_SETTING) {
            return topics;
        }
        let prefixes = match string_list(&self.settings, TOPIC_PREFIXES_SETTING) {
            Ok(Some(prefixes)) => prefixes,
            _ => return vec![target.to_string()],
        };

        if self.is_pattern_key(target) {
            vec![prefix_pattern(target, &prefixes)]
        } else {
            prefixes
                .iter()
                .map(|prefix| format!("{prefix}{target}"))
                .collect()
        }
    }

    // The entry's own key was compiled at construction.
    fn is_pattern_key(&self, target: &str) -> bool {
        if target == self.stream {
            self.pattern.is_some()
        } else {
            StreamPattern::is_valid(target)
        }
    }

    /// Settings for `target`, with `topics` derived for it.
    pub fn to_settings(&self, target: Option<&str>) -> Settings {
        let mut settings = self.settings.clone();
        let topics = self
            .topics(target)
            .into_iter()
            .map(Value::String)
            .collect();
        settings.insert(TOPICS_SETTING.to_string(), Value::Array(topics));
        settings
    }

    /// True if this entry satisfies every constraint.
    ///
    /// A `stream` constraint is matched with [`StreamConfig::matches`]; the
    /// remaining constraints are partially matched against the settings.
    pub fn matches_constraints(&self, constraints: &Settings) -> bool {
        let mut remaining = constraints.clone();
        if let Some(stream) = remaining.remove(STREAM_SETTING) {
            let candidate = match &stream {
                Value::Array(_) | Value::Object(_) => return false,
                scalar => coerce_to_string(scalar),
            };
            if !self.matches(&candidate) {
                return false;
            }
        }
        is_partial_match(&self.settings, &remaining, DEFAULT_MAX_DEPTH)
    }
}

/// Read `key` as a list of strings; absent and null both yield `None`.
fn string_list(settings: &Settings, key: &str) -> StreamConfigResult<Option<Vec<String>>> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.clone()),
                other => Err(usage!(
                    ErrorCode::InvalidSettingType,
                    "'{}' entries must be strings, got {}",
                    key,
                    value_kind(other)
                )),
            })
            .collect::<StreamConfigResult<Vec<_>>>()
            .map(Some),
        Some(other) => Err(usage!(
            ErrorCode::InvalidSettingType,
            "'{}' must be a list, got {}",
            key,
            value_kind(other)
        )),
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const JOB_PATTERN: &str = r"/^mediawiki\.job\..+/";

    fn settings(value: Value) -> Settings {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn nonya_settings() -> Settings {
        settings(json!({
            "schema_title": "mediawiki/nonya",
            "sample": {"rate": 0.5},
            "destination_event_service": "eventgate-analytics"
        }))
    }

    fn job_settings(extra: Value) -> Settings {
        let mut base = settings(json!({
            "schema_title": "mediawiki/job",
            "destination_event_service": "eventgate-main"
        }));
        base.extend(settings(extra));
        base
    }

    fn entry(stream: &str, settings: Settings) -> StreamConfig {
        StreamConfig::new(stream, &settings, &Settings::new()).expect("valid stream config")
    }

    #[test]
    fn stream_returns_key_unchanged() {
        let config = entry("nonya", nonya_settings());
        assert_eq!(config.stream(), "nonya");
        assert!(!config.is_pattern());
    }

    #[test]
    fn settings_include_defaults_and_stream() {
        let defaults = settings(json!({"is_active": true, "stream": "ignored"}));
        let config = StreamConfig::new("nonya", &nonya_settings(), &defaults)
            .expect("valid stream config");
        let merged = config.settings();
        assert_eq!(merged.get("is_active"), Some(&json!(true)));
        assert_eq!(merged.get("stream"), Some(&json!("nonya")));
        assert_eq!(merged.get("sample"), Some(&json!({"rate": 0.5})));
    }

    #[test]
    fn literal_keys_match_exactly() {
        let config = entry("nonya", nonya_settings());
        assert!(config.matches("nonya"));
        assert!(!config.matches("nonyax"));
        assert!(!config.matches("xnonya"));
    }

    #[test]
    fn pattern_keys_match_by_search() {
        let config = entry(JOB_PATTERN, job_settings(json!({})));
        assert!(config.is_pattern());
        assert!(config.matches("mediawiki.job.workworkwork"));
        assert!(!config.matches(JOB_PATTERN));
    }

    #[test]
    fn rejects_empty_and_invalid_keys() {
        let err = StreamConfig::new("", &nonya_settings(), &Settings::new())
            .expect_err("empty key rejected");
        assert_eq!(err.code, ErrorCode::InvalidStreamKey);

        let err = StreamConfig::new("/nonya/BADREGEX", &nonya_settings(), &Settings::new())
            .expect_err("bad regex rejected");
        assert_eq!(err.code, ErrorCode::InvalidStreamPattern);
    }

    #[test]
    fn rejects_malformed_topic_settings() {
        let err = StreamConfig::new(
            "nonya",
            &settings(json!({"topic_prefixes": "eqiad."})),
            &Settings::new(),
        )
        .expect_err("scalar prefixes rejected");
        assert_eq!(err.code, ErrorCode::InvalidSettingType);

        let err = StreamConfig::new(
            "nonya",
            &settings(json!({"topics": ["ok", 3]})),
            &Settings::new(),
        )
        .expect_err("non-string topic rejected");
        assert_eq!(err.code, ErrorCode::InvalidSettingType);
    }

    #[test]
    fn rejects_non_mapping_settings_value() {
        let err = StreamConfig::from_value("nonya", &json!(["a"]), &Settings::new())
            .expect_err("list settings rejected");
        assert_eq!(err.code, ErrorCode::InvalidSettingType);
    }

    #[test]
    fn explicit_topics_win() {
        let mut with_topics = nonya_settings();
        with_topics.insert("topics".into(), json!(["eqiad.nonya", "codfw.nonya"]));
        with_topics.insert("topic_prefixes".into(), json!(["dc1."]));
        let config = entry("nonya", with_topics);
        assert_eq!(config.topics(None), vec!["eqiad.nonya", "codfw.nonya"]);
        assert_eq!(config.topics(Some("other")), vec!["eqiad.nonya", "codfw.nonya"]);
    }

    #[test]
    fn topics_default_to_stream_name() {
        let config = entry("nonya", nonya_settings());
        assert_eq!(config.topics(None), vec!["nonya"]);

        let pattern = entry(JOB_PATTERN, job_settings(json!({})));
        assert_eq!(pattern.topics(None), vec![JOB_PATTERN]);
        assert_eq!(
            pattern.topics(Some("mediawiki.job.workworkwork")),
            vec!["mediawiki.job.workworkwork"]
        );
    }

    #[test]
    fn null_prefixes_count_as_absent() {
        let mut with_null = nonya_settings();
        with_null.insert("topic_prefixes".into(), Value::Null);
        let defaults = settings(json!({"topic_prefixes": ["eqiad."]}));
        let config = StreamConfig::new("nonya", &with_null, &defaults).expect("valid");
        assert_eq!(config.topics(None), vec!["nonya"]);
    }

    #[test]
    fn prefixes_expand_plain_names_in_order() {
        let mut prefixed = nonya_settings();
        prefixed.insert("topic_prefixes".into(), json!(["eqiad.", "codfw."]));
        let config = entry("nonya", prefixed);
        assert_eq!(config.topics(None), vec!["eqiad.nonya", "codfw.nonya"]);

        let pattern = entry(
            JOB_PATTERN,
            job_settings(json!({"topic_prefixes": ["eqiad.", "codfw."]})),
        );
        assert_eq!(
            pattern.topics(Some("mediawiki.job.workworkwork")),
            vec![
                "eqiad.mediawiki.job.workworkwork",
                "codfw.mediawiki.job.workworkwork"
            ]
        );
    }

    #[test]
    fn prefixes_rewrite_pattern_targets() {
        let pattern = entry(
            JOB_PATTERN,
            job_settings(json!({"topic_prefixes": ["eqiad.", "codfw."]})),
        );
        let expected = vec![r"/^(eqiad\.|codfw\.)mediawiki\.job\..+/".to_string()];
        assert_eq!(pattern.topics(None), expected);
        assert_eq!(pattern.topics(Some(JOB_PATTERN)), expected);
        assert!(pattern.is_pattern_key(JOB_PATTERN));
    }

    #[test]
    fn foreign_targets_are_classified_by_their_own_syntax() {
        let mut prefixed = nonya_settings();
        prefixed.insert("topic_prefixes".into(), json!(["eqiad."]));
        let config = entry("nonya", prefixed);
        assert!(!config.is_pattern_key("nonya"));
        assert_eq!(config.topics(Some("/^other/")), vec![r"/^(eqiad\.)other/"]);
        assert_eq!(config.topics(Some("/(broken/")), vec!["eqiad./(broken/"]);
    }

    #[test]
    fn to_settings_sets_topics_and_is_repeatable() {
        let mut prefixed = nonya_settings();
        prefixed.insert("topic_prefixes".into(), json!(["eqiad.", "codfw."]));
        let config = entry("nonya", prefixed);

        let first = config.to_settings(Some("nonya"));
        let second = config.to_settings(Some("nonya"));
        assert_eq!(first, second);
        assert_eq!(first.get("topics"), Some(&json!(["eqiad.nonya", "codfw.nonya"])));
        assert_eq!(first.get("stream"), Some(&json!("nonya")));
        assert!(config.settings().get("topics").is_none());
    }

    #[test]
    fn matches_constraints_on_settings() {
        let config = entry("nonya", nonya_settings());
        assert!(config.matches_constraints(&settings(
            json!({"destination_event_service": "eventgate-analytics"})
        )));
        assert!(!config.matches_constraints(&settings(
            json!({"destination_event_service": "eventgate-main"})
        )));
    }

    #[test]
    fn matches_constraints_coerces_booleans() {
        let mut enabled = nonya_settings();
        enabled.insert("canary_events_enabled".into(), json!(true));
        let config = entry("nonya", enabled);
        assert!(config.matches_constraints(&settings(json!({"canary_events_enabled": true}))));
        assert!(config.matches_constraints(&settings(json!({"canary_events_enabled": "1"}))));

        let mut disabled = nonya_settings();
        disabled.insert("canary_events_enabled".into(), json!(false));
        let config = entry("nonya", disabled);
        assert!(config.matches_constraints(&settings(json!({"canary_events_enabled": ""}))));
        assert!(!config.matches_constraints(&settings(json!({"canary_events_enabled": "1"}))));
    }

    #[test]
    fn stream_constraint_uses_pattern_matching() {
        let config = entry(JOB_PATTERN, job_settings(json!({})));
        assert!(config.matches_constraints(&settings(json!({
            "stream": "mediawiki.job.workworkwork",
            "destination_event_service": "eventgate-main"
        }))));
        assert!(!config.matches_constraints(&settings(json!({
            "stream": "mediawiki.page-view",
            "destination_event_service": "eventgate-main"
        }))));
    }
}

//! Delimited stream patterns (`/body/flags`) and regex-aware topic prefixing.
//!
//! A stream key is treated as a pattern when it starts with `/`, has a closing
//! unescaped `/`, carries only known modifier flags after it, and its body
//! compiles with the `regex` crate.

use regex::{Regex, RegexBuilder};
use std::fmt;

/// Delimiter opening and closing a stream pattern.
pub const PATTERN_DELIMITER: char = '/';

/// Reasons a delimited pattern fails to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    MissingDelimiter,
    Unterminated,
    UnknownFlag(char),
    Compile(String),
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::MissingDelimiter => {
                write!(f, "pattern must start with '{}'", PATTERN_DELIMITER)
            }
            PatternError::Unterminated => {
                write!(f, "pattern has no closing '{}'", PATTERN_DELIMITER)
            }
            PatternError::UnknownFlag(flag) => write!(f, "unknown pattern modifier '{}'", flag),
            PatternError::Compile(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for PatternError {}

/// Compiled stream pattern.
#[derive(Debug, Clone)]
pub struct StreamPattern {
    raw: String,
    regex: Regex,
    // `$` also matches before one trailing newline unless `D` or `m` is set.
    dollar_allows_final_newline: bool,
}

impl StreamPattern {
    /// Parse and compile `raw`, e.g. `/^mediawiki\.job\..+/` or `/^Foo/i`.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let body_and_flags = raw
            .strip_prefix(PATTERN_DELIMITER)
            .ok_or(PatternError::MissingDelimiter)?;
        let end = closing_delimiter(body_and_flags).ok_or(PatternError::Unterminated)?;
        let body = &body_and_flags[..end];
        let flags = &body_and_flags[end + PATTERN_DELIMITER.len_utf8()..];

        // Unicode is the regex crate's default, so `u` is accepted without effect.
        if let Some(unknown) = flags.chars().find(|flag| !"imsxUAuD".contains(*flag)) {
            return Err(PatternError::UnknownFlag(unknown));
        }

        let extended = flags.contains('x');
        let source = match (flags.contains('A'), extended) {
            // A trailing `#` comment in extended mode must not swallow the `)`.
            (true, true) => format!("\\A(?:{body}\n)"),
            (true, false) => format!(r"\A(?:{body})"),
            (false, _) => body.to_string(),
        };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .ignore_whitespace(extended)
            .swap_greed(flags.contains('U'))
            .build()
            .map_err(|err| PatternError::Compile(err.to_string()))?;

        Ok(StreamPattern {
            raw: raw.to_string(),
            regex,
            dollar_allows_final_newline: body.contains('$')
                && !flags.contains('D')
                && !flags.contains('m'),
        })
    }

    /// True when `raw` starts with the delimiter, regardless of validity.
    pub fn looks_like_pattern(raw: &str) -> bool {
        raw.starts_with(PATTERN_DELIMITER)
    }

    /// True when `raw` is a delimited pattern that compiles.
    pub fn is_valid(raw: &str) -> bool {
        Self::looks_like_pattern(raw) && Self::parse(raw).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Unanchored search of `candidate`.
    pub fn is_match(&self, candidate: &str) -> bool {
        if self.regex.is_match(candidate) {
            return true;
        }
        self.dollar_allows_final_newline
            && candidate
                .strip_suffix('\n')
                .is_some_and(|head| self.regex.is_match(head))
    }
}

/// Insert an alternation of `prefixes` right after the opening delimiter and
/// any leading `^` of `pattern`.
///
/// `/^mediawiki\.job\..+/` with `["eqiad.", "codfw."]` becomes
/// `/^(eqiad\.|codfw\.)mediawiki\.job\..+/`.
pub fn prefix_pattern<S: AsRef<str>>(pattern: &str, prefixes: &[S]) -> String {
    let rest = pattern
        .strip_prefix(PATTERN_DELIMITER)
        .unwrap_or(pattern);
    let (anchor, rest) = match rest.strip_prefix('^') {
        Some(after) => ("^", after),
        None => ("", rest),
    };
    let alternation = prefixes
        .iter()
        .map(|prefix| escape_prefix(prefix.as_ref()))
        .collect::<Vec<_>>()
        .join("|");
    format!("{PATTERN_DELIMITER}{anchor}({alternation}){rest}")
}

fn escape_prefix(prefix: &str) -> String {
    regex::escape(prefix).replace(PATTERN_DELIMITER, r"\/")
}

/// Byte offset of the first unescaped delimiter in `body_and_flags`.
fn closing_delimiter(body_and_flags: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, ch) in body_and_flags.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            PATTERN_DELIMITER => return Some(idx),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_anchored_pattern() {
        let pattern = StreamPattern::parse(r"/^mediawiki\.job\..+/").expect("valid pattern");
        assert!(pattern.is_match("mediawiki.job.workworkwork"));
        assert!(!pattern.is_match("eqiad.mediawiki.job.workworkwork"));
        assert!(!pattern.is_match(r"/^mediawiki\.job\..+/"));
    }

    #[test]
    fn unanchored_pattern_searches_anywhere() {
        let pattern = StreamPattern::parse(r"/job/").expect("valid pattern");
        assert!(pattern.is_match("mediawiki.job.a"));
        assert!(!pattern.is_match("mediawiki.page"));
    }

    #[test]
    fn applies_modifier_flags() {
        let pattern = StreamPattern::parse(r"/^Mediawiki/i").expect("valid pattern");
        assert!(pattern.is_match("mediawiki.page-view"));

        let anchored = StreamPattern::parse(r"/job/A").expect("valid pattern");
        assert!(anchored.is_match("job.a"));
        assert!(!anchored.is_match("mediawiki.job"));
    }

    #[test]
    fn anchored_extended_pattern_allows_trailing_comment() {
        let pattern = StreamPattern::parse("/foo # stream family/xA").expect("valid pattern");
        assert!(pattern.is_match("foo.bar"));
        assert!(!pattern.is_match("xfoo"));
    }

    #[test]
    fn dollar_matches_before_final_newline_unless_dollar_end_only() {
        let pattern = StreamPattern::parse("/^foo$/").expect("valid pattern");
        assert!(pattern.is_match("foo"));
        assert!(pattern.is_match("foo\n"));
        assert!(!pattern.is_match("foo\n\n"));
        assert!(!pattern.is_match("foo\nbar"));

        let strict = StreamPattern::parse("/^foo$/D").expect("valid pattern");
        assert!(strict.is_match("foo"));
        assert!(!strict.is_match("foo\n"));

        let no_dollar = StreamPattern::parse("/^foo/").expect("valid pattern");
        assert!(no_dollar.is_match("foo\n"));
    }

    #[test]
    fn rejects_invalid_patterns() {
        assert_eq!(
            StreamPattern::parse("/nonya/BADREGEX").unwrap_err(),
            PatternError::UnknownFlag('B')
        );
        assert_eq!(
            StreamPattern::parse("/unterminated").unwrap_err(),
            PatternError::Unterminated
        );
        assert!(matches!(
            StreamPattern::parse("/(open/"),
            Err(PatternError::Compile(_))
        ));
        assert_eq!(
            StreamPattern::parse("plain.name").unwrap_err(),
            PatternError::MissingDelimiter
        );
    }

    #[test]
    fn escaped_delimiter_stays_in_body() {
        let pattern = StreamPattern::parse(r"/^a\/b$/").expect("valid pattern");
        assert!(pattern.is_match("a/b"));
    }

    #[test]
    fn prefix_pattern_keeps_leading_anchor() {
        assert_eq!(
            prefix_pattern(r"/^mediawiki\.job\..+/", &["eqiad.", "codfw."]),
            r"/^(eqiad\.|codfw\.)mediawiki\.job\..+/"
        );
        assert_eq!(
            prefix_pattern(r"/job\..+/i", &["dc1."]),
            r"/(dc1\.)job\..+/i"
        );
    }
}

//! Optional single-line JSON mirror of fatal configuration errors.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use stream_config_errors::StreamConfigError;

use super::logger;

static TRAILERS_ENABLED: AtomicBool = AtomicBool::new(false);
// Stderr unless replaced.
static TRAILER_WRITER: Mutex<Option<Box<dyn Write + Send>>> = Mutex::new(None);

pub(crate) fn set_json_errors_enabled(enabled: bool) {
    TRAILERS_ENABLED.store(enabled, Ordering::SeqCst);
}

#[derive(Serialize)]
struct ErrorTrailer<'a> {
    run_id: Option<&'static str>,
    config_fingerprint: Option<String>,
    error_code: &'static str,
    error_kind: &'static str,
    message: &'a str,
    context: BTreeMap<&'static str, &'a str>,
}

impl<'a> ErrorTrailer<'a> {
    fn new(err: &'a StreamConfigError) -> Self {
        let (run_id, config_fingerprint) = match logger::run_context() {
            Some((run_id, fingerprint)) => (Some(run_id), fingerprint),
            None => (None, None),
        };
        Self {
            run_id,
            config_fingerprint,
            error_code: err.code.as_str(),
            error_kind: err.kind.as_str(),
            message: err.message(),
            context: err
                .context
                .iter()
                .map(|(key, value)| (*key, value.as_str()))
                .collect(),
        }
    }
}

/// Write `err` as one JSON line when JSON error trailers are enabled.
pub fn emit_error_trailer(err: &StreamConfigError) {
    if !TRAILERS_ENABLED.load(Ordering::SeqCst) {
        return;
    }
    let Ok(mut line) = serde_json::to_vec(&ErrorTrailer::new(err)) else {
        return;
    };
    line.push(b'\n');

    let mut writer = TRAILER_WRITER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let _ = match writer.as_mut() {
        Some(writer) => writer.write_all(&line).and_then(|()| writer.flush()),
        None => {
            let mut stderr = io::stderr().lock();
            stderr.write_all(&line).and_then(|()| stderr.flush())
        }
    };
}

#[cfg(test)]
pub fn set_error_trailer_writer_for_tests(writer: Box<dyn Write + Send>) {
    *TRAILER_WRITER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(writer);
}

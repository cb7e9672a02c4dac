// src/trace/propagation.rs

//! Where the trace context comes from, and where it goes after the run.
//!
//! Inputs: the optional carrier file and the parent's `TRACEPARENT`
//! variable. Outputs: the child environment (see [`crate::exec::env`]), the
//! carrier file, and optionally stdout.

use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::exec::ProcessEnv;
use crate::fs::FileSystem;

use super::span::SpanRecord;
use super::traceparent::{TRACEPARENT_ENV, Traceparent};

static CARRIER_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:export\s+)?TRACEPARENT=["']?([0-9a-f-]+)"#)
        .expect("carrier line regex is valid")
});

/// Load the context this invocation inherits.
///
/// The carrier file is read first, then `TRACEPARENT` from the parent's
/// environment overrides it unless `tp_ignore_env` is set. Missing or
/// malformed input yields an uninitialized carrier.
pub fn load_inherited(config: &Config, env: &ProcessEnv, fs: &dyn FileSystem) -> Traceparent {
    let mut inherited = Traceparent::default();

    if let Some(path) = config.tp_carrier.as_deref() {
        match read_carrier_file(fs, path) {
            Some(tp) => inherited = tp,
            None => debug!(path = %path.display(), "no usable traceparent in carrier file"),
        }
    }

    if !config.tp_ignore_env {
        if let Some(value) = env.get_str(TRACEPARENT_ENV) {
            match Traceparent::decode(value) {
                Ok(tp) => inherited = tp,
                Err(err) => debug!(error = %err, "ignoring malformed {TRACEPARENT_ENV}"),
            }
        }
    }

    inherited
}

fn read_carrier_file(fs: &dyn FileSystem, path: &Path) -> Option<Traceparent> {
    if !fs.exists(path) {
        return None;
    }
    match fs.read_to_string(path) {
        Ok(contents) => parse_carrier(&contents),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "failed to read carrier file");
            None
        }
    }
}

/// Extract a traceparent from carrier file contents.
pub fn parse_carrier(contents: &str) -> Option<Traceparent> {
    let caps = CARRIER_LINE_REGEX.captures(contents)?;
    let tp = Traceparent::decode_or_empty(&caps[1]);
    tp.is_initialized().then_some(tp)
}

/// Pick the context handed to the child.
///
/// Recording: the new span. Pass-through: the inherited context, unless
/// pass-through is disabled. Otherwise nothing.
pub fn select_child_context(
    config: &Config,
    span: &SpanRecord,
    inherited: &Traceparent,
) -> Option<Traceparent> {
    if config.is_recording() {
        Some(span.traceparent(true))
    } else if !config.tp_ignore_env && inherited.is_initialized() {
        Some(*inherited)
    } else {
        None
    }
}

/// Persist / print the context after the run. Failures are soft.
pub fn propagate(
    config: &Config,
    traceparent: Option<&Traceparent>,
    fs: &dyn FileSystem,
    out: &mut (dyn Write + Send),
) {
    let Some(tp) = traceparent else {
        debug!("no trace context to propagate");
        return;
    };

    if let Some(path) = config.tp_carrier.as_deref() {
        if let Err(err) = fs.write(path, render_carrier(tp).as_bytes()) {
            warn!(path = %path.display(), error = %err, "failed to write traceparent carrier file");
        }
    }

    if config.tp_print {
        let line = if config.tp_export {
            format!("export {TRACEPARENT_ENV}={tp}")
        } else {
            format!("{TRACEPARENT_ENV}={tp}")
        };
        if let Err(err) = writeln!(out, "{line}") {
            warn!(error = %err, "failed to print traceparent");
        }
    }
}

fn render_carrier(tp: &Traceparent) -> String {
    format!(
        "# trace id: {}\n#  span id: {}\n{TRACEPARENT_ENV}={tp}\n",
        tp.trace_id_hex(),
        tp.span_id_hex()
    )
}

// src/exec/env.rs

//! Child process environment.

use std::ffi::{OsStr, OsString};

use tracing::debug;

use crate::trace::{TRACEPARENT_ENV, Traceparent};

/// Ordered list of environment variables.
///
/// Values are kept as `OsString` so non-UTF-8 entries pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessEnv {
    vars: Vec<(OsString, OsString)>,
}

impl ProcessEnv {
    /// Snapshot of this process's environment.
    pub fn from_current() -> Self {
        std::env::vars_os().collect()
    }

    /// Build from `KEY=VALUE` strings. Entries without `=` get an empty value.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        entries
            .into_iter()
            .map(|entry| {
                let entry = entry.as_ref();
                let (key, value) = entry.split_once('=').unwrap_or((entry, ""));
                (OsString::from(key), OsString::from(value))
            })
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Like [`ProcessEnv::get`], but only for UTF-8 values.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OsStr::to_str)
    }

    pub fn push(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// `KEY=VALUE` rendering, lossy for non-UTF-8 entries.
    pub fn to_entries(&self) -> Vec<String> {
        self.vars
            .iter()
            .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
            .collect()
    }
}

impl FromIterator<(OsString, OsString)> for ProcessEnv {
    fn from_iter<T: IntoIterator<Item = (OsString, OsString)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

/// Compose the child's environment.
///
/// Every parent variable except `TRACEPARENT` is kept, in order. If
/// `carrier` is an initialized context, exactly one `TRACEPARENT` entry with
/// its encoding is appended; otherwise the child gets none at all.
pub fn build_child_env(parent: &ProcessEnv, carrier: Option<&Traceparent>) -> ProcessEnv {
    let mut env: ProcessEnv = parent
        .vars
        .iter()
        .filter(|(k, _)| k != TRACEPARENT_ENV)
        .cloned()
        .collect();

    let stripped = parent.len() - env.len();
    if stripped > 0 {
        debug!(stripped, "removed inherited {TRACEPARENT_ENV} from child environment");
    }

    match carrier {
        Some(tp) if tp.is_initialized() => env.push(TRACEPARENT_ENV, tp.encode()),
        _ => debug!("child runs without {TRACEPARENT_ENV}"),
    }

    env
}

// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::TimeoutPair;
use crate::types::SpanKind;

pub const DEFAULT_SERVICE_NAME: &str = "otel-exec";
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(1);

/// One configuration layer, as read from a TOML file, the environment or the
/// command line.
///
/// Every field is optional so layers can be stacked with
/// [`RawConfig::overlay`]. Example file:
///
/// ```toml
/// endpoint = "localhost:4318"
/// timeout = "2s"
/// command_timeout = "10m"
/// service_name = "nightly-build"
///
/// [attributes]
/// "ci.job" = "compile"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Base OTLP/HTTP endpoint; `/v1/traces` is appended.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Traces endpoint used verbatim. Wins over `endpoint`.
    #[serde(default)]
    pub traces_endpoint: Option<String>,

    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,

    /// Export deadline, e.g. `"1s"`.
    #[serde(default)]
    pub timeout: Option<String>,

    /// Child deadline; `"0"` means no limit.
    #[serde(default)]
    pub command_timeout: Option<String>,

    #[serde(default)]
    pub service_name: Option<String>,

    #[serde(default)]
    pub span_name: Option<String>,

    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub attributes: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub tp_carrier: Option<PathBuf>,

    #[serde(default)]
    pub tp_ignore_env: Option<bool>,

    #[serde(default)]
    pub tp_print: Option<bool>,

    #[serde(default)]
    pub tp_export: Option<bool>,

    #[serde(default)]
    pub verbose: Option<bool>,
}

impl RawConfig {
    /// Stack `higher` on top of `self`. Scalars from `higher` win; maps are
    /// merged key by key.
    pub fn overlay(self, higher: RawConfig) -> RawConfig {
        RawConfig {
            endpoint: higher.endpoint.or(self.endpoint),
            traces_endpoint: higher.traces_endpoint.or(self.traces_endpoint),
            headers: merge_maps(self.headers, higher.headers),
            timeout: higher.timeout.or(self.timeout),
            command_timeout: higher.command_timeout.or(self.command_timeout),
            service_name: higher.service_name.or(self.service_name),
            span_name: higher.span_name.or(self.span_name),
            kind: higher.kind.or(self.kind),
            attributes: merge_maps(self.attributes, higher.attributes),
            tp_carrier: higher.tp_carrier.or(self.tp_carrier),
            tp_ignore_env: higher.tp_ignore_env.or(self.tp_ignore_env),
            tp_print: higher.tp_print.or(self.tp_print),
            tp_export: higher.tp_export.or(self.tp_export),
            verbose: higher.verbose.or(self.verbose),
        }
    }
}

fn merge_maps(
    lower: Option<BTreeMap<String, String>>,
    higher: Option<BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    match (lower, higher) {
        (Some(mut lower), Some(higher)) => {
            lower.extend(higher);
            Some(lower)
        }
        (lower, higher) => higher.or(lower),
    }
}

/// Fully resolved and validated configuration.
///
/// Built from a [`RawConfig`] via `TryFrom` (see `validate.rs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Resolved OTLP traces URL. `None` means this invocation only
    /// propagates context and does not record a span.
    pub endpoint: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Export window.
    pub timeout: Duration,
    /// Command window; zero means unbounded.
    pub command_timeout: Duration,
    pub service_name: String,
    pub span_name: Option<String>,
    pub kind: SpanKind,
    pub attributes: BTreeMap<String, String>,
    pub tp_carrier: Option<PathBuf>,
    pub tp_ignore_env: bool,
    pub tp_print: bool,
    pub tp_export: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            headers: BTreeMap::new(),
            timeout: DEFAULT_EXPORT_TIMEOUT,
            command_timeout: Duration::ZERO,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            span_name: None,
            kind: SpanKind::default(),
            attributes: BTreeMap::new(),
            tp_carrier: None,
            tp_ignore_env: false,
            tp_print: false,
            tp_export: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Whether this invocation creates and exports a span of its own.
    pub fn is_recording(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn timeouts(&self) -> TimeoutPair {
        TimeoutPair::new(self.command_timeout, self.timeout)
    }

    /// Span name, defaulting to the program being run.
    pub fn span_name_for(&self, program: &str) -> String {
        self.span_name
            .clone()
            .unwrap_or_else(|| program.to_string())
    }
}

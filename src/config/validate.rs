// src/config/validate.rs

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Url;

use crate::config::duration::parse_duration;
use crate::config::model::{Config, DEFAULT_EXPORT_TIMEOUT, DEFAULT_SERVICE_NAME, RawConfig};
use crate::errors::{OtelExecError, Result};
use crate::types::SpanKind;

const TRACES_PATH: &str = "/v1/traces";

impl TryFrom<RawConfig> for Config {
    type Error = OtelExecError;

    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        let endpoint = resolve_endpoint(raw.endpoint.as_deref(), raw.traces_endpoint.as_deref())?;
        let timeout = validate_export_timeout(raw.timeout.as_deref())?;
        let command_timeout = match raw.command_timeout.as_deref() {
            Some(s) => parse_duration(s).map_err(|e| config_err("command_timeout", e))?,
            None => Duration::ZERO,
        };
        let kind = match raw.kind.as_deref() {
            Some(s) => s.parse::<SpanKind>().map_err(|e| config_err("kind", e))?,
            None => SpanKind::default(),
        };
        let service_name = raw
            .service_name
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        if service_name.trim().is_empty() {
            return Err(config_err("service_name", "must not be empty"));
        }

        let headers = raw.headers.unwrap_or_default();
        ensure_keys_non_empty("headers", &headers)?;
        let attributes = raw.attributes.unwrap_or_default();
        ensure_keys_non_empty("attributes", &attributes)?;

        Ok(Config {
            endpoint,
            headers,
            timeout,
            command_timeout,
            service_name,
            span_name: raw.span_name.filter(|s| !s.is_empty()),
            kind,
            attributes,
            tp_carrier: raw.tp_carrier,
            tp_ignore_env: raw.tp_ignore_env.unwrap_or(false),
            tp_print: raw.tp_print.unwrap_or(false),
            tp_export: raw.tp_export.unwrap_or(false),
            verbose: raw.verbose.unwrap_or(false),
        })
    }
}

fn config_err(field: &str, msg: impl std::fmt::Display) -> OtelExecError {
    OtelExecError::Config(format!("{field}: {msg}"))
}

fn validate_export_timeout(raw: Option<&str>) -> Result<Duration> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_EXPORT_TIMEOUT);
    };
    let timeout = parse_duration(raw).map_err(|e| config_err("timeout", e))?;
    if timeout.is_zero() {
        return Err(config_err("timeout", "export timeout must be greater than zero"));
    }
    Ok(timeout)
}

fn ensure_keys_non_empty(field: &str, map: &BTreeMap<String, String>) -> Result<()> {
    if map.keys().any(|k| k.trim().is_empty()) {
        return Err(config_err(field, "keys must not be empty"));
    }
    Ok(())
}

/// Resolve the URL spans are POSTed to.
///
/// - a traces-specific endpoint is used as-is (scheme added if missing);
/// - a base endpoint gets `/v1/traces` appended;
/// - empty strings count as unset.
pub fn resolve_endpoint(base: Option<&str>, traces: Option<&str>) -> Result<Option<String>> {
    let base = base.map(str::trim).filter(|s| !s.is_empty());
    let traces = traces.map(str::trim).filter(|s| !s.is_empty());

    if let Some(traces) = traces {
        let url = parse_url(traces)?;
        return Ok(Some(url.to_string()));
    }

    let Some(base) = base else {
        return Ok(None);
    };
    let mut url = parse_url(base)?;
    let path = url.path().trim_end_matches('/').to_string();
    if !path.ends_with(TRACES_PATH) {
        url.set_path(&format!("{path}{TRACES_PATH}"));
    }
    Ok(Some(url.to_string()))
}

fn parse_url(raw: &str) -> Result<Url> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let url = Url::parse(&with_scheme)
        .map_err(|e| config_err("endpoint", format!("invalid URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(config_err(
            "endpoint",
            format!("unsupported scheme {other:?} (expected http or https)"),
        )),
    }
}

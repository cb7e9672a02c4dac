// src/config/loader.rs

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::model::{Config, RawConfig};
use crate::errors::{OtelExecError, Result};
use crate::exec::ProcessEnv;
use crate::fs::FileSystem;

pub const ENV_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
pub const ENV_TRACES_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT";
pub const ENV_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
pub const ENV_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_TIMEOUT";
pub const ENV_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
pub const ENV_COMMAND_TIMEOUT: &str = "OTEL_EXEC_COMMAND_TIMEOUT";
pub const ENV_TP_CARRIER: &str = "OTEL_EXEC_TP_CARRIER";
pub const ENV_TP_IGNORE_ENV: &str = "OTEL_EXEC_TP_IGNORE_ENV";
pub const ENV_TP_PRINT: &str = "OTEL_EXEC_TP_PRINT";
pub const ENV_VERBOSE: &str = "OTEL_EXEC_VERBOSE";

/// Read one configuration layer from a TOML file.
///
/// This only performs TOML deserialization; semantic validation happens when
/// the merged layers are turned into a [`Config`].
pub fn load_from_path(fs: &dyn FileSystem, path: &Path) -> Result<RawConfig> {
    let contents = fs.read_to_string(path)?;
    let config: RawConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Read one configuration layer from environment variables.
pub fn load_from_env(env: &ProcessEnv) -> Result<RawConfig> {
    let get = |key: &str| {
        env.get_str(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let headers = match get(ENV_HEADERS) {
        Some(list) => Some(parse_kv_list(ENV_HEADERS, &list)?),
        None => None,
    };

    // The OTLP convention for this variable is plain milliseconds.
    let timeout = get(ENV_TIMEOUT).map(|v| {
        if v.chars().all(|c| c.is_ascii_digit()) {
            format!("{v}ms")
        } else {
            v
        }
    });

    Ok(RawConfig {
        endpoint: get(ENV_ENDPOINT),
        traces_endpoint: get(ENV_TRACES_ENDPOINT),
        headers,
        timeout,
        command_timeout: get(ENV_COMMAND_TIMEOUT),
        service_name: get(ENV_SERVICE_NAME),
        tp_carrier: get(ENV_TP_CARRIER).map(Into::into),
        tp_ignore_env: get(ENV_TP_IGNORE_ENV)
            .map(|v| parse_bool(ENV_TP_IGNORE_ENV, &v))
            .transpose()?,
        tp_print: get(ENV_TP_PRINT)
            .map(|v| parse_bool(ENV_TP_PRINT, &v))
            .transpose()?,
        verbose: get(ENV_VERBOSE)
            .map(|v| parse_bool(ENV_VERBOSE, &v))
            .transpose()?,
        ..RawConfig::default()
    })
}

/// Resolve the final configuration.
///
/// Precedence, lowest first: defaults, config file, environment, `overrides`
/// (the command line).
pub fn load_config(
    fs: &dyn FileSystem,
    file: Option<&Path>,
    env: &ProcessEnv,
    overrides: RawConfig,
) -> Result<Config> {
    let mut raw = RawConfig::default();
    if let Some(path) = file {
        raw = raw.overlay(load_from_path(fs, path)?);
    }
    raw = raw.overlay(load_from_env(env)?);
    raw = raw.overlay(overrides);
    Config::try_from(raw)
}

/// Parse `k=v,k=v` into a map.
pub fn parse_kv_list(field: &str, list: &str) -> Result<BTreeMap<String, String>> {
    parse_kv_pairs(field, list.split(',').filter(|s| !s.trim().is_empty()))
}

/// Parse individual `k=v` items into a map. Later keys win.
pub fn parse_kv_pairs<I, S>(field: &str, items: I) -> Result<BTreeMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut map = BTreeMap::new();
    for item in items {
        let item = item.as_ref();
        let (key, value) = item.split_once('=').ok_or_else(|| {
            OtelExecError::Config(format!("{field}: expected key=value, got {item:?}"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(OtelExecError::Config(format!(
                "{field}: empty key in {item:?}"
            )));
        }
        map.insert(key.to_string(), value.trim().to_string());
    }
    Ok(map)
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(OtelExecError::Config(format!(
            "{field}: invalid boolean {other:?}"
        ))),
    }
}

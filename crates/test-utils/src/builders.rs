#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use otel_exec::config::{Config, RawConfig};

/// Builder for `Config` to simplify test setup.
pub struct ConfigBuilder {
    raw: RawConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawConfig::default(),
        }
    }

    /// Enable recording by pointing at a (never contacted) collector.
    pub fn recording(self) -> Self {
        self.endpoint("http://127.0.0.1:4318")
    }

    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.raw.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn command_timeout(mut self, timeout: &str) -> Self {
        self.raw.command_timeout = Some(timeout.to_string());
        self
    }

    pub fn export_timeout(mut self, timeout: &str) -> Self {
        self.raw.timeout = Some(timeout.to_string());
        self
    }

    pub fn span_name(mut self, name: &str) -> Self {
        self.raw.span_name = Some(name.to_string());
        self
    }

    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.raw
            .attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn tp_carrier(mut self, path: impl AsRef<Path>) -> Self {
        self.raw.tp_carrier = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn tp_ignore_env(mut self) -> Self {
        self.raw.tp_ignore_env = Some(true);
        self
    }

    pub fn tp_print(mut self) -> Self {
        self.raw.tp_print = Some(true);
        self
    }

    pub fn build(self) -> Config {
        Config::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

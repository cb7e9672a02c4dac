// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::trace::TraceparentError;

#[derive(Error, Debug)]
pub enum OtelExecError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Traceparent error: {0}")]
    Traceparent(#[from] TraceparentError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OtelExecError>;

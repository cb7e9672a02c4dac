// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the layered data model (`model.rs`).
//! - Read layers from a TOML file and the environment (`loader.rs`).
//! - Resolve and validate the merged layers (`validate.rs`).
//! - Parse duration strings (`duration.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_config, load_from_env, load_from_path, parse_kv_list, parse_kv_pairs};
pub use model::{Config, DEFAULT_EXPORT_TIMEOUT, DEFAULT_SERVICE_NAME, RawConfig};
pub use validate::resolve_endpoint;

// src/trace/traceparent.rs

//! W3C `traceparent` carrier.
//!
//! Wire form is `version-traceid-spanid-flags`, e.g.
//! `00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01`.
//! Only the sampled bit of the flags byte is kept; encoding always emits
//! version `00`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Environment variable that carries the traceparent between processes.
pub const TRACEPARENT_ENV: &str = "TRACEPARENT";

const SAMPLED_FLAG: u8 = 0x01;

static TRACEPARENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-f]{2})-([0-9a-f]{32})-([0-9a-f]{16})-([0-9a-f]{2})(-.*)?$")
        .expect("traceparent regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceparentError {
    #[error("malformed traceparent {0:?}")]
    Malformed(String),

    #[error("`ff` is an invalid traceparent version")]
    InvalidVersion,

    #[error("traceparent with version `00` must contain exactly 4 fields")]
    TrailingFields,

    #[error("traceparent trace id is all zeroes")]
    ZeroTraceId,

    #[error("traceparent span id is all zeroes")]
    ZeroSpanId,
}

/// Decoded trace context.
///
/// `Traceparent::default()` is the empty placeholder; check
/// [`Traceparent::is_initialized`] before propagating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Traceparent {
    trace_id: [u8; 16],
    span_id: [u8; 8],
    sampled: bool,
    initialized: bool,
}

impl Traceparent {
    pub fn new(trace_id: [u8; 16], span_id: [u8; 8], sampled: bool) -> Self {
        Self {
            trace_id,
            span_id,
            sampled,
            initialized: true,
        }
    }

    /// Parse the textual form. Surrounding whitespace is ignored.
    pub fn decode(value: &str) -> Result<Self, TraceparentError> {
        let value = value.trim();
        let caps = TRACEPARENT_REGEX
            .captures(value)
            .ok_or_else(|| TraceparentError::Malformed(value.to_string()))?;

        let version = &caps[1];
        if version == "ff" {
            return Err(TraceparentError::InvalidVersion);
        }
        if version == "00" && caps.get(5).is_some() {
            return Err(TraceparentError::TrailingFields);
        }

        let mut trace_id = [0u8; 16];
        let mut span_id = [0u8; 8];
        let mut flags = [0u8; 1];
        // The regex guarantees lengths and hex digits, so these cannot fail.
        hex::decode_to_slice(&caps[2], &mut trace_id)
            .map_err(|_| TraceparentError::Malformed(value.to_string()))?;
        hex::decode_to_slice(&caps[3], &mut span_id)
            .map_err(|_| TraceparentError::Malformed(value.to_string()))?;
        hex::decode_to_slice(&caps[4], &mut flags)
            .map_err(|_| TraceparentError::Malformed(value.to_string()))?;

        if trace_id == [0u8; 16] {
            return Err(TraceparentError::ZeroTraceId);
        }
        if span_id == [0u8; 8] {
            return Err(TraceparentError::ZeroSpanId);
        }

        Ok(Self::new(trace_id, span_id, flags[0] & SAMPLED_FLAG != 0))
    }

    /// Decode, falling back to the empty placeholder on malformed input.
    pub fn decode_or_empty(value: &str) -> Self {
        Self::decode(value).unwrap_or_default()
    }

    pub fn encode(&self) -> String {
        let flags = if self.sampled { SAMPLED_FLAG } else { 0 };
        format!(
            "00-{}-{}-{:02x}",
            hex::encode(self.trace_id),
            hex::encode(self.span_id),
            flags
        )
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn trace_id(&self) -> [u8; 16] {
        self.trace_id
    }

    pub fn span_id(&self) -> [u8; 8] {
        self.span_id
    }

    pub fn sampled(&self) -> bool {
        self.sampled
    }

    pub fn trace_id_hex(&self) -> String {
        hex::encode(self.trace_id)
    }

    pub fn span_id_hex(&self) -> String {
        hex::encode(self.span_id)
    }
}

impl FromStr for Traceparent {
    type Err = TraceparentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl fmt::Display for Traceparent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

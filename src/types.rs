use std::fmt;
use std::str::FromStr;

/// Role of the wrapping span, as understood by trace backends.
///
/// Defaults to `Client`: the wrapper is calling out to the child command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanKind {
    Internal,
    Server,
    #[default]
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    /// Numeric value used by the OTLP encoding.
    pub fn otlp_value(self) -> i32 {
        match self {
            SpanKind::Internal => 1,
            SpanKind::Server => 2,
            SpanKind::Client => 3,
            SpanKind::Producer => 4,
            SpanKind::Consumer => 5,
        }
    }
}

impl FromStr for SpanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "internal" => Ok(SpanKind::Internal),
            "server" => Ok(SpanKind::Server),
            "client" => Ok(SpanKind::Client),
            "producer" => Ok(SpanKind::Producer),
            "consumer" => Ok(SpanKind::Consumer),
            other => Err(format!(
                "invalid span kind: {other} \
                 (expected one of internal, server, client, producer, consumer)"
            )),
        }
    }
}

/// Span status code.
///
/// A successful command leaves the span `Unset`; only failures are marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusCode {
    #[default]
    Unset,
    Ok,
    Error,
}

impl StatusCode {
    pub fn otlp_value(self) -> i32 {
        match self {
            StatusCode::Unset => 0,
            StatusCode::Ok => 1,
            StatusCode::Error => 2,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusCode::Unset => "unset",
            StatusCode::Ok => "ok",
            StatusCode::Error => "error",
        };
        f.write_str(s)
    }
}

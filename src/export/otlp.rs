// src/export/otlp.rs

//! OTLP/HTTP exporter using the JSON encoding.
//!
//! One request per invocation: a single resource carrying `service.name`, a
//! single instrumentation scope, a single span.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::trace::SpanRecord;

use super::{ExportError, ExportFuture, SpanExporter};

const SCOPE_NAME: &str = "otel-exec";
const SCOPE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone)]
pub struct OtlpHttpExporter {
    client: reqwest::Client,
    endpoint: String,
    headers: BTreeMap<String, String>,
    service_name: String,
}

impl OtlpHttpExporter {
    /// `endpoint` is the full traces URL, e.g. `http://localhost:4318/v1/traces`.
    pub fn new(
        endpoint: impl Into<String>,
        headers: BTreeMap<String, String>,
        service_name: impl Into<String>,
    ) -> Result<Self, ExportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("otel-exec/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            headers,
            service_name: service_name.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, body: Vec<u8>) -> Result<(), ExportError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(endpoint = %self.endpoint, status = status.as_u16(), "collector accepted span");
        Ok(())
    }
}

impl SpanExporter for OtlpHttpExporter {
    fn send<'a>(&'a mut self, span: &'a SpanRecord) -> ExportFuture<'a> {
        Box::pin(async move {
            let request = encode_request(span, &self.service_name);
            let body = serde_json::to_vec(&request)?;
            self.post(body).await
        })
    }

    fn shutdown(&mut self) -> ExportFuture<'_> {
        // Nothing is buffered; each send is a complete request.
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTraceServiceRequest {
    pub resource_spans: Vec<ResourceSpans>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpans {
    pub resource: Resource,
    pub scope_spans: Vec<ScopeSpans>,
}

#[derive(Debug, Serialize)]
pub struct Resource {
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Serialize)]
pub struct ScopeSpans {
    pub scope: InstrumentationScope,
    pub spans: Vec<Span>,
}

#[derive(Debug, Serialize)]
pub struct InstrumentationScope {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub trace_id: String,
    pub span_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub parent_span_id: String,
    pub name: String,
    pub kind: i32,
    pub start_time_unix_nano: String,
    pub end_time_unix_nano: String,
    pub attributes: Vec<KeyValue>,
    pub status: Status,
}

#[derive(Debug, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AnyValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyValue {
    pub string_value: String,
}

#[derive(Debug, Serialize)]
pub struct Status {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub code: i32,
}

fn string_kv(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: AnyValue {
            string_value: value.to_string(),
        },
    }
}

/// Build the OTLP request body for one span.
///
/// An un-ended span is encoded with its start time as the end time.
pub fn encode_request(span: &SpanRecord, service_name: &str) -> ExportTraceServiceRequest {
    let start = span.start_time().unix_nanos();
    let end = span.end_time().map(|t| t.unix_nanos()).unwrap_or(start);

    let otlp_span = Span {
        trace_id: hex::encode(span.trace_id()),
        span_id: hex::encode(span.span_id()),
        parent_span_id: span.parent_span_id().map(hex::encode).unwrap_or_default(),
        name: span.name().to_string(),
        kind: span.kind().otlp_value(),
        start_time_unix_nano: start.to_string(),
        end_time_unix_nano: end.to_string(),
        attributes: span
            .attributes()
            .iter()
            .map(|(k, v)| string_kv(k, v))
            .collect(),
        status: Status {
            message: span.status_message().to_string(),
            code: span.status().otlp_value(),
        },
    };

    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Resource {
                attributes: vec![string_kv("service.name", service_name)],
            },
            scope_spans: vec![ScopeSpans {
                scope: InstrumentationScope {
                    name: SCOPE_NAME.to_string(),
                    version: SCOPE_VERSION.to_string(),
                },
                spans: vec![otlp_span],
            }],
        }],
    }
}

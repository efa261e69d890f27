//! HTTP collaborators that feed the pipeline: the endpoint tester and the
//! per-source reading fetcher. Nothing in here decides on a value; it only
//! hands already-fetched documents and readings to the pure core.

mod basic;
mod client;
mod headers;
#[cfg(test)]
pub(crate) mod mock;
pub mod readings;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use headers::WithHeaders;
pub use readings::fetch_readings;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Key under which a non-JSON response body is wrapped.
pub const RAW_BODY_KEY: &str = "_raw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

/// A user-configured request header. Disabled entries are kept in config but never sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiHeader {
    pub key: String,
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// One request to a user-supplied endpoint.
#[derive(Debug, Clone)]
pub struct EndpointRequest {
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<String>,
}

impl EndpointRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            body: None,
        }
    }
}

/// Outcome of an endpoint call. `document` is present even for non-2xx
/// responses so the caller can show what came back.
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    pub status: u16,
    pub success: bool,
    pub document: Value,
    pub elapsed: Duration,
}

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    Ok(resp.bytes().await?.to_vec())
}

/// Sends one request and parses the body into a document.
///
/// # Errors
///
/// Returns an error only for an unparsable URL or a transport failure; HTTP
/// error statuses are reported through [`EndpointResponse::success`].
#[tracing::instrument(skip(client, request), fields(url = %request.url, method = ?request.method))]
pub async fn call_endpoint<C: HttpClient>(
    client: &C,
    request: &EndpointRequest,
) -> Result<EndpointResponse> {
    let url = request
        .url
        .parse()
        .with_context(|| format!("invalid URL '{}'", request.url))?;
    let mut req = reqwest::Request::new(request.method.into(), url);

    if let (HttpMethod::Post, Some(body)) = (request.method, &request.body) {
        req.headers_mut().insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        *req.body_mut() = Some(body.clone().into());
    }

    let started = Instant::now();
    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("request to '{}' failed", request.url))?;
    let status = resp.status();
    let bytes = resp.bytes().await?;
    let elapsed = started.elapsed();

    debug!(
        status = status.as_u16(),
        bytes = bytes.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Endpoint responded"
    );

    Ok(EndpointResponse {
        status: status.as_u16(),
        success: status.is_success(),
        document: parse_document(&bytes),
        elapsed,
    })
}

/// Parses a response body as JSON, wrapping anything else as `{"_raw": "<text>"}`.
///
/// A body that is itself a bare JSON scalar (e.g. `42`) becomes the root.
pub fn parse_document(bytes: &[u8]) -> Value {
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(_) => {
            let text = String::from_utf8_lossy(bytes);
            let mut map = serde_json::Map::new();
            map.insert(RAW_BODY_KEY.into(), Value::String(text.trim().to_string()));
            Value::Object(map)
        }
    }
}

use crate::fetch::ApiHeader;
use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that sets a fixed group of headers on every request.
///
/// Headers come from the custom-API configuration (`User-Agent`, API keys,
/// `Authorization`). Names and values are validated once, on construction,
/// so a bad header is a config error rather than a failed request.
pub struct WithHeaders<C> {
    inner: C,
    headers: HeaderMap,
}

impl<C> WithHeaders<C> {
    /// Wraps `inner` with the enabled, non-empty entries of `headers`.
    pub fn new(inner: C, headers: &[ApiHeader]) -> Result<Self> {
        let mut map = HeaderMap::new();
        for h in headers.iter().filter(|h| h.enabled && !h.key.trim().is_empty()) {
            let name = HeaderName::from_bytes(h.key.trim().as_bytes())
                .with_context(|| format!("invalid header name '{}'", h.key))?;
            let value = HeaderValue::from_str(&h.value)
                .with_context(|| format!("invalid value for header '{}'", h.key))?;
            map.insert(name, value);
        }
        Ok(Self {
            inner,
            headers: map,
        })
    }

    /// Convenience constructor that uses `Authorization: Bearer <key>`.
    pub fn bearer(inner: C, key: &str) -> Result<Self> {
        Self::new(
            inner,
            &[ApiHeader {
                key: "Authorization".into(),
                value: format!("Bearer {key}"),
                enabled: true,
            }],
        )
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for WithHeaders<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        for (name, value) in &self.headers {
            req.headers_mut().insert(name.clone(), value.clone());
        }
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::StaticClient;

    fn header(key: &str, value: &str, enabled: bool) -> ApiHeader {
        ApiHeader {
            key: key.into(),
            value: value.into(),
            enabled,
        }
    }

    #[test]
    fn test_disabled_and_blank_headers_are_skipped() {
        let client = WithHeaders::new(
            StaticClient::default(),
            &[
                header("Authorization", "Bearer token", false),
                header("Accept", "application/json", true),
                header("  ", "ignored", true),
            ],
        )
        .unwrap();
        assert_eq!(client.header_count(), 1);
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let result = WithHeaders::new(StaticClient::default(), &[header("bad header", "x", true)]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_headers_are_sent() {
        let inner = StaticClient::default().route("https://api.example.com/x", 200, "{}");
        let client = WithHeaders::bearer(&inner, "secret").unwrap();
        let req = reqwest::Request::new(
            reqwest::Method::GET,
            "https://api.example.com/x".parse().unwrap(),
        );
        client.execute(req).await.unwrap();

        let seen = inner.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].headers.get("authorization").map(String::as_str),
            Some("Bearer secret")
        );
    }
}

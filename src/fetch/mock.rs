//! In-memory [`HttpClient`] for tests: canned responses keyed by URL.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::HttpClient;

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

#[derive(Default)]
pub struct StaticClient {
    routes: HashMap<String, (u16, String)>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl StaticClient {
    pub fn route(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(url.to_string(), (status, body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HttpClient for StaticClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let url = req.url().to_string();
        let headers = req
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = req
            .body()
            .and_then(|b| b.as_bytes())
            .map(|b| String::from_utf8_lossy(b).into_owned());

        if let Ok(mut seen) = self.seen.lock() {
            seen.push(SeenRequest {
                method: req.method().to_string(),
                url: url.clone(),
                headers,
                body,
            });
        }

        let (status, body) = self
            .routes
            .get(&url)
            .cloned()
            .unwrap_or((404, "not found".to_string()));

        let response = http::Response::builder()
            .status(status)
            .body(body)
            .expect("static response");
        Ok(reqwest::Response::from(response))
    }
}

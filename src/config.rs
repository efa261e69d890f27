//! Oracle configuration file.
//!
//! Stored as a JSON object in the shape the builder saves:
//! ```json
//! {
//!   "feeds": [{
//!     "name": "BTC/USD Feed",
//!     "symbol": "BTC/USD",
//!     "dataSources": [{"id": "coingecko"}, {"id": "binance", "weight": 2}],
//!     "aggregator": {"type": "median", "minSources": 2, "deviationThreshold": 0.05}
//!   }],
//!   "customApis": [{
//!     "name": "Solana subscribers",
//!     "url": "https://www.reddit.com/r/solana/about.json",
//!     "headers": [{"key": "User-Agent", "value": "oracle-pipeline/0.1", "enabled": true}],
//!     "jsonPath": "$.data.subscribers",
//!     "transforms": [{"type": "percentage"}]
//!   }]
//! }
//! ```

use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::aggregator::AggregationPolicy;
use crate::extract::{ExtractionSpec, TransformStep};
use crate::fetch::{ApiHeader, EndpointRequest, HttpMethod};
use crate::format::is_valid_url;
use crate::sources::SourceConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleConfig {
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub custom_apis: Vec<CustomApiConfig>,
}

/// A multi-source price feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedConfig {
    pub name: String,
    pub symbol: String,
    #[serde(alias = "dataSources")]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub aggregator: AggregationPolicy,
    /// Decimal places used when displaying the consensus.
    #[serde(default = "default_decimals")]
    pub decimals: usize,
}

fn default_decimals() -> usize {
    2
}

/// A single-endpoint custom API oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomApiConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: Vec<ApiHeader>,
    #[serde(default)]
    pub body: Option<String>,
    pub json_path: String,
    #[serde(default)]
    pub transforms: Vec<TransformStep>,
    #[serde(default = "default_decimals")]
    pub decimals: usize,
}

impl CustomApiConfig {
    pub fn extraction_spec(&self) -> ExtractionSpec {
        ExtractionSpec {
            path: self.json_path.clone(),
            transforms: self.transforms.clone(),
        }
    }

    pub fn request(&self) -> EndpointRequest {
        EndpointRequest {
            url: self.url.clone(),
            method: self.method,
            body: self.body.clone(),
        }
    }
}

impl OracleConfig {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read oracle config '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("invalid oracle config '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configs a builder form would not have let through.
    pub fn validate(&self) -> Result<()> {
        for feed in &self.feeds {
            feed.aggregator
                .validate()
                .with_context(|| format!("feed '{}'", feed.name))?;

            let mut seen = HashSet::new();
            for source in &feed.sources {
                if !seen.insert(source.id.as_str()) {
                    bail!("feed '{}': duplicate source id '{}'", feed.name, source.id);
                }
                if let Some(url) = &source.url {
                    // templates are checked with placeholders filled in
                    let resolved = source.resolve(&feed.symbol)?;
                    if !is_valid_url(&resolved.url) {
                        bail!("feed '{}': source '{}' has invalid url '{url}'", feed.name, source.id);
                    }
                } else if !source.is_builtin() {
                    bail!(
                        "feed '{}': source '{}' is not built in and has no url",
                        feed.name,
                        source.id
                    );
                }
            }
        }

        for api in &self.custom_apis {
            if !is_valid_url(&api.url) {
                bail!("custom api '{}': invalid url '{}'", api.name, api.url);
            }
            api.extraction_spec()
                .validate()
                .with_context(|| format!("custom api '{}'", api.name))?;
        }

        Ok(())
    }

    pub fn feed(&self, name: &str) -> Option<&FeedConfig> {
        self.feeds.iter().find(|f| f.name == name)
    }

    pub fn custom_api(&self, name: &str) -> Option<&CustomApiConfig> {
        self.custom_apis.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregationMethod;

    const SAMPLE: &str = r#"{
        "feeds": [{
            "name": "BTC/USD Feed",
            "symbol": "BTC/USD",
            "dataSources": [
                {"id": "coingecko", "name": "CoinGecko", "type": "api", "enabled": true},
                {"id": "binance", "weight": 2}
            ],
            "aggregator": {"type": "weighted", "minSources": 2, "deviationThreshold": 0.05},
            "updateInterval": 60
        }],
        "customApis": [{
            "name": "Solana subscribers",
            "url": "https://www.reddit.com/r/solana/about.json",
            "method": "GET",
            "headers": [{"key": "User-Agent", "value": "oracle-pipeline/0.1", "enabled": true}],
            "jsonPath": "$.data.subscribers",
            "transforms": [{"type": "percentage"}]
        }]
    }"#;

    #[test]
    fn test_load_builder_shape() {
        let config = OracleConfig::from_json(SAMPLE).unwrap();
        let feed = config.feed("BTC/USD Feed").unwrap();
        assert_eq!(feed.sources.len(), 2);
        assert_eq!(feed.aggregator.method, AggregationMethod::Weighted);
        assert_eq!(feed.decimals, 2);

        let api = config.custom_api("Solana subscribers").unwrap();
        assert_eq!(api.method, HttpMethod::Get);
        assert_eq!(api.extraction_spec().transforms, vec![TransformStep::Percentage]);
        assert_eq!(api.request().url, "https://www.reddit.com/r/solana/about.json");
    }

    #[test]
    fn test_rejects_zero_min_sources() {
        let json = SAMPLE.replace(r#""minSources": 2"#, r#""minSources": 0"#);
        assert!(OracleConfig::from_json(&json).is_err());
    }

    #[test]
    fn test_rejects_duplicate_source_ids() {
        let json = SAMPLE.replace(r#"{"id": "binance", "weight": 2}"#, r#"{"id": "coingecko"}"#);
        let err = OracleConfig::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("duplicate source id"));
    }

    #[test]
    fn test_rejects_unknown_source_without_url() {
        let json = SAMPLE.replace(r#"{"id": "binance", "weight": 2}"#, r#"{"id": "kraken"}"#);
        assert!(OracleConfig::from_json(&json).is_err());
    }

    #[test]
    fn test_rejects_bad_custom_api() {
        let bad_url = SAMPLE.replace("https://www.reddit.com", "ftp://www.reddit.com");
        assert!(OracleConfig::from_json(&bad_url).is_err());

        let bad_path = SAMPLE.replace("$.data.subscribers", "$.data[");
        assert!(OracleConfig::from_json(&bad_path).is_err());
    }

    #[test]
    fn test_empty_config() {
        let config = OracleConfig::from_json("{}").unwrap();
        assert!(config.feeds.is_empty());
        assert!(config.custom_apis.is_empty());
    }
}

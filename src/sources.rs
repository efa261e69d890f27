//! Price-source definitions for price feeds.
//!
//! A source is a URL template plus an extraction path into its response.
//! `coingecko`, `binance` and `coinbase` are built in; anything else must
//! carry its own `url` and `path`.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::extract::JsonPath;

/// Symbol → CoinGecko id for symbols whose id is not the lowercased base.
static COINGECKO_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("BNB", "binancecoin"),
    ("ADA", "cardano"),
    ("XRP", "ripple"),
    ("DOGE", "dogecoin"),
    ("DOT", "polkadot"),
    ("MATIC", "matic-network"),
    ("AVAX", "avalanche-2"),
];

/// `(id, url template, path template)` for the built-in sources.
static BUILTIN_SOURCES: &[(&str, &str, &str)] = &[
    (
        "coingecko",
        "https://api.coingecko.com/api/v3/simple/price?ids={coin_id}&vs_currencies={quote_lower}",
        "$[\"{coin_id}\"].{quote_lower}",
    ),
    (
        "binance",
        "https://api.binance.com/api/v3/ticker/24hr?symbol={base}USDT",
        "$.lastPrice",
    ),
    (
        "coinbase",
        "https://api.coinbase.com/v2/exchange-rates?currency={base}",
        "$.data.rates.{quote}",
    ),
];

/// A configured data source of a price feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// URL template; required unless `id` names a built-in source.
    #[serde(default)]
    pub url: Option<String>,
    /// Path template locating the price in the response.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl SourceConfig {
    pub fn builtin(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            url: None,
            path: None,
            weight: None,
            enabled: true,
        }
    }

    pub fn is_builtin(&self) -> bool {
        BUILTIN_SOURCES.iter().any(|(id, _, _)| *id == self.id)
    }

    /// Fills the templates for `symbol` and parses the extraction path.
    pub fn resolve(&self, symbol: &str) -> Result<ResolvedSource> {
        let builtin = BUILTIN_SOURCES.iter().find(|(id, _, _)| *id == self.id);

        let url_template = self
            .url
            .as_deref()
            .or(builtin.map(|(_, url, _)| *url))
            .ok_or_else(|| anyhow!("source '{}' has no url and is not built in", self.id))?;
        let path_template = self
            .path
            .as_deref()
            .or(builtin.map(|(_, _, path)| *path))
            .unwrap_or("$");

        let pair = SymbolPair::parse(symbol);
        let path = JsonPath::parse(&pair.fill(path_template))?;

        Ok(ResolvedSource {
            id: self.id.clone(),
            url: pair.fill(url_template),
            path,
            weight: self.weight,
        })
    }
}

/// A source ready to be fetched for one symbol.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub id: String,
    pub url: String,
    pub path: JsonPath,
    pub weight: Option<f64>,
}

/// A `BASE/QUOTE` trading pair. The quote defaults to `USD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolPair {
    pub base: String,
    pub quote: String,
}

impl SymbolPair {
    pub fn parse(symbol: &str) -> Self {
        let (base, quote) = match symbol.split_once('/') {
            Some((b, q)) => (b, q),
            None => (symbol, "USD"),
        };
        Self {
            base: base.trim().to_ascii_uppercase(),
            quote: quote.trim().to_ascii_uppercase(),
        }
    }

    pub fn coingecko_id(&self) -> String {
        COINGECKO_IDS
            .iter()
            .find(|(sym, _)| *sym == self.base)
            .map(|(_, id)| id.to_string())
            .unwrap_or_else(|| self.base.to_ascii_lowercase())
    }

    /// Substitutes `{base}`, `{quote}`, `{base_lower}`, `{quote_lower}` and `{coin_id}`.
    pub fn fill(&self, template: &str) -> String {
        template
            .replace("{base_lower}", &self.base.to_ascii_lowercase())
            .replace("{quote_lower}", &self.quote.to_ascii_lowercase())
            .replace("{base}", &self.base)
            .replace("{quote}", &self.quote)
            .replace("{coin_id}", &self.coingecko_id())
    }
}

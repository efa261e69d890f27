//! Ties fetching to the pure core: one call per configured feed or custom API.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{info, warn};

use crate::aggregator::{self, AggregationPolicy, Consensus, SourceReading};
use crate::config::{CustomApiConfig, FeedConfig};
use crate::error::PipelineError;
use crate::extract::{ExtractionSpec, ScalarValue};
use crate::fetch::{HttpClient, EndpointResponse, WithHeaders, fetch_readings, call_endpoint};
use crate::record::{EvaluationRecord, RecordKind};

/// Readings of one price feed and what the aggregator made of them.
#[derive(Debug, Clone)]
pub struct FeedEvaluation {
    pub name: String,
    pub readings: Vec<SourceReading>,
    pub outcome: Result<Consensus, PipelineError>,
}

impl FeedEvaluation {
    pub fn record(&self, decimals: usize) -> EvaluationRecord {
        let record = match &self.outcome {
            Ok(consensus) => EvaluationRecord::from_consensus(consensus, decimals),
            Err(e) => EvaluationRecord::from_pipeline_error(e),
        };
        record.with_name(&self.name).with_kind(RecordKind::PriceFeed)
    }
}

/// Response of one custom API and the value extracted from it.
#[derive(Debug, Clone)]
pub struct CustomApiEvaluation {
    pub name: String,
    pub response: EndpointResponse,
    pub outcome: Result<ScalarValue, PipelineError>,
}

impl CustomApiEvaluation {
    /// An HTTP error status wins over whatever the body happened to contain.
    pub fn record(&self, decimals: usize) -> EvaluationRecord {
        let record = if !self.response.success {
            EvaluationRecord::from_error("http_error", &format!("HTTP {}", self.response.status))
        } else {
            match &self.outcome {
                Ok(value) => EvaluationRecord::from_scalar(value, decimals),
                Err(e) => EvaluationRecord::from_pipeline_error(e),
            }
        };
        record.with_name(&self.name).with_kind(RecordKind::CustomApi)
    }
}

/// Aggregates an already-collected batch of readings.
pub fn evaluate_readings(
    readings: &[SourceReading],
    policy: &AggregationPolicy,
) -> Result<Consensus, PipelineError> {
    let consensus = aggregator::aggregate(readings, policy)?;
    if !consensus.value.is_finite() {
        warn!(value = consensus.value, "Consensus is not a finite number");
    }
    Ok(consensus)
}

/// Runs an extraction over an already-fetched document.
pub fn evaluate_document(
    document: &Value,
    spec: &ExtractionSpec,
) -> Result<ScalarValue, PipelineError> {
    let value = spec.evaluate(document)?;
    if let ScalarValue::Number(n) = value {
        if !n.is_finite() {
            warn!(path = %spec.path, value = n, "Transform chain produced a non-finite value");
        }
    }
    Ok(value)
}

/// Fetches every source of `feed` and aggregates the readings.
#[tracing::instrument(skip(client, feed), fields(feed = %feed.name, symbol = %feed.symbol))]
pub async fn evaluate_price_feed<C: HttpClient + 'static>(
    client: Arc<C>,
    feed: &FeedConfig,
    concurrency: usize,
) -> FeedEvaluation {
    let readings = fetch_readings(client, &feed.symbol, &feed.sources, concurrency).await;
    let outcome = evaluate_readings(&readings, &feed.aggregator);

    match &outcome {
        Ok(c) => info!(
            value = c.value,
            source_count = c.source_count,
            method = %c.method,
            "Feed evaluated"
        ),
        Err(e) => warn!(error = %e, "Feed produced no value"),
    }

    FeedEvaluation {
        name: feed.name.clone(),
        readings,
        outcome,
    }
}

/// Calls a custom API with its configured headers and extracts its value.
///
/// # Errors
///
/// Fails for invalid headers, an unparsable URL, or a transport failure.
/// Extraction problems are reported through [`CustomApiEvaluation::outcome`].
#[tracing::instrument(skip(client, api), fields(api = %api.name))]
pub async fn evaluate_custom_api<C: HttpClient>(
    client: &C,
    api: &CustomApiConfig,
) -> Result<CustomApiEvaluation> {
    let client = WithHeaders::new(client, &api.headers)?;
    let response = call_endpoint(&client, &api.request()).await?;
    let outcome = evaluate_document(&response.document, &api.extraction_spec());

    match &outcome {
        Ok(value) => info!(status = response.status, value = %value, "Custom API evaluated"),
        Err(e) => warn!(status = response.status, error = %e, "Custom API extraction failed"),
    }

    Ok(CustomApiEvaluation {
        name: api.name.clone(),
        response,
        outcome,
    })
}

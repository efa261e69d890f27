//! Concurrent per-source fetching for price feeds.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, warn};

use crate::aggregator::SourceReading;
use crate::extract::extract_at;
use crate::fetch::{EndpointRequest, HttpClient, call_endpoint};
use crate::sources::{ResolvedSource, SourceConfig};

/// Fetches one reading per enabled source, at most `concurrency` at a time.
///
/// Never fails as a whole: a source that cannot be resolved, fetched, or
/// parsed into a finite number becomes an error reading. Readings come back
/// in configured source order.
#[tracing::instrument(skip(client, sources), fields(source_count = sources.len()))]
pub async fn fetch_readings<C: HttpClient + 'static>(
    client: Arc<C>,
    symbol: &str,
    sources: &[SourceConfig],
    concurrency: usize,
) -> Vec<SourceReading> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::new();

    for source in sources.iter().filter(|s| s.enabled) {
        let id = source.id.clone();
        let weight = source.weight;
        let resolved = match source.resolve(symbol) {
            Ok(r) => r,
            Err(e) => {
                warn!(source_id = %id, error = %e, "Source could not be resolved");
                tasks.push((id, weight, None));
                continue;
            }
        };

        let sem = semaphore.clone();
        let client = client.clone();
        let span = tracing::info_span!("fetch_source", source_id = %id, url = %resolved.url);

        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire().await.ok();
                fetch_one(client.as_ref(), &resolved).await
            }
            .instrument(span),
        );
        tasks.push((id, weight, Some(task)));
    }

    let mut readings = Vec::with_capacity(tasks.len());
    for (id, weight, task) in tasks {
        let reading = match task {
            Some(task) => match task.await {
                Ok(reading) => reading,
                Err(e) => {
                    warn!(source_id = %id, error = %e, "Source task aborted");
                    with_configured_weight(SourceReading::error(id), weight)
                }
            },
            None => with_configured_weight(SourceReading::error(id), weight),
        };
        readings.push(reading);
    }

    readings
}

async fn fetch_one<C: HttpClient>(client: &C, source: &ResolvedSource) -> SourceReading {
    let reading = match read_value(client, source).await {
        Ok(value) => {
            debug!(value, "Source reading received");
            SourceReading::active(source.id.clone(), value)
        }
        Err(e) => {
            warn!(error = %e, "Source reading failed");
            SourceReading::error(source.id.clone())
        }
    };

    with_configured_weight(reading, source.weight)
}

fn with_configured_weight(reading: SourceReading, weight: Option<f64>) -> SourceReading {
    match weight {
        Some(w) => reading.with_weight(w),
        None => reading,
    }
}

async fn read_value<C: HttpClient>(client: &C, source: &ResolvedSource) -> Result<f64> {
    let response = call_endpoint(client, &EndpointRequest::get(source.url.clone())).await?;
    if !response.success {
        return Err(anyhow!("HTTP {}", response.status));
    }

    let scalar = extract_at(&response.document, &source.path)?;
    scalar
        .as_number()
        .filter(|v| v.is_finite())
        .ok_or_else(|| anyhow!("value '{scalar}' at {} is not numeric", source.path.as_str()))
}

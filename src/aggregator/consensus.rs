use crate::aggregator::types::{
    AggregationMethod, AggregationPolicy, Consensus, DeviationReport, SourceReading,
};
use crate::aggregator::utility::{mean, median_at_midpoint, relative_spread, weighted_mean};
use crate::error::{PipelineError, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Reduces a batch of readings to a single consensus value.
///
/// Only active readings with a finite value contribute. Fails with
/// [`PipelineError::InsufficientSources`] when fewer than `policy.min_sources`
/// remain; no other failure originates here. A deviation threshold is
/// reported on the result and never rejects the batch.
pub fn aggregate(readings: &[SourceReading], policy: &AggregationPolicy) -> Result<Consensus> {
    warn_on_duplicate_ids(readings);

    let active: Vec<(f64, f64)> = readings
        .iter()
        .filter_map(|r| r.usable_value().map(|v| (v, r.effective_weight())))
        .collect();

    let required = policy.min_sources.max(1);
    if active.len() < required {
        debug!(
            required,
            active = active.len(),
            total = readings.len(),
            "Not enough active sources for consensus"
        );
        return Err(PipelineError::InsufficientSources {
            required,
            active: active.len(),
        });
    }

    let values: Vec<f64> = active.iter().map(|(v, _)| *v).collect();

    let value = match policy.method {
        AggregationMethod::Median => median_at_midpoint(&values),
        AggregationMethod::Mean => mean(&values),
        AggregationMethod::Weighted => weighted_mean(&active),
    }
    .ok_or(PipelineError::InsufficientSources {
        required,
        active: active.len(),
    })?;

    let deviation = policy.deviation_threshold.map(|threshold| {
        let spread = relative_spread(&values, value);
        DeviationReport {
            spread,
            threshold,
            exceeded: spread > threshold,
        }
    });

    if let Some(report) = &deviation {
        if report.exceeded {
            warn!(
                spread = report.spread,
                threshold = report.threshold,
                "Source readings diverge beyond deviation threshold"
            );
        }
    }

    debug!(
        method = %policy.method,
        value,
        source_count = values.len(),
        "Consensus computed"
    );

    Ok(Consensus {
        value,
        source_count: values.len(),
        method: policy.method,
        deviation,
    })
}

fn warn_on_duplicate_ids(readings: &[SourceReading]) {
    let mut seen = HashSet::new();
    for r in readings {
        if !seen.insert(r.source_id.as_str()) {
            warn!(source_id = %r.source_id, "Duplicate source id in reading batch");
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::Consensus;
use crate::error::PipelineError;
use crate::extract::ScalarValue;
use crate::format::{format_fixed, format_scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    #[default]
    PriceFeed,
    CustomApi,
    Extraction,
    Readings,
}

/// One evaluated oracle value (or the reason there is none), flat enough for a CSV row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub timestamp: DateTime<Utc>,
    pub name: Option<String>,
    pub kind: RecordKind,

    // value
    pub value: Option<f64>,
    pub display_value: Option<String>,
    pub non_finite: bool,

    // aggregation
    pub source_count: Option<usize>,
    pub method: Option<String>,
    pub spread: Option<f64>,
    pub deviation_exceeded: Option<bool>,

    // error tracking
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl EvaluationRecord {
    pub fn from_consensus(consensus: &Consensus, decimals: usize) -> Self {
        EvaluationRecord {
            timestamp: Utc::now(),
            kind: RecordKind::PriceFeed,
            value: Some(consensus.value),
            display_value: Some(format_fixed(consensus.value, decimals)),
            non_finite: !consensus.value.is_finite(),
            source_count: Some(consensus.source_count),
            method: Some(consensus.method.to_string()),
            spread: consensus.deviation.map(|d| d.spread),
            deviation_exceeded: consensus.deviation.map(|d| d.exceeded),
            ..Default::default()
        }
    }

    /// Text values keep `value` empty and only fill `display_value`.
    pub fn from_scalar(scalar: &ScalarValue, decimals: usize) -> Self {
        let value = match scalar {
            ScalarValue::Number(n) => Some(*n),
            _ => None,
        };
        EvaluationRecord {
            timestamp: Utc::now(),
            kind: RecordKind::CustomApi,
            value,
            display_value: Some(format_scalar(scalar, decimals)),
            non_finite: value.is_some_and(|v| !v.is_finite()),
            ..Default::default()
        }
    }

    /// Create an error record with timestamp and error information
    pub fn from_error(error_type: &str, error_message: &str) -> Self {
        EvaluationRecord {
            timestamp: Utc::now(),
            error_type: Some(error_type.to_string()),
            error_message: Some(error_message.to_string()),
            ..Default::default()
        }
    }

    pub fn from_pipeline_error(err: &PipelineError) -> Self {
        Self::from_error(err.kind(), &err.to_string())
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error_type.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{AggregationMethod, DeviationReport};

    #[test]
    fn test_from_consensus() {
        let consensus = Consensus {
            value: 102.0,
            source_count: 2,
            method: AggregationMethod::Median,
            deviation: Some(DeviationReport {
                spread: 0.0196,
                threshold: 0.05,
                exceeded: false,
            }),
        };
        let record = EvaluationRecord::from_consensus(&consensus, 2).with_name("BTC/USD Feed");

        assert_eq!(record.kind, RecordKind::PriceFeed);
        assert_eq!(record.value, Some(102.0));
        assert_eq!(record.display_value.as_deref(), Some("102.00"));
        assert_eq!(record.method.as_deref(), Some("median"));
        assert_eq!(record.deviation_exceeded, Some(false));
        assert!(!record.non_finite);
        assert!(!record.is_error());
    }

    #[test]
    fn test_from_scalar_flags_non_finite() {
        let record = EvaluationRecord::from_scalar(&ScalarValue::Number(f64::INFINITY), 2);
        assert!(record.non_finite);
        assert_eq!(record.display_value.as_deref(), Some("inf"));

        let text = EvaluationRecord::from_scalar(&ScalarValue::Text("N/A".into()), 2);
        assert_eq!(text.value, None);
        assert_eq!(text.display_value.as_deref(), Some("N/A"));
        assert!(!text.non_finite);
    }

    #[test]
    fn test_from_pipeline_error() {
        let err = PipelineError::InsufficientSources {
            required: 3,
            active: 2,
        };
        let record = EvaluationRecord::from_pipeline_error(&err)
            .with_name("ETH/USD Feed")
            .with_kind(RecordKind::PriceFeed);

        assert!(record.is_error());
        assert_eq!(record.error_type.as_deref(), Some("insufficient_sources"));
        assert_eq!(record.value, None);
        assert_eq!(record.name.as_deref(), Some("ETH/USD Feed"));
    }
}

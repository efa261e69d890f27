//! Data types used by the consensus aggregator.

use serde::{Deserialize, Serialize};

/// Liveness of a single reading as reported by the source fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Active,
    Error,
}

/// One sample from one named data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReading {
    pub source_id: String,
    #[serde(default)]
    pub value: Option<f64>,
    pub status: ReadingStatus,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl SourceReading {
    pub fn active(source_id: impl Into<String>, value: f64) -> Self {
        Self {
            source_id: source_id.into(),
            value: Some(value),
            status: ReadingStatus::Active,
            weight: None,
        }
    }

    /// A failed fetch. Carries no value.
    pub fn error(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            value: None,
            status: ReadingStatus::Error,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// The value, if this reading may contribute to a consensus.
    pub fn usable_value(&self) -> Option<f64> {
        match (self.status, self.value) {
            (ReadingStatus::Active, Some(v)) if v.is_finite() => Some(v),
            _ => None,
        }
    }

    /// Configured weight, with unset, non-positive or non-finite weights read as 1.
    pub fn effective_weight(&self) -> f64 {
        match self.weight {
            Some(w) if w.is_finite() && w > 0.0 => w,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    #[default]
    Median,
    Mean,
    Weighted,
}

impl std::fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationMethod::Median => write!(f, "median"),
            AggregationMethod::Mean => write!(f, "mean"),
            AggregationMethod::Weighted => write!(f, "weighted"),
        }
    }
}

impl std::str::FromStr for AggregationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "median" => Ok(AggregationMethod::Median),
            "mean" => Ok(AggregationMethod::Mean),
            "weighted" => Ok(AggregationMethod::Weighted),
            other => Err(format!(
                "unknown aggregation method '{other}' (expected median, mean or weighted)"
            )),
        }
    }
}

/// How a batch of readings is reduced to a consensus value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationPolicy {
    #[serde(rename = "type", alias = "method", default)]
    pub method: AggregationMethod,
    #[serde(default = "default_min_sources")]
    pub min_sources: usize,
    /// Maximum relative spread, as a fraction in `[0, 1]`. Advisory only.
    #[serde(default)]
    pub deviation_threshold: Option<f64>,
}

fn default_min_sources() -> usize {
    1
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            method: AggregationMethod::default(),
            min_sources: default_min_sources(),
            deviation_threshold: None,
        }
    }
}

impl AggregationPolicy {
    pub fn new(method: AggregationMethod, min_sources: usize) -> Self {
        Self {
            method,
            min_sources,
            deviation_threshold: None,
        }
    }

    pub fn with_deviation_threshold(mut self, threshold: f64) -> Self {
        self.deviation_threshold = Some(threshold);
        self
    }

    /// Checks the policy bounds a builder form is expected to enforce.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.min_sources == 0 {
            return Err(crate::error::PipelineError::InvalidConfig(
                "minSources must be at least 1".into(),
            ));
        }
        if let Some(t) = self.deviation_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(crate::error::PipelineError::InvalidConfig(format!(
                    "deviationThreshold must be within [0, 1], got {t}"
                )));
            }
        }
        Ok(())
    }
}

/// Relative spread of the contributing readings, computed when the policy
/// carries a deviation threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviationReport {
    pub spread: f64,
    pub threshold: f64,
    pub exceeded: bool,
}

/// A successful aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consensus {
    pub value: f64,
    pub source_count: usize,
    pub method: AggregationMethod,
    pub deviation: Option<DeviationReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reading_has_no_usable_value() {
        let mut stale = SourceReading::error("kraken");
        stale.value = Some(99.0);
        assert_eq!(stale.usable_value(), None);
    }

    #[test]
    fn test_non_finite_value_is_not_usable() {
        assert_eq!(SourceReading::active("a", f64::NAN).usable_value(), None);
        assert_eq!(SourceReading::active("a", f64::INFINITY).usable_value(), None);
        assert_eq!(SourceReading::active("a", 0.0).usable_value(), Some(0.0));
    }

    #[test]
    fn test_effective_weight_defaults() {
        assert_eq!(SourceReading::active("a", 1.0).effective_weight(), 1.0);
        assert_eq!(SourceReading::active("a", 1.0).with_weight(0.0).effective_weight(), 1.0);
        assert_eq!(SourceReading::active("a", 1.0).with_weight(-3.0).effective_weight(), 1.0);
        assert_eq!(SourceReading::active("a", 1.0).with_weight(2.5).effective_weight(), 2.5);
    }

    #[test]
    fn test_policy_deserializes_builder_shape() {
        let policy: AggregationPolicy =
            serde_json::from_str(r#"{"type":"weighted","minSources":2,"deviationThreshold":0.05}"#)
                .unwrap();
        assert_eq!(policy.method, AggregationMethod::Weighted);
        assert_eq!(policy.min_sources, 2);
        assert_eq!(policy.deviation_threshold, Some(0.05));
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("Weighted".parse::<AggregationMethod>(), Ok(AggregationMethod::Weighted));
        assert_eq!(" median ".parse::<AggregationMethod>(), Ok(AggregationMethod::Median));
        assert!("mode".parse::<AggregationMethod>().is_err());
    }

    #[test]
    fn test_policy_validate() {
        assert!(AggregationPolicy::new(AggregationMethod::Mean, 1).validate().is_ok());
        assert!(AggregationPolicy::new(AggregationMethod::Mean, 0).validate().is_err());
        assert!(
            AggregationPolicy::default()
                .with_deviation_threshold(1.5)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_reading_deserializes_without_value() {
        let r: SourceReading =
            serde_json::from_str(r#"{"sourceId":"kraken","status":"error"}"#).unwrap();
        assert_eq!(r, SourceReading::error("kraken"));
    }
}

//! Failure kinds produced by the aggregation and extraction core.
//!
//! The fetch layer, config loading and the binary use `anyhow`; the pure
//! core returns [`PipelineError`] so callers can branch on the kind.

/// Every way the pipeline can decline to produce a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// Fewer active readings than the policy requires.
    #[error("need at least {required} active sources, got {active}")]
    InsufficientSources { required: usize, active: usize },

    /// A path segment addressed a missing field, an out-of-range index, or a
    /// non-container value.
    #[error("value not found at path '{path}' (segment '{segment}')")]
    PathNotFound { path: String, segment: String },

    /// The path resolved, but to an object, array or null.
    #[error("value at path '{path}' is {found}, not a scalar")]
    NotScalar { path: String, found: String },

    /// The path expression itself could not be parsed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A policy or extraction spec failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Short stable identifier for the kind, used in CSV records and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InsufficientSources { .. } => "insufficient_sources",
            PipelineError::PathNotFound { .. } => "path_not_found",
            PipelineError::NotScalar { .. } => "not_scalar",
            PipelineError::InvalidPath { .. } => "invalid_path",
            PipelineError::InvalidConfig(_) => "invalid_config",
        }
    }

    /// Retrying with fresh data can clear the failure without a config change.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::InsufficientSources { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_sources_message_is_actionable() {
        let err = PipelineError::InsufficientSources {
            required: 2,
            active: 1,
        };
        assert_eq!(err.to_string(), "need at least 2 active sources, got 1");
        assert_eq!(err.kind(), "insufficient_sources");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_path_errors_name_the_segment() {
        let err = PipelineError::PathNotFound {
            path: "$.bitcoin.eur".into(),
            segment: "eur".into(),
        };
        assert!(err.to_string().contains("'eur'"));
        assert!(!err.is_recoverable());
    }
}

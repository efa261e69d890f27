//! Value extraction and transform chain.
//!
//! Locates a scalar inside an arbitrary parsed document by path, then
//! normalizes it with an ordered list of numeric transforms. Both halves are
//! pure; fetching the document happens in [`crate::fetch`].

pub mod path;
pub mod scalar;
pub mod transform;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::format::value_type;

pub use path::{JsonPath, PathEntry, PathSegment, generate_path, list_paths};
pub use scalar::ScalarValue;
pub use transform::{TransformStep, apply_transforms};

/// Resolves `path` in `document` and returns the scalar found there.
///
/// # Errors
///
/// - [`PipelineError::InvalidPath`] if the expression does not parse.
/// - [`PipelineError::PathNotFound`] if any segment fails to resolve.
/// - [`PipelineError::NotScalar`] if the node is an object, array or null.
pub fn extract(document: &Value, path: &str) -> Result<ScalarValue> {
    let path = JsonPath::parse(path)?;
    extract_at(document, &path)
}

/// Same as [`extract`] for an already-parsed path.
pub fn extract_at(document: &Value, path: &JsonPath) -> Result<ScalarValue> {
    let node = path.resolve(document)?;
    ScalarValue::from_json(node).ok_or_else(|| PipelineError::NotScalar {
        path: path.as_str().to_string(),
        found: value_type(node).to_string(),
    })
}

/// Where to find the oracle value in a response and how to normalize it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSpec {
    #[serde(alias = "jsonPath")]
    pub path: String,
    #[serde(default)]
    pub transforms: Vec<TransformStep>,
}

impl ExtractionSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            transforms: Vec::new(),
        }
    }

    pub fn with_transform(mut self, step: TransformStep) -> Self {
        self.transforms.push(step);
        self
    }

    /// Checks that the path parses, without needing a document.
    pub fn validate(&self) -> Result<()> {
        JsonPath::parse(&self.path).map(|_| ())
    }

    /// Extracts the scalar and runs the transform chain over it.
    pub fn evaluate(&self, document: &Value) -> Result<ScalarValue> {
        let raw = extract(document, &self.path)?;
        let value = raw.apply(&self.transforms);
        debug!(
            path = %self.path,
            raw = %raw,
            value = %value,
            steps = self.transforms.len(),
            "Extracted value"
        );
        Ok(value)
    }
}

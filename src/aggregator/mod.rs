//! Multi-source consensus aggregation.
//!
//! Reduces a batch of per-source readings to one consensus value under a
//! median, mean or weighted policy, with a minimum-source check and an
//! advisory deviation report.

pub mod consensus;
pub mod types;
pub mod utility;

pub use consensus::aggregate;
pub use types::{
    AggregationMethod, AggregationPolicy, Consensus, DeviationReport, ReadingStatus,
    SourceReading,
};

pub mod aggregator;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod extract;
pub mod fetch;
pub mod format;
pub mod output;
pub mod record;
pub mod sources;

//! CLI entry point for the oracle value pipeline.
//!
//! Provides subcommands for evaluating configured price feeds and custom APIs,
//! testing extraction paths against a document, listing the paths a document
//! offers, and aggregating a saved batch of readings.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use oracle_pipeline::{
    aggregator::{AggregationMethod, AggregationPolicy, SourceReading},
    config::OracleConfig,
    evaluator::{evaluate_custom_api, evaluate_document, evaluate_price_feed, evaluate_readings},
    extract::{ExtractionSpec, TransformStep, list_paths},
    fetch::{BasicClient, fetch_bytes, parse_document},
    format::format_scalar,
    output::{append_record, print_json, print_pretty},
    record::{EvaluationRecord, RecordKind},
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "oracle_pipeline")]
#[command(about = "Aggregate and extract oracle values from HTTP data sources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and aggregate the price feeds of an oracle config
    Feed {
        /// Oracle config file (JSON)
        #[arg(short, long, default_value = "oracles.json")]
        config: String,

        /// Only evaluate the feed with this name
        #[arg(long)]
        name: Option<String>,

        /// Maximum number of concurrent source requests per feed
        #[arg(long, default_value_t = 5)]
        concurrency: usize,

        /// Sample rate: evaluate every X seconds
        #[arg(short = 'r', long, default_value_t = 60)]
        sample_rate: u64,

        /// Number of samples to collect (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 1)]
        num_samples: usize,

        /// CSV file to append results to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Call the custom APIs of an oracle config and extract their values
    Custom {
        /// Oracle config file (JSON)
        #[arg(short, long, default_value = "oracles.json")]
        config: String,

        /// Only evaluate the custom API with this name
        #[arg(long)]
        name: Option<String>,

        /// CSV file to append results to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Extract a value from a JSON document in a file or at a URL
    Extract {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Path to the value, e.g. `$.data.price` or `$.items[0].value`
        #[arg(short, long)]
        path: String,

        /// Transform steps applied in order, e.g. `-t multiply:100 -t round:2`
        #[arg(short, long = "transform")]
        transforms: Vec<TransformStep>,

        /// Decimal places used to display numeric results
        #[arg(short, long, default_value_t = 2)]
        decimals: usize,

        /// CSV file to append results to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List every leaf path of a JSON document in a file or at a URL
    Paths {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,
    },
    /// Aggregate a JSON array of source readings
    Aggregate {
        /// JSON file holding the readings
        #[arg(value_name = "READINGS")]
        readings: String,

        /// median, mean or weighted
        #[arg(short, long, default_value = "median")]
        method: AggregationMethod,

        /// Minimum number of active sources required
        #[arg(long, default_value_t = 1)]
        min_sources: usize,

        /// Maximum relative spread before a warning is raised, e.g. 0.05
        #[arg(long)]
        deviation_threshold: Option<f64>,

        /// Decimal places used to display the consensus
        #[arg(short, long, default_value_t = 2)]
        decimals: usize,

        /// CSV file to append results to
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/oracle_pipeline.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("oracle_pipeline.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Feed {
            config,
            name,
            concurrency,
            sample_rate,
            num_samples,
            output,
        } => {
            run_feeds(
                &config,
                name.as_deref(),
                concurrency,
                sample_rate,
                num_samples,
                output.as_deref(),
            )
            .await?;
        }
        Commands::Custom {
            config,
            name,
            output,
        } => {
            run_custom_apis(&config, name.as_deref(), output.as_deref()).await?;
        }
        Commands::Extract {
            source,
            path,
            transforms,
            decimals,
            output,
        } => {
            let document = parse_document(&fetcher(&source).await?);
            let spec = ExtractionSpec { path, transforms };

            let record = match evaluate_document(&document, &spec) {
                Ok(value) => {
                    info!(path = %spec.path, value = %format_scalar(&value, decimals), "Extracted");
                    EvaluationRecord::from_scalar(&value, decimals)
                }
                Err(e) => {
                    error!(path = %spec.path, error = %e, "Extraction failed");
                    EvaluationRecord::from_pipeline_error(&e)
                }
            }
            .with_name(&source)
            .with_kind(RecordKind::Extraction);

            emit(&record, output.as_deref())?;
        }
        Commands::Paths { source } => {
            let document = parse_document(&fetcher(&source).await?);
            let entries = list_paths(&document);

            for entry in &entries {
                info!(
                    path = %entry.path,
                    value_type = %entry.value_type,
                    preview = %entry.preview,
                    "Path"
                );
            }
            info!(total = entries.len(), "Path listing complete");
        }
        Commands::Aggregate {
            readings,
            method,
            min_sources,
            deviation_threshold,
            decimals,
            output,
        } => {
            let content = std::fs::read_to_string(&readings)
                .with_context(|| format!("failed to read readings file '{readings}'"))?;
            let batch: Vec<SourceReading> = serde_json::from_str(&content)
                .with_context(|| format!("invalid readings file '{readings}'"))?;

            let mut policy = AggregationPolicy::new(method, min_sources);
            policy.deviation_threshold = deviation_threshold;
            policy.validate()?;

            let record = match evaluate_readings(&batch, &policy) {
                Ok(consensus) => EvaluationRecord::from_consensus(&consensus, decimals),
                Err(e) => {
                    warn!(error = %e, "Aggregation produced no value");
                    EvaluationRecord::from_pipeline_error(&e)
                }
            }
            .with_name(&readings)
            .with_kind(RecordKind::Readings);

            emit(&record, output.as_deref())?;
        }
    }

    Ok(())
}

/// Logs a record and, when an output file is given, appends it there.
fn emit(record: &EvaluationRecord, output: Option<&str>) -> Result<()> {
    print_pretty(record);
    print_json(record)?;
    if let Some(path) = output {
        append_record(path, record)?;
    }
    Ok(())
}

/// Loads document data from a local file path or fetches it over HTTP.
#[tracing::instrument(fields(source = %url))]
async fn fetcher(url: &str) -> Result<Vec<u8>> {
    let bytes = if url.starts_with("http") {
        let client = BasicClient::new();
        fetch_bytes(&client, url).await?
    } else {
        std::fs::read(url).with_context(|| format!("failed to read '{url}'"))?
    };
    Ok(bytes)
}

/// Evaluates every configured price feed, collecting samples at a
/// configurable interval.
#[tracing::instrument(skip(output), fields(config_path, concurrency, sample_rate, num_samples))]
async fn run_feeds(
    config_path: &str,
    name: Option<&str>,
    concurrency: usize,
    sample_rate: u64,
    num_samples: usize,
    output: Option<&str>,
) -> Result<()> {
    let config = OracleConfig::load(config_path)?;
    let feeds: Vec<_> = config
        .feeds
        .iter()
        .filter(|f| name.is_none_or(|n| f.name == n))
        .collect();

    if feeds.is_empty() {
        bail!("no matching price feeds in '{config_path}'");
    }

    if num_samples == 0 {
        info!(sample_rate, "Sampling infinitely. Press Ctrl+C to stop.");
    } else {
        info!(num_samples, sample_rate, feed_count = feeds.len(), "Starting sample collection");
    }

    let client = Arc::new(BasicClient::new());
    let mut sample_count = 0;

    loop {
        // Check if we've reached the sample limit (0 = infinite)
        if num_samples > 0 && sample_count >= num_samples {
            break;
        }

        sample_count += 1;
        info!(sample = sample_count, "Starting sample round");

        for feed in &feeds {
            let evaluation = evaluate_price_feed(client.clone(), feed, concurrency).await;
            let record = evaluation.record(feed.decimals);
            if let Err(e) = emit(&record, output) {
                error!(feed = %feed.name, error = %e, "Failed to write record for feed");
            }
        }

        // If not the last sample, wait before next iteration
        if num_samples == 0 || sample_count < num_samples {
            info!(sample_rate, "Waiting before next sample");
            tokio::time::sleep(tokio::time::Duration::from_secs(sample_rate)).await;
        }
    }

    info!("Finished evaluating price feeds");
    Ok(())
}

/// Calls every configured custom API once.
#[tracing::instrument(skip(output), fields(config_path))]
async fn run_custom_apis(config_path: &str, name: Option<&str>, output: Option<&str>) -> Result<()> {
    let config = OracleConfig::load(config_path)?;
    let apis: Vec<_> = config
        .custom_apis
        .iter()
        .filter(|a| name.is_none_or(|n| a.name == n))
        .collect();

    if apis.is_empty() {
        bail!("no matching custom APIs in '{config_path}'");
    }

    let client = BasicClient::new();
    for api in apis {
        let record = match evaluate_custom_api(&client, api).await {
            Ok(evaluation) => evaluation.record(api.decimals),
            Err(e) => {
                error!(api = %api.name, error = %e, "Custom API request failed");
                EvaluationRecord::from_error("fetch_error", &e.to_string())
                    .with_name(&api.name)
                    .with_kind(RecordKind::CustomApi)
            }
        };
        emit(&record, output)?;
    }

    Ok(())
}

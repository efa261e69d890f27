use oracle_pipeline::aggregator::{AggregationMethod, AggregationPolicy, SourceReading, aggregate};
use oracle_pipeline::config::OracleConfig;
use oracle_pipeline::error::PipelineError;
use oracle_pipeline::evaluator::{evaluate_document, evaluate_readings};
use oracle_pipeline::extract::{ExtractionSpec, ScalarValue, TransformStep, extract, list_paths};
use oracle_pipeline::output::{append_record, read_records};
use oracle_pipeline::record::{EvaluationRecord, RecordKind};
use serde_json::Value;

fn fixture(json: &str) -> Value {
    serde_json::from_str(json).expect("Failed to parse fixture")
}

#[test]
fn test_readings_fixture_pipeline() {
    let readings: Vec<SourceReading> =
        serde_json::from_str(include_str!("fixtures/readings.json")).unwrap();

    let median = aggregate(&readings, &AggregationPolicy::new(AggregationMethod::Median, 2)).unwrap();
    assert_eq!(median.value, 102.0);
    assert_eq!(median.source_count, 2);

    let weighted =
        aggregate(&readings, &AggregationPolicy::new(AggregationMethod::Weighted, 1)).unwrap();
    assert!((weighted.value - 304.0 / 3.0).abs() < 1e-9);

    let strict = evaluate_readings(&readings, &AggregationPolicy::new(AggregationMethod::Mean, 3));
    assert_eq!(
        strict,
        Err(PipelineError::InsufficientSources {
            required: 3,
            active: 2
        })
    );
}

#[test]
fn test_custom_api_fixture_pipeline() {
    let config = OracleConfig::from_json(include_str!("fixtures/oracles.json")).unwrap();
    let api = config.custom_api("Solana subscribers").unwrap();
    let document = fixture(include_str!("fixtures/reddit_about.json"));

    let value = evaluate_document(&document, &api.extraction_spec()).unwrap();
    assert_eq!(value, ScalarValue::Number(1523400.0));

    let record = EvaluationRecord::from_scalar(&value, api.decimals)
        .with_name(&api.name)
        .with_kind(RecordKind::CustomApi);
    assert_eq!(record.display_value.as_deref(), Some("1523400"));
}

#[test]
fn test_config_fixture_loads() {
    let config = OracleConfig::from_json(include_str!("fixtures/oracles.json")).unwrap();
    assert_eq!(config.feeds.len(), 2);

    let btc = config.feed("BTC/USD Feed").unwrap();
    assert_eq!(btc.aggregator.min_sources, 2);
    assert_eq!(btc.aggregator.deviation_threshold, Some(0.05));
    assert_eq!(btc.sources[1].weight, Some(2.0));

    let kraken = &config.feed("SOL/USD Kraken").unwrap().sources[0];
    let resolved = kraken.resolve("SOL/USD").unwrap();
    assert_eq!(resolved.url, "https://api.kraken.com/0/public/Ticker?pair=SOLUSD");
    assert_eq!(resolved.path.as_str(), "$.result.SOLUSD.c[0]");
}

#[test]
fn test_extraction_paths_over_fixture() {
    let document = fixture(include_str!("fixtures/crypto_prices.json"));

    assert_eq!(
        extract(&document, "$.bitcoin.usd").unwrap(),
        ScalarValue::Number(45000.5)
    );
    assert_eq!(
        extract(&document, "$[\"bitcoin\"][\"eur\"]").unwrap(),
        ScalarValue::Number(41200.0)
    );
    assert_eq!(
        extract(&document, "items[0].value").unwrap(),
        ScalarValue::Text("45001.25".into())
    );
    assert!(matches!(
        extract(&document, "$.items[5].value"),
        Err(PipelineError::PathNotFound { .. })
    ));
    assert!(matches!(
        extract(&document, "$.meta"),
        Err(PipelineError::NotScalar { .. })
    ));
    assert!(matches!(
        extract(&document, "$.items[*].value"),
        Err(PipelineError::InvalidPath { .. })
    ));

    let text = ExtractionSpec::new("$.items[1].value").with_transform(TransformStep::Multiply { factor: 2.0 });
    assert_eq!(
        evaluate_document(&document, &text).unwrap(),
        ScalarValue::Text("n/a".into())
    );

    let scaled = ExtractionSpec::new("$.items[0].value")
        .with_transform(TransformStep::Multiply { factor: 100.0 })
        .with_transform(TransformStep::Round { decimals: 0 });
    assert_eq!(
        evaluate_document(&document, &scaled).unwrap(),
        ScalarValue::Number(4500125.0)
    );
}

#[test]
fn test_listed_paths_resolve() {
    let document = fixture(include_str!("fixtures/crypto_prices.json"));
    let entries = list_paths(&document);

    let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
    assert!(paths.contains(&"$.bitcoin.usd"));
    assert!(paths.contains(&"$.items[1].symbol"));
    assert!(paths.contains(&"$.meta"));

    for entry in entries.iter().filter(|e| e.path != "$.meta") {
        assert!(extract(&document, &entry.path).is_ok(), "{} did not resolve", entry.path);
    }
}

#[test]
fn test_records_csv_round_trip() {
    let path = format!("{}/oracle_pipeline_integration.csv", std::env::temp_dir().display());
    let _ = std::fs::remove_file(&path);

    let readings: Vec<SourceReading> =
        serde_json::from_str(include_str!("fixtures/readings.json")).unwrap();
    let policy = AggregationPolicy::new(AggregationMethod::Median, 2).with_deviation_threshold(0.01);
    let consensus = evaluate_readings(&readings, &policy).unwrap();

    let record = EvaluationRecord::from_consensus(&consensus, 2).with_name("BTC/USD Feed");
    append_record(&path, &record).unwrap();

    let back = read_records(&path).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].name.as_deref(), Some("BTC/USD Feed"));
    assert_eq!(back[0].value, Some(102.0));
    assert_eq!(back[0].deviation_exceeded, Some(true));

    std::fs::remove_file(&path).unwrap();
}

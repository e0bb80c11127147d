//! Integration Tests - End-to-end Bundle Run
//!
//! Tests the interaction between the `BundleRun` usecase, ports, and
//! both mock and real adapters. Uses mockall for trait mocking and
//! tokio::test for async tests.

use std::sync::Arc;

use mockall::mock;
use rust_decimal_macros::dec;

use lure_bundler::adapters::feeds::JsonCatalogSource;
use lure_bundler::adapters::metrics::MetricsFileWriter;
use lure_bundler::adapters::persistence::{CsvLayout, CsvReportWriter, JsonReportWriter};
use lure_bundler::domain::{price_map, BundleAllocator, BundleRules, Product};
use lure_bundler::ports::report::AllocationReport;
use lure_bundler::usecases::BundleRun;

// ---- Mock Definitions ----

mock! {
    pub Catalog {}

    #[async_trait::async_trait]
    impl lure_bundler::ports::catalog::CatalogSource for Catalog {
        async fn load_catalog(&self) -> anyhow::Result<Vec<Product>>;
        fn describe(&self) -> String;
    }
}

mock! {
    pub Sink {}

    #[async_trait::async_trait]
    impl lure_bundler::ports::report::ReportSink for Sink {
        async fn write_report(&self, report: &AllocationReport) -> anyhow::Result<()>;
        fn name(&self) -> &'static str;
    }
}

fn uniform(n: usize) -> Vec<Product> {
    (0..n)
        .map(|i| {
            Product::new(
                format!("P{i}"),
                format!("Lure {i}"),
                price_map([("USD", dec!(16)), ("AUD", dec!(23))]),
                Some(dec!(850)),
            )
        })
        .collect()
}

fn allocator() -> BundleAllocator {
    BundleAllocator::new(BundleRules::default()).unwrap()
}

fn catalog_returning(products: Vec<Product>) -> MockCatalog {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_load_catalog()
        .times(1)
        .returning(move || Ok(products.clone()));
    catalog.expect_describe().returning(|| "mock-feed".to_string());
    catalog
}

// ---- Integration Tests ----

#[tokio::test]
async fn test_run_hands_report_to_every_sink() {
    let catalog = catalog_returning(uniform(7));

    let mut first = MockSink::new();
    first
        .expect_write_report()
        .withf(|report: &AllocationReport| {
            report.outcome.bundles.len() == 1 && report.outcome.leftovers.len() == 1
        })
        .times(1)
        .returning(|_| Ok(()));
    first.expect_name().return_const("first");

    let mut second = MockSink::new();
    second
        .expect_write_report()
        .withf(|report: &AllocationReport| report.run_name == "integration")
        .times(1)
        .returning(|_| Ok(()));
    second.expect_name().return_const("second");

    let run = BundleRun::new(Arc::new(catalog), allocator(), "integration")
        .with_sink(Arc::new(first))
        .with_sink(Arc::new(second));

    let report = run.execute().await.unwrap();
    assert_eq!(report.outcome.stats.catalog_size, 7);
    assert_eq!(report.bundle_summaries()[0].label, "BUNDLE-001");
}

#[tokio::test]
async fn test_catalog_failure_skips_sinks() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_load_catalog()
        .times(1)
        .returning(|| Err(anyhow::anyhow!("feed unreachable")));
    catalog.expect_describe().returning(|| "mock-feed".to_string());

    let mut sink = MockSink::new();
    sink.expect_write_report().times(0);
    sink.expect_name().return_const("unused");

    let run = BundleRun::new(Arc::new(catalog), allocator(), "failing")
        .with_sink(Arc::new(sink));

    let err = run.execute().await.unwrap_err();
    assert!(format!("{err:#}").contains("feed unreachable"));
}

#[tokio::test]
async fn test_sink_failure_stops_later_sinks() {
    let catalog = catalog_returning(uniform(6));

    let mut broken = MockSink::new();
    broken
        .expect_write_report()
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("disk full")));
    broken.expect_name().return_const("broken");

    let mut later = MockSink::new();
    later.expect_write_report().times(0);
    later.expect_name().return_const("later");

    let run = BundleRun::new(Arc::new(catalog), allocator(), "sink-failure")
        .with_sink(Arc::new(broken))
        .with_sink(Arc::new(later));

    let err = run.execute().await.unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("broken"));
    assert!(message.contains("disk full"));
}

#[tokio::test]
async fn test_jsonl_feed_to_report_files() {
    let dir = tempfile::tempdir().unwrap();
    let feed = dir.path().join("products.jsonl");

    let mut lines = String::new();
    for i in 0..6 {
        lines.push_str(&format!(
            "{{\"id\":\"L{i}\",\"name_en\":\"Minnow {i}\",\"cost\":850,\"prices\":{{\"USD\":16,\"AUD\":23}}}}\n"
        ));
    }
    lines.push_str("not json\n");
    lines.push_str("{\"id\":\"L9\",\"name_en\":\"Crank\",\"price_map\":{\"USD\":\"15.5\",\"AUD\":\"22\"}}\n");
    std::fs::write(&feed, lines).unwrap();

    let out = dir.path().join("out");
    let run = BundleRun::new(Arc::new(JsonCatalogSource::new(&feed)), allocator(), "files")
        .with_sink(Arc::new(CsvReportWriter::new(out.join("bundles.csv"), CsvLayout::Bundles)))
        .with_sink(Arc::new(CsvReportWriter::new(out.join("flat.csv"), CsvLayout::Flattened)))
        .with_sink(Arc::new(JsonReportWriter::new(out.join("report.json"))))
        .with_sink(Arc::new(MetricsFileWriter::new(out.join("metrics.prom")).unwrap()));

    let report = run.execute().await.unwrap();
    assert_eq!(report.outcome.bundles.len(), 1);
    assert_eq!(report.outcome.excluded.len(), 1);

    let csv = std::fs::read_to_string(out.join("bundles.csv")).unwrap();
    assert!(csv.contains("BUNDLE-001,\"L0,L1,L2,L3,L4,L5\",96,138,850"));

    let flat = std::fs::read_to_string(out.join("flat.csv")).unwrap();
    assert_eq!(flat.lines().count(), 7);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("report.json")).unwrap()).unwrap();
    assert_eq!(json["excluded"][0]["id"], "L9");

    let metrics = std::fs::read_to_string(out.join("metrics.prom")).unwrap();
    assert!(metrics.contains("lure_bundler_exclusions{reason=\"missing_cost\"} 1"));
}

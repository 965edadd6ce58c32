//! Collector contract tests
//!
//! Drive the collector through stub probers returning captured reports, so
//! no live zpool is needed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use zpool_exporter::collector::{Prober, ZpoolCollector};
use zpool_exporter::error::{ExporterError, Result};
use zpool_exporter::zpool::probe::RawReport;

/// Stub prober serving canned reports per pool; pools absent from the map
/// fail their probe. Shared as `Arc` so tests can swap reports mid-run.
struct MapProber {
    reports: Mutex<HashMap<String, RawReport>>,
}

impl MapProber {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            reports: Mutex::new(HashMap::new()),
        })
    }

    fn set(&self, pool: &str, capacity: &str, status: &str) {
        self.reports.lock().unwrap().insert(
            pool.to_string(),
            RawReport {
                status: status.to_string(),
                capacity: capacity.to_string(),
            },
        );
    }

    fn clear(&self, pool: &str) {
        self.reports.lock().unwrap().remove(pool);
    }
}

impl Prober for MapProber {
    fn probe(&self, pool: &str) -> Result<RawReport> {
        self.reports
            .lock()
            .unwrap()
            .get(pool)
            .cloned()
            .ok_or_else(|| ExporterError::ProbeFailed {
                pool: pool.to_string(),
                reason: "stubbed failure".to_string(),
            })
    }
}

const TWO_MEMBER_STATUS: &str = "\tsda  ONLINE   0 0 0\n\tsdb  FAULTED  0 0 0\n";

fn pools(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Render collected families through the standard text exposition format and
/// pull out the sample value for (metric, pool).
fn gauge_value(families: &[MetricFamily], metric: &str, pool: &str) -> Option<f64> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(families, &mut buffer)
        .expect("Failed to encode families");
    let text = String::from_utf8(buffer).expect("Non-UTF-8 exposition");

    let needle = format!("{metric}{{name=\"{pool}\"}} ");
    text.lines()
        .find_map(|line| line.strip_prefix(&needle))
        .and_then(|value| value.trim().parse().ok())
}

#[test]
fn test_describe_yields_three_descs_per_pool() {
    // Given: A collector over two pools, before any probe has run
    let collector =
        ZpoolCollector::with_prober(pools(&["tank", "backup"]), MapProber::new()).unwrap();

    // When: Describing the metric shape
    let descs = collector.desc();

    // Then: Exactly 3 declarations per pool, each labeled with its pool name
    assert_eq!(descs.len(), 6);
    for pool in ["tank", "backup"] {
        let labeled = descs
            .iter()
            .filter(|d| d.const_label_pairs.iter().any(|l| l.value() == pool))
            .count();
        assert_eq!(labeled, 3, "expected 3 descs for pool {pool}");
    }
}

#[test]
fn test_collect_emits_three_gauges_per_pool() {
    // Given: A collector with a healthy report for its pool
    let prober = MapProber::new();
    prober.set("tank", "73%\n", TWO_MEMBER_STATUS);
    let collector = ZpoolCollector::with_prober(pools(&["tank"]), prober).unwrap();

    // When: Collecting
    let families = collector.collect();

    // Then: The three fixed gauges reflect the parsed report
    assert_eq!(families.len(), 3);
    assert_eq!(
        gauge_value(&families, "zpool_capacity_percentage", "tank"),
        Some(73.0)
    );
    assert_eq!(
        gauge_value(&families, "zpool_online_providers_count", "tank"),
        Some(1.0)
    );
    assert_eq!(
        gauge_value(&families, "zpool_faulted_providers_count", "tank"),
        Some(1.0)
    );
}

#[test]
fn test_probe_failure_is_isolated_per_pool() {
    // Given: Pool "broken" fails its probe, pool "tank" succeeds
    let prober = MapProber::new();
    prober.set("tank", "10%\n", TWO_MEMBER_STATUS);
    let collector = ZpoolCollector::with_prober(pools(&["broken", "tank"]), prober).unwrap();

    // When: Collecting in the same scrape
    let families = collector.collect();

    // Then: tank's metrics are emitted, broken falls back to zeros
    assert_eq!(
        gauge_value(&families, "zpool_capacity_percentage", "tank"),
        Some(10.0)
    );
    assert_eq!(
        gauge_value(&families, "zpool_capacity_percentage", "broken"),
        Some(0.0)
    );
    assert_eq!(
        gauge_value(&families, "zpool_online_providers_count", "broken"),
        Some(0.0)
    );
}

#[test]
fn test_failed_probe_keeps_stale_values() {
    // Given: A pool that probes successfully once
    let prober = MapProber::new();
    prober.set("tank", "55%\n", TWO_MEMBER_STATUS);
    let collector = ZpoolCollector::with_prober(pools(&["tank"]), prober.clone()).unwrap();
    let first = collector.collect();
    assert_eq!(
        gauge_value(&first, "zpool_capacity_percentage", "tank"),
        Some(55.0)
    );

    // When: The next probe fails
    prober.clear("tank");
    let second = collector.collect();

    // Then: The cached record from the last success is emitted unchanged
    assert_eq!(
        gauge_value(&second, "zpool_capacity_percentage", "tank"),
        Some(55.0)
    );
    assert_eq!(
        gauge_value(&second, "zpool_online_providers_count", "tank"),
        Some(1.0)
    );
}

#[test]
fn test_parse_failure_keeps_stale_values() {
    // Given: A successful first probe
    let prober = MapProber::new();
    prober.set("tank", "40%\n", TWO_MEMBER_STATUS);
    let collector = ZpoolCollector::with_prober(pools(&["tank"]), prober.clone()).unwrap();
    collector.collect();

    // When: The tool starts emitting garbage
    prober.set("tank", "garbage\n", "not a report\n");
    let families = collector.collect();

    // Then: The cached record is unchanged from its prior value
    assert_eq!(
        gauge_value(&families, "zpool_capacity_percentage", "tank"),
        Some(40.0)
    );
}

#[test]
fn test_repeated_collect_is_idempotent() {
    // Given: Unchanged external pool state
    let prober = MapProber::new();
    prober.set("tank", "73%\n", TWO_MEMBER_STATUS);
    let collector = ZpoolCollector::with_prober(pools(&["tank"]), prober).unwrap();

    // When: Collecting repeatedly
    let runs: Vec<_> = (0..3).map(|_| collector.collect()).collect();

    // Then: Every run produces numerically identical values
    for families in &runs {
        assert_eq!(
            gauge_value(families, "zpool_capacity_percentage", "tank"),
            Some(73.0)
        );
        assert_eq!(
            gauge_value(families, "zpool_online_providers_count", "tank"),
            Some(1.0)
        );
        assert_eq!(
            gauge_value(families, "zpool_faulted_providers_count", "tank"),
            Some(1.0)
        );
    }
}

/// Prober that records which thread probed which pool, with an artificial
/// delay so interleaving would be observable.
struct RecordingProber {
    events: Arc<Mutex<Vec<(thread::ThreadId, String)>>>,
}

impl Prober for RecordingProber {
    fn probe(&self, pool: &str) -> Result<RawReport> {
        self.events
            .lock()
            .unwrap()
            .push((thread::current().id(), pool.to_string()));
        thread::sleep(Duration::from_millis(30));
        Ok(RawReport {
            status: TWO_MEMBER_STATUS.to_string(),
            capacity: "73%\n".to_string(),
        })
    }
}

#[test]
fn test_concurrent_collects_do_not_interleave() {
    // Given: Two threads scraping the same collector over two pools, with a
    // delayed instrumented probe
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = Arc::new(
        ZpoolCollector::with_prober(
            pools(&["tank", "backup"]),
            RecordingProber {
                events: events.clone(),
            },
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let collector = collector.clone();
            thread::spawn(move || {
                collector.collect();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Then: All probe events of one collect complete before the other
    // starts; thread ids never alternate
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 4);
    let ids: Vec<_> = events.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids[0], ids[1], "probe sequences interleaved: {events:?}");
    assert_eq!(ids[2], ids[3], "probe sequences interleaved: {events:?}");
    assert_ne!(ids[0], ids[2], "expected two distinct collect calls");
}

#[test]
fn test_describe_runs_before_and_during_collect() {
    // Given: A collector whose probe never succeeds
    let collector = ZpoolCollector::with_prober(pools(&["tank"]), MapProber::new()).unwrap();

    // When/Then: desc() needs no fresh values and keeps its shape across
    // collect calls
    assert_eq!(collector.desc().len(), 3);
    collector.collect();
    assert_eq!(collector.desc().len(), 3);
}

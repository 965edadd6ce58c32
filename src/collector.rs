//! Metric Collector
//!
//! Implements the pull-collector contract of the prometheus crate for a set
//! of zpools: `desc` declares the fixed per-pool metric shape, `collect`
//! refreshes every pool's status and emits the current gauge values.
//!
//! # Metrics Produced
//! - `zpool_capacity_percentage` - Current zpool capacity level
//! - `zpool_online_providers_count` - Number of ONLINE zpool providers (disks)
//! - `zpool_faulted_providers_count` - Number of FAULTED/UNAVAIL zpool providers (disks)
//!
//! Each metric carries the pool name as a const `name` label.
//!
//! # Concurrency
//!
//! A single mutex around the status cache is held for the full duration of
//! `collect`, so two concurrent scrapes can never interleave their probe
//! sequences. `desc` reads only immutable state and may run concurrently
//! with `collect`.
//!
//! # Error Handling
//!
//! A probe or parse failure for one pool is logged and skipped; the pool's
//! previously cached values (or zeros before the first success) are emitted
//! instead, and every other pool is still refreshed. A scrape as a whole
//! never fails because of a single pool.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use tracing::{debug, warn};

use crate::error::Result;
use crate::zpool::{self, PoolStatus, RawReport};

const CAPACITY_METRIC: &str = "zpool_capacity_percentage";
const CAPACITY_HELP: &str = "Current zpool capacity level";
const ONLINE_METRIC: &str = "zpool_online_providers_count";
const ONLINE_HELP: &str = "Number of ONLINE zpool providers (disks)";
const FAULTED_METRIC: &str = "zpool_faulted_providers_count";
const FAULTED_HELP: &str = "Number of FAULTED/UNAVAIL zpool providers (disks)";

/// Seam between the collector and the external inspection mechanism.
///
/// Lets tests drive the collector with captured reports instead of a live
/// `zpool` binary.
pub trait Prober: Send + Sync {
    fn probe(&self, pool: &str) -> Result<RawReport>;
}

impl<P: Prober + ?Sized> Prober for Arc<P> {
    fn probe(&self, pool: &str) -> Result<RawReport> {
        (**self).probe(pool)
    }
}

/// Production prober delegating to the `zpool` tool.
pub struct ZpoolProber {
    timeout: Duration,
}

impl ZpoolProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Prober for ZpoolProber {
    fn probe(&self, pool: &str) -> Result<RawReport> {
        zpool::probe_pool(pool, self.timeout)
    }
}

/// Collects zpool status from the configured pools and exports it through
/// the prometheus collector contract.
pub struct ZpoolCollector<P = ZpoolProber> {
    pools: Vec<String>,
    descs: Vec<Desc>,
    prober: P,
    /// Last successfully parsed record per pool; absent before the first
    /// success. Held for the whole of `collect` to serialize scrapes.
    cache: Mutex<HashMap<String, PoolStatus>>,
}

impl ZpoolCollector<ZpoolProber> {
    pub fn new(pools: Vec<String>, probe_timeout: Duration) -> Result<Self> {
        Self::with_prober(pools, ZpoolProber::new(probe_timeout))
    }
}

impl<P: Prober> ZpoolCollector<P> {
    pub fn with_prober(pools: Vec<String>, prober: P) -> Result<Self> {
        let mut descs = Vec::with_capacity(pools.len() * 3);
        for pool in &pools {
            for (name, help) in [
                (CAPACITY_METRIC, CAPACITY_HELP),
                (ONLINE_METRIC, ONLINE_HELP),
                (FAULTED_METRIC, FAULTED_HELP),
            ] {
                descs.push(Desc::new(
                    name.to_string(),
                    help.to_string(),
                    Vec::new(),
                    HashMap::from([("name".to_string(), pool.clone())]),
                )?);
            }
        }
        Ok(Self {
            pools,
            descs,
            prober,
            cache: Mutex::new(HashMap::new()),
        })
    }
}

impl<P: Prober> Collector for ZpoolCollector<P> {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        for pool in &self.pools {
            let refreshed = self
                .prober
                .probe(pool)
                .and_then(|report| PoolStatus::from_report(&report));
            match refreshed {
                Ok(status) => {
                    debug!(
                        "Refreshed pool '{}': capacity {}%, {} online, {} faulted",
                        pool, status.capacity_percent, status.online_members, status.faulted_members
                    );
                    cache.insert(pool.clone(), status);
                }
                Err(e) => {
                    warn!("Skipping refresh of pool '{}': {}", pool, e);
                }
            }
        }

        let mut families = Vec::with_capacity(3);
        for (name, help, value_of) in [
            (CAPACITY_METRIC, CAPACITY_HELP, capacity_value as ValueFn),
            (ONLINE_METRIC, ONLINE_HELP, online_value as ValueFn),
            (FAULTED_METRIC, FAULTED_HELP, faulted_value as ValueFn),
        ] {
            emit_gauge_family(&mut families, name, help, &self.pools, &cache, value_of);
        }
        families
    }
}

type ValueFn = fn(PoolStatus) -> f64;

fn capacity_value(status: PoolStatus) -> f64 {
    f64::from(status.capacity_percent)
}

fn online_value(status: PoolStatus) -> f64 {
    status.online_members as f64
}

fn faulted_value(status: PoolStatus) -> f64 {
    status.faulted_members as f64
}

/// Emits one metric family with the pool name as label, one sample per pool.
fn emit_gauge_family(
    families: &mut Vec<MetricFamily>,
    name: &str,
    help: &str,
    pools: &[String],
    cache: &HashMap<String, PoolStatus>,
    value_of: ValueFn,
) {
    match GaugeVec::new(Opts::new(name, help), &["name"]) {
        Ok(gauges) => {
            for pool in pools {
                let status = cache.get(pool).copied().unwrap_or_default();
                gauges.with_label_values(&[pool]).set(value_of(status));
            }
            families.extend(gauges.collect());
        }
        Err(e) => {
            // Metric names and the label set are static; this cannot fail.
            warn!("Failed to build gauge family {}: {}", name, e);
        }
    }
}

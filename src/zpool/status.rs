//! Status Parser
//!
//! Turns the raw zpool report text into a typed [`PoolStatus`] record. The
//! report is semi-structured tabular text with no fixed column schema across
//! zpool versions, so everything here matches on known keywords instead of
//! positional offsets: extra columns, reordered fields and unknown status
//! tokens are tolerated and ignored.
//!
//! The parser is pure - it never touches the external tool - so it can be
//! tested against captured report strings.

use crate::error::{ExporterError, Result};
use crate::zpool::probe::RawReport;

/// Member state token reported for healthy providers.
const ONLINE_TOKEN: &str = "ONLINE";

/// Member state tokens aggregated into the unhealthy count.
const UNHEALTHY_TOKENS: [&str; 5] = ["FAULTED", "UNAVAIL", "DEGRADED", "OFFLINE", "REMOVED"];

/// Header and label lines in `zpool status` output that never describe a
/// single member.
const LABEL_PREFIXES: [&str; 10] = [
    "pool:", "state:", "status:", "action:", "see:", "scan:", "scrub:", "config:", "errors:",
    "NAME",
];

/// Vdev grouping rows; their state summarizes children and must not be
/// counted as a member of its own.
const GROUPING_PREFIXES: [&str; 10] = [
    "mirror", "raidz", "draid", "replacing", "spare-", "logs", "cache", "spares", "special",
    "dedup",
];

/// The last successfully parsed status of one pool.
///
/// `Default` is the pre-first-probe value: all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatus {
    /// Capacity used, 0-100.
    pub capacity_percent: u8,
    /// Members in ONLINE state.
    pub online_members: u64,
    /// Members in FAULTED, UNAVAIL, DEGRADED, OFFLINE or REMOVED state.
    pub faulted_members: u64,
}

impl PoolStatus {
    /// Parses a full raw report into a status record.
    ///
    /// All-or-nothing: any failure leaves the caller's cached record
    /// untouched, there is no partially updated state.
    pub fn from_report(report: &RawReport) -> Result<Self> {
        let capacity_percent = parse_capacity(&report.capacity)?;
        let (online_members, faulted_members) = parse_member_counts(&report.status)?;
        Ok(Self {
            capacity_percent,
            online_members,
            faulted_members,
        })
    }
}

/// Extracts the capacity-used percentage from report text.
///
/// The first whitespace-separated token of the form `<integer>%` with the
/// integer in 0-100 wins; a label such as `capacity:` in front of it is
/// tolerated.
pub fn parse_capacity(text: &str) -> Result<u8> {
    for token in text.split_whitespace() {
        if let Some(digits) = token.strip_suffix('%') {
            if let Ok(value) = digits.parse::<u8>() {
                if value <= 100 {
                    return Ok(value);
                }
            }
            return Err(ExporterError::ParseFailed(format!(
                "capacity token '{token}' is not a percentage in 0-100"
            )));
        }
    }
    Err(ExporterError::ParseFailed(format!(
        "no capacity token found in '{}'",
        text.trim()
    )))
}

/// Counts healthy and unhealthy members in a `zpool status` report.
///
/// Returns `(online, faulted)`. A line counts as a member when it is neither
/// a header/label line, nor a vdev grouping row, nor the pool's own summary
/// row (identified via the `pool:` header), and it carries a recognized state
/// token. Zero recognized members means the report shape is unknown and the
/// parse fails.
pub fn parse_member_counts(text: &str) -> Result<(u64, u64)> {
    let pool_name = text
        .lines()
        .map(str::trim_start)
        .find_map(|line| line.strip_prefix("pool:"))
        .map(str::trim);

    let mut online = 0u64;
    let mut faulted = 0u64;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || is_label_line(trimmed) || is_grouping_line(trimmed) {
            continue;
        }

        let mut tokens = trimmed.split_whitespace();
        let first = match tokens.next() {
            Some(first) => first,
            None => continue,
        };
        if pool_name == Some(first) {
            continue;
        }

        for token in std::iter::once(first).chain(tokens) {
            if token == ONLINE_TOKEN {
                online += 1;
                break;
            }
            if UNHEALTHY_TOKENS.contains(&token) {
                faulted += 1;
                break;
            }
        }
    }

    if online == 0 && faulted == 0 {
        return Err(ExporterError::ParseFailed(
            "no recognizable member lines in zpool status report".to_string(),
        ));
    }
    Ok((online, faulted))
}

fn is_label_line(trimmed: &str) -> bool {
    LABEL_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
}

fn is_grouping_line(trimmed: &str) -> bool {
    let first = trimmed.split_whitespace().next().unwrap_or("");
    GROUPING_PREFIXES
        .iter()
        .any(|prefix| first.starts_with(prefix))
}

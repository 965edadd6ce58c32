//! Status Probe
//!
//! Invokes the external `zpool` tool for a single pool and captures its
//! textual reports verbatim. Two subcommands make up one probe:
//!
//! - `zpool status <pool>` - member (provider) states
//! - `zpool list -H -o capacity <pool>` - capacity used, e.g. `73%`
//!
//! Every invocation is bounded by a deadline: a child that has not exited in
//! time is killed and reaped, and the probe fails for that pool only. Probe
//! failures are never fatal to the process and are never retried - the next
//! scrape is a fresh attempt.

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{ExporterError, Result};

const ZPOOL_BIN: &str = "zpool";
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Verbatim output of one probe, as produced by the external tool.
#[derive(Debug, Clone)]
pub struct RawReport {
    /// `zpool status` output for the pool.
    pub status: String,
    /// `zpool list -H -o capacity` output for the pool.
    pub capacity: String,
}

/// Runs a full probe of one pool and returns its raw report.
pub fn probe_pool(pool: &str, timeout: Duration) -> Result<RawReport> {
    let status = run_zpool(pool, &["status", pool], timeout)?;
    let capacity = run_zpool(pool, &["list", "-H", "-o", "capacity", pool], timeout)?;
    Ok(RawReport { status, capacity })
}

/// Checks that the external tool recognizes the pool name.
///
/// Used once at startup; an unknown pool is a configuration error, not a
/// probe error.
pub fn pool_exists(pool: &str, timeout: Duration) -> Result<()> {
    run_zpool(pool, &["list", "-H", "-o", "name", pool], timeout)
        .map(|_| ())
        .map_err(|e| ExporterError::Config(format!("pool '{pool}' failed validation: {e}")))
}

/// Spawns one `zpool` invocation and waits for it under a deadline.
fn run_zpool(pool: &str, args: &[&str], timeout: Duration) -> Result<String> {
    debug!(pool, ?args, "invoking zpool");

    let mut child = Command::new(ZPOOL_BIN)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| probe_failed(pool, format!("failed to spawn {ZPOOL_BIN}: {e}")))?;

    let deadline = Instant::now() + timeout;
    let exit = loop {
        match child.try_wait() {
            Ok(Some(exit)) => break exit,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(probe_failed(
                        pool,
                        format!("{ZPOOL_BIN} {} timed out after {timeout:?}", args.join(" ")),
                    ));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(probe_failed(pool, format!("failed to wait for child: {e}")));
            }
        }
    };

    // zpool reports are far smaller than the pipe buffer, so the child can
    // never block on a full pipe before exiting; draining after exit is safe.
    let output = child
        .wait_with_output()
        .map_err(|e| probe_failed(pool, format!("failed to read output: {e}")))?;

    if !exit.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(probe_failed(
            pool,
            format!("{ZPOOL_BIN} exited with {exit}: {}", stderr.trim()),
        ));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| probe_failed(pool, format!("non-UTF-8 output: {e}")))
}

fn probe_failed(pool: &str, reason: String) -> ExporterError {
    ExporterError::ProbeFailed {
        pool: pool.to_string(),
        reason,
    }
}

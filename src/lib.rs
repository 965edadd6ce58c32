//! Zpool Prometheus Exporter
//!
//! A Prometheus metrics exporter for ZFS zpool health and capacity.
//!
//! # Overview
//!
//! On every scrape the exporter invokes the `zpool` command-line tool for
//! each configured pool, parses the textual report into a typed status
//! record, and exposes three gauges per pool: capacity used (percent),
//! ONLINE provider count and FAULTED/UNAVAIL provider count.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    child process     ┌──────────────┐
//! │   zpool     │ ◄──────────────────► │   Exporter   │
//! │   binary    │   status / list      │              │
//! └─────────────┘                      │  ┌────────┐  │      HTTP      ┌────────────┐
//!                                      │  │ Probe  │  │ ◄────────────► │ Prometheus │
//!                                      │  └────────┘  │   /metrics     └────────────┘
//!                                      │  ┌────────┐  │
//!                                      │  │ Parser │  │
//!                                      │  └────────┘  │
//!                                      └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`zpool`] - zpool invocation and report parsing
//! - [`collector`] - prometheus collector contract and status cache
//! - [`server`] - HTTP server exposing the scrape endpoint
//! - [`config`] - configuration management
//! - [`error`] - error types
//!
//! # Quick Start
//!
//! ```no_run
//! use zpool_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! Every scrape reflects only the latest synchronous inspection: no
//! persistence, no alerting, no historical aggregation.

pub mod collector;
pub mod config;
pub mod error;
pub mod server;
pub mod zpool;

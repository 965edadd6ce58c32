//! Invocation of the `zpool` tool and parsing of its reports.

pub mod probe;
pub mod status;

pub use probe::{pool_exists, probe_pool, RawReport};
pub use status::PoolStatus;

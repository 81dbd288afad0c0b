//! Core types and refresh wiring for the vypadek utility outage monitor.

/// Aggregator that merges per-address lookups into one cached view.
pub mod aggregator;
/// Wall clock abstraction and refresh bookkeeping.
pub mod clock;
/// Configuration surface consumed from the host.
pub mod config;
/// Domain models shared by the core and the fetchers.
pub mod model;
/// Fixed pool of per-address fetchers.
pub mod pool;
/// Traits describing the fetcher interface.
pub mod ports;
/// Projection of the aggregate view into a host-facing signal.
pub mod signal;

pub use aggregator::*;
pub use clock::*;
pub use config::*;
pub use model::*;
pub use pool::*;
pub use ports::*;
pub use signal::*;

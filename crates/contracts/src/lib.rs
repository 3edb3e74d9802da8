//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - All latency values are milliseconds as `f64`
//! - Fractional milliseconds are meaningful (sub-millisecond sinks)

mod config;
mod error;
mod estimate;
mod failure;
mod sink;

pub use config::*;
pub use error::*;
pub use estimate::*;
pub use failure::*;
pub use sink::*;

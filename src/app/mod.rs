//! Host-facing orchestration.
//!
//! - full pipeline runs over one estimator response (`pipeline`)

pub mod pipeline;

pub use pipeline::*;

//! Estimator response model.
//!
//! - typed response structs + JSON decoding (`response`)

pub mod response;

pub use response::*;

//! `sdid-effects` library crate.
//!
//! Turns raw Synthetic Difference-in-Differences (SDID) estimator results
//! into chart-ready series and placebo significance statistics:
//!
//! - `normalize`: flatten paired estimator lines into per-unit treated /
//!   synthetic-control point sequences
//! - `align`: reconcile date coverage, apply intercept offsets, derive
//!   relative (treated-minus-control) series, compute axis ranges
//! - `assemble`: resolve the display mode into a final line set, including
//!   optional multi-unit mean aggregation
//! - `placebo`: pre/post prediction-error ratios, outlier filtering,
//!   ranking, and optional histogram binning
//!
//! Every stage is a pure function over immutable inputs: no I/O, no shared
//! state, and identical inputs produce identical output. The host
//! application owns rendering, persistence, and the call to the estimation
//! service.

pub mod align;
pub mod app;
pub mod assemble;
pub mod data;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod placebo;
pub mod report;

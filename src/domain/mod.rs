//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - chart line primitives (`SeriesPoint`, `Line`)
//! - normalized estimator output records (`NormalizedOutput`)
//! - placebo inference results (`PlaceboStatistic`)
//! - display configuration (`ChartOptions`) and raw panel inputs (`PanelData`)

pub mod types;

pub use types::*;

//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced fresh on every pipeline invocation
//! - compared structurally (the host memoizes by input equality)
//! - exported to JSON for snapshots or downstream tooling

use serde::{Deserialize, Serialize};

/// Unit-name prefix given to synthetic-control lines.
pub const SYNTHETIC_UNIT: &str = "Synthetic";

/// Color tag for treated lines built from raw panel data.
pub const COLOR_TREATED: &str = "treated";
/// Color tag for control lines built from raw panel data.
pub const COLOR_CONTROL: &str = "control";
/// Color tag for derived treated-minus-control lines.
pub const COLOR_RELATIVE: &str = "relative";
/// Color tag for the zero reference line in relative/placebo modes.
pub const COLOR_REFERENCE: &str = "reference";

/// A single observation on a chart line.
///
/// `value` is `None` only for placeholder points synthesized at
/// time-alignment gaps. A `None` value tells the renderer "no data here,
/// do not connect a line segment across this date".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: i64,
    pub value: Option<f64>,
    pub unit: String,
    pub color: String,
}

/// A chart line: the ordered point sequence for one unit.
pub type Line = Vec<SeriesPoint>;

/// Synthetic-control weights as reported by the estimator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthControlWeights {
    pub dimnames: Vec<String>,
    pub weights: Vec<f64>,
}

/// Normalized output for one treated unit of a standard (non-placebo) run.
///
/// The line arrays hold the lines of *all* treated units processed up to and
/// including this one, because all treated units share one chart. The record
/// for the last treated unit therefore carries the complete line set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardOutput {
    pub treated_unit: String,
    pub output_lines_treated: Vec<Line>,
    pub output_lines_control: Vec<Line>,
    pub intercept_offset: Vec<f64>,
    pub sdid_estimate: f64,
    pub time_before_intervention: i64,
    pub time_after_intervention: i64,
    pub treated_pre_value: f64,
    pub treated_post_value: f64,
    pub control_pre_value: f64,
    pub control_post_value: f64,
    pub counterfactual_value: f64,
    pub weighted_synthdid_controls: SynthControlWeights,
    pub consistent_time_window: Option<Vec<i64>>,
    pub time_mapping_applied: bool,
}

/// Normalized output aggregating every simulated unit of a placebo run.
///
/// Placebo results are always rendered in a single chart, so a placebo-mode
/// response collapses to exactly one of these regardless of unit count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceboOutput {
    /// Names of every simulated unit, each followed by a space.
    pub treated_unit: String,
    pub output_lines_treated: Vec<Line>,
    pub output_lines_control: Vec<Line>,
    pub intercept_offset: Vec<f64>,
    pub sdid_estimates: Vec<f64>,
}

/// Normalized estimator output.
///
/// An explicit tagged union so downstream consumers pattern-match
/// exhaustively instead of probing for field presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NormalizedOutput {
    Standard(StandardOutput),
    Placebo(PlaceboOutput),
}

impl NormalizedOutput {
    pub fn output_lines_treated(&self) -> &[Line] {
        match self {
            NormalizedOutput::Standard(out) => &out.output_lines_treated,
            NormalizedOutput::Placebo(out) => &out.output_lines_treated,
        }
    }

    pub fn output_lines_control(&self) -> &[Line] {
        match self {
            NormalizedOutput::Standard(out) => &out.output_lines_control,
            NormalizedOutput::Placebo(out) => &out.output_lines_control,
        }
    }

    pub fn intercept_offset(&self) -> &[f64] {
        match self {
            NormalizedOutput::Standard(out) => &out.intercept_offset,
            NormalizedOutput::Placebo(out) => &out.intercept_offset,
        }
    }

    /// Whether the estimator shifted/aligned dates itself.
    ///
    /// Placebo records never carry the flag; they behave as "not applied".
    pub fn time_mapping_applied(&self) -> bool {
        match self {
            NormalizedOutput::Standard(out) => out.time_mapping_applied,
            NormalizedOutput::Placebo(_) => false,
        }
    }
}

/// A ranked placebo statistic (or one histogram bar).
///
/// Derived and read-only: recomputed whenever inputs change, never mutated
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceboStatistic {
    pub unit: String,
    pub ratio: f64,
    pub frequency: f64,
}

/// User-chosen display configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartOptions {
    /// Plot the raw panel data instead of estimator output.
    pub render_raw_data: bool,
    /// Show synthetic-control lines alongside treated lines.
    pub show_synth_control: bool,
    /// Shift control lines by the estimator's intercept offset.
    pub apply_intercept: bool,
    /// Plot treated-minus-control differences against a zero reference.
    pub relative_intercept: bool,
    /// Aggregate multiple treated units into mean lines.
    pub show_mean_treatment_effect: bool,
    /// The current response is a placebo simulation.
    pub is_placebo_simulation: bool,
}

/// One raw panel observation (pre-estimation input data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelPoint {
    pub date: i64,
    pub value: f64,
    pub unit: String,
    pub treated: bool,
}

/// The processed input panel as provided by the host application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelData {
    pub data_points: Vec<PanelPoint>,
    /// Distinct-date catalogue for the panel, in chronological order.
    pub unique_dates: Vec<i64>,
}

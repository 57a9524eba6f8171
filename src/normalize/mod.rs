//! Output-data normalizer.
//!
//! Flattens a raw estimator response into per-unit treated / synthetic-control
//! point sequences:
//!
//! - `split_lines`: cut one unit's paired `x/y/color` arrays at the midpoint
//!   into a treated line and a control line
//! - `normalize`: fold every relevant unit result into normalized output
//!   records (one per treated unit, or a single aggregate record in placebo
//!   mode)

use std::collections::HashSet;

use crate::data::{SdidResponse, UnitResult};
use crate::domain::{
    Line, NormalizedOutput, PlaceboOutput, SeriesPoint, StandardOutput, SYNTHETIC_UNIT,
};

/// The two series contained in one unit's paired output arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitLines {
    pub treated: Line,
    pub control: Line,
}

/// Split one unit's paired `x/y/color` arrays of length `2n` at the midpoint.
///
/// Indices `[0, n)` become the treated line (unit label = unit name) and
/// `[n, 2n)` the control line (unit label = `"Synthetic " + unit`), in
/// matching date order.
pub fn split_lines(result: &UnitResult) -> SplitLines {
    let lines = &result.output.lines;
    let n = lines.x.len() / 2;

    let mut treated = Vec::with_capacity(n);
    for i in 0..n {
        treated.push(SeriesPoint {
            date: lines.x[i].round() as i64,
            value: Some(lines.y[i]),
            unit: result.unit.clone(),
            color: lines.color[i].clone(),
        });
    }

    let mut control = Vec::with_capacity(n);
    for i in n..n * 2 {
        control.push(SeriesPoint {
            date: lines.x[i].round() as i64,
            value: Some(lines.y[i]),
            unit: format!("{SYNTHETIC_UNIT} {}", result.unit),
            color: lines.color[i].clone(),
        });
    }

    SplitLines { treated, control }
}

/// Lines accumulated while folding over unit results.
///
/// All treated units share one chart, so each emitted record carries the
/// accumulator snapshot after its unit is folded in: later records see all
/// earlier lines too.
#[derive(Debug, Clone, Default)]
struct SharedLines {
    treated: Vec<Line>,
    control: Vec<Line>,
    offsets: Vec<f64>,
}

/// Normalize a raw estimator response into output records.
///
/// - placebo mode: every unit result is folded into exactly one
///   [`PlaceboOutput`] record, regardless of unit count
/// - standard mode: unit results are filtered to the units marked treated in
///   the current view, and one [`StandardOutput`] record is emitted per unit
///
/// An absent response yields an empty list. Records are either fully
/// populated or omitted; no partial records are emitted.
pub fn normalize(
    response: Option<&SdidResponse>,
    treated_units: &HashSet<String>,
) -> Vec<NormalizedOutput> {
    let Some(response) = response else {
        return Vec::new();
    };

    if response.compute_placebos {
        let mut acc = SharedLines::default();
        let mut estimates = Vec::with_capacity(response.outputs.len());
        let mut label = String::new();

        for result in &response.outputs {
            let split = split_lines(result);
            acc.treated.push(split.treated);
            acc.control.push(split.control);
            acc.offsets.push(result.output.intercept_offset);
            estimates.push(result.output.sdid_estimate);
            // Trailing separator included, for label parity with prior
            // analyses.
            label.push_str(&result.unit);
            label.push(' ');
        }

        return vec![NormalizedOutput::Placebo(PlaceboOutput {
            treated_unit: label,
            output_lines_treated: acc.treated,
            output_lines_control: acc.control,
            intercept_offset: acc.offsets,
            sdid_estimates: estimates,
        })];
    }

    let mut acc = SharedLines::default();
    let mut records = Vec::new();

    for result in response
        .outputs
        .iter()
        .filter(|r| treated_units.contains(&r.unit))
    {
        let split = split_lines(result);
        acc.treated.push(split.treated);
        acc.control.push(split.control);
        acc.offsets.push(result.output.intercept_offset);

        let output = &result.output;
        records.push(NormalizedOutput::Standard(StandardOutput {
            treated_unit: result.unit.clone(),
            output_lines_treated: acc.treated.clone(),
            output_lines_control: acc.control.clone(),
            intercept_offset: acc.offsets.clone(),
            sdid_estimate: output.sdid_estimate,
            time_before_intervention: output.time_before_intervention.floor() as i64,
            time_after_intervention: output.time_after_intervention.floor() as i64,
            treated_pre_value: output.treated_pre_value,
            treated_post_value: output.treated_post_value,
            control_pre_value: output.control_pre_value,
            control_post_value: output.control_post_value,
            counterfactual_value: output.counterfactual_value,
            weighted_synthdid_controls: output.weighted_synthdid_controls.clone(),
            consistent_time_window: response.consistent_time_window.clone(),
            time_mapping_applied: response.time_mapping_applied,
        }));
    }

    records
}

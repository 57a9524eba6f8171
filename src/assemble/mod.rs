//! Chart-series assembler.
//!
//! Resolves the configured display mode into the final set of lines handed
//! to the renderer:
//!
//! - intercept mode: intercepted control lines paired with treated lines
//! - relative/placebo mode: a zero reference line plus the checked relative
//!   lines
//! - fallback: plain control + treated lines
//! - optional mean aggregation across multiple treated units
//!
//! Numeric display formatting (2 decimal places) happens only at this
//! boundary, never inside the statistical computation.

use std::collections::HashSet;

use crate::align::AlignedSeries;
use crate::domain::{
    ChartOptions, Line, SeriesPoint, COLOR_REFERENCE, COLOR_RELATIVE, COLOR_TREATED,
    SYNTHETIC_UNIT,
};

/// Round a statistic for display. Applied only at the assembler/report
/// boundary to avoid compounding rounding error upstream.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Resolve the display mode into the active line set.
///
/// Rule order (first match wins):
///
/// 1. intercept applied and not placebo: intercepted control lines paired
///    with the treated lines
/// 2. relative mode or placebo: discard rule-1 lines; emit a zero reference
///    line plus every relative line whose unit is checked
/// 3. fallback: plain control + treated lines
///
/// Synthetic-control lines (anything not treated/relative/reference) are
/// kept only when `show_synth_control` is on or in placebo mode. When more
/// than one treated unit is active and mean aggregation is requested, the
/// per-group mean lines are appended.
pub fn assemble_chart(
    aligned: &AlignedSeries,
    opts: &ChartOptions,
    checked_units: &HashSet<String>,
) -> Vec<Line> {
    let out_lines = resolve_mode(aligned, opts, checked_units);
    let aggregated = mean_lines(&out_lines, opts);

    let mut lines: Vec<Line> = out_lines
        .into_iter()
        .filter(|line| {
            let color = line.first().map(|p| p.color.as_str());
            matches!(color, Some(COLOR_TREATED | COLOR_RELATIVE | COLOR_REFERENCE))
                || opts.show_synth_control
                || opts.is_placebo_simulation
        })
        .collect();
    lines.extend(aggregated);
    lines
}

fn resolve_mode(
    aligned: &AlignedSeries,
    opts: &ChartOptions,
    checked_units: &HashSet<String>,
) -> Vec<Line> {
    let mut out: Vec<Line> = Vec::new();

    if opts.apply_intercept && !opts.is_placebo_simulation {
        for intercepted in &aligned.output_lines_intercepted {
            out.push(intercepted.clone());
            out.extend(aligned.output_lines_treated.iter().cloned());
        }
    }

    if opts.relative_intercept || opts.is_placebo_simulation {
        // Relative mode replaces whatever the intercept rule added.
        out.clear();

        if let Some(first_control) = aligned.output_lines_control.first() {
            let reference: Line = first_control
                .iter()
                .map(|p| SeriesPoint {
                    value: Some(0.0),
                    color: COLOR_REFERENCE.to_string(),
                    ..p.clone()
                })
                .collect();
            out.push(reference);
        }

        for relative in &aligned.output_lines_relative {
            let checked = relative
                .first()
                .is_some_and(|p| checked_units.contains(&p.unit));
            if checked {
                out.push(relative.clone());
            }
        }
    }

    if out.is_empty() {
        out.extend(aligned.output_lines_control.iter().cloned());
        out.extend(aligned.output_lines_treated.iter().cloned());
    }

    out
}

/// Aggregate the active lines into one mean line per group.
///
/// Only applies when mean aggregation is requested, outside placebo mode,
/// and more than one treated unit is active (more than two lines). Lines are
/// partitioned by the `"Synthetic"` unit-name prefix into a synthetic and a
/// treated group; group values are summed per date index and divided by
/// group size. Indices that are `None` in the group's baseline line remain
/// `None` in the mean line rather than being treated as zero.
fn mean_lines(out_lines: &[Line], opts: &ChartOptions) -> Vec<Line> {
    if !opts.show_mean_treatment_effect || opts.is_placebo_simulation || out_lines.len() <= 2 {
        return Vec::new();
    }

    let (synthetic, treated): (Vec<&Line>, Vec<&Line>) = out_lines
        .iter()
        .partition(|line| line.first().is_some_and(|p| p.unit.starts_with(SYNTHETIC_UNIT)));

    let mut aggregated = Vec::new();
    for group in [synthetic, treated] {
        let Some(baseline) = group.first() else {
            continue;
        };
        let is_synth = baseline
            .first()
            .is_some_and(|p| p.unit.starts_with(SYNTHETIC_UNIT));
        let group_name = if is_synth { "Mean Synthetic" } else { "Mean Treated" };
        let mean_color = group_name.to_lowercase();

        let mean_line: Line = baseline
            .iter()
            .enumerate()
            .map(|(idx, baseline_point)| {
                let value = if baseline_point.value.is_none() {
                    None
                } else {
                    let sum: f64 = group
                        .iter()
                        .map(|line| line.get(idx).and_then(|p| p.value).unwrap_or(0.0))
                        .sum();
                    Some(sum / group.len() as f64)
                };
                SeriesPoint {
                    date: baseline_point.date,
                    value,
                    unit: group_name.to_string(),
                    color: mean_color.clone(),
                }
            })
            .collect();

        aggregated.push(mean_line);
    }

    aggregated
}

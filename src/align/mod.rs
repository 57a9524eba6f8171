//! Time-series aligner.
//!
//! Reconciles the estimator's output lines with the input panel before the
//! chart is assembled:
//!
//! - synthesize placeholder points for input dates the estimator dropped,
//!   and re-sort every line by date
//! - shift control lines by their intercept offsets
//! - derive relative (treated-minus-control) lines
//! - compute the axis range for the active display mode
//!
//! The range policy is load-bearing for axis scaling correctness and is kept
//! in this module so its rules stay next to the series they range over.

use std::collections::HashSet;

use crate::domain::{
    ChartOptions, Line, NormalizedOutput, PanelData, SeriesPoint, COLOR_CONTROL, COLOR_RELATIVE,
    COLOR_TREATED,
};

/// Aligned output lines for one normalized record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSeries {
    pub output_lines_treated: Vec<Line>,
    pub output_lines_control: Vec<Line>,
    pub output_lines_intercepted: Vec<Line>,
    pub output_lines_relative: Vec<Line>,
}

/// Axis range for the chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartRange {
    pub min_value: f64,
    pub max_value: f64,
    pub date_range: (i64, i64),
}

impl ChartRange {
    /// Value-axis domain, falling back to `[0, 1]` when the computed range
    /// is degenerate (no data at all).
    pub fn value_domain(&self) -> (f64, f64) {
        if self.max_value > self.min_value {
            (self.min_value, self.max_value)
        } else {
            (0.0, 1.0)
        }
    }
}

impl Default for ChartRange {
    fn default() -> Self {
        Self {
            min_value: 0.0,
            max_value: 0.0,
            date_range: (0, 0),
        }
    }
}

/// Align one normalized record against the panel's distinct-date catalogue.
///
/// When the estimator consumed a reduced date window (some `input_dates` are
/// absent from its output) and no time mapping was applied, placeholder
/// points are synthesized for the missing dates: the point one day before
/// the first missing date seeds the first placeholder's value, and every
/// later placeholder gets `value = None`. Placeholders are appended, so
/// every line is re-sorted by date afterwards to preserve line-segment
/// connectivity.
///
/// Intercept offsets are applied before relative-series computation because
/// they change the effective treated/control gap.
pub fn align_series(output: &NormalizedOutput, input_dates: &[i64]) -> AlignedSeries {
    let treated_src = output.output_lines_treated();
    let control_src = output.output_lines_control();
    let Some(first_treated) = treated_src.first() else {
        return AlignedSeries::default();
    };

    let output_dates: Vec<i64> = first_treated.iter().map(|p| p.date).collect();
    let missing = if output.time_mapping_applied() {
        Vec::new()
    } else {
        missing_dates(input_dates, &output_dates)
    };

    let output_lines_treated: Vec<Line> = treated_src
        .iter()
        .map(|line| with_missing_dates(line, &missing))
        .collect();
    let output_lines_control: Vec<Line> = control_src
        .iter()
        .map(|line| with_missing_dates(line, &missing))
        .collect();

    let output_lines_intercepted =
        apply_intercepts(&output_lines_control, output.intercept_offset());
    let output_lines_relative = relative_lines(&output_lines_treated, &output_lines_intercepted);

    AlignedSeries {
        output_lines_treated,
        output_lines_control,
        output_lines_intercepted,
        output_lines_relative,
    }
}

/// Input dates absent from the output, in input order.
fn missing_dates(input_dates: &[i64], output_dates: &[i64]) -> Vec<i64> {
    let present: HashSet<i64> = output_dates.iter().copied().collect();
    input_dates
        .iter()
        .copied()
        .filter(|d| !present.contains(d))
        .collect()
}

/// Clone a line and append placeholder points for the missing dates.
fn with_missing_dates(line: &Line, missing: &[i64]) -> Line {
    let mut clone = line.clone();
    let Some(head) = line.first() else {
        return clone;
    };

    if let Some(&first_missing) = missing.first() {
        let date_before = first_missing - 1;
        // Seed the first placeholder from the last pre-gap observation; all
        // later placeholders stay empty so the renderer breaks the segment.
        let seed = match clone.iter().find(|p| p.date == date_before) {
            Some(point) => point.value,
            None => Some(0.0),
        };
        for (idx, &date) in missing.iter().enumerate() {
            clone.push(SeriesPoint {
                date,
                value: if idx == 0 { seed } else { None },
                unit: head.unit.clone(),
                color: head.color.clone(),
            });
        }
    }

    // Placeholders were appended out of order; sorting is mandatory for
    // proper line-segment connectivity.
    clone.sort_by_key(|p| p.date);
    clone
}

/// Shift each control line by its intercept offset; `None` passes through.
fn apply_intercepts(control_lines: &[Line], offsets: &[f64]) -> Vec<Line> {
    control_lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let offset = offsets.get(idx).copied().unwrap_or(0.0);
            line.iter()
                .map(|point| SeriesPoint {
                    value: point.value.map(|v| v + offset),
                    ..point.clone()
                })
                .collect()
        })
        .collect()
}

/// Treated-minus-intercepted lines, index-wise per point.
///
/// Carries the treated line's unit and tags the result `"relative"`. Absent
/// values enter the subtraction as 0; the relative line itself is never
/// `None`.
fn relative_lines(treated_lines: &[Line], intercepted_lines: &[Line]) -> Vec<Line> {
    intercepted_lines
        .iter()
        .zip(treated_lines.iter())
        .map(|(intercepted, treated)| {
            intercepted
                .iter()
                .zip(treated.iter())
                .map(|(point, treated_point)| SeriesPoint {
                    date: point.date,
                    value: Some(
                        treated_point.value.unwrap_or(0.0) - point.value.unwrap_or(0.0),
                    ),
                    unit: treated_point.unit.clone(),
                    color: COLOR_RELATIVE.to_string(),
                })
                .collect()
        })
        .collect()
}

/// Group raw panel points into per-unit lines for treated + checked units.
///
/// Units keep their first-appearance order; points keep panel order within
/// each line. The treated/checked sets only gate which units appear; each
/// point is tagged `"treated"` or `"control"` by its own flag.
pub fn panel_lines(
    panel: &PanelData,
    treated_units: &HashSet<String>,
    checked_units: &HashSet<String>,
) -> Vec<Line> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: Vec<Line> = Vec::new();

    for point in &panel.data_points {
        if !treated_units.contains(&point.unit) && !checked_units.contains(&point.unit) {
            continue;
        }
        let color = if point.treated { COLOR_TREATED } else { COLOR_CONTROL };
        let series_point = SeriesPoint {
            date: point.date,
            value: Some(point.value),
            unit: point.unit.clone(),
            color: color.to_string(),
        };
        match order.iter().position(|u| u == &point.unit) {
            Some(idx) => grouped[idx].push(series_point),
            None => {
                order.push(point.unit.clone());
                grouped.push(vec![series_point]);
            }
        }
    }

    grouped
}

/// Compute the axis range for the active display mode.
///
/// Policy:
///
/// - raw-data mode: max over all input values, min = `min(0, min values)`,
///   date range = extent of the first input line
/// - modeled mode with relative/placebo selected: min/max over the relative
///   values only (`None` excluded)
/// - modeled mode with intercept applied (not relative): min over the
///   intercepted values floor-capped at 0; max over the active series set
/// - no output: max/min from the raw input values, date range from the
///   first input line only (a known approximation, kept as-is)
pub fn compute_range(
    input_lines: &[Line],
    output: Option<&NormalizedOutput>,
    aligned: Option<&AlignedSeries>,
    opts: &ChartOptions,
) -> ChartRange {
    let (Some(output), Some(aligned)) = (output, aligned) else {
        return ChartRange {
            min_value: 0.0,
            max_value: max_value(input_lines.iter().flatten()).unwrap_or(0.0),
            date_range: first_line_extent(input_lines),
        };
    };

    if opts.render_raw_data {
        let flat = input_lines.iter().flatten();
        let max = max_value(flat.clone()).unwrap_or(0.0);
        let min = min_value(flat).unwrap_or(0.0).min(0.0);
        return ChartRange {
            min_value: min,
            max_value: max,
            date_range: first_line_extent(input_lines),
        };
    }

    let relative_mode = opts.relative_intercept || opts.is_placebo_simulation;
    let all_output_points = aligned
        .output_lines_control
        .iter()
        .chain(aligned.output_lines_treated.iter())
        .flatten();
    let relative_points = aligned.output_lines_relative.iter().flatten();
    let intercepted_points = aligned.output_lines_intercepted.iter().flatten();

    let max_value = if relative_mode {
        max_value(relative_points.clone()).unwrap_or(0.0)
    } else {
        max_value(all_output_points).unwrap_or(0.0)
    };

    let mut min = 0.0_f64;
    if opts.apply_intercept {
        min = min_value(intercepted_points).unwrap_or(0.0).min(0.0);
    }
    if relative_mode {
        min = min_value(relative_points).unwrap_or(0.0).min(0.0);
    }

    // The date extent deliberately comes from the record's own first treated
    // line (pre-synthesis), not the aligned clones.
    let output_dates = output
        .output_lines_treated()
        .first()
        .map(|line| line.iter().map(|p| p.date))
        .and_then(extent);

    ChartRange {
        min_value: min,
        max_value,
        date_range: output_dates.unwrap_or((0, 0)),
    }
}

fn max_value<'a>(points: impl Iterator<Item = &'a SeriesPoint>) -> Option<f64> {
    points
        .filter_map(|p| p.value)
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

fn min_value<'a>(points: impl Iterator<Item = &'a SeriesPoint>) -> Option<f64> {
    points
        .filter_map(|p| p.value)
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v))))
}

fn extent(dates: impl Iterator<Item = i64>) -> Option<(i64, i64)> {
    dates.fold(None, |acc, d| {
        Some(acc.map_or((d, d), |(lo, hi): (i64, i64)| (lo.min(d), hi.max(d))))
    })
}

fn first_line_extent(lines: &[Line]) -> (i64, i64) {
    lines
        .first()
        .and_then(|line| extent(line.iter().map(|p| p.date)))
        .unwrap_or((0, 0))
}

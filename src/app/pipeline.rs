//! Shared pipeline logic for host applications.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! normalize -> align -> assemble (charts) and normalize -> placebo ranking
//! (inference).
//!
//! The host owns everything around it: fetching the estimator response,
//! rendering the returned lines, and memoizing runs by structural input
//! equality (all inputs and outputs here derive `PartialEq` for exactly that
//! purpose). A run is a pure function of its arguments; recomputation is
//! driven solely by the host handing in changed inputs.

use std::collections::HashSet;

use crate::align::{align_series, compute_range, panel_lines, AlignedSeries, ChartRange};
use crate::assemble::assemble_chart;
use crate::data::SdidResponse;
use crate::domain::{ChartOptions, Line, NormalizedOutput, PanelData, PlaceboStatistic};
use crate::normalize::normalize;
use crate::placebo::{placebo_statistics, PlaceboRenderMode, PlaceboSpec};
use crate::report::{synth_control_data, SynthControlSummary};

/// Everything the host supplies besides the response and the panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub options: ChartOptions,
    /// Units treated in the current view.
    pub treated_units: Vec<String>,
    /// Units currently included by the user; `None` means no selection yet.
    pub checked_units: Option<HashSet<String>>,
    /// Treatment start dates (placebo analysis uses the first).
    pub treatment_dates: Vec<i64>,
}

/// All computed outputs of a single pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutput {
    pub normalized: Vec<NormalizedOutput>,
    pub input_lines: Vec<Line>,
    pub chart_lines: Vec<Line>,
    pub range: ChartRange,
    pub placebo_statistics: Vec<PlaceboStatistic>,
    pub synth_controls: Vec<SynthControlSummary>,
}

/// Execute the full transformation pipeline over one estimator response.
///
/// The chart is driven by the most recent normalized record, whose line
/// arrays cover every treated unit processed so far (all treated units share
/// one chart). Placebo statistics are returned ranked; histogram binning
/// stays available through [`PlaceboRenderMode::Histogram`] on the placebo
/// module directly.
///
/// An absent response produces a fully empty run: no records, no chart
/// lines, and a range whose value domain falls back to `[0, 1]`.
pub fn run_pipeline(
    response: Option<&SdidResponse>,
    panel: &PanelData,
    config: &PipelineConfig,
) -> RunOutput {
    let treated_set: HashSet<String> = config.treated_units.iter().cloned().collect();
    let empty = HashSet::new();
    let checked = config.checked_units.as_ref().unwrap_or(&empty);

    let normalized = normalize(response, &treated_set);
    let input_lines = panel_lines(panel, &treated_set, checked);

    let latest = normalized.last();
    let aligned: Option<AlignedSeries> =
        latest.map(|output| align_series(output, &panel.unique_dates));
    let chart_lines = match aligned.as_ref() {
        Some(aligned) => assemble_chart(aligned, &config.options, checked),
        None => Vec::new(),
    };
    let range = compute_range(&input_lines, latest, aligned.as_ref(), &config.options);

    let start_date = panel.unique_dates.first().copied().unwrap_or(0);
    let end_date = panel.unique_dates.last().copied().unwrap_or(0);
    let placebo_spec = PlaceboSpec {
        start_date,
        end_date,
        treatment_dates: &config.treatment_dates,
        treated_units: &config.treated_units,
        checked_units: config.checked_units.as_ref(),
    };
    let placebo_statistics =
        placebo_statistics(response, &placebo_spec, PlaceboRenderMode::Ranked);

    let synth_controls = synth_control_data(&normalized, checked);

    RunOutput {
        normalized,
        input_lines,
        chart_lines,
        range,
        placebo_statistics,
        synth_controls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OutputLines, UnitOutput, UnitResult};
    use crate::domain::PanelPoint;

    fn unit_result(unit: &str) -> UnitResult {
        UnitResult {
            unit: unit.to_string(),
            output: UnitOutput {
                lines: OutputLines {
                    x: vec![1990.0, 1991.0, 1992.0, 1990.0, 1991.0, 1992.0],
                    y: vec![10.0, 11.0, 9.0, 9.5, 10.5, 10.8],
                    color: (0..6).map(|_| "black".to_string()).collect(),
                },
                sdid_estimate: -1.8,
                weighted_synthdid_controls: Default::default(),
                time_before_intervention: 1991.0,
                time_after_intervention: 1992.0,
                treated_pre_value: 10.5,
                treated_post_value: 9.0,
                control_pre_value: 10.0,
                control_post_value: 10.8,
                intercept_offset: 0.5,
                counterfactual_value: 10.8,
            },
        }
    }

    fn panel() -> PanelData {
        let mut data_points = Vec::new();
        for (unit, treated) in [("california", true), ("nevada", false)] {
            for (i, date) in [1990_i64, 1991, 1992].iter().enumerate() {
                data_points.push(PanelPoint {
                    date: *date,
                    value: 10.0 + i as f64,
                    unit: unit.to_string(),
                    treated,
                });
            }
        }
        PanelData {
            data_points,
            unique_dates: vec![1990, 1991, 1992],
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            options: ChartOptions {
                show_synth_control: true,
                ..Default::default()
            },
            treated_units: vec!["california".to_string()],
            checked_units: Some(["california".to_string(), "nevada".to_string()].into()),
            treatment_dates: vec![1991],
        }
    }

    #[test]
    fn absent_response_yields_fully_empty_run() {
        let out = run_pipeline(None, &PanelData::default(), &config());
        assert!(out.normalized.is_empty());
        assert!(out.chart_lines.is_empty());
        assert!(out.placebo_statistics.is_empty());
        assert_eq!(out.range.value_domain(), (0.0, 1.0));
    }

    #[test]
    fn standard_run_produces_chart_lines_and_range() {
        let response = SdidResponse {
            message: None,
            outputs: vec![unit_result("california")],
            compute_placebos: false,
            consistent_time_window: None,
            time_mapping_applied: false,
        };
        let out = run_pipeline(Some(&response), &panel(), &config());

        assert_eq!(out.normalized.len(), 1);
        // Control + treated line for the single unit.
        assert_eq!(out.chart_lines.len(), 2);
        assert_eq!(out.range.date_range, (1990, 1992));
        assert!(out.range.max_value >= 11.0);
        assert!(out.placebo_statistics.is_empty());
    }

    /// Like [`unit_result`] but with a nonzero pre-treatment gap, so the
    /// treated unit's pre-period error does not degenerate to 0.
    fn placebo_unit(unit: &str) -> UnitResult {
        let mut result = unit_result(unit);
        result.output.lines.y[0] = 12.0;
        result
    }

    #[test]
    fn placebo_run_ranks_checked_units() {
        let response = SdidResponse {
            message: None,
            outputs: vec![placebo_unit("california"), placebo_unit("nevada")],
            compute_placebos: true,
            consistent_time_window: None,
            time_mapping_applied: false,
        };
        let mut cfg = config();
        cfg.options.is_placebo_simulation = true;
        let out = run_pipeline(Some(&response), &panel(), &cfg);

        // One aggregate placebo record.
        assert_eq!(out.normalized.len(), 1);
        assert_eq!(out.placebo_statistics.len(), 2);
        // Identical series: identical ratios, response order preserved.
        assert_eq!(out.placebo_statistics[0].unit, "california");
        assert_eq!(out.placebo_statistics[1].unit, "nevada");
    }

    #[test]
    fn identical_inputs_produce_identical_output() {
        let response = SdidResponse {
            message: None,
            outputs: vec![unit_result("california")],
            compute_placebos: false,
            consistent_time_window: None,
            time_mapping_applied: false,
        };
        let first = run_pipeline(Some(&response), &panel(), &config());
        let second = run_pipeline(Some(&response), &panel(), &config());
        assert_eq!(first, second);
    }
}

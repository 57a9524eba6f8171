//! Placebo significance engine.
//!
//! Ranks placebo (untreated) units by how implausible their estimated effect
//! is relative to the real treated unit, using the pre/post prediction-error
//! ratio test:
//!
//! ```text
//! pErrPre  = (1 / (T - T0)) * Σ_{t=T0}^{T-1} (treated(t) - (control(t) + offset))²
//! pErrPost = (1 / (T1 - T)) * Σ_{t=T}^{T1}   (treated(t) - (control(t) + offset))²
//! ratio    = pErrPost / pErrPre
//! ```
//!
//! with `T0` the panel start, `T1` the panel end, and `T` the treatment date.
//! Quirks kept deliberately for result parity with prior analyses: mean
//! squared error without the square root, missing point lookups defaulting
//! to 0, and a single supported treatment date.
//!
//! Reference: https://mixtape.scunning.com/synthetic-control.html#californias-proposition-99

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use crate::data::SdidResponse;
use crate::domain::PlaceboStatistic;
use crate::normalize::split_lines;

/// Placebo units whose pre-treatment error differs from the treated unit's
/// by more than this factor (either direction) are excluded as outliers,
/// per Abadie, Diamond, and Hainmueller (2010).
const EXTREME_PLACEBO_RATIO_FACTOR: f64 = 2.0;

const NUM_BINS: usize = 10;

/// How placebo results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceboRenderMode {
    /// One entry per surviving unit, sorted ascending by ratio.
    Ranked,
    /// Ratios grouped into equal-width histogram bins.
    Histogram,
}

/// Analysis window and unit selections for a placebo run.
#[derive(Debug, Clone)]
pub struct PlaceboSpec<'a> {
    /// Panel start date (`T0`).
    pub start_date: i64,
    /// Panel end date (`T1`).
    pub end_date: i64,
    /// Treatment start dates; only the first is used (placebo analysis
    /// supports exactly one treatment date).
    pub treatment_dates: &'a [i64],
    /// Units treated in the real (non-placebo) run; only the first is used.
    pub treated_units: &'a [String],
    /// Units currently included by the user; `None` retains nothing.
    pub checked_units: Option<&'a HashSet<String>>,
}

#[derive(Debug, Clone)]
struct PredictionError {
    unit: String,
    p_err_pre: f64,
    ratio: f64,
}

/// Compute ranked placebo statistics (or histogram bars) for a placebo-mode
/// response.
///
/// Returns an empty list when there is no response, the response is not a
/// placebo run, no treatment date is known, or the treatment date falls
/// outside `[start_date, end_date]`.
pub fn placebo_statistics(
    response: Option<&SdidResponse>,
    spec: &PlaceboSpec<'_>,
    mode: PlaceboRenderMode,
) -> Vec<PlaceboStatistic> {
    let Some(response) = response else {
        return Vec::new();
    };
    if !response.compute_placebos {
        return Vec::new();
    }
    let Some(&treatment_date) = spec.treatment_dates.first() else {
        return Vec::new();
    };
    if treatment_date > spec.end_date || treatment_date < spec.start_date {
        return Vec::new();
    }

    let prediction_errors = prediction_errors(response, spec, treatment_date);
    let distributions = filter_extreme_placebos(&prediction_errors, spec);
    let sorted = sort_by_ratio(distributions);

    match mode {
        PlaceboRenderMode::Ranked => sorted,
        PlaceboRenderMode::Histogram => histogram_bars(&sorted),
    }
}

/// Per-unit pre/post mean squared prediction errors.
///
/// Each unit is independent, so the pass runs in parallel; the indexed
/// collect preserves response order for deterministic output.
fn prediction_errors(
    response: &SdidResponse,
    spec: &PlaceboSpec<'_>,
    treatment_date: i64,
) -> Vec<PredictionError> {
    response
        .outputs
        .par_iter()
        .map(|result| {
            let split = split_lines(result);
            let treated: HashMap<i64, f64> = split
                .treated
                .iter()
                .map(|p| (p.date, p.value.unwrap_or(0.0)))
                .collect();
            let control: HashMap<i64, f64> = split
                .control
                .iter()
                .map(|p| (p.date, p.value.unwrap_or(0.0)))
                .collect();
            let offset = result.output.intercept_offset;

            // Missing point lookups default to 0, not skipped.
            let squared_gap = |t: i64| {
                let treated_value = treated.get(&t).copied().unwrap_or(0.0);
                let control_value = control.get(&t).copied().unwrap_or(0.0) + offset;
                let diff = treated_value - control_value;
                diff * diff
            };

            let sum_pre: f64 = (spec.start_date..treatment_date).map(squared_gap).sum();
            let p_err_pre = sum_pre / (treatment_date - spec.start_date) as f64;

            let sum_post: f64 = (treatment_date..=spec.end_date).map(squared_gap).sum();
            let p_err_post = sum_post / (spec.end_date - treatment_date) as f64;

            PredictionError {
                unit: result.unit.clone(),
                p_err_pre,
                ratio: p_err_post / p_err_pre,
            }
        })
        .collect()
}

/// Drop units whose pre-treatment error is considerably different from the
/// treated unit's (strictly more than the factor in either direction).
///
/// When the treated unit's own statistic is undefined, everything is kept.
/// Only checked units survive in any case.
fn filter_extreme_placebos(
    prediction_errors: &[PredictionError],
    spec: &PlaceboSpec<'_>,
) -> Vec<PlaceboStatistic> {
    let treated_prediction = spec
        .treated_units
        .first()
        .and_then(|unit| prediction_errors.iter().find(|pe| &pe.unit == unit));
    let treated_pre = treated_prediction.map(|pe| pe.p_err_pre).unwrap_or(0.0);

    let mut distributions = Vec::new();
    for pe in prediction_errors {
        let skip = pe.p_err_pre > treated_pre * EXTREME_PLACEBO_RATIO_FACTOR
            || pe.p_err_pre * EXTREME_PLACEBO_RATIO_FACTOR < treated_pre;
        let kept = (treated_pre != 0.0 && !skip) || treated_prediction.is_none();
        let checked = spec
            .checked_units
            .is_some_and(|units| units.contains(&pe.unit));
        if kept && checked {
            distributions.push(PlaceboStatistic {
                unit: pe.unit.clone(),
                ratio: pe.ratio,
                // Placeholder until histogram binning assigns real counts.
                frequency: pe.ratio,
            });
        }
    }

    distributions
}

fn sort_by_ratio(mut distributions: Vec<PlaceboStatistic>) -> Vec<PlaceboStatistic> {
    // Stable sort: ties keep their original (response) order.
    distributions.sort_by(|a, b| {
        a.ratio
            .partial_cmp(&b.ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    distributions
}

/// Group ratios into `NUM_BINS` equal-width bins over
/// `[min(0, min ratio), max ratio]`; non-empty bins become one bar each.
fn histogram_bars(sorted: &[PlaceboStatistic]) -> Vec<PlaceboStatistic> {
    if sorted.is_empty() {
        return Vec::new();
    }

    let mut lo = sorted
        .iter()
        .map(|s| s.ratio)
        .fold(f64::INFINITY, f64::min);
    let hi = sorted
        .iter()
        .map(|s| s.ratio)
        .fold(f64::NEG_INFINITY, f64::max);
    if lo > 0.0 {
        lo = 0.0;
    }

    let width = (hi - lo) / NUM_BINS as f64;
    if !(width > 0.0) {
        // Degenerate domain (all ratios equal): a single bar holds everything.
        let units: Vec<&str> = sorted.iter().map(|s| s.unit.as_str()).collect();
        return vec![PlaceboStatistic {
            unit: units.join(" "),
            frequency: sorted.len() as f64,
            ratio: lo,
        }];
    }

    let mut bins: Vec<Vec<&PlaceboStatistic>> = vec![Vec::new(); NUM_BINS];
    for stat in sorted {
        let idx = (((stat.ratio - lo) / width).floor() as usize).min(NUM_BINS - 1);
        bins[idx].push(stat);
    }

    let mut bars = Vec::new();
    for (idx, bin) in bins.iter().enumerate() {
        if bin.is_empty() {
            continue;
        }
        let units: Vec<&str> = bin.iter().map(|s| s.unit.as_str()).collect();
        let bin_lo = lo + idx as f64 * width;
        bars.push(PlaceboStatistic {
            unit: units.join(" "),
            frequency: bin.len() as f64,
            ratio: bin_lo + width / 2.0,
        });
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OutputLines, UnitOutput, UnitResult};

    /// Build a unit whose treated values are `treated_y` over dates 0..n and
    /// whose control values are all zero (offset 0), so `pErrPre`/`pErrPost`
    /// reduce to means of squared treated values.
    fn unit(name: &str, treated_y: &[f64]) -> UnitResult {
        let n = treated_y.len();
        let mut x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        x.extend((0..n).map(|i| i as f64));
        let mut y = treated_y.to_vec();
        y.extend(std::iter::repeat(0.0).take(n));
        let color: Vec<String> = (0..2 * n).map(|_| "black".to_string()).collect();

        UnitResult {
            unit: name.to_string(),
            output: UnitOutput {
                lines: OutputLines { x, y, color },
                sdid_estimate: 0.0,
                weighted_synthdid_controls: Default::default(),
                time_before_intervention: 0.0,
                time_after_intervention: 0.0,
                treated_pre_value: 0.0,
                treated_post_value: 0.0,
                control_pre_value: 0.0,
                control_post_value: 0.0,
                intercept_offset: 0.0,
                counterfactual_value: 0.0,
            },
        }
    }

    fn placebo_response(outputs: Vec<UnitResult>) -> SdidResponse {
        SdidResponse {
            message: None,
            outputs,
            compute_placebos: true,
            consistent_time_window: None,
            time_mapping_applied: false,
        }
    }

    fn spec<'a>(
        treated_units: &'a [String],
        treatment_dates: &'a [i64],
        checked_units: Option<&'a HashSet<String>>,
    ) -> PlaceboSpec<'a> {
        PlaceboSpec {
            start_date: 0,
            end_date: 3,
            treatment_dates,
            treated_units,
            checked_units,
        }
    }

    #[test]
    fn empty_when_preconditions_fail() {
        let treated = vec!["real".to_string()];
        let checked: HashSet<String> = ["real".to_string()].into();
        let dates = [2_i64];

        // No response at all.
        let s = spec(&treated, &dates, Some(&checked));
        assert!(placebo_statistics(None, &s, PlaceboRenderMode::Ranked).is_empty());

        // Response without the placebo flag.
        let mut res = placebo_response(vec![unit("real", &[1.0, 1.0, 1.0, 1.0])]);
        res.compute_placebos = false;
        assert!(placebo_statistics(Some(&res), &s, PlaceboRenderMode::Ranked).is_empty());

        // No treatment date.
        let res = placebo_response(vec![unit("real", &[1.0, 1.0, 1.0, 1.0])]);
        let s = spec(&treated, &[], Some(&checked));
        assert!(placebo_statistics(Some(&res), &s, PlaceboRenderMode::Ranked).is_empty());

        // Treatment date outside the panel window.
        let outside = [9_i64];
        let s = spec(&treated, &outside, Some(&checked));
        assert!(placebo_statistics(Some(&res), &s, PlaceboRenderMode::Ranked).is_empty());
    }

    #[test]
    fn missing_checked_set_retains_nothing() {
        let treated = vec!["real".to_string()];
        let dates = [2_i64];
        let res = placebo_response(vec![unit("real", &[2.0, 2.0, 0.0, 0.0])]);
        let s = spec(&treated, &dates, None);
        assert!(placebo_statistics(Some(&res), &s, PlaceboRenderMode::Ranked).is_empty());
    }

    #[test]
    fn extreme_placebos_filtered_with_strict_boundaries() {
        // T0=0, T=2, T1=3. With zero controls, pErrPre = (y0²+y1²)/2 and
        // pErrPost = y2²+y3². The treated unit has pErrPre = 4, so the
        // exclusion window is (2, 8) inclusive at both edges.
        let outputs = vec![
            unit("real", &[2.0, 2.0, 0.0, 0.0]),    // pre 4.0, ratio 0
            unit("bhigh", &[0.0, 4.0, 1.0, 0.0]),   // pre 8.0 = 2x exactly: retained
            unit("toohigh", &[1.0, 4.0, 0.0, 0.0]), // pre 8.5 > 8: excluded
            unit("blow", &[0.0, 2.0, 3.0, 0.0]),    // pre 2.0 = half exactly: retained
            unit("toolow", &[1.0, 1.0, 0.0, 1.0]),  // pre 1.0 < 2: excluded
        ];
        let res = placebo_response(outputs);
        let treated = vec!["real".to_string()];
        let dates = [2_i64];
        let checked: HashSet<String> = ["real", "bhigh", "toohigh", "blow", "toolow"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let s = spec(&treated, &dates, Some(&checked));

        let stats = placebo_statistics(Some(&res), &s, PlaceboRenderMode::Ranked);
        let units: Vec<&str> = stats.iter().map(|s| s.unit.as_str()).collect();
        // Ascending by ratio: real 0.0, bhigh 1/8, blow 9/2.
        assert_eq!(units, vec!["real", "bhigh", "blow"]);
        assert!((stats[1].ratio - 0.125).abs() < 1e-12);
        assert!((stats[2].ratio - 4.5).abs() < 1e-12);
    }

    #[test]
    fn everything_kept_when_treated_statistic_is_undefined() {
        let outputs = vec![
            unit("p1", &[0.0, 4.0, 1.0, 0.0]),
            unit("p2", &[1.0, 1.0, 0.0, 1.0]),
        ];
        let res = placebo_response(outputs);
        // The treated unit does not appear in the response.
        let treated = vec!["ghost".to_string()];
        let dates = [2_i64];
        let checked: HashSet<String> = ["p1".to_string(), "p2".to_string()].into();
        let s = spec(&treated, &dates, Some(&checked));

        let stats = placebo_statistics(Some(&res), &s, PlaceboRenderMode::Ranked);
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn ranking_is_stable_for_tied_ratios() {
        // Identical series produce identical ratios; response order must
        // survive the sort.
        let outputs = vec![
            unit("real", &[2.0, 2.0, 2.0, 2.0]),
            unit("z_first", &[2.0, 2.0, 2.0, 2.0]),
            unit("a_second", &[2.0, 2.0, 2.0, 2.0]),
        ];
        let res = placebo_response(outputs);
        let treated = vec!["real".to_string()];
        let dates = [2_i64];
        let checked: HashSet<String> = ["real", "z_first", "a_second"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let s = spec(&treated, &dates, Some(&checked));

        let first = placebo_statistics(Some(&res), &s, PlaceboRenderMode::Ranked);
        let second = placebo_statistics(Some(&res), &s, PlaceboRenderMode::Ranked);
        let units: Vec<&str> = first.iter().map(|s| s.unit.as_str()).collect();
        assert_eq!(units, vec!["real", "z_first", "a_second"]);
        assert_eq!(first, second);
    }

    #[test]
    fn histogram_bins_are_equal_width_with_midpoint_labels() {
        let sorted = vec![
            PlaceboStatistic { unit: "a".into(), ratio: 0.5, frequency: 0.5 },
            PlaceboStatistic { unit: "b".into(), ratio: 1.0, frequency: 1.0 },
            PlaceboStatistic { unit: "c".into(), ratio: 9.5, frequency: 9.5 },
        ];
        let bars = histogram_bars(&sorted);

        // Domain [0, 9.5], width 0.95: a -> bin 0, b -> bin 1, c -> bin 9.
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].unit, "a");
        assert_eq!(bars[0].frequency, 1.0);
        assert!((bars[0].ratio - 0.475).abs() < 1e-12);
        assert_eq!(bars[1].unit, "b");
        assert!((bars[1].ratio - 1.425).abs() < 1e-12);
        assert_eq!(bars[2].unit, "c");
        assert!((bars[2].ratio - 9.025).abs() < 1e-12);
    }

    #[test]
    fn histogram_groups_units_sharing_a_bin() {
        let sorted = vec![
            PlaceboStatistic { unit: "a".into(), ratio: 0.1, frequency: 0.1 },
            PlaceboStatistic { unit: "b".into(), ratio: 0.2, frequency: 0.2 },
            PlaceboStatistic { unit: "c".into(), ratio: 5.0, frequency: 5.0 },
        ];
        let bars = histogram_bars(&sorted);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].unit, "a b");
        assert_eq!(bars[0].frequency, 2.0);
    }
}

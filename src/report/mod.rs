//! Reporting utilities: synthetic-control weights and effect summaries.
//!
//! We keep formatting code in one place so:
//! - the pipeline math stays clean and testable
//! - output changes are localized
//!
//! All display rounding funnels through [`round2`]; statistics upstream stay
//! unrounded.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::assemble::round2;
use crate::domain::NormalizedOutput;

/// One unit contributing to a synthetic control, with its weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticControlUnit {
    pub unit: String,
    pub weight: f64,
}

/// The weighted composition of one treated unit's synthetic control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthControlSummary {
    pub treated_unit: String,
    pub weighted_units: Vec<SyntheticControlUnit>,
}

/// Extract the synthetic-control composition for each standard output
/// record, filtered to the currently checked units.
pub fn synth_control_data(
    outputs: &[NormalizedOutput],
    checked_units: &HashSet<String>,
) -> Vec<SynthControlSummary> {
    let mut summaries = Vec::new();

    for output in outputs {
        let NormalizedOutput::Standard(out) = output else {
            continue;
        };
        let weights = &out.weighted_synthdid_controls;
        let weighted_units = weights
            .dimnames
            .iter()
            .zip(weights.weights.iter())
            .filter(|(unit, _)| checked_units.contains(*unit))
            .map(|(unit, &weight)| SyntheticControlUnit {
                unit: unit.clone(),
                weight,
            })
            .collect();
        summaries.push(SynthControlSummary {
            treated_unit: out.treated_unit.clone(),
            weighted_units,
        });
    }

    summaries
}

/// Mean SDID estimate across all standard output records.
///
/// `None` when no standard record is present.
pub fn mean_treatment_effect(outputs: &[NormalizedOutput]) -> Option<f64> {
    let estimates: Vec<f64> = outputs
        .iter()
        .filter_map(|output| match output {
            NormalizedOutput::Standard(out) => Some(out.sdid_estimate),
            NormalizedOutput::Placebo(_) => None,
        })
        .collect();
    if estimates.is_empty() {
        return None;
    }
    Some(estimates.iter().sum::<f64>() / estimates.len() as f64)
}

/// Format the per-unit effect summary (estimate + pre/post diagnostics).
pub fn format_effect_summary(outputs: &[NormalizedOutput]) -> String {
    let mut out = String::new();

    for output in outputs {
        let NormalizedOutput::Standard(record) = output else {
            continue;
        };
        out.push_str(&format!("=== Treated unit: {} ===\n", record.treated_unit));
        out.push_str(&format!(
            "Effect estimate (SDID): {}\n",
            round2(record.sdid_estimate)
        ));
        out.push_str(&format!(
            "Pre-treatment:  treated={} synthetic={}\n",
            round2(record.treated_pre_value),
            round2(record.control_pre_value)
        ));
        out.push_str(&format!(
            "Post-treatment: treated={} synthetic={}\n",
            round2(record.treated_post_value),
            round2(record.control_post_value)
        ));
        out.push_str(&format!(
            "Counterfactual: {}\n",
            round2(record.counterfactual_value)
        ));
        out.push('\n');
    }

    if let Some(mean) = mean_treatment_effect(outputs) {
        out.push_str(&format!("Mean treatment effect: {}\n", round2(mean)));
    }

    out
}

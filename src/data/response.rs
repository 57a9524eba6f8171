//! Typed model of the SDID estimation-service response.
//!
//! The response arrives verbatim from an external collaborator; beyond shape
//! checks performed by deserialization we do not validate it. Fields the
//! service may omit (placebo flag, time window) default to their absent
//! forms so a minimal response still decodes.

use serde::{Deserialize, Serialize};

use crate::domain::SynthControlWeights;
use crate::error::AppError;

/// Paired treated/control series for one unit, as flat parallel arrays.
///
/// `x`/`y`/`color` have even length `2n`: indices `[0, n)` are the treated
/// series and `[n, 2n)` the synthetic-control series, in matching date
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputLines {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub color: Vec<String>,
}

/// Scalar estimates and series for one unit's estimator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOutput {
    pub lines: OutputLines,
    pub sdid_estimate: f64,
    #[serde(default)]
    pub weighted_synthdid_controls: SynthControlWeights,
    pub time_before_intervention: f64,
    pub time_after_intervention: f64,
    pub treated_pre_value: f64,
    pub treated_post_value: f64,
    pub control_pre_value: f64,
    pub control_post_value: f64,
    pub intercept_offset: f64,
    pub counterfactual_value: f64,
}

/// One unit's estimator result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitResult {
    pub unit: String,
    pub output: UnitOutput,
}

/// The full estimation-service response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdidResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub outputs: Vec<UnitResult>,
    /// True when the run simulated treatment for every untreated unit.
    #[serde(default)]
    pub compute_placebos: bool,
    /// The reduced `[start, end]` date window actually consumed, if any.
    #[serde(default)]
    pub consistent_time_window: Option<Vec<i64>>,
    /// True when the estimator shifted/aligned dates itself.
    #[serde(default)]
    pub time_mapping_applied: bool,
}

/// Decode a received JSON payload into a typed response.
pub fn decode_response(payload: &str) -> Result<SdidResponse, AppError> {
    serde_json::from_str(payload)
        .map_err(|e| AppError::decode(format!("Failed to decode estimator response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_minimal_response() {
        let payload = r#"{
            "message": "success",
            "outputs": [{
                "unit": "california",
                "output": {
                    "lines": {
                        "x": [1989, 1990, 1989, 1990],
                        "y": [10.0, 11.0, 9.5, 10.5],
                        "color": ["treated", "treated", "control", "control"]
                    },
                    "sdid_estimate": -1.234,
                    "time_before_intervention": 1989.0,
                    "time_after_intervention": 1990.0,
                    "treated_pre_value": 10.0,
                    "treated_post_value": 11.0,
                    "control_pre_value": 9.5,
                    "control_post_value": 10.5,
                    "intercept_offset": 0.5,
                    "counterfactual_value": 10.0
                }
            }],
            "compute_placebos": false,
            "consistent_time_window": null,
            "time_mapping_applied": false
        }"#;

        let res = decode_response(payload).unwrap();
        assert_eq!(res.outputs.len(), 1);
        assert_eq!(res.outputs[0].unit, "california");
        assert_eq!(res.outputs[0].output.lines.x.len(), 4);
        assert!(!res.compute_placebos);
        assert!(res.consistent_time_window.is_none());
    }

    #[test]
    fn decode_rejects_malformed_payload() {
        let err = decode_response("{not json").unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn omitted_flags_default_to_absent() {
        let payload = r#"{"outputs": []}"#;
        let res = decode_response(payload).unwrap();
        assert!(res.outputs.is_empty());
        assert!(!res.compute_placebos);
        assert!(!res.time_mapping_applied);
        assert!(res.message.is_none());
    }
}

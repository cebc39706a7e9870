//! Scoring response shape and validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use visage_core::{UpstreamError, UpstreamResult};

/// Scores returned by the remote model.
///
/// The metric set is open — the model currently reports seven facial metrics
/// (jawline, cheekbones, eye/facial symmetry, nose harmony, skin quality,
/// dimorphism) but this layer only enforces the range invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub scores: BTreeMap<String, f64>,
    pub model_version: String,
}

impl ScoreResult {
    /// Enforce the contract invariant: every score lies in `[0, 100]`.
    pub fn validate(&self) -> UpstreamResult<()> {
        for (metric, value) in &self.scores {
            if !value.is_finite() || *value < 0.0 || *value > 100.0 {
                return Err(UpstreamError::malformed(format!(
                    "score for {metric} out of range: {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(metric: &str, value: f64) -> ScoreResult {
        ScoreResult {
            scores: BTreeMap::from([(metric.to_string(), value)]),
            model_version: "efficientnet_b0_v1".to_string(),
        }
    }

    #[test]
    fn in_range_scores_pass() {
        assert!(result_with("jawline", 0.0).validate().is_ok());
        assert!(result_with("jawline", 72.0).validate().is_ok());
        assert!(result_with("jawline", 100.0).validate().is_ok());
    }

    #[test]
    fn out_of_range_scores_are_malformed() {
        assert!(result_with("jawline", -1.0).validate().is_err());
        assert!(result_with("jawline", 100.5).validate().is_err());
        assert!(result_with("jawline", f64::NAN).validate().is_err());
    }

    #[test]
    fn wire_shape_uses_camel_case_model_version() {
        let json = serde_json::json!({
            "scores": { "jawline": 72, "skin_quality": 61 },
            "modelVersion": "efficientnet_b0_v1"
        });

        let result: ScoreResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.scores["jawline"], 72.0);
        assert_eq!(result.model_version, "efficientnet_b0_v1");

        let back = serde_json::to_value(&result).unwrap();
        assert!(back.get("modelVersion").is_some());
    }
}

//! Per-family risk normalization.
//!
//! Each algorithm family emits its own raw signal: a reconstruction error, a
//! decision-function value or a centrality measure. A [`FamilyProfile`]
//! describes how that signal maps onto the shared `[0, 100]` scale and which
//! label it earns; one [`RiskNormalizer`] applies any profile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::record::{clamp_risk, NORMAL};

/// Fixed risk of a corpus-volume record.
pub const VOLUME_RISK: f64 = 70.0;
/// Label of a corpus-volume record.
pub const VOLUME_LABEL: &str = "high_data_volume";
/// Default row-count trigger of the volume check.
pub const DEFAULT_VOLUME_THRESHOLD: u64 = 10_000;

/// Affine map `scale * x + offset`, where `x` is the signal or its magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub scale: f64,
    pub offset: f64,
    /// Apply the map to `|x|` instead of `x`.
    #[serde(default)]
    pub magnitude: bool,
}

impl Scaling {
    pub const fn linear(scale: f64) -> Self {
        Self {
            scale,
            offset: 0.0,
            magnitude: false,
        }
    }

    pub const fn affine(scale: f64, offset: f64) -> Self {
        Self {
            scale,
            offset,
            magnitude: false,
        }
    }

    pub const fn of_magnitude(mut self) -> Self {
        self.magnitude = true;
        self
    }

    pub fn apply(&self, value: f64) -> f64 {
        let x = if self.magnitude { value.abs() } else { value };
        self.scale * x + self.offset
    }
}

/// How a normalized signal earns its anomaly label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "value")]
pub enum LabelRule {
    /// Anomalous when the clamped risk is strictly above the value.
    RiskAbove(f64),
    /// Anomalous when the estimator flagged the row as an outlier.
    OutlierVerdict,
}

/// Scaling record of one algorithm family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyProfile {
    /// Short family name, e.g. `mse`.
    pub family: String,
    pub scaling: Scaling,
    /// Scaling for inliers; only the decision-boundary family sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inlier_scaling: Option<Scaling>,
    pub label_rule: LabelRule,
    /// Label used when the rule fires.
    pub anomaly_label: String,
    /// `details` key holding the raw signal.
    pub signal_key: String,
}

impl FamilyProfile {
    /// Reconstruction family with its own error metric name and multiplier.
    pub fn reconstruction(metric: &str, k: f64) -> Self {
        Self {
            family: metric.to_string(),
            scaling: Scaling::linear(k),
            inlier_scaling: None,
            label_rule: LabelRule::RiskAbove(50.0),
            anomaly_label: format!("{metric}_reconstruction_error"),
            signal_key: metric.to_string(),
        }
    }

    /// Squared-error reconstruction: `risk = mse * 50`.
    pub fn mse() -> Self {
        Self::reconstruction("mse", 50.0)
    }

    /// Absolute-error reconstruction: `risk = mae * 100`.
    pub fn mae() -> Self {
        Self::reconstruction("mae", 100.0)
    }

    /// Isolation-style decision boundary.
    ///
    /// Outliers score `|s| * 100 + 50`, inliers `(1 - s) * 20`.
    pub fn decision_boundary() -> Self {
        Self {
            family: "decision_boundary".to_string(),
            scaling: Scaling::affine(100.0, 50.0).of_magnitude(),
            inlier_scaling: Some(Scaling::affine(-20.0, 20.0)),
            label_rule: LabelRule::OutlierVerdict,
            anomaly_label: "statistical_outlier".to_string(),
            signal_key: "raw_score".to_string(),
        }
    }

    /// Graph centrality, de-biased by node count: `risk = c * n * 20`.
    pub fn centrality() -> Self {
        Self {
            family: "centrality".to_string(),
            scaling: Scaling::linear(20.0),
            inlier_scaling: None,
            label_rule: LabelRule::RiskAbove(50.0),
            anomaly_label: "high_centrality".to_string(),
            signal_key: "pagerank".to_string(),
        }
    }
}

/// One algorithm-native score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSignal {
    pub value: f64,
    /// Multiplier applied before scaling (node count for centrality).
    pub weight: f64,
    /// Outlier verdict, for families that produce one.
    pub outlier: Option<bool>,
}

impl RawSignal {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            weight: 1.0,
            outlier: None,
        }
    }

    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_verdict(mut self, outlier: bool) -> Self {
        self.outlier = Some(outlier);
        self
    }
}

/// Output of the normalizer for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRisk {
    pub risk_score: f64,
    pub anomaly_type: String,
    pub details: BTreeMap<String, Value>,
}

/// Applies a [`FamilyProfile`] to raw signals.
#[derive(Debug, Clone)]
pub struct RiskNormalizer {
    profile: FamilyProfile,
}

impl RiskNormalizer {
    pub fn new(profile: FamilyProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &FamilyProfile {
        &self.profile
    }

    /// Maps one signal to a clamped risk, a non-empty label and its details.
    pub fn normalize(&self, signal: RawSignal) -> NormalizedRisk {
        let outlier = signal.outlier.unwrap_or(false);
        let scaling = match (&self.profile.inlier_scaling, outlier) {
            (Some(inlier), false) => inlier,
            _ => &self.profile.scaling,
        };
        let risk_score = clamp_risk(scaling.apply(signal.value * signal.weight));

        let anomalous = match self.profile.label_rule {
            LabelRule::RiskAbove(threshold) => risk_score > threshold,
            LabelRule::OutlierVerdict => outlier,
        };
        let anomaly_type = if anomalous && !self.profile.anomaly_label.is_empty() {
            self.profile.anomaly_label.clone()
        } else {
            NORMAL.to_string()
        };

        let mut details = BTreeMap::new();
        details.insert(self.profile.signal_key.clone(), Value::from(signal.value));
        NormalizedRisk {
            risk_score,
            anomaly_type,
            details,
        }
    }

    pub fn normalize_all(&self, signals: impl IntoIterator<Item = RawSignal>) -> Vec<NormalizedRisk> {
        signals.into_iter().map(|s| self.normalize(s)).collect()
    }
}

/// The corpus-volume rule: one record when `row_count > threshold`, none otherwise.
pub fn volume_risk(row_count: u64, threshold: u64) -> Option<NormalizedRisk> {
    if row_count <= threshold {
        return None;
    }
    let mut details = BTreeMap::new();
    details.insert("row_count".to_string(), Value::from(row_count));
    details.insert("threshold".to_string(), Value::from(threshold));
    Some(NormalizedRisk {
        risk_score: VOLUME_RISK,
        anomaly_type: VOLUME_LABEL.to_string(),
        details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mse_profile() {
        let normalizer = RiskNormalizer::new(FamilyProfile::mse());

        let high = normalizer.normalize(RawSignal::new(1.2));
        assert!(approx(high.risk_score, 60.0));
        assert_eq!(high.anomaly_type, "mse_reconstruction_error");
        assert_eq!(high.details["mse"], Value::from(1.2));

        let exactly_fifty = normalizer.normalize(RawSignal::new(1.0));
        assert_eq!(exactly_fifty.anomaly_type, NORMAL);

        let huge = normalizer.normalize(RawSignal::new(1e9));
        assert_eq!(huge.risk_score, 100.0);
    }

    #[test]
    fn test_mae_profile() {
        let risk = RiskNormalizer::new(FamilyProfile::mae()).normalize(RawSignal::new(0.3));
        assert!(approx(risk.risk_score, 30.0));
        assert_eq!(risk.anomaly_type, NORMAL);
        assert!(risk.details.contains_key("mae"));
    }

    #[test]
    fn test_decision_boundary_profile() {
        let normalizer = RiskNormalizer::new(FamilyProfile::decision_boundary());

        let outlier = normalizer.normalize(RawSignal::new(-0.2).with_verdict(true));
        assert!(approx(outlier.risk_score, 70.0));
        assert_eq!(outlier.anomaly_type, "statistical_outlier");
        assert_eq!(outlier.details["raw_score"], Value::from(-0.2));

        let inlier = normalizer.normalize(RawSignal::new(0.1).with_verdict(false));
        assert!(approx(inlier.risk_score, 18.0));
        assert_eq!(inlier.anomaly_type, NORMAL);

        let deep_inlier = normalizer.normalize(RawSignal::new(2.0).with_verdict(false));
        assert_eq!(deep_inlier.risk_score, 0.0);

        let strong_outlier = normalizer.normalize(RawSignal::new(-0.9).with_verdict(true));
        assert_eq!(strong_outlier.risk_score, 100.0);
    }

    #[test]
    fn test_centrality_profile_uses_node_count() {
        let normalizer = RiskNormalizer::new(FamilyProfile::centrality());

        let hub = normalizer.normalize(RawSignal::new(0.2).weighted(20.0));
        assert!(approx(hub.risk_score, 80.0));
        assert_eq!(hub.anomaly_type, "high_centrality");
        assert_eq!(hub.details["pagerank"], Value::from(0.2));

        let leaf = normalizer.normalize(RawSignal::new(0.05).weighted(20.0));
        assert!(approx(leaf.risk_score, 20.0));
        assert_eq!(leaf.anomaly_type, NORMAL);
    }

    #[test]
    fn test_non_finite_signals() {
        let normalizer = RiskNormalizer::new(FamilyProfile::mse());
        assert_eq!(normalizer.normalize(RawSignal::new(f64::NAN)).risk_score, 0.0);
        assert_eq!(normalizer.normalize(RawSignal::new(f64::INFINITY)).risk_score, 100.0);
        assert_eq!(normalizer.normalize(RawSignal::new(f64::NEG_INFINITY)).risk_score, 0.0);
    }

    #[test]
    fn test_volume_rule() {
        assert!(volume_risk(10_000, DEFAULT_VOLUME_THRESHOLD).is_none());

        let risk = volume_risk(10_001, DEFAULT_VOLUME_THRESHOLD).unwrap();
        assert_eq!(risk.risk_score, VOLUME_RISK);
        assert_eq!(risk.anomaly_type, VOLUME_LABEL);
        assert_eq!(risk.details["row_count"], Value::from(10_001u64));
        assert_eq!(risk.details["threshold"], Value::from(10_000u64));
    }

    #[test]
    fn test_profile_roundtrips_through_json() {
        let profile = FamilyProfile::decision_boundary();
        let json = serde_json::to_string(&profile).unwrap();
        let back: FamilyProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}

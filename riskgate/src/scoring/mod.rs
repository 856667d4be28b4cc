//! Conversion of algorithm-native signals into the shared risk scale.

pub mod normalizer;

pub use normalizer::{
    volume_risk, FamilyProfile, LabelRule, NormalizedRisk, RawSignal, RiskNormalizer, Scaling,
    DEFAULT_VOLUME_THRESHOLD, VOLUME_LABEL, VOLUME_RISK,
};

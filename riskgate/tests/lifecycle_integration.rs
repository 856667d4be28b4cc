//! Integration tests driving every built-in plugin through its lifecycle.

use riskgate::core::{
    output_schema, Dataset, ExecutionContext, LifecycleState, ModelFamily, Parameters,
    TrainingStatus,
};
use riskgate::plugins::ModelRegistry;
use riskgate::test_fixtures::{auth_events, star_edges_batch, OUTLIER_ID};
use std::collections::HashSet;

const ROW_PLUGINS: [&str; 3] = ["isolation-forest", "dense-autoencoder", "absolute-autoencoder"];

#[test]
fn test_row_plugins_score_every_row() {
    let registry = ModelRegistry::builtin();
    let dataset = auth_events(40);
    let ctx = ExecutionContext::lightweight(dataset.clone());

    for slug in ROW_PLUGINS {
        let mut plugin = registry.create(slug).unwrap();
        let training = plugin.train(&ctx).unwrap();
        assert_eq!(training.status, TrainingStatus::Success, "{slug}");
        assert_eq!(plugin.lifecycle_state(), LifecycleState::Trained);
        assert_eq!(plugin.state().expected_width(), 3, "{slug}");

        let frame = plugin.infer(&ctx).unwrap();
        assert_eq!(frame.len(), dataset.num_rows(), "{slug}");

        let ids: HashSet<_> = frame.records().iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids.len(), dataset.num_rows(), "{slug}: identities must be unique");
        assert!(ids.contains(OUTLIER_ID));

        for record in frame.records() {
            assert!((0.0..=100.0).contains(&record.risk_score()), "{slug}");
            assert!(!record.anomaly_type().is_empty());
        }

        let batch = frame.to_record_batch().unwrap();
        assert_eq!(batch.schema(), output_schema());
        assert_eq!(batch.num_rows(), dataset.num_rows());
    }
}

#[test]
fn test_isolation_forest_ranks_outlier_first() {
    let mut plugin = ModelRegistry::builtin().create("isolation-forest").unwrap();
    let ctx = ExecutionContext::lightweight(auth_events(60));
    plugin.train(&ctx).unwrap();
    let frame = plugin.infer(&ctx).unwrap();

    let top = frame
        .records()
        .iter()
        .max_by(|a, b| a.risk_score().total_cmp(&b.risk_score()))
        .unwrap();
    assert_eq!(top.entity_id, OUTLIER_ID);
    assert_eq!(top.anomaly_type(), "statistical_outlier");
}

#[test]
fn test_width_stays_fixed_after_training() {
    let registry = ModelRegistry::builtin();
    let narrow = Dataset::from_json_rows(&[
        serde_json::json!({"entity_id": "x", "logins": 3}),
        serde_json::json!({"entity_id": "y", "logins": 4}),
    ])
    .unwrap();

    for slug in ROW_PLUGINS {
        let mut plugin = registry.create(slug).unwrap();
        plugin.train(&ExecutionContext::lightweight(auth_events(20))).unwrap();

        let (ctx, sink) = ExecutionContext::capturing(narrow.clone());
        let frame = plugin.infer(&ctx).unwrap();
        assert_eq!(frame.len(), 2, "{slug}");
        assert_eq!(plugin.state().expected_width(), 3, "{slug}");
        assert!(sink.contains(tracing::Level::WARN, "expected 3, got 1"), "{slug}");
    }
}

#[test]
fn test_lazy_training_on_first_inference() {
    let registry = ModelRegistry::builtin();
    for slug in ROW_PLUGINS {
        let mut plugin = registry.create(slug).unwrap();
        assert_eq!(plugin.lifecycle_state(), LifecycleState::Uninitialized);

        let (ctx, sink) = ExecutionContext::capturing(auth_events(20));
        plugin.infer(&ctx).unwrap();
        assert_eq!(plugin.lifecycle_state(), LifecycleState::LazilyTrained, "{slug}");
        assert!(!sink.warnings().is_empty(), "{slug}");
    }
}

#[test]
fn test_empty_inference_by_family() {
    let registry = ModelRegistry::builtin();
    for slug in registry.slugs() {
        let mut plugin = registry.create(slug).unwrap();
        let (ctx, sink) = ExecutionContext::capturing(Dataset::empty());
        let outcome = plugin.infer(&ctx);

        if plugin.family() == ModelFamily::DecisionBoundary {
            let err = outcome.unwrap_err();
            assert!(err.to_string().contains("No data available"), "{slug}: {err}");
        } else {
            assert!(outcome.unwrap().is_empty(), "{slug}");
            assert!(!sink.warnings().is_empty(), "{slug}");
        }
    }
}

#[test]
fn test_volume_check_is_repeatable_over_one_context() {
    let mut plugin = ModelRegistry::builtin().create("volume-check").unwrap();
    let ctx = ExecutionContext::lightweight(auth_events(20))
        .with_parameters(Parameters::new().with("threshold", 10));

    let first = plugin.infer(&ctx).unwrap();
    let second = plugin.infer(&ctx).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert_eq!(first.records()[0].details["row_count"], 21);
}

#[test]
fn test_centrality_on_star_graph() {
    let mut plugin = ModelRegistry::builtin().create("pagerank-centrality").unwrap();
    let ctx = ExecutionContext::lightweight(Dataset::new(star_edges_batch(12)));
    let training = plugin.train(&ctx).unwrap();
    assert_eq!(training.metrics["nodes"], 16);
    assert_eq!(training.metrics["edges"], 14);

    let frame = plugin.infer(&ctx).unwrap();
    assert_eq!(frame.len(), 16);
    let flagged: Vec<_> = frame.anomalies().map(|r| r.entity_id.as_str()).collect();
    assert_eq!(flagged, vec!["hub"]);
    for record in frame.records() {
        assert_eq!(record.entity_type.as_deref(), Some("node"));
    }
}

//! End-to-end tests for the graph crate: build a workflow through the
//! store API, validate it, resolve it into batch configs, apply a batch
//! response, and round-trip the whole thing through the autosave slot.

use serde_json::json;

use flowbench_graph::{
    apply_batch_results, builtin_templates, load_or_seed, save_snapshot, validate,
    validate_or_raise, Resolver, Severity, WorkflowGraph,
};
use flowbench_types::{NodeData, NodeKind, Position};

/// Build a full dataset -> imputation -> split -> model -> result chain
/// through the public store API, the way an editor session would.
fn build_session_graph() -> (WorkflowGraph, String) {
    let mut graph = WorkflowGraph::seed();
    let dataset = graph.nodes()[0].id.clone();
    graph
        .update_node_data(
            &dataset,
            NodeData::Dataset {
                label: "Churn CSV".into(),
                file: Some("churn.csv".into()),
                file_id: Some("ds-17".into()),
                columns: vec!["age".into(), "plan".into(), "churned".into()],
                preview: Vec::new(),
                shape: Some((1200, 3)),
            },
        )
        .unwrap();

    let imputation = graph.add_node(NodeKind::Imputation, Position::new(250.0, 50.0));
    let split = graph.add_node(NodeKind::Split, Position::new(450.0, 50.0));
    let model = graph.add_node(NodeKind::Model, Position::new(650.0, 50.0));
    let result = graph.add_node(NodeKind::Result, Position::new(850.0, 50.0));

    graph.connect(&dataset, &imputation).unwrap();
    graph.connect(&imputation, &split).unwrap();
    graph.connect(&split, &model).unwrap();
    graph.connect(&model, &result).unwrap();

    graph
        .update_node_data(
            &model,
            NodeData::Model {
                label: "Churn Model".into(),
                target_column: Some("churned".into()),
                model_type: Some("Random Forest".into()),
                columns: vec!["age".into(), "plan".into(), "churned".into()],
            },
        )
        .unwrap();

    (graph, result)
}

#[test]
fn session_graph_validates_resolves_and_applies_results() {
    let (mut graph, result_id) = build_session_graph();

    // Column propagation: the model picked up the dataset's columns when
    // it was updated explicitly above, and validation is clean at the
    // error level.
    assert!(validate_or_raise(&graph).is_ok());

    let batch = Resolver::new().resolve(&graph).unwrap();
    assert!(batch.skipped.is_empty());
    let config = &batch.configs[&result_id];
    assert_eq!(config.file_id, "ds-17");
    assert_eq!(config.target_column, "churned");
    assert_eq!(config.imputer_strategy, "mean");
    assert_eq!(config.model_type, "Random Forest");

    let response = json!({
        &result_id: {
            "accuracy": 0.91,
            "is_regression": false,
            "confusion_matrix": [[50, 3], [4, 43]],
        }
    });
    let report = apply_batch_results(
        &mut graph,
        response.as_object().unwrap(),
    );
    assert_eq!(report.success_count, 1);
    assert!(report.node_errors.is_empty());

    match &graph.node(&result_id).unwrap().data {
        NodeData::Result { metrics, .. } => {
            assert_eq!(metrics["accuracy"], json!(0.91));
        }
        other => panic!("Expected result data, got: {other:?}"),
    }
}

#[test]
fn a_second_disconnected_result_is_skipped_not_fatal() {
    let (graph, result_id) = build_session_graph();
    let mut graph = graph;
    graph.add_node(NodeKind::Result, Position::new(900.0, 300.0));

    let batch = Resolver::new().resolve(&graph).unwrap();
    assert_eq!(batch.configs.len(), 1);
    assert!(batch.configs.contains_key(&result_id));
    assert_eq!(batch.skipped.len(), 1);
}

#[test]
fn validation_flags_structural_problems_before_resolution() {
    let mut graph = WorkflowGraph::new();
    graph.add_node(NodeKind::Result, Position::default());
    graph.add_node(NodeKind::Model, Position::default());

    let diagnostics = validate(&graph);
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.rule == "result_has_model"));
    assert!(diagnostics
        .iter()
        .any(|d| d.rule == "model_target_column"));
}

#[tokio::test]
async fn autosave_round_trip_preserves_a_resolvable_graph() {
    let dir = tempfile::tempdir().unwrap();
    let (graph, result_id) = build_session_graph();

    save_snapshot(&graph, dir.path()).await.unwrap();
    let restored = load_or_seed(dir.path()).await.unwrap();

    assert_eq!(restored.nodes(), graph.nodes());
    assert_eq!(restored.edges(), graph.edges());

    let batch = Resolver::new().resolve(&restored).unwrap();
    assert!(batch.configs.contains_key(&result_id));
}

#[test]
fn templates_resolve_once_a_dataset_and_target_are_filled_in() {
    let template = builtin_templates()
        .into_iter()
        .find(|t| t.id == "linear-regression")
        .unwrap();
    let mut graph = template.into_graph();

    // Fresh templates have no uploaded file and no target column, so every
    // result is skipped and resolution reports no pipeline paths.
    assert!(Resolver::new().resolve(&graph).is_err());

    let dataset = graph
        .nodes()
        .iter()
        .find(|n| n.kind() == NodeKind::Dataset)
        .unwrap()
        .id
        .clone();
    let model = graph
        .nodes()
        .iter()
        .find(|n| n.kind() == NodeKind::Model)
        .unwrap()
        .id
        .clone();
    graph
        .update_node_data(
            &dataset,
            NodeData::Dataset {
                label: "Housing Data".into(),
                file: None,
                file_id: Some("ds-housing".into()),
                columns: vec!["sqft".into(), "price".into()],
                preview: Vec::new(),
                shape: None,
            },
        )
        .unwrap();
    graph
        .update_node_data(
            &model,
            NodeData::Model {
                label: "Linear Regression".into(),
                target_column: Some("price".into()),
                model_type: Some("Linear Regression".into()),
                columns: vec!["sqft".into(), "price".into()],
            },
        )
        .unwrap();

    let batch = Resolver::new().resolve(&graph).unwrap();
    assert_eq!(batch.configs.len(), 1);
    let config = batch.configs.values().next().unwrap();
    assert_eq!(config.file_id, "ds-housing");
    assert_eq!(config.model_type, "Linear Regression");
    assert_eq!(config.test_size, 0.2);
}

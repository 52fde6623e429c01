//! End-to-end pipeline runs against in-memory fixtures.

use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use drugpredict_analysis::model::{EXTENDED_ALGORITHM, REDUCED_ALGORITHM};
use drugpredict_analysis::{
    AnalysisPipeline, AnalysisRequest, PipelineError, ProgressObserver, Stage,
};
use drugpredict_common::Config;
use drugpredict_ingestion::RecordLimit;
use drugpredict_molecules::padel::ExtendedDescriptorSource;
use drugpredict_molecules::LipinskiEngine;
use drugpredict_test_utils::{
    synthetic_activities, InMemoryActivitySource, SyntheticDescriptors, TimedOutDescriptors,
    UnavailableDescriptors, MIXED_POTENCIES_NM,
};

#[derive(Default)]
struct RecordingObserver {
    updates: Mutex<Vec<(Stage, u8, String)>>,
}

impl ProgressObserver for RecordingObserver {
    fn update(&self, stage: Stage, progress: u8, message: &str) {
        self.updates.lock().unwrap().push((stage, progress, message.to_string()));
    }
}

fn config(data_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.output.data_dir = data_dir.to_path_buf();
    config.model.n_estimators = 20;
    config
}

fn pipeline(
    config: Config,
    potencies: &[f64],
    extended: Arc<dyn ExtendedDescriptorSource>,
) -> AnalysisPipeline {
    AnalysisPipeline::new(
        Arc::new(config),
        Arc::new(InMemoryActivitySource::new(synthetic_activities(potencies))),
        Arc::new(LipinskiEngine::new()),
        extended,
    )
}

fn request(target: &str) -> AnalysisRequest {
    AnalysisRequest { target: target.to_string(), limit: RecordLimit::Count(1000) }
}

#[tokio::test]
async fn test_full_run_with_lipinski_features() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(config(dir.path()), &MIXED_POTENCIES_NM, Arc::new(UnavailableDescriptors));
    let observer = RecordingObserver::default();

    let results = pipeline.run(&request("EGFR"), &observer).await.unwrap();

    assert_eq!(results.target_id, "CHEMBL203");
    assert_eq!(results.target_name, "EGFR");
    assert_eq!(results.data_limit, "1000");
    assert_eq!(results.total_compounds, 12);
    assert_eq!(
        (results.active_compounds, results.intermediate_compounds, results.inactive_compounds),
        (4, 2, 6)
    );
    assert_eq!(results.compounds.len(), 12);

    let tested: Vec<&str> = results
        .statistics
        .mann_whitney_tests
        .iter()
        .map(|t| t.descriptor.as_str())
        .collect();
    assert_eq!(tested, vec!["pIC50", "MW", "LogP", "NumHDonors", "NumHAcceptors"]);
    // Potency fully separates the classes.
    assert!(results.statistics.mann_whitney_tests[0].p_value <= 0.05);
    assert_eq!(results.statistics.summary.intermediate_count, 2);

    assert_eq!(results.plots.len(), 7);
    assert_eq!(results.predictions.model_info.algorithm, REDUCED_ALGORITHM);
    assert_eq!(results.predictions.model_info.features, 4);
    assert_eq!(results.predictions.model_info.test_rows, 3);
    assert!(results.predictions.regression_plot.is_some());

    let processed = dir.path().join("processed").join(&results.run_id);
    assert!(processed.join("bioactivity_final.csv").is_file());
    assert!(processed.join("mannwhitneyu_pIC50.csv").is_file());
    let charts = dir.path().join("outputs").join(&results.run_id);
    assert!(charts.join("plot_MW_vs_LogP.svg").is_file());
    assert_eq!(
        results.plots[1].image_path,
        format!("/outputs/{}/plot_MW_vs_LogP.svg", results.run_id)
    );

    let steps: Vec<(Stage, u8)> =
        observer.updates.lock().unwrap().iter().map(|(s, p, _)| (*s, *p)).collect();
    assert_eq!(
        steps,
        vec![
            (Stage::Retrieving, 10),
            (Stage::Retrieving, 15),
            (Stage::Preprocessing, 25),
            (Stage::Labeling, 35),
            (Stage::Descriptors, 50),
            (Stage::Analysis, 60),
            (Stage::Analysis, 70),
            (Stage::Plotting, 80),
            (Stage::Ml, 90),
            (Stage::Finalizing, 95),
            (Stage::Complete, 100),
        ]
    );
}

#[tokio::test]
async fn test_extended_features_used_when_available() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(config(dir.path()), &MIXED_POTENCIES_NM, Arc::new(SyntheticDescriptors));

    let results = pipeline.run(&request("CHEMBL203"), &RecordingObserver::default()).await.unwrap();

    let info = &results.predictions.model_info;
    assert_eq!(info.algorithm, EXTENDED_ALGORITHM);
    // The constant column falls below the variance threshold.
    assert_eq!(info.features, 3);
    assert_eq!(info.strategy.as_deref(), Some("extended"));
}

#[tokio::test]
async fn test_descriptor_timeout_falls_back_to_reduced_features() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(TimedOutDescriptors::new());
    let pipeline = pipeline(config(dir.path()), &MIXED_POTENCIES_NM, source.clone());
    let observer = RecordingObserver::default();

    let results = pipeline.run(&request("EGFR"), &observer).await.unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    let info = &results.predictions.model_info;
    assert_eq!(info.algorithm, REDUCED_ALGORITHM);
    assert_eq!(info.strategy.as_deref(), Some("reduced"));
    assert_eq!(info.features, 4);
    assert_eq!(results.total_compounds, 12);
    let last = observer.updates.lock().unwrap().last().cloned().unwrap();
    assert_eq!((last.0, last.1), (Stage::Complete, 100));
}

#[tokio::test]
async fn test_base_url_prefixes_plot_paths() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.output.public_base_url = Some("https://drugpredict.test".into());
    let pipeline = pipeline(config, &MIXED_POTENCIES_NM, Arc::new(UnavailableDescriptors));

    let results = pipeline.run(&request("EGFR"), &RecordingObserver::default()).await.unwrap();
    assert!(results
        .plots
        .iter()
        .all(|p| p.image_path.starts_with("https://drugpredict.test/outputs/")));
}

#[tokio::test]
async fn test_too_few_records_fails_at_retrieval() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(config(dir.path()), &MIXED_POTENCIES_NM[..5], Arc::new(UnavailableDescriptors));
    let observer = RecordingObserver::default();

    let err: PipelineError = pipeline.run(&request("EGFR"), &observer).await.unwrap_err();
    assert_eq!(err.stage, Stage::Retrieving);
    assert!(err.is_validation());
    assert!(err.to_string().contains("found 5 compounds"));
    assert!(observer.updates.lock().unwrap().iter().all(|(s, _, _)| *s == Stage::Retrieving));
}

#[tokio::test]
async fn test_unknown_target_is_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(config(dir.path()), &MIXED_POTENCIES_NM, Arc::new(UnavailableDescriptors));

    let err = pipeline
        .run(&request("no such protein"), &RecordingObserver::default())
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("No targets found"));
}

#[tokio::test]
async fn test_tiny_dataset_reports_failed_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.pipeline.min_records = 3;
    let pipeline = pipeline(config, &[100.0, 200.0, 50000.0, 70000.0], Arc::new(UnavailableDescriptors));

    let results = pipeline.run(&request("EGFR"), &RecordingObserver::default()).await.unwrap();
    assert_eq!(results.total_compounds, 4);
    assert_eq!(results.predictions.model_info.algorithm, "Failed");
    assert_eq!(results.predictions.metrics.r2_score, 0.0);
    assert!(results.predictions.regression_plot.is_none());
}

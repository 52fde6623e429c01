//! End-to-end analysis pipeline.
//!
//! Runs the stages strictly in order for one target:
//!   1. Resolve the target and download its activity records
//!   2. Drop incomplete, zero-potency and duplicate rows
//!   3. Label potency classes and strip salts
//!   4. Compute Lipinski descriptors
//!   5. Convert potency to pIC50 and save the final dataset
//!   6. Mann–Whitney tests per descriptor
//!   7. Charts
//!   8. Random forest regression (extended or Lipinski features)
//!   9. Compile the result payload
//!
//! Progress is reported through a [`ProgressObserver`]. Any stage error ends
//! the run; charts and model training degrade instead of failing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use drugpredict_common::Config;
use drugpredict_ingestion::sources::chembl::ChemblClient;
use drugpredict_ingestion::sources::ActivitySource;
use drugpredict_ingestion::{retrieve_target_data, IngestionError, RecordLimit};
use drugpredict_molecules::padel::{ExtendedDescriptorSource, PadelRunner};
use drugpredict_molecules::{DescriptorEngine, LipinskiEngine};

use crate::artifacts;
use crate::classify::label_compounds;
use crate::descriptors::add_descriptors;
use crate::error::AnalysisError;
use crate::model::{self, PredictionReport};
use crate::normalize::process_potency;
use crate::plots::PlotRenderer;
use crate::preprocess::preprocess;
use crate::records::CompoundRecord;
use crate::report::{compile_results, AnalysisResults, StageOutputs};
use crate::stats::run_statistics;

// ── Stages and progress ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Starting,
    Retrieving,
    Preprocessing,
    Labeling,
    Descriptors,
    Analysis,
    Plotting,
    Ml,
    Finalizing,
    Complete,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Starting => "starting",
            Stage::Retrieving => "retrieving",
            Stage::Preprocessing => "preprocessing",
            Stage::Labeling => "labeling",
            Stage::Descriptors => "descriptors",
            Stage::Analysis => "analysis",
            Stage::Plotting => "plotting",
            Stage::Ml => "ml",
            Stage::Finalizing => "finalizing",
            Stage::Complete => "complete",
            Stage::Error => "error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives stage transitions while a run is in progress.
pub trait ProgressObserver: Send + Sync {
    fn update(&self, stage: Stage, progress: u8, message: &str);
}

/// Observer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ProgressObserver for LoggingObserver {
    fn update(&self, stage: Stage, progress: u8, message: &str) {
        info!(stage = %stage, progress, "{}", message);
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StageFailure {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// A failed run, tagged with the stage that failed.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: StageFailure,
}

impl PipelineError {
    fn at(stage: Stage, source: impl Into<StageFailure>) -> Self {
        Self { stage, source: source.into() }
    }

    /// Failures caused by the request (unknown target, too few records).
    pub fn is_validation(&self) -> bool {
        match &self.source {
            StageFailure::Ingestion(e) => e.is_validation(),
            StageFailure::Analysis(e) => matches!(e, AnalysisError::Validation(_)),
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Parameters for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub target: String,
    pub limit: RecordLimit,
}

/// Shared, stateless runner; each call to [`AnalysisPipeline::run`] works on
/// its own data.
pub struct AnalysisPipeline {
    config: Arc<Config>,
    source: Arc<dyn ActivitySource>,
    engine: Arc<dyn DescriptorEngine>,
    extended: Arc<dyn ExtendedDescriptorSource>,
}

impl AnalysisPipeline {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn ActivitySource>,
        engine: Arc<dyn DescriptorEngine>,
        extended: Arc<dyn ExtendedDescriptorSource>,
    ) -> Self {
        Self { config, source, engine, extended }
    }

    /// Live ChEMBL source, built-in descriptor engine and the PaDEL script.
    pub fn from_config(config: Arc<Config>) -> Result<Self, IngestionError> {
        let source = Arc::new(ChemblClient::new(&config.chembl)?);
        let extended = Arc::new(PadelRunner::new(&config.padel, config.output.processed_dir()));
        Ok(Self::new(config, source, Arc::new(LipinskiEngine::new()), extended))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &dyn ActivitySource {
        self.source.as_ref()
    }

    #[instrument(skip(self, observer), fields(target = %request.target, limit = %request.limit))]
    pub async fn run(
        &self,
        request: &AnalysisRequest,
        observer: &dyn ProgressObserver,
    ) -> Result<AnalysisResults, PipelineError> {
        let config = &self.config;
        let target_query = request.target.trim();
        // Artifacts and charts of concurrent runs live in separate directories.
        let run_id = Uuid::new_v4().simple().to_string();
        info!(run_id = %run_id, "Starting complete analysis for: {} with limit: {}", target_query, request.limit);

        // ── 1. Retrieve ───────────────────────────────────────────────────────
        observer.update(Stage::Retrieving, 10, "Starting data retrieval from ChemBL...");
        observer.update(
            Stage::Retrieving,
            15,
            &format!("Searching ChemBL database for {}...", target_query),
        );
        let retrieved = retrieve_target_data(
            self.source.as_ref(),
            target_query,
            request.limit,
            config.pipeline.min_records,
        )
        .await
        .map_err(|e| PipelineError::at(Stage::Retrieving, e))?;

        // ── 2. Preprocess ─────────────────────────────────────────────────────
        observer.update(Stage::Preprocessing, 25, "Cleaning and filtering compound data...");
        let cleaned = preprocess(&retrieved.records, config.pipeline.min_records)
            .map_err(|e| PipelineError::at(Stage::Preprocessing, e))?;

        // ── 3. Label ──────────────────────────────────────────────────────────
        observer.update(Stage::Labeling, 35, "Classifying compounds by bioactivity...");
        let labeled = label_compounds(cleaned);

        // ── 4. Descriptors ────────────────────────────────────────────────────
        observer.update(
            Stage::Descriptors,
            50,
            "Computing molecular properties and Lipinski descriptors...",
        );
        let described = add_descriptors(self.engine.as_ref(), labeled);
        if described.is_empty() {
            return Err(PipelineError::at(
                Stage::Descriptors,
                AnalysisError::Validation("No compounds with valid structures".into()),
            ));
        }

        // ── 5. Potency ────────────────────────────────────────────────────────
        observer.update(
            Stage::Analysis,
            60,
            "Processing IC50 values and performing statistical analysis...",
        );
        let records = process_potency(described);
        let processed_dir = config.output.processed_dir().join(&run_id);
        artifacts::write_final_dataset(&processed_dir, &records)
            .map_err(|e| PipelineError::at(Stage::Analysis, e))?;

        // ── 6. Statistics ─────────────────────────────────────────────────────
        observer.update(Stage::Analysis, 70, "Performing Mann-Whitney U tests...");
        let statistics = run_statistics(&records);
        for result in &statistics.mann_whitney_tests {
            if let Err(e) = artifacts::write_mann_whitney(&processed_dir, result) {
                warn!("Could not save Mann-Whitney result for {}: {}", result.descriptor, e);
            }
        }

        // ── 7. Plots ──────────────────────────────────────────────────────────
        observer.update(Stage::Plotting, 80, "Creating visualization plots and charts...");
        let renderer = PlotRenderer::for_run(config.output.outputs_dir(), &run_id);
        let plots = renderer.render_all(&records);

        // ── 8. Model ──────────────────────────────────────────────────────────
        observer.update(
            Stage::Ml,
            90,
            "Training Random Forest model and making predictions...",
        );
        let predictions = self.train_model(&records, &renderer).await;

        // ── 9. Compile ────────────────────────────────────────────────────────
        observer.update(Stage::Finalizing, 95, "Compiling final results...");
        let results = compile_results(
            &run_id,
            &retrieved.target,
            request.limit,
            &records,
            StageOutputs { statistics, plots, predictions },
            config.pipeline.sample_size,
            config.output.public_base_url.as_deref(),
        );

        observer.update(Stage::Complete, 100, "Analysis completed successfully");
        info!(
            target = %results.target_name,
            compounds = results.total_compounds,
            "Analysis pipeline completed successfully"
        );
        Ok(results)
    }

    /// Train on the best available features. Never fails the run: with too
    /// little data the report is marked as failed.
    async fn train_model(
        &self,
        records: &[CompoundRecord],
        renderer: &PlotRenderer,
    ) -> PredictionReport {
        let strategy =
            model::select_strategy(records, self.extended.as_ref(), self.config.model.variance_threshold)
                .await;
        if let model::FeatureStrategy::Reduced { reason, .. } = &strategy {
            info!("Running simplified ML with Lipinski descriptors only ({})", reason);
        }

        let features = strategy.features().clone();
        let model_config = self.config.model.clone();
        let trained =
            tokio::task::spawn_blocking(move || model::train_and_evaluate(&features, &model_config)).await;

        match trained {
            Ok(Ok(evaluation)) => {
                let plot = renderer.render_regression(&evaluation.actual, &evaluation.predicted);
                PredictionReport::from_evaluation(&strategy, &evaluation, &self.config.model, plot)
            }
            Ok(Err(e)) => {
                error!("ML analysis failed: {}", e);
                PredictionReport::failed()
            }
            Err(e) => {
                error!("ML worker failed: {}", e);
                PredictionReport::failed()
            }
        }
    }
}

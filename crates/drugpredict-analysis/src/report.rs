//! Result payload returned to clients once a run completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use drugpredict_ingestion::{RecordLimit, ResolvedTarget};

use crate::model::PredictionReport;
use crate::plots::{PlotInfo, OUTPUTS_URL_PREFIX};
use crate::records::{ClassCounts, CompoundRecord, PotencyClass};
use crate::stats::StatisticsReport;

/// One compound as echoed back to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundSummary {
    pub id: String,
    pub smiles: String,
    pub ic50: f64,
    pub pic50: f64,
    pub classification: PotencyClass,
    pub mw: f64,
    pub logp: f64,
    pub hdonors: u32,
    pub hacceptors: u32,
}

impl From<&CompoundRecord> for CompoundSummary {
    fn from(r: &CompoundRecord) -> Self {
        Self {
            id: r.molecule_chembl_id.clone(),
            smiles: r.canonical_smiles.clone(),
            ic50: r.standard_value,
            pic50: r.pic50,
            classification: r.class,
            mw: r.descriptors.mw,
            logp: r.descriptors.logp,
            hdonors: r.descriptors.h_donors,
            hacceptors: r.descriptors.h_acceptors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResults {
    pub success: bool,
    /// Directory name of this run's artifacts and charts.
    pub run_id: String,
    pub target_name: String,
    pub target_id: String,
    pub data_limit: String,
    pub total_compounds: usize,
    pub active_compounds: usize,
    pub inactive_compounds: usize,
    pub intermediate_compounds: usize,
    pub compounds: Vec<CompoundSummary>,
    pub statistics: StatisticsReport,
    pub plots: Vec<PlotInfo>,
    pub predictions: PredictionReport,
    pub timestamp: DateTime<Utc>,
}

/// Outputs of the analysis stages, gathered for compilation.
#[derive(Debug, Clone)]
pub struct StageOutputs {
    pub statistics: StatisticsReport,
    pub plots: Vec<PlotInfo>,
    pub predictions: PredictionReport,
}

/// Prefix `/outputs/...` paths with `base_url`; other paths are untouched.
pub fn absolute_image_path(path: &str, base_url: Option<&str>) -> String {
    match base_url {
        Some(base) if path.starts_with(OUTPUTS_URL_PREFIX) => {
            format!("{}{}", base.trim_end_matches('/'), path)
        }
        _ => path.to_string(),
    }
}

/// Assemble the client payload. `sample_size` caps the echoed compounds.
pub fn compile_results(
    run_id: &str,
    target: &ResolvedTarget,
    limit: RecordLimit,
    records: &[CompoundRecord],
    outputs: StageOutputs,
    sample_size: usize,
    base_url: Option<&str>,
) -> AnalysisResults {
    let counts = ClassCounts::tally(records.iter().map(|r| &r.class));

    let plots = outputs
        .plots
        .into_iter()
        .map(|mut p| {
            p.image_path = absolute_image_path(&p.image_path, base_url);
            p
        })
        .collect();

    let mut predictions = outputs.predictions;
    if let Some(plot) = predictions.regression_plot.as_mut() {
        plot.image_path = absolute_image_path(&plot.image_path, base_url);
    }

    AnalysisResults {
        success: true,
        run_id: run_id.to_string(),
        target_name: target.display_name.clone(),
        target_id: target.chembl_id.clone(),
        data_limit: limit.to_string(),
        total_compounds: records.len(),
        active_compounds: counts.active_count,
        inactive_compounds: counts.inactive_count,
        intermediate_compounds: counts.intermediate_count,
        compounds: records.iter().take(sample_size).map(CompoundSummary::from).collect(),
        statistics: outputs.statistics,
        plots,
        predictions,
        timestamp: Utc::now(),
    }
}

//! Plain-text report printed after a command-line run.

use std::fmt::Write;

use drugpredict_analysis::AnalysisResults;

pub fn render_summary(results: &AnalysisResults) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Target:        {} ({})", results.target_name, results.target_id);
    let _ = writeln!(out, "Record limit:  {}", results.data_limit);
    let _ = writeln!(
        out,
        "Compounds:     {} total, {} active, {} intermediate, {} inactive",
        results.total_compounds,
        results.active_compounds,
        results.intermediate_compounds,
        results.inactive_compounds
    );

    let tests = &results.statistics.mann_whitney_tests;
    if !tests.is_empty() {
        let _ = writeln!(out, "\nMann-Whitney U (active vs inactive):");
        for t in tests {
            let _ = writeln!(
                out,
                "  {:<14} U={:<10.1} p={:<10.4e} {}",
                t.descriptor,
                t.statistic,
                t.p_value,
                t.interpretation.as_str()
            );
        }
    }

    let info = &results.predictions.model_info;
    let metrics = &results.predictions.metrics;
    let _ = writeln!(out, "\nModel:         {} ({} features)", info.algorithm, info.features);
    let _ = writeln!(
        out,
        "Metrics:       R2={:.3} RMSE={:.3} MAE={:.3}",
        metrics.r2_score, metrics.rmse, metrics.mae
    );

    if !results.plots.is_empty() {
        let _ = writeln!(out, "\nCharts:");
        for plot in &results.plots {
            let _ = writeln!(out, "  {}", plot.image_path);
        }
    }
    if let Some(plot) = &results.predictions.regression_plot {
        let _ = writeln!(out, "  {}", plot.image_path);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use drugpredict_analysis::model::PredictionReport;
    use drugpredict_analysis::report::{compile_results, StageOutputs};
    use drugpredict_analysis::stats::StatisticsReport;
    use drugpredict_ingestion::{RecordLimit, ResolvedTarget};

    #[test]
    fn test_summary_without_model() {
        let target = ResolvedTarget { chembl_id: "CHEMBL203".into(), display_name: "EGFR".into() };
        let outputs = StageOutputs {
            statistics: StatisticsReport::default(),
            plots: Vec::new(),
            predictions: PredictionReport::failed(),
        };
        let results = compile_results("r1", &target, RecordLimit::Count(50), &[], outputs, 100, None);
        let text = render_summary(&results);
        assert!(text.starts_with("Target:        EGFR (CHEMBL203)\n"));
        assert!(text.contains("Record limit:  50"));
        assert!(text.contains("Model:         Failed (0 features)"));
        assert!(!text.contains("Mann-Whitney"));
    }
}

//! Potency regression: feature selection, deterministic split, random
//! forest training and held-out evaluation.

pub mod forest;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use drugpredict_common::ModelConfig;
use drugpredict_molecules::padel::{ExtendedDescriptorSource, ExtendedDescriptorTable};
use drugpredict_molecules::LipinskiDescriptors;

use crate::error::{AnalysisError, Result};
use crate::records::CompoundRecord;

pub use forest::{ForestParams, RandomForestRegressor};

/// Fewer usable rows than this cannot be split and evaluated.
pub const MIN_TRAINING_ROWS: usize = 5;

pub const EXTENDED_ALGORITHM: &str = "Random Forest Regressor";
pub const REDUCED_ALGORITHM: &str = "Random Forest Regressor (Lipinski only)";

// ── Features ─────────────────────────────────────────────────────────────────

/// Row-aligned features and pIC50 targets.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// The four Lipinski descriptors of every record.
    pub fn lipinski(records: &[CompoundRecord]) -> Self {
        Self {
            names: LipinskiDescriptors::NAMES.iter().map(|s| s.to_string()).collect(),
            rows: records.iter().map(|r| r.descriptors.to_features().to_vec()).collect(),
            targets: records.iter().map(|r| r.pic50).collect(),
        }
    }

    /// Extended descriptor rows matched to records by compound id, then
    /// filtered to columns whose variance exceeds `variance_threshold`.
    pub fn extended(
        records: &[CompoundRecord],
        table: &ExtendedDescriptorTable,
        variance_threshold: f64,
    ) -> Result<Self> {
        let by_id = table.by_id();
        let mut rows = Vec::with_capacity(records.len());
        let mut targets = Vec::with_capacity(records.len());
        for record in records {
            if let Some(values) = by_id.get(record.molecule_chembl_id.as_str()) {
                rows.push(values.to_vec());
                targets.push(record.pic50);
            }
        }
        let missing = records.len() - rows.len();
        if missing > 0 {
            warn!(missing, "Records without extended descriptors were left out");
        }

        let keep = variance_filter(&rows, table.columns.len(), variance_threshold);
        if keep.is_empty() {
            return Err(AnalysisError::Model(format!(
                "no extended descriptor exceeds the variance threshold {}",
                variance_threshold
            )));
        }

        Ok(Self {
            names: keep.iter().map(|&j| table.columns[j].clone()).collect(),
            rows: rows.iter().map(|row| keep.iter().map(|&j| row[j]).collect()).collect(),
            targets,
        })
    }
}

/// Indices of columns with population variance above `threshold`.
pub fn variance_filter(rows: &[Vec<f64>], n_columns: usize, threshold: f64) -> Vec<usize> {
    if rows.is_empty() {
        return Vec::new();
    }
    let n = rows.len() as f64;
    (0..n_columns)
        .filter(|&j| {
            let mean = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n;
            var > threshold
        })
        .collect()
}

/// Which descriptors the model is trained on.
#[derive(Debug, Clone)]
pub enum FeatureStrategy {
    /// Fingerprints from the external descriptor runner.
    Extended(FeatureMatrix),
    /// The four Lipinski descriptors, with the reason the extended set was
    /// not used.
    Reduced { features: FeatureMatrix, reason: String },
}

impl FeatureStrategy {
    pub fn features(&self) -> &FeatureMatrix {
        match self {
            FeatureStrategy::Extended(features) => features,
            FeatureStrategy::Reduced { features, .. } => features,
        }
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            FeatureStrategy::Extended(_) => EXTENDED_ALGORITHM,
            FeatureStrategy::Reduced { .. } => REDUCED_ALGORITHM,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeatureStrategy::Extended(_) => "extended",
            FeatureStrategy::Reduced { .. } => "reduced",
        }
    }
}

/// Pick the feature set: the extended source when it is available and
/// produces a usable matrix, otherwise the Lipinski descriptors.
pub async fn select_strategy(
    records: &[CompoundRecord],
    source: &dyn ExtendedDescriptorSource,
    variance_threshold: f64,
) -> FeatureStrategy {
    let reduced = |reason: String| {
        warn!("Extended descriptors unavailable ({}), using Lipinski descriptors only", reason);
        FeatureStrategy::Reduced { features: FeatureMatrix::lipinski(records), reason }
    };

    if let Err(e) = source.check_available() {
        return reduced(e.to_string());
    }

    let compounds: Vec<(String, String)> = records
        .iter()
        .map(|r| (r.molecule_chembl_id.clone(), r.canonical_smiles.clone()))
        .collect();
    let table = match source.compute(&compounds).await {
        Ok(table) => table,
        Err(e) => return reduced(e.to_string()),
    };

    match FeatureMatrix::extended(records, &table, variance_threshold) {
        Ok(features) if features.n_rows() >= MIN_TRAINING_ROWS => {
            info!(
                features = features.n_features(),
                dropped = table.columns.len() - features.n_features(),
                "Using extended descriptors"
            );
            FeatureStrategy::Extended(features)
        }
        Ok(features) => reduced(format!("only {} rows matched extended descriptors", features.n_rows())),
        Err(e) => reduced(e.to_string()),
    }
}

// ── Split and metrics ────────────────────────────────────────────────────────

/// Shuffle `0..n` with a seeded PRNG; the first `ceil(test_fraction * n)`
/// indices are held out, the rest train.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let n_test = ((test_fraction * n as f64).ceil() as usize).min(n);
    let train = indices.split_off(n_test);
    (train, indices)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub r2_score: f64,
    pub mse: f64,
    pub mae: f64,
    pub rmse: f64,
}

impl Metrics {
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len().min(predicted.len());
        if n == 0 {
            return Self::default();
        }
        let nf = n as f64;
        let mean = actual[..n].iter().sum::<f64>() / nf;
        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        let mut abs = 0.0;
        for (a, p) in actual.iter().zip(predicted) {
            ss_res += (a - p).powi(2);
            ss_tot += (a - mean).powi(2);
            abs += (a - p).abs();
        }
        let r2_score = if ss_tot == 0.0 {
            if ss_res == 0.0 { 1.0 } else { 0.0 }
        } else {
            1.0 - ss_res / ss_tot
        };
        let mse = ss_res / nf;
        Self { r2_score, mse, mae: abs / nf, rmse: mse.sqrt() }
    }
}

// ── Training ─────────────────────────────────────────────────────────────────

/// Held-out evaluation of a trained forest.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metrics: Metrics,
    pub n_features: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

/// Split, fit a random forest on the training rows and score the rest.
pub fn train_and_evaluate(features: &FeatureMatrix, config: &ModelConfig) -> Result<Evaluation> {
    let n = features.n_rows();
    if n < MIN_TRAINING_ROWS {
        return Err(AnalysisError::InsufficientData(format!(
            "{} rows available, at least {} needed to train and evaluate",
            n, MIN_TRAINING_ROWS
        )));
    }

    let (train_idx, test_idx) = train_test_split(n, config.test_fraction, config.seed);
    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
        idx.iter()
            .map(|&i| (features.rows[i].clone(), features.targets[i]))
            .unzip()
    };
    let (x_train, y_train) = pick(&train_idx);
    let (x_test, y_test) = pick(&test_idx);

    let params = ForestParams {
        n_estimators: config.n_estimators,
        seed: config.seed,
        ..ForestParams::default()
    };
    let model = RandomForestRegressor::fit(&x_train, &y_train, &params)?;
    let predicted = model.predict_batch(&x_test);
    let metrics = Metrics::evaluate(&y_test, &predicted);
    info!("ML analysis complete. R² = {:.3}", metrics.r2_score);

    Ok(Evaluation {
        metrics,
        n_features: features.n_features(),
        train_rows: x_train.len(),
        test_rows: x_test.len(),
        actual: y_test,
        predicted,
    })
}

// ── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub algorithm: String,
    pub n_estimators: usize,
    pub features: usize,
    /// Percent of rows used for training.
    pub training_size: u32,
    /// Percent of rows held out.
    pub test_size: u32,
    pub training_rows: usize,
    pub test_rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionPlotInfo {
    pub name: String,
    pub description: String,
    pub image_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionReport {
    pub metrics: Metrics,
    pub model_info: ModelInfo,
    pub regression_plot: Option<RegressionPlotInfo>,
}

impl PredictionReport {
    pub fn from_evaluation(
        strategy: &FeatureStrategy,
        evaluation: &Evaluation,
        config: &ModelConfig,
        regression_plot: Option<RegressionPlotInfo>,
    ) -> Self {
        let test_pct = (config.test_fraction * 100.0).round() as u32;
        Self {
            metrics: evaluation.metrics,
            model_info: ModelInfo {
                algorithm: strategy.algorithm().to_string(),
                n_estimators: config.n_estimators,
                features: evaluation.n_features,
                training_size: 100 - test_pct.min(100),
                test_size: test_pct,
                training_rows: evaluation.train_rows,
                test_rows: evaluation.test_rows,
                strategy: Some(strategy.label().to_string()),
            },
            regression_plot,
        }
    }

    /// Placeholder report when no model could be trained.
    pub fn failed() -> Self {
        Self {
            metrics: Metrics::default(),
            model_info: ModelInfo {
                algorithm: "Failed".to_string(),
                n_estimators: 0,
                features: 0,
                training_size: 0,
                test_size: 0,
                training_rows: 0,
                test_rows: 0,
                strategy: None,
            },
            regression_plot: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PotencyClass;

    fn record(id: &str, mw: f64, pic50: f64) -> CompoundRecord {
        CompoundRecord {
            molecule_chembl_id: id.into(),
            canonical_smiles: "C".into(),
            standard_value: 100.0,
            class: PotencyClass::Active,
            descriptors: LipinskiDescriptors { mw, logp: 1.0, h_donors: 1, h_acceptors: 2 },
            pic50,
        }
    }

    #[test]
    fn test_split_is_reproducible_and_complete() {
        let (train_a, test_a) = train_test_split(12, 0.2, 42);
        let (train_b, test_b) = train_test_split(12, 0.2, 42);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 3);
        assert_eq!(train_a.len(), 9);

        let mut all: Vec<usize> = train_a.iter().chain(&test_a).copied().collect();
        all.sort();
        assert_eq!(all, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_metrics() {
        let m = Metrics::evaluate(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(m.r2_score, 1.0);
        assert_eq!(m.mse, 0.0);

        let m = Metrics::evaluate(&[1.0, 3.0], &[2.0, 2.0]);
        assert_eq!(m.r2_score, 0.0);
        assert_eq!(m.mse, 1.0);
        assert_eq!(m.mae, 1.0);
        assert_eq!(m.rmse, 1.0);

        let constant = Metrics::evaluate(&[2.0, 2.0], &[2.5, 2.0]);
        assert_eq!(constant.r2_score, 0.0);
    }

    #[test]
    fn test_too_few_rows_is_insufficient_data() {
        let records: Vec<_> = (0..4).map(|i| record(&i.to_string(), 100.0 + i as f64, 6.0)).collect();
        let result = train_and_evaluate(&FeatureMatrix::lipinski(&records), &ModelConfig::default());
        assert!(matches!(result, Err(AnalysisError::InsufficientData(_))));
    }

    #[test]
    fn test_train_and_evaluate_reduced() {
        let records: Vec<_> = (0..20)
            .map(|i| record(&format!("C{}", i), 200.0 + 10.0 * i as f64, 4.0 + 0.2 * i as f64))
            .collect();
        let strategy = FeatureStrategy::Reduced {
            features: FeatureMatrix::lipinski(&records),
            reason: "test".into(),
        };
        let config = ModelConfig { n_estimators: 10, ..ModelConfig::default() };
        let eval = train_and_evaluate(strategy.features(), &config).unwrap();
        assert_eq!(eval.test_rows, 4);
        assert_eq!(eval.train_rows, 16);
        assert_eq!(eval.n_features, 4);
        assert!(eval.metrics.rmse < 1.0);

        let report = PredictionReport::from_evaluation(&strategy, &eval, &config, None);
        assert_eq!(report.model_info.algorithm, REDUCED_ALGORITHM);
        assert_eq!(report.model_info.training_size, 80);
        assert_eq!(report.model_info.test_size, 20);
    }

    #[test]
    fn test_extended_alignment_and_variance_filter() {
        let records = vec![record("A", 1.0, 5.0), record("B", 2.0, 6.0), record("C", 3.0, 7.0)];
        let table = ExtendedDescriptorTable {
            columns: vec!["Const".into(), "Bit".into()],
            rows: vec![
                ("C".into(), vec![1.0, 0.0]),
                ("A".into(), vec![1.0, 1.0]),
                ("Z".into(), vec![1.0, 1.0]),
                ("B".into(), vec![1.0, 0.0]),
            ],
        };
        let matrix = FeatureMatrix::extended(&records, &table, 0.16).unwrap();
        assert_eq!(matrix.names, vec!["Bit"]);
        assert_eq!(matrix.rows, vec![vec![1.0], vec![0.0], vec![0.0]]);
        assert_eq!(matrix.targets, vec![5.0, 6.0, 7.0]);

        let flat = ExtendedDescriptorTable {
            columns: vec!["Const".into()],
            rows: vec![("A".into(), vec![1.0]), ("B".into(), vec![1.0])],
        };
        assert!(FeatureMatrix::extended(&records, &flat, 0.16).is_err());
    }

    #[test]
    fn test_failed_report_shape() {
        let json = serde_json::to_value(PredictionReport::failed()).unwrap();
        assert_eq!(json["modelInfo"]["algorithm"], "Failed");
        assert_eq!(json["metrics"]["r2Score"], 0.0);
        assert!(json["regressionPlot"].is_null());
        assert!(json["modelInfo"].get("strategy").is_none());
    }
}

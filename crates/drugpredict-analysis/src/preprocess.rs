//! Record cleaning: drop incomplete, zero-potency and duplicate rows.

use std::collections::HashSet;
use tracing::info;

use crate::error::{AnalysisError, Result};
use crate::records::{AssayRow, CleanRecord};

/// Keep rows with a positive finite potency and a SMILES string, then drop
/// rows repeating an earlier SMILES or compound id, keeping the first
/// occurrence. Compound ids are unique in the result.
///
/// Fails when fewer than `min_records` rows remain (and always when none do).
pub fn preprocess<R: AssayRow>(rows: &[R], min_records: usize) -> Result<Vec<CleanRecord>> {
    let initial = rows.len();

    let with_potency: Vec<(&R, f64)> = rows
        .iter()
        .filter_map(|row| row.potency().map(|v| (row, v)))
        .filter(|(_, v)| v.is_finite() && *v > 0.0)
        .collect();
    info!(remaining = with_potency.len(), dropped = initial - with_potency.len(), "Filtered missing or zero potency");

    let with_smiles: Vec<(&R, &str, f64)> = with_potency
        .into_iter()
        .filter_map(|(row, v)| {
            row.smiles()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| (row, s, v))
        })
        .collect();
    info!(remaining = with_smiles.len(), "Filtered missing SMILES");

    let mut seen_smiles = HashSet::with_capacity(with_smiles.len());
    let mut seen_ids = HashSet::with_capacity(with_smiles.len());
    let cleaned: Vec<CleanRecord> = with_smiles
        .into_iter()
        .filter(|&(row, smiles, _)| {
            let id = row.compound_id();
            if seen_smiles.contains(smiles) || seen_ids.contains(id) {
                return false;
            }
            seen_smiles.insert(smiles);
            seen_ids.insert(id);
            true
        })
        .map(|(row, smiles, value)| CleanRecord {
            molecule_chembl_id: row.compound_id().to_string(),
            canonical_smiles: smiles.to_string(),
            standard_value: value,
        })
        .collect();
    info!(initial, remaining = cleaned.len(), "Preprocessing complete");

    if cleaned.is_empty() {
        return Err(AnalysisError::Validation("No valid data after preprocessing".into()));
    }
    if cleaned.len() < min_records {
        return Err(AnalysisError::Validation(format!(
            "Only {} compounds remain after preprocessing (minimum {} required)",
            cleaned.len(),
            min_records
        )));
    }
    Ok(cleaned)
}

//! Potency clamping and log transform.

use crate::records::{CompoundRecord, DescribedRecord};

/// Potencies above this (nM) are clamped before the log transform.
pub const POTENCY_CEILING_NM: f64 = 1e8;

pub fn normalize(value_nm: f64) -> f64 {
    value_nm.min(POTENCY_CEILING_NM)
}

/// `-log10(molar)` of a clamped nM potency.
pub fn log_potency(value_nm: f64) -> f64 {
    -(normalize(value_nm) * 1e-9).log10()
}

/// Attach pIC50 to every record. The clamped value is not retained.
pub fn process_potency(records: Vec<DescribedRecord>) -> Vec<CompoundRecord> {
    records
        .into_iter()
        .map(|DescribedRecord { record, descriptors }| CompoundRecord {
            pic50: log_potency(record.standard_value),
            molecule_chembl_id: record.molecule_chembl_id,
            canonical_smiles: record.canonical_smiles,
            standard_value: record.standard_value,
            class: record.class,
            descriptors,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_potency() {
        assert!((log_potency(1000.0) - 6.0).abs() < 1e-9);
        assert!((log_potency(1.0) - 9.0).abs() < 1e-9);
        assert!((log_potency(1e8) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(normalize(5e8), 1e8);
        assert_eq!(normalize(42.0), 42.0);
        assert_eq!(log_potency(1e12), log_potency(1e8));
    }
}

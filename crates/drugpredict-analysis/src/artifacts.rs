//! CSV artifacts written next to the charts.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::records::CompoundRecord;
use crate::stats::{MannWhitneyResult, ALPHA};

pub const FINAL_DATASET_FILE: &str = "bioactivity_final.csv";

#[derive(Serialize)]
struct FinalRow<'a> {
    molecule_chembl_id: &'a str,
    canonical_smiles: &'a str,
    standard_value: f64,
    class: &'static str,
    #[serde(rename = "MW")]
    mw: f64,
    #[serde(rename = "LogP")]
    logp: f64,
    #[serde(rename = "NumHDonors")]
    h_donors: u32,
    #[serde(rename = "NumHAcceptors")]
    h_acceptors: u32,
    #[serde(rename = "pIC50")]
    pic50: f64,
}

#[derive(Serialize)]
struct MannWhitneyRow<'a> {
    #[serde(rename = "Descriptor")]
    descriptor: &'a str,
    #[serde(rename = "Statistics")]
    statistic: f64,
    p: f64,
    alpha: f64,
    #[serde(rename = "Interpretation")]
    interpretation: &'static str,
}

/// Write the enriched dataset as `bioactivity_final.csv` under `dir`.
pub fn write_final_dataset(dir: &Path, records: &[CompoundRecord]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(FINAL_DATASET_FILE);
    let mut writer = csv::Writer::from_path(&path)?;
    for r in records {
        writer.serialize(FinalRow {
            molecule_chembl_id: &r.molecule_chembl_id,
            canonical_smiles: &r.canonical_smiles,
            standard_value: r.standard_value,
            class: r.class.as_str(),
            mw: r.descriptors.mw,
            logp: r.descriptors.logp,
            h_donors: r.descriptors.h_donors,
            h_acceptors: r.descriptors.h_acceptors,
            pic50: r.pic50,
        })?;
    }
    writer.flush()?;
    info!("Final dataset saved to: {}", path.display());
    Ok(path)
}

/// Write one test result as `mannwhitneyu_<descriptor>.csv` under `dir`.
pub fn write_mann_whitney(dir: &Path, result: &MannWhitneyResult) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("mannwhitneyu_{}.csv", result.descriptor));
    let mut writer = csv::Writer::from_path(&path)?;
    writer.serialize(MannWhitneyRow {
        descriptor: &result.descriptor,
        statistic: result.statistic,
        p: result.p_value,
        alpha: ALPHA,
        interpretation: result.interpretation.as_str(),
    })?;
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PotencyClass;
    use crate::stats::Interpretation;
    use drugpredict_molecules::LipinskiDescriptors;

    #[test]
    fn test_final_dataset_columns() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![CompoundRecord {
            molecule_chembl_id: "CHEMBL25".into(),
            canonical_smiles: "CC(=O)Oc1ccccc1C(=O)O".into(),
            standard_value: 1000.0,
            class: PotencyClass::Active,
            descriptors: LipinskiDescriptors { mw: 180.159, logp: 1.31, h_donors: 1, h_acceptors: 3 },
            pic50: 6.0,
        }];
        let path = write_final_dataset(&dir.path().join("processed"), &records).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "molecule_chembl_id,canonical_smiles,standard_value,class,MW,LogP,NumHDonors,NumHAcceptors,pIC50"
        );
        assert_eq!(lines.next().unwrap(), "CHEMBL25,CC(=O)Oc1ccccc1C(=O)O,1000.0,active,180.159,1.31,1,3,6.0");
    }

    #[test]
    fn test_mann_whitney_csv() {
        let dir = tempfile::tempdir().unwrap();
        let result = MannWhitneyResult {
            descriptor: "MW".into(),
            statistic: 12.0,
            p_value: 0.5,
            interpretation: Interpretation::SameDistribution,
        };
        let path = write_mann_whitney(dir.path(), &result).unwrap();
        assert!(path.ends_with("mannwhitneyu_MW.csv"));
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            "Descriptor,Statistics,p,alpha,Interpretation\nMW,12.0,0.5,0.05,Same distribution (fail to reject H0)\n"
        );
    }
}

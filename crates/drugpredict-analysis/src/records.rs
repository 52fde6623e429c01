//! Row types for each pipeline stage.
//!
//! Records move forward only: a stage consumes the previous stage's rows and
//! returns a new, richer row type. Nothing is mutated after it is set.

use serde::{Deserialize, Serialize};
use std::fmt;

use drugpredict_ingestion::RawActivity;
use drugpredict_molecules::LipinskiDescriptors;

/// Potency in nM at or below which a compound counts as active.
pub const ACTIVE_THRESHOLD_NM: f64 = 1000.0;
/// Potency in nM at or above which a compound counts as inactive.
pub const INACTIVE_THRESHOLD_NM: f64 = 10000.0;

/// Anything the preprocessor can filter: raw downloads and its own output.
pub trait AssayRow {
    fn compound_id(&self) -> &str;
    fn smiles(&self) -> Option<&str>;
    /// Potency in nM, `None` when missing or not a number.
    fn potency(&self) -> Option<f64>;
}

impl AssayRow for RawActivity {
    fn compound_id(&self) -> &str {
        &self.molecule_chembl_id
    }

    fn smiles(&self) -> Option<&str> {
        self.canonical_smiles.as_deref()
    }

    fn potency(&self) -> Option<f64> {
        self.standard_value.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

/// A row that survived preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub molecule_chembl_id: String,
    pub canonical_smiles: String,
    pub standard_value: f64,
}

impl AssayRow for CleanRecord {
    fn compound_id(&self) -> &str {
        &self.molecule_chembl_id
    }

    fn smiles(&self) -> Option<&str> {
        Some(&self.canonical_smiles)
    }

    fn potency(&self) -> Option<f64> {
        Some(self.standard_value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PotencyClass {
    Active,
    Intermediate,
    Inactive,
}

impl PotencyClass {
    /// Three-way label from a potency in nM.
    pub fn from_potency(value: f64) -> Self {
        if value >= INACTIVE_THRESHOLD_NM {
            PotencyClass::Inactive
        } else if value <= ACTIVE_THRESHOLD_NM {
            PotencyClass::Active
        } else {
            PotencyClass::Intermediate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PotencyClass::Active => "active",
            PotencyClass::Intermediate => "intermediate",
            PotencyClass::Inactive => "inactive",
        }
    }
}

impl fmt::Display for PotencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub molecule_chembl_id: String,
    /// Largest fragment of the downloaded SMILES.
    pub canonical_smiles: String,
    pub standard_value: f64,
    pub class: PotencyClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescribedRecord {
    pub record: LabeledRecord,
    pub descriptors: LipinskiDescriptors,
}

/// Final enriched row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundRecord {
    pub molecule_chembl_id: String,
    pub canonical_smiles: String,
    pub standard_value: f64,
    pub class: PotencyClass,
    pub descriptors: LipinskiDescriptors,
    /// -log10 of the clamped molar potency.
    pub pic50: f64,
}

impl CompoundRecord {
    /// Value of a tested column by its dataset name.
    pub fn column(&self, name: &str) -> Option<f64> {
        match name {
            "pIC50" => Some(self.pic50),
            "MW" => Some(self.descriptors.mw),
            "LogP" => Some(self.descriptors.logp),
            "NumHDonors" => Some(f64::from(self.descriptors.h_donors)),
            "NumHAcceptors" => Some(f64::from(self.descriptors.h_acceptors)),
            "standard_value" => Some(self.standard_value),
            _ => None,
        }
    }
}

/// Per-class record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassCounts {
    pub active_count: usize,
    pub inactive_count: usize,
    pub intermediate_count: usize,
}

impl ClassCounts {
    pub fn tally<'a, I>(classes: I) -> Self
    where
        I: IntoIterator<Item = &'a PotencyClass>,
    {
        let mut counts = Self::default();
        for class in classes {
            match class {
                PotencyClass::Active => counts.active_count += 1,
                PotencyClass::Inactive => counts.inactive_count += 1,
                PotencyClass::Intermediate => counts.intermediate_count += 1,
            }
        }
        counts
    }
}

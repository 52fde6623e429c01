//! Potency labelling and salt stripping.

use tracing::info;

use drugpredict_molecules::largest_fragment;

use crate::records::{ClassCounts, CleanRecord, LabeledRecord, PotencyClass};

/// Label each record and reduce its SMILES to the largest fragment.
pub fn label_compounds(records: Vec<CleanRecord>) -> Vec<LabeledRecord> {
    let labeled: Vec<LabeledRecord> = records
        .into_iter()
        .map(|r| LabeledRecord {
            canonical_smiles: largest_fragment(&r.canonical_smiles).to_string(),
            class: PotencyClass::from_potency(r.standard_value),
            molecule_chembl_id: r.molecule_chembl_id,
            standard_value: r.standard_value,
        })
        .collect();

    let counts = ClassCounts::tally(labeled.iter().map(|r| &r.class));
    info!(
        active = counts.active_count,
        inactive = counts.inactive_count,
        intermediate = counts.intermediate_count,
        "Labelled compounds"
    );
    labeled
}

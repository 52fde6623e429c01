//! Lipinski descriptor stage.

use tracing::{debug, info, warn};

use drugpredict_molecules::DescriptorEngine;

use crate::records::{DescribedRecord, LabeledRecord};

/// Attach descriptors to every record the engine can handle.
///
/// Records whose SMILES fails to parse, or whose descriptors come back
/// non-finite, are dropped. The batch never aborts on a single record.
pub fn add_descriptors(engine: &dyn DescriptorEngine, records: Vec<LabeledRecord>) -> Vec<DescribedRecord> {
    let total = records.len();
    let mut failed = 0usize;

    let described: Vec<DescribedRecord> = records
        .into_iter()
        .filter_map(|record| match engine.compute(&record.canonical_smiles) {
            Ok(descriptors) if descriptors.is_finite() => Some(DescribedRecord { record, descriptors }),
            Ok(_) => {
                debug!(id = %record.molecule_chembl_id, "Non-finite descriptors");
                failed += 1;
                None
            }
            Err(e) => {
                debug!(id = %record.molecule_chembl_id, error = %e, "Descriptor calculation failed");
                failed += 1;
                None
            }
        })
        .collect();

    if failed > 0 {
        warn!("Failed to calculate descriptors for {} of {} molecules", failed, total);
    }
    info!(remaining = described.len(), "Lipinski descriptors calculated");
    described
}

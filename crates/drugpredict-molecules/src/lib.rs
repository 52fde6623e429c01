//! DrugPredict Molecules - structure parsing and descriptor calculation.
//!
//! This crate handles the chemistry side of the pipeline:
//! 1. Parsing SMILES strings into an atom/bond graph
//! 2. Reducing multi-fragment structures to their largest fragment
//! 3. Computing the four Lipinski descriptors (MW, LogP, HBD, HBA)
//! 4. Running the external PaDEL fingerprint script for extended features

pub mod element;
pub mod error;
pub mod smiles;
pub mod fragment;
pub mod crippen;
pub mod descriptors;
pub mod padel;

pub use descriptors::{DescriptorEngine, LipinskiDescriptors, LipinskiEngine};
pub use error::{MoleculeError, Result};
pub use fragment::largest_fragment;
pub use smiles::{parse_smiles, Molecule};

//! Lipinski rule-of-five descriptors.

use serde::{Deserialize, Serialize};

use crate::crippen::crippen_logp;
use crate::error::Result;
use crate::smiles::{parse_smiles, BondOrder, Molecule};

/// The four descriptors used by the statistics and the reduced model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LipinskiDescriptors {
    #[serde(rename = "MW")]
    pub mw: f64,
    #[serde(rename = "LogP")]
    pub logp: f64,
    #[serde(rename = "NumHDonors")]
    pub h_donors: u32,
    #[serde(rename = "NumHAcceptors")]
    pub h_acceptors: u32,
}

impl LipinskiDescriptors {
    pub const NAMES: [&'static str; 4] = ["MW", "LogP", "NumHDonors", "NumHAcceptors"];

    /// Values in [`Self::NAMES`] order, as model features.
    pub fn to_features(&self) -> [f64; 4] {
        [self.mw, self.logp, f64::from(self.h_donors), f64::from(self.h_acceptors)]
    }

    pub fn is_finite(&self) -> bool {
        self.mw.is_finite() && self.logp.is_finite()
    }

    /// Number of rule-of-five violations.
    pub fn ro5_violations(&self) -> u32 {
        u32::from(self.mw > 500.0)
            + u32::from(self.logp > 5.0)
            + u32::from(self.h_donors > 5)
            + u32::from(self.h_acceptors > 10)
    }
}

/// Computes descriptors from a SMILES string.
pub trait DescriptorEngine: Send + Sync {
    fn compute(&self, smiles: &str) -> Result<LipinskiDescriptors>;
}

/// Default engine backed by the in-crate SMILES parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct LipinskiEngine;

impl LipinskiEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn from_molecule(mol: &Molecule) -> LipinskiDescriptors {
        LipinskiDescriptors {
            mw: mol.molecular_weight(),
            logp: crippen_logp(mol),
            h_donors: h_bond_donors(mol),
            h_acceptors: h_bond_acceptors(mol),
        }
    }
}

impl DescriptorEngine for LipinskiEngine {
    fn compute(&self, smiles: &str) -> Result<LipinskiDescriptors> {
        let mol = parse_smiles(smiles)?;
        Ok(Self::from_molecule(&mol))
    }
}

/// H-bond donors: N(v3)-H, N+(v4)-H, neutral O-H and S-H with one H,
/// neutral aromatic nH.
pub fn h_bond_donors(mol: &Molecule) -> u32 {
    (0..mol.atoms().len())
        .filter(|&i| {
            let atom = mol.atom(i);
            let h = mol.total_hydrogens(i);
            let valence = mol.total_valence(i);
            match (atom.symbol(), atom.aromatic) {
                ("N", false) => h > 0 && (valence == 3 || (atom.charge == 1 && valence == 4)),
                ("N", true) => h == 1 && atom.charge == 0,
                ("O", false) | ("S", false) => h == 1 && atom.charge == 0,
                _ => false,
            }
        })
        .count() as u32
}

/// H-bond acceptors: hydroxyl O/S not on an acyl-like atom, two-valent O/S
/// without H, anionic O/S, three-valent N that is not amide-like, neutral
/// aromatic n without H, aromatic o and s, and fluorine.
pub fn h_bond_acceptors(mol: &Molecule) -> u32 {
    (0..mol.atoms().len())
        .filter(|&i| {
            let atom = mol.atom(i);
            let h = mol.total_hydrogens(i);
            let valence = mol.total_valence(i);
            match (atom.symbol(), atom.aromatic) {
                ("O", false) | ("S", false) => {
                    if atom.charge < 0 {
                        true
                    } else if valence != 2 {
                        false
                    } else if h == 0 {
                        true
                    } else {
                        h == 1 && !mol.heavy_neighbors(i).any(|(n, _)| is_acyl_like(mol, n, i))
                    }
                }
                ("N", false) => valence == 3 && !is_amide_like_nitrogen(mol, i),
                ("N", true) => h == 0 && atom.charge == 0,
                ("O", true) | ("S", true) => atom.charge == 0,
                ("F", _) => true,
                _ => false,
            }
        })
        .count() as u32
}

/// `idx` carries a double bond to O, N, P or S (other than via `from`).
fn is_acyl_like(mol: &Molecule, idx: usize, from: usize) -> bool {
    mol.neighbors(idx).any(|(n, order)| {
        n != from
            && order == BondOrder::Double
            && matches!(mol.atom(n).symbol(), "O" | "N" | "P" | "S")
    })
}

/// N single-bonded to an atom with a non-ring double bond to O, N, P or S.
fn is_amide_like_nitrogen(mol: &Molecule, idx: usize) -> bool {
    mol.heavy_neighbors(idx)
        .filter(|&(_, order)| order == BondOrder::Single)
        .any(|(n, _)| {
            mol.neighbors(n).any(|(m, order)| {
                m != idx
                    && order == BondOrder::Double
                    && matches!(mol.atom(m).symbol(), "O" | "N" | "P" | "S")
                    && !mol.is_ring_bond(n, m)
            })
        })
}

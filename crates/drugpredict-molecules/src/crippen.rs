//! Atom-contribution octanol/water partition coefficient.
//!
//! Follows the Wildman–Crippen scheme (J. Chem. Inf. Comput. Sci. 1999,
//! 39, 868): every heavy atom and every hydrogen is assigned a type from its
//! local environment and the LogP is the sum of the type contributions.
//! The typing below covers the common organic types; rarer environments
//! fall back to the per-element default.

use crate::smiles::{BondOrder, Molecule};

// Carbon
const C1: f64 = 0.1441; // primary/secondary aliphatic, C neighbours only
const C2: f64 = 0.0; // tertiary/quaternary aliphatic
const C3: f64 = -0.2035; // CH3X, CH2X
const C4: f64 = -0.2051; // CHX, CX
const C5: f64 = -0.2783; // C = heteroatom
const C6: f64 = 0.1551; // C = C aliphatic
const C7: f64 = 0.0017; // acetylenic / nitrile
const C8: f64 = 0.08452; // CH3 on aromatic carbon
const C9: f64 = -0.1444; // CH3 on aromatic heteroatom
const C10: f64 = -0.0516; // CH2 on aromatic
const C11: f64 = 0.1193; // CH on aromatic
const C12: f64 = -0.0967; // C on aromatic
const C13: f64 = -0.5443; // aromatic with unusual substituent
const C14: f64 = 0.0; // aromatic-F
const C15: f64 = 0.2450; // aromatic-Cl
const C16: f64 = 0.1980; // aromatic-Br
const C17: f64 = 0.0; // aromatic-I
const C18: f64 = 0.1581; // aromatic CH
const C19: f64 = 0.2955; // aromatic bridgehead
const C20: f64 = 0.2713; // biaryl carbon
const C21: f64 = 0.1360; // aromatic-C
const C22: f64 = 0.4619; // aromatic-N
const C23: f64 = 0.5437; // aromatic-O
const C24: f64 = 0.1893; // aromatic-S
const C25: f64 = -0.8186; // aromatic with exocyclic double bond
const C26: f64 = 0.2640; // C = C conjugated with aromatic
const C27: f64 = 0.2148; // aliphatic on unusual heteroatom

// Hydrogen
const H1: f64 = 0.1230; // hydrocarbon
const H2: f64 = -0.2677; // alcohol
const H3: f64 = 0.2142; // amine
const H4: f64 = 0.2980; // acid
const HS: f64 = 0.1125;

// Nitrogen
const N1: f64 = -1.0190; // primary amine
const N2: f64 = -0.7096; // secondary amine
const N3: f64 = -1.0270; // primary aromatic amine
const N4: f64 = -0.5188; // secondary aromatic amine
const N5: f64 = 0.08387; // imine with H
const N6: f64 = -0.3187; // tertiary amine
const N7: f64 = -0.4458; // tertiary aromatic amine
const N8: f64 = 0.01508; // nitrile
const N9: f64 = -1.950; // protonated amine
const N10: f64 = -0.3239; // aromatic
const N11: f64 = -1.119; // charged aromatic
const N12: f64 = -0.3396; // quaternary / charged without H
const N13: f64 = 0.2887; // other ionic nitrogen
const NS: f64 = -0.4806;

// Oxygen
const O1: f64 = 0.1552; // aromatic
const O2: f64 = -0.2893; // alcohol
const O3: f64 = -0.0684; // aliphatic ether
const O4: f64 = -0.4195; // aromatic ether
const O5: f64 = 0.0335; // oxide on N/O
const O6: f64 = -0.3339; // oxide on S
const O7: f64 = -1.189; // oxide on P
const O8: f64 = 0.1788; // aromatic carbonyl
const O9: f64 = -0.1526; // aliphatic carbonyl
const O10: f64 = 0.1129; // carbonyl next to aromatic
const O11: f64 = 0.4833; // carbonyl between heteroatoms
const O12: f64 = -1.326; // carboxylate
const OS: f64 = -0.1188;

const F: f64 = 0.4202;
const CL: f64 = 0.6895;
const BR: f64 = 0.8456;
const I: f64 = 0.8857;
const HALIDE: f64 = -2.996;
const S1: f64 = 0.6482;
const S2: f64 = -0.0024;
const S3: f64 = 0.6237;
const P: f64 = 0.8612;
const ALKALI: f64 = -0.3808;

const HETERO: &[&str] = &["N", "O", "P", "S", "F", "Cl", "Br", "I"];

/// Wildman–Crippen LogP of a parsed molecule.
pub fn crippen_logp(mol: &Molecule) -> f64 {
    (0..mol.atoms().len())
        .map(|i| {
            let atom = mol.atom(i);
            if atom.is("H") {
                return match mol.neighbors(i).next() {
                    Some((heavy, _)) => hydrogen_type(mol, heavy),
                    None => HS,
                };
            }
            heavy_type(mol, i) + f64::from(atom.hydrogens) * hydrogen_type(mol, i)
        })
        .sum()
}

/// Contribution of one hydrogen attached to atom `idx`.
fn hydrogen_type(mol: &Molecule, idx: usize) -> f64 {
    let atom = mol.atom(idx);
    match atom.symbol() {
        "C" | "H" => H1,
        "N" => H3,
        "O" => {
            for (n, _) in mol.heavy_neighbors(idx) {
                let nb = mol.atom(n);
                if nb.is("N") {
                    return H3;
                }
                if nb.is("O") || nb.is("S") {
                    return H4;
                }
                if nb.is("C") && !nb.aromatic && has_double_to(mol, n, idx, &["C", "N", "O", "S"]) {
                    return H4;
                }
            }
            H2
        }
        "*" => HS,
        _ => H2,
    }
}

/// True if `idx` has a double bond to one of `symbols`, ignoring `except`.
fn has_double_to(mol: &Molecule, idx: usize, except: usize, symbols: &[&str]) -> bool {
    mol.neighbors(idx).any(|(n, order)| {
        n != except && order == BondOrder::Double && symbols.contains(&mol.atom(n).symbol())
    })
}

fn heavy_type(mol: &Molecule, idx: usize) -> f64 {
    let atom = mol.atom(idx);
    match atom.symbol() {
        "C" if atom.aromatic => aromatic_carbon(mol, idx),
        "C" => aliphatic_carbon(mol, idx),
        "N" if atom.aromatic => {
            if atom.charge > 0 {
                N11
            } else {
                N10
            }
        }
        "N" => nitrogen(mol, idx),
        "O" if atom.aromatic => O1,
        "O" => oxygen(mol, idx),
        "F" | "Cl" | "Br" | "I" if atom.charge != 0 => HALIDE,
        "F" => F,
        "Cl" => CL,
        "Br" => BR,
        "I" => I,
        "S" if atom.aromatic => S3,
        "S" if atom.charge != 0 => S2,
        "S" => S1,
        "P" => P,
        "Li" | "Na" | "K" | "Rb" | "Cs" => ALKALI,
        _ => 0.0,
    }
}

fn aliphatic_carbon(mol: &Molecule, idx: usize) -> f64 {
    let h = mol.total_hydrogens(idx);
    let neighbors: Vec<(usize, BondOrder)> = mol.heavy_neighbors(idx).collect();

    let mut double_to_carbon = false;
    for &(n, order) in &neighbors {
        let nb = mol.atom(n);
        match order {
            BondOrder::Double if !nb.is("C") => return C5,
            BondOrder::Double => double_to_carbon = true,
            BondOrder::Triple => return C7,
            _ => {}
        }
    }

    let on_aromatic = neighbors.iter().any(|&(n, _)| mol.atom(n).aromatic);
    if double_to_carbon {
        return if on_aromatic { C26 } else { C6 };
    }

    if on_aromatic {
        return match h {
            3 => {
                if neighbors.iter().all(|&(n, _)| mol.atom(n).is("C")) {
                    C8
                } else {
                    C9
                }
            }
            2 => C10,
            1 => C11,
            _ => C12,
        };
    }

    let on_hetero = neighbors.iter().any(|&(n, _)| HETERO.contains(&mol.atom(n).symbol()));
    if on_hetero {
        return if h >= 2 { C3 } else { C4 };
    }
    if neighbors.iter().any(|&(n, _)| !mol.atom(n).is("C")) {
        return C27;
    }
    if h >= 2 {
        C1
    } else {
        C2
    }
}

fn aromatic_carbon(mol: &Molecule, idx: usize) -> f64 {
    let neighbors: Vec<(usize, BondOrder)> = mol.heavy_neighbors(idx).collect();

    if neighbors.iter().any(|&(n, order)| {
        order == BondOrder::Double && ["C", "N", "O"].contains(&mol.atom(n).symbol())
    }) {
        return C25;
    }
    if mol.total_hydrogens(idx) > 0 {
        return C18;
    }

    let substituent = neighbors
        .iter()
        .find(|&&(_, order)| order != BondOrder::Aromatic)
        .map(|&(n, _)| mol.atom(n));

    match substituent {
        None => C19,
        Some(nb) if nb.aromatic => C20,
        Some(nb) => match nb.symbol() {
            "F" => C14,
            "Cl" => C15,
            "Br" => C16,
            "I" => C17,
            "C" => C21,
            "N" => C22,
            "O" => C23,
            "S" => C24,
            _ => C13,
        },
    }
}

fn nitrogen(mol: &Molecule, idx: usize) -> f64 {
    let atom = mol.atom(idx);
    let h = mol.total_hydrogens(idx);
    let neighbors: Vec<(usize, BondOrder)> = mol.heavy_neighbors(idx).collect();

    if atom.charge > 0 {
        if h > 0 {
            return N9;
        }
        if neighbors.iter().any(|&(_, o)| o == BondOrder::Triple) {
            return N13;
        }
        return N12;
    }
    if atom.charge < 0 {
        return N13;
    }

    if neighbors.iter().any(|&(_, o)| o == BondOrder::Triple) {
        return N8;
    }
    if neighbors.iter().any(|&(_, o)| o == BondOrder::Double) {
        return if h > 0 { N5 } else { NS };
    }

    let on_aromatic = neighbors.iter().any(|&(n, _)| mol.atom(n).aromatic);
    match (h, on_aromatic) {
        (2.., false) => N1,
        (2.., true) => N3,
        (1, false) => N2,
        (1, true) => N4,
        (_, false) => N6,
        (_, true) => N7,
    }
}

fn oxygen(mol: &Molecule, idx: usize) -> f64 {
    let atom = mol.atom(idx);
    let neighbors: Vec<(usize, BondOrder)> = mol.heavy_neighbors(idx).collect();

    if atom.charge < 0 {
        let Some(&(n, _)) = neighbors.first() else {
            return OS;
        };
        let nb = mol.atom(n);
        return match nb.symbol() {
            "C" if has_double_to(mol, n, idx, &["O"]) => O12,
            "N" => O5,
            "S" => O6,
            "P" => O7,
            _ => OS,
        };
    }

    if let Some(&(n, _)) = neighbors.iter().find(|&&(_, o)| o == BondOrder::Double) {
        let nb = mol.atom(n);
        if nb.aromatic {
            return O8;
        }
        return match nb.symbol() {
            "N" | "O" => O5,
            "C" => {
                let others: Vec<usize> = mol
                    .heavy_neighbors(n)
                    .map(|(m, _)| m)
                    .filter(|&m| m != idx)
                    .collect();
                if others.len() >= 2 && others.iter().all(|&m| !mol.atom(m).is("C")) {
                    O11
                } else if others.iter().any(|&m| mol.atom(m).aromatic) {
                    O10
                } else {
                    O9
                }
            }
            _ => OS,
        };
    }

    if mol.total_hydrogens(idx) > 0 {
        return O2;
    }
    if neighbors.iter().any(|&(n, _)| mol.atom(n).aromatic) {
        O4
    } else {
        O3
    }
}

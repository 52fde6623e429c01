//! Periodic table subset used by the SMILES parser.
//!
//! Masses are IUPAC standard atomic weights, rounded to three decimals.
//! `valences` lists the normal valence states, lowest first; an empty list
//! means the element never receives implicit hydrogens.

#[derive(Debug, PartialEq)]
pub struct Element {
    pub symbol: &'static str,
    pub atomic_number: u8,
    pub mass: f64,
    pub valences: &'static [u8],
}

pub const HYDROGEN_MASS: f64 = 1.008;

macro_rules! element {
    ($sym:expr, $z:expr, $mass:expr, [$($v:expr),*]) => {
        Element { symbol: $sym, atomic_number: $z, mass: $mass, valences: &[$($v),*] }
    };
}

static ELEMENTS: &[Element] = &[
    element!("H", 1, 1.008, [1]),
    element!("He", 2, 4.003, []),
    element!("Li", 3, 6.941, [1]),
    element!("Be", 4, 9.012, [2]),
    element!("B", 5, 10.812, [3]),
    element!("C", 6, 12.011, [4]),
    element!("N", 7, 14.007, [3, 5]),
    element!("O", 8, 15.999, [2]),
    element!("F", 9, 18.998, [1]),
    element!("Ne", 10, 20.180, []),
    element!("Na", 11, 22.990, [1]),
    element!("Mg", 12, 24.305, [2]),
    element!("Al", 13, 26.982, [3]),
    element!("Si", 14, 28.086, [4]),
    element!("P", 15, 30.974, [3, 5]),
    element!("S", 16, 32.067, [2, 4, 6]),
    element!("Cl", 17, 35.453, [1]),
    element!("Ar", 18, 39.948, []),
    element!("K", 19, 39.098, [1]),
    element!("Ca", 20, 40.078, [2]),
    element!("Sc", 21, 44.956, []),
    element!("Ti", 22, 47.867, []),
    element!("V", 23, 50.942, []),
    element!("Cr", 24, 51.996, []),
    element!("Mn", 25, 54.938, []),
    element!("Fe", 26, 55.845, []),
    element!("Co", 27, 58.933, []),
    element!("Ni", 28, 58.693, []),
    element!("Cu", 29, 63.546, []),
    element!("Zn", 30, 65.390, []),
    element!("Ga", 31, 69.723, [3]),
    element!("Ge", 32, 72.610, [4]),
    element!("As", 33, 74.922, [3, 5]),
    element!("Se", 34, 78.960, [2, 4, 6]),
    element!("Br", 35, 79.904, [1]),
    element!("Kr", 36, 83.800, []),
    element!("Rb", 37, 85.468, [1]),
    element!("Sr", 38, 87.620, [2]),
    element!("Y", 39, 88.906, []),
    element!("Zr", 40, 91.224, []),
    element!("Mo", 42, 95.940, []),
    element!("Ru", 44, 101.070, []),
    element!("Rh", 45, 102.906, []),
    element!("Pd", 46, 106.420, []),
    element!("Ag", 47, 107.868, []),
    element!("Cd", 48, 112.411, []),
    element!("In", 49, 114.818, [3]),
    element!("Sn", 50, 118.710, [2, 4]),
    element!("Sb", 51, 121.760, [3, 5]),
    element!("Te", 52, 127.600, [2, 4, 6]),
    element!("I", 53, 126.904, [1, 3, 5]),
    element!("Xe", 54, 131.290, []),
    element!("Cs", 55, 132.905, [1]),
    element!("Ba", 56, 137.327, [2]),
    element!("La", 57, 138.906, []),
    element!("Gd", 64, 157.250, []),
    element!("W", 74, 183.840, []),
    element!("Re", 75, 186.207, []),
    element!("Os", 76, 190.230, []),
    element!("Ir", 77, 192.217, []),
    element!("Pt", 78, 195.078, []),
    element!("Au", 79, 196.967, []),
    element!("Hg", 80, 200.590, []),
    element!("Tl", 81, 204.383, []),
    element!("Pb", 82, 207.200, []),
    element!("Bi", 83, 208.980, []),
];

/// Placeholder for the `*` wildcard atom.
pub static WILDCARD: Element = Element { symbol: "*", atomic_number: 0, mass: 0.0, valences: &[] };

/// Look up an element by its capitalised symbol.
pub fn lookup(symbol: &str) -> Option<&'static Element> {
    if symbol == "*" {
        return Some(&WILDCARD);
    }
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

/// Elements that may appear outside brackets (the SMILES organic subset).
pub fn is_organic_subset(symbol: &str) -> bool {
    matches!(symbol, "B" | "C" | "N" | "O" | "P" | "S" | "F" | "Cl" | "Br" | "I")
}

/// Elements that may be written in lower case as aromatic atoms.
pub fn can_be_aromatic(symbol: &str) -> bool {
    matches!(symbol, "B" | "C" | "N" | "O" | "P" | "S" | "Se" | "As" | "Te")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let c = lookup("C").unwrap();
        assert_eq!(c.atomic_number, 6);
        assert_eq!(c.valences, &[4]);
        assert!(lookup("Cl").is_some());
        assert!(lookup("Xx").is_none());
        assert!(lookup("c").is_none());
        assert_eq!(lookup("*").unwrap().mass, 0.0);
    }

    #[test]
    fn test_subsets() {
        assert!(is_organic_subset("Br"));
        assert!(!is_organic_subset("Na"));
        assert!(can_be_aromatic("Se"));
        assert!(!can_be_aromatic("Cl"));
    }
}

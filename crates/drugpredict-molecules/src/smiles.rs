//! SMILES parser.
//!
//! Builds an atom/bond graph from a SMILES string. Supported syntax:
//! organic-subset and bracket atoms (isotope, chirality, H count, charge,
//! atom class), branches, ring closures including `%nn`, explicit bonds
//! `- = # $ : / \`, aromatic lower-case atoms and `.` disconnections.
//! Stereo markers are accepted and discarded.
//!
//! Hydrogens on organic-subset atoms are implicit and derived from the
//! lowest default valence that accommodates the explicit bonds. Aromatic
//! atoms donate one valence unit to the pi system.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::element::{self, Element, HYDROGEN_MASS};
use crate::error::{MoleculeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Contribution to an atom's explicit valence. Aromatic bonds count as
    /// one; the extra pi electron is accounted per atom.
    pub fn valence(self) -> u32 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Atom {
    pub element: &'static Element,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// Written in brackets, so the hydrogen count is explicit.
    pub bracket: bool,
    /// Attached hydrogens not present as graph atoms.
    pub hydrogens: u8,
}

impl Atom {
    pub fn symbol(&self) -> &'static str {
        self.element.symbol
    }

    pub fn is(&self, symbol: &str) -> bool {
        self.element.symbol == symbol
    }

    pub fn mass(&self) -> f64 {
        match self.isotope {
            Some(iso) => f64::from(iso),
            None => self.element.mass,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Bond {
    pub begin: usize,
    pub end: usize,
    pub order: BondOrder,
}

impl Bond {
    pub fn other(&self, atom: usize) -> usize {
        if self.begin == atom {
            self.end
        } else {
            self.begin
        }
    }
}

/// Parsed molecular graph.
#[derive(Debug, Clone)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<usize>>,
}

impl Molecule {
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    /// `(neighbour index, bond order)` pairs for an atom.
    pub fn neighbors(&self, idx: usize) -> impl Iterator<Item = (usize, BondOrder)> + '_ {
        self.adjacency[idx].iter().map(move |&b| {
            let bond = &self.bonds[b];
            (bond.other(idx), bond.order)
        })
    }

    /// Neighbours that are not hydrogen atoms.
    pub fn heavy_neighbors(&self, idx: usize) -> impl Iterator<Item = (usize, BondOrder)> + '_ {
        self.neighbors(idx).filter(move |(n, _)| !self.atoms[*n].is("H"))
    }

    /// Implicit/bracket hydrogens plus explicit `[H]` neighbours.
    pub fn total_hydrogens(&self, idx: usize) -> u32 {
        let explicit = self.neighbors(idx).filter(|(n, _)| self.atoms[*n].is("H")).count() as u32;
        u32::from(self.atoms[idx].hydrogens) + explicit
    }

    /// Sum of bond orders plus attached hydrogens.
    pub fn total_valence(&self, idx: usize) -> u32 {
        self.bond_order_sum(idx) + u32::from(self.atoms[idx].hydrogens)
    }

    fn bond_order_sum(&self, idx: usize) -> u32 {
        self.neighbors(idx).map(|(_, order)| order.valence()).sum()
    }

    /// True when the bond between `a` and `b` lies on a cycle.
    pub fn is_ring_bond(&self, a: usize, b: usize) -> bool {
        // Search for another path from a to b that avoids the direct edge.
        let mut seen = HashSet::from([a]);
        let mut queue = VecDeque::from([a]);
        while let Some(cur) = queue.pop_front() {
            for (next, _) in self.neighbors(cur) {
                if cur == a && next == b {
                    continue;
                }
                if next == b {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Average molecular weight including all hydrogens.
    pub fn molecular_weight(&self) -> f64 {
        self.atoms
            .iter()
            .map(|a| a.mass() + f64::from(a.hydrogens) * HYDROGEN_MASS)
            .sum()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.atoms.iter().filter(|a| !a.is("H")).count()
    }
}

/// Parse a SMILES string into a [`Molecule`].
pub fn parse_smiles(smiles: &str) -> Result<Molecule> {
    Parser::new(smiles).parse()
}

struct RingOpening {
    atom: usize,
    order: Option<BondOrder>,
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    rings: HashMap<u32, RingOpening>,
    branches: Vec<usize>,
    prev: Option<usize>,
    pending: Option<BondOrder>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.trim().chars().collect(),
            pos: 0,
            atoms: Vec::new(),
            bonds: Vec::new(),
            rings: HashMap::new(),
            branches: Vec::new(),
            prev: None,
            pending: None,
        }
    }

    fn err(&self, reason: impl Into<String>) -> MoleculeError {
        MoleculeError::parse(self.src, reason)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn parse(mut self) -> Result<Molecule> {
        if self.chars.is_empty() {
            return Err(self.err("empty string"));
        }

        while let Some(c) = self.peek() {
            match c {
                '(' => {
                    let prev = self.prev.ok_or_else(|| self.err("branch without a preceding atom"))?;
                    if self.pending.is_some() {
                        return Err(self.err(format!("bond before '(' at position {}", self.pos)));
                    }
                    self.branches.push(prev);
                    self.pos += 1;
                }
                ')' => {
                    if self.pending.is_some() {
                        return Err(self.err(format!("dangling bond at position {}", self.pos)));
                    }
                    let open = self
                        .branches
                        .pop()
                        .ok_or_else(|| self.err(format!("unbalanced ')' at position {}", self.pos)))?;
                    self.prev = Some(open);
                    self.pos += 1;
                }
                '.' => {
                    if self.pending.is_some() {
                        return Err(self.err(format!("bond before '.' at position {}", self.pos)));
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                '-' | '=' | '#' | '$' | ':' | '/' | '\\' => {
                    if self.pending.is_some() {
                        return Err(self.err(format!("consecutive bonds at position {}", self.pos)));
                    }
                    self.pending = Some(match c {
                        '=' => BondOrder::Double,
                        '#' => BondOrder::Triple,
                        '$' => BondOrder::Quadruple,
                        ':' => BondOrder::Aromatic,
                        _ => BondOrder::Single,
                    });
                    self.pos += 1;
                }
                '%' | '0'..='9' => {
                    let number = self.ring_number()?;
                    self.ring_closure(number)?;
                }
                '[' => {
                    self.pos += 1;
                    let atom = self.bracket_atom()?;
                    self.add_atom(atom)?;
                }
                _ => {
                    let atom = self.organic_atom()?;
                    self.add_atom(atom)?;
                }
            }
        }

        if self.pending.is_some() {
            return Err(self.err("dangling bond at end of string"));
        }
        if !self.branches.is_empty() {
            return Err(self.err("unbalanced '('"));
        }
        if let Some(number) = self.rings.keys().min() {
            return Err(self.err(format!("unclosed ring {}", number)));
        }

        self.finish()
    }

    fn ring_number(&mut self) -> Result<u32> {
        let first = self.peek().unwrap_or_default();
        if first == '%' {
            let digits: String = [self.peek_at(1), self.peek_at(2)]
                .iter()
                .map_while(|c| c.filter(char::is_ascii_digit))
                .collect();
            if digits.len() != 2 {
                return Err(self.err(format!("'%' needs two digits at position {}", self.pos)));
            }
            self.pos += 3;
            digits
                .parse()
                .map_err(|_| self.err(format!("bad ring number {}", digits)))
        } else {
            self.pos += 1;
            Ok(first.to_digit(10).unwrap_or_default())
        }
    }

    fn ring_closure(&mut self, number: u32) -> Result<()> {
        let atom = self
            .prev
            .ok_or_else(|| self.err(format!("ring bond {} without a preceding atom", number)))?;
        let written = self.pending.take();

        match self.rings.remove(&number) {
            None => {
                self.rings.insert(number, RingOpening { atom, order: written });
            }
            Some(open) => {
                if open.atom == atom {
                    return Err(self.err(format!("ring {} closes on its own atom", number)));
                }
                if self.bonds.iter().any(|b| {
                    (b.begin == open.atom && b.end == atom) || (b.begin == atom && b.end == open.atom)
                }) {
                    return Err(self.err(format!("ring {} duplicates an existing bond", number)));
                }
                let order = match (open.order, written) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(self.err(format!("conflicting bond orders on ring {}", number)))
                    }
                    (Some(a), _) | (None, Some(a)) => a,
                    (None, None) => self.default_order(open.atom, atom),
                };
                self.bonds.push(Bond { begin: open.atom, end: atom, order });
            }
        }
        Ok(())
    }

    fn default_order(&self, a: usize, b: usize) -> BondOrder {
        if self.atoms[a].aromatic && self.atoms[b].aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn add_atom(&mut self, atom: Atom) -> Result<()> {
        let idx = self.atoms.len();
        self.atoms.push(atom);
        match self.prev {
            Some(prev) => {
                let order = self.pending.take().unwrap_or_else(|| self.default_order(prev, idx));
                self.bonds.push(Bond { begin: prev, end: idx, order });
            }
            None if self.pending.is_some() => {
                return Err(self.err("bond without a preceding atom"));
            }
            None => {}
        }
        self.prev = Some(idx);
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<Atom> {
        let c = self.peek().unwrap_or_default();
        let (symbol, aromatic, width) = match (c, self.peek_at(1)) {
            ('C', Some('l')) => ("Cl", false, 2),
            ('B', Some('r')) => ("Br", false, 2),
            ('B', _) => ("B", false, 1),
            ('C', _) => ("C", false, 1),
            ('N', _) => ("N", false, 1),
            ('O', _) => ("O", false, 1),
            ('P', _) => ("P", false, 1),
            ('S', _) => ("S", false, 1),
            ('F', _) => ("F", false, 1),
            ('I', _) => ("I", false, 1),
            ('b', _) => ("B", true, 1),
            ('c', _) => ("C", true, 1),
            ('n', _) => ("N", true, 1),
            ('o', _) => ("O", true, 1),
            ('p', _) => ("P", true, 1),
            ('s', _) => ("S", true, 1),
            ('*', _) => ("*", false, 1),
            _ => {
                return Err(self.err(format!("unexpected character {:?} at position {}", c, self.pos)))
            }
        };
        self.pos += width;
        let element = element::lookup(symbol).ok_or_else(|| MoleculeError::UnsupportedElement(symbol.into()))?;
        Ok(Atom {
            element,
            aromatic,
            charge: 0,
            isotope: None,
            bracket: false,
            hydrogens: 0,
        })
    }

    fn digits(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        self.chars[start..self.pos].iter().collect::<String>().parse().ok()
    }

    /// Parses the inside of `[...]`; the opening bracket is already consumed.
    fn bracket_atom(&mut self) -> Result<Atom> {
        let isotope = match self.digits() {
            Some(n) => Some(u16::try_from(n).map_err(|_| self.err("isotope out of range"))?),
            None => None,
        };

        let (symbol, aromatic) = self.bracket_symbol()?;
        let element = element::lookup(&symbol).ok_or(MoleculeError::UnsupportedElement(symbol))?;

        // Chirality: @, @@, or @TH1-style classes.
        while self.peek() == Some('@') {
            self.pos += 1;
        }
        if let (Some(a), Some(b)) = (self.peek(), self.peek_at(1)) {
            if matches!((a, b), ('T', 'H') | ('A', 'L') | ('S', 'P') | ('T', 'B') | ('O', 'H')) {
                self.pos += 2;
                self.digits();
            }
        }

        let mut hydrogens = 0u8;
        if self.peek() == Some('H') {
            self.pos += 1;
            hydrogens = match self.digits() {
                Some(n) => u8::try_from(n).map_err(|_| self.err("hydrogen count out of range"))?,
                None => 1,
            };
        }

        let mut charge: i32 = 0;
        if let Some(sign @ ('+' | '-')) = self.peek() {
            let unit = if sign == '+' { 1 } else { -1 };
            self.pos += 1;
            let magnitude = match self.digits() {
                Some(n) => n as i32,
                None => {
                    let mut n = 1;
                    while self.peek() == Some(sign) {
                        self.pos += 1;
                        n += 1;
                    }
                    n
                }
            };
            charge = unit * magnitude;
        }
        let charge = i8::try_from(charge).map_err(|_| self.err("charge out of range"))?;

        if self.peek() == Some(':') {
            self.pos += 1;
            self.digits();
        }

        if self.peek() != Some(']') {
            return Err(self.err(format!("unclosed bracket atom at position {}", self.pos)));
        }
        self.pos += 1;

        Ok(Atom {
            element,
            aromatic,
            charge,
            isotope,
            bracket: true,
            hydrogens,
        })
    }

    fn bracket_symbol(&mut self) -> Result<(String, bool)> {
        let first = self
            .peek()
            .ok_or_else(|| self.err("unclosed bracket atom"))?;

        if first == '*' {
            self.pos += 1;
            return Ok(("*".into(), false));
        }

        if first.is_ascii_lowercase() {
            // Aromatic: se, as, te before single letters.
            if let Some(second) = self.peek_at(1).filter(char::is_ascii_lowercase) {
                let two = format!("{}{}", first.to_ascii_uppercase(), second);
                if element::can_be_aromatic(&two) {
                    self.pos += 2;
                    return Ok((two, true));
                }
            }
            let one = first.to_ascii_uppercase().to_string();
            if element::can_be_aromatic(&one) {
                self.pos += 1;
                return Ok((one, true));
            }
            return Err(MoleculeError::UnsupportedElement(first.to_string()));
        }

        if first.is_ascii_uppercase() {
            if let Some(second) = self.peek_at(1).filter(char::is_ascii_lowercase) {
                let two = format!("{}{}", first, second);
                if element::lookup(&two).is_some() {
                    self.pos += 2;
                    return Ok((two, false));
                }
            }
            self.pos += 1;
            return Ok((first.to_string(), false));
        }

        Err(self.err(format!("expected element symbol at position {}", self.pos)))
    }

    fn finish(self) -> Result<Molecule> {
        let mut adjacency = vec![Vec::new(); self.atoms.len()];
        for (i, bond) in self.bonds.iter().enumerate() {
            adjacency[bond.begin].push(i);
            adjacency[bond.end].push(i);
        }

        let mut molecule = Molecule {
            atoms: self.atoms,
            bonds: self.bonds,
            adjacency,
        };

        // Implicit bonds between aromatic atoms of different rings are single.
        for i in 0..molecule.bonds.len() {
            let Bond { begin, end, order } = molecule.bonds[i];
            if order == BondOrder::Aromatic && !molecule.is_ring_bond(begin, end) {
                molecule.bonds[i].order = BondOrder::Single;
            }
        }

        for idx in 0..molecule.atoms.len() {
            if molecule.atoms[idx].bracket {
                continue;
            }
            let bonded = molecule.bond_order_sum(idx);
            molecule.atoms[idx].hydrogens = implicit_hydrogens(&molecule.atoms[idx], bonded)?;
        }

        Ok(molecule)
    }
}

fn implicit_hydrogens(atom: &Atom, bonded: u32) -> Result<u8> {
    let valences = atom.element.valences;
    let Some(&lowest) = valences.first() else {
        return Ok(0);
    };

    if atom.aromatic {
        let used = bonded + 1;
        return Ok(u32::from(lowest).saturating_sub(used) as u8);
    }

    valences
        .iter()
        .map(|&v| u32::from(v))
        .find(|&v| v >= bonded)
        .map(|v| (v - bonded) as u8)
        .ok_or_else(|| MoleculeError::Valence {
            element: atom.element.symbol.to_string(),
            valence: bonded,
        })
}

//! Multi-fragment SMILES handling.

/// Separator between disconnected components in SMILES.
pub const FRAGMENT_SEPARATOR: char = '.';

/// Return the longest `.`-separated fragment of `smiles`.
///
/// Length is measured in characters. On ties the earliest fragment wins,
/// so the result is stable for a given input. A string without separators
/// is returned unchanged.
pub fn largest_fragment(smiles: &str) -> &str {
    let mut best = "";
    let mut best_len = 0usize;
    for fragment in smiles.split(FRAGMENT_SEPARATOR) {
        let len = fragment.chars().count();
        if len > best_len {
            best = fragment;
            best_len = len;
        }
    }
    best
}

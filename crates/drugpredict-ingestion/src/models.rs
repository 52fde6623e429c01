//! Data types returned by activity sources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IngestionError;

/// One bioassay row as ChEMBL returns it, before any cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawActivity {
    pub molecule_chembl_id: String,
    pub canonical_smiles: Option<String>,
    /// Textual value as returned upstream (ChEMBL serialises it as a string).
    pub standard_value: Option<String>,
    pub standard_units: Option<String>,
    pub standard_type: Option<String>,
}

impl RawActivity {
    pub fn new(id: &str, smiles: Option<&str>, value: Option<&str>) -> Self {
        Self {
            molecule_chembl_id: id.to_string(),
            canonical_smiles: smiles.map(String::from),
            standard_value: value.map(String::from),
            standard_units: Some("nM".to_string()),
            standard_type: Some("IC50".to_string()),
        }
    }
}

/// A target chosen for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub chembl_id: String,
    /// Human-readable name for display.
    pub display_name: String,
}

/// Autocomplete entry for the target search box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSuggestion {
    pub id: String,
    pub name: String,
    pub organism: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub description: String,
}

/// How many activity rows to pull for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordLimit {
    All,
    Count(usize),
}

impl RecordLimit {
    /// Remaining rows allowed after `collected` have been fetched.
    pub fn remaining(&self, collected: usize) -> Option<usize> {
        match self {
            RecordLimit::All => None,
            RecordLimit::Count(n) => Some(n.saturating_sub(collected)),
        }
    }
}

impl Default for RecordLimit {
    fn default() -> Self {
        RecordLimit::Count(1000)
    }
}

impl FromStr for RecordLimit {
    type Err = IngestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(RecordLimit::All);
        }
        match trimmed.parse::<usize>() {
            Ok(n) if n > 0 => Ok(RecordLimit::Count(n)),
            _ => Err(IngestionError::InvalidRequest(format!(
                "limit must be a positive integer or \"all\", got {:?}",
                s
            ))),
        }
    }
}

impl fmt::Display for RecordLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordLimit::All => write!(f, "all"),
            RecordLimit::Count(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_parsing() {
        assert_eq!("all".parse::<RecordLimit>().unwrap(), RecordLimit::All);
        assert_eq!("ALL".parse::<RecordLimit>().unwrap(), RecordLimit::All);
        assert_eq!(" 250 ".parse::<RecordLimit>().unwrap(), RecordLimit::Count(250));
        assert!("0".parse::<RecordLimit>().is_err());
        assert!("-5".parse::<RecordLimit>().is_err());
        assert!("lots".parse::<RecordLimit>().is_err());
    }

    #[test]
    fn test_limit_display_roundtrip() {
        for s in ["all", "1000"] {
            assert_eq!(s.parse::<RecordLimit>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_remaining() {
        assert_eq!(RecordLimit::All.remaining(5000), None);
        assert_eq!(RecordLimit::Count(10).remaining(4), Some(6));
        assert_eq!(RecordLimit::Count(10).remaining(40), Some(0));
    }

    #[test]
    fn test_suggestion_serializes_type_field() {
        let s = TargetSuggestion {
            id: "CHEMBL203".into(),
            name: "Epidermal growth factor receptor erbB1".into(),
            organism: "Homo sapiens".into(),
            target_type: "SINGLE PROTEIN".into(),
            description: "Epidermal growth factor receptor erbB1".into(),
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["type"], "SINGLE PROTEIN");
    }
}

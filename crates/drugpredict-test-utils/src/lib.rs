//! Fixtures shared by the integration tests: synthetic activity rows, an
//! in-memory activity source and stub extended-descriptor sources.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};

use drugpredict_ingestion::sources::ActivitySource;
use drugpredict_ingestion::{
    IngestionError, RawActivity, RecordLimit, ResolvedTarget, TargetSuggestion,
};
use drugpredict_molecules::padel::{ExtendedDescriptorSource, ExtendedDescriptorTable};
use drugpredict_molecules::MoleculeError;

/// Distinct, parseable drug-like structures.
pub const SAMPLE_SMILES: [&str; 16] = [
    "CC(=O)Oc1ccccc1C(=O)O",
    "CC(C)Cc1ccc(cc1)C(C)C(=O)O",
    "CN1C=NC2=C1C(=O)N(C(=O)N2C)C",
    "CC(=O)Nc1ccc(O)cc1",
    "c1ccc2ccccc2c1",
    "OC(=O)c1ccccc1O",
    "CCN(CC)CC",
    "COc1ccc2[nH]cc(CCN)c2c1",
    "OC(=O)c1ccc(Cl)cc1",
    "NC(=O)c1cccnc1",
    "CC(C)NCC(O)COc1cccc2ccccc12",
    "OC(=O)CCc1ccccc1",
    "CCOC(=O)c1ccccc1N",
    "Cc1ccccc1NC(=O)C",
    "OCC(O)CO",
    "CCCCCCCCO",
];

/// Potencies (nM) giving 4 active, 2 intermediate and 6 inactive compounds.
pub const MIXED_POTENCIES_NM: [f64; 12] = [
    500.0, 800.0, 900.0, 1000.0, 5000.0, 5000.0, 11000.0, 12000.0, 15000.0, 20000.0, 25000.0,
    30000.0,
];

/// One row per potency, cycling through [`SAMPLE_SMILES`].
pub fn synthetic_activities(potencies_nm: &[f64]) -> Vec<RawActivity> {
    potencies_nm
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let smiles = SAMPLE_SMILES[i % SAMPLE_SMILES.len()];
            RawActivity::new(&format!("CHEMBL{}", 1000 + i), Some(smiles), Some(&v.to_string()))
        })
        .collect()
}

/// `n` rows with log-uniform potencies between 1 nM and 1 mM.
pub fn random_activities(n: usize, seed: u64) -> Vec<RawActivity> {
    let mut rng = StdRng::seed_from_u64(seed);
    let potencies: Vec<f64> = (0..n).map(|_| 10f64.powf(rng.gen_range(0.0..6.0))).collect();
    synthetic_activities(&potencies)
}

/// Activity source serving a fixed target and record set.
pub struct InMemoryActivitySource {
    pub target: ResolvedTarget,
    pub records: Vec<RawActivity>,
    pub suggestions: Vec<TargetSuggestion>,
    fetches: AtomicUsize,
}

impl InMemoryActivitySource {
    pub fn new(records: Vec<RawActivity>) -> Self {
        Self {
            target: ResolvedTarget {
                chembl_id: "CHEMBL203".to_string(),
                display_name: "Epidermal growth factor receptor".to_string(),
            },
            records,
            suggestions: Vec::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<TargetSuggestion>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Number of `fetch_activities` calls served.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActivitySource for InMemoryActivitySource {
    async fn resolve_target(&self, query: &str) -> drugpredict_ingestion::Result<ResolvedTarget> {
        let q = query.trim();
        if q.is_empty() {
            return Err(IngestionError::InvalidRequest("target must not be empty".into()));
        }
        if q.eq_ignore_ascii_case(&self.target.chembl_id) {
            return Ok(self.target.clone());
        }
        let lower = q.to_lowercase();
        if self.target.display_name.to_lowercase().contains(&lower) || lower == "egfr" {
            return Ok(ResolvedTarget {
                chembl_id: self.target.chembl_id.clone(),
                display_name: q.to_string(),
            });
        }
        Err(IngestionError::TargetNotFound(q.to_string()))
    }

    async fn fetch_activities(
        &self,
        target_id: &str,
        limit: RecordLimit,
    ) -> drugpredict_ingestion::Result<Vec<RawActivity>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if target_id != self.target.chembl_id {
            return Ok(Vec::new());
        }
        let n = limit.remaining(0).unwrap_or(self.records.len()).min(self.records.len());
        Ok(self.records[..n].to_vec())
    }

    async fn search_targets(&self, query: &str, max_results: usize) -> Vec<TargetSuggestion> {
        if query.trim().chars().count() < 2 {
            return Vec::new();
        }
        self.suggestions.iter().take(max_results).cloned().collect()
    }

    fn activity_type(&self) -> &str {
        "IC50"
    }
}

/// Extended descriptor source that is never available.
pub struct UnavailableDescriptors;

#[async_trait]
impl ExtendedDescriptorSource for UnavailableDescriptors {
    fn check_available(&self) -> drugpredict_molecules::Result<()> {
        Err(MoleculeError::Unavailable("not installed in tests".into()))
    }

    async fn compute(
        &self,
        _compounds: &[(String, String)],
    ) -> drugpredict_molecules::Result<ExtendedDescriptorTable> {
        Err(MoleculeError::Unavailable("not installed in tests".into()))
    }
}

/// Extended descriptor source that passes the availability check but whose
/// computation always times out.
pub struct TimedOutDescriptors {
    pub calls: AtomicUsize,
}

impl TimedOutDescriptors {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

impl Default for TimedOutDescriptors {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtendedDescriptorSource for TimedOutDescriptors {
    fn check_available(&self) -> drugpredict_molecules::Result<()> {
        Ok(())
    }

    async fn compute(
        &self,
        _compounds: &[(String, String)],
    ) -> drugpredict_molecules::Result<ExtendedDescriptorTable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MoleculeError::Timeout(1))
    }
}

/// Extended descriptors derived from each SMILES: its length, its ring
/// closure digit count and an alternating bit.
pub struct SyntheticDescriptors;

#[async_trait]
impl ExtendedDescriptorSource for SyntheticDescriptors {
    fn check_available(&self) -> drugpredict_molecules::Result<()> {
        Ok(())
    }

    async fn compute(
        &self,
        compounds: &[(String, String)],
    ) -> drugpredict_molecules::Result<ExtendedDescriptorTable> {
        let rows = compounds
            .iter()
            .enumerate()
            .map(|(i, (id, smiles))| {
                let digits = smiles.chars().filter(char::is_ascii_digit).count();
                (id.clone(), vec![smiles.len() as f64, digits as f64, (i % 2) as f64, 1.0])
            })
            .collect();
        Ok(ExtendedDescriptorTable {
            columns: vec!["Length".into(), "RingDigits".into(), "Alt".into(), "Const".into()],
            rows,
        })
    }
}

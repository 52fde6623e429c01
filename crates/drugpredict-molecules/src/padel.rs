//! Extended descriptors via the PaDEL-Descriptor script.
//!
//! The script reads `molecule.smi` (tab-separated `smiles\tid`) from the
//! directory it is given and writes a CSV whose first column is `Name` (the
//! compound id) followed by one numeric column per fingerprint bit. Every
//! call gets its own scratch directory under the working directory, removed
//! when the call returns.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use drugpredict_common::PadelConfig;

use crate::error::{MoleculeError, Result};

pub const SMILES_INPUT_FILE: &str = "molecule.smi";
const NAME_COLUMN: &str = "Name";

/// Descriptor matrix keyed by compound id.
#[derive(Debug, Clone, Default)]
pub struct ExtendedDescriptorTable {
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<f64>)>,
}

impl ExtendedDescriptorTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows indexed by compound id; the first occurrence of an id wins.
    pub fn by_id(&self) -> HashMap<&str, &[f64]> {
        let mut map = HashMap::with_capacity(self.rows.len());
        for (id, values) in &self.rows {
            map.entry(id.as_str()).or_insert(values.as_slice());
        }
        map
    }
}

/// Source of additional descriptors computed out of process.
#[async_trait]
pub trait ExtendedDescriptorSource: Send + Sync {
    /// Cheap check run before any work; `Err(Unavailable)` selects the
    /// reduced feature set without attempting a computation.
    fn check_available(&self) -> Result<()>;

    /// Compute descriptors for `(compound id, smiles)` pairs.
    async fn compute(&self, compounds: &[(String, String)]) -> Result<ExtendedDescriptorTable>;
}

/// Runs `bash <script> <run dir> <output file>` under a timeout.
pub struct PadelRunner {
    enabled: bool,
    script: PathBuf,
    work_dir: PathBuf,
    output_name: String,
    timeout: Duration,
}

impl PadelRunner {
    pub fn new(config: &PadelConfig, work_dir: impl AsRef<Path>) -> Self {
        let work_dir = work_dir.as_ref().to_path_buf();
        Self {
            enabled: config.enabled,
            script: config.script.clone(),
            work_dir,
            output_name: config.output_file.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Fresh scratch directory for one computation.
    fn run_dir(&self) -> Result<TempDir> {
        std::fs::create_dir_all(&self.work_dir)?;
        Ok(tempfile::Builder::new().prefix("padel-").tempdir_in(&self.work_dir)?)
    }

    fn write_input(run_dir: &Path, compounds: &[(String, String)]) -> Result<PathBuf> {
        let path = run_dir.join(SMILES_INPUT_FILE);
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(&path)?;
        for (id, smiles) in compounds {
            writer.write_record([smiles.as_str(), id.as_str()])?;
        }
        writer.flush()?;
        Ok(path)
    }
}

#[async_trait]
impl ExtendedDescriptorSource for PadelRunner {
    fn check_available(&self) -> Result<()> {
        if !self.enabled {
            return Err(MoleculeError::Unavailable("disabled in configuration".into()));
        }
        if !self.script.is_file() {
            return Err(MoleculeError::Unavailable(format!(
                "script not found: {}",
                self.script.display()
            )));
        }
        Ok(())
    }

    async fn compute(&self, compounds: &[(String, String)]) -> Result<ExtendedDescriptorTable> {
        self.check_available()?;
        let run_dir = self.run_dir()?;
        let input = Self::write_input(run_dir.path(), compounds)?;
        let output_file = run_dir.path().join(&self.output_name);
        info!("Calculating PaDEL descriptors for {} compounds", compounds.len());

        let started = SystemTime::now();
        let child = Command::new("bash")
            .arg(&self.script)
            .arg(run_dir.path())
            .arg(&output_file)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| MoleculeError::Timeout(self.timeout.as_secs()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MoleculeError::Failed(format!(
                "exit status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        ensure_fresh(&output_file, started)?;
        let table = read_descriptor_csv(&output_file)?;
        debug!(
            input = %input.display(),
            columns = table.columns.len(),
            rows = table.len(),
            "PaDEL descriptors loaded"
        );
        Ok(table)
    }
}

/// Reject a missing output or one left over from an earlier run.
fn ensure_fresh(path: &Path, started: SystemTime) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|_| {
        MoleculeError::Failed(format!("output not found: {}", path.display()))
    })?;
    let modified = metadata.modified()?;
    // Coarse filesystem timestamps can round down below the start time.
    let tolerance = Duration::from_secs(1);
    if modified + tolerance < started {
        return Err(MoleculeError::Failed(format!(
            "stale output: {} predates this run",
            path.display()
        )));
    }
    Ok(())
}

/// Parse a `Name,<descriptor>...` CSV.
pub fn read_descriptor_csv(path: &Path) -> Result<ExtendedDescriptorTable> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let name_idx = headers
        .iter()
        .position(|h| h == NAME_COLUMN)
        .ok_or_else(|| MoleculeError::Failed(format!("missing {} column", NAME_COLUMN)))?;
    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != name_idx)
        .map(|(_, h)| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let id = record.get(name_idx).unwrap_or_default().to_string();
        let mut values = Vec::with_capacity(columns.len());
        for (i, field) in record.iter().enumerate() {
            if i == name_idx {
                continue;
            }
            let value: f64 = field.trim().parse().map_err(|_| {
                MoleculeError::Failed(format!("non-numeric value {:?} for {}", field, id))
            })?;
            values.push(value);
        }
        rows.push((id, values));
    }

    Ok(ExtendedDescriptorTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(script: &Path) -> PadelConfig {
        PadelConfig {
            enabled: true,
            script: script.to_path_buf(),
            output_file: "descriptors_output.csv".into(),
            timeout_secs: 5,
        }
    }

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("padel.sh");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/usr/bin/env bash").unwrap();
        writeln!(f, "{}", body).unwrap();
        path
    }

    fn compounds() -> Vec<(String, String)> {
        vec![
            ("CHEMBL1".to_string(), "CCO".to_string()),
            ("CHEMBL2".to_string(), "c1ccccc1".to_string()),
        ]
    }

    #[test]
    fn test_read_descriptor_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "Name,PubchemFP0,PubchemFP1\nCHEMBL1,1,0\nCHEMBL2,0,1\n").unwrap();

        let table = read_descriptor_csv(&path).unwrap();
        assert_eq!(table.columns, vec!["PubchemFP0", "PubchemFP1"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.by_id()["CHEMBL2"], &[0.0, 1.0]);
    }

    #[test]
    fn test_non_numeric_cell_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "Name,A\nCHEMBL1,x\n").unwrap();
        assert!(matches!(read_descriptor_csv(&path), Err(MoleculeError::Failed(_))));
    }

    #[test]
    fn test_unavailable_when_disabled_or_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(&dir.path().join("missing.sh"));
        let runner = PadelRunner::new(&cfg, dir.path());
        assert!(matches!(runner.check_available(), Err(MoleculeError::Unavailable(_))));

        cfg.enabled = false;
        cfg.script = write_script(dir.path(), "exit 0");
        let runner = PadelRunner::new(&cfg, dir.path());
        assert!(matches!(runner.check_available(), Err(MoleculeError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_successful_run() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            r#"test -f "$1/molecule.smi" || exit 3
printf 'Name,FP0,FP1\n' > "$2"
while IFS=$'\t' read -r smi id; do printf '%s,1,0\n' "$id" >> "$2"; done < "$1/molecule.smi""#,
        );
        let runner = PadelRunner::new(&config(&script), dir.path());
        let table = runner.compute(&compounds()).await.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].0, "CHEMBL1");
        assert_eq!(table.rows[1].0, "CHEMBL2");

        // Scratch directories do not outlive the call.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_input_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = PadelRunner::write_input(dir.path(), &compounds()).unwrap();
        let smi = std::fs::read_to_string(path).unwrap();
        assert_eq!(smi, "CCO\tCHEMBL1\nc1ccccc1\tCHEMBL2\n");
    }

    #[tokio::test]
    async fn test_concurrent_runs_do_not_share_files() {
        let dir = tempfile::tempdir().unwrap();
        // Sleeps, then echoes the ids in its input. A shared input file would
        // hand the first run the second run's ids.
        let script = write_script(
            dir.path(),
            r#"sleep 1
ids=$(cut -f2 "$1/molecule.smi")
printf 'Name,FP0\n' > "$2"
for id in $ids; do printf '%s,1\n' "$id" >> "$2"; done"#,
        );
        let runner_a = PadelRunner::new(&config(&script), dir.path());
        let runner_b = PadelRunner::new(&config(&script), dir.path());
        let batch_a = compounds();
        let batch_b = vec![
            ("CHEMBL8".to_string(), "CCN".to_string()),
            ("CHEMBL9".to_string(), "CCCl".to_string()),
        ];

        let (a, b) = tokio::join!(runner_a.compute(&batch_a), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            runner_b.compute(&batch_b).await
        });

        let ids = |t: ExtendedDescriptorTable| -> Vec<String> {
            t.rows.into_iter().map(|(id, _)| id).collect()
        };
        assert_eq!(ids(a.unwrap()), vec!["CHEMBL1", "CHEMBL2"]);
        assert_eq!(ids(b.unwrap()), vec!["CHEMBL8", "CHEMBL9"]);
    }

    #[tokio::test]
    async fn test_script_failure() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "echo boom >&2; exit 1");
        let runner = PadelRunner::new(&config(&script), dir.path());
        match runner.compute(&compounds()).await {
            Err(MoleculeError::Failed(msg)) => assert!(msg.contains("boom")),
            other => panic!("unexpected: {:?}", other.map(|t| t.len())),
        }
    }

    #[tokio::test]
    async fn test_missing_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "exit 0");
        let runner = PadelRunner::new(&config(&script), dir.path());
        assert!(matches!(runner.compute(&compounds()).await, Err(MoleculeError::Failed(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "sleep 5");
        let mut cfg = config(&script);
        cfg.timeout_secs = 1;
        let runner = PadelRunner::new(&cfg, dir.path());
        assert!(matches!(runner.compute(&compounds()).await, Err(MoleculeError::Timeout(1))));
    }

    #[test]
    fn test_stale_output_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.csv");
        std::fs::write(&path, "Name\n").unwrap();
        let later = SystemTime::now() + Duration::from_secs(60);
        assert!(ensure_fresh(&path, later).is_err());
        assert!(ensure_fresh(&path, SystemTime::now()).is_ok());
    }
}

//! Run summaries and their per-solver JSON files.
//!
//! Every solver owns one file `<dir>/<SolverName>.json` shaped as
//! `{"models": [RunSummary, ...]}`; each finished run appends one record.

use crate::error::{Result, WdpError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run status, or the backend's native status for exact runs
    pub status: String,
    /// Elapsed seconds
    pub delta_time: f64,
    pub nr_items: usize,
    pub nr_orders: usize,
    pub profit: f64,
    /// Originating dataset
    pub file_path: String,
    /// Dataset name
    pub name: String,
    #[serde(default)]
    pub solver: String,
    /// Budget in seconds
    #[serde(default)]
    pub timeout: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feasible_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epochs: Option<usize>,
}

/// Contents of one summary file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryFile {
    #[serde(default)]
    pub models: Vec<RunSummary>,
}

/// Directory of per-solver summary files
#[derive(Debug, Clone)]
pub struct SummaryStore {
    dir: PathBuf,
}

impl SummaryStore {
    /// Open `dir`, creating it when missing
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if dir.exists() && !dir.is_dir() {
            return Err(WdpError::config(format!(
                "output path {} exists and is not a directory",
                dir.display()
            )));
        }
        fs::create_dir_all(dir)?;
        Ok(SummaryStore {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, solver: &str) -> PathBuf {
        self.dir.join(format!("{}.json", solver))
    }

    /// Append `summary` to its solver's file
    pub fn append(&self, summary: &RunSummary) -> Result<()> {
        let path = self.path_for(&summary.solver);
        let mut file = if path.exists() {
            Self::load(&path)?
        } else {
            SummaryFile::default()
        };
        file.models.push(summary.clone());

        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, &file)?;
        writer.flush()?;
        log::debug!("Appended run of {} to {}", summary.name, path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<SummaryFile> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Every `*.json` summary in `dir`, keyed by file stem
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<BTreeMap<String, Vec<RunSummary>>> {
        let mut summaries = BTreeMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            summaries.insert(stem, Self::load(&path)?.models);
        }
        Ok(summaries)
    }
}

/// Markdown table of a summary file's runs
pub fn markdown_table(runs: &[RunSummary]) -> String {
    let mut table = String::new();
    table.push_str("# Tabular data of the experiment\n\n\n");
    table.push_str("|           Model Name           | Nr. Orders | Nr. Items  |   Profit   | Duration (seconds) |\n");
    table.push_str("|--------------------------------|------------|------------|------------|--------------------|\n");
    for run in runs {
        table.push_str(&format!(
            "| {:30.30} | {:10.10} | {:10.10} | {:10.2} | {:18.2} |\n",
            run.name,
            run.nr_orders.to_string(),
            run.nr_items.to_string(),
            run.profit,
            run.delta_time
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(solver: &str, name: &str, profit: f64) -> RunSummary {
        RunSummary {
            status: "Finished".to_string(),
            delta_time: 1.25,
            nr_items: 4,
            nr_orders: 6,
            profit,
            file_path: format!("data/{}", name),
            name: name.to_string(),
            solver: solver.to_string(),
            timeout: 5.0,
            feasible_profit: None,
            epochs: None,
        }
    }

    #[test]
    fn test_append_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SummaryStore::new(dir.path().join("out")).unwrap();

        store.append(&sample("GreedyBigBet", "a.txt", 20.0)).unwrap();
        store.append(&sample("GreedyBigBet", "b.txt", 7.0)).unwrap();
        store.append(&sample("AntColony", "a.txt", 21.0)).unwrap();

        let big = SummaryStore::load(store.path_for("GreedyBigBet")).unwrap();
        assert_eq!(big.models.len(), 2);
        assert_eq!(big.models[1].name, "b.txt");

        let all = SummaryStore::load_dir(store.dir()).unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["AntColony", "GreedyBigBet"]);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let json = serde_json::to_string(&sample("GreedyBigBet", "a.txt", 1.0)).unwrap();
        assert!(!json.contains("feasible_profit"));
        assert!(json.contains("\"nr_orders\":6"));

        // files written before `solver`/`timeout` existed still load
        let legacy = r#"{"models":[{"status":"Optimal","delta_time":0.5,"nr_items":2,"nr_orders":3,"profit":4.0,"file_path":"x","name":"m"}]}"#;
        let file: SummaryFile = serde_json::from_str(legacy).unwrap();
        assert_eq!(file.models[0].solver, "");
    }

    #[test]
    fn test_output_path_must_be_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            SummaryStore::new(file.path()),
            Err(WdpError::Config(_))
        ));
    }

    #[test]
    fn test_markdown_table() {
        let table = markdown_table(&[sample("GreedyBigBet", "arbitrary_40.txt", 20.0)]);
        let row = table.lines().last().unwrap();
        assert!(row.starts_with("| arbitrary_40.txt "));
        assert!(row.contains("| 6          | 4          |"));
        assert!(row.contains("20.00"));
        assert!(row.ends_with("1.25 |"));
    }
}

//! Dictionary encoding of relation files.
//!
//! A value domain (places, subjects, ...) is fed by one or more two-column
//! `(owner, value)` files. Pass 1 assigns every distinct value a dense 1-based surrogate
//! id in first-occurrence order across all of the domain's files, and writes the key
//! table. Pass 2 rewrites each file as `(owner, id)` into a sibling `<stem>_id.csv`.
//! Sharing one dictionary across files keeps a dimension (e.g. places referenced by both
//! author locations and edition publish places) free of duplicate rows.
//!
//! Domains have no data dependency on each other and can run concurrently; a single
//! domain's rewrite never starts before its dictionary is complete.

use crate::channels::{create_tsv, open_tsv};
use crate::config::{ASSOCIATION_SUFFIX, DEFAULT_DOMAINS, OUTPUT_EXTENSION, PROGRESS_INTERVAL};
use anyhow::{bail, Context, Result};
use csv::StringRecord;
use indicatif::ProgressBar;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Distinct values in first-occurrence order; a value's id is its 1-based position.
#[derive(Debug, Default)]
pub struct Dictionary {
    ids: FxHashMap<String, u32>,
    values: Vec<String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value's id, assigning the next one if it has not been seen.
    pub fn insert(&mut self, value: &str) -> Result<u32> {
        if let Some(&id) = self.ids.get(value) {
            return Ok(id);
        }
        let id = next_id(self.values.len())?;
        self.values.push(value.to_string());
        self.ids.insert(value.to_string(), id);
        Ok(id)
    }

    pub fn get(&self, value: &str) -> Option<u32> {
        self.ids.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(id, value)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        (1u32..).zip(self.values.iter().map(String::as_str))
    }
}

/// Id for the value following `assigned` others; ids must fit the key table's `u32` column.
fn next_id(assigned: usize) -> Result<u32> {
    assigned
        .checked_add(1)
        .and_then(|n| u32::try_from(n).ok())
        .with_context(|| format!("Dictionary id space exhausted after {} values", assigned))
}

/// Yields the well-formed `(owner, value)` rows of a relation file, counting the rest.
/// Read failures are fatal; undecodable or wrongly sized rows are skipped.
fn for_each_pair<F>(path: &Path, malformed: &mut u64, mut f: F) -> Result<()>
where
    F: FnMut(&StringRecord) -> Result<()>,
{
    let mut reader = open_tsv(path)?;
    let pb = ProgressBar::new_spinner();
    let mut rows = 0u64;

    for result in reader.records() {
        rows += 1;
        if rows % PROGRESS_INTERVAL == 0 {
            pb.tick();
        }
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => {
                return Err(e).with_context(|| format!("Failed to read: {:?}", path));
            }
            Err(e) => {
                debug!(file = ?path, error = %e, "Skipping undecodable row");
                *malformed += 1;
                continue;
            }
        };
        if record.len() != 2 {
            debug!(
                file = ?path,
                line = record.position().map(|p| p.line()),
                columns = record.len(),
                "Skipping row without exactly two columns"
            );
            *malformed += 1;
            continue;
        }
        f(&record)?;
    }

    pb.finish_and_clear();
    Ok(())
}

/// Pass 1: scans `files` in order and assigns ids to column-2 values by first occurrence.
pub fn build_dictionary<P: AsRef<Path>>(files: &[P]) -> Result<Dictionary> {
    let mut dictionary = Dictionary::new();
    let mut malformed = 0u64;

    for path in files {
        let path = path.as_ref();
        for_each_pair(path, &mut malformed, |record| {
            dictionary.insert(&record[1])?;
            Ok(())
        })?;
        debug!(file = ?path, distinct = dictionary.len(), "Scanned relation file");
    }

    if malformed > 0 {
        warn!(malformed, "Skipped malformed rows while building dictionary");
    }
    Ok(dictionary)
}

/// Writes the key table as `<id>\t<value>` rows in id order.
pub fn write_key_table(dictionary: &Dictionary, path: &Path) -> Result<()> {
    let mut writer = create_tsv(path)?;
    let mut id_buf = itoa::Buffer::new();
    for (id, value) in dictionary.iter() {
        writer
            .write_record([id_buf.format(id), value])
            .with_context(|| format!("Failed to write key table: {:?}", path))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush key table: {:?}", path))?;
    Ok(())
}

/// Sibling file holding the rewritten association rows: `<stem>_id.csv`.
pub fn association_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        "{}{}.{}",
        stem, ASSOCIATION_SUFFIX, OUTPUT_EXTENSION
    ))
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows_written: u64,
    pub missing: u64,
    pub malformed: u64,
}

/// Pass 2: rewrites each file with column 2 replaced by its surrogate id.
///
/// A value absent from the dictionary is a defect in the inputs; the row is logged as
/// missing and dropped, never written with a placeholder id.
pub fn rewrite<P: AsRef<Path>>(files: &[P], dictionary: &Dictionary) -> Result<Vec<FileReport>> {
    let mut reports = Vec::with_capacity(files.len());
    let mut id_buf = itoa::Buffer::new();

    for path in files {
        let input = path.as_ref();
        let output = association_path(input);
        let mut writer = create_tsv(&output)?;
        let mut rows_written = 0u64;
        let mut missing = 0u64;
        let mut malformed = 0u64;

        for_each_pair(input, &mut malformed, |record| {
            match dictionary.get(&record[1]) {
                Some(id) => {
                    writer
                        .write_record([&record[0], id_buf.format(id)])
                        .with_context(|| format!("Failed to write: {:?}", output))?;
                    rows_written += 1;
                }
                None => {
                    warn!(
                        file = ?input,
                        value = &record[1],
                        line = %format!("{}\t{}", &record[0], &record[1]),
                        "Missing"
                    );
                    missing += 1;
                }
            }
            Ok(())
        })?;

        writer
            .flush()
            .with_context(|| format!("Failed to flush: {:?}", output))?;

        debug!(file = ?output, rows = rows_written, missing, "Association file written");
        reports.push(FileReport {
            input: input.to_path_buf(),
            output,
            rows_written,
            missing,
            malformed,
        });
    }

    Ok(reports)
}

/// One value domain: the key table it produces and the relation files that feed it.
/// Relative paths are resolved against the output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainPlan {
    pub name: String,
    pub key_table: PathBuf,
    pub inputs: Vec<PathBuf>,
}

impl DomainPlan {
    fn resolve(path: &Path, dir: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            dir.join(path)
        }
    }

    pub fn key_table_in(&self, dir: &Path) -> PathBuf {
        Self::resolve(&self.key_table, dir)
    }

    pub fn inputs_in(&self, dir: &Path) -> Vec<PathBuf> {
        self.inputs.iter().map(|p| Self::resolve(p, dir)).collect()
    }
}

/// The built-in domains matching the target schema's dimension tables.
pub fn default_plans() -> Vec<DomainPlan> {
    let file = |stem: &str| PathBuf::from(format!("{}.{}", stem, OUTPUT_EXTENSION));
    DEFAULT_DOMAINS
        .iter()
        .map(|&(name, key_table, inputs)| DomainPlan {
            name: name.to_string(),
            key_table: file(key_table),
            inputs: inputs.iter().map(|&stem| file(stem)).collect(),
        })
        .collect()
}

/// Reads a JSON array of [`DomainPlan`]s.
pub fn load_plans(path: &Path) -> Result<Vec<DomainPlan>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open plan file: {:?}", path))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse plan file: {:?}", path))
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainReport {
    pub domain: String,
    pub key_table: PathBuf,
    pub distinct_values: usize,
    pub files: Vec<FileReport>,
}

impl DomainReport {
    pub fn rows_written(&self) -> u64 {
        self.files.iter().map(|f| f.rows_written).sum()
    }

    pub fn missing(&self) -> u64 {
        self.files.iter().map(|f| f.missing).sum()
    }
}

/// Builds, writes and applies one domain's dictionary. Inputs that do not exist are left
/// out; a domain with no inputs at all yields `None`.
pub fn normalize_domain(plan: &DomainPlan, dir: &Path) -> Result<Option<DomainReport>> {
    let (inputs, absent): (Vec<PathBuf>, Vec<PathBuf>) =
        plan.inputs_in(dir).into_iter().partition(|p| p.exists());

    for path in &absent {
        warn!(domain = %plan.name, file = ?path, "Relation file not found, leaving it out");
    }
    if inputs.is_empty() {
        warn!(domain = %plan.name, "No relation files for domain, skipping");
        return Ok(None);
    }

    info!(domain = %plan.name, files = inputs.len(), "Building dictionary");
    let dictionary = build_dictionary(&inputs)
        .with_context(|| format!("Failed to build dictionary for domain: {}", plan.name))?;

    let key_table = plan.key_table_in(dir);
    write_key_table(&dictionary, &key_table)?;

    let files = rewrite(&inputs, &dictionary)
        .with_context(|| format!("Failed to rewrite relation files for domain: {}", plan.name))?;

    let report = DomainReport {
        domain: plan.name.clone(),
        key_table,
        distinct_values: dictionary.len(),
        files,
    };
    info!(
        domain = %report.domain,
        distinct = report.distinct_values,
        rows = report.rows_written(),
        missing = report.missing(),
        "Domain normalized"
    );
    Ok(Some(report))
}

/// Like [`normalize_domain`], but every listed input must exist. Used for file lists given
/// by hand, where a missing file is an operator error rather than an unextracted kind.
pub fn normalize_listed(plan: &DomainPlan, dir: &Path) -> Result<DomainReport> {
    let absent: Vec<PathBuf> = plan
        .inputs_in(dir)
        .into_iter()
        .filter(|p| !p.exists())
        .collect();
    if !absent.is_empty() {
        bail!(
            "Relation files not found for domain {}: {:?}",
            plan.name,
            absent
        );
    }
    normalize_domain(plan, dir)?
        .with_context(|| format!("No relation files listed for domain: {}", plan.name))
}

/// Normalizes every plan, running up to `jobs` whole domains at once. Plans must not
/// share relation files, since each domain rewrites its own inputs.
pub fn normalize_all(plans: &[DomainPlan], dir: &Path, jobs: usize) -> Result<Vec<DomainReport>> {
    let results: Vec<Option<DomainReport>> = if jobs <= 1 {
        plans
            .iter()
            .map(|plan| normalize_domain(plan, dir))
            .collect::<Result<Vec<_>>>()?
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|i| format!("shelfmark-normalize-{}", i))
            .build()
            .context("Failed to build normalization thread pool")?;
        pool.install(|| {
            plans
                .par_iter()
                .map(|plan| normalize_domain(plan, dir))
                .collect::<Result<Vec<_>>>()
        })?
    };

    Ok(results.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn dictionary_assigns_dense_ids_in_order() {
        let mut dict = Dictionary::new();
        assert_eq!(dict.insert("Paris").unwrap(), 1);
        assert_eq!(dict.insert("London").unwrap(), 2);
        assert_eq!(dict.insert("Paris").unwrap(), 1);
        assert_eq!(dict.insert("Tokyo").unwrap(), 3);
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.get("London"), Some(2));
        assert_eq!(dict.get("Berlin"), None);
        let pairs: Vec<_> = dict.iter().collect();
        assert_eq!(pairs, [(1, "Paris"), (2, "London"), (3, "Tokyo")]);
    }

    #[test]
    fn id_space_ends_at_u32_max() {
        assert_eq!(next_id(0).unwrap(), 1);
        assert_eq!(next_id(u32::MAX as usize - 1).unwrap(), u32::MAX);
        assert!(next_id(u32::MAX as usize).is_err());
        assert!(next_id(usize::MAX).is_err());
    }

    #[test]
    fn build_skips_rows_without_two_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "rel.csv",
            "OL1M\tA\nbroken\nOL2M\tB\textra\nOL3M\tC\n",
        );
        let dict = build_dictionary(&[path]).unwrap();
        let values: Vec<_> = dict.iter().map(|(_, v)| v.to_string()).collect();
        assert_eq!(values, ["A", "C"]);
    }

    #[test]
    fn build_fails_on_missing_file() {
        assert!(build_dictionary(&[PathBuf::from("/nonexistent/rel.csv")]).is_err());
    }

    #[test]
    fn key_table_rows_in_id_order() {
        let dir = TempDir::new().unwrap();
        let mut dict = Dictionary::new();
        dict.insert("Paris").unwrap();
        dict.insert("München").unwrap();
        let path = dir.path().join("places.csv");
        write_key_table(&dict, &path).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "1\tParis\n2\tMünchen\n");
    }

    #[test]
    fn association_path_appends_suffix() {
        assert_eq!(
            association_path(Path::new("/out/editions_publish_places.csv")),
            PathBuf::from("/out/editions_publish_places_id.csv")
        );
    }

    #[test]
    fn rewrite_drops_missing_values() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "rel.csv", "OL1M\tParis\nOL2M\tLima\n");
        let mut dict = Dictionary::new();
        dict.insert("Paris").unwrap();

        let reports = rewrite(&[&path], &dict).unwrap();
        assert_eq!(reports[0].rows_written, 1);
        assert_eq!(reports[0].missing, 1);
        let out = fs::read_to_string(association_path(&path)).unwrap();
        assert_eq!(out, "OL1M\t1\n");
    }

    #[test]
    fn default_plans_cover_shared_places() {
        let plans = default_plans();
        let places = plans.iter().find(|p| p.name == "places").unwrap();
        assert_eq!(places.key_table, PathBuf::from("places.csv"));
        assert_eq!(
            places.inputs,
            [
                PathBuf::from("authors_location.csv"),
                PathBuf::from("editions_publish_places.csv")
            ]
        );
    }

    #[test]
    fn plans_resolve_relative_paths() {
        let plan = DomainPlan {
            name: "x".to_string(),
            key_table: PathBuf::from("x.csv"),
            inputs: vec![PathBuf::from("/abs/a.csv"), PathBuf::from("b.csv")],
        };
        let dir = Path::new("/out");
        assert_eq!(plan.key_table_in(dir), PathBuf::from("/out/x.csv"));
        assert_eq!(
            plan.inputs_in(dir),
            [PathBuf::from("/abs/a.csv"), PathBuf::from("/out/b.csv")]
        );
    }

    #[test]
    fn load_plans_from_json() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "plan.json",
            r#"[{"name": "genres", "key_table": "genres.csv", "inputs": ["editions_genres.csv"]}]"#,
        );
        let plans = load_plans(&path).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "genres");
        assert_eq!(plans[0].inputs, [PathBuf::from("editions_genres.csv")]);
    }

    #[test]
    fn listed_domain_fails_on_missing_file() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.csv", "OL1M\tParis\n");
        let plan = DomainPlan {
            name: "places".to_string(),
            key_table: PathBuf::from("places.csv"),
            inputs: vec![PathBuf::from("a.csv"), PathBuf::from("typo.csv")],
        };

        let err = normalize_listed(&plan, dir.path()).unwrap_err();
        assert!(err.to_string().contains("typo.csv"));
        assert!(!dir.path().join("places.csv").exists());
        assert!(!dir.path().join("a_id.csv").exists());
    }

    #[test]
    fn listed_domain_with_all_files_normalizes() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.csv", "OL1M\tParis\nOL2M\tLima\n");
        let plan = DomainPlan {
            name: "places".to_string(),
            key_table: PathBuf::from("places.csv"),
            inputs: vec![PathBuf::from("a.csv")],
        };

        let report = normalize_listed(&plan, dir.path()).unwrap();
        assert_eq!(report.distinct_values, 2);
        assert_eq!(report.rows_written(), 2);
    }

    #[test]
    fn domain_without_inputs_is_skipped() {
        let dir = TempDir::new().unwrap();
        let plan = DomainPlan {
            name: "genres".to_string(),
            key_table: PathBuf::from("genres.csv"),
            inputs: vec![PathBuf::from("editions_genres.csv")],
        };
        assert!(normalize_domain(&plan, dir.path()).unwrap().is_none());
        assert!(!dir.path().join("genres.csv").exists());
    }
}

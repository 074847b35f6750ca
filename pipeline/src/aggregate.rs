//! Flattens the `<dataset>/<algorithm>/eps<eps>.dat` tree into a single CSV.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use benchlog::{metrics::NUMBER_PATTERN, Outcome, RunSummary, ACCUMULATION_COLUMNS};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::tree::{accumulation_files, dataset_and_algorithm};

pub const CSV_SUBDIR: &str = "csv";
pub const GLOBAL_CSV_NAME: &str = "all_data.csv";

pub const GLOBAL_CSV_COLUMNS: &[&str] = &[
    "Algorithm",
    "Dataset",
    "Core",
    "Eps",
    "Batch",
    "timeAll",
    "timeP",
    "timeC",
    "timeW",
    "timeS",
    "timeUNV",
    "timeUR",
    "timeU",
    "numIter",
    "numOrgVerts",
    "numSimpVerts",
];

static EPS_IN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^eps([-+]?{NUMBER_PATTERN})")).expect("valid eps pattern")
});

#[derive(Debug, Clone)]
pub struct AggregateSettings {
    pub work_dir: PathBuf,
    pub csv_dir: PathBuf,
}

impl AggregateSettings {
    /// Output goes to `<work_dir>/csv`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            csv_dir: work_dir.join(CSV_SUBDIR),
            work_dir,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.csv_dir.join(GLOBAL_CSV_NAME)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("work directory does not exist: {0}")]
    MissingWorkDir(PathBuf),
    #[error("cannot create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Why one accumulation row was left out of the global CSV.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("line {line}: expected {expected} fields, found {found}")]
    ShortRow {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("{0}")]
    Csv(#[from] csv::Error),
}

/// One line of the global CSV, in [`GLOBAL_CSV_COLUMNS`] order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalRow<'a> {
    pub algorithm: &'a str,
    pub dataset: &'a str,
    pub core: &'a str,
    pub eps: &'a str,
    pub batch: &'a str,
    pub time_all: &'a str,
    pub time_p: &'a str,
    pub time_c: &'a str,
    pub time_w: &'a str,
    pub time_s: &'a str,
    pub time_unv: &'a str,
    pub time_ur: &'a str,
    pub time_u: &'a str,
    pub num_iter: &'a str,
    pub num_org_verts: &'a str,
    pub num_simp_verts: &'a str,
}

impl<'a> GlobalRow<'a> {
    /// Builds a row from accumulation fields; `fields` must have at least
    /// [`ACCUMULATION_COLUMNS`]`.len()` entries.
    fn new(algorithm: &'a str, dataset: &'a str, eps: &'a str, fields: &[&'a str]) -> Self {
        Self {
            algorithm,
            dataset,
            core: fields[0],
            eps,
            batch: fields[9],
            time_all: fields[1],
            time_p: fields[2],
            time_c: fields[3],
            time_w: fields[4],
            time_s: fields[5],
            time_unv: fields[6],
            time_ur: fields[7],
            time_u: fields[8],
            num_iter: fields[10],
            num_org_verts: fields[11],
            num_simp_verts: fields[12].trim_end(),
        }
    }
}

#[derive(Debug, Default)]
pub struct AggregateReport {
    /// One entry per accumulation file.
    pub files: RunSummary,
    /// Rows written, plus every row that had to be left out.
    pub rows: RunSummary,
}

/// Rebuilds the global CSV from scratch out of every accumulation file
/// below `settings.work_dir`.
pub fn aggregate(settings: &AggregateSettings) -> Result<AggregateReport, AggregateError> {
    if !settings.work_dir.is_dir() {
        return Err(AggregateError::MissingWorkDir(settings.work_dir.clone()));
    }
    fs::create_dir_all(&settings.csv_dir).map_err(|source| AggregateError::Create {
        path: settings.csv_dir.clone(),
        source,
    })?;

    let output = settings.output_path();
    let write_err = |source| AggregateError::Write {
        path: output.clone(),
        source,
    };
    let file = File::create(&output).map_err(|source| AggregateError::Create {
        path: output.clone(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(GLOBAL_CSV_COLUMNS).map_err(write_err)?;

    let mut report = AggregateReport::default();
    for path in accumulation_files(&settings.work_dir, &mut report.files) {
        let outcome = match flatten_file(&path, &mut writer, &mut report.rows) {
            Ok(0) => {
                tracing::debug!(path = %path.display(), "no rows");
                continue;
            }
            Ok(_) => Outcome::Done,
            Err(e) => Outcome::Failed(e),
        };
        report.files.record(&path, outcome);
    }
    writer
        .flush()
        .map_err(|e| write_err(csv::Error::from(e)))?;

    tracing::info!("Saved {}", output.display());
    Ok(report)
}

/// Writes every well-formed row of one accumulation file and returns how
/// many were written. Rows that cannot be used are recorded in `rows`.
fn flatten_file(
    path: &Path,
    writer: &mut csv::Writer<File>,
    rows: &mut RunSummary,
) -> Result<usize, String> {
    let (dataset, algorithm) =
        dataset_and_algorithm(path).ok_or_else(|| "not inside <dataset>/<algorithm>".to_string())?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let eps = EPS_IN_NAME
        .captures(&stem)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| format!("no eps value in file name `{stem}`"))?;
    tracing::debug!(%dataset, %algorithm, %eps, "flattening {}", path.display());

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| e.to_string())?;

    let mut written = 0;
    for result in reader.records() {
        let row = result.map_err(RowError::from).and_then(|record| {
            let fields = record.iter().collect::<Vec<_>>();
            if fields.len() < ACCUMULATION_COLUMNS.len() {
                return Err(RowError::ShortRow {
                    line: record.position().map_or(0, |p| p.line()),
                    expected: ACCUMULATION_COLUMNS.len(),
                    found: fields.len(),
                });
            }
            writer
                .serialize(GlobalRow::new(&algorithm, &dataset, &eps, &fields))
                .map_err(RowError::from)
        });
        match row {
            Ok(()) => {
                written += 1;
                rows.record(path, Outcome::Done);
            }
            Err(e) => rows.record(path, Outcome::Failed(e.to_string())),
        }
    }
    Ok(written)
}

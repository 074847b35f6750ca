use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use crate::{
    error::AccumulationError,
    metrics::{cell, Metric, MetricRecord},
    run_id::RunId,
};

pub const ACCUMULATION_COLUMNS: &[&str] = &[
    "threadNum",
    "timeAll",
    "timeP",
    "timeC",
    "timeW",
    "timeS",
    "timeUNV",
    "timeUR",
    "timeU",
    "batch",
    "numIter",
    "numOrgVerts",
    "numSimpVerts",
];

pub const ACCUMULATION_EXTENSION: &str = "dat";

/// Per-(dataset, algorithm, eps) table of measurements across thread counts,
/// stored at `<root>/<dataset>/<algorithm>/eps<eps>.dat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulationFile {
    path: PathBuf,
}

impl AccumulationFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file that collects rows for `run_id` under `root`.
    pub fn for_run(root: &Path, run_id: &RunId) -> Self {
        Self::new(
            root.join(&run_id.dataset)
                .join(&run_id.algorithm)
                .join(format!("eps{}.{ACCUMULATION_EXTENSION}", run_id.eps)),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row, creating parent directories and the header first if
    /// the file does not exist yet.
    pub fn append(&self, run_id: &RunId, record: &MetricRecord) -> Result<(), AccumulationError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(AccumulationError::io(parent))?;
        }
        let is_new = !self.path.is_file();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(AccumulationError::io(&self.path))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer
                .write_record(ACCUMULATION_COLUMNS)
                .map_err(AccumulationError::csv(&self.path))?;
        }
        writer
            .write_record(as_csv_record(run_id, record))
            .map_err(AccumulationError::csv(&self.path))?;
        writer.flush().map_err(AccumulationError::io(&self.path))?;
        Ok(())
    }

    /// Rewrites the file with its body ordered by thread count, keeping the
    /// header first and equal thread counts in their existing order.
    ///
    /// Returns `false` if the file was left untouched because it was empty or
    /// already in order.
    pub fn sort(&self) -> Result<bool, AccumulationError> {
        let content = fs::read_to_string(&self.path).map_err(AccumulationError::io(&self.path))?;
        let mut lines = content.lines();
        let Some(header) = lines.next() else {
            return Ok(false);
        };

        let mut body = Vec::new();
        for (idx, line) in lines.enumerate() {
            let value = line.split(',').next().unwrap_or_default().trim();
            let threads = value
                .parse::<i64>()
                .map_err(|_| AccumulationError::BadThreadCount {
                    path: self.path.clone(),
                    line: idx + 2,
                    value: value.to_string(),
                })?;
            body.push((threads, line));
        }
        if body.windows(2).all(|w| w[0].0 <= w[1].0) {
            return Ok(false);
        }
        body.sort_by_key(|(threads, _)| *threads);

        let mut sorted = String::with_capacity(content.len() + 1);
        for line in std::iter::once(header).chain(body.into_iter().map(|(_, line)| line)) {
            sorted.push_str(line);
            sorted.push('\n');
        }

        // Replace through a sibling file so a crash never leaves half a table.
        let tmp = self.path.with_extension(format!("{ACCUMULATION_EXTENSION}.tmp"));
        fs::write(&tmp, sorted).map_err(AccumulationError::io(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(AccumulationError::io(&self.path))?;
        Ok(true)
    }
}

/// One accumulation row in [`ACCUMULATION_COLUMNS`] order.
pub fn as_csv_record(run_id: &RunId, record: &MetricRecord) -> Vec<String> {
    vec![
        run_id.threads.to_string(),
        cell(record.get(Metric::TimeAll)),
        cell(record.get(Metric::TimePopulation)),
        cell(record.get(Metric::TimeClustering)),
        cell(record.get(Metric::TimeWhileLoop)),
        cell(record.get(Metric::TimeSingleRegion)),
        cell(record.get(Metric::TimeUpdateNewVertices)),
        cell(record.get(Metric::TimeUpdateRepresentatives)),
        cell(record.get(Metric::TimeUpdate)),
        cell(run_id.batch.as_ref()),
        cell(record.get(Metric::NumIterations)),
        cell(record.get(Metric::NumOriginalVertices)),
        cell(record.get(Metric::NumSimplifiedVertices)),
    ]
}

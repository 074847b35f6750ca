//! Identity of a single benchmark run and its filename encoding.
//!
//! A log file is named after the run that produced it:
//!
//! ```text
//! [batchSize<batch>]eps<eps>alg<algorithm>t<threads>data<dataset>[.<ext>]
//! ```
//!
//! The batch size is present only for batched algorithms, i.e. when the
//! algorithm name contains `batch`. [`RunId::parse`] and the [`Display`]
//! impl are the only places that know this layout.
//!
//! [`Display`]: std::fmt::Display

use std::{fmt, path::Path, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{error::RunIdError, metrics::Value};

const EPS: &str = "eps";
const ALG: &str = "alg";
const THREADS: &str = "t<threads>data";
const BATCH: &str = "batchSize";

static EPS_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"eps(.+?)alg").expect("valid pattern"));
static TAIL_FIELDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"alg(.+?)t(\d+)data(.*)$").expect("valid pattern"));
static BATCH_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"batchSize(.+?)eps").expect("valid pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId {
    pub eps: Value,
    pub dataset: String,
    pub algorithm: String,
    pub threads: u32,
    pub batch: Option<Value>,
}

impl RunId {
    /// Parses the stem of `path`; the extension is ignored.
    pub fn from_path(path: &Path) -> Result<Self, RunIdError> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        stem.parse()
    }

    pub fn parse(name: &str) -> Result<Self, RunIdError> {
        let missing = |marker| RunIdError::MissingMarker {
            marker,
            name: name.to_string(),
        };
        let not_numeric = |field| RunIdError::NotNumeric {
            field,
            name: name.to_string(),
        };

        if !name.contains(EPS) {
            return Err(missing(EPS));
        }
        let eps_caps = EPS_FIELD.captures(name).ok_or_else(|| missing(ALG))?;
        let eps = Value::find_in(&eps_caps[1]).ok_or_else(|| not_numeric("eps"))?;

        let alg_start = eps_caps.get(0).map_or(0, |m| m.end() - ALG.len());
        let tail = TAIL_FIELDS
            .captures(&name[alg_start..])
            .ok_or_else(|| missing(THREADS))?;
        let algorithm = tail[1].to_string();
        let threads = tail[2]
            .parse::<u32>()
            .map_err(|_| not_numeric("threads"))?;
        let dataset = tail[3].trim().to_string();
        if dataset.is_empty() {
            return Err(RunIdError::Empty {
                field: "dataset",
                name: name.to_string(),
            });
        }
        // both become directories of the accumulation tree
        for (field, value) in [("algorithm", &algorithm), ("dataset", &dataset)] {
            if !is_dir_name(value) {
                return Err(RunIdError::NotADirName {
                    field,
                    name: name.to_string(),
                });
            }
        }

        let batch = if algorithm.contains("batch") {
            let caps = BATCH_FIELD.captures(name).ok_or_else(|| missing(BATCH))?;
            Some(Value::find_in(&caps[1]).ok_or_else(|| not_numeric("batch"))?)
        } else {
            None
        };

        Ok(Self {
            eps,
            dataset,
            algorithm,
            threads,
            batch,
        })
    }
}

fn is_dir_name(value: &str) -> bool {
    value != "." && value != ".." && !value.contains(['/', '\\'])
}

impl FromStr for RunId {
    type Err = RunIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(batch) = &self.batch {
            write!(f, "{BATCH}{batch}")?;
        }
        write!(
            f,
            "{EPS}{}{ALG}{}t{}data{}",
            self.eps, self.algorithm, self.threads, self.dataset
        )
    }
}

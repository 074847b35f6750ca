use std::path::PathBuf;

/// Reasons a log filename does not follow the run identifier encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunIdError {
    #[error("marker `{marker}` not found in `{name}`")]
    MissingMarker { marker: &'static str, name: String },
    #[error("field `{field}` in `{name}` has no numeric value")]
    NotNumeric { field: &'static str, name: String },
    #[error("field `{field}` in `{name}` is empty")]
    Empty { field: &'static str, name: String },
    #[error("field `{field}` in `{name}` is not a plain directory name")]
    NotADirName { field: &'static str, name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum AccumulationError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}:{line}: thread count `{value}` is not an integer")]
    BadThreadCount {
        path: PathBuf,
        line: usize,
        value: String,
    },
}

impl AccumulationError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>) -> impl FnOnce(csv::Error) -> Self {
        let path = path.into();
        move |source| Self::Csv { path, source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: `{marker}` line carries no number")]
pub struct MetricLineError {
    pub line: usize,
    pub marker: &'static str,
}

use std::{
    fmt,
    path::{Path, PathBuf},
};

/// What happened to a single input of a batch job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// Input was well formed but held nothing to record.
    Skipped(String),
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done => f.write_str("done"),
            Outcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Per-item results of one run, reported once the run is over.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub done: usize,
    pub issues: Vec<(PathBuf, Outcome)>,
}

impl RunSummary {
    pub fn record(&mut self, path: &Path, outcome: Outcome) {
        match outcome {
            Outcome::Done => self.done += 1,
            outcome => {
                tracing::debug!(path = %path.display(), "{outcome}");
                self.issues.push((path.to_path_buf(), outcome));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.done + self.issues.len()
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.issues.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Emits the final tally plus one line per item that did not go through.
    pub fn report(&self, what: &str) {
        tracing::info!(
            total = self.total(),
            done = self.done,
            skipped = self.skipped(),
            failed = self.failed(),
            "{what} finished"
        );
        for (path, outcome) in &self.issues {
            tracing::warn!(path = %path.display(), "{outcome}");
        }
    }
}

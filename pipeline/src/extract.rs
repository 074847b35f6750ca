//! Turns a flat directory of benchmark logs into sorted per-configuration
//! accumulation files.

use std::{
    fs,
    path::{Path, PathBuf},
};

use benchlog::{
    AccumulationError, AccumulationFile, MetricLineError, MetricRecord, Outcome, RunId,
    RunIdError, RunSummary,
};

use crate::tree::accumulation_files;

#[derive(Debug, Clone)]
pub struct ExtractSettings {
    /// Directory holding the raw logs; accumulation files are created below it.
    pub work_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("work directory does not exist: {0}")]
    MissingWorkDir(PathBuf),
    #[error("cannot list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single log could not be recorded.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("malformed log name: {0}")]
    Name(#[from] RunIdError),
    #[error("cannot read log: {0}")]
    Read(#[from] std::io::Error),
    #[error("unparsable log body: {0}")]
    Body(#[from] MetricLineError),
    #[error(transparent)]
    Accumulation(#[from] AccumulationError),
}

#[derive(Debug, Default)]
pub struct ExtractReport {
    pub logs: RunSummary,
    pub sorted: RunSummary,
}

pub fn extract(settings: &ExtractSettings) -> Result<ExtractReport, ExtractError> {
    let work_dir = settings.work_dir.as_path();
    if !work_dir.is_dir() {
        return Err(ExtractError::MissingWorkDir(work_dir.to_path_buf()));
    }

    let logs = list_logs(work_dir)?;
    let mut report = ExtractReport::default();
    for (idx, path) in logs.iter().enumerate() {
        tracing::info!("Processing log {} of {}: {}", idx + 1, logs.len(), path.display());
        let outcome = match record_log(work_dir, path) {
            Ok(Some(file)) => {
                tracing::debug!(to = %file.path().display(), "row appended");
                Outcome::Done
            }
            Ok(None) => Outcome::Skipped("no population time".to_string()),
            Err(e) => Outcome::Failed(e.to_string()),
        };
        report.logs.record(path, outcome);
    }

    report.sorted = sort_all(work_dir);
    Ok(report)
}

/// Regular files directly inside `dir`, in name order.
fn list_logs(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let read_dir_err = |source| ExtractError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut logs = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        if entry.file_type().map_err(read_dir_err)?.is_file() {
            logs.push(entry.path());
        }
    }
    logs.sort();
    Ok(logs)
}

/// Appends the row for one log. `Ok(None)` means the log reported no
/// population time and holds no usable data.
fn record_log(work_dir: &Path, path: &Path) -> Result<Option<AccumulationFile>, LogError> {
    let run_id = RunId::from_path(path)?;
    let body = fs::read_to_string(path)?;
    let record = MetricRecord::scan(&body)?;
    if !record.has_population_time() {
        return Ok(None);
    }

    let file = AccumulationFile::for_run(work_dir, &run_id);
    file.append(&run_id, &record)?;
    Ok(Some(file))
}

/// Sorts every accumulation file under `work_dir` by thread count.
pub fn sort_all(work_dir: &Path) -> RunSummary {
    let mut summary = RunSummary::default();
    for path in accumulation_files(work_dir, &mut summary) {
        let outcome = match AccumulationFile::new(&path).sort() {
            Ok(_) => Outcome::Done,
            Err(e) => Outcome::Failed(e.to_string()),
        };
        summary.record(&path, outcome);
    }
    summary
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const ARMADILLO_LOG: &str = "\
Reading mesh Armadillo.ply
adj list took 12.3
Clustering took 4.5
average time 16.8
original vertices 10000
vertices after 9000
";

    fn run(work_dir: &Path) -> ExtractReport {
        extract(&ExtractSettings {
            work_dir: work_dir.to_path_buf(),
        })
        .unwrap()
    }

    #[test]
    fn test_extract_scenario() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("eps1.0algLRSCt4dataArmadillo.log"),
            ARMADILLO_LOG,
        )
        .unwrap();

        let report = run(dir.path());
        assert_eq!(report.logs.done, 1);
        assert_eq!(report.logs.total(), 1);
        assert_eq!(report.sorted.done, 1);

        let content =
            fs::read_to_string(dir.path().join("Armadillo/LRSC/eps1.0.dat")).unwrap();
        assert_eq!(
            content,
            "threadNum,timeAll,timeP,timeC,timeW,timeS,timeUNV,timeUR,timeU,batch,numIter,numOrgVerts,numSimpVerts\n\
             4,16.8,12.3,4.5,-1,-1,-1,-1,-1,-1,-1,10000,9000\n"
        );
    }

    #[test]
    fn test_rows_sorted_by_threads_across_runs() {
        let dir = TempDir::new().unwrap();
        for threads in [8, 1, 32] {
            fs::write(
                dir.path()
                    .join(format!("eps0.5algPWeldt{threads}dataBunny.log")),
                format!("adj list took {threads}.0\n"),
            )
            .unwrap();
        }
        run(dir.path());

        // a later run appends out of order; the sort pass restores the order
        fs::remove_file(dir.path().join("eps0.5algPWeldt8dataBunny.log")).unwrap();
        fs::write(
            dir.path().join("eps0.5algPWeldt2dataBunny.log"),
            "adj list took 2.0\n",
        )
        .unwrap();
        let report = run(dir.path());
        assert_eq!(report.logs.done, 3);

        let content = fs::read_to_string(dir.path().join("Bunny/PWeld/eps0.5.dat")).unwrap();
        let threads = content
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().unwrap().parse::<u32>().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(threads, vec![1, 1, 2, 8, 32, 32]);
    }

    #[test]
    fn test_logs_without_population_time_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("eps1.0algLRSCt4dataArmadillo.log"),
            "Clustering took 4.5\naverage time 16.8\n",
        )
        .unwrap();
        fs::write(dir.path().join("eps1.0algLRSCt2dataArmadillo.log"), "").unwrap();

        let report = run(dir.path());
        assert_eq!(report.logs.done, 0);
        assert_eq!(report.logs.skipped(), 2);
        assert!(!dir.path().join("Armadillo").exists());
    }

    #[test]
    fn test_bad_logs_are_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README.md"), "adj list took 1\n").unwrap();
        fs::write(
            dir.path().join("eps1.0algLRSCt4dataArmadillo.log"),
            "adj list took ???\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("eps1.0algLRSCt8dataArmadillo.log"),
            ARMADILLO_LOG,
        )
        .unwrap();

        let report = run(dir.path());
        assert_eq!(report.logs.done, 1);
        assert_eq!(report.logs.failed(), 2);
        let failed = report
            .logs
            .issues
            .iter()
            .map(|(path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(failed, vec!["README.md", "eps1.0algLRSCt4dataArmadillo.log"]);
    }

    #[test]
    fn test_names_cannot_escape_the_tree() {
        let dir = TempDir::new().unwrap();
        for name in ["eps1alg..t4dataArmadillo.log", "eps1algLRSCt4data...log"] {
            fs::write(dir.path().join(name), ARMADILLO_LOG).unwrap();
        }

        let report = run(dir.path());
        assert_eq!(report.logs.done, 0);
        assert_eq!(report.logs.failed(), 2);
        assert!(!dir.path().join("eps1.dat").exists());
        assert!(!dir.path().join("Armadillo").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_missing_work_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = extract(&ExtractSettings {
            work_dir: missing.clone(),
        })
        .unwrap_err();
        assert!(matches!(err, ExtractError::MissingWorkDir(path) if path == missing));
    }
}

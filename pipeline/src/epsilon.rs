//! Drives an external epsilon finder over a directory of `.ply` meshes.
//!
//! The finder is invoked as `<finder> <mesh> <reduction rate> <threads>` and
//! prints the epsilon it found as the last token on stdout.

use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    time::{Duration, Instant},
};

use benchlog::{Outcome, RunSummary};
use crossbeam::channel;

pub const DEFAULT_RATES: &[&str] = &["0.1", "1.0", "10.0", "50.0"];
pub const DEFAULT_THREADS: usize = 2;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct EpsilonSettings {
    pub input_dir: PathBuf,
    pub dest_file: PathBuf,
    pub finder: PathBuf,
    pub threads: usize,
    /// Percentages of vertices to remove, passed to the finder verbatim.
    pub rates: Vec<String>,
    /// Upper bound for a single finder invocation.
    pub timeout: Duration,
}

impl EpsilonSettings {
    pub fn new(input_dir: PathBuf, dest_file: PathBuf, finder: PathBuf) -> Self {
        Self {
            input_dir,
            dest_file,
            finder,
            threads: DEFAULT_THREADS,
            rates: DEFAULT_RATES.iter().map(|r| r.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("input directory does not exist: {0}")]
    MissingInputDir(PathBuf),
    #[error("epsilon finder not found: {0}")]
    MissingFinder(PathBuf),
    #[error("cannot list meshes: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("cannot write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Why a single finder invocation produced no epsilon.
#[derive(Debug, thiserror::Error)]
pub enum EpsilonError {
    #[error("cannot start finder: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("i/o error talking to finder: {0}")]
    Io(#[from] std::io::Error),
    #[error("finder did not finish within {}", humantime::format_duration(*.0))]
    Timeout(Duration),
    #[error("finder exited with {0}")]
    Exit(ExitStatus),
    #[error("finder printed nothing")]
    EmptyOutput,
    #[error("finder output ends with `{0}`, not a number")]
    NotNumeric(String),
}

pub fn discover(settings: &EpsilonSettings) -> Result<RunSummary, DriverError> {
    if !settings.input_dir.is_dir() {
        return Err(DriverError::MissingInputDir(settings.input_dir.clone()));
    }
    if !settings.finder.is_file() {
        return Err(DriverError::MissingFinder(settings.finder.clone()));
    }
    let mut summary = RunSummary::default();
    let meshes = list_meshes(&settings.input_dir, &mut summary)?;

    let output_err = |source| DriverError::Output {
        path: settings.dest_file.clone(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&settings.dest_file)
        .map_err(output_err)?;

    for (idx, mesh) in meshes.iter().enumerate() {
        let name = mesh
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(
            "Discovering epsilon values for mesh #{} of {}: {}",
            idx + 1,
            meshes.len(),
            name
        );

        let outcome = match epsilons_for(settings, mesh) {
            Ok(epsilons) => {
                writer
                    .write_record(std::iter::once(name).chain(epsilons))
                    .map_err(output_err)?;
                Outcome::Done
            }
            Err(reason) => Outcome::Failed(reason),
        };
        summary.record(mesh, outcome);
    }
    writer
        .flush()
        .map_err(|e| output_err(csv::Error::from(e)))?;

    Ok(summary)
}

/// `.ply` files directly inside `dir`, in name order. Entries that cannot be
/// read are recorded as failures.
fn list_meshes(
    dir: &Path,
    summary: &mut RunSummary,
) -> Result<Vec<PathBuf>, glob::PatternError> {
    let pattern = format!(
        "{}/*.ply",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let mut meshes = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => meshes.push(path),
            Ok(_) => {}
            Err(e) => summary.record(e.path(), Outcome::Failed(e.error().to_string())),
        }
    }
    Ok(meshes)
}

/// One epsilon per configured rate; the first failing rate abandons the mesh.
fn epsilons_for(settings: &EpsilonSettings, mesh: &Path) -> Result<Vec<String>, String> {
    settings
        .rates
        .iter()
        .map(|rate| {
            find_epsilon(&settings.finder, mesh, rate, settings.threads, settings.timeout)
                .map_err(|e| format!("rate {rate}: {e}"))
        })
        .collect()
}

pub fn find_epsilon(
    finder: &Path,
    mesh: &Path,
    rate: &str,
    threads: usize,
    timeout: Duration,
) -> Result<String, EpsilonError> {
    let mut child = Command::new(finder)
        .arg(mesh)
        .arg(rate)
        .arg(threads.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(EpsilonError::Spawn)?;

    // Drain stdout on the side so a chatty finder never blocks on a full pipe.
    let (tx, rx) = channel::bounded(1);
    if let Some(mut stdout) = child.stdout.take() {
        std::thread::spawn(move || {
            let mut buf = String::new();
            let read = stdout.read_to_string(&mut buf).map(|_| buf);
            let _ = tx.send(read);
        });
    }

    let deadline = Instant::now() + timeout;
    let status = wait_until(&mut child, deadline)?.ok_or(EpsilonError::Timeout(timeout))?;
    if !status.success() {
        return Err(EpsilonError::Exit(status));
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    let stdout = match rx.recv_timeout(remaining.max(POLL_INTERVAL)) {
        Ok(read) => read?,
        Err(channel::RecvTimeoutError::Timeout) => return Err(EpsilonError::Timeout(timeout)),
        Err(channel::RecvTimeoutError::Disconnected) => String::new(),
    };

    let token = stdout
        .split_whitespace()
        .last()
        .ok_or(EpsilonError::EmptyOutput)?;
    token
        .parse::<f64>()
        .map_err(|_| EpsilonError::NotNumeric(token.to_string()))?;
    Ok(token.to_string())
}

/// Polls `child` until it exits or `deadline` passes. A child still running
/// at the deadline is killed and `None` returned.
fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            tracing::warn!(pid = child.id(), "killed epsilon finder after timeout");
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt};

    use tempfile::TempDir;

    use super::*;

    fn stub(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    // Every test that executes a freshly written stub lives here so no other
    // thread forks while a stub is still open for writing.
    #[test]
    fn test_discover_with_stub_finders() {
        let bin = TempDir::new().unwrap();
        let fixed = stub(
            bin.path(),
            "fixed.sh",
            "echo \"Testing epsilon = 0.5\"\necho \"Epsilon: 0.0125\"",
        );
        let echo_args = stub(bin.path(), "args.sh", "echo \"$1 $2 $3\"");
        let failing = stub(bin.path(), "failing.sh", "echo 1.0\nexit 3");
        let garbage = stub(bin.path(), "garbage.sh", "echo done");
        let silent = stub(bin.path(), "silent.sh", "true");
        let slow = stub(bin.path(), "slow.sh", "exec sleep 5");

        let meshes = TempDir::new().unwrap();
        fs::write(meshes.path().join("bunny.ply"), "ply\n").unwrap();
        fs::write(meshes.path().join("bunny.stl"), "solid\n").unwrap();
        fs::create_dir(meshes.path().join("nested.ply")).unwrap();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("epsilons.csv");

        // fixed output: one row, every rate gets the same value
        let settings = EpsilonSettings::new(meshes.path().to_path_buf(), dest.clone(), fixed);
        let summary = discover(&settings).unwrap();
        assert_eq!(summary.done, 1);
        assert_eq!(summary.total(), 1);
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "bunny.ply,0.0125,0.0125,0.0125,0.0125\n"
        );

        // arguments are forwarded in order
        let mesh = meshes.path().join("bunny.ply");
        let forwarded = find_epsilon(&echo_args, &mesh, "10.0", 8, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(forwarded, "8");

        // failures drop the mesh instead of writing a partial row
        let settings = EpsilonSettings {
            finder: failing.clone(),
            ..settings
        };
        let summary = discover(&settings).unwrap();
        assert_eq!(summary.failed(), 1);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "");

        assert!(matches!(
            find_epsilon(&failing, &mesh, "1.0", 2, DEFAULT_TIMEOUT),
            Err(EpsilonError::Exit(_))
        ));
        assert!(matches!(
            find_epsilon(&garbage, &mesh, "1.0", 2, DEFAULT_TIMEOUT),
            Err(EpsilonError::NotNumeric(token)) if token == "done"
        ));
        assert!(matches!(
            find_epsilon(&silent, &mesh, "1.0", 2, DEFAULT_TIMEOUT),
            Err(EpsilonError::EmptyOutput)
        ));

        let started = Instant::now();
        assert!(matches!(
            find_epsilon(&slow, &mesh, "1.0", 2, Duration::from_millis(200)),
            Err(EpsilonError::Timeout(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_unreadable_input_dir_is_reported() {
        let dir = TempDir::new().unwrap();
        let meshes_dir = dir.path().join("meshes");
        fs::create_dir(&meshes_dir).unwrap();
        fs::write(meshes_dir.join("bunny.ply"), "ply\n").unwrap();
        fs::set_permissions(&meshes_dir, fs::Permissions::from_mode(0o000)).unwrap();
        let readable = fs::read_dir(&meshes_dir).is_ok();

        let mut summary = RunSummary::default();
        let meshes = list_meshes(&meshes_dir, &mut summary).unwrap();
        fs::set_permissions(&meshes_dir, fs::Permissions::from_mode(0o755)).unwrap();

        // permission bits do not bind a privileged user
        if readable {
            assert_eq!(meshes.len(), 1);
            return;
        }
        assert!(meshes.is_empty());
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.issues[0].0, meshes_dir);
    }

    #[test]
    fn test_missing_inputs_are_fatal() {
        let dir = TempDir::new().unwrap();
        let settings = EpsilonSettings::new(
            dir.path().join("meshes"),
            dir.path().join("out.csv"),
            dir.path().join("finder"),
        );
        assert!(matches!(
            discover(&settings),
            Err(DriverError::MissingInputDir(_))
        ));

        let settings = EpsilonSettings {
            input_dir: dir.path().to_path_buf(),
            ..settings
        };
        assert!(matches!(
            discover(&settings),
            Err(DriverError::MissingFinder(_))
        ));
        assert!(!dir.path().join("out.csv").exists());
    }
}

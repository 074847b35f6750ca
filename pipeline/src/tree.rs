use std::path::{Path, PathBuf};

use benchlog::{accumulation::ACCUMULATION_EXTENSION, Outcome, RunSummary};
use walkdir::WalkDir;

/// Accumulation files laid out as `<root>/<dataset>/<algorithm>/*.dat`,
/// in name order. Entries that cannot be read are recorded as failures.
pub fn accumulation_files(root: &Path, summary: &mut RunSummary) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(3)
        .max_depth(3)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_file()
                    && path.extension().is_some_and(|ext| ext == ACCUMULATION_EXTENSION)
                {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                summary.record(&path, Outcome::Failed(e.to_string()));
            }
        }
    }
    files
}

/// `(dataset, algorithm)` named by the two directories above an
/// accumulation file.
pub fn dataset_and_algorithm(path: &Path) -> Option<(String, String)> {
    let algorithm_dir = path.parent()?;
    let dataset_dir = algorithm_dir.parent()?;
    Some((
        dataset_dir.file_name()?.to_string_lossy().into_owned(),
        algorithm_dir.file_name()?.to_string_lossy().into_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_accumulation_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for rel in [
            "Bunny/LRSC/eps2.dat",
            "Armadillo/PWeld/eps1.dat",
            "Armadillo/LRSC/eps1.dat",
            "Armadillo/LRSC/notes.txt",
            "Armadillo/stray.dat",
            "eps9algXt1dataY.log",
            "csv/all_data.csv",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
        }

        let mut summary = RunSummary::default();
        let files = accumulation_files(root, &mut summary);
        let rel = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect::<Vec<_>>();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("Armadillo/LRSC/eps1.dat"),
                PathBuf::from("Armadillo/PWeld/eps1.dat"),
                PathBuf::from("Bunny/LRSC/eps2.dat"),
            ]
        );
        assert_eq!(summary.total(), 0);

        assert_eq!(
            dataset_and_algorithm(&files[1]),
            Some(("Armadillo".to_string(), "PWeld".to_string()))
        );
    }
}

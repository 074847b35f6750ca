use std::path::PathBuf;

use clap::Parser;
use pipeline::{
    extract::{extract, ExtractSettings},
    log,
};

/// Collects benchmark logs into per-(dataset, algorithm, eps) tables
#[derive(Parser)]
#[command(name = "extract")]
struct ExtractApp {
    /// Directory holding the raw log files
    work_dir: PathBuf,
    #[clap(long, default_value = "plain")]
    log_format: log::LogFormat,
    #[clap(long, default_value = "stdout")]
    log_to: log::LogOutput,
}

impl ExtractApp {
    fn run(self) -> anyhow::Result<()> {
        let report = extract(&ExtractSettings {
            work_dir: self.work_dir,
        })?;
        report.logs.report("log extraction");
        report.sorted.report("sorting");
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let app = ExtractApp::parse();
    let guard = log::config_tracing(app.log_format, &app.log_to)?;

    if let Err(e) = app.run() {
        tracing::error!("error: {}", e);
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}

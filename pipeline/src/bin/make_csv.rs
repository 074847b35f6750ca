use std::path::PathBuf;

use clap::Parser;
use pipeline::{
    aggregate::{aggregate, AggregateSettings},
    log,
};

/// Flattens every accumulation table under a work directory into csv/all_data.csv
#[derive(Parser)]
#[command(name = "make_csv")]
struct MakeCsvApp {
    /// Directory previously populated by `extract`
    work_dir: PathBuf,
    #[clap(long, default_value = "plain")]
    log_format: log::LogFormat,
    #[clap(long, default_value = "stdout")]
    log_to: log::LogOutput,
}

impl MakeCsvApp {
    fn run(self) -> anyhow::Result<()> {
        let report = aggregate(&AggregateSettings::new(self.work_dir))?;
        report.files.report("accumulation files");
        report.rows.report("rows");
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let app = MakeCsvApp::parse();
    let guard = log::config_tracing(app.log_format, &app.log_to)?;

    if let Err(e) = app.run() {
        tracing::error!("error: {}", e);
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}

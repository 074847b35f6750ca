use std::{path::PathBuf, time::Duration};

use clap::Parser;
use pipeline::{
    epsilon::{discover, EpsilonSettings, DEFAULT_THREADS},
    log,
};

/// Computes, for every .ply mesh in a directory, the epsilon values at which
/// vertex clustering removes the given percentages of vertices
#[derive(Parser)]
#[command(name = "find_eps")]
struct FindEpsApp {
    /// Directory containing the .ply meshes
    input_dir: PathBuf,
    /// CSV file that receives one row of epsilons per mesh
    dest_file: PathBuf,
    /// Executable that discovers a single epsilon value
    eps_finder: PathBuf,
    /// Threads handed to the finder
    #[clap(long, default_value_t = DEFAULT_THREADS)]
    threads: usize,
    /// Reduction rates in percent
    #[clap(long, value_delimiter = ',', default_value = "0.1,1.0,10.0,50.0")]
    rates: Vec<String>,
    /// Give up on a single finder run after this long, e.g. `90s` or `1h`
    #[clap(long, default_value = "30m", value_parser = humantime::parse_duration)]
    timeout: Duration,
    #[clap(long, default_value = "plain")]
    log_format: log::LogFormat,
    #[clap(long, default_value = "stdout")]
    log_to: log::LogOutput,
}

impl FindEpsApp {
    fn run(self) -> anyhow::Result<()> {
        let Self {
            input_dir,
            dest_file,
            eps_finder,
            threads,
            rates,
            timeout,
            log_format: _,
            log_to: _,
        } = self;
        for rate in &rates {
            rate.parse::<f64>()
                .map_err(|_| anyhow::anyhow!("reduction rate `{rate}` is not a number"))?;
        }

        let settings = EpsilonSettings {
            threads,
            rates,
            timeout,
            ..EpsilonSettings::new(input_dir, dest_file, eps_finder)
        };
        let summary = discover(&settings)?;
        summary.report("epsilon discovery");
        tracing::info!("Saved {}", settings.dest_file.display());
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let app = FindEpsApp::parse();
    let guard = log::config_tracing(app.log_format, &app.log_to)?;

    if let Err(e) = app.run() {
        tracing::error!("error: {}", e);
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}

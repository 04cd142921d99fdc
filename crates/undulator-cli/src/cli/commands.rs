use super::CliError;
use super::helpers::{output_root, resolve_config};
use std::path::PathBuf;
use tracing::info;
use undulator_core::modules::pipeline::PowerSource;
use undulator_core::modules::{AnalyticEngine, RunConfig, run_pipeline};

#[derive(clap::Args, Debug, Default)]
pub(super) struct RunArgs {
    /// JSON run configuration; omitted sections keep their defaults
    #[arg(long)]
    pub(super) config: Option<PathBuf>,

    /// Directory that receives the result folder (default: current directory)
    #[arg(long)]
    pub(super) output_dir: Option<PathBuf>,

    /// Radiation source for the power density calculation
    #[arg(long, value_enum)]
    pub(super) power_source: Option<PowerSourceArg>,

    /// Compute the electron trajectory and save it next to the intensity files
    #[arg(long)]
    pub(super) save_trajectory: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum PowerSourceArg {
    Field,
    Trajectory,
}

impl From<PowerSourceArg> for PowerSource {
    fn from(value: PowerSourceArg) -> Self {
        match value {
            PowerSourceArg::Field => Self::Field,
            PowerSourceArg::Trajectory => Self::Trajectory,
        }
    }
}

pub(super) fn run_batch_command(args: RunArgs) -> Result<i32, CliError> {
    let config = resolve_config(&args)?;
    let output_root = output_root(args.output_dir.as_deref())?;
    info!(
        output_root = %output_root.display(),
        power_source = ?config.power_source,
        "starting undulator radiation run"
    );

    let artifacts = run_pipeline(&AnalyticEngine::new(), &config, &output_root)
        .map_err(CliError::Compute)?;
    for artifact in &artifacts {
        println!(
            "{}: {} ({} lines)",
            artifact.kind,
            artifact.path.display(),
            artifact.data_lines
        );
    }
    Ok(0)
}

pub(super) fn print_config_command() -> Result<i32, CliError> {
    let json = RunConfig::default()
        .to_json_pretty()
        .map_err(CliError::Compute)?;
    println!("{json}");
    Ok(0)
}

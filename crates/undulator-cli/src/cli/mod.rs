mod commands;
mod helpers;

use clap::Parser;
use undulator_core::domain::UndulatorError;

pub fn run_from_env() -> i32 {
    helpers::init_logging();
    let args: Vec<String> = std::env::args().collect();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let run_error = error.as_undulator_error();
            eprintln!("{}", run_error.diagnostic_line());
            if let Some(summary_line) = run_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            run_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "undulator-rs",
    version,
    about = "Undulator spectral flux and power density batch runner"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Compute flux and power density and write the result files (default)
    Run(commands::RunArgs),
    /// Print the default run configuration as JSON
    Config,
}

fn dispatch_parsed(command: Option<CliCommand>) -> Result<i32, CliError> {
    match command {
        None => commands::run_batch_command(commands::RunArgs::default()),
        Some(CliCommand::Run(args)) => commands::run_batch_command(args),
        Some(CliCommand::Config) => commands::print_config_command(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(UndulatorError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_undulator_error(&self) -> UndulatorError {
        match self {
            Self::Usage(message) => {
                UndulatorError::input_validation("INPUT.CLI_USAGE", message.trim_end().to_owned())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => UndulatorError::internal("INTERNAL.CLI", format!("{error:#}")),
        }
    }
}

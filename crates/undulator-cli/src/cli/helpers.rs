use super::CliError;
use super::commands::RunArgs;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt};
use undulator_core::modules::RunConfig;

/// Logs to stderr; `RUST_LOG` overrides the default `info` filter.
pub(super) fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(error) = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
    {
        tracing::debug!(%error, "keeping the already installed tracing subscriber");
    }
}

/// Loads the configuration file when given and applies command-line overrides.
pub(super) fn resolve_config(args: &RunArgs) -> Result<RunConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path).map_err(CliError::Compute)?,
        None => RunConfig::default(),
    };
    if let Some(source) = args.power_source {
        config.power_source = source.into();
    }
    if args.save_trajectory {
        config.output.save_trajectory = true;
    }
    Ok(config)
}

pub(super) fn output_root(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(std::env::current_dir()
            .context("failed to resolve the current working directory")?),
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_config;
    use crate::cli::commands::{PowerSourceArg, RunArgs};
    use std::fs;
    use tempfile::TempDir;
    use undulator_core::modules::pipeline::PowerSource;

    #[test]
    fn command_line_overrides_win_over_config_file() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("run.json");
        fs::write(&path, r#"{"powerSource": "field", "output": {"folder": "custom"}}"#)
            .expect("config should be written");

        let config = resolve_config(&RunArgs {
            config: Some(path),
            power_source: Some(PowerSourceArg::Trajectory),
            save_trajectory: true,
            ..RunArgs::default()
        })
        .expect("config should resolve");
        assert_eq!(config.power_source, PowerSource::Trajectory);
        assert!(config.output.save_trajectory);
        assert_eq!(config.output.folder, std::path::Path::new("custom"));
    }

    #[test]
    fn repeated_logging_setup_keeps_the_first_subscriber() {
        super::init_logging();
        super::init_logging();
        tracing::info!("logging still reachable after a second setup");
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let error = resolve_config(&RunArgs {
            config: Some("/no/such/run.json".into()),
            ..RunArgs::default()
        })
        .expect_err("missing file should fail");
        assert_eq!(error.as_undulator_error().exit_code(), 3);
    }
}

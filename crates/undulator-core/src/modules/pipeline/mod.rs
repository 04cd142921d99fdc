//! Batch run: build every input, compute flux and power density, write the
//! flat result files.

pub mod config;

pub use config::{MeshConfig, OutputConfig, PowerSource, RunConfig};

use crate::domain::{CalculationKind, ComputeArtifact, UndulatorError, UndulatorResult};
use crate::modules::grid::StokesGrid;
use crate::modules::serialization::{
    prepare_output_path, write_intensity_file, write_trajectory_file,
};
use crate::modules::source::{FieldContainer, SourceModels};
use crate::modules::trajectory::ParticleTrajectory;
use crate::modules::traits::{ComputeEngine, RadiationSource};
use std::path::{Path, PathBuf};
use tracing::info;

/// Every input of a run, validated and allocated before any computation starts.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRun {
    pub models: SourceModels,
    pub flux_grid: StokesGrid,
    pub power_grid: StokesGrid,
    pub trajectory: Option<ParticleTrajectory>,
    pub output_dir: PathBuf,
}

impl PreparedRun {
    pub fn prepare(config: &RunConfig, output_root: &Path) -> UndulatorResult<Self> {
        let models = SourceModels::build(&config.undulator, &config.beam)?;
        let flux_grid = config.flux_mesh.allocate()?;
        let power_shape = config.power_mesh.shape()?;
        if power_shape.ne != 1 {
            return Err(UndulatorError::input_validation(
                "CONFIG.GRID_SHAPE",
                format!(
                    "power density mesh must have exactly one photon energy, got ne = {}",
                    power_shape.ne
                ),
            ));
        }
        let power_grid = StokesGrid::allocate_shape(power_shape, config.power_mesh.bounds)?;
        let trajectory = config
            .needs_trajectory()
            .then(|| ParticleTrajectory::with_window(models.beam.first, config.trajectory));
        Ok(Self {
            models,
            flux_grid,
            power_grid,
            trajectory,
            output_dir: output_root.join(&config.output.folder),
        })
    }
}

/// Runs the full calculation with `engine` and writes the result files below
/// `output_root`. Returns the files written, flux first.
pub fn run_pipeline<E>(
    engine: &E,
    config: &RunConfig,
    output_root: &Path,
) -> UndulatorResult<Vec<ComputeArtifact>>
where
    E: ComputeEngine + ?Sized,
{
    info!("building source models and result grids");
    let PreparedRun {
        models,
        mut flux_grid,
        mut power_grid,
        mut trajectory,
        output_dir,
    } = PreparedRun::prepare(config, output_root)?;

    info!("performing electron trajectory and radiation calculations");
    engine.compute_flux(
        &mut flux_grid,
        &models.beam,
        &models.undulator,
        &config.flux_precision,
    )?;

    if let Some(trajectory) = trajectory.as_mut() {
        engine.compute_trajectory(trajectory, &models.fields, &config.trajectory_precision)?;
    }

    let source = radiation_source(config.power_source, trajectory.as_ref(), &models.fields)?;
    engine.compute_power_density(
        &mut power_grid,
        &models.beam,
        source,
        &config.power_precision,
    )?;

    info!(output_dir = %output_dir.display(), "saving result files");
    let mut artifacts = Vec::with_capacity(3);
    let flux_path = prepare_output_path(&output_dir, &config.output.flux_file)?;
    let lines = write_intensity_file(&flux_grid, &flux_path)?;
    artifacts.push(ComputeArtifact::new(
        CalculationKind::SpectralFlux,
        flux_path,
        lines,
    ));

    let power_path = prepare_output_path(&output_dir, &config.output.power_file)?;
    let lines = write_intensity_file(&power_grid, &power_path)?;
    artifacts.push(ComputeArtifact::new(
        CalculationKind::PowerDensity,
        power_path,
        lines,
    ));

    if let (true, Some(trajectory)) = (config.output.save_trajectory, trajectory.as_ref()) {
        let trajectory_path = prepare_output_path(&output_dir, &config.output.trajectory_file)?;
        let rows = write_trajectory_file(trajectory, &trajectory_path)?;
        artifacts.push(ComputeArtifact::new(
            CalculationKind::Trajectory,
            trajectory_path,
            rows,
        ));
    }
    Ok(artifacts)
}

fn radiation_source<'a>(
    power_source: PowerSource,
    trajectory: Option<&'a ParticleTrajectory>,
    fields: &'a FieldContainer,
) -> UndulatorResult<RadiationSource<'a>> {
    match (power_source, trajectory) {
        (PowerSource::Field, _) => Ok(RadiationSource::Field(fields)),
        (PowerSource::Trajectory, Some(trajectory)) => Ok(RadiationSource::Trajectory(trajectory)),
        (PowerSource::Trajectory, None) => Err(UndulatorError::internal(
            "INTERNAL.PIPELINE",
            "trajectory-sourced power density was requested but no trajectory was prepared",
        )),
    }
}

use crate::domain::{ConfigResult, UndulatorError, UndulatorResult};
use crate::modules::grid::{GridShape, MeshBounds, StokesGrid};
use crate::modules::precision::{FluxPrecision, PowerDensityPrecision, TrajectoryPrecision};
use crate::modules::source::{ParticleBeam, Undulator, reference_beam, reference_undulator};
use crate::modules::trajectory::TrajectoryWindow;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_FOLDER: &str = "data_example_06";
pub const DEFAULT_FLUX_FILE: &str = "ex06_res_flux.dat";
pub const DEFAULT_POWER_FILE: &str = "ex06_res_pow.dat";
pub const DEFAULT_TRAJECTORY_FILE: &str = "ex06_res_trj.dat";

/// Observation mesh as configured. Point counts stay signed so negative
/// values are reported as configuration errors instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshConfig {
    pub ne: i64,
    pub nx: i64,
    pub ny: i64,
    pub bounds: MeshBounds,
}

impl MeshConfig {
    pub fn flux_default() -> Self {
        Self {
            ne: 10_000,
            nx: 1,
            ny: 1,
            bounds: MeshBounds {
                z_start: 30.0,
                e_start: 10.0,
                e_fin: 20_000.0,
                x_start: -0.0015,
                x_fin: 0.0015,
                y_start: -0.00075,
                y_fin: 0.00075,
            },
        }
    }

    pub fn power_default() -> Self {
        Self {
            ne: 1,
            nx: 101,
            ny: 101,
            bounds: MeshBounds {
                z_start: 30.0,
                e_start: 0.0,
                e_fin: 0.0,
                x_start: -0.02,
                x_fin: 0.02,
                y_start: -0.015,
                y_fin: 0.015,
            },
        }
    }

    pub fn shape(&self) -> ConfigResult<GridShape> {
        GridShape::from_signed(self.ne, self.nx, self.ny)
    }

    pub fn allocate(&self) -> ConfigResult<StokesGrid> {
        StokesGrid::allocate_shape(self.shape()?, self.bounds)
    }
}

/// Where the power density is radiated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerSource {
    #[default]
    Field,
    Trajectory,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputConfig {
    pub folder: PathBuf,
    pub flux_file: String,
    pub power_file: String,
    pub trajectory_file: String,
    pub save_trajectory: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
            flux_file: DEFAULT_FLUX_FILE.to_owned(),
            power_file: DEFAULT_POWER_FILE.to_owned(),
            trajectory_file: DEFAULT_TRAJECTORY_FILE.to_owned(),
            save_trajectory: false,
        }
    }
}

/// Complete description of one batch run. Every section may be omitted from
/// a JSON configuration and then takes the value of [`RunConfig::default`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    pub undulator: Undulator,
    pub beam: ParticleBeam,
    pub flux_precision: FluxPrecision,
    pub power_precision: PowerDensityPrecision,
    pub trajectory_precision: TrajectoryPrecision,
    pub flux_mesh: MeshConfig,
    pub power_mesh: MeshConfig,
    pub trajectory: TrajectoryWindow,
    pub power_source: PowerSource,
    pub output: OutputConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            undulator: reference_undulator(),
            beam: reference_beam(),
            flux_precision: FluxPrecision::default(),
            power_precision: PowerDensityPrecision::default(),
            trajectory_precision: TrajectoryPrecision::default(),
            flux_mesh: MeshConfig::flux_default(),
            power_mesh: MeshConfig::power_default(),
            trajectory: TrajectoryWindow::default(),
            power_source: PowerSource::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|error| {
            UndulatorError::input_validation(
                "CONFIG.PARSE",
                format!("invalid run configuration: {error}"),
            )
        })
    }

    pub fn load(path: &Path) -> UndulatorResult<Self> {
        let content = fs::read_to_string(path).map_err(|error| {
            UndulatorError::io_system(
                "IO.READ_CONFIG",
                format!("failed to read '{}': {error}", path.display()),
            )
        })?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|error| {
            UndulatorError::internal(
                "CONFIG.SERIALIZE",
                format!("failed to serialize run configuration: {error}"),
            )
        })
    }

    /// Whether the run needs an explicit trajectory calculation.
    pub fn needs_trajectory(&self) -> bool {
        self.power_source == PowerSource::Trajectory || self.output.save_trajectory
    }
}

use crate::domain::{ComputeResult, ConfigResult, UndulatorError};
use crate::modules::grid::StokesGrid;
use crate::modules::precision::{FluxPrecision, PowerDensityPrecision, TrajectoryPrecision};
use crate::modules::source::{FieldContainer, ParticleBeam, Undulator};
use crate::modules::trajectory::ParticleTrajectory;

/// Where power density is radiated from: a precomputed trajectory or the
/// magnetic field the engine integrates a trajectory through itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RadiationSource<'a> {
    Trajectory(&'a ParticleTrajectory),
    Field(&'a FieldContainer),
}

impl<'a> RadiationSource<'a> {
    /// Builds the source from optional inputs; exactly one must be present.
    pub fn from_parts(
        trajectory: Option<&'a ParticleTrajectory>,
        fields: Option<&'a FieldContainer>,
    ) -> ConfigResult<Self> {
        match (trajectory, fields) {
            (Some(trajectory), None) => Ok(Self::Trajectory(trajectory)),
            (None, Some(fields)) => Ok(Self::Field(fields)),
            (Some(_), Some(_)) => Err(UndulatorError::input_validation(
                "CONFIG.RADIATION_SOURCE",
                "power density accepts a trajectory or a field container, not both",
            )),
            (None, None) => Err(UndulatorError::input_validation(
                "CONFIG.RADIATION_SOURCE",
                "power density needs either a trajectory or a field container",
            )),
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Trajectory(_) => "trajectory",
            Self::Field(_) => "field",
        }
    }
}

/// Synchrotron-radiation engine. Each call overwrites its output container in place.
pub trait ComputeEngine {
    fn compute_flux(
        &self,
        grid: &mut StokesGrid,
        beam: &ParticleBeam,
        undulator: &Undulator,
        precision: &FluxPrecision,
    ) -> ComputeResult<()>;

    /// The photon-energy dimension of `grid` must be 1.
    fn compute_power_density(
        &self,
        grid: &mut StokesGrid,
        beam: &ParticleBeam,
        source: RadiationSource<'_>,
        precision: &PowerDensityPrecision,
    ) -> ComputeResult<()>;

    fn compute_trajectory(
        &self,
        trajectory: &mut ParticleTrajectory,
        fields: &FieldContainer,
        precision: &TrajectoryPrecision,
    ) -> ComputeResult<()>;
}

impl<T> ComputeEngine for &T
where
    T: ComputeEngine + ?Sized,
{
    fn compute_flux(
        &self,
        grid: &mut StokesGrid,
        beam: &ParticleBeam,
        undulator: &Undulator,
        precision: &FluxPrecision,
    ) -> ComputeResult<()> {
        (**self).compute_flux(grid, beam, undulator, precision)
    }

    fn compute_power_density(
        &self,
        grid: &mut StokesGrid,
        beam: &ParticleBeam,
        source: RadiationSource<'_>,
        precision: &PowerDensityPrecision,
    ) -> ComputeResult<()> {
        (**self).compute_power_density(grid, beam, source, precision)
    }

    fn compute_trajectory(
        &self,
        trajectory: &mut ParticleTrajectory,
        fields: &FieldContainer,
        precision: &TrajectoryPrecision,
    ) -> ComputeResult<()> {
        (**self).compute_trajectory(trajectory, fields, precision)
    }
}

//! Closed-form undulator engine: Runge-Kutta trajectories, bending-magnet
//! power deposition along the trajectory and harmonic-sum spectral flux.

mod flux;
mod power;
mod trajectory;

use crate::domain::{ComputeResult, UndulatorError};
use crate::modules::grid::StokesGrid;
use crate::modules::precision::{FluxPrecision, PowerDensityPrecision, TrajectoryPrecision};
use crate::modules::source::{FieldContainer, ParticleBeam, Undulator};
use crate::modules::trajectory::{ParticleTrajectory, TrajectoryWindow};
use crate::modules::traits::{ComputeEngine, RadiationSource};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticEngine;

impl AnalyticEngine {
    pub fn new() -> Self {
        Self
    }

    /// Trajectory through `fields` over the precision window, or over the
    /// extent of the field container when no window is set.
    fn trajectory_for_power(
        &self,
        beam: &ParticleBeam,
        fields: &FieldContainer,
        precision: &PowerDensityPrecision,
    ) -> ComputeResult<ParticleTrajectory> {
        let points = usize::try_from(precision.trajectory_points).unwrap_or(usize::MAX);
        if points < 2 {
            return Err(UndulatorError::computation(
                "RUN.POWER_DENSITY",
                format!(
                    "power density needs at least 2 trajectory points, got {}",
                    precision.trajectory_points
                ),
            ));
        }
        let (z_start, z_end) = precision
            .longitudinal_window()
            .or_else(|| fields.longitudinal_extent())
            .ok_or_else(|| {
                UndulatorError::computation(
                    "RUN.POWER_DENSITY",
                    "field container is empty and no longitudinal window is set",
                )
            })?;
        let window = TrajectoryWindow {
            points,
            ct_start: z_start - beam.first.z,
            ct_end: z_end - beam.first.z,
        };
        debug!(
            points,
            ct_start = window.ct_start,
            ct_end = window.ct_end,
            "trajectory for power density"
        );
        let mut trajectory = ParticleTrajectory::with_window(beam.first, window);
        trajectory::integrate_trajectory(&mut trajectory, fields)?;
        Ok(trajectory)
    }
}

impl ComputeEngine for AnalyticEngine {
    fn compute_flux(
        &self,
        grid: &mut StokesGrid,
        beam: &ParticleBeam,
        undulator: &Undulator,
        precision: &FluxPrecision,
    ) -> ComputeResult<()> {
        info!(
            ne = grid.energy_points(),
            nx = grid.x_points(),
            ny = grid.y_points(),
            initial_harmonic = precision.initial_harmonic,
            final_harmonic = precision.final_harmonic,
            "computing spectral flux"
        );
        flux::spectral_flux(grid, beam, undulator, precision)
    }

    fn compute_power_density(
        &self,
        grid: &mut StokesGrid,
        beam: &ParticleBeam,
        source: RadiationSource<'_>,
        precision: &PowerDensityPrecision,
    ) -> ComputeResult<()> {
        info!(
            nx = grid.x_points(),
            ny = grid.y_points(),
            source = source.label(),
            "computing power density"
        );
        if grid.energy_points() != 1 {
            return Err(UndulatorError::computation(
                "RUN.POWER_DENSITY",
                format!(
                    "power density mesh must have exactly one photon energy, got ne = {}",
                    grid.energy_points()
                ),
            ));
        }
        power::validate_power_precision(precision)?;
        match source {
            RadiationSource::Trajectory(trajectory) => {
                let center = match (trajectory.z.first(), trajectory.z.last()) {
                    (Some(first), Some(last)) => 0.5 * (first + last),
                    _ => 0.0,
                };
                power::power_density_from_trajectory(grid, beam, trajectory, center, precision)
            }
            RadiationSource::Field(fields) => {
                let trajectory = self.trajectory_for_power(beam, fields, precision)?;
                power::power_density_from_trajectory(
                    grid,
                    beam,
                    &trajectory,
                    fields.center(),
                    precision,
                )
            }
        }
    }

    fn compute_trajectory(
        &self,
        trajectory: &mut ParticleTrajectory,
        fields: &FieldContainer,
        precision: &TrajectoryPrecision,
    ) -> ComputeResult<()> {
        info!(
            points = trajectory.np(),
            method = precision.method.code(),
            "computing trajectory"
        );
        trajectory::integrate_trajectory(trajectory, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::AnalyticEngine;
    use crate::modules::grid::{GridShape, MeshBounds, StokesComponent, StokesGrid};
    use crate::modules::precision::{PowerDensityPrecision, TrajectoryPrecision};
    use crate::modules::source::{FieldContainer, reference_beam, reference_undulator};
    use crate::modules::trajectory::{ParticleTrajectory, TrajectoryWindow};
    use crate::modules::traits::{ComputeEngine, RadiationSource};

    fn power_grid() -> StokesGrid {
        StokesGrid::allocate_shape(
            GridShape { ne: 1, nx: 9, ny: 7 },
            MeshBounds {
                z_start: 30.0,
                x_start: -0.004,
                x_fin: 0.004,
                y_start: -0.003,
                y_fin: 0.003,
                ..MeshBounds::default()
            },
        )
        .expect("grid")
    }

    #[test]
    fn field_and_trajectory_sources_agree() {
        let engine = AnalyticEngine::new();
        let beam = reference_beam();
        let fields = FieldContainer::single(reference_undulator()).expect("container");
        let precision = PowerDensityPrecision {
            trajectory_points: 8_001,
            ..PowerDensityPrecision::default()
        };

        let mut from_field = power_grid();
        engine
            .compute_power_density(&mut from_field, &beam, RadiationSource::Field(&fields), &precision)
            .expect("field source");

        let mut trajectory = ParticleTrajectory::with_window(
            beam.first,
            TrajectoryWindow {
                points: 8_001,
                ct_start: -1.5,
                ct_end: 1.5,
            },
        );
        engine
            .compute_trajectory(&mut trajectory, &fields, &TrajectoryPrecision::default())
            .expect("trajectory");
        let mut from_trajectory = power_grid();
        engine
            .compute_power_density(
                &mut from_trajectory,
                &beam,
                RadiationSource::Trajectory(&trajectory),
                &precision,
            )
            .expect("trajectory source");

        let a = from_field.value(StokesComponent::S0, 0, 4, 3);
        let b = from_trajectory.value(StokesComponent::S0, 0, 4, 3);
        assert!(a > 0.0);
        assert!((a - b).abs() / a < 0.02, "{a} vs {b}");
    }

    #[test]
    fn spectral_power_mesh_is_rejected_before_any_work() {
        let engine = AnalyticEngine::new();
        let fields = FieldContainer::single(reference_undulator()).expect("container");
        let mut grid = StokesGrid::allocate(3, 2, 2).expect("grid");
        let error = engine
            .compute_power_density(
                &mut grid,
                &reference_beam(),
                RadiationSource::Field(&fields),
                &PowerDensityPrecision::default(),
            )
            .expect_err("ne = 3 should fail");
        assert_eq!(error.placeholder(), "RUN.POWER_DENSITY");
    }

    #[test]
    fn too_few_trajectory_points_is_a_computation_error() {
        let engine = AnalyticEngine::new();
        let fields = FieldContainer::single(reference_undulator()).expect("container");
        let mut grid = power_grid();
        let error = engine
            .compute_power_density(
                &mut grid,
                &reference_beam(),
                RadiationSource::Field(&fields),
                &PowerDensityPrecision {
                    trajectory_points: 1,
                    ..PowerDensityPrecision::default()
                },
            )
            .expect_err("one point should fail");
        assert_eq!(error.exit_code(), 4);
    }
}

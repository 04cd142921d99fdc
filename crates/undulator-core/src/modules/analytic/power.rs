use crate::common::constants::{ELEMENTARY_CHARGE, MM_PER_M, VACUUM_PERMITTIVITY};
use crate::domain::{ComputeResult, UndulatorError};
use crate::modules::grid::{StokesComponent, StokesGrid};
use crate::modules::precision::{PowerDensityMethod, PowerDensityPrecision};
use crate::modules::source::ParticleBeam;
use crate::modules::trajectory::ParticleTrajectory;
use crate::numerics::special::{GaussianAxis, GaussianSmoothingInput, gaussian_smooth_2d};
use std::f64::consts::PI;

/// Angular cutoff of the opening-angle profile in units of `1/gamma`, per unit precision.
const OPENING_ANGLE_CUTOFF: f64 = 5.0;
const W_PER_MM2_PER_W_PER_M2: f64 = 1.0 / (MM_PER_M * MM_PER_M);

/// One screen axis with uniformly spaced sample points.
#[derive(Debug, Clone, Copy)]
struct ScreenAxis {
    start: f64,
    step: f64,
    points: usize,
}

impl ScreenAxis {
    fn new(start: f64, fin: f64, points: usize) -> Self {
        let step = if points > 1 {
            (fin - start) / (points - 1) as f64
        } else {
            0.0
        };
        Self {
            start,
            step,
            points,
        }
    }

    fn is_point(&self) -> bool {
        self.points < 2 || self.step == 0.0
    }

    fn coordinate(&self, index: usize) -> f64 {
        self.start + index as f64 * self.step
    }

    /// Closed range of cell indices whose coordinate lies in `[lower, upper]`.
    fn indices_between(&self, lower: f64, upper: f64) -> Option<(usize, usize)> {
        if self.points == 0 {
            return None;
        }
        if self.is_point() {
            let at = self.coordinate(0);
            return (lower <= at && at <= upper).then_some((0, 0));
        }
        let (u_lo, u_hi) = ordered(
            (lower - self.start) / self.step,
            (upper - self.start) / self.step,
        );
        let first = u_lo.ceil().max(0.0);
        let last = u_hi.floor().min((self.points - 1) as f64);
        (first <= last).then_some((first as usize, last as usize))
    }

    /// Mean density per cell [1/m] of a unit of power spread uniformly over a
    /// segment of `length` centred on `center`. A single-point axis samples the
    /// segment at its coordinate instead of averaging over a cell.
    fn segment_weights(&self, center: f64, length: f64) -> Vec<(usize, f64)> {
        if self.points == 0 || length <= 0.0 {
            return Vec::new();
        }
        let half = 0.5 * length;
        if self.is_point() {
            let at = self.coordinate(0);
            return if (at - center).abs() <= half {
                vec![(0, 1.0 / length)]
            } else {
                Vec::new()
            };
        }
        let cell = self.step.abs();
        let (u_lo, u_hi) = ordered(
            (center - half - self.start) / self.step,
            (center + half - self.start) / self.step,
        );
        let first = (u_lo + 0.5).floor().max(0.0);
        let last = (u_hi + 0.5).floor().min((self.points - 1) as f64);
        if first > last {
            return Vec::new();
        }
        let length_in_cells = u_hi - u_lo;
        (first as usize..=last as usize)
            .filter_map(|index| {
                let u = index as f64;
                let overlap = u_hi.min(u + 0.5) - u_lo.max(u - 0.5);
                (overlap > 0.0).then(|| (index, overlap / (length_in_cells * cell)))
            })
            .collect()
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Normalized distribution of bending-magnet power over the vertical opening
/// angle, in units of `gamma * psi`.
fn opening_angle_profile(gamma_psi: f64) -> f64 {
    let q = 1.0 + gamma_psi * gamma_psi;
    21.0 / 32.0 * q.powf(-2.5) * (1.0 + 5.0 * gamma_psi * gamma_psi / (7.0 * q))
}

/// `d(beta)/d(ct)` at sample `index`; central differences inside, one-sided at the ends.
fn slope(values: &[f64], index: usize, step: f64) -> f64 {
    let last = values.len() - 1;
    match index {
        0 => (values[1] - values[0]) / step,
        i if i == last => (values[last] - values[last - 1]) / step,
        i => (values[i + 1] - values[i - 1]) / (2.0 * step),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepPlane {
    Horizontal,
    Vertical,
}

/// Power radiated by one trajectory sample, swept across the screen along `plane`.
#[derive(Debug, Clone, Copy)]
struct Sweep {
    plane: SweepPlane,
    power: f64,
    center_x: f64,
    center_y: f64,
    length: f64,
    distance: f64,
}

struct PowerScreen {
    x_axis: ScreenAxis,
    y_axis: ScreenAxis,
    gamma: f64,
    angular_cutoff: f64,
    density: Vec<f64>,
}

impl PowerScreen {
    fn deposit(&mut self, sweep: Sweep) {
        let (along_axis, across_axis, along_center, across_center) = match sweep.plane {
            SweepPlane::Horizontal => (self.x_axis, self.y_axis, sweep.center_x, sweep.center_y),
            SweepPlane::Vertical => (self.y_axis, self.x_axis, sweep.center_y, sweep.center_x),
        };
        let along = along_axis.segment_weights(along_center, sweep.length);
        if along.is_empty() {
            return;
        }
        let half_width = self.angular_cutoff * sweep.distance;
        let Some((first, last)) =
            across_axis.indices_between(across_center - half_width, across_center + half_width)
        else {
            return;
        };
        let nx = self.x_axis.points;
        for across in first..=last {
            let psi = (across_axis.coordinate(across) - across_center) / sweep.distance;
            let across_density =
                self.gamma * opening_angle_profile(self.gamma * psi) / sweep.distance;
            let scaled = sweep.power * across_density;
            for (along_index, along_density) in &along {
                let index = match sweep.plane {
                    SweepPlane::Horizontal => across * nx + along_index,
                    SweepPlane::Vertical => along_index * nx + across,
                };
                self.density[index] += scaled * along_density;
            }
        }
    }
}

pub(super) fn validate_power_precision(precision: &PowerDensityPrecision) -> ComputeResult<()> {
    if !precision.precision_factor.is_finite() || precision.precision_factor <= 0.0 {
        return Err(UndulatorError::computation(
            "RUN.POWER_DENSITY",
            format!(
                "power density precision factor must be finite and > 0, got {}",
                precision.precision_factor
            ),
        ));
    }
    Ok(())
}

/// Power density [W/mm^2] radiated along `trajectory` onto the `z_start` plane of
/// `grid`. `source_center` is the reference position for far-field distances.
pub(super) fn power_density_from_trajectory(
    grid: &mut StokesGrid,
    beam: &ParticleBeam,
    trajectory: &ParticleTrajectory,
    source_center: f64,
    precision: &PowerDensityPrecision,
) -> ComputeResult<()> {
    validate_power_precision(precision)?;
    if grid.energy_points() != 1 {
        return Err(UndulatorError::computation(
            "RUN.POWER_DENSITY",
            format!(
                "power density mesh must have exactly one photon energy, got ne = {}",
                grid.energy_points()
            ),
        ));
    }
    let np = trajectory.np();
    if np < 2 || !trajectory.columns_consistent() {
        return Err(UndulatorError::computation(
            "RUN.POWER_DENSITY",
            format!("power density needs a trajectory of at least 2 samples, got {np}"),
        ));
    }
    let step = trajectory.ct_step();
    if !step.is_finite() || step == 0.0 {
        return Err(UndulatorError::computation(
            "RUN.POWER_DENSITY",
            format!("trajectory ct window must be non-degenerate, got step {step}"),
        ));
    }
    let gamma = trajectory.initial.gamma;
    if !gamma.is_finite() || gamma <= 1.0 {
        return Err(UndulatorError::computation(
            "RUN.POWER_DENSITY",
            format!("trajectory relative energy must be > 1, got {gamma}"),
        ));
    }

    grid.clear();
    let (nx, ny) = (grid.x_points(), grid.y_points());
    if nx == 0 || ny == 0 {
        return Ok(());
    }

    let mesh = grid.mesh;
    let mut screen = PowerScreen {
        x_axis: ScreenAxis::new(mesh.x_start, mesh.x_fin, nx),
        y_axis: ScreenAxis::new(mesh.y_start, mesh.y_fin, ny),
        gamma,
        angular_cutoff: OPENING_ANGLE_CUTOFF * precision.precision_factor / gamma,
        density: vec![0.0; nx * ny],
    };
    // Larmor power per unit path length for unit curvature [W m].
    let emission = beam.current * ELEMENTARY_CHARGE * gamma.powi(4) / (6.0 * PI * VACUUM_PERMITTIVITY);

    for index in 0..np {
        let distance = match precision.method {
            PowerDensityMethod::NearField => mesh.z_start - trajectory.z[index],
            PowerDensityMethod::FarField => mesh.z_start - source_center,
        };
        let beta_z = trajectory.zp[index];
        if distance <= 0.0 || beta_z <= 0.0 {
            continue;
        }
        let path = if index == 0 || index == np - 1 {
            0.5 * step.abs()
        } else {
            step.abs()
        };
        let angle_x = trajectory.xp[index] / beta_z;
        let angle_y = trajectory.yp[index] / beta_z;
        let (center_x, center_y) = match precision.method {
            PowerDensityMethod::NearField => (
                trajectory.x[index] + angle_x * distance,
                trajectory.y[index] + angle_y * distance,
            ),
            PowerDensityMethod::FarField => (angle_x * distance, angle_y * distance),
        };

        let curvature_x = slope(&trajectory.xp, index, step);
        let curvature_y = slope(&trajectory.yp, index, step);
        for (plane, curvature) in [
            (SweepPlane::Horizontal, curvature_x),
            (SweepPlane::Vertical, curvature_y),
        ] {
            if curvature == 0.0 {
                continue;
            }
            screen.deposit(Sweep {
                plane,
                power: emission * curvature * curvature * path,
                center_x,
                center_y,
                length: curvature.abs() * path * distance,
                distance,
            });
        }
    }

    let lever_arm = (mesh.z_start - source_center).max(0.0);
    let second = &beam.second;
    let sigma_x = second.sigma_x().hypot(second.sigma_xp() * lever_arm);
    let sigma_y = second.sigma_y().hypot(second.sigma_yp() * lever_arm);
    let smoothed = gaussian_smooth_2d(GaussianSmoothingInput::new(
        &screen.density,
        GaussianAxis::new(nx, screen.x_axis.step, sigma_x),
        GaussianAxis::new(ny, screen.y_axis.step, sigma_y),
    ))
    .map_err(|error| UndulatorError::computation("RUN.POWER_DENSITY", error.to_string()))?;

    for (cell, value) in grid
        .component_mut(StokesComponent::S0)
        .iter_mut()
        .zip(smoothed)
    {
        *cell = (value * W_PER_MM2_PER_W_PER_M2) as f32;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ScreenAxis, opening_angle_profile, power_density_from_trajectory};
    use crate::modules::analytic::trajectory::integrate_trajectory;
    use crate::modules::grid::{GridShape, MeshBounds, StokesComponent, StokesGrid};
    use crate::modules::precision::{PowerDensityMethod, PowerDensityPrecision};
    use crate::modules::source::{
        FieldContainer, ParticleBeam, SecondMoments, reference_beam, reference_undulator,
    };
    use crate::modules::trajectory::{ParticleTrajectory, TrajectoryWindow};

    fn filament_beam() -> ParticleBeam {
        ParticleBeam {
            second: SecondMoments::default(),
            ..reference_beam()
        }
    }

    fn reference_trajectory() -> ParticleTrajectory {
        let fields = FieldContainer::single(reference_undulator()).expect("container");
        let mut trajectory = ParticleTrajectory::with_window(
            reference_beam().first,
            TrajectoryWindow {
                points: 8_001,
                ct_start: -1.6,
                ct_end: 1.6,
            },
        );
        integrate_trajectory(&mut trajectory, &fields).expect("trajectory");
        trajectory
    }

    fn screen(nx: usize, ny: usize, half_x: f64, half_y: f64) -> StokesGrid {
        StokesGrid::allocate_shape(
            GridShape { ne: 1, nx, ny },
            MeshBounds {
                z_start: 30.0,
                x_start: -half_x,
                x_fin: half_x,
                y_start: -half_y,
                y_fin: half_y,
                ..MeshBounds::default()
            },
        )
        .expect("grid")
    }

    #[test]
    fn opening_angle_profile_is_normalized() {
        let step = 1.0e-3;
        let total: f64 = (-60_000..=60_000)
            .map(|index| opening_angle_profile(index as f64 * step) * step)
            .sum();
        assert!((total - 1.0).abs() < 1.0e-4, "total {total}");
    }

    #[test]
    fn segment_weights_conserve_power_inside_the_axis() {
        let axis = ScreenAxis::new(-2.0, 2.0, 5);
        let weights = axis.segment_weights(0.3, 1.7);
        let deposited: f64 = weights.iter().map(|(_, density)| density * axis.step).sum();
        assert!((deposited - 1.0).abs() < 1.0e-12);
        assert!(axis.segment_weights(10.0, 1.0).is_empty());
    }

    #[test]
    fn on_axis_density_matches_undulator_estimate() {
        let trajectory = reference_trajectory();
        let mut grid = screen(5, 5, 0.002, 0.002);
        power_density_from_trajectory(
            &mut grid,
            &filament_beam(),
            &trajectory,
            0.0,
            &PowerDensityPrecision::default(),
        )
        .expect("power density");
        let center = grid.value(StokesComponent::S0, 0, 2, 2);
        assert!((65.0..80.0).contains(&center), "on-axis density {center} W/mm^2");
    }

    #[test]
    fn screen_collects_the_total_radiated_power() {
        let trajectory = reference_trajectory();
        let mut grid = screen(49, 81, 0.012, 0.040);
        power_density_from_trajectory(
            &mut grid,
            &filament_beam(),
            &trajectory,
            0.0,
            &PowerDensityPrecision::default(),
        )
        .expect("power density");
        let cell_mm2 = grid.x_step() * grid.y_step() * 1.0e6;
        let total: f64 = grid.s0().iter().map(|value| f64::from(*value) * cell_mm2).sum();
        assert!((total - 8_541.0).abs() / 8_541.0 < 0.03, "total {total} W");
    }

    #[test]
    fn far_field_peak_is_close_to_near_field_at_thirty_metres() {
        let trajectory = reference_trajectory();
        let mut near = screen(5, 5, 0.002, 0.002);
        let mut far = screen(5, 5, 0.002, 0.002);
        let precision = PowerDensityPrecision::default();
        power_density_from_trajectory(&mut near, &reference_beam(), &trajectory, 0.0, &precision)
            .expect("near field");
        power_density_from_trajectory(
            &mut far,
            &reference_beam(),
            &trajectory,
            0.0,
            &PowerDensityPrecision {
                method: PowerDensityMethod::FarField,
                ..precision
            },
        )
        .expect("far field");
        let near_center = near.value(StokesComponent::S0, 0, 2, 2);
        let far_center = far.value(StokesComponent::S0, 0, 2, 2);
        assert!((near_center - far_center).abs() / near_center < 0.05);
    }

    #[test]
    fn spectral_mesh_is_rejected() {
        let trajectory = reference_trajectory();
        let mut grid = StokesGrid::allocate(2, 3, 3).expect("grid");
        let error = power_density_from_trajectory(
            &mut grid,
            &reference_beam(),
            &trajectory,
            0.0,
            &PowerDensityPrecision::default(),
        )
        .expect_err("ne = 2 should fail");
        assert_eq!(error.placeholder(), "RUN.POWER_DENSITY");
        assert_eq!(error.exit_code(), 4);
    }

    #[test]
    fn non_positive_precision_factor_is_rejected() {
        let trajectory = reference_trajectory();
        let mut grid = screen(3, 3, 0.001, 0.001);
        let error = power_density_from_trajectory(
            &mut grid,
            &reference_beam(),
            &trajectory,
            0.0,
            &PowerDensityPrecision {
                precision_factor: 0.0,
                ..PowerDensityPrecision::default()
            },
        )
        .expect_err("zero precision should fail");
        assert!(error.message().contains("precision factor"));
    }
}

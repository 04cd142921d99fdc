use crate::common::constants::{ANGULAR_FLUX_DENSITY_PREFACTOR, HC_EV_M, MRAD_PER_RAD};
use crate::domain::{ComputeResult, UndulatorError};
use crate::modules::grid::{StokesComponent, StokesGrid};
use crate::modules::precision::{FluxPrecision, FluxQuantity};
use crate::modules::source::{FieldPlane, ParticleBeam, Undulator};
use crate::numerics::midpoint_nodes;
use crate::numerics::special::{bessel_j_sequence, normal_interval_probability};
use std::f64::consts::PI;
use tracing::debug;

const NODES_PER_AZIMUTHAL_PRECISION: f64 = 32.0;
const MIN_ANGULAR_NODES: usize = 8;
/// Line-shape cutoff in line widths per unit of longitudinal precision.
const LINE_CUTOFF: f64 = 5.0;
const APERTURE_PADDING_SIGMAS: f64 = 5.0;
/// Below this ratio of spread to natural width the sinc^2 line is kept as is.
const NEGLIGIBLE_SPREAD_RATIO: f64 = 0.05;

/// Natural line width of `sinc^2(pi x)` expressed as an equivalent Gaussian sigma.
const NATURAL_LINE_SIGMA: f64 = 0.398_942_280_401_432_7;

/// Spectral profile of one harmonic in units of `x = n N (E - E_n) / E_n`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LineShape {
    Sinc { half_width: f64 },
    Gaussian { sigma: f64, peak: f64, half_width: f64 },
}

impl LineShape {
    fn new(spread_sigma: f64, precision: f64) -> Self {
        if spread_sigma <= NEGLIGIBLE_SPREAD_RATIO * NATURAL_LINE_SIGMA {
            return Self::Sinc {
                half_width: 2.0 * LINE_CUTOFF * precision,
            };
        }
        let sigma = NATURAL_LINE_SIGMA.hypot(spread_sigma);
        Self::Gaussian {
            sigma,
            peak: NATURAL_LINE_SIGMA / sigma,
            half_width: LINE_CUTOFF * precision * sigma,
        }
    }

    fn half_width(&self) -> f64 {
        match *self {
            Self::Sinc { half_width } | Self::Gaussian { half_width, .. } => half_width,
        }
    }

    fn value(&self, x: f64) -> f64 {
        match *self {
            Self::Sinc { .. } => {
                if x == 0.0 {
                    1.0
                } else {
                    let arg = PI * x;
                    (arg.sin() / arg).powi(2)
                }
            }
            Self::Gaussian { sigma, peak, .. } => peak * (-0.5 * (x / sigma).powi(2)).exp(),
        }
    }
}

/// Planar-undulator on-axis brightness factor `F_n(K)`; zero for even harmonics.
pub(super) fn brightness_factor(harmonic: u32, k: f64) -> f64 {
    if harmonic % 2 == 0 || k == 0.0 {
        return 0.0;
    }
    let n = f64::from(harmonic);
    let denominator = 1.0 + 0.5 * k * k;
    let argument = n * k * k / (4.0 * denominator);
    let lower = ((harmonic - 1) / 2) as usize;
    let bessel = bessel_j_sequence(lower + 1, argument);
    (n * k / denominator).powi(2) * (bessel[lower] - bessel[lower + 1]).powi(2)
}

#[derive(Debug, Clone, Copy)]
struct HarmonicLine {
    order: f64,
    periods: f64,
    /// Peak on-axis angular flux density [ph/s/.1%bw/mrad^2].
    on_axis_density: f64,
    line: LineShape,
}

/// Quadrature over one observation angle [rad]; weights in mrad or normalized.
#[derive(Debug, Clone, PartialEq, Default)]
struct AngularQuadrature {
    angles: Vec<f64>,
    weights: Vec<f64>,
}

impl AngularQuadrature {
    /// Angular width of an aperture `[lower, upper]` seen by a beam of angular spread `sigma`.
    fn aperture(lower: f64, upper: f64, sigma: f64, nodes: usize) -> Self {
        let (lower, upper) = if lower <= upper {
            (lower, upper)
        } else {
            (upper, lower)
        };
        let padding = APERTURE_PADDING_SIGMAS * sigma;
        let (angles, width) = midpoint_nodes(lower - padding, upper + padding, nodes);
        let weights = angles
            .iter()
            .map(|angle| {
                normal_interval_probability(lower, upper, *angle, sigma) * width * MRAD_PER_RAD
            })
            .collect();
        Self { angles, weights }.without_empty_nodes()
    }

    /// Normalized Gaussian average around `center`.
    fn point(center: f64, sigma: f64, nodes: usize) -> Self {
        if sigma <= 0.0 {
            return Self {
                angles: vec![center],
                weights: vec![1.0],
            };
        }
        let padding = APERTURE_PADDING_SIGMAS * sigma;
        let (angles, _) = midpoint_nodes(center - padding, center + padding, nodes);
        let raw = angles
            .iter()
            .map(|angle| (-0.5 * ((angle - center) / sigma).powi(2)).exp())
            .collect::<Vec<_>>();
        let total: f64 = raw.iter().sum();
        Self {
            angles,
            weights: raw.into_iter().map(|weight| weight / total).collect(),
        }
        .without_empty_nodes()
    }

    fn without_empty_nodes(self) -> Self {
        let (angles, weights) = self
            .angles
            .into_iter()
            .zip(self.weights)
            .filter(|(_, weight)| *weight > 0.0)
            .unzip();
        Self { angles, weights }
    }
}

/// Observation node: inverse red-shift denominator `1/(1 + K^2/2 + gamma^2 theta^2)` and weight.
#[derive(Debug, Clone, Copy)]
struct ObservationNode {
    inverse_denominator: f64,
    weight: f64,
}

struct FluxModel<'a> {
    beam: &'a ParticleBeam,
    precision: &'a FluxPrecision,
    distance: f64,
    gamma: f64,
    k_sq: f64,
    fundamental_scale: f64,
    node_count: usize,
    lines: Vec<HarmonicLine>,
}

impl FluxModel<'_> {
    fn angular_axes(&self, grid: &StokesGrid) -> (Vec<AngularQuadrature>, Vec<AngularQuadrature>) {
        let first = &self.beam.first;
        let second = &self.beam.second;
        let theta_x0 = first.xp + first.x / self.distance;
        let theta_y0 = first.yp + first.y / self.distance;
        let sigma_x = second.sigma_xp().hypot(second.sigma_x() / self.distance);
        let sigma_y = second.sigma_yp().hypot(second.sigma_y() / self.distance);
        let mesh = grid.mesh;

        match self.precision.quantity {
            FluxQuantity::Flux => (
                self.aperture_cells(mesh.x_start, mesh.x_fin, grid.x_points(), theta_x0, sigma_x),
                self.aperture_cells(mesh.y_start, mesh.y_fin, grid.y_points(), theta_y0, sigma_y),
            ),
            FluxQuantity::FluxPerUnitArea => {
                // mrad^2 -> mm^2 at the observation distance, split over both axes
                let per_axis_scale = 1.0 / self.distance;
                let scaled = |mut quadrature: AngularQuadrature| {
                    for weight in quadrature.weights.iter_mut() {
                        *weight *= per_axis_scale;
                    }
                    quadrature
                };
                (
                    (0..grid.x_points())
                        .map(|ix| {
                            scaled(AngularQuadrature::point(
                                grid.x_at(ix) / self.distance - theta_x0,
                                sigma_x,
                                self.node_count,
                            ))
                        })
                        .collect(),
                    (0..grid.y_points())
                        .map(|iy| {
                            scaled(AngularQuadrature::point(
                                grid.y_at(iy) / self.distance - theta_y0,
                                sigma_y,
                                self.node_count,
                            ))
                        })
                        .collect(),
                )
            }
        }
    }

    fn aperture_cells(
        &self,
        start: f64,
        fin: f64,
        points: usize,
        mean_angle: f64,
        sigma: f64,
    ) -> Vec<AngularQuadrature> {
        let width = (fin - start) / points as f64;
        (0..points)
            .map(|index| {
                let lower = start + index as f64 * width;
                let upper = lower + width;
                AngularQuadrature::aperture(
                    lower / self.distance - mean_angle,
                    upper / self.distance - mean_angle,
                    sigma,
                    self.node_count,
                )
            })
            .collect()
    }

    fn observation_nodes(
        &self,
        x: &AngularQuadrature,
        y: &AngularQuadrature,
    ) -> Vec<ObservationNode> {
        let base = 1.0 + 0.5 * self.k_sq;
        let gamma_sq = self.gamma * self.gamma;
        y.angles
            .iter()
            .zip(&y.weights)
            .flat_map(|(theta_y, weight_y)| {
                x.angles
                    .iter()
                    .zip(&x.weights)
                    .map(move |(theta_x, weight_x)| ObservationNode {
                        inverse_denominator: 1.0
                            / (base + gamma_sq * (theta_x * theta_x + theta_y * theta_y)),
                        weight: weight_x * weight_y,
                    })
            })
            .collect()
    }

    /// Adds every harmonic's contribution at the given nodes into `spectrum`.
    fn accumulate(&self, grid: &StokesGrid, nodes: &[ObservationNode], spectrum: &mut [f64]) {
        let Some((min_inverse, max_inverse)) = nodes
            .iter()
            .map(|node| node.inverse_denominator)
            .fold(None, |range: Option<(f64, f64)>, value| {
                Some(range.map_or((value, value), |(lo, hi)| (lo.min(value), hi.max(value))))
            })
        else {
            return;
        };

        for line in &self.lines {
            let resonance_scale = line.order * self.fundamental_scale;
            let relative_half_width = line.line.half_width() / (line.order * line.periods);
            let lowest = resonance_scale * min_inverse * (1.0 - relative_half_width);
            let highest = resonance_scale * max_inverse * (1.0 + relative_half_width);
            for (ie, value) in spectrum.iter_mut().enumerate() {
                let energy = grid.energy_at(ie);
                if energy < lowest || energy > highest {
                    continue;
                }
                let mut sum = 0.0;
                for node in nodes {
                    let resonance = resonance_scale * node.inverse_denominator;
                    let detuning = line.order * line.periods * (energy - resonance) / resonance;
                    if detuning.abs() > line.line.half_width() {
                        continue;
                    }
                    sum += line.line.value(detuning) * node.weight;
                }
                *value += line.on_axis_density * sum;
            }
        }
    }
}

fn validate(
    grid: &StokesGrid,
    beam: &ParticleBeam,
    undulator: &Undulator,
    precision: &FluxPrecision,
) -> ComputeResult<f64> {
    let fail = |message: String| -> ComputeResult<f64> {
        Err(UndulatorError::computation("RUN.FLUX", message))
    };
    if precision.initial_harmonic < 1 || precision.initial_harmonic > precision.final_harmonic {
        return fail(format!(
            "harmonic range must satisfy 1 <= initial <= final, got {}..{}",
            precision.initial_harmonic, precision.final_harmonic
        ));
    }
    for (label, value) in [
        ("longitudinal", precision.longitudinal_precision),
        ("azimuthal", precision.azimuthal_precision),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return fail(format!("{label} precision must be finite and > 0, got {value}"));
        }
    }
    let shape = grid.shape();
    if shape.ne == 0 || shape.nx == 0 || shape.ny == 0 {
        return fail(format!(
            "flux mesh must have at least one point per axis, got {}x{}x{}",
            shape.ne, shape.nx, shape.ny
        ));
    }
    let mesh = grid.mesh;
    if mesh.e_start.is_nan() || mesh.e_fin.is_nan() || mesh.e_start <= 0.0 || mesh.e_fin <= 0.0 {
        return fail(format!(
            "photon energies must be > 0, got {}..{} eV",
            mesh.e_start, mesh.e_fin
        ));
    }
    if !mesh.z_start.is_finite() || mesh.z_start <= 0.0 {
        return fail(format!(
            "observation plane must lie downstream of the undulator centre, got z = {} m",
            mesh.z_start
        ));
    }
    if !beam.first.gamma.is_finite() || beam.first.gamma <= 1.0 {
        return fail(format!(
            "beam relative energy must be > 1, got {}",
            beam.first.gamma
        ));
    }
    if undulator.period.is_nan() || undulator.period <= 0.0 || undulator.periods == 0 {
        return fail("undulator must have a positive period and at least one period".to_owned());
    }
    Ok(mesh.z_start)
}

/// Spectral flux through the mesh aperture (or flux per unit area at each mesh
/// point) summed over the configured undulator harmonics.
pub(super) fn spectral_flux(
    grid: &mut StokesGrid,
    beam: &ParticleBeam,
    undulator: &Undulator,
    precision: &FluxPrecision,
) -> ComputeResult<()> {
    let distance = validate(grid, beam, undulator, precision)?;
    grid.clear();

    let gamma = beam.first.gamma;
    let k_vertical = undulator.deflection_parameter(FieldPlane::Vertical);
    let k_horizontal = undulator.deflection_parameter(FieldPlane::Horizontal);
    let k_sq = k_vertical * k_vertical + k_horizontal * k_horizontal;
    if k_sq == 0.0 {
        return Ok(());
    }
    let k = k_sq.sqrt();
    let periods = f64::from(undulator.periods);
    let fundamental_scale = 2.0 * gamma * gamma * HC_EV_M / undulator.period;
    debug!(
        deflection_parameter = k,
        fundamental_ev = fundamental_scale / (1.0 + 0.5 * k_sq),
        "undulator resonance"
    );

    let energy_spread = beam.second.relative_energy_spread();
    let lines = (precision.initial_harmonic..=precision.final_harmonic)
        .filter_map(|harmonic| {
            let factor = brightness_factor(harmonic, k);
            (factor > 0.0).then(|| {
                let order = f64::from(harmonic);
                HarmonicLine {
                    order,
                    periods,
                    on_axis_density: ANGULAR_FLUX_DENSITY_PREFACTOR
                        * periods
                        * periods
                        * beam.energy_gev().powi(2)
                        * beam.current
                        * factor,
                    line: LineShape::new(
                        order * periods * 2.0 * energy_spread,
                        precision.longitudinal_precision,
                    ),
                }
            })
        })
        .collect::<Vec<_>>();

    let model = FluxModel {
        beam,
        precision,
        distance,
        gamma,
        k_sq,
        fundamental_scale,
        node_count: ((NODES_PER_AZIMUTHAL_PRECISION * precision.azimuthal_precision).ceil()
            as usize)
            .max(MIN_ANGULAR_NODES),
        lines,
    };

    let (x_axes, y_axes) = model.angular_axes(grid);
    let polarization = (k_vertical * k_vertical - k_horizontal * k_horizontal) / k_sq;
    let ne = grid.energy_points();
    let mut spectrum = vec![0.0; ne];
    for (iy, y_quadrature) in y_axes.iter().enumerate() {
        for (ix, x_quadrature) in x_axes.iter().enumerate() {
            spectrum.fill(0.0);
            let nodes = model.observation_nodes(x_quadrature, y_quadrature);
            model.accumulate(grid, &nodes, &mut spectrum);
            for (ie, value) in spectrum.iter().enumerate() {
                grid.set(StokesComponent::S0, ie, ix, iy, *value as f32);
                grid.set(StokesComponent::S1, ie, ix, iy, (polarization * value) as f32);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LineShape, brightness_factor, spectral_flux};
    use crate::modules::grid::{GridShape, MeshBounds, StokesComponent, StokesGrid};
    use crate::modules::precision::{FluxPrecision, FluxQuantity};
    use crate::modules::source::{
        ParticleBeam, SecondMoments, Undulator, reference_beam, reference_undulator,
    };

    fn aperture_grid(ne: usize, e_start: f64, e_fin: f64) -> StokesGrid {
        StokesGrid::allocate_shape(
            GridShape { ne, nx: 1, ny: 1 },
            MeshBounds {
                z_start: 30.0,
                e_start,
                e_fin,
                x_start: -0.0015,
                x_fin: 0.0015,
                y_start: -0.00075,
                y_fin: 0.00075,
            },
        )
        .expect("grid")
    }

    fn filament_beam() -> ParticleBeam {
        ParticleBeam {
            second: SecondMoments::default(),
            ..reference_beam()
        }
    }

    /// On-axis fundamental [eV] of the reference undulator.
    fn on_axis_resonance(undulator: &Undulator, beam: &ParticleBeam) -> f64 {
        let k = undulator.effective_deflection_parameter();
        let gamma = beam.first.gamma;
        2.0 * gamma * gamma * crate::common::constants::HC_EV_M
            / (undulator.period * (1.0 + 0.5 * k * k))
    }

    #[test]
    fn brightness_factor_matches_tabulated_fundamental() {
        let k = reference_undulator().effective_deflection_parameter();
        assert!((brightness_factor(1, k) - 0.310).abs() < 1.0e-3);
        assert_eq!(brightness_factor(2, k), 0.0);
        assert!(brightness_factor(3, k) > 0.0);
    }

    #[test]
    fn broadened_line_keeps_its_area() {
        let natural = LineShape::new(0.0, 1.5);
        let broadened = LineShape::new(2.0, 1.5);
        let step = 1.0e-3;
        let area = |line: LineShape| -> f64 {
            (-40_000..=40_000)
                .map(|index| line.value(index as f64 * step) * step)
                .sum()
        };
        assert!((area(natural) - 1.0).abs() < 0.02);
        assert!((area(broadened) - 1.0).abs() < 0.02);
    }

    #[test]
    fn fundamental_peak_sits_just_below_on_axis_resonance() {
        let mut grid = aperture_grid(301, 1_400.0, 1_700.0);
        spectral_flux(
            &mut grid,
            &reference_beam(),
            &reference_undulator(),
            &FluxPrecision::default(),
        )
        .expect("flux");
        let (peak_index, peak) = grid
            .s0()
            .iter()
            .enumerate()
            .fold((0, 0.0_f32), |best, (index, value)| {
                if *value > best.1 { (index, *value) } else { best }
            });
        let peak_energy = grid.energy_at(peak_index);
        assert!((1_480.0..1_575.0).contains(&peak_energy), "peak at {peak_energy} eV");
        assert!((1.0e14..1.0e17).contains(&f64::from(peak)), "peak flux {peak}");
    }

    #[test]
    fn no_flux_away_from_odd_harmonics() {
        let mut grid = aperture_grid(2, 1_000.0, 3_000.0);
        spectral_flux(
            &mut grid,
            &reference_beam(),
            &reference_undulator(),
            &FluxPrecision::default(),
        )
        .expect("flux");
        assert_eq!(grid.s0(), &[0.0, 0.0]);
    }

    #[test]
    fn planar_vertical_field_is_horizontally_polarized() {
        let mut grid = aperture_grid(21, 1_500.0, 1_560.0);
        spectral_flux(
            &mut grid,
            &reference_beam(),
            &reference_undulator(),
            &FluxPrecision::default(),
        )
        .expect("flux");
        assert!(grid.s0().iter().any(|value| *value > 0.0));
        assert_eq!(grid.s0(), grid.component(StokesComponent::S1));
        assert!(grid.component(StokesComponent::S2).iter().all(|v| *v == 0.0));
        assert!(grid.component(StokesComponent::S3).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn on_axis_density_at_resonance_matches_closed_form() {
        let undulator = reference_undulator();
        let beam = filament_beam();
        let k = undulator.effective_deflection_parameter();
        let resonance = on_axis_resonance(&undulator, &beam);
        let mut grid = StokesGrid::allocate_shape(
            GridShape { ne: 1, nx: 1, ny: 1 },
            MeshBounds {
                z_start: 30.0,
                e_start: resonance,
                e_fin: resonance,
                ..MeshBounds::default()
            },
        )
        .expect("grid");
        spectral_flux(
            &mut grid,
            &beam,
            &undulator,
            &FluxPrecision {
                quantity: FluxQuantity::FluxPerUnitArea,
                ..FluxPrecision::default()
            },
        )
        .expect("flux per unit area");

        let expected = 1.744e14 * 150.0_f64.powi(2) * 9.0 * 0.5 * brightness_factor(1, k) / 900.0;
        let actual = f64::from(grid.s0()[0]);
        assert!((actual - expected).abs() / expected < 1.0e-3, "{actual} vs {expected}");
    }

    #[test]
    fn small_aperture_flux_at_line_centre_equals_density_times_area() {
        let beam = filament_beam();
        let undulator = reference_undulator();
        let resonance = on_axis_resonance(&undulator, &beam);
        let mesh = MeshBounds {
            z_start: 30.0,
            e_start: resonance,
            e_fin: resonance,
            x_start: -0.000_05,
            x_fin: 0.000_05,
            y_start: -0.000_05,
            y_fin: 0.000_05,
        };
        let mut flux = StokesGrid::allocate_shape(GridShape { ne: 1, nx: 1, ny: 1 }, mesh)
            .expect("grid");
        spectral_flux(&mut flux, &beam, &undulator, &FluxPrecision::default()).expect("flux");

        let mut density = StokesGrid::allocate_shape(
            GridShape { ne: 1, nx: 1, ny: 1 },
            MeshBounds {
                x_start: 0.0,
                x_fin: 0.0,
                y_start: 0.0,
                y_fin: 0.0,
                ..mesh
            },
        )
        .expect("grid");
        spectral_flux(
            &mut density,
            &beam,
            &undulator,
            &FluxPrecision {
                quantity: FluxQuantity::FluxPerUnitArea,
                ..FluxPrecision::default()
            },
        )
        .expect("density");

        let area_mm2 = 0.1 * 0.1;
        let through_aperture = f64::from(flux.s0()[0]);
        let estimate = f64::from(density.s0()[0]) * area_mm2;
        assert!(through_aperture > 0.0);
        assert!(
            (through_aperture - estimate).abs() / estimate < 5.0e-3,
            "through {through_aperture} vs estimate {estimate}"
        );
    }

    #[test]
    fn invalid_harmonic_range_is_a_computation_error() {
        let mut grid = aperture_grid(4, 1_000.0, 2_000.0);
        let error = spectral_flux(
            &mut grid,
            &reference_beam(),
            &reference_undulator(),
            &FluxPrecision {
                initial_harmonic: 5,
                final_harmonic: 3,
                ..FluxPrecision::default()
            },
        )
        .expect_err("reversed range should fail");
        assert_eq!(error.placeholder(), "RUN.FLUX");
        assert_eq!(error.exit_code(), 4);
    }
}

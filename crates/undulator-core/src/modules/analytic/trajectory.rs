use crate::common::constants::{ELECTRON_MASS, ELEMENTARY_CHARGE, SPEED_OF_LIGHT};
use crate::domain::{ComputeResult, UndulatorError};
use crate::modules::source::{FieldContainer, ParticleMoments};
use crate::modules::trajectory::ParticleTrajectory;

const STEPS_PER_FIELD_PERIOD: f64 = 64.0;
const FALLBACK_MAX_STEP: f64 = 1.0e-3;
/// Field edges closer than this [m] are not split off as a separate segment.
const EDGE_TOLERANCE: f64 = 1.0e-12;

/// `(x, beta_x, y, beta_y, z)` as functions of `ct`.
type PhaseState = [f64; 5];

struct EquationsOfMotion<'a> {
    fields: &'a FieldContainer,
    inverse_gamma_sq: f64,
    /// `e / (gamma m c)` [1/(T m)].
    bending_factor: f64,
    /// Longitudinal positions where the field of an element switches on or off.
    edges: Vec<f64>,
}

impl<'a> EquationsOfMotion<'a> {
    fn new(fields: &'a FieldContainer, gamma: f64) -> Self {
        Self {
            fields,
            inverse_gamma_sq: 1.0 / (gamma * gamma),
            bending_factor: ELEMENTARY_CHARGE / (gamma * ELECTRON_MASS * SPEED_OF_LIGHT),
            edges: fields
                .element_extents()
                .flat_map(|(start, end)| [start, end])
                .collect(),
        }
    }

    /// Upper bound of `beta_z`, reached with no transverse motion.
    fn max_beta_z(&self) -> f64 {
        (1.0 - self.inverse_gamma_sq).sqrt()
    }

    fn beta_z(&self, state: &PhaseState) -> f64 {
        (1.0 - self.inverse_gamma_sq - state[1] * state[1] - state[3] * state[3])
            .max(0.0)
            .sqrt()
    }

    fn derivative(&self, state: &PhaseState) -> PhaseState {
        let beta_z = self.beta_z(state);
        let (bx, by) = self.fields.field_at(state[4]);
        [
            state[1],
            self.bending_factor * beta_z * by,
            state[3],
            -self.bending_factor * beta_z * bx,
            beta_z,
        ]
    }

    fn rk4_step(&self, state: &PhaseState, step: f64) -> PhaseState {
        let k1 = self.derivative(state);
        let k2 = self.derivative(&offset(state, &k1, 0.5 * step));
        let k3 = self.derivative(&offset(state, &k2, 0.5 * step));
        let k4 = self.derivative(&offset(state, &k3, step));
        let mut next = *state;
        for index in 0..next.len() {
            next[index] +=
                step / 6.0 * (k1[index] + 2.0 * k2[index] + 2.0 * k3[index] + k4[index]);
        }
        next
    }

    /// Advances `state` by `span` in `ct`. The span is cut at every field edge
    /// on the way so that no Runge-Kutta step straddles a field discontinuity.
    fn advance(&self, state: PhaseState, span: f64, max_step: f64) -> PhaseState {
        let mut state = state;
        let mut remaining = span;
        while remaining != 0.0 {
            let segment = self.span_before_edge(&state, remaining);
            state = self.advance_smooth(state, segment, max_step);
            remaining -= segment;
        }
        state
    }

    /// Part of `span` the particle covers before it can reach the next field
    /// edge. Uses the largest possible `beta_z`, so the particle stops at or
    /// just short of the edge and never past it.
    fn span_before_edge(&self, state: &PhaseState, span: f64) -> f64 {
        let direction = span.signum();
        let reach = span.abs();
        let speed = self.max_beta_z();
        self.edges
            .iter()
            .map(|edge| direction * (edge - state[4]) / speed)
            .filter(|distance| *distance > EDGE_TOLERANCE && *distance < reach - EDGE_TOLERANCE)
            .reduce(f64::min)
            .map_or(span, |distance| direction * distance)
    }

    /// Uniform Runge-Kutta sub-steps no longer than `max_step`.
    fn advance_smooth(&self, state: PhaseState, span: f64, max_step: f64) -> PhaseState {
        if span == 0.0 {
            return state;
        }
        let substeps = (span.abs() / max_step).ceil().max(1.0) as usize;
        let step = span / substeps as f64;
        (0..substeps).fold(state, |current, _| self.rk4_step(&current, step))
    }
}

fn offset(state: &PhaseState, slope: &PhaseState, step: f64) -> PhaseState {
    let mut shifted = *state;
    for index in 0..shifted.len() {
        shifted[index] += step * slope[index];
    }
    shifted
}

fn max_integration_step(fields: &FieldContainer) -> f64 {
    fields
        .elements()
        .iter()
        .flat_map(|element| {
            element
                .harmonics
                .iter()
                .map(move |harmonic| element.period / f64::from(harmonic.n.max(1)))
        })
        .fold(None, |shortest: Option<f64>, wavelength| {
            Some(shortest.map_or(wavelength, |value| value.min(wavelength)))
        })
        .map(|shortest| shortest / STEPS_PER_FIELD_PERIOD)
        .unwrap_or(FALLBACK_MAX_STEP)
}

fn initial_state(initial: &ParticleMoments) -> PhaseState {
    [initial.x, initial.xp, initial.y, initial.yp, initial.z]
}

/// Integrates the trajectory through `fields`. The initial conditions hold at
/// `ct = 0`; the particle is first carried to `ct_start`, then sampled on the
/// uniform `ct` grid up to `ct_end`.
pub(super) fn integrate_trajectory(
    trajectory: &mut ParticleTrajectory,
    fields: &FieldContainer,
) -> ComputeResult<()> {
    if trajectory.np() == 0 {
        return Err(UndulatorError::computation(
            "RUN.TRAJECTORY",
            "trajectory has no samples allocated",
        ));
    }
    if !trajectory.columns_consistent() {
        return Err(UndulatorError::computation(
            "RUN.TRAJECTORY",
            "trajectory columns have inconsistent lengths",
        ));
    }
    let gamma = trajectory.initial.gamma;
    if !gamma.is_finite() || gamma <= 1.0 {
        return Err(UndulatorError::computation(
            "RUN.TRAJECTORY",
            format!("initial relative energy must be > 1, got {gamma}"),
        ));
    }
    if !trajectory.ct_start.is_finite() || !trajectory.ct_end.is_finite() {
        return Err(UndulatorError::computation(
            "RUN.TRAJECTORY",
            "trajectory ct window must be finite",
        ));
    }

    let motion = EquationsOfMotion::new(fields, gamma);
    let max_step = max_integration_step(fields);
    let step = trajectory.ct_step();

    let mut state = motion.advance(
        initial_state(&trajectory.initial),
        trajectory.ct_start,
        max_step,
    );
    for index in 0..trajectory.np() {
        if index > 0 {
            state = motion.advance(state, step, max_step);
        }
        trajectory.x[index] = state[0];
        trajectory.xp[index] = state[1];
        trajectory.y[index] = state[2];
        trajectory.yp[index] = state[3];
        trajectory.z[index] = state[4];
        trajectory.zp[index] = motion.beta_z(&state);
    }
    Ok(())
}

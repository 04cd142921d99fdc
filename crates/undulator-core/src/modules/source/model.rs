use crate::common::constants::{
    ELECTRON_MASS, ELECTRON_REST_ENERGY_GEV, ELEMENTARY_CHARGE, SPEED_OF_LIGHT,
};
use crate::domain::{ConfigResult, UndulatorError};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldPlane {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MagneticFieldHarmonic {
    pub n: u32,
    pub plane: FieldPlane,
    /// Peak field [T].
    pub amplitude: f64,
}

impl MagneticFieldHarmonic {
    pub const fn new(n: u32, plane: FieldPlane, amplitude: f64) -> Self {
        Self {
            n,
            plane,
            amplitude,
        }
    }

    /// Deflection parameter of this harmonic alone for the given period [m].
    pub fn deflection_parameter(&self, period: f64) -> f64 {
        ELEMENTARY_CHARGE * self.amplitude.abs() * period
            / (2.0 * PI * ELECTRON_MASS * SPEED_OF_LIGHT * f64::from(self.n))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Undulator {
    /// Period length [m].
    pub period: f64,
    pub periods: u32,
    pub harmonics: Vec<MagneticFieldHarmonic>,
}

impl Undulator {
    pub fn new(period: f64, periods: u32, harmonics: Vec<MagneticFieldHarmonic>) -> Self {
        Self {
            period,
            periods,
            harmonics,
        }
    }

    pub fn length(&self) -> f64 {
        self.period * f64::from(self.periods)
    }

    /// Deflection parameter of one field plane, harmonics added in quadrature.
    pub fn deflection_parameter(&self, plane: FieldPlane) -> f64 {
        self.harmonics
            .iter()
            .filter(|harmonic| harmonic.plane == plane)
            .map(|harmonic| harmonic.deflection_parameter(self.period).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    pub fn effective_deflection_parameter(&self) -> f64 {
        self.deflection_parameter(FieldPlane::Horizontal)
            .hypot(self.deflection_parameter(FieldPlane::Vertical))
    }

    /// On-axis field `(bx, by)` [T] at longitudinal position `z` relative to the
    /// undulator centre. Zero outside the `periods * period` long magnet.
    pub fn field_at(&self, z: f64) -> (f64, f64) {
        if z.abs() > 0.5 * self.length() {
            return (0.0, 0.0);
        }
        let phase = 2.0 * PI * z / self.period;
        self.harmonics
            .iter()
            .fold((0.0, 0.0), |(bx, by), harmonic| {
                let value = harmonic.amplitude * (f64::from(harmonic.n) * phase).cos();
                match harmonic.plane {
                    FieldPlane::Horizontal => (bx + value, by),
                    FieldPlane::Vertical => (bx, by + value),
                }
            })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.period.is_finite() || self.period <= 0.0 {
            return Err(UndulatorError::input_validation(
                "CONFIG.UNDULATOR_PERIOD",
                format!("undulator period must be finite and > 0, got {}", self.period),
            ));
        }
        if self.periods == 0 {
            return Err(UndulatorError::input_validation(
                "CONFIG.UNDULATOR_PERIODS",
                "undulator must have at least one period",
            ));
        }
        for (index, harmonic) in self.harmonics.iter().enumerate() {
            if harmonic.n == 0 {
                return Err(UndulatorError::input_validation(
                    "CONFIG.FIELD_HARMONIC",
                    format!("field harmonic {index} has harmonic number 0"),
                ));
            }
            if !harmonic.amplitude.is_finite() {
                return Err(UndulatorError::input_validation(
                    "CONFIG.FIELD_HARMONIC",
                    format!(
                        "field harmonic {index} amplitude must be finite, got {}",
                        harmonic.amplitude
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Magnetic elements with their placement offsets along x, y and z.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldContainer {
    elements: Vec<Undulator>,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl FieldContainer {
    pub fn new(
        elements: Vec<Undulator>,
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
    ) -> ConfigResult<Self> {
        for (axis, offsets) in [("x", &x), ("y", &y), ("z", &z)] {
            if offsets.len() != elements.len() {
                return Err(UndulatorError::input_validation(
                    "CONFIG.FIELD_CONTAINER",
                    format!(
                        "field container holds {} element(s) but {} '{}' offset(s)",
                        elements.len(),
                        offsets.len(),
                        axis
                    ),
                ));
            }
        }
        for element in &elements {
            element.validate()?;
        }
        Ok(Self { elements, x, y, z })
    }

    /// Container holding one undulator at the origin.
    pub fn single(undulator: Undulator) -> ConfigResult<Self> {
        Self::new(vec![undulator], vec![0.0], vec![0.0], vec![0.0])
    }

    pub fn elements(&self) -> &[Undulator] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn offset(&self, index: usize) -> Option<[f64; 3]> {
        (index < self.elements.len()).then(|| [self.x[index], self.y[index], self.z[index]])
    }

    /// Total on-axis field `(bx, by)` at absolute longitudinal position `z`.
    /// Transverse offsets do not alter the field of an ideal planar device.
    pub fn field_at(&self, z: f64) -> (f64, f64) {
        self.elements
            .iter()
            .zip(&self.z)
            .fold((0.0, 0.0), |(bx, by), (element, center)| {
                let (ex, ey) = element.field_at(z - center);
                (bx + ex, by + ey)
            })
    }

    /// `(z_start, z_end)` of each element's magnet, in container order.
    pub fn element_extents(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.elements
            .iter()
            .zip(&self.z)
            .map(|(element, center)| {
                let half = 0.5 * element.length();
                (center - half, center + half)
            })
    }

    /// `(z_min, z_max)` covered by magnetic field, or `None` for an empty container.
    pub fn longitudinal_extent(&self) -> Option<(f64, f64)> {
        self.element_extents()
            .reduce(|(lo, hi), (start, end)| (lo.min(start), hi.max(end)))
    }

    pub fn center(&self) -> f64 {
        self.longitudinal_extent()
            .map(|(start, end)| 0.5 * (start + end))
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticleMoments {
    pub x: f64,
    pub xp: f64,
    pub y: f64,
    pub yp: f64,
    pub z: f64,
    /// Relative energy (Lorentz factor).
    pub gamma: f64,
}

pub const SECOND_MOMENT_COUNT: usize = 11;

/// Central second-order moments of `(x, x', y, y', relative energy)`:
/// `[<xx>, <xx'>, <x'x'>, <yy>, <yy'>, <y'y'>, <xy>, <x'y>, <xy'>, <x'y'>, <(dE/E)^2>]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecondMoments(pub [f64; SECOND_MOMENT_COUNT]);

impl SecondMoments {
    const VARIANCE_INDICES: [(usize, &'static str); 5] = [
        (0, "<(x-<x>)^2>"),
        (2, "<(x'-<x'>)^2>"),
        (3, "<(y-<y>)^2>"),
        (5, "<(y'-<y'>)^2>"),
        (10, "<(E-<E>)^2>/<E>^2"),
    ];

    /// Moments of a beam without x-x', y-y' or cross-plane correlation.
    pub fn uncorrelated(
        sigma_x: f64,
        sigma_xp: f64,
        sigma_y: f64,
        sigma_yp: f64,
        relative_energy_spread: f64,
    ) -> Self {
        let mut moments = [0.0; SECOND_MOMENT_COUNT];
        moments[0] = sigma_x * sigma_x;
        moments[2] = sigma_xp * sigma_xp;
        moments[3] = sigma_y * sigma_y;
        moments[5] = sigma_yp * sigma_yp;
        moments[10] = relative_energy_spread * relative_energy_spread;
        Self(moments)
    }

    pub fn as_array(&self) -> &[f64; SECOND_MOMENT_COUNT] {
        &self.0
    }

    pub fn sigma_x(&self) -> f64 {
        self.0[0].max(0.0).sqrt()
    }

    pub fn sigma_xp(&self) -> f64 {
        self.0[2].max(0.0).sqrt()
    }

    pub fn sigma_y(&self) -> f64 {
        self.0[3].max(0.0).sqrt()
    }

    pub fn sigma_yp(&self) -> f64 {
        self.0[5].max(0.0).sqrt()
    }

    pub fn relative_energy_spread(&self) -> f64 {
        self.0[10].max(0.0).sqrt()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some((index, value)) = self
            .0
            .iter()
            .enumerate()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(UndulatorError::input_validation(
                "CONFIG.BEAM_MOMENTS",
                format!("second moment [{index}] must be finite, got {value}"),
            ));
        }
        for (index, label) in Self::VARIANCE_INDICES {
            if self.0[index] < 0.0 {
                return Err(UndulatorError::input_validation(
                    "CONFIG.BEAM_MOMENTS",
                    format!(
                        "variance {label} (second moment [{index}]) must be >= 0, got {}",
                        self.0[index]
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticleBeam {
    /// Average current [A].
    pub current: f64,
    pub first: ParticleMoments,
    pub second: SecondMoments,
}

impl ParticleBeam {
    pub fn energy_gev(&self) -> f64 {
        self.first.gamma * ELECTRON_REST_ENERGY_GEV
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.current.is_finite() || self.current < 0.0 {
            return Err(UndulatorError::input_validation(
                "CONFIG.BEAM_CURRENT",
                format!("beam current must be finite and >= 0, got {}", self.current),
            ));
        }
        if !self.first.gamma.is_finite() || self.first.gamma <= 1.0 {
            return Err(UndulatorError::input_validation(
                "CONFIG.BEAM_ENERGY",
                format!(
                    "beam relative energy gamma must be finite and > 1, got {}",
                    self.first.gamma
                ),
            ));
        }
        self.second.validate()
    }
}

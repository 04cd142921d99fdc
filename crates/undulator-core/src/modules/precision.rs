//! Positional precision vectors for the flux, power-density and trajectory
//! calculations. Numeric ranges are checked by the engine, not here.

use crate::domain::{ConfigResult, UndulatorError};
use serde::{Deserialize, Serialize};

pub const FLUX_PRECISION_LEN: usize = 5;
pub const POWER_DENSITY_PRECISION_LEN: usize = 5;
pub const TRAJECTORY_PRECISION_LEN: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FluxQuantity {
    /// Flux through the aperture [ph/s/.1%bw].
    Flux,
    /// Flux per unit surface at each mesh point [ph/s/.1%bw/mm^2].
    FluxPerUnitArea,
}

impl FluxQuantity {
    pub const fn code(self) -> f64 {
        match self {
            Self::Flux => 1.0,
            Self::FluxPerUnitArea => 2.0,
        }
    }

    fn from_code(code: f64) -> Option<Self> {
        [Self::Flux, Self::FluxPerUnitArea]
            .into_iter()
            .find(|quantity| quantity.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerDensityMethod {
    NearField,
    FarField,
}

impl PowerDensityMethod {
    pub const fn code(self) -> f64 {
        match self {
            Self::NearField => 1.0,
            Self::FarField => 2.0,
        }
    }

    fn from_code(code: f64) -> Option<Self> {
        [Self::NearField, Self::FarField]
            .into_iter()
            .find(|method| method.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrajectoryMethod {
    #[default]
    RungeKutta4,
}

impl TrajectoryMethod {
    pub const fn code(self) -> f64 {
        match self {
            Self::RungeKutta4 => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FluxPrecision {
    pub initial_harmonic: u32,
    pub final_harmonic: u32,
    pub longitudinal_precision: f64,
    pub azimuthal_precision: f64,
    pub quantity: FluxQuantity,
}

impl Default for FluxPrecision {
    fn default() -> Self {
        Self {
            initial_harmonic: 1,
            final_harmonic: 21,
            longitudinal_precision: 1.5,
            azimuthal_precision: 1.5,
            quantity: FluxQuantity::Flux,
        }
    }
}

impl FluxPrecision {
    pub fn as_vector(&self) -> [f64; FLUX_PRECISION_LEN] {
        [
            f64::from(self.initial_harmonic),
            f64::from(self.final_harmonic),
            self.longitudinal_precision,
            self.azimuthal_precision,
            self.quantity.code(),
        ]
    }

    pub fn from_vector(values: &[f64]) -> ConfigResult<Self> {
        let values = fixed_length::<FLUX_PRECISION_LEN>("flux", values)?;
        let quantity = FluxQuantity::from_code(values[4]).ok_or_else(|| {
            UndulatorError::input_validation(
                "CONFIG.FLUX_PRECISION",
                format!(
                    "flux quantity selector must be 1 (flux) or 2 (flux per unit area), got {}",
                    values[4]
                ),
            )
        })?;
        Ok(Self {
            initial_harmonic: harmonic_number("initial", values[0])?,
            final_harmonic: harmonic_number("final", values[1])?,
            longitudinal_precision: values[2],
            azimuthal_precision: values[3],
            quantity,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PowerDensityPrecision {
    pub precision_factor: f64,
    pub method: PowerDensityMethod,
    pub z_start: f64,
    pub z_end: f64,
    pub trajectory_points: u32,
}

impl Default for PowerDensityPrecision {
    fn default() -> Self {
        Self {
            precision_factor: 1.5,
            method: PowerDensityMethod::NearField,
            z_start: 0.0,
            z_end: 0.0,
            trajectory_points: 20_000,
        }
    }
}

impl PowerDensityPrecision {
    pub fn as_vector(&self) -> [f64; POWER_DENSITY_PRECISION_LEN] {
        [
            self.precision_factor,
            self.method.code(),
            self.z_start,
            self.z_end,
            f64::from(self.trajectory_points),
        ]
    }

    pub fn from_vector(values: &[f64]) -> ConfigResult<Self> {
        let values = fixed_length::<POWER_DENSITY_PRECISION_LEN>("power density", values)?;
        let method = PowerDensityMethod::from_code(values[1]).ok_or_else(|| {
            UndulatorError::input_validation(
                "CONFIG.POWER_PRECISION",
                format!(
                    "power density method must be 1 (near field) or 2 (far field), got {}",
                    values[1]
                ),
            )
        })?;
        let points = values[4];
        if !(points.is_finite() && points >= 0.0 && points <= f64::from(u32::MAX)) {
            return Err(UndulatorError::input_validation(
                "CONFIG.POWER_PRECISION",
                format!("trajectory point count must be a non-negative integer, got {points}"),
            ));
        }
        Ok(Self {
            precision_factor: values[0],
            method,
            z_start: values[2],
            z_end: values[3],
            trajectory_points: points.round() as u32,
        })
    }

    /// Longitudinal integration window, effective only when `z_start < z_end`.
    pub fn longitudinal_window(&self) -> Option<(f64, f64)> {
        (self.z_start < self.z_end).then_some((self.z_start, self.z_end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrajectoryPrecision {
    pub method: TrajectoryMethod,
}

impl TrajectoryPrecision {
    pub fn as_vector(&self) -> [f64; TRAJECTORY_PRECISION_LEN] {
        [self.method.code()]
    }

    pub fn from_vector(values: &[f64]) -> ConfigResult<Self> {
        let values = fixed_length::<TRAJECTORY_PRECISION_LEN>("trajectory", values)?;
        if values[0] != TrajectoryMethod::RungeKutta4.code() {
            return Err(UndulatorError::input_validation(
                "CONFIG.TRAJECTORY_PRECISION",
                format!(
                    "trajectory integration method must be 1 (Runge-Kutta), got {}",
                    values[0]
                ),
            ));
        }
        Ok(Self {
            method: TrajectoryMethod::RungeKutta4,
        })
    }
}

fn fixed_length<const N: usize>(label: &str, values: &[f64]) -> ConfigResult<[f64; N]> {
    <[f64; N]>::try_from(values).map_err(|_| {
        UndulatorError::input_validation(
            "CONFIG.PRECISION_LENGTH",
            format!(
                "{label} precision vector must have {N} elements, got {}",
                values.len()
            ),
        )
    })
}

fn harmonic_number(label: &str, value: f64) -> ConfigResult<u32> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Ok(value as u32)
    } else {
        Err(UndulatorError::input_validation(
            "CONFIG.FLUX_PRECISION",
            format!("{label} harmonic must be a non-negative integer, got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        FluxPrecision, FluxQuantity, PowerDensityMethod, PowerDensityPrecision,
        TrajectoryPrecision,
    };

    #[test]
    fn default_vectors_follow_positional_layout() {
        assert_eq!(
            FluxPrecision::default().as_vector(),
            [1.0, 21.0, 1.5, 1.5, 1.0]
        );
        assert_eq!(
            PowerDensityPrecision::default().as_vector(),
            [1.5, 1.0, 0.0, 0.0, 20_000.0]
        );
        assert_eq!(TrajectoryPrecision::default().as_vector(), [1.0]);
    }

    #[test]
    fn vectors_decode_selectors() {
        let flux = FluxPrecision::from_vector(&[3.0, 7.0, 1.0, 2.0, 2.0])
            .expect("flux vector should decode");
        assert_eq!(flux.initial_harmonic, 3);
        assert_eq!(flux.final_harmonic, 7);
        assert_eq!(flux.quantity, FluxQuantity::FluxPerUnitArea);

        let power = PowerDensityPrecision::from_vector(&[1.0, 2.0, -1.0, 1.0, 500.0])
            .expect("power vector should decode");
        assert_eq!(power.method, PowerDensityMethod::FarField);
        assert_eq!(power.longitudinal_window(), Some((-1.0, 1.0)));
        assert_eq!(power.trajectory_points, 500);
    }

    #[test]
    fn inactive_window_when_start_not_below_end() {
        assert_eq!(PowerDensityPrecision::default().longitudinal_window(), None);
    }

    #[test]
    fn malformed_vectors_are_rejected() {
        let short = FluxPrecision::from_vector(&[1.0, 2.0]).expect_err("short vector fails");
        assert_eq!(short.placeholder(), "CONFIG.PRECISION_LENGTH");

        let selector = PowerDensityPrecision::from_vector(&[1.0, 3.0, 0.0, 0.0, 10.0])
            .expect_err("unknown method fails");
        assert_eq!(selector.placeholder(), "CONFIG.POWER_PRECISION");

        let harmonic =
            FluxPrecision::from_vector(&[1.5, 2.0, 1.0, 1.0, 1.0]).expect_err("fractional harmonic");
        assert_eq!(harmonic.placeholder(), "CONFIG.FLUX_PRECISION");

        assert!(TrajectoryPrecision::from_vector(&[2.0]).is_err());
    }
}

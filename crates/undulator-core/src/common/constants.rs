//! Physical constants in SI units shared by the source model and the analytic engine.
//!
//! The electron rest energy keeps the value the reference beam definition was
//! written against, so `gamma` for a 3 GeV beam reproduces the historical input.

pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;
pub const ELECTRON_MASS: f64 = 9.109_383_701_5e-31;
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
pub const VACUUM_PERMITTIVITY: f64 = 8.854_187_812_8e-12;
pub const ELECTRON_REST_ENERGY_GEV: f64 = 0.510_998_902_21e-3;
/// Planck constant times speed of light [eV m].
pub const HC_EV_M: f64 = 1.239_841_984e-6;
/// On-axis angular flux density prefactor [ph/s/mrad^2/0.1%bw per (GeV^2 A)].
pub const ANGULAR_FLUX_DENSITY_PREFACTOR: f64 = 1.744e14;
pub const MM_PER_M: f64 = 1.0e3;
pub const MRAD_PER_RAD: f64 = 1.0e3;

#[cfg(test)]
mod tests {
    use super::{
        ANGULAR_FLUX_DENSITY_PREFACTOR, ELECTRON_MASS, ELECTRON_REST_ENERGY_GEV, ELEMENTARY_CHARGE,
        HC_EV_M, SPEED_OF_LIGHT, VACUUM_PERMITTIVITY,
    };

    #[test]
    fn rest_energy_matches_mass_energy_relation() {
        let rest_energy_gev =
            ELECTRON_MASS * SPEED_OF_LIGHT * SPEED_OF_LIGHT / ELEMENTARY_CHARGE * 1.0e-9;
        let relative = (rest_energy_gev - ELECTRON_REST_ENERGY_GEV).abs() / ELECTRON_REST_ENERGY_GEV;
        assert!(relative < 2.0e-7, "relative mismatch {relative}");
    }

    #[test]
    fn physics_constants_remain_finite_and_positive() {
        for value in [
            ELEMENTARY_CHARGE,
            ELECTRON_MASS,
            SPEED_OF_LIGHT,
            VACUUM_PERMITTIVITY,
            HC_EV_M,
            ANGULAR_FLUX_DENSITY_PREFACTOR,
        ] {
            assert!(value.is_finite());
            assert!(value > 0.0);
        }
    }
}

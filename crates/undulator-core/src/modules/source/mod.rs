//! Undulator and electron-beam source description.

pub mod model;

pub use model::{
    FieldContainer, FieldPlane, MagneticFieldHarmonic, ParticleBeam, ParticleMoments,
    SECOND_MOMENT_COUNT, SecondMoments, Undulator,
};

use crate::common::constants::ELECTRON_REST_ENERGY_GEV;
use crate::domain::ConfigResult;

pub const REFERENCE_PERIOD_M: f64 = 0.02;
pub const REFERENCE_PERIODS: u32 = 150;
pub const REFERENCE_FIELD_T: f64 = 1.0;

pub const REFERENCE_CURRENT_A: f64 = 0.5;
pub const REFERENCE_ENERGY_GEV: f64 = 3.0;
pub const REFERENCE_SIGMA_X_M: f64 = 33.33e-6;
pub const REFERENCE_SIGMA_XP_RAD: f64 = 16.5e-6;
pub const REFERENCE_SIGMA_Y_M: f64 = 2.912e-6;
pub const REFERENCE_SIGMA_YP_RAD: f64 = 2.7472e-6;
pub const REFERENCE_ENERGY_SPREAD: f64 = 0.00089;

/// Planar undulator: 2 cm period, 150 periods, 1 T vertical field.
pub fn reference_undulator() -> Undulator {
    Undulator::new(
        REFERENCE_PERIOD_M,
        REFERENCE_PERIODS,
        vec![MagneticFieldHarmonic::new(
            1,
            FieldPlane::Vertical,
            REFERENCE_FIELD_T,
        )],
    )
}

/// 3 GeV, 0.5 A beam starting on axis at the undulator centre.
pub fn reference_beam() -> ParticleBeam {
    ParticleBeam {
        current: REFERENCE_CURRENT_A,
        first: ParticleMoments {
            gamma: REFERENCE_ENERGY_GEV / ELECTRON_REST_ENERGY_GEV,
            ..ParticleMoments::default()
        },
        second: SecondMoments::uncorrelated(
            REFERENCE_SIGMA_X_M,
            REFERENCE_SIGMA_XP_RAD,
            REFERENCE_SIGMA_Y_M,
            REFERENCE_SIGMA_YP_RAD,
            REFERENCE_ENERGY_SPREAD,
        ),
    }
}

/// Validated source description handed to the compute engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceModels {
    pub undulator: Undulator,
    pub fields: FieldContainer,
    pub beam: ParticleBeam,
}

impl SourceModels {
    pub fn build(undulator: &Undulator, beam: &ParticleBeam) -> ConfigResult<Self> {
        undulator.validate()?;
        beam.validate()?;
        let fields = FieldContainer::single(undulator.clone())?;
        Ok(Self {
            undulator: undulator.clone(),
            fields,
            beam: *beam,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{SourceModels, reference_beam, reference_undulator};

    #[test]
    fn reference_beam_reproduces_three_gev_gamma() {
        let beam = reference_beam();
        assert!((beam.first.gamma - 5_870.854_100).abs() < 1.0e-3);
        assert!((beam.energy_gev() - 3.0).abs() < 1.0e-12);
        assert_eq!(beam.second.0[0], 33.33e-6 * 33.33e-6);
        assert_eq!(beam.second.0[1], 0.0);
        assert_eq!(beam.second.0[10], 0.00089 * 0.00089);
    }

    #[test]
    fn build_places_single_undulator_at_origin() {
        let models = SourceModels::build(&reference_undulator(), &reference_beam())
            .expect("reference models should build");
        assert_eq!(models.fields.len(), 1);
        assert_eq!(models.fields.offset(0), Some([0.0, 0.0, 0.0]));
        assert_eq!(models.fields.elements()[0], models.undulator);
    }

    #[test]
    fn build_rejects_zero_period_count() {
        let mut undulator = reference_undulator();
        undulator.periods = 0;
        let error = SourceModels::build(&undulator, &reference_beam())
            .expect_err("zero periods should fail");
        assert_eq!(error.placeholder(), "CONFIG.UNDULATOR_PERIODS");
    }
}

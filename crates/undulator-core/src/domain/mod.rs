pub mod errors;

pub use errors::{
    ComputeResult, ConfigResult, ExitStatusMapping, UndulatorError, UndulatorErrorCategory,
    UndulatorResult,
};

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalculationKind {
    SpectralFlux,
    PowerDensity,
    Trajectory,
}

impl CalculationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpectralFlux => "FLUX",
            Self::PowerDensity => "POWER",
            Self::Trajectory => "TRAJECTORY",
        }
    }
}

impl Display for CalculationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// A file produced by a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeArtifact {
    pub kind: CalculationKind,
    pub path: PathBuf,
    pub data_lines: usize,
}

impl ComputeArtifact {
    pub fn new(kind: CalculationKind, path: impl Into<PathBuf>, data_lines: usize) -> Self {
        Self {
            kind,
            path: path.into(),
            data_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CalculationKind, ComputeArtifact};

    #[test]
    fn calculation_kind_renders_stable_tags() {
        assert_eq!(CalculationKind::SpectralFlux.to_string(), "FLUX");
        assert_eq!(CalculationKind::PowerDensity.to_string(), "POWER");
        assert_eq!(CalculationKind::Trajectory.as_str(), "TRAJECTORY");
    }

    #[test]
    fn artifact_keeps_kind_and_path() {
        let artifact = ComputeArtifact::new(CalculationKind::PowerDensity, "out/pow.dat", 10201);
        assert_eq!(artifact.kind, CalculationKind::PowerDensity);
        assert_eq!(artifact.path, std::path::PathBuf::from("out/pow.dat"));
        assert_eq!(artifact.data_lines, 10201);
    }
}

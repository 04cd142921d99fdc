pub mod model;

pub use model::{ParticleTrajectory, TrajectoryWindow};

use crate::modules::source::ParticleMoments;
use serde::{Deserialize, Serialize};

/// Sampling window of a trajectory calculation in `ct` [m].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrajectoryWindow {
    pub points: usize,
    pub ct_start: f64,
    pub ct_end: f64,
}

impl Default for TrajectoryWindow {
    fn default() -> Self {
        Self {
            points: 20_001,
            ct_start: -1.6,
            ct_end: 1.6,
        }
    }
}

/// Particle trajectory sampled uniformly in `ct` between `ct_start` and `ct_end`.
/// `xp`, `yp` and `zp` hold the relative velocities `beta_x`, `beta_y`, `beta_z`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleTrajectory {
    pub initial: ParticleMoments,
    pub ct_start: f64,
    pub ct_end: f64,
    pub x: Vec<f64>,
    pub xp: Vec<f64>,
    pub y: Vec<f64>,
    pub yp: Vec<f64>,
    pub z: Vec<f64>,
    pub zp: Vec<f64>,
}

impl ParticleTrajectory {
    pub fn allocate(points: usize) -> Self {
        Self {
            initial: ParticleMoments::default(),
            ct_start: 0.0,
            ct_end: 0.0,
            x: vec![0.0; points],
            xp: vec![0.0; points],
            y: vec![0.0; points],
            yp: vec![0.0; points],
            z: vec![0.0; points],
            zp: vec![0.0; points],
        }
    }

    pub fn with_window(initial: ParticleMoments, window: TrajectoryWindow) -> Self {
        let mut trajectory = Self::allocate(window.points);
        trajectory.initial = initial;
        trajectory.ct_start = window.ct_start;
        trajectory.ct_end = window.ct_end;
        trajectory
    }

    pub fn np(&self) -> usize {
        self.x.len()
    }

    /// Sample spacing in `ct`; zero when fewer than two samples exist.
    pub fn ct_step(&self) -> f64 {
        let np = self.np();
        if np > 1 {
            (self.ct_end - self.ct_start) / (np - 1) as f64
        } else {
            0.0
        }
    }

    pub fn ct_at(&self, index: usize) -> f64 {
        self.ct_start + index as f64 * self.ct_step()
    }

    pub fn columns_consistent(&self) -> bool {
        let np = self.np();
        [&self.xp, &self.y, &self.yp, &self.z, &self.zp]
            .iter()
            .all(|column| column.len() == np)
    }
}

#[cfg(test)]
mod tests {
    use super::{ParticleTrajectory, TrajectoryWindow};
    use crate::modules::source::ParticleMoments;

    #[test]
    fn allocation_zero_fills_every_column() {
        let trajectory = ParticleTrajectory::allocate(4);
        assert_eq!(trajectory.np(), 4);
        assert!(trajectory.columns_consistent());
        assert!(trajectory.zp.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn ct_grid_is_uniform_between_window_edges() {
        let trajectory = ParticleTrajectory::with_window(
            ParticleMoments::default(),
            TrajectoryWindow {
                points: 5,
                ct_start: -1.0,
                ct_end: 1.0,
            },
        );
        assert_eq!(trajectory.ct_step(), 0.5);
        assert_eq!(trajectory.ct_at(0), -1.0);
        assert_eq!(trajectory.ct_at(4), 1.0);
    }

    #[test]
    fn single_sample_has_zero_step() {
        let trajectory = ParticleTrajectory::with_window(
            ParticleMoments::default(),
            TrajectoryWindow {
                points: 1,
                ct_start: 0.25,
                ct_end: 3.0,
            },
        );
        assert_eq!(trajectory.ct_step(), 0.0);
        assert_eq!(trajectory.ct_at(0), 0.25);
    }
}

use crate::domain::{ConfigResult, UndulatorError};
use serde::{Deserialize, Serialize};

pub const STOKES_COMPONENTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StokesComponent {
    S0,
    S1,
    S2,
    S3,
}

impl StokesComponent {
    pub const fn index(self) -> usize {
        match self {
            Self::S0 => 0,
            Self::S1 => 1,
            Self::S2 => 2,
            Self::S3 => 3,
        }
    }
}

/// Observation mesh: photon energies [eV], transverse positions [m] and the
/// longitudinal position [m] of the observation plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeshBounds {
    pub z_start: f64,
    pub e_start: f64,
    pub e_fin: f64,
    pub x_start: f64,
    pub x_fin: f64,
    pub y_start: f64,
    pub y_fin: f64,
}

/// Validated `(ne, nx, ny)` mesh shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    pub ne: usize,
    pub nx: usize,
    pub ny: usize,
}

impl GridShape {
    /// Converts signed point counts, rejecting negative values.
    pub fn from_signed(ne: i64, nx: i64, ny: i64) -> ConfigResult<Self> {
        Ok(Self {
            ne: dimension("ne", ne)?,
            nx: dimension("nx", nx)?,
            ny: dimension("ny", ny)?,
        })
    }

    pub fn point_count(&self) -> Option<usize> {
        self.ne.checked_mul(self.nx)?.checked_mul(self.ny)
    }
}

fn dimension(label: &'static str, value: i64) -> ConfigResult<usize> {
    usize::try_from(value).map_err(|_| {
        UndulatorError::input_validation(
            "CONFIG.GRID_SHAPE",
            format!("mesh dimension '{label}' must be non-negative, got {value}"),
        )
    })
}

/// Stokes parameters on an `(energy, x, y)` mesh.
///
/// Storage is component-major: component `c` occupies
/// `[c * points, (c + 1) * points)` and the point `(ie, ix, iy)` sits at
/// `((iy * nx) + ix) * ne + ie` inside a component.
#[derive(Debug, Clone, PartialEq)]
pub struct StokesGrid {
    ne: usize,
    nx: usize,
    ny: usize,
    pub mesh: MeshBounds,
    data: Vec<f32>,
}

impl StokesGrid {
    pub fn allocate(ne: usize, nx: usize, ny: usize) -> ConfigResult<Self> {
        let shape = GridShape { ne, nx, ny };
        let storage = shape
            .point_count()
            .and_then(|points| points.checked_mul(STOKES_COMPONENTS))
            .filter(|length| {
                length
                    .checked_mul(std::mem::size_of::<f32>())
                    .is_some_and(|bytes| bytes <= isize::MAX as usize)
            })
            .ok_or_else(|| {
                UndulatorError::input_validation(
                    "CONFIG.GRID_SHAPE",
                    format!(
                        "Stokes storage for mesh {ne}x{nx}x{ny} overflows addressable memory"
                    ),
                )
            })?;
        Ok(Self {
            ne,
            nx,
            ny,
            mesh: MeshBounds::default(),
            data: vec![0.0; storage],
        })
    }

    pub fn allocate_shape(shape: GridShape, mesh: MeshBounds) -> ConfigResult<Self> {
        let mut grid = Self::allocate(shape.ne, shape.nx, shape.ny)?;
        grid.mesh = mesh;
        Ok(grid)
    }

    pub fn energy_points(&self) -> usize {
        self.ne
    }

    pub fn x_points(&self) -> usize {
        self.nx
    }

    pub fn y_points(&self) -> usize {
        self.ny
    }

    pub fn shape(&self) -> GridShape {
        GridShape {
            ne: self.ne,
            nx: self.nx,
            ny: self.ny,
        }
    }

    pub fn point_count(&self) -> usize {
        self.ne * self.nx * self.ny
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn component(&self, component: StokesComponent) -> &[f32] {
        let points = self.point_count();
        let start = component.index() * points;
        &self.data[start..start + points]
    }

    pub fn component_mut(&mut self, component: StokesComponent) -> &mut [f32] {
        let points = self.point_count();
        let start = component.index() * points;
        &mut self.data[start..start + points]
    }

    pub fn s0(&self) -> &[f32] {
        self.component(StokesComponent::S0)
    }

    pub fn point_index(&self, ie: usize, ix: usize, iy: usize) -> usize {
        (iy * self.nx + ix) * self.ne + ie
    }

    pub fn value(&self, component: StokesComponent, ie: usize, ix: usize, iy: usize) -> f32 {
        self.component(component)[self.point_index(ie, ix, iy)]
    }

    pub fn set(&mut self, component: StokesComponent, ie: usize, ix: usize, iy: usize, value: f32) {
        let index = self.point_index(ie, ix, iy);
        self.component_mut(component)[index] = value;
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    pub fn energy_at(&self, ie: usize) -> f64 {
        axis_point(self.mesh.e_start, self.mesh.e_fin, self.ne, ie)
    }

    pub fn x_at(&self, ix: usize) -> f64 {
        axis_point(self.mesh.x_start, self.mesh.x_fin, self.nx, ix)
    }

    pub fn y_at(&self, iy: usize) -> f64 {
        axis_point(self.mesh.y_start, self.mesh.y_fin, self.ny, iy)
    }

    pub fn x_step(&self) -> f64 {
        axis_step(self.mesh.x_start, self.mesh.x_fin, self.nx)
    }

    pub fn y_step(&self) -> f64 {
        axis_step(self.mesh.y_start, self.mesh.y_fin, self.ny)
    }
}

/// `start + index * (fin - start) / (points - 1)`, or `start` for a single point.
pub fn axis_point(start: f64, fin: f64, points: usize, index: usize) -> f64 {
    start + index as f64 * axis_step(start, fin, points)
}

pub fn axis_step(start: f64, fin: f64, points: usize) -> f64 {
    if points > 1 {
        (fin - start) / (points - 1) as f64
    } else {
        0.0
    }
}

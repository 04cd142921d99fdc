pub mod model;

pub use model::{
    GridShape, MeshBounds, STOKES_COMPONENTS, StokesComponent, StokesGrid, axis_point, axis_step,
};

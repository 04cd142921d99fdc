pub mod analytic;
pub mod grid;
pub mod pipeline;
pub mod precision;
pub mod serialization;
pub mod source;
pub mod trajectory;

mod traits;

pub use analytic::AnalyticEngine;
pub use pipeline::{RunConfig, run_pipeline};
pub use traits::{ComputeEngine, RadiationSource};

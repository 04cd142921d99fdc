pub mod bessel;
pub mod convolution;
pub mod error_function;

pub use bessel::{bessel_j, bessel_j_sequence};
pub use convolution::{
    ConvolutionError, GaussianAxis, GaussianSmoothingInput, gaussian_kernel, gaussian_smooth_2d,
};
pub use error_function::{erf, erfc, normal_interval_probability};

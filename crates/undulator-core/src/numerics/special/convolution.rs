const KERNEL_CUTOFF_SIGMAS: f64 = 5.0;
const NEGLIGIBLE_WIDTH_FRACTION: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianAxis {
    pub points: usize,
    pub step: f64,
    pub sigma: f64,
}

impl GaussianAxis {
    pub fn new(points: usize, step: f64, sigma: f64) -> Self {
        Self {
            points,
            step,
            sigma,
        }
    }

    fn is_identity(&self) -> bool {
        self.points < 2 || self.sigma <= NEGLIGIBLE_WIDTH_FRACTION * self.step.abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianSmoothingInput<'a> {
    /// Row-major field, `x` fastest.
    pub field: &'a [f64],
    pub x_axis: GaussianAxis,
    pub y_axis: GaussianAxis,
}

impl<'a> GaussianSmoothingInput<'a> {
    pub fn new(field: &'a [f64], x_axis: GaussianAxis, y_axis: GaussianAxis) -> Self {
        Self {
            field,
            x_axis,
            y_axis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvolutionError {
    #[error("field length {actual} does not match {nx}x{ny} grid")]
    LengthMismatch { actual: usize, nx: usize, ny: usize },
    #[error("gaussian width for axis '{axis}' must be finite and >= 0, got {value}")]
    InvalidSigma { axis: &'static str, value: f64 },
    #[error("grid step for axis '{axis}' must be finite and non-zero, got {value}")]
    InvalidStep { axis: &'static str, value: f64 },
}

/// Normalized Gaussian weights for integer offsets `-m..=m` on a grid of spacing `step`.
pub fn gaussian_kernel(sigma: f64, step: f64) -> Vec<f64> {
    let half_width = (KERNEL_CUTOFF_SIGMAS * sigma / step.abs()).ceil() as usize;
    let mut weights = (0..=2 * half_width)
        .map(|index| {
            let offset = (index as f64 - half_width as f64) * step;
            (-0.5 * (offset / sigma).powi(2)).exp()
        })
        .collect::<Vec<_>>();
    let total: f64 = weights.iter().sum();
    for weight in weights.iter_mut() {
        *weight /= total;
    }
    weights
}

/// Separable Gaussian smoothing of a 2D field. Mass that spreads beyond the grid
/// edges is lost rather than renormalized back into the grid.
pub fn gaussian_smooth_2d(input: GaussianSmoothingInput<'_>) -> Result<Vec<f64>, ConvolutionError> {
    let nx = input.x_axis.points;
    let ny = input.y_axis.points;
    if input.field.len() != nx * ny {
        return Err(ConvolutionError::LengthMismatch {
            actual: input.field.len(),
            nx,
            ny,
        });
    }
    validate_axis("x", input.x_axis)?;
    validate_axis("y", input.y_axis)?;

    let mut field = input.field.to_vec();
    if !input.x_axis.is_identity() {
        let kernel = gaussian_kernel(input.x_axis.sigma, input.x_axis.step);
        for row in 0..ny {
            convolve_strided(&mut field, row * nx, 1, nx, &kernel);
        }
    }
    if !input.y_axis.is_identity() {
        let kernel = gaussian_kernel(input.y_axis.sigma, input.y_axis.step);
        for column in 0..nx {
            convolve_strided(&mut field, column, nx, ny, &kernel);
        }
    }
    Ok(field)
}

fn validate_axis(axis: &'static str, grid_axis: GaussianAxis) -> Result<(), ConvolutionError> {
    if !grid_axis.sigma.is_finite() || grid_axis.sigma < 0.0 {
        return Err(ConvolutionError::InvalidSigma {
            axis,
            value: grid_axis.sigma,
        });
    }
    if grid_axis.points >= 2 && (!grid_axis.step.is_finite() || grid_axis.step == 0.0) {
        return Err(ConvolutionError::InvalidStep {
            axis,
            value: grid_axis.step,
        });
    }
    Ok(())
}

fn convolve_strided(field: &mut [f64], offset: usize, stride: usize, count: usize, kernel: &[f64]) {
    let half_width = (kernel.len() / 2) as isize;
    let line = (0..count)
        .map(|index| field[offset + index * stride])
        .collect::<Vec<_>>();

    for index in 0..count {
        let mut sum = 0.0;
        for (kernel_index, weight) in kernel.iter().enumerate() {
            let source = index as isize + kernel_index as isize - half_width;
            if source >= 0 && (source as usize) < count {
                sum += weight * line[source as usize];
            }
        }
        field[offset + index * stride] = sum;
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConvolutionError, GaussianAxis, GaussianSmoothingInput, gaussian_kernel,
        gaussian_smooth_2d,
    };

    #[test]
    fn kernel_is_symmetric_and_normalized() {
        let kernel = gaussian_kernel(2.0, 1.0);
        assert_eq!(kernel.len() % 2, 1);
        let total: f64 = kernel.iter().sum();
        assert!((total - 1.0).abs() < 1.0e-14);
        for index in 0..kernel.len() / 2 {
            assert_eq!(kernel[index], kernel[kernel.len() - 1 - index]);
        }
    }

    #[test]
    fn smoothing_spreads_a_point_source_but_keeps_interior_mass() {
        let nx = 41;
        let ny = 41;
        let mut field = vec![0.0; nx * ny];
        field[20 * nx + 20] = 1.0;

        let smoothed = gaussian_smooth_2d(GaussianSmoothingInput::new(
            &field,
            GaussianAxis::new(nx, 0.1, 0.3),
            GaussianAxis::new(ny, 0.1, 0.2),
        ))
        .expect("smoothing should succeed");

        let total: f64 = smoothed.iter().sum();
        assert!((total - 1.0).abs() < 1.0e-12);
        assert!(smoothed[20 * nx + 20] < 1.0);
        assert!(smoothed[20 * nx + 21] > 0.0);
        assert!((smoothed[20 * nx + 19] - smoothed[20 * nx + 21]).abs() < 1.0e-15);
    }

    #[test]
    fn negligible_width_leaves_field_untouched() {
        let field = vec![1.0, 2.0, 3.0, 4.0];
        let smoothed = gaussian_smooth_2d(GaussianSmoothingInput::new(
            &field,
            GaussianAxis::new(4, 1.0, 0.0),
            GaussianAxis::new(1, 0.0, 5.0),
        ))
        .expect("identity smoothing should succeed");
        assert_eq!(smoothed, field);
    }

    #[test]
    fn mismatched_field_length_is_rejected() {
        let field = vec![0.0; 5];
        let error = gaussian_smooth_2d(GaussianSmoothingInput::new(
            &field,
            GaussianAxis::new(2, 1.0, 1.0),
            GaussianAxis::new(2, 1.0, 1.0),
        ))
        .expect_err("length mismatch should fail");
        assert_eq!(
            error,
            ConvolutionError::LengthMismatch {
                actual: 5,
                nx: 2,
                ny: 2
            }
        );
    }
}

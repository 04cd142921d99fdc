use std::f64::consts::PI;

const SERIES_CUTOFF: f64 = 3.0;
const SERIES_MAX_ITER: usize = 200;
const SERIES_REL_TOL: f64 = 1.0e-17;
const CONTINUED_FRACTION_TERMS: usize = 60;

/// Error function: Maclaurin series below |x| = 3, continued fraction above.
pub fn erf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x < 0.0 {
        return -erf(-x);
    }
    if x < SERIES_CUTOFF {
        erf_series(x)
    } else {
        1.0 - erfc_continued_fraction(x)
    }
}

pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }
    if x < SERIES_CUTOFF {
        1.0 - erf_series(x)
    } else {
        erfc_continued_fraction(x)
    }
}

/// Probability mass of a normal distribution `N(mean, sigma)` inside `[lower, upper]`.
/// A zero `sigma` degenerates to the indicator of the interval.
pub fn normal_interval_probability(lower: f64, upper: f64, mean: f64, sigma: f64) -> f64 {
    if upper <= lower {
        return 0.0;
    }
    if sigma <= 0.0 {
        return if mean >= lower && mean <= upper { 1.0 } else { 0.0 };
    }
    let scale = std::f64::consts::SQRT_2 * sigma;
    0.5 * (erf((upper - mean) / scale) - erf((lower - mean) / scale))
}

fn erf_series(x: f64) -> f64 {
    let x2 = x * x;
    let mut term = x;
    let mut sum = x;
    for k in 1..SERIES_MAX_ITER {
        term *= -x2 / k as f64;
        let contribution = term / (2 * k + 1) as f64;
        sum += contribution;
        if contribution.abs() <= SERIES_REL_TOL * sum.abs() {
            break;
        }
    }
    2.0 / PI.sqrt() * sum
}

fn erfc_continued_fraction(x: f64) -> f64 {
    let mut tail = x;
    for n in (1..=CONTINUED_FRACTION_TERMS).rev() {
        tail = x + (n as f64 * 0.5) / tail;
    }
    (-x * x).exp() / PI.sqrt() / tail
}

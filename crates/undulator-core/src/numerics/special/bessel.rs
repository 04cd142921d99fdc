const MILLER_START_PADDING: usize = 20;
const MILLER_START_SQRT_SCALE: f64 = 10.0;
const RESCALE_THRESHOLD: f64 = 1.0e250;
const RESCALE_FACTOR: f64 = 1.0e-250;
const MILLER_SEED: f64 = 1.0e-30;

/// Bessel function of the first kind `J_n(x)` for integer order.
pub fn bessel_j(order: usize, argument: f64) -> f64 {
    bessel_j_sequence(order, argument)[order]
}

/// `J_0(x) ..= J_max_order(x)` by Miller's downward recurrence, normalized
/// with `J_0 + 2 Σ J_2k = 1`.
pub fn bessel_j_sequence(max_order: usize, argument: f64) -> Vec<f64> {
    let mut values = vec![0.0; max_order + 1];
    if argument == 0.0 {
        values[0] = 1.0;
        return values;
    }
    if !argument.is_finite() {
        values.fill(f64::NAN);
        return values;
    }

    let ax = argument.abs();
    let top = max_order.max(ax.ceil() as usize);
    let mut start =
        top + MILLER_START_PADDING + (MILLER_START_SQRT_SCALE * (top as f64).sqrt()) as usize;
    if start % 2 == 1 {
        start += 1;
    }

    let mut next = 0.0;
    let mut current = MILLER_SEED;
    let mut norm = 0.0;
    for order in (1..=start).rev() {
        let previous = 2.0 * order as f64 / ax * current - next;
        next = current;
        current = previous;

        let lowered = order - 1;
        if lowered <= max_order {
            values[lowered] = current;
        }
        if lowered > 0 && lowered % 2 == 0 {
            norm += 2.0 * current;
        }

        if current.abs() > RESCALE_THRESHOLD {
            current *= RESCALE_FACTOR;
            next *= RESCALE_FACTOR;
            norm *= RESCALE_FACTOR;
            for value in values.iter_mut() {
                *value *= RESCALE_FACTOR;
            }
        }
    }
    norm += current;

    for (order, value) in values.iter_mut().enumerate() {
        *value /= norm;
        if argument < 0.0 && order % 2 == 1 {
            *value = -*value;
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::{bessel_j, bessel_j_sequence};

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn low_order_values_match_reference_table() {
        assert_close(bessel_j(0, 1.0), 0.765_197_686_557_966_6, 1.0e-13);
        assert_close(bessel_j(1, 1.0), 0.440_050_585_744_933_55, 1.0e-13);
        assert_close(bessel_j(2, 5.0), 0.046_565_116_277_752_22, 1.0e-13);
        assert_close(bessel_j(5, 10.0), -0.234_061_528_186_793_65, 1.0e-12);
    }

    #[test]
    fn high_order_small_argument_stays_accurate() {
        let value = bessel_j(10, 1.0);
        assert!((value - 2.630_615_123_687_453e-10).abs() / 2.630_615_123_687_453e-10 < 1.0e-9);
    }

    #[test]
    fn negative_argument_flips_odd_orders() {
        let positive = bessel_j_sequence(3, 2.5);
        let negative = bessel_j_sequence(3, -2.5);
        assert_close(negative[0], positive[0], 1.0e-15);
        assert_close(negative[1], -positive[1], 1.0e-15);
        assert_close(negative[2], positive[2], 1.0e-15);
        assert_close(negative[3], -positive[3], 1.0e-15);
    }

    #[test]
    fn zero_argument_is_kronecker_delta() {
        assert_eq!(bessel_j_sequence(2, 0.0), vec![1.0, 0.0, 0.0]);
    }
}

pub mod special;

/// Midpoint-rule nodes covering `[lower, upper]`; returns `(nodes, width)`.
pub fn midpoint_nodes(lower: f64, upper: f64, count: usize) -> (Vec<f64>, f64) {
    if count == 0 || upper <= lower {
        return (Vec::new(), 0.0);
    }
    let width = (upper - lower) / count as f64;
    let nodes = (0..count)
        .map(|index| lower + (index as f64 + 0.5) * width)
        .collect();
    (nodes, width)
}

// ---------------------------------------------------------------------------
// Pairwise-complete filtering
// ---------------------------------------------------------------------------

/// Keep mask for two aligned sequences: `true` where neither side is missing.
///
/// A position is dropped when either value is `NaN` (logical OR of the two
/// missingness masks).
pub fn complete_mask(x: &[f64], y: &[f64]) -> Vec<bool> {
    debug_assert_eq!(x.len(), y.len());
    x.iter()
        .zip(y.iter())
        .map(|(a, b)| !(a.is_nan() || b.is_nan()))
        .collect()
}

/// Return the elements of `x` and `y` at positions where both are present.
///
/// Order is preserved. When every position has a missing side, both outputs
/// are empty; callers decide what an empty sample means.
pub fn pairwise_complete(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    debug_assert_eq!(x.len(), y.len());
    x.iter()
        .zip(y.iter())
        .filter(|(a, b)| !(a.is_nan() || b.is_nan()))
        .map(|(&a, &b)| (a, b))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_positions_missing_on_either_side() {
        let x = [1.0, f64::NAN, 3.0, 4.0];
        let y = [1.0, 2.0, f64::NAN, 4.0];
        let (fx, fy) = pairwise_complete(&x, &y);
        assert_eq!(fx, vec![1.0, 4.0]);
        assert_eq!(fy, vec![1.0, 4.0]);
        assert_eq!(complete_mask(&x, &y), vec![true, false, false, true]);
    }

    #[test]
    fn all_missing_gives_empty() {
        let x = [f64::NAN, 2.0];
        let y = [1.0, f64::NAN];
        let (fx, fy) = pairwise_complete(&x, &y);
        assert!(fx.is_empty());
        assert!(fy.is_empty());
    }

    #[test]
    fn preserves_order() {
        let x = [5.0, 4.0, f64::NAN, 2.0, 1.0];
        let y = [0.1, 0.2, 0.3, 0.4, 0.5];
        let (fx, fy) = pairwise_complete(&x, &y);
        assert_eq!(fx, vec![5.0, 4.0, 2.0, 1.0]);
        assert_eq!(fy, vec![0.1, 0.2, 0.4, 0.5]);
    }
}

//! Reduction and elementwise primitives over a tile buffer.
//!
//! Reductions keep `lanes` independent partial accumulators, folded at the
//! end. The lane count comes from the launch plan and only changes the
//! association order of the sum, never which elements take part.

/// Upper bound on the lane hint honoured by the reductions.
pub const MAX_LANES: usize = 32;

/// Maximum of `buf`. Returns `-inf` for an empty or fully masked buffer.
pub fn max(buf: &[f32], lanes: usize) -> f32 {
    let lanes = lanes.clamp(1, MAX_LANES);
    let mut acc = [f32::NEG_INFINITY; MAX_LANES];

    let mut chunks = buf.chunks_exact(lanes);
    for chunk in &mut chunks {
        for (a, &v) in acc.iter_mut().zip(chunk) {
            *a = a.max(v);
        }
    }
    for (a, &v) in acc.iter_mut().zip(chunks.remainder()) {
        *a = a.max(v);
    }

    acc[..lanes].iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

/// Sum of `buf`.
pub fn sum(buf: &[f32], lanes: usize) -> f32 {
    let lanes = lanes.clamp(1, MAX_LANES);
    let mut acc = [0.0f32; MAX_LANES];

    let mut chunks = buf.chunks_exact(lanes);
    for chunk in &mut chunks {
        for (a, &v) in acc.iter_mut().zip(chunk) {
            *a += v;
        }
    }
    for (a, &v) in acc.iter_mut().zip(chunks.remainder()) {
        *a += v;
    }

    acc[..lanes].iter().sum()
}

/// `sum(exp(buf[i] - shift))` without modifying `buf`.
pub fn sum_exp(buf: &[f32], shift: f32, lanes: usize) -> f32 {
    let lanes = lanes.clamp(1, MAX_LANES);
    let mut acc = [0.0f32; MAX_LANES];

    let mut chunks = buf.chunks_exact(lanes);
    for chunk in &mut chunks {
        for (a, &v) in acc.iter_mut().zip(chunk) {
            *a += (v - shift).exp();
        }
    }
    for (a, &v) in acc.iter_mut().zip(chunks.remainder()) {
        *a += (v - shift).exp();
    }

    acc[..lanes].iter().sum()
}

/// The value subtracted before exponentiation.
///
/// A row whose maximum is `-inf` has no finite element at all; shifting by
/// zero keeps `exp(-inf) == 0` instead of producing `-inf - -inf = NaN`.
#[inline]
pub fn stable_shift(max: f32) -> f32 {
    if max == f32::NEG_INFINITY {
        0.0
    } else {
        max
    }
}

/// `buf[i] = exp(buf[i] - shift)`.
pub fn exp_shift_in_place(buf: &mut [f32], shift: f32) {
    for v in buf.iter_mut() {
        *v = (*v - shift).exp();
    }
}

/// `buf[i] /= sum`, or zeros when `sum` is not positive.
///
/// A zero sum only happens when every element was masked or `-inf`.
pub fn normalize_in_place(buf: &mut [f32], sum: f32) {
    if sum > 0.0 {
        for v in buf.iter_mut() {
            *v /= sum;
        }
    } else {
        buf.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const NEG_INF: f32 = f32::NEG_INFINITY;

    #[test]
    fn test_max_ignores_sentinel() {
        let buf = [1.0, 7.0, -3.0, NEG_INF, NEG_INF];
        for lanes in [1, 2, 4, 32, 64] {
            assert_eq!(max(&buf, lanes), 7.0);
        }
    }

    #[test]
    fn test_max_empty_and_masked() {
        assert_eq!(max(&[], 4), NEG_INF);
        assert_eq!(max(&[NEG_INF; 8], 4), NEG_INF);
    }

    #[test]
    fn test_sum_independent_of_lanes() {
        let buf: Vec<f32> = (1..=100).map(|i| i as f32).collect();
        for lanes in [1, 3, 4, 8, 16, 32] {
            assert_eq!(sum(&buf, lanes), 5050.0);
        }
        assert_eq!(sum(&[], 8), 0.0);
    }

    #[test]
    fn test_sum_exp_masked_contributes_zero() {
        let buf = [0.0, 0.0, NEG_INF, NEG_INF];
        assert_eq!(sum_exp(&buf, 0.0, 4), 2.0);
        assert_eq!(sum_exp(&[NEG_INF; 4], 0.0, 2), 0.0);
    }

    #[test]
    fn test_sum_exp_matches_explicit() {
        let buf = [0.5, -1.0, 2.0, 0.25, 3.0];
        let expected: f32 = buf.iter().map(|v| (v - 3.0f32).exp()).sum();
        assert_relative_eq!(sum_exp(&buf, 3.0, 4), expected, max_relative = 1e-6);
    }

    #[test]
    fn test_stable_shift() {
        assert_eq!(stable_shift(2.5), 2.5);
        assert_eq!(stable_shift(NEG_INF), 0.0);
    }

    #[test]
    fn test_exp_shift_and_normalize() {
        let mut buf = [1.0, 1.0, NEG_INF, NEG_INF];
        exp_shift_in_place(&mut buf, 1.0);
        assert_eq!(buf, [1.0, 1.0, 0.0, 0.0]);
        normalize_in_place(&mut buf, 2.0);
        assert_eq!(buf, [0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_normalize_zero_sum_is_guarded() {
        let mut buf = [0.0f32; 4];
        normalize_in_place(&mut buf, 0.0);
        assert!(buf.iter().all(|v| *v == 0.0));
    }
}

/// The L2 norm of `grad`, accumulated in `f64`.
pub fn global_norm(grad: &[f32]) -> f32 {
    grad.iter()
        .map(|&g| (g as f64).powi(2))
        .sum::<f64>()
        .sqrt() as f32
}

/// Rescales `grad` in place so its global L2 norm is at most `max_norm`.
///
/// # Arguments
/// * `grad` - The gradient to clip.
/// * `max_norm` - The largest norm allowed.
///
/// # Returns
/// The norm `grad` had before clipping.
pub fn clip_by_global_norm(grad: &mut [f32], max_norm: f32) -> f32 {
    let norm = global_norm(grad);

    if norm > max_norm && norm > 0. {
        let scale = max_norm / norm;
        grad.iter_mut().for_each(|g| *g *= scale);
    }

    norm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_gradients_are_scaled_to_max_norm() {
        let mut grad = [3., 4., 0., -12.];
        let norm = clip_by_global_norm(&mut grad, 0.5);

        assert_eq!(norm, 13.);
        assert!((global_norm(&grad) - 0.5).abs() < 1e-6);
        assert!((grad[0] / grad[1] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn small_gradients_are_untouched() {
        let original = [0.1, -0.2, 0.05];
        let mut grad = original;
        clip_by_global_norm(&mut grad, 0.5);
        assert_eq!(grad, original);
    }

    #[test]
    fn norm_exactly_at_the_limit_is_untouched() {
        let original = [0.5, 0.];
        let mut grad = original;
        clip_by_global_norm(&mut grad, 0.5);
        assert_eq!(grad, original);
    }

    #[test]
    fn zero_gradient_stays_zero() {
        let mut grad = [0.; 4];
        assert_eq!(clip_by_global_norm(&mut grad, 0.5), 0.);
        assert_eq!(grad, [0.; 4]);
    }
}

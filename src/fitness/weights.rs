/// per-pixel error weights for the weighted color term.
/// recomputed from the running composite once per outer iteration, read-only during it.
///
/// `weight = 1 + focus_strength * err / max_err`, where `err` is the mean squared
/// channel error of the pixel. a composite that already matches gives all ones.
pub fn error_weights(reference_rgb: &[u8], composite_rgba: &[u8], focus_strength: f64) -> Vec<f32> {
    profiling::scope!("error_weights");
    debug_assert_eq!(reference_rgb.len() / 3, composite_rgba.len() / 4);

    let errors: Vec<f64> = reference_rgb
        .chunks_exact(3)
        .zip(composite_rgba.chunks_exact(4))
        .map(|(r, c)| super::color::pixel_sq_err(r, c) as f64 / 3.0)
        .collect();

    let max_err = errors.iter().copied().fold(0.0f64, f64::max);
    if max_err <= 0.0 {
        return vec![1.0; errors.len()];
    }

    let focus = focus_strength.max(0.0);
    errors
        .into_iter()
        .map(|e| (1.0 + focus * (e / max_err)) as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    #[test]
    fn test_matching_composite_gives_uniform_weights() {
        let rgb = [12u8, 200, 7, 0, 0, 0];
        let rgba = [12u8, 200, 7, 255, 0, 0, 0, 0];
        assert_eq!(error_weights(&rgb, &rgba, 2.0), vec![1.0, 1.0]);
    }

    #[test]
    fn test_worst_pixel_gets_full_focus() {
        let rgb = [100u8, 100, 100, 100, 100, 100, 100, 100, 100];
        let rgba = [0u8, 0, 0, 255, 50, 100, 100, 255, 100, 100, 100, 255];
        let w = error_weights(&rgb, &rgba, 2.0);
        assert_eq!(w[0], 3.0);
        assert!(w[1] > 1.0 && w[1] < 3.0);
        assert_eq!(w[2], 1.0);
    }

    #[test]
    fn test_weights_never_negative() {
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..50 {
            let n = rng.random_range(1..64);
            let rgb: Vec<u8> = (0..n * 3).map(|_| rng.random()).collect();
            let rgba: Vec<u8> = (0..n * 4).map(|_| rng.random()).collect();
            let focus = rng.random_range(0.0..10.0);
            for w in error_weights(&rgb, &rgba, focus) {
                assert!(w >= 1.0);
            }
        }
    }
}

//─────────────────────────────────────────────────────────────────────────────
// reporting metrics (MSE, PSNR) for the running composite
//─────────────────────────────────────────────────────────────────────────────

use super::color::color_mse;

/// PSNR (peak signal-to-noise ratio) in decibels.
/// - `mse`: mean squared error
/// - `peak`: 255.0 for 8-bit images
/// higher PSNR = better quality. typical ranges:
///   - 20 dB = rough likeness
///   - 30 dB = good
#[inline]
pub fn psnr_from_mse(mse: f64, peak: f64) -> f64 {
    let mse = mse.max(1e-12);
    10.0 * ((peak * peak) / mse).log10()
}

/// unweighted error of a composite against the reference.
/// logging only, never feeds back into selection.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsSnapshot {
    pub mse: f64,
    pub psnr: f64,
}

impl MetricsSnapshot {
    pub fn measure(reference_rgb: &[u8], composite_rgba: &[u8]) -> Self {
        let mse = color_mse(reference_rgb, composite_rgba, None);
        Self { mse, psnr: psnr_from_mse(mse, 255.0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_psnr_of_unit_mse() {
        assert!((psnr_from_mse(1.0, 255.0) - 48.1308).abs() < 1e-3);
    }

    #[test]
    fn test_psnr_is_finite_at_zero_error() {
        let m = MetricsSnapshot::measure(&[1, 2, 3], &[1, 2, 3, 255]);
        assert_eq!(m.mse, 0.0);
        assert!(m.psnr.is_finite());
    }
}

//─────────────────────────────────────────────────────────────────────────────
// structural similarity (SSIM) on 8-bit grayscale
//─────────────────────────────────────────────────────────────────────────────
//
// uniform window, mean over every window that fits inside the image.
// window sums come from summed-area tables, so each window is O(1).

const DATA_RANGE: f64 = 255.0;
const K1: f64 = 0.01;
const K2: f64 = 0.03;
const C1: f64 = (K1 * DATA_RANGE) * (K1 * DATA_RANGE);
const C2: f64 = (K2 * DATA_RANGE) * (K2 * DATA_RANGE);

/// largest odd window side <= min(7, width, height)
#[inline]
pub fn window_size(width: usize, height: usize) -> usize {
    let side = 7.min(width).min(height).max(1);
    if side % 2 == 0 { side - 1 } else { side }
}

/// ITU-R 601 luma in 16.16 fixed point, rounded
#[inline(always)]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

pub fn gray_from_rgb(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3).map(|p| luma(p[0], p[1], p[2])).collect()
}

/// luma of premultiplied RGBA (i.e. composited over black)
pub fn gray_from_rgba(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4).map(|p| luma(p[0], p[1], p[2])).collect()
}

/// (w+1) x (h+1) summed-area table. entries are integer valued, so f64 sums are exact.
struct Integral {
    stride: usize,
    data: Vec<f64>,
}

impl Integral {
    fn build(width: usize, height: usize, value: impl Fn(usize) -> f64) -> Self {
        let stride = width + 1;
        let mut data = vec![0.0f64; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += value(y * width + x);
                data[(y + 1) * stride + x + 1] = data[y * stride + x + 1] + row;
            }
        }
        Self { stride, data }
    }

    #[inline(always)]
    fn rect(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let s = self.stride;
        self.data[y1 * s + x1] - self.data[y0 * s + x1] - self.data[y1 * s + x0] + self.data[y0 * s + x0]
    }
}

/// grayscale reference with its window tables built once per run
pub struct StructuralReference {
    width: usize,
    height: usize,
    gray: Vec<u8>,
    sum: Integral,
    sum_sq: Integral,
}

impl StructuralReference {
    pub fn new(gray: Vec<u8>, width: usize, height: usize) -> Self {
        profiling::scope!("StructuralReference::new");
        debug_assert_eq!(gray.len(), width * height);
        let sum = Integral::build(width, height, |i| gray[i] as f64);
        let sum_sq = Integral::build(width, height, |i| {
            let v = gray[i] as f64;
            v * v
        });
        Self { width, height, gray, sum, sum_sq }
    }

    /// mean SSIM between the reference and `other` (same dimensions), in [-1, 1]
    pub fn score(&self, other: &[u8]) -> f64 {
        profiling::scope!("StructuralReference::score");
        debug_assert_eq!(other.len(), self.gray.len());
        let (w, h) = (self.width, self.height);
        if w == 0 || h == 0 {
            return 1.0;
        }

        let sum_y = Integral::build(w, h, |i| other[i] as f64);
        let sum_yy = Integral::build(w, h, |i| {
            let v = other[i] as f64;
            v * v
        });
        let sum_xy = Integral::build(w, h, |i| self.gray[i] as f64 * other[i] as f64);

        let win = window_size(w, h);
        let np = (win * win) as f64;
        let cov_norm = if win > 1 { np / (np - 1.0) } else { 1.0 };

        let mut total = 0.0;
        let mut count = 0usize;
        for y0 in 0..=(h - win) {
            let y1 = y0 + win;
            for x0 in 0..=(w - win) {
                let x1 = x0 + win;

                let ux = self.sum.rect(x0, y0, x1, y1) / np;
                let uy = sum_y.rect(x0, y0, x1, y1) / np;
                let vx = cov_norm * (self.sum_sq.rect(x0, y0, x1, y1) / np - ux * ux);
                let vy = cov_norm * (sum_yy.rect(x0, y0, x1, y1) / np - uy * uy);
                let vxy = cov_norm * (sum_xy.rect(x0, y0, x1, y1) / np - ux * uy);

                let num = (2.0 * (ux * uy) + C1) * (2.0 * vxy + C2);
                let den = (ux * ux + uy * uy + C1) * (vx + vy + C2);
                total += num / den;
                count += 1;
            }
        }

        total / count as f64
    }
}

/// one-shot SSIM of two grayscale images of equal size
pub fn ssim(a: &[u8], b: &[u8], width: usize, height: usize) -> f64 {
    StructuralReference::new(a.to_vec(), width, height).score(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn noise(rng: &mut Pcg32, n: usize) -> Vec<u8> {
        (0..n).map(|_| rng.random()).collect()
    }

    #[test]
    fn test_identical_images_score_one() {
        let mut rng = Pcg32::seed_from_u64(1);
        for &(w, h) in &[(1, 1), (2, 2), (5, 3), (16, 9), (33, 50)] {
            let img = noise(&mut rng, w * h);
            assert_eq!(ssim(&img, &img, w, h), 1.0, "{w}x{h}");
        }
    }

    #[test]
    fn test_ssim_is_symmetric() {
        let mut rng = Pcg32::seed_from_u64(2);
        for _ in 0..20 {
            let (w, h) = (rng.random_range(1..20), rng.random_range(1..20));
            let a = noise(&mut rng, w * h);
            let b = noise(&mut rng, w * h);
            assert_eq!(ssim(&a, &b, w, h), ssim(&b, &a, w, h));
        }
    }

    #[test]
    fn test_ssim_is_bounded_and_penalizes_noise() {
        let mut rng = Pcg32::seed_from_u64(3);
        let (w, h) = (24, 24);
        let a = noise(&mut rng, w * h);
        let b = noise(&mut rng, w * h);
        let s = ssim(&a, &b, w, h);
        assert!((-1.0..=1.0).contains(&s));
        assert!(s < 0.5);
    }

    #[test]
    fn test_window_size_is_odd_and_fits() {
        assert_eq!(window_size(100, 100), 7);
        assert_eq!(window_size(6, 100), 5);
        assert_eq!(window_size(2, 2), 1);
        assert_eq!(window_size(3, 40), 3);
    }

    #[test]
    fn test_luma_matches_601_weights() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
    }
}

//! color-distance term: mean squared RGB error mapped into (0, 1].

/// mse at which the color term drops to 0.5
pub const COLOR_MSE_SCALE: f64 = 5000.0;

/// `1 / (1 + mse / 5000)`. exactly 1.0 at zero error, decreasing, never reaches 0.
#[inline]
pub fn color_term(mse: f64) -> f64 {
    1.0 / (1.0 + mse.max(0.0) / COLOR_MSE_SCALE)
}

/// mean over pixels and RGB channels of `weight * diff²`.
/// `reference_rgb` is packed RGB, `surface_rgba` premultiplied RGBA of the same pixel count.
/// without weights every pixel counts once.
pub fn color_mse(reference_rgb: &[u8], surface_rgba: &[u8], weights: Option<&[f32]>) -> f64 {
    profiling::scope!("color_mse");
    debug_assert_eq!(reference_rgb.len() / 3, surface_rgba.len() / 4);

    let n = reference_rgb.len() / 3;
    if n == 0 {
        return 0.0;
    }

    let pixels = reference_rgb.chunks_exact(3).zip(surface_rgba.chunks_exact(4));
    let sum = match weights {
        None => pixels.map(|(r, s)| pixel_sq_err(r, s) as f64).sum::<f64>(),
        Some(w) => {
            debug_assert_eq!(w.len(), n);
            pixels
                .zip(w.iter())
                .map(|((r, s), &wt)| wt as f64 * pixel_sq_err(r, s) as f64)
                .sum::<f64>()
        }
    };

    sum / (n as f64 * 3.0)
}

/// sum of squared channel differences for one pixel
#[inline(always)]
pub fn pixel_sq_err(reference: &[u8], surface: &[u8]) -> u32 {
    let dr = reference[0] as i32 - surface[0] as i32;
    let dg = reference[1] as i32 - surface[1] as i32;
    let db = reference[2] as i32 - surface[2] as i32;
    (dr * dr + dg * dg + db * db) as u32
}

use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::borrow::Cow;
use tiny_skia as sk;

use crate::candidate::Candidate;
use crate::error::ResourceError;
use crate::settings::{RunConfig, TintMode};
use crate::sprites::SpriteLibrary;

// Scratch surface reused across evaluations on the same thread.
// Taken out of the cell while in use, so a nested call just allocates.
thread_local! {
    static SCRATCH: std::cell::RefCell<Option<Surface>> = const { std::cell::RefCell::new(None) };
}

/// which geometry a card is drawn with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// full canvas: card size from card_width/card_height, position as-is
    Full,
    /// scoring canvas: card size and position divided by the downscale factor
    Reduced,
}

/// premultiplied RGBA canvas (tiny-skia's native format), transparent when created.
/// scoring reads the premultiplied RGB, i.e. the composite over black.
#[derive(Clone, Debug)]
pub struct Surface {
    pix: sk::Pixmap,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Result<Self, ResourceError> {
        sk::Pixmap::new(width, height)
            .map(|pix| Self { pix })
            .ok_or(ResourceError::Surface { width, height })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pix.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pix.height()
    }

    /// premultiplied RGBA bytes, row-major
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.pix.data()
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.pix.data_mut()
    }

    /// overwrite this surface with `other` (same dimensions)
    pub fn copy_from(&mut self, other: &Surface) {
        debug_assert_eq!((self.width(), self.height()), (other.width(), other.height()));
        self.pix.data_mut().copy_from_slice(other.pix.data());
    }

    /// un-premultiplied copy for encoding
    pub fn to_rgba_image(&self) -> RgbaImage {
        profiling::scope!("Surface::to_rgba_image");
        let mut out = Vec::with_capacity(self.pix.data().len());
        for px in self.pix.pixels() {
            let c = px.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RgbaImage::from_raw(self.width(), self.height(), out)
            .unwrap_or_else(|| RgbaImage::new(self.width(), self.height()))
    }

    fn as_pixmap_mut(&mut self) -> &mut sk::Pixmap {
        &mut self.pix
    }
}

/// copy `base` into this thread's scratch surface, run `f` on it, then release it.
/// the running composite is never aliased by an evaluation.
pub fn with_scratch<T>(base: &Surface, f: impl FnOnce(&mut Surface) -> T) -> T {
    profiling::scope!("with_scratch");
    let mut surface = match SCRATCH.with(|cell| cell.borrow_mut().take()) {
        Some(mut s) if s.width() == base.width() && s.height() == base.height() => {
            s.copy_from(base);
            s
        }
        _ => base.clone(),
    };

    let out = f(&mut surface);

    SCRATCH.with(|cell| *cell.borrow_mut() = Some(surface));
    out
}

/// geometry and tint settings shared by every draw
#[derive(Clone, Debug)]
pub struct CardGeometry {
    pub card_width: u32,
    pub card_height: u32,
    pub downscale: u32,
    pub tint_mode: TintMode,
}

impl CardGeometry {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            card_width: cfg.card_width,
            card_height: cfg.card_height,
            downscale: cfg.downscale.max(1),
            tint_mode: cfg.tint_mode,
        }
    }

    /// scaled (un-rotated) card size in pixels, at least 1x1
    pub fn card_size(&self, scale: f32, resolution: Resolution) -> (u32, u32) {
        let (base_w, base_h) = match resolution {
            Resolution::Full => (self.card_width, self.card_height),
            Resolution::Reduced => (self.card_width / self.downscale, self.card_height / self.downscale),
        };
        (
            ((base_w as f32 * scale) as u32).max(1),
            ((base_h as f32 * scale) as u32).max(1),
        )
    }

    /// top-left of the rotated box on a surface of the given resolution
    pub fn placement(&self, position: (i32, i32), resolution: Resolution) -> (i32, i32) {
        match resolution {
            Resolution::Full => position,
            Resolution::Reduced => {
                let d = self.downscale as i32;
                (position.0.div_euclid(d), position.1.div_euclid(d))
            }
        }
    }
}

/// draws candidates onto surfaces. holds the sprite library read-only.
#[derive(Clone)]
pub struct Renderer<'a> {
    sprites: &'a SpriteLibrary,
    geometry: CardGeometry,
}

impl<'a> Renderer<'a> {
    pub fn new(sprites: &'a SpriteLibrary, geometry: CardGeometry) -> Self {
        Self { sprites, geometry }
    }

    /// composite one candidate onto `surface` in place
    pub fn render(&self, surface: &mut Surface, candidate: &Candidate, resolution: Resolution) {
        profiling::scope!("Renderer::render");
        if let Some(card) = self.prepare_card(candidate, resolution) {
            let (x, y) = self.geometry.placement(candidate.position, resolution);
            composite_over(surface.as_pixmap_mut(), &card, x, y);
        }
    }

    /// render a whole card list, in order, onto a fresh transparent surface
    pub fn render_all(
        &self,
        cards: &[Candidate],
        width: u32,
        height: u32,
        resolution: Resolution,
    ) -> Result<Surface, ResourceError> {
        profiling::scope!("Renderer::render_all");
        let mut surface = Surface::new(width, height)?;
        for card in cards {
            self.render(&mut surface, card, resolution);
        }
        Ok(surface)
    }

    /// tint, resample, rotate. returns a premultiplied card image with its expanded box.
    fn prepare_card(&self, candidate: &Candidate, resolution: Resolution) -> Option<sk::Pixmap> {
        profiling::scope!("prepare_card");
        let sprite = self.sprites.get(candidate.sprite_id);
        if sprite.width() == 0 || sprite.height() == 0 {
            return None;
        }

        let tinted = apply_tint(sprite, candidate.tint, candidate.tint_strength, self.geometry.tint_mode);

        // resample premultiplied so transparent texels do not bleed color into edges
        let premul = RgbaImage::from_raw(tinted.width(), tinted.height(), premultiply(tinted.as_raw()))?;
        let (w, h) = self.geometry.card_size(candidate.scale, resolution);
        let resized = if premul.dimensions() == (w, h) {
            premul
        } else {
            imageops::resize(&premul, w, h, FilterType::Lanczos3)
        };

        let mut data = resized.into_raw();
        // lanczos ringing can push color above coverage, which is not valid premultiplied data
        for px in data.chunks_exact_mut(4) {
            let a = px[3];
            px[0] = px[0].min(a);
            px[1] = px[1].min(a);
            px[2] = px[2].min(a);
        }
        let card = sk::Pixmap::from_vec(data, sk::IntSize::from_wh(w, h)?)?;

        if candidate.rotation % 360.0 == 0.0 {
            Some(card)
        } else {
            rotate_expand(&card, candidate.rotation)
        }
    }
}

/// recolor a sprite. alpha is always preserved.
pub fn apply_tint(sprite: &RgbaImage, tint: [u8; 3], strength: f32, mode: TintMode) -> Cow<'_, RgbaImage> {
    profiling::scope!("apply_tint");
    match mode {
        TintMode::Off => Cow::Borrowed(sprite),
        TintMode::Hard => {
            let mut out = sprite.clone();
            for px in out.pixels_mut() {
                px.0[..3].copy_from_slice(&tint);
            }
            Cow::Owned(out)
        }
        TintMode::Blend => {
            let s = strength.clamp(0.0, 1.0);
            let mut out = sprite.clone();
            for px in out.pixels_mut() {
                for c in 0..3 {
                    let v = px.0[c] as f32 * (1.0 - s) + tint[c] as f32 * s;
                    px.0[c] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
            Cow::Owned(out)
        }
    }
}

/// rotate counter-clockwise by `degrees` about the centre, growing the box so nothing is clipped
fn rotate_expand(src: &sk::Pixmap, degrees: f32) -> Option<sk::Pixmap> {
    profiling::scope!("rotate_expand");
    let (w, h) = (src.width() as f32, src.height() as f32);
    let rad = degrees.to_radians();
    let (c, s) = (rad.cos().abs(), rad.sin().abs());

    // trim float noise so exact quarter turns do not grow by a pixel
    let new_w = ((w * c + h * s - 1e-3).ceil() as u32).max(1);
    let new_h = ((w * s + h * c - 1e-3).ceil() as u32).max(1);

    let mut dst = sk::Pixmap::new(new_w, new_h)?;
    // tiny-skia rotates clockwise in y-down space, so negate for counter-clockwise
    let transform = sk::Transform::from_translate(-w / 2.0, -h / 2.0)
        .post_concat(sk::Transform::from_rotate(-degrees))
        .post_concat(sk::Transform::from_translate(new_w as f32 / 2.0, new_h as f32 / 2.0));

    let paint = sk::PixmapPaint {
        quality: sk::FilterQuality::Bilinear,
        ..sk::PixmapPaint::default()
    };
    dst.draw_pixmap(0, 0, src.as_ref(), &paint, transform, None);
    Some(dst)
}

/// source-over of premultiplied `src` onto premultiplied `dst` with its top-left at (x, y).
/// the parts of `src` outside `dst` are clipped.
pub fn composite_over(dst: &mut sk::Pixmap, src: &sk::Pixmap, x: i32, y: i32) {
    profiling::scope!("composite_over");
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    let (sw, sh) = (src.width() as i64, src.height() as i64);
    let (x, y) = (x as i64, y as i64);

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + sw).min(dw);
    let y1 = (y + sh).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return; // fully off-surface
    }

    let src_data = src.data();
    let dst_data = dst.data_mut();
    for dy in y0..y1 {
        let sy = dy - y;
        for dx in x0..x1 {
            let sx = dx - x;
            let si = ((sy * sw + sx) * 4) as usize;
            let di = ((dy * dw + dx) * 4) as usize;

            let sa = src_data[si + 3] as u16;
            if sa == 0 {
                continue;
            }
            if sa == 255 {
                dst_data[di..di + 4].copy_from_slice(&src_data[si..si + 4]);
                continue;
            }
            let inv = 255 - sa;
            for c in 0..4 {
                // (x * a + 127) / 255 is a rounded divide-by-255
                let d = (dst_data[di + c] as u16 * inv + 127) / 255;
                dst_data[di + c] = (src_data[si + c] as u16 + d).min(255) as u8;
            }
        }
    }
}

/// Premultiply RGBA - optimized scalar implementation (compiler will auto-vectorize)
#[inline(always)]
pub fn premultiply(p: &[u8]) -> Vec<u8> {
    profiling::scope!("premultiply");

    let mut out = vec![0u8; p.len()];
    for (o, px) in out.chunks_exact_mut(4).zip(p.chunks_exact(4)) {
        let a = px[3] as u16;
        o[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        o[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        o[2] = ((px[2] as u16 * a + 127) / 255) as u8;
        o[3] = a as u8;
    }

    out
}

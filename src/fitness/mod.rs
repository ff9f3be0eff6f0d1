// Fitness module organization
// color and structural terms, error weights, reporting metrics

pub mod color;
pub mod metrics;
pub mod ssim;
pub mod weights;

pub use color::{color_mse, color_term};
pub use metrics::{psnr_from_mse, MetricsSnapshot};
pub use ssim::{ssim, StructuralReference};
pub use weights::error_weights;

use image::RgbImage;

use crate::candidate::Candidate;
use crate::render::{with_scratch, Renderer, Resolution, Surface};

/// effective weights of the scoring terms. `None` = term disabled and never computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreWeights {
    pub color: Option<f64>,
    pub structural: Option<f64>,
}

impl ScoreWeights {
    #[inline]
    fn active(w: Option<f64>) -> Option<f64> {
        w.filter(|&w| w != 0.0)
    }
}

/// score of one surface. higher is better.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fitness {
    pub total: f64,
    pub color: Option<f64>,
    pub structural: Option<f64>,
}

/// the downscaled target plus the optional error-weight array.
/// owned by the placement loop; evaluations only read it.
pub struct ReferenceState {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    structural: StructuralReference,
    weights: Option<Vec<f32>>,
}

impl ReferenceState {
    pub fn new(reference: &RgbImage) -> Self {
        profiling::scope!("ReferenceState::new");
        let (width, height) = reference.dimensions();
        let rgb = reference.as_raw().clone();
        let gray = ssim::gray_from_rgb(&rgb);
        let structural = StructuralReference::new(gray, width as usize, height as usize);
        Self { width, height, rgb, structural, weights: None }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// packed RGB of the reference
    #[inline]
    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    #[inline]
    pub fn weights(&self) -> Option<&[f32]> {
        self.weights.as_deref()
    }

    /// recompute error weights from the current running composite
    pub fn reweight(&mut self, composite: &Surface, focus_strength: f64) {
        self.weights = Some(error_weights(&self.rgb, composite.data(), focus_strength));
    }

    pub fn clear_weights(&mut self) {
        self.weights = None;
    }
}

/// combines the enabled terms into one fitness value
#[derive(Clone)]
pub struct Scorer<'a> {
    renderer: Renderer<'a>,
    weights: ScoreWeights,
}

impl<'a> Scorer<'a> {
    pub fn new(renderer: Renderer<'a>, weights: ScoreWeights) -> Self {
        Self { renderer, weights }
    }

    #[inline]
    pub fn renderer(&self) -> &Renderer<'a> {
        &self.renderer
    }

    /// score a reduced-resolution surface against the reference
    pub fn score_surface(&self, surface: &Surface, reference: &ReferenceState) -> Fitness {
        profiling::scope!("Scorer::score_surface");
        debug_assert_eq!((surface.width(), surface.height()), (reference.width, reference.height));

        let mut total = 0.0;

        let color = ScoreWeights::active(self.weights.color).map(|w| {
            let mse = color_mse(&reference.rgb, surface.data(), reference.weights());
            let term = color_term(mse);
            total += w * term;
            term
        });

        let structural = ScoreWeights::active(self.weights.structural).map(|w| {
            let gray = ssim::gray_from_rgba(surface.data());
            let term = reference.structural.score(&gray);
            total += w * term;
            term
        });

        Fitness { total, color, structural }
    }

    /// render `candidate` onto a scratch copy of `composite` and score the result.
    /// `composite` itself is never written.
    pub fn score_candidate(&self, candidate: &Candidate, composite: &Surface, reference: &ReferenceState) -> Fitness {
        profiling::scope!("Scorer::score_candidate");
        with_scratch(composite, |scratch| {
            self.renderer.render(scratch, candidate, Resolution::Reduced);
            self.score_surface(scratch, reference)
        })
    }
}

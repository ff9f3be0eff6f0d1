use rand::Rng;

use crate::candidate::{Candidate, CandidateBounds};
use crate::mutation_config::MutateConfig;

/// produces perturbed copies of a parent candidate.
/// every child goes back through the same clamps as a freshly constructed one.
#[derive(Clone, Debug)]
pub struct Mutator {
    cfg: MutateConfig,
    bounds: CandidateBounds,
}

impl Mutator {
    pub fn new(cfg: MutateConfig, bounds: CandidateBounds) -> Self {
        Self { cfg, bounds }
    }

    #[inline]
    pub fn bounds(&self) -> &CandidateBounds {
        &self.bounds
    }

    /// `count` children, each perturbed independently from `parent`
    pub fn mutate<R: Rng>(&self, parent: &Candidate, count: usize, rng: &mut R) -> Vec<Candidate> {
        profiling::scope!("Mutator::mutate");
        (0..count).map(|_| self.mutate_one(parent, rng)).collect()
    }

    pub fn mutate_one<R: Rng>(&self, parent: &Candidate, rng: &mut R) -> Candidate {
        let cfg = &self.cfg;
        let mut child = parent.clone();

        // sprite id: occasional +-1 step, stays inside the deck
        if rng.random::<f32>() < cfg.p_mutate_sprite {
            let step: i64 = if rng.random_bool(0.5) { 1 } else { -1 };
            let max_id = self.bounds.sprite_count.max(1) as i64;
            child.sprite_id = (child.sprite_id as i64 + step).clamp(1, max_id) as u32;
        }

        child.scale = self
            .bounds
            .clamp_scale(child.scale + rng.random_range(-cfg.size_power..=cfg.size_power));

        // rotation is never clamped or wrapped
        child.rotation += int_noise(rng, cfg.rotation_power) as f32;

        let (x, y) = child.position;
        child.position = (
            x.saturating_add(int_noise(rng, cfg.position_power)),
            y.saturating_add(int_noise(rng, cfg.position_power)),
        );

        for c in child.tint.iter_mut() {
            *c = (*c as i32 + int_noise(rng, cfg.color_power)).clamp(0, 255) as u8;
        }

        let (lo, hi) = cfg.tint_noise_range();
        child.tint_strength = self
            .bounds
            .clamp_tint_strength(child.tint_strength + rng.random_range(lo..=hi));

        self.bounds.clamp_position(&mut child);
        child
    }
}

/// uniform integer in [-power, power]
#[inline]
fn int_noise<R: Rng>(rng: &mut R, power: u32) -> i32 {
    let p = power.min(i32::MAX as u32) as i32;
    rng.random_range(-p..=p)
}

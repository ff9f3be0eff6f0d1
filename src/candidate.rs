use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::settings::RunConfig;

/// one placed card: which sprite, how it is transformed, how it is tinted.
/// positions are full-resolution canvas pixels (top-left of the rotated box).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub sprite_id: u32,        // 1..=N
    pub rotation: f32,         // degrees, counter-clockwise, never wrapped
    pub scale: f32,
    pub position: (i32, i32),
    pub tint: [u8; 3],
    pub tint_strength: f32,
}

/// feasibility bounds for candidates on one canvas.
/// construction and mutation both finish with `clamp_position`.
#[derive(Clone, Debug)]
pub struct CandidateBounds {
    pub sprite_count: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub card_width: u32,
    pub card_height: u32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub rotation_min: f32,
    pub rotation_max: f32,
    pub tint_min: f32,
    pub tint_max: f32,
}

impl CandidateBounds {
    pub fn from_config(cfg: &RunConfig, sprite_count: u32, canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            sprite_count,
            canvas_width,
            canvas_height,
            card_width: cfg.card_width,
            card_height: cfg.card_height,
            min_scale: cfg.min_scale,
            max_scale: cfg.max_scale,
            rotation_min: cfg.rotation_min,
            rotation_max: cfg.rotation_max,
            tint_min: cfg.tint_min,
            tint_max: cfg.tint_max,
        }
    }

    /// uniform sample over every field's range. position starts over an extended
    /// range (up to one card off the top-left) and is then clamped onto the canvas.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Candidate {
        profiling::scope!("CandidateBounds::random");
        let x = rng.random_range(-(self.card_width as i32)..self.canvas_width as i32);
        let y = rng.random_range(-(self.card_height as i32)..self.canvas_height as i32);

        let mut candidate = Candidate {
            sprite_id: rng.random_range(1..=self.sprite_count),
            rotation: rng.random_range(self.rotation_min..=self.rotation_max),
            scale: rng.random_range(self.min_scale..=self.max_scale),
            position: (x, y),
            tint: [rng.random(), rng.random(), rng.random()],
            tint_strength: rng.random_range(self.tint_min..=self.tint_max),
        };
        self.clamp_position(&mut candidate);
        candidate
    }

    /// keep the un-rotated scaled card box inside the canvas.
    /// rotation is ignored here, so rotated cards may poke slightly past the edges.
    /// a card wider (taller) than the canvas is pinned to x = 0 (y = 0).
    pub fn clamp_position(&self, candidate: &mut Candidate) {
        let (x, y) = candidate.position;
        let w = self.card_width as f32 * candidate.scale;
        let h = self.card_height as f32 * candidate.scale;

        let max_x = (self.canvas_width as f32 - w).max(0.0);
        let max_y = (self.canvas_height as f32 - h).max(0.0);

        candidate.position = (
            (x as f32).clamp(0.0, max_x) as i32,
            (y as f32).clamp(0.0, max_y) as i32,
        );
    }

    #[inline]
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    #[inline]
    pub fn clamp_tint_strength(&self, strength: f32) -> f32 {
        strength.clamp(self.tint_min, self.tint_max)
    }

    /// true when every bounded field lies inside its range
    pub fn contains(&self, candidate: &Candidate) -> bool {
        let w = self.card_width as f32 * candidate.scale;
        let h = self.card_height as f32 * candidate.scale;
        let (x, y) = candidate.position;

        (1..=self.sprite_count).contains(&candidate.sprite_id)
            && (self.min_scale..=self.max_scale).contains(&candidate.scale)
            && (self.tint_min..=self.tint_max).contains(&candidate.tint_strength)
            && x >= 0
            && y >= 0
            && x as f32 <= (self.canvas_width as f32 - w).max(0.0)
            && y as f32 <= (self.canvas_height as f32 - h).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn bounds() -> CandidateBounds {
        CandidateBounds::from_config(&RunConfig::default(), 52, 1920, 1080)
    }

    #[test]
    fn test_random_candidates_are_feasible() {
        let b = bounds();
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..5_000 {
            let c = b.random(&mut rng);
            assert!(b.contains(&c), "infeasible candidate {c:?}");
            assert!((-360.0..=0.0).contains(&c.rotation));
        }
    }

    #[test]
    fn test_oversized_card_pins_to_origin() {
        let b = CandidateBounds::from_config(&RunConfig::default(), 1, 100, 100);
        let mut c = Candidate {
            sprite_id: 1,
            rotation: 0.0,
            scale: 3.5,
            position: (80, -40),
            tint: [0, 0, 0],
            tint_strength: 0.8,
        };
        b.clamp_position(&mut c);
        assert_eq!(c.position, (0, 0));
    }

    #[test]
    fn test_clamp_truncates_fractional_limit() {
        // 1920 - 200 * 0.5035 = 1819.3 -> 1819
        let b = bounds();
        let mut c = Candidate {
            sprite_id: 1,
            rotation: -10.0,
            scale: 0.5035,
            position: (5000, 10),
            tint: [1, 2, 3],
            tint_strength: 0.8,
        };
        b.clamp_position(&mut c);
        assert_eq!(c.position, (1819, 10));
    }

    #[test]
    fn test_clamp_ignores_rotation() {
        let b = bounds();
        let mut upright = Candidate {
            sprite_id: 3,
            rotation: 0.0,
            scale: 1.0,
            position: (4000, 4000),
            tint: [0, 0, 0],
            tint_strength: 0.7,
        };
        let mut tilted = Candidate { rotation: -45.0, ..upright.clone() };
        b.clamp_position(&mut upright);
        b.clamp_position(&mut tilted);
        assert_eq!(upright.position, tilted.position);
    }
}

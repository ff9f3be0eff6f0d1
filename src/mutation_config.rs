use serde::{Deserialize, Serialize};

/// how tint strength is perturbed during mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TintNoise {
    /// uniform noise in [-tint_power, tint_power]
    Symmetric,
    /// uniform noise in [-tint_power, size_power], the skewed range older runs used.
    /// drifts tint strength upward; kept only to reproduce those runs.
    Inherited,
}

#[derive(Clone, Debug)]
pub struct MutateConfig {
    // probability of nudging the sprite id by one
    pub p_mutate_sprite: f32,

    // noise magnitudes per field
    pub size_power: f32,     // scale noise, uniform in [-p, p]
    pub rotation_power: u32, // degrees, integer noise
    pub position_power: u32, // pixels per axis, integer noise
    pub color_power: u32,    // per tint channel, integer noise
    pub tint_power: f32,     // tint strength noise

    pub tint_noise: TintNoise,
}

impl Default for MutateConfig {
    fn default() -> Self {
        Self {
            p_mutate_sprite: 0.35,
            size_power: 0.15,
            rotation_power: 20,
            position_power: 30,
            color_power: 25,
            tint_power: 0.03,
            tint_noise: TintNoise::Symmetric,
        }
    }
}

impl MutateConfig {
    /// (low, high) bounds of the tint strength perturbation
    #[inline]
    pub fn tint_noise_range(&self) -> (f32, f32) {
        match self.tint_noise {
            TintNoise::Symmetric => (-self.tint_power, self.tint_power),
            TintNoise::Inherited => (-self.tint_power, self.size_power),
        }
    }
}

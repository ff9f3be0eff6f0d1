/// run settings for a card mosaic.
/// built once (defaults, JSON file, CLI overrides), validated, then frozen for the run.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ResourceError};
use crate::fitness::ScoreWeights;
use crate::mutation_config::{MutateConfig, TintNoise};

/// how a card's tint color is applied to its sprite
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TintMode {
    /// interpolate between sprite color and tint by tint strength, alpha kept
    Blend,
    /// replace RGB with the tint, alpha kept
    Hard,
    /// draw the sprite in its natural colors
    Off,
}

/// what to do with color/structural weights that do not sum to 1
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightPolicy {
    /// divide the enabled weights by their sum
    Normalize,
    /// reject the configuration
    Reject,
    /// use the weights exactly as given
    AsIs,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    // card geometry at full resolution
    pub card_width: u32,
    pub card_height: u32,
    /// reference/composite resolution divisor (6 = score at 1/6 size)
    pub downscale: u32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// rotation sampling range for freshly constructed cards (degrees)
    pub rotation_min: f32,
    pub rotation_max: f32,

    // placement loop
    pub loop_count: usize,
    pub rounds_per_loop: usize,
    /// write a full-resolution snapshot every N accepted cards
    pub save_interval: usize,

    // population shape, must satisfy elite_count * (mutations_per_parent + 1) == population_size
    pub population_size: usize,
    pub elite_count: usize,
    pub mutations_per_parent: usize,

    // mutation powers
    pub p_mutate_sprite: f32,
    pub size_power: f32,
    pub rotation_power: u32,
    pub position_power: u32,
    pub color_power: u32,
    pub tint_power: f32,
    pub tint_noise: TintNoise,

    // tint
    pub tint_mode: TintMode,
    pub tint_min: f32,
    pub tint_max: f32,

    // scoring
    pub use_color: bool,
    pub color_weight: f64,
    pub use_ssim: bool,
    pub ssim_weight: f64,
    /// reweight the color term toward pixels the composite still gets wrong
    pub weighted_error: bool,
    pub focus_strength: f64,
    pub weight_policy: WeightPolicy,

    pub seed: u64,

    // paths
    pub target_path: PathBuf,
    pub sprites_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        let mutate = MutateConfig::default();
        Self {
            card_width: 200,
            card_height: 300,
            downscale: 6,
            min_scale: 0.08,
            max_scale: 3.5,
            rotation_min: -360.0,
            rotation_max: 0.0,

            loop_count: 2000,
            rounds_per_loop: 20,
            save_interval: 5,

            population_size: 100,
            elite_count: 20,
            mutations_per_parent: 4,

            p_mutate_sprite: mutate.p_mutate_sprite,
            size_power: mutate.size_power,
            rotation_power: mutate.rotation_power,
            position_power: mutate.position_power,
            color_power: mutate.color_power,
            tint_power: mutate.tint_power,
            tint_noise: mutate.tint_noise,

            tint_mode: TintMode::Blend,
            tint_min: 0.7,
            tint_max: 0.9,

            use_color: true,
            color_weight: 0.7,
            use_ssim: true,
            ssim_weight: 0.3,
            weighted_error: false,
            focus_strength: 2.0,
            weight_policy: WeightPolicy::Normalize,

            seed: 0xC0FFEE,

            target_path: PathBuf::from("target.png"),
            sprites_dir: PathBuf::from("Deck"),
            output_dir: PathBuf::from("Results"),
        }
    }
}

impl RunConfig {
    /// load settings from a JSON file. missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ResourceError> {
        let json = std::fs::read_to_string(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ResourceError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// save settings to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// convert to MutateConfig for the mutator
    pub fn to_mutate_config(&self) -> MutateConfig {
        MutateConfig {
            p_mutate_sprite: self.p_mutate_sprite,
            size_power: self.size_power,
            rotation_power: self.rotation_power,
            position_power: self.position_power,
            color_power: self.color_power,
            tint_power: self.tint_power,
            tint_noise: self.tint_noise,
        }
    }

    /// reject out-of-range values. nothing is clamped here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.downscale == 0 {
            return Err(ConfigError::ZeroDownscale(self.downscale));
        }
        for (name, value) in [
            ("loop_count", self.loop_count),
            ("rounds_per_loop", self.rounds_per_loop),
            ("save_interval", self.save_interval),
            ("population_size", self.population_size),
            ("elite_count", self.elite_count),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroCount { name });
            }
        }

        let product = self
            .mutations_per_parent
            .checked_add(1)
            .and_then(|fanout| self.elite_count.checked_mul(fanout))
            .unwrap_or(usize::MAX);
        if product != self.population_size {
            return Err(ConfigError::PopulationMismatch {
                elite: self.elite_count,
                mutations: self.mutations_per_parent,
                product,
                population: self.population_size,
            });
        }

        if self.card_width == 0 || self.card_height == 0 {
            return Err(ConfigError::ZeroCardSize {
                width: self.card_width,
                height: self.card_height,
            });
        }

        let scale_ok = self.min_scale.is_finite()
            && self.max_scale.is_finite()
            && self.min_scale > 0.0
            && self.min_scale <= self.max_scale;
        if !scale_ok {
            return Err(ConfigError::InvalidScaleRange { min: self.min_scale, max: self.max_scale });
        }

        let tint_ok = (0.0..=1.0).contains(&self.tint_min)
            && (0.0..=1.0).contains(&self.tint_max)
            && self.tint_min <= self.tint_max;
        if !tint_ok {
            return Err(ConfigError::InvalidTintRange { min: self.tint_min, max: self.tint_max });
        }

        let rotation_ok = self.rotation_min.is_finite()
            && self.rotation_max.is_finite()
            && self.rotation_min <= self.rotation_max;
        if !rotation_ok {
            return Err(ConfigError::InvalidRotationRange {
                min: self.rotation_min,
                max: self.rotation_max,
            });
        }

        if !(0.0..=1.0).contains(&self.p_mutate_sprite) {
            return Err(ConfigError::InvalidProbability {
                name: "p_mutate_sprite",
                value: self.p_mutate_sprite,
            });
        }

        for (name, value) in [
            ("size_power", self.size_power as f64),
            ("tint_power", self.tint_power as f64),
            ("color_weight", self.color_weight),
            ("ssim_weight", self.ssim_weight),
            ("focus_strength", self.focus_strength),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeValue { name, value });
            }
        }

        self.score_weights().map(|_| ())
    }

    /// effective weights of the enabled scoring terms.
    /// a single enabled term always gets weight 1.
    pub fn score_weights(&self) -> Result<ScoreWeights, ConfigError> {
        match (self.use_color, self.use_ssim) {
            (false, false) => Err(ConfigError::NoScoringTerm),
            (true, false) => Ok(ScoreWeights { color: Some(1.0), structural: None }),
            (false, true) => Ok(ScoreWeights { color: None, structural: Some(1.0) }),
            (true, true) => {
                let sum = self.color_weight + self.ssim_weight;
                let (color, structural) = match self.weight_policy {
                    WeightPolicy::AsIs => (self.color_weight, self.ssim_weight),
                    WeightPolicy::Reject => {
                        if (sum - 1.0).abs() > 1e-6 {
                            return Err(ConfigError::WeightsNotNormalized { sum });
                        }
                        (self.color_weight, self.ssim_weight)
                    }
                    WeightPolicy::Normalize => {
                        if sum <= 0.0 {
                            return Err(ConfigError::ZeroTotalWeight);
                        }
                        (self.color_weight / sum, self.ssim_weight / sum)
                    }
                };
                Ok(ScoreWeights { color: Some(color), structural: Some(structural) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(RunConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_zero_downscale_rejected() {
        let cfg = RunConfig { downscale: 0, ..RunConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroDownscale(0)));
    }

    #[test]
    fn test_population_mismatch_rejected() {
        let cfg = RunConfig { population_size: 99, ..RunConfig::default() };
        match cfg.validate() {
            Err(ConfigError::PopulationMismatch { product, population, .. }) => {
                assert_eq!(product, 100);
                assert_eq!(population, 99);
            }
            other => panic!("expected population mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_scale_rejected() {
        let cfg = RunConfig { min_scale: 2.0, max_scale: 1.0, ..RunConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidScaleRange { .. })));
    }

    #[test]
    fn test_tint_out_of_unit_range_rejected() {
        let cfg = RunConfig { tint_max: 1.5, ..RunConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidTintRange { .. })));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let cfg = RunConfig { ssim_weight: -0.1, ..RunConfig::default() };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NegativeValue { name: "ssim_weight", .. })
        ));
    }

    #[test]
    fn test_no_scoring_term_rejected() {
        let cfg = RunConfig { use_color: false, use_ssim: false, ..RunConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::NoScoringTerm));
    }

    #[test]
    fn test_single_term_gets_full_weight() {
        let cfg = RunConfig { use_ssim: false, color_weight: 0.2, ..RunConfig::default() };
        let w = cfg.score_weights().unwrap();
        assert_eq!(w.color, Some(1.0));
        assert_eq!(w.structural, None);
    }

    #[test]
    fn test_normalize_policy_rescales() {
        let cfg = RunConfig { color_weight: 3.0, ssim_weight: 1.0, ..RunConfig::default() };
        let w = cfg.score_weights().unwrap();
        assert!((w.color.unwrap() - 0.75).abs() < 1e-12);
        assert!((w.structural.unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_reject_policy_refuses_unnormalized() {
        let cfg = RunConfig {
            color_weight: 0.5,
            ssim_weight: 0.6,
            weight_policy: WeightPolicy::Reject,
            ..RunConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::WeightsNotNormalized { .. })));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let cfg: RunConfig = serde_json::from_str(r#"{ "loop_count": 7, "use_ssim": false }"#).unwrap();
        assert_eq!(cfg.loop_count, 7);
        assert!(!cfg.use_ssim);
        assert_eq!(cfg.population_size, 100);
    }
}

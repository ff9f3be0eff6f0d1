use std::path::PathBuf;
use thiserror::Error;

/// rejected run configuration. raised before any iteration starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("downscale factor must be at least 1, got {0}")]
    ZeroDownscale(u32),
    #[error("{name} must be greater than zero")]
    ZeroCount { name: &'static str },
    #[error(
        "population mismatch: elite_count ({elite}) * (mutations_per_parent ({mutations}) + 1) = {product}, \
         but population_size is {population}"
    )]
    PopulationMismatch {
        elite: usize,
        mutations: usize,
        product: usize,
        population: usize,
    },
    #[error("card dimensions must be non-zero, got {width}x{height}")]
    ZeroCardSize { width: u32, height: u32 },
    #[error("scale bounds must be finite and positive with min <= max, got [{min}, {max}]")]
    InvalidScaleRange { min: f32, max: f32 },
    #[error("tint strength bounds must lie in [0, 1] with min <= max, got [{min}, {max}]")]
    InvalidTintRange { min: f32, max: f32 },
    #[error("rotation range must be finite with min <= max, got [{min}, {max}]")]
    InvalidRotationRange { min: f32, max: f32 },
    #[error("probability {name} must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f32 },
    #[error("{name} must be finite and non-negative, got {value}")]
    NegativeValue { name: &'static str, value: f64 },
    #[error("at least one of the color and structural terms must be enabled")]
    NoScoringTerm,
    #[error("weights of the enabled terms must sum to 1, got {sum}")]
    WeightsNotNormalized { sum: f64 },
    #[error("enabled scoring terms have a combined weight of zero")]
    ZeroTotalWeight,
}

/// missing or undecodable inputs. fatal to the run.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no sprite images found in {0}")]
    EmptySpriteLibrary(PathBuf),
    #[error("target image {width}x{height} is smaller than one reference pixel at downscale {downscale}")]
    TargetTooSmall { width: u32, height: u32, downscale: u32 },
    #[error("cannot allocate a {width}x{height} surface")]
    Surface { width: u32, height: u32 },
}

/// failures while writing snapshots or exported card lists.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write image {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write card list {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read card list {path}: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("card {card} in {path} uses sprite {sprite_id}, but the deck has {deck} sprites")]
    UnknownSprite {
        path: PathBuf,
        card: usize,
        sprite_id: u32,
        deck: usize,
    },
    #[error("failed to (de)serialize card list: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread panicked")]
    WorkerPanicked,
}

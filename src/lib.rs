//! cardmosaic: approximate a target picture with a stack of tinted, scaled and rotated
//! card sprites, choosing each card with a small genetic search.

pub mod candidate;
pub mod engine;
pub mod engine_thread;
pub mod error;
pub mod events;
pub mod fitness;
pub mod mutate;
pub mod mutation_config;
pub mod render;
pub mod settings;
pub mod snapshot;
pub mod sprites;
pub mod target;

pub use candidate::{Candidate, CandidateBounds};
pub use engine::{Engine, RunOutcome, RunStatus};
pub use error::{ConfigError, ResourceError, RunError, SnapshotError};
pub use events::{CancelToken, NoProgress, ProgressEvent, ProgressSink};
pub use fitness::{Fitness, ScoreWeights};
pub use render::{Renderer, Resolution, Surface};
pub use settings::RunConfig;
pub use snapshot::{MemorySnapshots, PngSnapshots, SnapshotSink};
pub use sprites::SpriteLibrary;
pub use target::load_target;

use image::RgbImage;

/// validate `config`, build the reference from `target`, and run the placement loop
/// on the calling thread.
pub fn run<S, P>(
    config: &RunConfig,
    sprites: &SpriteLibrary,
    target: &RgbImage,
    sink: &mut S,
    cancel: &CancelToken,
    snapshots: &mut P,
) -> Result<RunOutcome, RunError>
where
    S: ProgressSink + ?Sized,
    P: SnapshotSink + ?Sized,
{
    Engine::new(config, sprites, target)?.run(sink, cancel, snapshots)
}

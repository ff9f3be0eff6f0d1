// Engine module organization
// generation: per-card genetic search
// this file: the placement loop that accepts one card per iteration

pub mod generation;

pub use generation::{GenerationEngine, GenerationParams, GenerationResult, Member};

use image::RgbImage;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::candidate::{Candidate, CandidateBounds};
use crate::error::{ResourceError, RunError};
use crate::events::{CancelToken, ProgressEvent, ProgressSink};
use crate::fitness::{MetricsSnapshot, ReferenceState, Scorer};
use crate::mutate::Mutator;
use crate::render::{CardGeometry, Renderer, Resolution, Surface};
use crate::settings::RunConfig;
use crate::snapshot::SnapshotSink;
use crate::sprites::SpriteLibrary;
use crate::target::reference_image;

/// how a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// stopped before accepting the card for `at_iteration` (1-based)
    Cancelled { at_iteration: usize },
}

/// accepted cards in stacking order, plus how the run ended
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub cards: Vec<Candidate>,
    pub status: RunStatus,
}

/// placement loop state. owns the reference, the running reduced composite
/// and the accumulated card list; nothing else writes them.
pub struct Engine<'a> {
    config: RunConfig,
    scorer: Scorer<'a>,
    mutator: Mutator,
    params: GenerationParams,
    reference: ReferenceState,
    composite: Surface,
    cards: Vec<Candidate>,
    canvas: (u32, u32),
    rng: Pcg32,
}

impl<'a> Engine<'a> {
    /// validate `config` and build the reference state. nothing runs yet.
    pub fn new(config: &RunConfig, sprites: &'a SpriteLibrary, target: &RgbImage) -> Result<Self, RunError> {
        profiling::scope!("Engine::new");
        config.validate()?;
        if sprites.is_empty() {
            return Err(ResourceError::EmptySpriteLibrary(config.sprites_dir.clone()).into());
        }
        let params = GenerationParams::from_config(config);
        params.validate()?;

        let canvas = target.dimensions();
        let reference = ReferenceState::new(&reference_image(target, config.downscale)?);
        let composite = Surface::new(reference.width(), reference.height())?;

        let renderer = Renderer::new(sprites, CardGeometry::from_config(config));
        let scorer = Scorer::new(renderer, config.score_weights()?);
        let bounds = CandidateBounds::from_config(config, sprites.len() as u32, canvas.0, canvas.1);
        let mutator = Mutator::new(config.to_mutate_config(), bounds);

        Ok(Self {
            config: config.clone(),
            scorer,
            mutator,
            params,
            reference,
            composite,
            cards: Vec::new(),
            canvas,
            rng: Pcg32::seed_from_u64(config.seed),
        })
    }

    #[inline]
    pub fn cards(&self) -> &[Candidate] {
        &self.cards
    }

    /// running composite at reference resolution
    #[inline]
    pub fn composite(&self) -> &Surface {
        &self.composite
    }

    #[inline]
    pub fn reference(&self) -> &ReferenceState {
        &self.reference
    }

    /// full-resolution render of every accepted card
    pub fn render_full(&self) -> Result<Surface, RunError> {
        let (w, h) = self.canvas;
        Ok(self.scorer.renderer().render_all(&self.cards, w, h, Resolution::Full)?)
    }

    /// run up to `loop_count` iterations, one accepted card each.
    /// cancellation is polled before each iteration and before each round.
    pub fn run<S, P>(mut self, sink: &mut S, cancel: &CancelToken, snapshots: &mut P) -> Result<RunOutcome, RunError>
    where
        S: ProgressSink + ?Sized,
        P: SnapshotSink + ?Sized,
    {
        profiling::scope!("Engine::run");
        log::info!(
            "starting run: canvas {}x{}, reference {}x{}, {} sprites, {} iterations x {} rounds, population {} ({} elite x {} children)",
            self.canvas.0,
            self.canvas.1,
            self.reference.width(),
            self.reference.height(),
            self.mutator.bounds().sprite_count,
            self.config.loop_count,
            self.params.rounds,
            self.params.population_size,
            self.params.elite_count,
            self.params.mutations_per_parent,
        );

        let mut status = RunStatus::Completed;
        for iteration in 1..=self.config.loop_count {
            if cancel.is_cancelled() {
                status = RunStatus::Cancelled { at_iteration: iteration };
                break;
            }
            if !self.step(iteration, sink, cancel, snapshots)? {
                status = RunStatus::Cancelled { at_iteration: iteration };
                break;
            }
        }

        match status {
            RunStatus::Completed => {
                let full = self.render_full()?;
                let path = snapshots.result_path();
                snapshots.save(&full, &path)?;
                snapshots.export_cards(&self.cards)?;
                sink.emit(ProgressEvent::Snapshot { iteration: self.cards.len(), path: path.clone() });
                log::info!("run complete: {} cards, result saved to {}", self.cards.len(), path.display());
            }
            RunStatus::Cancelled { at_iteration } => {
                log::warn!("run cancelled at iteration {at_iteration} with {} cards accepted", self.cards.len());
            }
        }

        sink.emit(ProgressEvent::Finished {
            cards: self.cards.len(),
            cancelled: status != RunStatus::Completed,
        });
        Ok(RunOutcome { cards: self.cards, status })
    }

    /// one placement iteration. returns false when cancellation cut it short.
    fn step<S, P>(
        &mut self,
        iteration: usize,
        sink: &mut S,
        cancel: &CancelToken,
        snapshots: &mut P,
    ) -> Result<bool, RunError>
    where
        S: ProgressSink + ?Sized,
        P: SnapshotSink + ?Sized,
    {
        profiling::scope!("Engine::step");
        if self.config.weighted_error {
            self.reference.reweight(&self.composite, self.config.focus_strength);
        }
        sink.emit(ProgressEvent::IterationStarted { iteration });

        let generation = GenerationEngine::new(&self.scorer, &self.mutator, self.params)?;
        let result = generation.run(iteration, &self.composite, &self.reference, &mut self.rng, sink, cancel);
        if result.cancelled {
            return Ok(false);
        }

        let score = result.fitness.map(|f| f.total).unwrap_or(f64::NEG_INFINITY);
        self.scorer
            .renderer()
            .render(&mut self.composite, &result.winner, Resolution::Reduced);
        self.cards.push(result.winner.clone());

        let metrics = MetricsSnapshot::measure(self.reference.rgb(), self.composite.data());
        log::debug!(
            "iteration {iteration}: score {score:.5}, psnr {:.2} dB, card {:?}",
            metrics.psnr,
            result.winner
        );
        sink.emit(ProgressEvent::Accepted { iteration, score, candidate: result.winner });

        if iteration % self.config.save_interval == 0 {
            let full = self.render_full()?;
            let path = snapshots.snapshot_path(iteration);
            snapshots.save(&full, &path)?;
            log::info!("iteration {iteration}: snapshot saved to {}", path.display());
            sink.emit(ProgressEvent::Snapshot { iteration, path });
        }

        Ok(true)
    }
}

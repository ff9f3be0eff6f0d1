use rand::Rng;
use rayon::prelude::*;

use crate::candidate::Candidate;
use crate::error::ConfigError;
use crate::events::{CancelToken, ProgressEvent, ProgressSink};
use crate::fitness::{Fitness, ReferenceState, Scorer};
use crate::mutate::Mutator;
use crate::render::Surface;
use crate::settings::RunConfig;

/// population shape and round count of one generation engine run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationParams {
    pub population_size: usize,
    pub elite_count: usize,
    pub mutations_per_parent: usize,
    pub rounds: usize,
}

impl GenerationParams {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            population_size: cfg.population_size,
            elite_count: cfg.elite_count,
            mutations_per_parent: cfg.mutations_per_parent,
            rounds: cfg.rounds_per_loop,
        }
    }

    /// elite_count * (mutations_per_parent + 1) must equal population_size,
    /// otherwise the population drifts in size between rounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rounds == 0 {
            return Err(ConfigError::ZeroCount { name: "rounds_per_loop" });
        }
        if self.elite_count == 0 {
            return Err(ConfigError::ZeroCount { name: "elite_count" });
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
        Ok(())
    }
}

/// population slot. elites carry their score forward so they are never re-evaluated.
#[derive(Clone, Debug)]
pub struct Member {
    pub candidate: Candidate,
    pub fitness: Option<Fitness>,
}

impl Member {
    #[inline]
    fn score(&self) -> f64 {
        self.fitness.map(|f| f.total).unwrap_or(f64::NEG_INFINITY)
    }
}

/// outcome of one generation engine run
#[derive(Clone, Debug)]
pub struct GenerationResult {
    pub winner: Candidate,
    /// None when cancelled before the first round was scored
    pub fitness: Option<Fitness>,
    pub rounds_completed: usize,
    pub cancelled: bool,
}

/// per-card genetic search: random population, then rounds of
/// evaluate -> keep the elite -> refill with mutated children
pub struct GenerationEngine<'s, 'a> {
    scorer: &'s Scorer<'a>,
    mutator: &'s Mutator,
    params: GenerationParams,
}

impl<'s, 'a> GenerationEngine<'s, 'a> {
    pub fn new(scorer: &'s Scorer<'a>, mutator: &'s Mutator, params: GenerationParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { scorer, mutator, params })
    }

    /// search for the best next card over `composite`.
    /// cancellation is checked before every round; on cancel the current best
    /// member is returned as-is and the pending round is not run.
    pub fn run<R: Rng, S: ProgressSink + ?Sized>(
        &self,
        iteration: usize,
        composite: &Surface,
        reference: &ReferenceState,
        rng: &mut R,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> GenerationResult {
        profiling::scope!("GenerationEngine::run");
        let mut population = self.initial_population(rng);

        for round in 0..self.params.rounds {
            if cancel.is_cancelled() {
                return Self::result(population, round, true);
            }

            self.evaluate(&mut population, composite, reference);
            self.select(&mut population);

            let best_score = population[0].score();
            sink.emit(ProgressEvent::Round { iteration, round, best_score });

            if round + 1 < self.params.rounds {
                self.breed(&mut population, rng);
            }
        }

        Self::result(population, self.params.rounds, false)
    }

    /// `population_size` independent random candidates, unscored
    pub fn initial_population<R: Rng>(&self, rng: &mut R) -> Vec<Member> {
        profiling::scope!("initial_population");
        let bounds = self.mutator.bounds();
        (0..self.params.population_size)
            .map(|_| Member { candidate: bounds.random(rng), fitness: None })
            .collect()
    }

    /// score every member that has no score yet, in parallel.
    /// each evaluation renders onto its own scratch copy of `composite`.
    pub fn evaluate(&self, population: &mut [Member], composite: &Surface, reference: &ReferenceState) {
        profiling::scope!("evaluate_population");
        let scorer = self.scorer;
        population
            .par_iter_mut()
            .filter(|m| m.fitness.is_none())
            .for_each(|m| {
                m.fitness = Some(scorer.score_candidate(&m.candidate, composite, reference));
            });
    }

    /// stable sort by descending score, keep the top `elite_count`.
    /// equal scores keep their population order.
    pub fn select(&self, population: &mut Vec<Member>) {
        profiling::scope!("select_elite");
        population.sort_by(|a, b| b.score().total_cmp(&a.score()));
        population.truncate(self.params.elite_count);
    }

    /// append `mutations_per_parent` children per elite, grouped by parent
    pub fn breed<R: Rng>(&self, population: &mut Vec<Member>, rng: &mut R) {
        profiling::scope!("breed");
        let elites = population.len();
        population.reserve(elites * self.params.mutations_per_parent);
        for i in 0..elites {
            let parent = population[i].candidate.clone();
            for child in self.mutator.mutate(&parent, self.params.mutations_per_parent, rng) {
                population.push(Member { candidate: child, fitness: None });
            }
        }
        debug_assert_eq!(population.len(), self.params.population_size);
    }

    fn result(population: Vec<Member>, rounds_completed: usize, cancelled: bool) -> GenerationResult {
        // population is never empty: population_size >= elite_count >= 1
        let best = population.into_iter().next().unwrap_or_else(|| unreachable!("empty population"));
        GenerationResult {
            winner: best.candidate,
            fitness: best.fitness,
            rounds_completed,
            cancelled,
        }
    }
}

use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cardmosaic::engine_thread;
use cardmosaic::render::CardGeometry;
use cardmosaic::snapshot::load_cards;
use cardmosaic::{
    load_target, PngSnapshots, ProgressEvent, Renderer, Resolution, RunConfig, RunStatus, SnapshotSink,
    SpriteLibrary,
};

/// rebuild a picture out of playing-card sprites
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// base settings file (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// picture to approximate
    #[arg(long)]
    target: Option<PathBuf>,

    /// directory of card sprites
    #[arg(long)]
    sprites: Option<PathBuf>,

    /// directory for snapshots, result.png and cards.json
    #[arg(long)]
    output: Option<PathBuf>,

    /// number of cards to place
    #[arg(long)]
    loops: Option<usize>,

    /// genetic rounds per card
    #[arg(long)]
    rounds: Option<usize>,

    /// scoring resolution divisor
    #[arg(long)]
    downscale: Option<u32>,

    #[arg(long)]
    color_weight: Option<f64>,

    #[arg(long)]
    ssim_weight: Option<f64>,

    /// disable the color term
    #[arg(long)]
    no_color: bool,

    /// disable the structural (SSIM) term
    #[arg(long)]
    no_ssim: bool,

    /// reweight the color term toward badly matched pixels
    #[arg(long)]
    weighted: bool,

    #[arg(long)]
    focus_strength: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// worker threads for candidate evaluation (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// stop after this many seconds and keep the partial result
    #[arg(long)]
    time_limit: Option<u64>,

    /// write the effective settings to this file and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// re-render a saved cards.json at full resolution and exit
    #[arg(long)]
    render: Option<PathBuf>,
}

impl Args {
    fn apply(&self, cfg: &mut RunConfig) {
        if let Some(p) = &self.target {
            cfg.target_path = p.clone();
        }
        if let Some(p) = &self.sprites {
            cfg.sprites_dir = p.clone();
        }
        if let Some(p) = &self.output {
            cfg.output_dir = p.clone();
        }
        if let Some(v) = self.loops {
            cfg.loop_count = v;
        }
        if let Some(v) = self.rounds {
            cfg.rounds_per_loop = v;
        }
        if let Some(v) = self.downscale {
            cfg.downscale = v;
        }
        if let Some(v) = self.color_weight {
            cfg.color_weight = v;
        }
        if let Some(v) = self.ssim_weight {
            cfg.ssim_weight = v;
        }
        if self.no_color {
            cfg.use_color = false;
        }
        if self.no_ssim {
            cfg.use_ssim = false;
        }
        if self.weighted {
            cfg.weighted_error = true;
        }
        if let Some(v) = self.focus_strength {
            cfg.focus_strength = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // configure Rayon's global thread pool once at startup so worker threads get nice names like "rayon-0".
    let mut pool = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("rayon-{i}"));
    if let Some(n) = args.threads {
        pool = pool.num_threads(n);
    }
    let _ = pool.build_global();

    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    args.apply(&mut config);

    if let Some(path) = &args.write_config {
        config
            .save(path)
            .map_err(|e| anyhow!("failed to write settings to {}: {e}", path.display()))?;
        log::info!("settings written to {}", path.display());
        return Ok(());
    }

    config.validate().context("invalid settings")?;

    let sprites = Arc::new(SpriteLibrary::load_dir(&config.sprites_dir)?);
    let target = load_target(&config.target_path)?;
    let (width, height) = target.dimensions();

    if let Some(cards_path) = &args.render {
        let cards = load_cards(cards_path, sprites.len())?;
        let renderer = Renderer::new(&sprites, CardGeometry::from_config(&config));
        let surface = renderer.render_all(&cards, width, height, Resolution::Full)?;
        let mut out = PngSnapshots::new(&config.output_dir);
        let path = out.result_path();
        out.save(&surface, &path)?;
        log::info!("rendered {} cards to {}", cards.len(), path.display());
        return Ok(());
    }

    let loop_count = config.loop_count;
    let output_dir = config.output_dir.clone();
    let handle = engine_thread::spawn(
        config.clone(),
        Arc::clone(&sprites),
        target,
        PngSnapshots::new(&output_dir),
    )?;

    let started = Instant::now();
    let deadline = args.time_limit.map(Duration::from_secs);
    for event in handle.events() {
        match event {
            ProgressEvent::Round { iteration, round, best_score } => {
                log::trace!("card {iteration} round {round}: best {best_score:.5}");
            }
            ProgressEvent::Accepted { iteration, score, .. } => {
                log::info!("card {iteration}/{loop_count}: score {score:.5}");
            }
            ProgressEvent::Snapshot { path, .. } => {
                log::debug!("snapshot {}", path.display());
            }
            ProgressEvent::IterationStarted { .. } | ProgressEvent::Finished { .. } => {}
        }
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            handle.cancel();
        }
    }

    let outcome = handle.join()?;
    if let RunStatus::Cancelled { at_iteration } = outcome.status {
        // partial runs are saved here; the engine only writes result.png for completed runs
        let renderer = Renderer::new(&sprites, CardGeometry::from_config(&config));
        let surface = renderer.render_all(&outcome.cards, width, height, Resolution::Full)?;
        let mut out = PngSnapshots::new(&output_dir);
        let path = out.result_path();
        out.save(&surface, &path)?;
        out.export_cards(&outcome.cards)?;
        log::warn!(
            "stopped at card {at_iteration}; partial result with {} cards saved to {}",
            outcome.cards.len(),
            path.display()
        );
    }

    log::info!("done in {:.1}s", started.elapsed().as_secs_f64());
    Ok(())
}

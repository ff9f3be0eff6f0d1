use cardmosaic::fitness::{ReferenceState, Scorer};
use cardmosaic::render::CardGeometry;
use cardmosaic::settings::TintMode;
use cardmosaic::{
    run, CancelToken, ConfigError, MemorySnapshots, PngSnapshots, ProgressEvent, Renderer, RunConfig, RunError,
    RunStatus, Surface, SpriteLibrary,
};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

fn red_target() -> RgbImage {
    RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]))
}

fn red_deck() -> SpriteLibrary {
    SpriteLibrary::from_images(vec![RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]))])
}

fn solid_red_config() -> RunConfig {
    RunConfig {
        card_width: 2,
        card_height: 2,
        downscale: 1,
        min_scale: 1.0,
        max_scale: 3.5,
        rotation_min: 0.0,
        rotation_max: 0.0,
        loop_count: 1,
        rounds_per_loop: 1,
        population_size: 4,
        elite_count: 1,
        mutations_per_parent: 3,
        tint_mode: TintMode::Off,
        use_color: true,
        use_ssim: false,
        ..RunConfig::default()
    }
}

#[test]
fn test_solid_red_card_reproduces_solid_red_target() {
    let cfg = solid_red_config();
    let deck = red_deck();
    let mut events = Vec::new();
    let mut snaps = MemorySnapshots::default();
    let outcome = run(&cfg, &deck, &red_target(), &mut events, &CancelToken::new(), &mut snaps).unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.cards.len(), 1);

    let accepted_score = events.iter().find_map(|e| match e {
        ProgressEvent::Accepted { score, .. } => Some(*score),
        _ => None,
    });
    assert_eq!(accepted_score, Some(1.0));

    // score the winner again from scratch: the color term alone is a perfect match
    let scorer = Scorer::new(Renderer::new(&deck, CardGeometry::from_config(&cfg)), cfg.score_weights().unwrap());
    let reference = ReferenceState::new(&red_target());
    let fitness = scorer.score_candidate(&outcome.cards[0], &Surface::new(2, 2).unwrap(), &reference);
    assert_eq!(fitness.color, Some(1.0));

    // final full-resolution result is solid red
    let (_, result) = snaps.saved.last().unwrap();
    let img = result.to_rgba_image();
    assert!(img.pixels().all(|p| p.0 == [255, 0, 0, 255]));
}

#[test]
fn test_population_mismatch_fails_before_any_round() {
    let cfg = RunConfig { population_size: 5, ..solid_red_config() };
    let mut events = Vec::new();
    let err = run(
        &cfg,
        &red_deck(),
        &red_target(),
        &mut events,
        &CancelToken::new(),
        &mut MemorySnapshots::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Config(ConfigError::PopulationMismatch { population: 5, .. })));
    assert!(events.is_empty());
}

#[test]
fn test_cancelled_run_keeps_accepted_cards() {
    let cfg = RunConfig { loop_count: 50, rounds_per_loop: 3, ..solid_red_config() };
    let deck = red_deck();
    let cancel = CancelToken::new();

    // cancel from the observer once the third card is in
    struct StopAfterThird {
        cancel: CancelToken,
        accepted: usize,
    }
    impl cardmosaic::ProgressSink for StopAfterThird {
        fn emit(&mut self, event: ProgressEvent) {
            if let ProgressEvent::Accepted { .. } = event {
                self.accepted += 1;
                if self.accepted == 3 {
                    self.cancel.cancel();
                }
            }
        }
    }

    let mut sink = StopAfterThird { cancel: cancel.clone(), accepted: 0 };
    let mut snaps = MemorySnapshots::default();
    let outcome = run(&cfg, &deck, &red_target(), &mut sink, &cancel, &mut snaps).unwrap();

    assert_eq!(outcome.status, RunStatus::Cancelled { at_iteration: 4 });
    assert_eq!(outcome.cards.len(), 3);
    assert!(snaps.cards.is_none());
    assert!(snaps.saved.iter().all(|(p, _)| p.to_str() != Some("result.png")));
}

#[test]
fn test_png_outputs_written_for_completed_run() {
    let dir = std::env::temp_dir().join(format!("cardmosaic-e2e-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let cfg = RunConfig { loop_count: 5, save_interval: 5, ..solid_red_config() };
    let mut snaps = PngSnapshots::new(&dir);
    run(&cfg, &red_deck(), &red_target(), &mut cardmosaic::NoProgress, &CancelToken::new(), &mut snaps).unwrap();

    assert!(dir.join("temp_save5.png").is_file());
    assert!(dir.join("result.png").is_file());
    let cards = cardmosaic::snapshot::load_cards(&dir.join("cards.json"), 1).unwrap();
    assert_eq!(cards.len(), 5);
    let _ = std::fs::remove_dir_all(&dir);
}

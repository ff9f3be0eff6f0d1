use std::path::{Path, PathBuf};

use crate::candidate::Candidate;
use crate::error::SnapshotError;
use crate::render::Surface;

/// where full-resolution renders go
pub trait SnapshotSink {
    /// path for the periodic snapshot taken after `iteration` cards
    fn snapshot_path(&self, iteration: usize) -> PathBuf;

    /// path for the final composition
    fn result_path(&self) -> PathBuf;

    fn save(&mut self, surface: &Surface, path: &Path) -> Result<(), SnapshotError>;

    /// persist the accepted card list of a completed run
    fn export_cards(&mut self, _cards: &[Candidate]) -> Result<(), SnapshotError> {
        Ok(())
    }
}

/// writes PNGs (and cards.json) into one output directory
#[derive(Clone, Debug)]
pub struct PngSnapshots {
    dir: PathBuf,
}

impl PngSnapshots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn cards_path(&self) -> PathBuf {
        self.dir.join("cards.json")
    }

    fn ensure_dir(&self) -> Result<(), SnapshotError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| SnapshotError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }
}

impl SnapshotSink for PngSnapshots {
    fn snapshot_path(&self, iteration: usize) -> PathBuf {
        self.dir.join(format!("temp_save{iteration}.png"))
    }

    fn result_path(&self) -> PathBuf {
        self.dir.join("result.png")
    }

    fn save(&mut self, surface: &Surface, path: &Path) -> Result<(), SnapshotError> {
        profiling::scope!("PngSnapshots::save");
        self.ensure_dir()?;
        surface
            .to_rgba_image()
            .save(path)
            .map_err(|source| SnapshotError::Encode { path: path.to_path_buf(), source })
    }

    fn export_cards(&mut self, cards: &[Candidate]) -> Result<(), SnapshotError> {
        self.ensure_dir()?;
        let path = self.cards_path();
        let json = serde_json::to_string_pretty(cards)?;
        std::fs::write(&path, json).map_err(|source| SnapshotError::Export { path, source })
    }
}

/// keeps every saved surface in memory
#[derive(Default)]
pub struct MemorySnapshots {
    pub saved: Vec<(PathBuf, Surface)>,
    pub cards: Option<Vec<Candidate>>,
}

impl SnapshotSink for MemorySnapshots {
    fn snapshot_path(&self, iteration: usize) -> PathBuf {
        PathBuf::from(format!("temp_save{iteration}.png"))
    }

    fn result_path(&self) -> PathBuf {
        PathBuf::from("result.png")
    }

    fn save(&mut self, surface: &Surface, path: &Path) -> Result<(), SnapshotError> {
        self.saved.push((path.to_path_buf(), surface.clone()));
        Ok(())
    }

    fn export_cards(&mut self, cards: &[Candidate]) -> Result<(), SnapshotError> {
        self.cards = Some(cards.to_vec());
        Ok(())
    }
}

/// read a card list written by `PngSnapshots::export_cards`.
/// every card must name a sprite in a deck of `deck` sprites (ids 1..=deck).
pub fn load_cards(path: &Path, deck: usize) -> Result<Vec<Candidate>, SnapshotError> {
    let json = std::fs::read_to_string(path).map_err(|source| SnapshotError::Import {
        path: path.to_path_buf(),
        source,
    })?;
    let cards: Vec<Candidate> = serde_json::from_str(&json)?;
    if let Some((card, c)) = cards
        .iter()
        .enumerate()
        .find(|(_, c)| c.sprite_id == 0 || c.sprite_id as usize > deck)
    {
        return Err(SnapshotError::UnknownSprite {
            path: path.to_path_buf(),
            card: card + 1,
            sprite_id: c.sprite_id,
            deck,
        });
    }
    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cardmosaic-snapshot-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_png_paths_follow_naming() {
        let sink = PngSnapshots::new("Results");
        assert_eq!(sink.snapshot_path(15), Path::new("Results").join("temp_save15.png"));
        assert_eq!(sink.result_path(), Path::new("Results").join("result.png"));
    }

    #[test]
    fn test_save_creates_directory_and_png() {
        let dir = temp_dir("save");
        let mut sink = PngSnapshots::new(&dir);
        let path = sink.snapshot_path(5);
        sink.save(&Surface::new(3, 2).unwrap(), &path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_cards_round_trip_through_json() {
        let dir = temp_dir("cards");
        let mut sink = PngSnapshots::new(&dir);
        let cards = vec![Candidate {
            sprite_id: 4,
            rotation: -123.5,
            scale: 0.75,
            position: (10, 20),
            tint: [1, 2, 3],
            tint_strength: 0.8,
        }];
        sink.export_cards(&cards).unwrap();
        assert_eq!(load_cards(&sink.cards_path(), 4).unwrap(), cards);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_card_outside_deck_rejected_on_load() {
        let dir = temp_dir("unknown-sprite");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cards.json");
        std::fs::write(
            &path,
            r#"[
                {"sprite_id":1,"rotation":0.0,"scale":1.0,"position":[0,0],"tint":[0,0,0],"tint_strength":0.5},
                {"sprite_id":99,"rotation":0.0,"scale":1.0,"position":[0,0],"tint":[0,0,0],"tint_strength":0.5}
            ]"#,
        )
        .unwrap();

        match load_cards(&path, 1) {
            Err(SnapshotError::UnknownSprite { card, sprite_id, deck, .. }) => {
                assert_eq!((card, sprite_id, deck), (2, 99, 1));
            }
            other => panic!("expected unknown sprite error, got {other:?}"),
        }
        assert!(matches!(
            load_cards(&path.with_file_name("missing.json"), 1),
            Err(SnapshotError::Import { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_sprite_id_zero_rejected_on_load() {
        let dir = temp_dir("zero-sprite");
        let mut sink = PngSnapshots::new(&dir);
        let card = Candidate {
            sprite_id: 0,
            rotation: 0.0,
            scale: 1.0,
            position: (0, 0),
            tint: [0, 0, 0],
            tint_strength: 0.5,
        };
        sink.export_cards(&[card]).unwrap();
        assert!(matches!(
            load_cards(&sink.cards_path(), 52),
            Err(SnapshotError::UnknownSprite { card: 1, sprite_id: 0, deck: 52, .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}

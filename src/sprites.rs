use image::RgbaImage;
use std::path::{Path, PathBuf};

use crate::error::ResourceError;

const SPRITE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tiff"];

/// immutable deck of decoded sprites, addressed by id 1..=N.
/// loaded once before a run and shared read-only by every evaluation.
#[derive(Debug, Clone)]
pub struct SpriteLibrary {
    images: Vec<RgbaImage>,
    names: Vec<String>,
}

impl SpriteLibrary {
    /// load every image file in `dir`, ordered by file name. ids follow that order.
    pub fn load_dir(dir: &Path) -> Result<Self, ResourceError> {
        profiling::scope!("SpriteLibrary::load_dir");
        let io_err = |source| ResourceError::Io { path: dir.to_path_buf(), source };

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && has_sprite_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        if paths.is_empty() {
            return Err(ResourceError::EmptySpriteLibrary(dir.to_path_buf()));
        }

        let mut images = Vec::with_capacity(paths.len());
        let mut names = Vec::with_capacity(paths.len());
        for path in paths {
            let img = image::open(&path).map_err(|source| ResourceError::Decode {
                path: path.clone(),
                source,
            })?;
            images.push(img.to_rgba8());
            names.push(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
        }

        log::info!("loaded {} sprites from {}", images.len(), dir.display());
        Ok(Self { images, names })
    }

    /// in-memory library; ids follow vector order
    pub fn from_images(images: Vec<RgbaImage>) -> Self {
        let names = (1..=images.len()).map(|i| format!("sprite-{i}")).collect();
        Self { images, names }
    }

    /// sprite for `id` (1-based). ids outside 1..=N are a caller bug.
    #[inline]
    pub fn get(&self, id: u32) -> &RgbaImage {
        let idx = (id as usize)
            .checked_sub(1)
            .filter(|&i| i < self.images.len())
            .unwrap_or_else(|| panic!("sprite id {id} outside 1..={}", self.images.len()));
        &self.images[idx]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

fn has_sprite_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SPRITE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::Path;

use crate::error::ResourceError;

/// decode the target picture as RGB8. its size is the full canvas size.
pub fn load_target(path: &Path) -> Result<RgbImage, ResourceError> {
    profiling::scope!("load_target");
    let img = image::open(path).map_err(|source| match source {
        image::ImageError::IoError(source) => ResourceError::Io { path: path.to_path_buf(), source },
        source => ResourceError::Decode { path: path.to_path_buf(), source },
    })?;
    let rgb = img.to_rgb8();
    log::info!("target {} is {}x{}", path.display(), rgb.width(), rgb.height());
    Ok(rgb)
}

/// reference image the population is scored against: the target shrunk by `downscale`
pub fn reference_image(target: &RgbImage, downscale: u32) -> Result<RgbImage, ResourceError> {
    profiling::scope!("reference_image");
    let (width, height) = target.dimensions();
    let d = downscale.max(1);
    let (rw, rh) = (width / d, height / d);
    if rw == 0 || rh == 0 {
        return Err(ResourceError::TargetTooSmall { width, height, downscale });
    }
    if d == 1 {
        return Ok(target.clone());
    }
    Ok(imageops::resize(target, rw, rh, FilterType::Lanczos3))
}

/// Loupe (magnifier) rendering
use image::imageops::FilterType;
use image::DynamicImage;

use crate::geo::mapper::SourceWindow;

/// Square RGBA patch shown in the loupe panel
#[derive(Debug, Clone, PartialEq)]
pub struct LoupeImage {
    pub size: u32,
    pub rgba: Vec<u8>,
}

/// Crop `window` out of the full-resolution image and blow it up to
/// `size x size` with nearest-neighbour sampling.
///
/// Returns `None` when the window rounds to an empty crop; the caller hides
/// the loupe in that case.
pub fn render_loupe(image: &DynamicImage, window: &SourceWindow, size: u32) -> Option<LoupeImage> {
    let left = window.left.floor().max(0.0) as u32;
    let top = window.top.floor().max(0.0) as u32;
    let right = (window.right.ceil().max(0.0) as u32).min(image.width());
    let bottom = (window.bottom.ceil().max(0.0) as u32).min(image.height());

    if size == 0 || right <= left || bottom <= top {
        return None;
    }

    let zoomed = image
        .crop_imm(left, top, right - left, bottom - top)
        .resize_exact(size, size, FilterType::Nearest);

    Some(LoupeImage {
        size,
        rgba: zoomed.to_rgba8().into_raw(),
    })
}

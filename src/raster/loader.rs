/// Raster loader
///
/// Decodes a batch raster once, keeping the full-resolution pixels for the
/// loupe and a downscaled RGBA preview for the canvas.
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;

use crate::error::{GeorefError, Result};
use crate::state::data::RasterRecord;

/// Longest edge of the on-screen preview
pub const PREVIEW_MAX_EDGE: u32 = 2048;

/// Downscaled RGBA pixels for display
#[derive(Debug, Clone)]
pub struct Preview {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug)]
pub struct LoadedRaster {
    pub record: RasterRecord,
    pub preview: Preview,
    /// Full-resolution pixels, sampled by the loupe
    pub full: DynamicImage,
}

/// Outcome of a background load, `Clone` so it can ride in a UI message
pub type LoadResult = std::result::Result<Arc<LoadedRaster>, String>;

/// Load a raster off the UI thread
///
/// # Returns
/// The requested path, so the caller can drop stale loads, and:
/// * `Ok(raster)` - Decoded raster, shared with the UI
/// * `Err(String)` - Error message if loading fails
pub async fn load_raster(path: PathBuf) -> (PathBuf, LoadResult) {
    let target = path.clone();
    // Spawn blocking because TIFF decoding is CPU-intensive
    let result = task::spawn_blocking(move || load_raster_blocking(&target))
        .await
        .map_err(GeorefError::from)
        .and_then(|loaded| loaded)
        .map(Arc::new)
        .map_err(|e| e.to_string());
    (path, result)
}

/// Blocking implementation of raster loading
pub fn load_raster_blocking(path: &Path) -> Result<LoadedRaster> {
    let mut reader = ImageReader::open(path)?.with_guessed_format()?;
    // Map scans routinely exceed the decoder's default allocation limit
    reader.no_limits();
    let full = reader.decode()?;

    let record = RasterRecord::new(path.to_path_buf(), full.width(), full.height());
    log::info!("🗺️  Loaded {}: {}x{}", record.filename, record.width, record.height);

    let preview = if full.width() > PREVIEW_MAX_EDGE || full.height() > PREVIEW_MAX_EDGE {
        full.resize(PREVIEW_MAX_EDGE, PREVIEW_MAX_EDGE, FilterType::Triangle)
    } else {
        full.clone()
    };
    let preview = Preview {
        width: preview.width(),
        height: preview.height(),
        rgba: preview.to_rgba8().into_raw(),
    };

    Ok(LoadedRaster { record, preview, full })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn test_load_small_tiff() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sheet.tif");
        RgbImage::from_pixel(64, 32, Rgb([200, 10, 10])).save(&path).unwrap();

        let loaded = load_raster_blocking(&path).unwrap();
        assert_eq!(loaded.record.filename, "sheet.tif");
        assert_eq!((loaded.record.width, loaded.record.height), (64, 32));
        assert_eq!((loaded.preview.width, loaded.preview.height), (64, 32));
        assert_eq!(loaded.preview.rgba.len(), 64 * 32 * 4);
    }

    #[test]
    fn test_preview_is_downscaled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.tif");
        RgbImage::new(PREVIEW_MAX_EDGE * 2, 16).save(&path).unwrap();

        let loaded = load_raster_blocking(&path).unwrap();
        assert_eq!(loaded.record.width, PREVIEW_MAX_EDGE * 2);
        assert_eq!(loaded.preview.width, PREVIEW_MAX_EDGE);
        assert!(loaded.preview.height <= 8);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let requested = PathBuf::from("/nonexistent/sheet.tif");
        let (path, result) = load_raster(requested.clone()).await;
        assert_eq!(path, requested);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_reports_requested_path() {
        let dir = TempDir::new().unwrap();
        let requested = dir.path().join("sheet_07.tif");
        RgbImage::new(8, 8).save(&requested).unwrap();

        let (path, result) = load_raster(requested.clone()).await;
        assert_eq!(path, requested);
        assert_eq!(result.unwrap().record.path, requested);
    }
}

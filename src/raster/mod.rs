/// Raster handling module
///
/// This module handles:
/// - Listing the GeoTIFF scans of a batch folder
/// - Decoding a raster (native size, display preview, full-res pixels)
/// - Cropping the magnified loupe preview

pub mod scan;
pub mod loader;
pub mod loupe;

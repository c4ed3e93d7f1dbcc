/// Widgets drawn over the raster preview

pub mod canvas;

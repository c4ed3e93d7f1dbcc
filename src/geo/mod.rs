/// Georeferencing core
///
/// - Screen/image/loupe coordinate mapping (mapper.rs)
/// - Lambert Conformal Conic definition and datums (projection.rs)
/// - Typed rectification operations (operation.rs)
/// - Six correspondences → operation list (synth.rs)
/// - Operations → bash block for the GDAL tools (render.rs)

pub mod mapper;
pub mod projection;
pub mod operation;
pub mod synth;
pub mod render;

/// Screen ↔ image coordinate conversion
///
/// Three spaces are involved:
/// - screen: canvas pixels as delivered by the click/motion events
/// - image: native raster pixels (what ends up in the -gcp arguments)
/// - loupe: the source window sampled for the magnified preview
///
/// Everything here is pure arithmetic.
use cgmath::{Point2, Vector2};

/// On-screen loupe edge length in pixels
pub const LOUPE_SIZE: u32 = 150;

/// Loupe magnification factor
pub const LOUPE_ZOOM: f64 = 4.0;

/// Convert a screen position into native image pixels.
///
/// `px = (event_x - offset_x) / scale`, `py = (event_y - offset_y) / scale`.
///
/// # Panics
/// A non-positive scale means the display transform was never set up.
pub fn screen_to_image(
    event_x: f64,
    event_y: f64,
    offset_x: f64,
    offset_y: f64,
    scale: f64,
) -> (f64, f64) {
    assert!(scale > 0.0, "display scale must be positive, got {scale}");
    ((event_x - offset_x) / scale, (event_y - offset_y) / scale)
}

/// Uniform scale + offset used to place one raster on the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTransform {
    /// Top-left corner of the displayed image, in screen pixels
    pub offset: Vector2<f64>,
    /// Screen pixels per native pixel
    pub scale: f64,
    /// Native raster size
    pub native: Vector2<f64>,
}

impl DisplayTransform {
    /// Fit a native raster into a viewport, preserving aspect and centering it.
    ///
    /// `scale = min(viewport_w / native_w, viewport_h / native_h)`
    pub fn fit(viewport_width: f64, viewport_height: f64, native_width: u32, native_height: u32) -> Self {
        let native = Vector2::new(native_width as f64, native_height as f64);
        let scale = (viewport_width / native.x).min(viewport_height / native.y);
        let offset = Vector2::new(
            (viewport_width - native.x * scale) / 2.0,
            (viewport_height - native.y * scale) / 2.0,
        );

        Self { offset, scale, native }
    }

    /// Map a screen position to native pixels, or `None` if it falls
    /// outside `[0, width] x [0, height]`
    pub fn screen_to_image(&self, screen: Point2<f64>) -> Option<Point2<f64>> {
        let (px, py) = screen_to_image(screen.x, screen.y, self.offset.x, self.offset.y, self.scale);

        if px < 0.0 || py < 0.0 || px > self.native.x || py > self.native.y {
            return None;
        }

        Some(Point2::new(px, py))
    }

    /// Placement transform used to draw markers over the displayed image
    pub fn image_to_screen(&self, image: Point2<f64>) -> Point2<f64> {
        Point2::new(
            self.offset.x + image.x * self.scale,
            self.offset.y + image.y * self.scale,
        )
    }
}

/// Native-pixel rectangle sampled for the loupe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceWindow {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl SourceWindow {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Source window for the loupe around `focus` (native pixels).
///
/// The sampled radius is `(loupe_size / 2) / zoom`. The rectangle is
/// clamped to the image, so near the edges the crop shrinks and the
/// effective magnification grows once it is stretched back to
/// `loupe_size`.
pub fn loupe_window(
    focus: Point2<f64>,
    native_width: u32,
    native_height: u32,
    loupe_size: u32,
    zoom: f64,
) -> Option<SourceWindow> {
    let (width, height) = (native_width as f64, native_height as f64);
    if focus.x < 0.0 || focus.y < 0.0 || focus.x > width || focus.y > height {
        return None;
    }

    let radius = (loupe_size as f64 / 2.0) / zoom;
    let window = SourceWindow {
        left: (focus.x - radius).max(0.0),
        top: (focus.y - radius).max(0.0),
        right: (focus.x + radius).min(width),
        bottom: (focus.y + radius).min(height),
    };

    if window.width() <= 0.0 || window.height() <= 0.0 {
        return None;
    }

    Some(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_screen_to_image_formula() {
        let (px, py) = screen_to_image(250.0, 130.0, 50.0, 30.0, 0.5);
        assert_relative_eq!(px, 400.0);
        assert_relative_eq!(py, 200.0);
    }

    #[test]
    #[should_panic(expected = "display scale must be positive")]
    fn test_zero_scale_is_fatal() {
        screen_to_image(1.0, 1.0, 0.0, 0.0, 0.0);
    }

    #[test]
    fn test_fit_centers_wide_image() {
        // 2000x1000 into 1000x800: width-limited, letterboxed vertically
        let t = DisplayTransform::fit(1000.0, 800.0, 2000, 1000);
        assert_relative_eq!(t.scale, 0.5);
        assert_relative_eq!(t.offset.x, 0.0);
        assert_relative_eq!(t.offset.y, 150.0);
    }

    #[test]
    fn test_fit_upscales_small_image() {
        let t = DisplayTransform::fit(1000.0, 800.0, 100, 100);
        assert_relative_eq!(t.scale, 8.0);
        assert_relative_eq!(t.offset.x, 100.0);
        assert_relative_eq!(t.offset.y, 0.0);
    }

    #[test]
    fn test_screen_to_image_inverts_placement() {
        let t = DisplayTransform::fit(1280.0, 720.0, 4321, 3017);
        for &(x, y) in &[(0.0, 0.0), (1234.567, 89.125), (4000.5, 3000.25)] {
            let screen = t.image_to_screen(Point2::new(x, y));
            let back = t.screen_to_image(screen).expect("inside image");
            assert_relative_eq!(back.x, x, epsilon = 1e-9);
            assert_relative_eq!(back.y, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_clicks_outside_image_rejected() {
        let t = DisplayTransform::fit(1000.0, 800.0, 2000, 1000);
        // Letterbox band above the image
        assert!(t.screen_to_image(Point2::new(500.0, 100.0)).is_none());
        // Right of the image after an upscale
        let t = DisplayTransform::fit(1000.0, 800.0, 100, 100);
        assert!(t.screen_to_image(Point2::new(950.0, 400.0)).is_none());
        // Edges are inclusive
        assert!(t.screen_to_image(Point2::new(900.0, 800.0)).is_some());
    }

    #[test]
    fn test_loupe_window_interior() {
        let w = loupe_window(Point2::new(500.0, 500.0), 1000, 1000, LOUPE_SIZE, LOUPE_ZOOM).unwrap();
        // radius = 75 / 4
        assert_relative_eq!(w.left, 481.25);
        assert_relative_eq!(w.right, 518.75);
        assert_relative_eq!(w.width(), 37.5);
        assert_relative_eq!(w.height(), 37.5);
    }

    #[test]
    fn test_loupe_window_clamped_at_corner() {
        let w = loupe_window(Point2::new(5.0, 995.0), 1000, 1000, LOUPE_SIZE, LOUPE_ZOOM).unwrap();
        assert_relative_eq!(w.left, 0.0);
        assert_relative_eq!(w.bottom, 1000.0);
        assert!(w.width() < 37.5);
        assert!(w.height() < 37.5);
    }

    #[test]
    fn test_loupe_window_outside_or_degenerate() {
        assert!(loupe_window(Point2::new(-1.0, 10.0), 100, 100, LOUPE_SIZE, LOUPE_ZOOM).is_none());
        assert!(loupe_window(Point2::new(0.0, 0.0), 0, 0, LOUPE_SIZE, LOUPE_ZOOM).is_none());
    }
}

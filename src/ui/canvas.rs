/// Click surface layered over the raster preview
///
/// Converts mouse input into canvas-relative events and draws the captured
/// markers, the markers of a previous logging pass and the focus crosshair.
use cgmath::Point2;
use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Path, Program, Stroke, Text};
use iced::{Color, Pixels, Point, Rectangle, Renderer, Size, Theme, Vector};

use crate::geo::mapper::DisplayTransform;
use crate::state::data::CorrespondencePoint;

const MARKER_RADIUS: f32 = 5.0;
const CROSSHAIR_ARM: f32 = 12.0;

/// Pointer input, in canvas-relative screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasEvent {
    Clicked { position: Point, viewport: Size },
    /// Right or middle button
    Undo,
    Moved { position: Point, viewport: Size },
    Left,
}

/// Map a canvas-relative position to native pixels for a raster fitted
/// into `viewport`. `None` for an empty viewport or a point outside the
/// displayed image.
pub fn pointer_to_image(position: Point, viewport: Size, native: (u32, u32)) -> Option<Point2<f64>> {
    fitted(viewport, native)?.screen_to_image(Point2::new(position.x as f64, position.y as f64))
}

/// Display transform for a raster fitted into `viewport`
pub fn fitted(viewport: Size, native: (u32, u32)) -> Option<DisplayTransform> {
    if viewport.width <= 0.0 || viewport.height <= 0.0 || native.0 == 0 || native.1 == 0 {
        return None;
    }
    Some(DisplayTransform::fit(
        viewport.width as f64,
        viewport.height as f64,
        native.0,
        native.1,
    ))
}

pub struct ClickCanvas<'a> {
    /// Native raster size
    pub native: (u32, u32),
    pub points: &'a [CorrespondencePoint],
    /// Points from the last time this raster was logged
    pub ghosts: &'a [CorrespondencePoint],
    /// Loupe focus, native pixels
    pub focus: Option<Point2<f64>>,
}

/// Whether the pointer was over the canvas on the previous move
#[derive(Debug, Clone, Default)]
pub struct HoverState {
    pub inside: bool,
}

impl<'a> Program<CanvasEvent> for ClickCanvas<'a> {
    type State = HoverState;

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<CanvasEvent>) {
        let viewport = bounds.size();

        match event {
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(position) = cursor.position_in(bounds) {
                    return (
                        canvas::event::Status::Captured,
                        Some(CanvasEvent::Clicked { position, viewport }),
                    );
                }
            }

            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Right | mouse::Button::Middle)) => {
                if cursor.is_over(bounds) {
                    return (canvas::event::Status::Captured, Some(CanvasEvent::Undo));
                }
            }

            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) => match cursor.position_in(bounds) {
                Some(position) => {
                    state.inside = true;
                    return (
                        canvas::event::Status::Ignored,
                        Some(CanvasEvent::Moved { position, viewport }),
                    );
                }
                None if state.inside => {
                    state.inside = false;
                    return (canvas::event::Status::Ignored, Some(CanvasEvent::Left));
                }
                None => {}
            },

            canvas::Event::Mouse(mouse::Event::CursorLeft) if state.inside => {
                state.inside = false;
                return (canvas::event::Status::Ignored, Some(CanvasEvent::Left));
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let Some(transform) = fitted(bounds.size(), self.native) else {
            return vec![frame.into_geometry()];
        };
        let to_screen = |x: f64, y: f64| {
            let p = transform.image_to_screen(Point2::new(x, y));
            Point::new(p.x as f32, p.y as f32)
        };

        let ghost = Color::from_rgba(0.7, 0.7, 0.7, 0.6);
        for point in self.ghosts {
            let center = to_screen(point.x, point.y);
            frame.stroke(
                &Path::circle(center, MARKER_RADIUS),
                Stroke::default().with_color(ghost).with_width(1.5),
            );
        }

        let marker = Color::from_rgb(1.0, 0.2, 0.2);
        for point in self.points {
            let center = to_screen(point.x, point.y);
            frame.fill(&Path::circle(center, MARKER_RADIUS), marker);
            frame.fill_text(Text {
                content: point.label.number().to_string(),
                position: center + Vector::new(MARKER_RADIUS + 2.0, -MARKER_RADIUS - 12.0),
                color: marker,
                size: Pixels(14.0),
                ..Text::default()
            });
        }

        if let Some(focus) = self.focus {
            let center = to_screen(focus.x, focus.y);
            let crosshair = Path::new(|builder| {
                builder.move_to(center - Vector::new(CROSSHAIR_ARM, 0.0));
                builder.line_to(center + Vector::new(CROSSHAIR_ARM, 0.0));
                builder.move_to(center - Vector::new(0.0, CROSSHAIR_ARM));
                builder.line_to(center + Vector::new(0.0, CROSSHAIR_ARM));
            });
            frame.stroke(
                &crosshair,
                Stroke::default().with_color(Color::from_rgb(1.0, 0.9, 0.0)).with_width(1.0),
            );
        }

        vec![frame.into_geometry()]
    }

    fn mouse_interaction(&self, _state: &Self::State, bounds: Rectangle, cursor: Cursor) -> mouse::Interaction {
        if cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pointer_to_image_letterboxed() {
        // 2:1 raster in a square viewport: 100 px bands above and below
        let viewport = Size::new(400.0, 400.0);
        let p = pointer_to_image(Point::new(200.0, 200.0), viewport, (4000, 2000)).unwrap();
        assert_relative_eq!(p.x, 2000.0);
        assert_relative_eq!(p.y, 1000.0);

        assert!(pointer_to_image(Point::new(200.0, 50.0), viewport, (4000, 2000)).is_none());
    }

    #[test]
    fn test_empty_viewport() {
        assert!(fitted(Size::new(0.0, 300.0), (100, 100)).is_none());
        assert!(pointer_to_image(Point::ORIGIN, Size::new(10.0, 10.0), (0, 10)).is_none());
    }
}

/// Six-point correspondence capture for one raster
///
/// Clicks arrive already converted to native pixels. The session only
/// tracks order, bounds and completion; it has no notion of time.
use super::data::{CapturedPoints, CorrespondencePoint, PointLabel, POINTS_PER_IMAGE};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    /// 1..=5 points captured
    Collecting(usize),
    Complete,
}

/// Result of offering a point to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Out of bounds, or the session is already complete
    Ignored,
    Recorded(PointLabel),
    /// The sixth point, first time this session reached six
    Completed,
}

/// What the operator should click next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPoint {
    Point(PointLabel),
    Done,
}

impl fmt::Display for NextPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextPoint::Point(label) => write!(f, "{label}"),
            NextPoint::Done => f.write_str("Done"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorrespondenceSession {
    width: f64,
    height: f64,
    points: Vec<CorrespondencePoint>,
    /// Latched on the first 5 → 6 transition, cleared by reset()
    completion_fired: bool,
}

impl CorrespondenceSession {
    /// Start an empty session bounded by the raster's native size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f64,
            height: height as f64,
            points: Vec::with_capacity(POINTS_PER_IMAGE),
            completion_fired: false,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.points.len() {
            0 => SessionState::Empty,
            n if n < POINTS_PER_IMAGE => SessionState::Collecting(n),
            _ => SessionState::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == SessionState::Complete
    }

    pub fn points(&self) -> &[CorrespondencePoint] {
        &self.points
    }

    pub fn add_point(&mut self, px: f64, py: f64) -> Capture {
        if self.is_complete() {
            return Capture::Ignored;
        }
        if !(0.0..=self.width).contains(&px) || !(0.0..=self.height).contains(&py) {
            return Capture::Ignored;
        }

        let Some(label) = PointLabel::from_index(self.points.len()) else {
            return Capture::Ignored;
        };
        self.points.push(CorrespondencePoint { label, x: px, y: py });

        if self.is_complete() && !self.completion_fired {
            self.completion_fired = true;
            Capture::Completed
        } else {
            Capture::Recorded(label)
        }
    }

    /// Remove the most recent point (LIFO)
    pub fn undo_last(&mut self) -> Option<CorrespondencePoint> {
        self.points.pop()
    }

    pub fn reset(&mut self) {
        self.points.clear();
        self.completion_fired = false;
    }

    pub fn label_for_next(&self) -> NextPoint {
        match PointLabel::from_index(self.points.len()) {
            Some(label) => NextPoint::Point(label),
            None => NextPoint::Done,
        }
    }

    /// The six points, only when complete
    pub fn captured(&self) -> Option<CapturedPoints> {
        let points: [CorrespondencePoint; POINTS_PER_IMAGE] = self.points.as_slice().try_into().ok()?;
        Some(CapturedPoints(points))
    }
}

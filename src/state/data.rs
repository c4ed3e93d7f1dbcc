/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the capture session, the synthesizer and the UI layer.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::Result;
use crate::geo::projection::required_number;

/// Number of reference points per image
pub const POINTS_PER_IMAGE: usize = 6;

/// Fixed meaning of each reference point, in capture order
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointLabel {
    TopLeft,
    TopMid,
    TopRight,
    BottomLeft,
    BottomMid,
    BottomRight,
}

impl PointLabel {
    pub const ALL: [PointLabel; POINTS_PER_IMAGE] = [
        PointLabel::TopLeft,
        PointLabel::TopMid,
        PointLabel::TopRight,
        PointLabel::BottomLeft,
        PointLabel::BottomMid,
        PointLabel::BottomRight,
    ];

    /// Label expected at a given capture index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Position in capture order (0-based)
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// 1-based number used for script variables (X1, Y1, ...)
    pub fn number(&self) -> usize {
        self.index() + 1
    }
}

impl fmt::Display for PointLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PointLabel::TopLeft => "Top-Left",
            PointLabel::TopMid => "Top-Mid",
            PointLabel::TopRight => "Top-Right",
            PointLabel::BottomLeft => "Bot-Left",
            PointLabel::BottomMid => "Bot-Mid",
            PointLabel::BottomRight => "Bot-Right",
        };
        write!(f, "{}. {}", self.number(), name)
    }
}

/// One captured click, in native image pixels
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CorrespondencePoint {
    pub label: PointLabel,
    pub x: f64,
    pub y: f64,
}

/// All six points of a completed session, in label order.
///
/// Only `CorrespondenceSession::captured` builds one, so holding a value
/// means the session was complete.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CapturedPoints(pub(crate) [CorrespondencePoint; POINTS_PER_IMAGE]);

impl CapturedPoints {
    pub fn points(&self) -> &[CorrespondencePoint; POINTS_PER_IMAGE] {
        &self.0
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One raster of the batch
#[derive(Debug, Clone, PartialEq)]
pub struct RasterRecord {
    /// Full path to the raster file
    pub path: PathBuf,
    /// Filename only (e.g., "sheet_017.tif")
    pub filename: String,
    /// Native width in pixels
    pub width: u32,
    /// Native height in pixels
    pub height: u32,
}

impl RasterRecord {
    pub fn new(path: PathBuf, width: u32, height: u32) -> Self {
        let filename = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self { path, filename, width, height }
    }
}

/// Graticule coordinate of one reference point, as typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoCoordinate {
    pub lon: String,
    pub lat: String,
}

/// The six graticule targets shared by every image of the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoTargets(pub [GeoCoordinate; POINTS_PER_IMAGE]);

impl GeoTargets {
    /// Validate six (lon, lat) text pairs in label order
    pub fn parse(pairs: &[(String, String); POINTS_PER_IMAGE]) -> Result<Self> {
        for (label, (lon, lat)) in PointLabel::ALL.iter().zip(pairs.iter()) {
            required_number(&format!("{label} lon"), lon)?;
            required_number(&format!("{label} lat"), lat)?;
        }

        Ok(Self(std::array::from_fn(|i| GeoCoordinate {
            lon: pairs[i].0.trim().to_string(),
            lat: pairs[i].1.trim().to_string(),
        })))
    }

    pub fn get(&self, label: PointLabel) -> &GeoCoordinate {
        &self.0[label.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order_and_display() {
        assert_eq!(PointLabel::from_index(0), Some(PointLabel::TopLeft));
        assert_eq!(PointLabel::from_index(5), Some(PointLabel::BottomRight));
        assert_eq!(PointLabel::from_index(6), None);
        assert_eq!(PointLabel::BottomLeft.index(), 3);
        assert_eq!(PointLabel::TopLeft.to_string(), "1. Top-Left");
        assert_eq!(PointLabel::BottomRight.to_string(), "6. Bot-Right");
    }

    #[test]
    fn test_raster_record_filename() {
        let record = RasterRecord::new(PathBuf::from("/maps/sheet 01.tif"), 100, 50);
        assert_eq!(record.filename, "sheet 01.tif");
    }

    #[test]
    fn test_geo_targets_validate() {
        let mut pairs: [(String, String); POINTS_PER_IMAGE] =
            std::array::from_fn(|i| (format!("-10{i}"), " 34.5 ".to_string()));
        let targets = GeoTargets::parse(&pairs).unwrap();
        assert_eq!(targets.get(PointLabel::TopMid).lon, "-101");
        assert_eq!(targets.get(PointLabel::TopMid).lat, "34.5");

        pairs[4].1 = "north".to_string();
        let err = GeoTargets::parse(&pairs).unwrap_err();
        assert!(err.to_string().starts_with("5. Bot-Mid lat"));
    }
}

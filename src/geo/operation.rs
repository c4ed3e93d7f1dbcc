/// Typed rectification operations
///
/// The synthesizer produces these; only `geo::render` turns them into
/// command lines.
use serde::{Deserialize, Serialize};
use std::fmt;

use super::projection::Datum;
use crate::error::{GeorefError, Result};
use crate::state::data::PointLabel;

/// Geometric transform fit to the control points
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarpModel {
    Order1,
    #[default]
    Order2,
    Order3,
    Tps,
}

impl WarpModel {
    pub const ALL: [WarpModel; 4] = [WarpModel::Order1, WarpModel::Order2, WarpModel::Order3, WarpModel::Tps];

    /// Polynomial degree, `None` for thin-plate spline
    pub fn degree(&self) -> Option<u8> {
        match self {
            WarpModel::Order1 => Some(1),
            WarpModel::Order2 => Some(2),
            WarpModel::Order3 => Some(3),
            WarpModel::Tps => None,
        }
    }
}

impl fmt::Display for WarpModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.degree() {
            Some(n) => write!(f, "order{n}"),
            None => write!(f, "tps"),
        }
    }
}

/// Resampling kernel used by both warps
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    Near,
    Bilinear,
    #[default]
    Cubic,
    Lanczos,
}

impl Resampling {
    pub const ALL: [Resampling; 4] = [Resampling::Near, Resampling::Bilinear, Resampling::Cubic, Resampling::Lanczos];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resampling::Near => "near",
            Resampling::Bilinear => "bilinear",
            Resampling::Cubic => "cubic",
            Resampling::Lanczos => "lanczos",
        }
    }
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GCP outlier rejection before the final fit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refinement {
    pub tolerance: String,
    pub min_gcps: u32,
}

impl Refinement {
    /// Both fields given → validated refinement; either blank → disabled.
    pub fn parse(tolerance: &str, min_gcps: &str) -> Result<Option<Self>> {
        let (tol, min) = (tolerance.trim(), min_gcps.trim());
        if tol.is_empty() || min.is_empty() {
            return Ok(None);
        }

        let invalid = || GeorefError::InvalidRefinement {
            tolerance: tolerance.to_string(),
            min_gcps: min_gcps.to_string(),
        };
        match tol.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => {}
            _ => return Err(invalid()),
        }
        let min_gcps = min.parse::<u32>().map_err(|_| invalid())?;

        Ok(Some(Self {
            tolerance: tol.to_string(),
            min_gcps,
        }))
    }
}

/// Final output CRS, normalized to `AUTHORITY:CODE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCrs(String);

impl TargetCrs {
    /// Blank → no final reprojection. Bare digits are EPSG codes.
    pub fn parse(value: &str) -> Result<Option<Self>> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Some(Self(format!("EPSG:{trimmed}"))));
        }

        match trimmed.split_once(':') {
            Some((authority, code))
                if !authority.is_empty()
                    && !code.is_empty()
                    && authority.chars().all(|c| c.is_ascii_alphabetic())
                    && code.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                Ok(Some(Self(format!("{}:{}", authority.to_ascii_uppercase(), code))))
            }
            _ => Err(GeorefError::InvalidTargetCrs(value.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Coordinate reference systems an operation can refer to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Crs {
    /// Graticule input datum
    Geographic(Datum),
    /// The batch's LCC definition
    Conic,
    /// Operator-supplied final CRS
    Target(TargetCrs),
}

/// Geographic side of one control point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GcpTarget {
    /// lon/lat used as typed
    Geographic { lon: String, lat: String },
    /// X/Y produced by the ReprojectPoint for this label
    Preprojected(PointLabel),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlPoint {
    pub label: PointLabel,
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub target: GcpTarget,
}

impl ControlPoint {
    /// Pixel/line with three decimals
    pub fn pixel_text(&self) -> (String, String) {
        (format!("{:.3}", self.pixel_x), format!("{:.3}", self.pixel_y))
    }
}

/// Intermediate rasters the script creates and removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// Source copy carrying the GCPs
    ControlPointTagged,
    /// Rectified raster in the conic projection
    Conic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarpSettings {
    pub model: WarpModel,
    pub resampling: Resampling,
    pub refinement: Option<Refinement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Transform one lon/lat pair into the target space
    ReprojectPoint {
        label: PointLabel,
        lon: String,
        lat: String,
        from: Crs,
        to: Crs,
    },
    /// Tag the source raster with its six GCPs
    AssignControlPoints { gcps: Vec<ControlPoint>, srs: Crs },
    /// GCP-driven warp; `reproject_to` also reprojects in the same pass
    Rectify {
        warp: WarpSettings,
        reproject_to: Option<Crs>,
    },
    Cleanup(Artifact),
    /// Second warp from the conic space into the final CRS
    ReprojectRaster { resampling: Resampling, target: Crs },
    /// Rename the conic raster to the final output
    Finalize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warp_model_mapping() {
        assert_eq!(WarpModel::Order1.degree(), Some(1));
        assert_eq!(WarpModel::Order2.degree(), Some(2));
        assert_eq!(WarpModel::Order3.degree(), Some(3));
        assert_eq!(WarpModel::Tps.degree(), None);
        assert_eq!(WarpModel::default(), WarpModel::Order2);
        assert_eq!(WarpModel::Tps.to_string(), "tps");
        assert_eq!(WarpModel::Order3.to_string(), "order3");
    }

    #[test]
    fn test_refinement_needs_both_fields() {
        assert_eq!(Refinement::parse("", "").unwrap(), None);
        assert_eq!(Refinement::parse("2.5", "").unwrap(), None);
        assert_eq!(Refinement::parse("  ", "4").unwrap(), None);

        let refine = Refinement::parse(" 2.5 ", "4").unwrap().unwrap();
        assert_eq!(refine.tolerance, "2.5");
        assert_eq!(refine.min_gcps, 4);
    }

    #[test]
    fn test_malformed_refinement_is_an_error() {
        assert!(matches!(
            Refinement::parse("abc", "4"),
            Err(GeorefError::InvalidRefinement { .. })
        ));
        assert!(Refinement::parse("2.5", "four").is_err());
        assert!(Refinement::parse("2.5", "-1").is_err());
        assert!(Refinement::parse("-2", "4").is_err());
    }

    #[test]
    fn test_target_crs_parsing() {
        assert_eq!(TargetCrs::parse("").unwrap(), None);
        assert_eq!(TargetCrs::parse(" 3857 ").unwrap().unwrap().as_str(), "EPSG:3857");
        assert_eq!(TargetCrs::parse("esri:102003").unwrap().unwrap().as_str(), "ESRI:102003");
        assert!(TargetCrs::parse("web mercator").is_err());
        assert!(TargetCrs::parse("EPSG:").is_err());
        assert!(TargetCrs::parse("3857\"; rm -rf /").is_err());
    }

    #[test]
    fn test_pixel_text_three_decimals() {
        let gcp = ControlPoint {
            label: PointLabel::TopLeft,
            pixel_x: 12.0,
            pixel_y: 1033.45678,
            target: GcpTarget::Preprojected(PointLabel::TopLeft),
        };
        assert_eq!(gcp.pixel_text(), ("12.000".to_string(), "1033.457".to_string()));
    }
}

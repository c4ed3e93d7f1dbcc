/// Lambert Conformal Conic definition and datum selection
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GeorefError, Result};

/// Geographic datums the graticule coordinates may be expressed in
///
/// Persisted as its menu label and read back through `resolve_datum`, so a
/// hand-edited or stale settings file falls back to NAD83.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum Datum {
    Wgs84,
    #[default]
    Nad83,
    Nad27,
}

impl Datum {
    pub const ALL: [Datum; 3] = [Datum::Wgs84, Datum::Nad83, Datum::Nad27];

    /// Geographic CRS identifier of this datum
    pub fn epsg(&self) -> &'static str {
        match self {
            Datum::Wgs84 => "EPSG:4326",
            Datum::Nad83 => "EPSG:4269",
            Datum::Nad27 => "EPSG:4267",
        }
    }

    /// Name PROJ expects after `+datum=`
    pub fn proj_name(&self) -> &'static str {
        match self {
            Datum::Wgs84 => "WGS84",
            Datum::Nad83 => "NAD83",
            Datum::Nad27 => "NAD27",
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.epsg(), self.proj_name())
    }
}

impl From<String> for Datum {
    fn from(selection: String) -> Self {
        resolve_datum(&selection)
    }
}

impl From<Datum> for String {
    fn from(datum: Datum) -> Self {
        datum.to_string()
    }
}

/// Resolve a datum menu selection ("EPSG:4326 (WGS84)", "NAD27", ...).
///
/// Anything without a WGS84 or NAD27 marker, including "", is NAD83.
pub fn resolve_datum(selection: &str) -> Datum {
    let upper = selection.to_ascii_uppercase();
    if upper.contains("4326") || upper.contains("WGS84") {
        Datum::Wgs84
    } else if upper.contains("4267") || upper.contains("NAD27") {
        Datum::Nad27
    } else {
        Datum::Nad83
    }
}

/// Validated LCC parameters, kept as the operator typed them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionParams {
    pub lat_1: String,
    pub lat_2: String,
    pub lat_0: String,
    pub lon_0: String,
    pub x_0: String,
    pub y_0: String,
}

impl ProjectionParams {
    /// Validate the six scalars. The four angular parameters are required;
    /// a blank false easting/northing means `0`.
    pub fn parse(lat_1: &str, lat_2: &str, lat_0: &str, lon_0: &str, x_0: &str, y_0: &str) -> Result<Self> {
        Ok(Self {
            lat_1: required_number("lat_1", lat_1)?,
            lat_2: required_number("lat_2", lat_2)?,
            lat_0: required_number("lat_0", lat_0)?,
            lon_0: required_number("lon_0", lon_0)?,
            x_0: number_or_zero("x_0", x_0)?,
            y_0: number_or_zero("y_0", y_0)?,
        })
    }
}

/// Trimmed text of a field that must parse as a float
pub fn required_number(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(trimmed.to_string()),
        _ => Err(GeorefError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

fn number_or_zero(field: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        Ok("0".to_string())
    } else {
        required_number(field, value)
    }
}

/// Build the PROJ definition of the conic projection.
///
/// The datum here is independent of the graticule input datum.
pub fn build_projection_string(params: &ProjectionParams, datum: Datum) -> String {
    format!(
        "+proj=lcc +lat_1={} +lat_2={} +lat_0={} +lon_0={} +x_0={} +y_0={} +datum={} +units=m +no_defs",
        params.lat_1,
        params.lat_2,
        params.lat_0,
        params.lon_0,
        params.x_0,
        params.y_0,
        datum.proj_name(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_datum_markers() {
        assert_eq!(resolve_datum("EPSG:4326 (WGS84)"), Datum::Wgs84);
        assert_eq!(resolve_datum("wgs84"), Datum::Wgs84);
        assert_eq!(resolve_datum("EPSG:4267 (NAD27)"), Datum::Nad27);
        assert_eq!(resolve_datum("EPSG:4269 (NAD83)"), Datum::Nad83);
    }

    #[test]
    fn test_resolve_datum_falls_back_to_nad83() {
        assert_eq!(resolve_datum(""), Datum::Nad83);
        assert_eq!(resolve_datum("ED50"), Datum::Nad83);
        assert_eq!(resolve_datum("EPSG:4269"), Datum::Nad83);
    }

    #[test]
    fn test_datum_round_trips_through_display() {
        for datum in Datum::ALL {
            assert_eq!(resolve_datum(&datum.to_string()), datum);
        }
    }

    #[test]
    fn test_projection_string_verbatim() {
        let params = ProjectionParams::parse("33", "45", "33.0", "-96", "", " ").unwrap();
        assert_eq!(
            build_projection_string(&params, Datum::Nad83),
            "+proj=lcc +lat_1=33 +lat_2=45 +lat_0=33.0 +lon_0=-96 +x_0=0 +y_0=0 +datum=NAD83 +units=m +no_defs"
        );
    }

    #[test]
    fn test_projection_string_keeps_precision() {
        let params = ProjectionParams::parse("29.5", "45.5", "23", "-96.123456789", "500000", "-1e3").unwrap();
        let proj = build_projection_string(&params, Datum::Nad27);
        assert!(proj.contains("+lon_0=-96.123456789 "));
        assert!(proj.contains("+x_0=500000 +y_0=-1e3 "));
        assert!(proj.contains("+datum=NAD27 "));
    }

    #[test]
    fn test_blank_core_scalar_rejected() {
        let err = ProjectionParams::parse("33", "", "33", "-96", "0", "0").unwrap_err();
        assert!(matches!(err, GeorefError::InvalidNumber { ref field, .. } if field == "lat_2"));
    }

    #[test]
    fn test_non_numeric_scalar_rejected() {
        assert!(ProjectionParams::parse("33", "45", "33", "west", "0", "0").is_err());
        assert!(ProjectionParams::parse("33", "45", "33", "-96", "abc", "0").is_err());
        assert!(ProjectionParams::parse("NaN", "45", "33", "-96", "0", "0").is_err());
    }
}

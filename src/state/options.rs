/// Batch-wide georeferencing options
///
/// `Settings` is the form as the operator edits it (raw text, persisted as
/// JSON between runs). `BatchConfig` is the validated snapshot handed to the
/// synthesizer; once the first image of a batch is logged the driver keeps
/// that snapshot frozen.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use super::data::{GeoTargets, POINTS_PER_IMAGE};
use crate::error::Result;
use crate::geo::operation::{Refinement, Resampling, TargetCrs, WarpModel, WarpSettings};
use crate::geo::projection::{build_projection_string, Datum, ProjectionParams};

/// All form values, as typed
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    // ========== Target Graticule ==========
    /// (lon, lat) per reference point, in label order
    pub graticule: [(String, String); POINTS_PER_IMAGE],

    // ========== Lambert Conformal Conic ==========
    pub lat_1: String,
    pub lat_2: String,
    pub lat_0: String,
    pub lon_0: String,
    /// Blank = 0
    pub x_0: String,
    /// Blank = 0
    pub y_0: String,
    /// `+datum=` of the LCC definition
    pub conic_datum: Datum,

    // ========== Graticule Datum ==========
    pub input_datum: Datum,
    /// Reproject GCPs into the LCC space before fitting
    pub preproject: bool,

    // ========== Warp ==========
    pub warp_model: WarpModel,
    pub resampling: Resampling,
    /// Refinement is on only when both fields are filled
    pub refine_tolerance: String,
    pub refine_min_gcps: String,
    /// Optional final CRS, e.g. "3857"
    pub target_crs: String,
}

impl Default for Settings {
    fn default() -> Self {
        let pair = |lon: &str, lat: &str| (lon.to_string(), lat.to_string());
        Self {
            graticule: [
                pair("-102.0", "34.0"),
                pair("-99.0", "34.0"),
                pair("-96.0", "34.0"),
                pair("-102.0", "32.0"),
                pair("-99.0", "32.0"),
                pair("-96.0", "32.0"),
            ],
            lat_1: "33".to_string(),
            lat_2: "45".to_string(),
            lat_0: "33".to_string(),
            lon_0: "-96".to_string(),
            x_0: "0".to_string(),
            y_0: "0".to_string(),
            conic_datum: Datum::Nad83,
            input_datum: Datum::Nad83,
            preproject: true,
            warp_model: WarpModel::Order2,
            resampling: Resampling::Cubic,
            refine_tolerance: String::new(),
            refine_min_gcps: String::new(),
            target_crs: String::new(),
        }
    }
}

impl Settings {
    /// Convert to JSON string for the settings file
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reset every field to its default
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Where settings are persisted:
    /// - Linux: ~/.config/georef-logger/settings.json
    /// - macOS: ~/Library/Application Support/georef-logger/settings.json
    /// - Windows: %APPDATA%\georef-logger\settings.json
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("georef-logger");
        path.push("settings.json");
        Some(path)
    }

    /// Load saved settings, falling back to defaults when missing or unreadable
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(json) => Self::from_json(&json).unwrap_or_else(|e| {
                log::warn!("⚠️  Ignoring unreadable settings {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::default_path() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, self.to_json()?)?;
        log::debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Validate the form into an immutable snapshot
    pub fn snapshot(&self) -> Result<BatchConfig> {
        let projection = ProjectionParams::parse(&self.lat_1, &self.lat_2, &self.lat_0, &self.lon_0, &self.x_0, &self.y_0)?;
        let targets = GeoTargets::parse(&self.graticule)?;
        let refinement = Refinement::parse(&self.refine_tolerance, &self.refine_min_gcps)?;
        let target_crs = TargetCrs::parse(&self.target_crs)?;

        Ok(BatchConfig {
            targets,
            projection,
            conic_datum: self.conic_datum,
            input_datum: self.input_datum,
            preproject: self.preproject,
            warp: WarpSettings {
                model: self.warp_model,
                resampling: self.resampling,
                refinement,
            },
            target_crs,
        })
    }
}

/// Validated options used to synthesize one image's block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub targets: GeoTargets,
    pub projection: ProjectionParams,
    pub conic_datum: Datum,
    pub input_datum: Datum,
    pub preproject: bool,
    pub warp: WarpSettings,
    pub target_crs: Option<TargetCrs>,
}

impl BatchConfig {
    pub fn projection_string(&self) -> String {
        build_projection_string(&self.projection, self.conic_datum)
    }
}

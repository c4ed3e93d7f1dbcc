/// Error types shared across the logger
///
/// Validation variants are operator-recoverable: they are shown in the
/// status line and never touch the output script.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeorefError {
    /// The folder picker was dismissed
    #[error("No folder selected")]
    NoFolderSelected,

    /// The chosen folder holds no .tif/.tiff files
    #[error("No TIF files found in {}", .0.display())]
    NoRasters(PathBuf),

    /// A numeric form field is blank or unparsable
    #[error("{field} is not a number: {value:?}")]
    InvalidNumber { field: String, value: String },

    /// Both refinement fields were given but at least one is malformed
    #[error("Refine GCPs needs a numeric tolerance and a whole minimum count, got {tolerance:?} / {min_gcps:?}")]
    InvalidRefinement { tolerance: String, min_gcps: String },

    /// Final target CRS is neither an EPSG code nor AUTHORITY:CODE
    #[error("Final target CRS {0:?} is not an EPSG code or AUTHORITY:CODE")]
    InvalidTargetCrs(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl GeorefError {
    /// True for errors the operator fixes by editing the form or picking
    /// another folder
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GeorefError::NoFolderSelected
                | GeorefError::NoRasters(_)
                | GeorefError::InvalidNumber { .. }
                | GeorefError::InvalidRefinement { .. }
                | GeorefError::InvalidTargetCrs(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GeorefError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        let err = GeorefError::InvalidNumber {
            field: "lat_1".into(),
            value: "abc".into(),
        };
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "lat_1 is not a number: \"abc\"");

        let io = GeorefError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!io.is_validation());
    }
}

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{GeorefError, Result};

/// Raster extensions picked up from a batch folder (compared lowercase)
pub const RASTER_EXTENSIONS: [&str; 2] = ["tif", "tiff"];

/// List the rasters directly inside `folder`, sorted by path.
///
/// Subfolders are not visited, so the `georeferenced/` output of an
/// earlier run is never rescanned. Files whose name is not valid UTF-8 are
/// skipped with a warning: the script refers to rasters by name, and a
/// lossy name would point at a file that does not exist.
pub fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    log::info!("🔍 Scanning folder: {}", folder.display());

    let mut rasters = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // The folder itself being unreadable is fatal for the scan
                if e.depth() == 0 {
                    return Err(e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "unreadable folder"))
                        .into());
                }
                log::warn!("⚠️  Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !is_raster(path) {
            continue;
        }
        if path.file_name().and_then(|name| name.to_str()).is_none() {
            log::warn!("⚠️  Skipping {}: file name is not valid UTF-8", path.display());
            continue;
        }
        rasters.push(path.to_path_buf());
    }

    if rasters.is_empty() {
        return Err(GeorefError::NoRasters(folder.to_path_buf()));
    }

    rasters.sort();
    log::info!("✅ Found {} rasters", rasters.len());
    Ok(rasters)
}

fn is_raster(path: &Path) -> bool {
    match path.extension() {
        Some(extension) => {
            let ext = extension.to_string_lossy().to_lowercase();
            RASTER_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.TIF", "a.tiff", "c.tif", "notes.txt", "run_georeference.sh", "noext"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("georeferenced")).unwrap();
        fs::write(dir.path().join("georeferenced").join("a.tif"), b"x").unwrap();

        let found = scan_folder(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.tiff", "b.TIF", "c.tif"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        // Latin-1 "carte_été.tif"
        let latin1 = OsStr::from_bytes(b"carte_\xe9t\xe9.tif");
        fs::write(dir.path().join(latin1), b"x").unwrap();
        fs::write(dir.path().join("carte_nord.tif"), b"x").unwrap();

        let found = scan_folder(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("carte_nord.tif")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_only_non_utf8_names_is_empty() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"\xe9.tif")), b"x").unwrap();

        assert!(matches!(scan_folder(dir.path()), Err(GeorefError::NoRasters(_))));
    }

    #[test]
    fn test_scan_empty_folder_is_validation_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("readme.md"), b"x").unwrap();

        let err = scan_folder(dir.path()).unwrap_err();
        assert!(matches!(err, GeorefError::NoRasters(_)));
        assert!(err.is_validation());
    }
}

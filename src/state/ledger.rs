use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Result as SqlResult};
use std::path::{Path, PathBuf};

use super::data::CapturedPoints;

/// The Ledger records which rasters already have a block in some script,
/// together with the six pixel positions that were clicked.
pub struct Ledger {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl Ledger {
    /// Open (or create) the ledger in the user's data directory:
    /// - Linux: ~/.local/share/georef-logger/ledger.db
    /// - macOS: ~/Library/Application Support/georef-logger/ledger.db
    /// - Windows: %APPDATA%\georef-logger\ledger.db
    pub fn open_default() -> crate::error::Result<Self> {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no user data directory"))?;
        path.push("georef-logger");
        std::fs::create_dir_all(&path)?;
        path.push("ledger.db");

        let conn = Connection::open(&path)?;
        log::info!("📁 Ledger at: {}", path.display());

        let ledger = Ledger {
            conn,
            db_path: Some(path),
        };
        ledger.init_schema()?;
        Ok(ledger)
    }

    /// Throwaway ledger, used when the on-disk one cannot be opened
    pub fn in_memory() -> SqlResult<Self> {
        let ledger = Ledger {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        ledger.init_schema()?;
        Ok(ledger)
    }

    fn init_schema(&self) -> SqlResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS logged_images (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                path            TEXT NOT NULL UNIQUE,
                filename        TEXT NOT NULL,
                gcps_json       TEXT NOT NULL,
                logged_at       INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_logged_images_logged_at
             ON logged_images(logged_at DESC)",
            [],
        )?;

        Ok(())
    }

    /// Record (or re-record) a logged raster
    pub fn record(&self, path: &Path, filename: &str, points: &CapturedPoints) -> crate::error::Result<()> {
        let gcps_json = points.to_json()?;
        self.conn.execute(
            "INSERT INTO logged_images (path, filename, gcps_json, logged_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(path) DO UPDATE SET
                gcps_json = excluded.gcps_json,
                logged_at = excluded.logged_at",
            rusqlite::params![
                path.to_string_lossy().to_string(),
                filename,
                gcps_json,
                Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    pub fn was_logged(&self, path: &Path) -> SqlResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM logged_images WHERE path = ?1",
                [path.to_string_lossy().to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Points clicked the last time this raster was logged
    pub fn points_for(&self, path: &Path) -> crate::error::Result<Option<CapturedPoints>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT gcps_json FROM logged_images WHERE path = ?1",
                [path.to_string_lossy().to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn logged_count(&self) -> SqlResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM logged_images", [], |row| row.get(0))
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").field("db_path", &self.db_path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::CorrespondenceSession;

    fn points(offset: f64) -> CapturedPoints {
        let mut session = CorrespondenceSession::new(1000, 1000);
        for i in 0..6 {
            session.add_point(offset + i as f64, offset);
        }
        session.captured().unwrap()
    }

    #[test]
    fn test_record_and_lookup() {
        let ledger = Ledger::in_memory().unwrap();
        let path = Path::new("/maps/sheet_01.tif");
        assert!(!ledger.was_logged(path).unwrap());

        ledger.record(path, "sheet_01.tif", &points(10.0)).unwrap();
        assert!(ledger.was_logged(path).unwrap());
        assert_eq!(ledger.logged_count().unwrap(), 1);
        assert_eq!(ledger.points_for(path).unwrap(), Some(points(10.0)));
    }

    #[test]
    fn test_relogging_replaces_points() {
        let ledger = Ledger::in_memory().unwrap();
        let path = Path::new("/maps/sheet_01.tif");
        ledger.record(path, "sheet_01.tif", &points(10.0)).unwrap();
        ledger.record(path, "sheet_01.tif", &points(20.0)).unwrap();

        assert_eq!(ledger.logged_count().unwrap(), 1);
        assert_eq!(ledger.points_for(path).unwrap(), Some(points(20.0)));
        assert_eq!(ledger.points_for(Path::new("/maps/other.tif")).unwrap(), None);
    }
}

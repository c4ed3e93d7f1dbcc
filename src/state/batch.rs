/// Batch driver: one capture session per raster, one script block per
/// completed session
///
/// The driver owns the sorted raster list, the current index, the active
/// session and the script sink. Raster decoding happens outside (the UI
/// loads the record asynchronously and hands it back through `attach`).
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::data::{CapturedPoints, CorrespondencePoint, PointLabel, RasterRecord};
use super::options::{BatchConfig, Settings};
use super::session::{Capture, CorrespondenceSession, NextPoint};
use crate::error::Result;
use crate::geo::operation::Operation;
use crate::geo::render::{render_block, SCRIPT_HEADER};
use crate::geo::synth::synthesize;

/// Append-only destination for rendered blocks
pub trait ScriptSink {
    /// Initialize the script if it does not exist yet; never overwrite
    fn ensure_header(&mut self) -> Result<()>;
    fn append_block(&mut self, block: &str) -> Result<()>;
}

/// `run_georeference.sh` inside the batch folder
#[derive(Debug, Clone)]
pub struct ScriptFile {
    path: PathBuf,
}

impl ScriptFile {
    pub const FILE_NAME: &'static str = "run_georeference.sh";

    pub fn in_folder(folder: &Path) -> Self {
        Self {
            path: folder.join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScriptSink for ScriptFile {
    fn ensure_header(&mut self) -> Result<()> {
        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(mut file) => {
                file.write_all(SCRIPT_HEADER.as_bytes())?;
                log::info!("📝 Created script {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::info!("📝 Appending to existing script {}", self.path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn append_block(&mut self, block: &str) -> Result<()> {
        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        file.write_all(block.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// What the caller should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStep {
    /// Decode this raster and `attach` it
    Load(PathBuf),
    Done,
}

/// One image written to the script
#[derive(Debug, Clone)]
pub struct LoggedImage {
    pub record: RasterRecord,
    pub points: CapturedPoints,
    pub operations: Vec<Operation>,
    pub next: BatchStep,
}

#[derive(Debug, Clone)]
pub enum ClickOutcome {
    /// No raster attached, outside the image, or session already complete
    Ignored,
    Recorded(PointLabel),
    /// Sixth point: block written and the batch advanced
    Logged(LoggedImage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Loading { position: usize, total: usize },
    Capturing {
        filename: String,
        next: NextPoint,
        position: usize,
        total: usize,
    },
    Done { logged: usize, total: usize },
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Loading { position, total } => write!(f, "Loading {position}/{total}..."),
            BatchStatus::Capturing { next: NextPoint::Done, .. } => f.write_str("Processing..."),
            BatchStatus::Capturing { filename, next, .. } => write!(f, "{filename}\nClick: {next}"),
            BatchStatus::Done { .. } => f.write_str("All Done! Script generated."),
        }
    }
}

pub struct BatchDriver<S: ScriptSink> {
    images: Vec<PathBuf>,
    index: usize,
    current: Option<RasterRecord>,
    session: Option<CorrespondenceSession>,
    sink: S,
    /// Snapshot used for every block after the first one
    frozen: Option<BatchConfig>,
    logged: usize,
}

impl<S: ScriptSink> BatchDriver<S> {
    /// Start a batch over an already sorted raster list
    pub fn new(images: Vec<PathBuf>, mut sink: S) -> Result<Self> {
        sink.ensure_header()?;
        Ok(Self {
            images,
            index: 0,
            current: None,
            session: None,
            sink,
            frozen: None,
            logged: 0,
        })
    }

    /// Step for the raster at the current index
    pub fn step(&self) -> BatchStep {
        match self.images.get(self.index) {
            Some(path) => BatchStep::Load(path.clone()),
            None => BatchStep::Done,
        }
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.images.get(self.index).map(PathBuf::as_path)
    }

    pub fn current(&self) -> Option<&RasterRecord> {
        self.current.as_ref()
    }

    pub fn session(&self) -> Option<&CorrespondenceSession> {
        self.session.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.index >= self.images.len()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Attach a decoded raster. Stale loads (not the current path) are
    /// rejected.
    pub fn attach(&mut self, record: RasterRecord) -> bool {
        if self.current_path() != Some(record.path.as_path()) {
            log::debug!("Dropping stale raster {}", record.path.display());
            return false;
        }
        self.session = Some(CorrespondenceSession::new(record.width, record.height));
        self.current = Some(record);
        true
    }

    /// Offer a native-pixel click to the active session.
    ///
    /// On the sixth point the block is synthesized with the frozen config
    /// (or a fresh snapshot of `settings` for the first image). A
    /// validation error leaves the session complete and pending; fix the
    /// form and call `on_session_complete` again.
    pub fn record_click(&mut self, px: f64, py: f64, settings: &Settings) -> Result<ClickOutcome> {
        let Some(session) = self.session.as_mut() else {
            return Ok(ClickOutcome::Ignored);
        };

        match session.add_point(px, py) {
            Capture::Ignored => Ok(ClickOutcome::Ignored),
            Capture::Recorded(label) => {
                log::debug!("Recorded {} at ({:.3}, {:.3})", label, px, py);
                Ok(ClickOutcome::Recorded(label))
            }
            Capture::Completed => Ok(self
                .on_session_complete(settings)?
                .map_or(ClickOutcome::Ignored, ClickOutcome::Logged)),
        }
    }

    pub fn undo(&mut self) -> Option<CorrespondencePoint> {
        self.session.as_mut().and_then(CorrespondenceSession::undo_last)
    }

    /// True when six points are held but no block was written for them
    pub fn has_pending(&self) -> bool {
        self.session.as_ref().is_some_and(CorrespondenceSession::is_complete)
    }

    /// Synthesize, render and append the block of the completed session,
    /// then advance. `None` when no session holds six points. Also used to
    /// retry a session whose first attempt failed validation.
    pub fn on_session_complete(&mut self, settings: &Settings) -> Result<Option<LoggedImage>> {
        let Some((record, points)) = self.pending_capture() else {
            return Ok(None);
        };
        self.complete(record, points, settings).map(Some)
    }

    /// True once a config is frozen and the form no longer matches it
    pub fn config_drift(&self, settings: &Settings) -> bool {
        match &self.frozen {
            Some(frozen) => settings.snapshot().ok().as_ref() != Some(frozen),
            None => false,
        }
    }

    fn pending_capture(&self) -> Option<(RasterRecord, CapturedPoints)> {
        let points = self.session.as_ref().and_then(CorrespondenceSession::captured)?;
        Some((self.current.clone()?, points))
    }

    fn complete(&mut self, record: RasterRecord, points: CapturedPoints, settings: &Settings) -> Result<LoggedImage> {
        let config = match &self.frozen {
            Some(frozen) => {
                if self.config_drift(settings) {
                    log::warn!("⚠️  Form changed mid-batch; keeping the settings of the first logged image");
                }
                frozen.clone()
            }
            None => settings.snapshot()?,
        };

        let operations = synthesize(&points, &config);
        let block = render_block(&record.filename, &config, &operations);
        self.sink.append_block(&block)?;

        self.logged += 1;
        if self.frozen.is_none() {
            self.frozen = Some(config);
        }
        log::info!("✅ Logged {} ({} operations)", record.filename, operations.len());

        let next = self.advance();
        Ok(LoggedImage {
            record,
            points,
            operations,
            next,
        })
    }

    /// Drop the current session (complete or not) and move to the next raster
    pub fn advance(&mut self) -> BatchStep {
        if let Some(session) = self.session.as_mut() {
            session.reset();
        }
        self.session = None;
        self.current = None;
        if self.index < self.images.len() {
            self.index += 1;
        }
        self.step()
    }

    pub fn status(&self) -> BatchStatus {
        let total = self.images.len();
        if self.is_done() {
            return BatchStatus::Done {
                logged: self.logged,
                total,
            };
        }

        match (&self.current, &self.session) {
            (Some(record), Some(session)) => BatchStatus::Capturing {
                filename: record.filename.clone(),
                next: session.label_for_next(),
                position: self.index + 1,
                total,
            },
            _ => BatchStatus::Loading {
                position: self.index + 1,
                total,
            },
        }
    }
}

/// Ensure the batch folder exists and return its script
pub fn script_for_folder(folder: &Path) -> Result<ScriptFile> {
    fs::create_dir_all(folder)?;
    Ok(ScriptFile::in_folder(folder))
}

use cgmath::Point2;
use iced::keyboard::{self, key, Key, Modifiers};
use iced::widget::image::{Handle, Image};
use iced::widget::{button, canvas, checkbox, column, container, pick_list, row, scrollable, stack, text, text_input, Column};
use iced::{Alignment, ContentFit, Element, Length, Size, Subscription, Task, Theme};
use rfd::FileDialog;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod error;
mod geo;
mod raster;
mod state;
mod ui;

use error::GeorefError;
use geo::mapper::{loupe_window, LOUPE_SIZE, LOUPE_ZOOM};
use geo::operation::{Resampling, WarpModel};
use geo::projection::Datum;
use raster::loader::{load_raster, LoadResult, LoadedRaster};
use raster::loupe::render_loupe;
use state::batch::{script_for_folder, BatchDriver, BatchStatus, BatchStep, ClickOutcome, LoggedImage, ScriptFile};
use state::data::{CorrespondencePoint, PointLabel};
use state::ledger::Ledger;
use state::options::Settings;
use ui::canvas::{fitted, pointer_to_image, CanvasEvent, ClickCanvas};

/// Lambert Conformal Conic form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConicField {
    Lat1,
    Lat2,
    Lat0,
    Lon0,
    X0,
    Y0,
}

impl ConicField {
    const ALL: [ConicField; 6] = [
        ConicField::Lat1,
        ConicField::Lat2,
        ConicField::Lat0,
        ConicField::Lon0,
        ConicField::X0,
        ConicField::Y0,
    ];

    fn label(&self) -> &'static str {
        match self {
            ConicField::Lat1 => "Std parallel 1",
            ConicField::Lat2 => "Std parallel 2",
            ConicField::Lat0 => "Latitude of origin",
            ConicField::Lon0 => "Central meridian",
            ConicField::X0 => "False easting",
            ConicField::Y0 => "False northing",
        }
    }

    fn value<'a>(&self, settings: &'a Settings) -> &'a String {
        match self {
            ConicField::Lat1 => &settings.lat_1,
            ConicField::Lat2 => &settings.lat_2,
            ConicField::Lat0 => &settings.lat_0,
            ConicField::Lon0 => &settings.lon_0,
            ConicField::X0 => &settings.x_0,
            ConicField::Y0 => &settings.y_0,
        }
    }

    fn value_mut<'a>(&self, settings: &'a mut Settings) -> &'a mut String {
        match self {
            ConicField::Lat1 => &mut settings.lat_1,
            ConicField::Lat2 => &mut settings.lat_2,
            ConicField::Lat0 => &mut settings.lat_0,
            ConicField::Lon0 => &mut settings.lon_0,
            ConicField::X0 => &mut settings.x_0,
            ConicField::Y0 => &mut settings.y_0,
        }
    }
}

/// Main application state
struct GeorefLogger {
    /// Form values, persisted between runs
    settings: Settings,
    /// Rasters logged by earlier batches
    ledger: Ledger,
    batch: Option<BatchDriver<ScriptFile>>,
    /// Decoded raster for the attached record
    raster: Option<Arc<LoadedRaster>>,
    preview: Option<Handle>,
    /// Markers from the previous time this raster was logged
    ghosts: Vec<CorrespondencePoint>,
    /// Canvas size as of the last pointer event
    viewport: Option<Size>,
    /// Loupe focus in native pixels; Enter records here
    focus: Option<Point2<f64>>,
    /// Shift held: pointer motion no longer moves the loupe
    loupe_locked: bool,
    loupe: Option<Handle>,
    /// Last validation or load error, shown instead of the status line
    error: Option<String>,
    /// Informational line under the status
    notice: Option<String>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked "Select Folder"
    SelectFolder,
    /// Background decode finished for this path
    RasterLoaded(PathBuf, LoadResult),
    Canvas(CanvasEvent),
    /// Move the focus crosshair by whole screen pixels
    Nudge(f32, f32),
    RecordAtFocus,
    LockLoupe(bool),
    Skip,
    RetryBlock,

    GraticuleLon(usize, String),
    GraticuleLat(usize, String),
    Conic(ConicField, String),
    ConicDatum(Datum),
    InputDatum(Datum),
    Preproject(bool),
    WarpModel(WarpModel),
    Resampling(Resampling),
    RefineTolerance(String),
    RefineMinGcps(String),
    TargetCrs(String),
    ResetSettings,
}

impl GeorefLogger {
    fn new() -> (Self, Task<Message>) {
        // Last batch's form, or defaults on first run
        let settings = Settings::load_or_default();

        let ledger = match Ledger::open_default() {
            Ok(ledger) => ledger,
            Err(e) => {
                log::warn!("⚠️  Ledger unavailable ({}); previous batches will not be flagged", e);
                match Ledger::in_memory() {
                    Ok(ledger) => ledger,
                    // Same stance as a missing catalog: nothing sensible to run without one
                    Err(e) => panic!("SQLite in-memory database failed to open: {e}"),
                }
            }
        };

        let logged = ledger.logged_count().unwrap_or(0);
        log::info!("🗺️  Georef logger ready, {} rasters logged so far", logged);

        (
            GeorefLogger {
                settings,
                ledger,
                batch: None,
                raster: None,
                preview: None,
                ghosts: Vec::new(),
                viewport: None,
                focus: None,
                loupe_locked: false,
                loupe: None,
                error: None,
                notice: None,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SelectFolder => {
                let folder = FileDialog::new()
                    .set_title("Select Folder with TIF Maps")
                    .pick_folder();

                match folder {
                    Some(folder) => match self.start_batch(&folder) {
                        Ok(task) => task,
                        Err(e) => {
                            self.error = Some(e.to_string());
                            Task::none()
                        }
                    },
                    None => {
                        self.error = Some(GeorefError::NoFolderSelected.to_string());
                        Task::none()
                    }
                }
            }
            Message::RasterLoaded(path, result) => self.on_raster_loaded(path, result),
            Message::Canvas(event) => self.on_canvas(event),
            Message::Nudge(dx, dy) => {
                if let (Some(focus), Some(transform)) = (self.focus, self.transform()) {
                    // Nudge in screen pixels, then map back to native pixels
                    let mut screen = transform.image_to_screen(focus);
                    screen.x += dx as f64;
                    screen.y += dy as f64;
                    if let Some(moved) = transform.screen_to_image(screen) {
                        self.focus = Some(moved);
                        self.refresh_loupe();
                    }
                }
                Task::none()
            }
            Message::RecordAtFocus => match self.focus {
                Some(focus) => self.record_at(focus),
                None => Task::none(),
            },
            Message::LockLoupe(locked) => {
                // Shift press/release; the loupe keeps its last content while locked
                self.loupe_locked = locked;
                Task::none()
            }
            Message::Skip => match self.batch.as_mut() {
                Some(batch) => {
                    if let Some(path) = batch.current_path() {
                        log::info!("⏭️  Skipped {}", path.display());
                    }
                    let next = batch.advance();
                    self.load_step(next)
                }
                None => Task::none(),
            },
            Message::RetryBlock => {
                let Some(batch) = self.batch.as_mut() else {
                    return Task::none();
                };
                // Six points are held but the block was refused; try again with the edited form
                match batch.on_session_complete(&self.settings) {
                    Ok(Some(logged)) => self.on_logged(logged),
                    Ok(None) => Task::none(),
                    Err(e) => {
                        self.report(e);
                        Task::none()
                    }
                }
            }

            Message::GraticuleLon(index, value) => {
                self.settings.graticule[index].0 = value;
                self.form_edited()
            }
            Message::GraticuleLat(index, value) => {
                self.settings.graticule[index].1 = value;
                self.form_edited()
            }
            Message::Conic(field, value) => {
                *field.value_mut(&mut self.settings) = value;
                self.form_edited()
            }
            Message::ConicDatum(datum) => {
                self.settings.conic_datum = datum;
                self.form_edited()
            }
            Message::InputDatum(datum) => {
                self.settings.input_datum = datum;
                self.form_edited()
            }
            Message::Preproject(enabled) => {
                self.settings.preproject = enabled;
                self.form_edited()
            }
            Message::WarpModel(model) => {
                self.settings.warp_model = model;
                self.form_edited()
            }
            Message::Resampling(resampling) => {
                self.settings.resampling = resampling;
                self.form_edited()
            }
            Message::RefineTolerance(value) => {
                self.settings.refine_tolerance = value;
                self.form_edited()
            }
            Message::RefineMinGcps(value) => {
                self.settings.refine_min_gcps = value;
                self.form_edited()
            }
            Message::TargetCrs(value) => {
                self.settings.target_crs = value;
                self.form_edited()
            }
            Message::ResetSettings => {
                self.settings.reset();
                self.form_edited()
            }
        }
    }

    fn start_batch(&mut self, folder: &Path) -> error::Result<Task<Message>> {
        // Scan first so an empty folder never gets a script
        let images = raster::scan::scan_folder(folder)?;
        let script = script_for_folder(folder)?;
        log::info!("📁 {} rasters in {}", images.len(), folder.display());

        let batch = BatchDriver::new(images, script)?;
        let first = batch.step();
        self.batch = Some(batch);
        self.error = None;
        Ok(self.load_step(first))
    }

    /// Clear the canvas and decode the next raster, if any
    fn load_step(&mut self, step: BatchStep) -> Task<Message> {
        self.raster = None;
        self.preview = None;
        self.ghosts.clear();
        self.focus = None;
        self.loupe = None;
        self.notice = None;

        match step {
            BatchStep::Load(path) => Task::perform(load_raster(path), |(path, result)| {
                Message::RasterLoaded(path, result)
            }),
            BatchStep::Done => {
                if let Some(batch) = &self.batch {
                    log::info!("✅ Batch done: {}", batch.sink().path().display());
                }
                Task::none()
            }
        }
    }

    fn on_raster_loaded(&mut self, path: PathBuf, result: LoadResult) -> Task<Message> {
        let Some(batch) = self.batch.as_mut() else {
            return Task::none();
        };

        match result {
            Ok(raster) => {
                // A Skip while decoding already moved the batch on; drop the late result
                if !batch.attach(raster.record.clone()) {
                    return Task::none();
                }

                match self.ledger.was_logged(&path) {
                    Ok(true) => {
                        self.notice = Some(format!(
                            "⚠️  {} was already logged in an earlier script",
                            raster.record.filename
                        ));
                        match self.ledger.points_for(&path) {
                            Ok(previous) => {
                                self.ghosts = previous.map(|p| p.points().to_vec()).unwrap_or_default();
                            }
                            Err(e) => log::warn!("⚠️  Ledger points unreadable for {}: {}", path.display(), e),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => log::warn!("⚠️  Ledger lookup failed for {}: {}", path.display(), e),
                }

                let preview = &raster.preview;
                self.preview = Some(Handle::from_rgba(preview.width, preview.height, preview.rgba.clone()));
                self.raster = Some(raster);
                Task::none()
            }
            Err(e) => {
                // Same for failures: only the current raster may advance the batch
                if batch.current_path() != Some(path.as_path()) {
                    return Task::none();
                }
                log::warn!("⚠️  Could not load {}: {}", path.display(), e);
                self.error = Some(format!("Could not load {}: {}", path.display(), e));
                let next = batch.advance();
                self.load_step(next)
            }
        }
    }

    fn on_canvas(&mut self, event: CanvasEvent) -> Task<Message> {
        match event {
            CanvasEvent::Clicked { position, viewport } => {
                self.viewport = Some(viewport);
                match self.native().and_then(|native| pointer_to_image(position, viewport, native)) {
                    Some(point) => self.record_at(point),
                    None => Task::none(),
                }
            }
            CanvasEvent::Undo => {
                if let Some(undone) = self.batch.as_mut().and_then(BatchDriver::undo) {
                    log::debug!("Undid {}", undone.label);
                }
                Task::none()
            }
            CanvasEvent::Moved { position, viewport } => {
                self.viewport = Some(viewport);
                // Locked: the pointer wanders off, focus and loupe stay put
                if !self.loupe_locked {
                    self.focus = self.native().and_then(|native| pointer_to_image(position, viewport, native));
                    self.refresh_loupe();
                }
                Task::none()
            }
            CanvasEvent::Left => {
                if !self.loupe_locked {
                    self.focus = None;
                    self.loupe = None;
                }
                Task::none()
            }
        }
    }

    fn record_at(&mut self, point: Point2<f64>) -> Task<Message> {
        let Some(batch) = self.batch.as_mut() else {
            return Task::none();
        };

        match batch.record_click(point.x, point.y, &self.settings) {
            Ok(ClickOutcome::Ignored) => Task::none(),
            Ok(ClickOutcome::Recorded(label)) => {
                log::debug!("📍 {} captured", label);
                self.error = None;
                Task::none()
            }
            Ok(ClickOutcome::Logged(logged)) => self.on_logged(logged),
            Err(e) => {
                self.report(e);
                Task::none()
            }
        }
    }

    fn on_logged(&mut self, logged: LoggedImage) -> Task<Message> {
        self.error = None;
        log::debug!("{} operations written for {}", logged.operations.len(), logged.record.filename);

        // The block is on disk; persistence failures below are only warnings
        if let Err(e) = self.settings.save() {
            log::warn!("⚠️  Could not save settings: {}", e);
        }
        if let Err(e) = self.ledger.record(&logged.record.path, &logged.record.filename, &logged.points) {
            log::warn!("⚠️  Could not record {} in the ledger: {}", logged.record.filename, e);
        }

        self.load_step(logged.next)
    }

    fn report(&mut self, error: GeorefError) {
        if !error.is_validation() {
            log::warn!("⚠️  {}", error);
        }
        self.error = Some(error.to_string());
    }

    fn form_edited(&mut self) -> Task<Message> {
        self.error = None;
        Task::none()
    }

    fn native(&self) -> Option<(u32, u32)> {
        let record = self.batch.as_ref()?.current()?;
        Some((record.width, record.height))
    }

    fn transform(&self) -> Option<geo::mapper::DisplayTransform> {
        fitted(self.viewport?, self.native()?)
    }

    fn refresh_loupe(&mut self) {
        self.loupe = self.focus.zip(self.raster.as_ref()).and_then(|(focus, raster)| {
            let full = &raster.full;
            let window = loupe_window(focus, full.width(), full.height(), LOUPE_SIZE, LOUPE_ZOOM)?;
            let loupe = render_loupe(full, &window, LOUPE_SIZE)?;
            Some(Handle::from_rgba(loupe.size, loupe.size, loupe.rgba))
        });
    }

    fn status_line(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        match &self.batch {
            Some(batch) => batch.status().to_string(),
            None => "Select a folder of TIF maps to begin.".to_string(),
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        row![self.controls(), self.workspace(), self.loupe_panel()]
            .spacing(12)
            .padding(12)
            .into()
    }

    fn controls(&self) -> Element<'_, Message> {
        let settings = &self.settings;

        let has_pending = self.batch.as_ref().is_some_and(BatchDriver::has_pending);
        let batch_active = self.batch.as_ref().is_some_and(|batch| !batch.is_done());

        let mut actions = row![
            button("Select Folder").on_press(Message::SelectFolder).padding(8),
            button("Skip").on_press_maybe(batch_active.then_some(Message::Skip)).padding(8),
        ]
        .spacing(8);
        if has_pending {
            actions = actions.push(button("Retry block").on_press(Message::RetryBlock).padding(8));
        }

        let graticule = PointLabel::ALL.iter().fold(
            column![text("Target graticule (lon, lat)").size(16)].spacing(6),
            |col: Column<Message>, label| {
                let index = label.index();
                let (lon, lat) = &settings.graticule[index];
                col.push(
                    row![
                        text(label.to_string()).width(110.0),
                        text_input("lon", lon)
                            .on_input(move |v| Message::GraticuleLon(index, v))
                            .width(80.0),
                        text_input("lat", lat)
                            .on_input(move |v| Message::GraticuleLat(index, v))
                            .width(80.0),
                    ]
                    .spacing(6)
                    .align_y(Alignment::Center),
                )
            },
        );

        let conic = ConicField::ALL.iter().fold(
            column![text("Lambert Conformal Conic").size(16)].spacing(6),
            |col: Column<Message>, &field| {
                col.push(
                    row![
                        text(field.label()).width(150.0),
                        text_input("0", field.value(settings))
                            .on_input(move |v| Message::Conic(field, v))
                            .width(120.0),
                    ]
                    .spacing(6)
                    .align_y(Alignment::Center),
                )
            },
        );

        let datums = column![
            row![
                text("LCC datum").width(150.0),
                pick_list(Datum::ALL, Some(settings.conic_datum), Message::ConicDatum),
            ]
            .spacing(6)
            .align_y(Alignment::Center),
            row![
                text("Graticule datum").width(150.0),
                pick_list(Datum::ALL, Some(settings.input_datum), Message::InputDatum),
            ]
            .spacing(6)
            .align_y(Alignment::Center),
            checkbox("Preproject GCPs to LCC", settings.preproject).on_toggle(Message::Preproject),
        ]
        .spacing(6);

        let warp = column![
            text("Warp").size(16),
            row![
                text("Model").width(150.0),
                pick_list(WarpModel::ALL, Some(settings.warp_model), Message::WarpModel),
            ]
            .spacing(6)
            .align_y(Alignment::Center),
            row![
                text("Resampling").width(150.0),
                pick_list(Resampling::ALL, Some(settings.resampling), Message::Resampling),
            ]
            .spacing(6)
            .align_y(Alignment::Center),
            row![
                text("Refine GCPs").width(150.0),
                text_input("tol", &settings.refine_tolerance)
                    .on_input(Message::RefineTolerance)
                    .width(56.0),
                text_input("min", &settings.refine_min_gcps)
                    .on_input(Message::RefineMinGcps)
                    .width(56.0),
            ]
            .spacing(6)
            .align_y(Alignment::Center),
            row![
                text("Final EPSG").width(150.0),
                text_input("optional", &settings.target_crs)
                    .on_input(Message::TargetCrs)
                    .width(120.0),
            ]
            .spacing(6)
            .align_y(Alignment::Center),
        ]
        .spacing(6);

        let form = column![
            actions,
            graticule,
            conic,
            datums,
            warp,
            button("Reset options").on_press(Message::ResetSettings).padding(6),
        ]
        .spacing(18)
        .padding(4);

        container(scrollable(form)).width(360.0).height(Length::Fill).into()
    }

    fn workspace(&self) -> Element<'_, Message> {
        let mut header = column![text(self.status_line()).size(18)].spacing(4);
        if let Some(BatchStatus::Capturing { position, total, .. }) = self.batch.as_ref().map(BatchDriver::status) {
            header = header.push(text(format!("Image {position} of {total}")).size(14));
        }
        if let Some(notice) = &self.notice {
            header = header.push(text(notice).size(14));
        }
        if self
            .batch
            .as_ref()
            .is_some_and(|batch| batch.config_drift(&self.settings))
        {
            header = header.push(
                text("⚠️  Option changes apply to the next batch; this one keeps its first settings.").size(14),
            );
        }

        let surface: Element<'_, Message> = match (&self.preview, self.native(), self.batch.as_ref()) {
            (Some(preview), Some(native), Some(batch)) => {
                let points = batch.session().map(|s| s.points()).unwrap_or(&[]);
                let overlay: Element<'_, CanvasEvent> = canvas(ClickCanvas {
                    native,
                    points,
                    ghosts: &self.ghosts,
                    focus: self.focus,
                })
                .width(Length::Fill)
                .height(Length::Fill)
                .into();

                stack![
                    Image::new(preview.clone())
                        .content_fit(ContentFit::Contain)
                        .width(Length::Fill)
                        .height(Length::Fill),
                    overlay.map(Message::Canvas),
                ]
                .width(Length::Fill)
                .height(Length::Fill)
                .into()
            }
            _ => container(text(""))
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
        };

        column![header, surface]
            .spacing(8)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn loupe_panel(&self) -> Element<'_, Message> {
        let lock = if self.loupe_locked { "Locked (Shift)" } else { "Hold Shift to lock" };

        let view: Element<'_, Message> = match &self.loupe {
            Some(handle) => Image::new(handle.clone())
                .width(LOUPE_SIZE as f32)
                .height(LOUPE_SIZE as f32)
                .into(),
            None => container(text(""))
                .width(LOUPE_SIZE as f32)
                .height(LOUPE_SIZE as f32)
                .into(),
        };

        column![
            text("Loupe").size(16),
            view,
            text(lock).size(12),
            text("Arrows nudge, Enter records").size(12),
            text("Right click undoes").size(12),
        ]
        .spacing(6)
        .width(LOUPE_SIZE as f32 + 20.0)
        .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            keyboard::on_key_press(key_pressed),
            keyboard::on_key_release(key_released),
        ])
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn key_pressed(key: Key, _modifiers: Modifiers) -> Option<Message> {
    match key.as_ref() {
        Key::Named(key::Named::Shift) => Some(Message::LockLoupe(true)),
        Key::Named(key::Named::ArrowUp) => Some(Message::Nudge(0.0, -1.0)),
        Key::Named(key::Named::ArrowDown) => Some(Message::Nudge(0.0, 1.0)),
        Key::Named(key::Named::ArrowLeft) => Some(Message::Nudge(-1.0, 0.0)),
        Key::Named(key::Named::ArrowRight) => Some(Message::Nudge(1.0, 0.0)),
        Key::Named(key::Named::Enter) => Some(Message::RecordAtFocus),
        _ => None,
    }
}

fn key_released(key: Key, _modifiers: Modifiers) -> Option<Message> {
    match key.as_ref() {
        Key::Named(key::Named::Shift) => Some(Message::LockLoupe(false)),
        _ => None,
    }
}

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    iced::application("Georef Logger", GeorefLogger::update, GeorefLogger::view)
        .subscription(GeorefLogger::subscription)
        .theme(GeorefLogger::theme)
        .window_size((1600.0, 980.0))
        .centered()
        .run_with(GeorefLogger::new)
}

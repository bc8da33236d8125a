use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use eframe::egui::{self, ResizeDirection, Sense, TextureHandle, TextureOptions, ViewportCommand};

use crate::gateway::{spawn_listing, DirectoryListing, FsGateway};
use crate::grid::{map_to_grid, CellContent, PlateCell, COLUMNS};
use crate::launch::LaunchRequest;
use crate::matcher::{
    filename_of, match_images, secondary_inputs_enabled, FilterCriteria, ImageRecord, STAGES,
};
use crate::preview::{spawn_preview_batch, PreviewCache, PreviewUpdate, SharedPreviewCache};
use crate::recent::RecentSelections;
use crate::settings::{preview_cache_dir, settings_file_path, Settings};
use crate::viewer::ImageViewer;

const APP_TITLE: &str = "Wellview";
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const WELL_SIZE: f32 = 40.0;
const WELL_SPACING: f32 = 4.0;
const LOADING_REPAINT_INTERVAL: Duration = Duration::from_millis(50);
const GRIP_DOTS: usize = 3;
const GRIP_PITCH: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlateView {
    Normal,
    Tiles,
}

enum PreviewSlot {
    Loading,
    Ready(TextureHandle),
    Failed(String),
}

pub struct PlateViewerApp {
    gateway: FsGateway,
    settings: Settings,
    settings_path: Option<PathBuf>,
    working_directory: Option<PathBuf>,
    directory_prompt_open: bool,
    criteria: FilterCriteria,
    listed_files: Vec<PathBuf>,
    listing_receiver: Option<Receiver<DirectoryListing>>,
    matched: Vec<ImageRecord>,
    inputs_enabled: bool,
    plate_view: PlateView,
    recent: RecentSelections,
    recent_window_open: bool,
    preview_cache: SharedPreviewCache,
    previews: HashMap<PathBuf, PreviewSlot>,
    plate_preview_receiver: Option<Receiver<PreviewUpdate>>,
    viewer_preview_receiver: Option<Receiver<PreviewUpdate>>,
    viewer_request: Option<PathBuf>,
    viewer: ImageViewer,
    viewer_title: String,
    viewer_open: bool,
    status_line: String,
}

impl PlateViewerApp {
    pub fn new(initial_request: Option<LaunchRequest>, initial_status: Option<String>) -> Self {
        let settings_path = settings_file_path();
        let settings = settings_path
            .as_deref()
            .map(Settings::load)
            .unwrap_or_default();
        let preview_cache = PreviewCache::new(preview_cache_dir()).shared();
        Self::from_parts(
            initial_request,
            initial_status,
            settings,
            settings_path,
            preview_cache,
        )
    }

    fn from_parts(
        initial_request: Option<LaunchRequest>,
        initial_status: Option<String>,
        settings: Settings,
        settings_path: Option<PathBuf>,
        preview_cache: SharedPreviewCache,
    ) -> Self {
        let request = initial_request.unwrap_or_default();
        let recent = RecentSelections::from_stored(settings.recent_images.clone());

        let mut app = Self {
            gateway: FsGateway,
            settings,
            settings_path,
            working_directory: None,
            directory_prompt_open: false,
            criteria: request.criteria,
            listed_files: Vec::new(),
            listing_receiver: None,
            matched: Vec::new(),
            inputs_enabled: false,
            plate_view: PlateView::Normal,
            recent,
            recent_window_open: false,
            preview_cache,
            previews: HashMap::new(),
            plate_preview_receiver: None,
            viewer_preview_receiver: None,
            viewer_request: None,
            viewer: ImageViewer::default(),
            viewer_title: String::new(),
            viewer_open: false,
            status_line: initial_status.unwrap_or_default(),
        };

        match request
            .directory
            .or_else(|| app.settings.working_directory.clone())
        {
            Some(directory) => app.set_working_directory(directory),
            None => app.directory_prompt_open = true,
        }
        app
    }

    fn is_loading(&self) -> bool {
        self.listing_receiver.is_some()
            || self.plate_preview_receiver.is_some()
            || self.viewer_preview_receiver.is_some()
    }

    fn persist_settings(&mut self) {
        self.settings.working_directory = self.working_directory.clone();
        self.settings.recent_images = self.recent.list_recent();
        let Some(path) = self.settings_path.as_ref() else {
            return;
        };
        if let Err(err) = self.settings.save(path) {
            log::error!("{err:#}");
        }
    }

    fn choose_directory(&mut self) {
        let picked = rfd::FileDialog::new()
            .set_title("Select Working Directory")
            .pick_folder();
        if let Some(directory) = picked {
            self.set_working_directory(directory);
        }
    }

    fn set_working_directory(&mut self, directory: PathBuf) {
        log::info!("Working directory set to {}", directory.display());
        self.working_directory = Some(directory);
        self.directory_prompt_open = false;
        self.listed_files.clear();
        self.matched.clear();
        self.previews.clear();
        self.plate_preview_receiver = None;
        self.persist_settings();
        self.refresh_listing();
    }

    /// Starts a fresh listing of the working directory. Any listing still in
    /// flight is abandoned and previews that failed are retried once the new
    /// listing arrives.
    fn refresh_listing(&mut self) {
        self.previews
            .retain(|_, slot| !matches!(slot, PreviewSlot::Failed(_)));
        let Some(directory) = self.working_directory.clone() else {
            return;
        };
        self.listing_receiver = Some(spawn_listing(self.gateway, directory));
    }

    fn poll_listing(&mut self) {
        let Some(receiver) = self.listing_receiver.as_ref() else {
            return;
        };
        match receiver.try_recv() {
            Ok(listing) => {
                self.listing_receiver = None;
                self.apply_listing(listing);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.listing_receiver = None;
                self.status_line = "Directory listing stopped unexpectedly.".to_string();
            }
        }
    }

    fn apply_listing(&mut self, listing: DirectoryListing) {
        if self.working_directory.as_deref() != Some(listing.directory.as_path()) {
            return;
        }
        if listing.files.is_empty() {
            self.status_line = format!("No images found in {}.", listing.directory.display());
        } else {
            self.status_line.clear();
        }
        self.listed_files = listing.files;
        self.refilter();
    }

    /// Recomputes the match set from the current listing and criteria and
    /// requests previews for any matches not yet loaded.
    fn refilter(&mut self) {
        let Some(directory) = self.working_directory.as_deref() else {
            return;
        };
        self.matched = match_images(&self.listed_files, directory, &self.criteria);
        self.inputs_enabled = secondary_inputs_enabled(&self.listed_files, &self.criteria);
        log::debug!(
            "{} of {} image(s) match {:?}",
            self.matched.len(),
            self.listed_files.len(),
            self.criteria
        );

        // Slots still loading belong to the batch being replaced, except the
        // one the viewer request owns.
        let viewer_request = self.viewer_request.as_ref();
        self.previews.retain(|path, slot| {
            !matches!(slot, PreviewSlot::Loading) || viewer_request == Some(path)
        });
        let pending = self
            .matched
            .iter()
            .map(|record| record.path.clone())
            .filter(|path| !self.previews.contains_key(path))
            .collect::<Vec<_>>();
        if pending.is_empty() {
            self.plate_preview_receiver = None;
            return;
        }
        for path in &pending {
            self.previews.insert(path.clone(), PreviewSlot::Loading);
        }
        self.plate_preview_receiver = Some(spawn_preview_batch(
            self.gateway,
            self.preview_cache.clone(),
            pending,
        ));
    }

    fn poll_previews(&mut self, ctx: &egui::Context) {
        if let Some(receiver) = self.plate_preview_receiver.take() {
            if self.drain_preview_updates(&receiver, ctx) {
                self.plate_preview_receiver = Some(receiver);
            }
        }
        if let Some(receiver) = self.viewer_preview_receiver.take() {
            if self.drain_preview_updates(&receiver, ctx) {
                self.viewer_preview_receiver = Some(receiver);
            } else {
                self.viewer_request = None;
            }
        }
    }

    /// Returns whether the worker behind `receiver` may still send updates.
    fn drain_preview_updates(
        &mut self,
        receiver: &Receiver<PreviewUpdate>,
        ctx: &egui::Context,
    ) -> bool {
        loop {
            match receiver.try_recv() {
                Ok(update) => {
                    let slot = match update.result {
                        Ok(image) => {
                            let name = format!("preview-{}", update.path.display());
                            PreviewSlot::Ready(ctx.load_texture(
                                name,
                                image,
                                TextureOptions::LINEAR,
                            ))
                        }
                        Err(err) => {
                            log::error!("Error loading image {}: {err}", update.path.display());
                            PreviewSlot::Failed(err)
                        }
                    };
                    self.previews.insert(update.path, slot);
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => {
                    if let Ok(cache) = self.preview_cache.lock() {
                        log::debug!("Preview batch finished, {} cached", cache.len());
                    }
                    return false;
                }
            }
        }
    }

    fn set_criteria(&mut self, criteria: FilterCriteria) {
        if criteria == self.criteria {
            return;
        }
        self.criteria = criteria;
        self.refilter();
    }

    /// Opens `path` in the viewer window and moves it to the front of the
    /// recent list.
    fn open_image(&mut self, path: PathBuf) {
        let path_text = path.to_string_lossy().to_string();
        self.recent.record_selection(&path_text);
        self.persist_settings();

        self.viewer.set_source(&path);
        self.viewer_title = filename_of(&path_text).to_string();
        self.viewer_open = true;

        self.request_viewer_preview(path);
    }

    /// Loads `path` for the viewer unless it is already displayable or the
    /// live viewer request is for the same path. A superseded viewer request
    /// gives up its `Loading` slot so a later open starts a new load.
    fn request_viewer_preview(&mut self, path: PathBuf) {
        if matches!(
            self.previews.get(&path),
            Some(PreviewSlot::Ready(_) | PreviewSlot::Failed(_))
        ) {
            return;
        }
        let in_flight = self.viewer_preview_receiver.is_some();
        if in_flight && self.viewer_request.as_ref() == Some(&path) {
            return;
        }

        if let Some(previous) = self.viewer_request.take() {
            if matches!(self.previews.get(&previous), Some(PreviewSlot::Loading)) {
                self.previews.remove(&previous);
            }
        }
        self.previews.insert(path.clone(), PreviewSlot::Loading);
        self.viewer_request = Some(path.clone());
        self.viewer_preview_receiver = Some(spawn_preview_batch(
            self.gateway,
            self.preview_cache.clone(),
            vec![path],
        ));
    }

    fn open_well(&mut self, cell_id: &str) {
        let plate = map_to_grid(&self.matched);
        let path = plate
            .get(cell_id)
            .and_then(|cell| cell.image())
            .map(|record| record.path.clone());
        match path {
            Some(path) => self.open_image(path),
            None => self.status_line = format!("No image available for well {cell_id}."),
        }
    }

    fn terminate_application(ctx: &egui::Context) {
        log::info!("Exit requested");
        ctx.send_viewport_cmd(ViewportCommand::Close);
    }

    fn show_titlebar(&mut self, ctx: &egui::Context) {
        let mut change_directory_clicked = false;
        let mut refresh_clicked = false;
        let mut exit_clicked = false;

        let is_maximized = ctx.input(|input| input.viewport().maximized.unwrap_or(false));
        let title_text = format!("{APP_TITLE} v{APP_VERSION}");
        let bar_fill = ctx.style().visuals.panel_fill;
        egui::TopBottomPanel::top("titlebar")
            .show_separator_line(false)
            .frame(egui::Frame::none().fill(bar_fill))
            .exact_height(30.0)
            .show(ctx, |ui| {
                let button_size = egui::vec2(28.0, 22.0);
                let side_width = button_size.x * 3.0 + ui.spacing().item_spacing.x * 2.0;
                let titlebar_rect = ui.max_rect();
                let center_width = (ui.available_width()
                    - side_width * 2.0
                    - ui.spacing().item_spacing.x * 2.0)
                    .max(0.0);

                ui.add_space(2.0);
                ui.horizontal(|ui| {
                    ui.allocate_ui_with_layout(
                        egui::vec2(side_width, button_size.y),
                        egui::Layout::left_to_right(egui::Align::Center),
                        |ui| {
                            ui.add_space(4.0);
                            ui.menu_button("☰", |ui| {
                                if ui.button("Change Directory").clicked() {
                                    change_directory_clicked = true;
                                    ui.close_menu();
                                }
                                if ui.button("Refresh Directory").clicked() {
                                    refresh_clicked = true;
                                    ui.close_menu();
                                }
                                if ui.button("Recent Images").clicked() {
                                    self.recent_window_open = true;
                                    ui.close_menu();
                                }
                                ui.separator();
                                if ui.button("Exit").clicked() {
                                    exit_clicked = true;
                                    ui.close_menu();
                                }
                            });
                        },
                    );

                    let (title_rect, drag_response) = ui.allocate_exact_size(
                        egui::vec2(center_width, button_size.y),
                        Sense::click_and_drag(),
                    );
                    ui.painter().text(
                        egui::pos2(titlebar_rect.center().x, title_rect.center().y),
                        egui::Align2::CENTER_CENTER,
                        &title_text,
                        egui::FontId::proportional(14.0),
                        ui.visuals().text_color(),
                    );
                    if drag_response.is_pointer_button_down_on() {
                        ctx.send_viewport_cmd(ViewportCommand::StartDrag);
                    }
                    if drag_response.double_clicked() {
                        ctx.send_viewport_cmd(ViewportCommand::Maximized(!is_maximized));
                    }

                    ui.allocate_ui_with_layout(
                        egui::vec2(ui.available_width(), button_size.y),
                        egui::Layout::right_to_left(egui::Align::Center),
                        |ui| {
                            let bar_button = |label: &str| {
                                egui::Button::new(label.to_string())
                                    .fill(bar_fill)
                                    .stroke(egui::Stroke::NONE)
                            };
                            if ui.add_sized(button_size, bar_button("X")).clicked() {
                                exit_clicked = true;
                            }
                            if ui.add_sized(button_size, bar_button("□")).clicked() {
                                ctx.send_viewport_cmd(ViewportCommand::Maximized(!is_maximized));
                            }
                            if ui.add_sized(button_size, bar_button("_")).clicked() {
                                ctx.send_viewport_cmd(ViewportCommand::Minimized(true));
                            }
                        },
                    );
                });
            });

        if change_directory_clicked {
            self.directory_prompt_open = true;
        }
        if refresh_clicked {
            self.refresh_listing();
        }
        if exit_clicked {
            Self::terminate_application(ctx);
        }
    }

    fn show_filter_panel(&mut self, ctx: &egui::Context) {
        let mut criteria = self.criteria.clone();
        let inputs_enabled = self.inputs_enabled;
        let mut change_directory_clicked = false;

        egui::SidePanel::left("filters")
            .resizable(false)
            .exact_width(260.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.plate_view, PlateView::Normal, "Normal View");
                    ui.selectable_value(&mut self.plate_view, PlateView::Tiles, "Tiles View");
                });
                ui.separator();

                ui.label("Experiment:");
                ui.add(
                    egui::TextEdit::singleline(&mut criteria.experiment)
                        .hint_text("DF195 for example"),
                );
                ui.add_space(6.0);

                ui.label("Plate:");
                ui.add(egui::TextEdit::singleline(&mut criteria.plate).hint_text("P1 for example"));
                ui.add_space(6.0);

                ui.label("Patient Code:");
                ui.add_enabled(
                    inputs_enabled,
                    egui::TextEdit::singleline(&mut criteria.patient_code)
                        .hint_text("L52 for example"),
                );
                ui.add_space(6.0);

                ui.label("Stage:");
                ui.add_enabled_ui(inputs_enabled, |ui| {
                    let selected = if criteria.stage.is_empty() {
                        "Select Stage".to_string()
                    } else {
                        criteria.stage.clone()
                    };
                    egui::ComboBox::from_id_salt("stage-select")
                        .selected_text(selected)
                        .width(ui.available_width())
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut criteria.stage, String::new(), "Any");
                            for stage in STAGES {
                                ui.selectable_value(
                                    &mut criteria.stage,
                                    (*stage).to_string(),
                                    *stage,
                                );
                            }
                        });
                });

                ui.separator();
                ui.label(format!(
                    "{} of {} image(s) match",
                    self.matched.len(),
                    self.listed_files.len()
                ));
                if let Some(directory) = self.working_directory.as_ref() {
                    ui.small(directory.display().to_string());
                }
                ui.add_space(6.0);
                if ui.button("Change Directory").clicked() {
                    change_directory_clicked = true;
                }
            });

        self.set_criteria(criteria);
        if change_directory_clicked {
            self.directory_prompt_open = true;
        }
    }

    /// Draws the plate and returns the id of a clicked well, if any.
    fn show_plate(&self, ui: &mut egui::Ui) -> Option<String> {
        let plate = map_to_grid(&self.matched);
        let mut clicked = None;

        ui.weak(format!("{} well(s) with images", plate.image_count()));
        ui.add_space(4.0);
        egui::ScrollArea::both().id_salt("plate-scroll").show(ui, |ui| {
            ui.spacing_mut().item_spacing = egui::vec2(WELL_SPACING, WELL_SPACING);
            ui.horizontal(|ui| {
                ui.allocate_exact_size(egui::vec2(WELL_SIZE, WELL_SIZE * 0.6), Sense::hover());
                for column in COLUMNS {
                    ui.add_sized(
                        egui::vec2(WELL_SIZE, WELL_SIZE * 0.6),
                        egui::Label::new(egui::RichText::new(column.to_string()).strong()),
                    );
                }
            });

            for row in plate.rows() {
                ui.horizontal(|ui| {
                    if let Some(first) = row.first() {
                        ui.add_sized(
                            egui::vec2(WELL_SIZE, WELL_SIZE),
                            egui::Label::new(egui::RichText::new(first.row.to_string()).strong()),
                        );
                    }
                    for cell in row {
                        if self.show_well(ui, cell) {
                            clicked = Some(cell.id.clone());
                        }
                    }
                });
            }
        });

        clicked
    }

    fn show_well(&self, ui: &mut egui::Ui, cell: &PlateCell<'_>) -> bool {
        let sense = match cell.content {
            CellContent::Disabled => Sense::hover(),
            _ => Sense::click(),
        };
        let (rect, response) = ui.allocate_exact_size(egui::vec2(WELL_SIZE, WELL_SIZE), sense);
        let painter = ui.painter();
        let center = rect.center();
        let radius = WELL_SIZE * 0.5 - 1.0;
        let outline = egui::Stroke::new(1.0, egui::Color32::from_gray(90));

        match cell.content {
            CellContent::Disabled => {
                painter.circle(center, radius, egui::Color32::from_gray(40), outline);
                if response.hovered() {
                    ui.ctx().set_cursor_icon(egui::CursorIcon::NotAllowed);
                }
                return false;
            }
            CellContent::Empty => {
                painter.circle_stroke(center, radius, outline);
                painter.circle_stroke(
                    center,
                    radius - 4.0,
                    egui::Stroke::new(1.0, egui::Color32::from_gray(55)),
                );
            }
            CellContent::Image(record) => {
                let slot = self.previews.get(&record.path);
                match (self.plate_view, slot) {
                    (PlateView::Tiles, Some(PreviewSlot::Ready(texture))) => {
                        let inner = rect.shrink(4.0);
                        egui::Image::new((texture.id(), inner.size()))
                            .rounding(inner.width() * 0.5)
                            .paint_at(ui, inner);
                        painter.circle_stroke(center, radius, outline);
                    }
                    (_, Some(PreviewSlot::Failed(_))) => {
                        painter.circle_stroke(
                            center,
                            radius,
                            egui::Stroke::new(1.5, egui::Color32::from_rgb(200, 70, 70)),
                        );
                    }
                    _ => {
                        painter.circle(
                            center,
                            radius,
                            egui::Color32::from_rgb(70, 80, 170),
                            outline,
                        );
                    }
                }
                if self.plate_view == PlateView::Normal {
                    painter.text(
                        center,
                        egui::Align2::CENTER_CENTER,
                        &cell.id,
                        egui::FontId::proportional(11.0),
                        egui::Color32::WHITE,
                    );
                }
            }
        }

        let hover_text = match cell.image() {
            Some(record) => match self.previews.get(&record.path) {
                Some(PreviewSlot::Failed(err)) => {
                    format!("{}\n{}\n{err}", cell.id, record.filename)
                }
                _ => format!("{}\n{}", cell.id, record.filename),
            },
            None => cell.id.clone(),
        };
        response.on_hover_text(hover_text).clicked()
    }

    fn show_directory_prompt(&mut self, ctx: &egui::Context) {
        if !self.directory_prompt_open {
            return;
        }
        let mut select_clicked = false;
        let mut cancel_clicked = false;
        egui::Window::new("Select Working Directory")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(
                    "Please select a directory to work with. This is where your images are stored.",
                );
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Select Directory").clicked() {
                        select_clicked = true;
                    }
                    if self.working_directory.is_some() && ui.button("Cancel").clicked() {
                        cancel_clicked = true;
                    }
                });
            });
        if select_clicked {
            self.choose_directory();
        }
        if cancel_clicked {
            self.directory_prompt_open = false;
        }
    }

    fn show_recent_window(&mut self, ctx: &egui::Context) {
        if !self.recent_window_open {
            return;
        }
        let mut open = self.recent_window_open;
        let mut clicked = None;
        egui::Window::new("Recent Images")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                if self.recent.is_empty() {
                    ui.label("No recent images.");
                    return;
                }
                ui.label("Select a recent image");
                for path in self.recent.iter() {
                    if ui.link(filename_of(path)).on_hover_text(path).clicked() {
                        clicked = Some(PathBuf::from(path));
                    }
                }
            });
        self.recent_window_open = open;
        if let Some(path) = clicked {
            self.open_image(path);
        }
    }

    fn show_viewer_window(&mut self, ctx: &egui::Context) {
        if !self.viewer_open {
            return;
        }
        let Some(path) = self.viewer.source() else {
            return;
        };
        let title = self.viewer_title.clone();
        let (texture, placeholder) = match self.previews.get(path) {
            Some(PreviewSlot::Ready(texture)) => (Some(texture.clone()), String::new()),
            Some(PreviewSlot::Failed(err)) => (None, format!("Could not load image: {err}")),
            Some(PreviewSlot::Loading) | None => (None, "Loading image...".to_string()),
        };

        let mut open = self.viewer_open;
        egui::Window::new(egui::RichText::new(&title).strong())
            .id(egui::Id::new("image-viewer"))
            .open(&mut open)
            .default_size(egui::vec2(560.0, 560.0))
            .resizable(true)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.strong("File:");
                    ui.label(title.as_str());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let offset = self.viewer.offset();
                        ui.weak(format!(
                            "{:.1}x  ({:.0}, {:.0})",
                            self.viewer.zoom(),
                            offset.x,
                            offset.y
                        ));
                    });
                });
                ui.separator();
                self.viewer.show(ui, texture.as_ref(), &placeholder);
            });
        self.viewer_open = open;
        if !self.viewer_open {
            self.viewer.release();
        }
    }

    /// Bottom-right corner handle for the undecorated window. Hidden while
    /// maximized.
    fn show_window_grip(&self, ctx: &egui::Context) {
        if ctx.input(|input| input.viewport().maximized.unwrap_or(false)) {
            return;
        }
        let grip = egui::vec2(GRIP_DOTS as f32 * GRIP_PITCH, GRIP_DOTS as f32 * GRIP_PITCH);

        egui::Area::new(egui::Id::new("wellview-corner-grip"))
            .order(egui::Order::Foreground)
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-2.0, -2.0))
            .show(ctx, |ui| {
                let (rect, response) = ui.allocate_exact_size(grip, Sense::drag());
                if response.drag_started() {
                    ctx.send_viewport_cmd(ViewportCommand::BeginResize(
                        ResizeDirection::SouthEast,
                    ));
                }
                if response.hovered() || response.dragged() {
                    ctx.set_cursor_icon(egui::CursorIcon::ResizeSouthEast);
                }

                let color = if response.hovered() {
                    ui.visuals().strong_text_color()
                } else {
                    egui::Color32::from_gray(80)
                };
                // Lower-right triangle of dots, one per well-sized step.
                for col in 0..GRIP_DOTS {
                    for row in (GRIP_DOTS - 1 - col)..GRIP_DOTS {
                        let center = rect.min
                            + egui::vec2(
                                (col as f32 + 0.5) * GRIP_PITCH,
                                (row as f32 + 0.5) * GRIP_PITCH,
                            );
                        ui.painter().circle_filled(center, 1.2, color);
                    }
                }
            });
    }
}

impl eframe::App for PlateViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_listing();
        self.poll_previews(ctx);

        let mut close_requested = false;
        ctx.input_mut(|input| {
            if input.consume_key(egui::Modifiers::COMMAND, egui::Key::W) {
                close_requested = true;
            }
        });
        if close_requested {
            Self::terminate_application(ctx);
            return;
        }

        self.show_titlebar(ctx);

        egui::TopBottomPanel::bottom("status")
            .show_separator_line(false)
            .show(ctx, |ui| {
                ui.label(self.status_line.as_str());
            });

        if self.working_directory.is_some() {
            self.show_filter_panel(ctx);
        }

        let mut clicked_well = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.working_directory.is_none() {
                ui.allocate_ui_with_layout(
                    ui.available_size(),
                    egui::Layout::centered_and_justified(egui::Direction::TopDown),
                    |ui| {
                        ui.label("Please select a working directory to continue.");
                    },
                );
                return;
            }
            ui.horizontal(|ui| {
                if ui.link("Recent Images").clicked() {
                    self.recent_window_open = true;
                }
            });
            ui.add_space(6.0);
            clicked_well = self.show_plate(ui);
        });

        if let Some(cell_id) = clicked_well {
            self.open_well(&cell_id);
        }

        self.show_directory_prompt(ctx);
        self.show_recent_window(ctx);
        self.show_viewer_window(ctx);
        self.show_window_grip(ctx);

        if self.is_loading() {
            ctx.set_cursor_icon(egui::CursorIcon::Progress);
            ctx.request_repaint_after(LOADING_REPAINT_INTERVAL);
        }
    }
}

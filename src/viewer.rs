use std::path::{Path, PathBuf};

use eframe::egui::{self, Sense, TextureHandle};

pub const ZOOM_STEP: f32 = 0.3;
pub const ZOOM_MIN: f32 = 1.0;
pub const ZOOM_MAX: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    /// `origin` is the pointer position minus the offset at press time.
    Dragging { origin: egui::Pos2 },
}

/// Pan/zoom state for a single displayed image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageViewer {
    zoom: f32,
    offset: egui::Vec2,
    drag: DragState,
    source: Option<PathBuf>,
}

impl Default for ImageViewer {
    fn default() -> Self {
        Self {
            zoom: ZOOM_MIN,
            offset: egui::Vec2::ZERO,
            drag: DragState::Idle,
            source: None,
        }
    }
}

impl ImageViewer {
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn offset(&self) -> egui::Vec2 {
        self.offset
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    pub fn scroll(&mut self, direction: ZoomDirection) {
        let step = match direction {
            ZoomDirection::In => ZOOM_STEP,
            ZoomDirection::Out => -ZOOM_STEP,
        };
        self.zoom = (self.zoom + step).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn press(&mut self, pointer: egui::Pos2) {
        self.drag = DragState::Dragging {
            origin: pointer - self.offset,
        };
    }

    pub fn move_pointer(&mut self, pointer: egui::Pos2) {
        if let DragState::Dragging { origin } = self.drag {
            self.offset = pointer - origin;
        }
    }

    /// Ends a drag. Used for both button release and the pointer leaving the
    /// viewport.
    pub fn release(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Switches the displayed image. Pan is reset; zoom carries over.
    pub fn set_source(&mut self, source: &Path) {
        if self.source.as_deref() == Some(source) {
            return;
        }
        self.source = Some(source.to_path_buf());
        self.offset = egui::Vec2::ZERO;
        self.drag = DragState::Idle;
    }

    pub fn reset_view(&mut self) {
        self.zoom = ZOOM_MIN;
        self.offset = egui::Vec2::ZERO;
        self.drag = DragState::Idle;
    }

    /// Paints `texture` fitted into the available space and feeds pointer
    /// input back into the pan/zoom state.
    pub fn show(&mut self, ui: &mut egui::Ui, texture: Option<&TextureHandle>, placeholder: &str) {
        let Some(texture) = texture else {
            ui.allocate_ui_with_layout(
                ui.available_size(),
                egui::Layout::centered_and_justified(egui::Direction::TopDown),
                |ui| {
                    ui.label(placeholder);
                },
            );
            return;
        };

        let available = ui.available_size();
        let (canvas_rect, response) = ui.allocate_exact_size(available, Sense::click_and_drag());
        let image_size = texture.size_vec2();
        if image_size.x <= 0.0 || image_size.y <= 0.0 || !canvas_rect.is_positive() {
            return;
        }

        if response.double_clicked() {
            self.reset_view();
        }

        let (pressed, released, pointer, scroll) = ui.input(|input| {
            (
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
                input.pointer.hover_pos(),
                input.raw_scroll_delta.y,
            )
        });

        if pressed && response.hovered() {
            if let Some(pos) = pointer {
                self.press(pos);
            }
        }
        if self.is_dragging() {
            match pointer {
                Some(pos) if canvas_rect.contains(pos) => self.move_pointer(pos),
                _ => self.release(),
            }
        }
        if released {
            self.release();
        }

        if response.hovered() {
            if scroll > 0.0 {
                self.scroll(ZoomDirection::In);
            } else if scroll < 0.0 {
                self.scroll(ZoomDirection::Out);
            }
            ui.ctx().set_cursor_icon(if self.is_dragging() {
                egui::CursorIcon::Grabbing
            } else {
                egui::CursorIcon::Grab
            });
        }

        let fit_scale = (canvas_rect.width() / image_size.x)
            .min(canvas_rect.height() / image_size.y)
            .max(0.01);
        let draw_size = image_size * fit_scale * self.zoom;
        let image_rect = egui::Rect::from_center_size(canvas_rect.center() + self.offset, draw_size);
        ui.painter_at(canvas_rect).image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::Pos2::ZERO, egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_in_clamps_at_max() {
        let mut viewer = ImageViewer::default();
        for _ in 0..100 {
            viewer.scroll(ZoomDirection::In);
        }
        assert_eq!(viewer.zoom(), ZOOM_MAX);
    }

    #[test]
    fn zoom_out_clamps_at_min() {
        let mut viewer = ImageViewer::default();
        for _ in 0..100 {
            viewer.scroll(ZoomDirection::In);
        }
        for _ in 0..100 {
            viewer.scroll(ZoomDirection::Out);
        }
        assert_eq!(viewer.zoom(), ZOOM_MIN);
    }

    #[test]
    fn single_step_moves_by_fixed_amount() {
        let mut viewer = ImageViewer::default();
        viewer.scroll(ZoomDirection::In);
        assert!((viewer.zoom() - 1.3).abs() < 1e-6);
    }

    #[test]
    fn drag_tracks_pointer_relative_to_origin() {
        let mut viewer = ImageViewer::default();
        viewer.press(egui::pos2(10.0, 10.0));
        viewer.move_pointer(egui::pos2(30.0, 5.0));
        assert_eq!(viewer.offset(), egui::vec2(20.0, -5.0));
        viewer.release();

        // A second drag continues from the current offset.
        viewer.press(egui::pos2(100.0, 100.0));
        viewer.move_pointer(egui::pos2(110.0, 100.0));
        assert_eq!(viewer.offset(), egui::vec2(30.0, -5.0));
    }

    #[test]
    fn moves_after_release_are_ignored() {
        let mut viewer = ImageViewer::default();
        viewer.press(egui::pos2(0.0, 0.0));
        viewer.move_pointer(egui::pos2(5.0, 5.0));
        viewer.release();
        assert!(!viewer.is_dragging());
        viewer.move_pointer(egui::pos2(500.0, 500.0));
        assert_eq!(viewer.offset(), egui::vec2(5.0, 5.0));
    }

    #[test]
    fn offset_is_not_clamped() {
        let mut viewer = ImageViewer::default();
        viewer.press(egui::pos2(0.0, 0.0));
        viewer.move_pointer(egui::pos2(-10_000.0, 25_000.0));
        assert_eq!(viewer.offset(), egui::vec2(-10_000.0, 25_000.0));
    }

    #[test]
    fn source_change_resets_offset_but_keeps_zoom() {
        let mut viewer = ImageViewer::default();
        viewer.set_source(Path::new("a.jpg"));
        viewer.scroll(ZoomDirection::In);
        viewer.press(egui::pos2(0.0, 0.0));
        viewer.move_pointer(egui::pos2(40.0, 40.0));

        viewer.set_source(Path::new("b.jpg"));
        assert_eq!(viewer.offset(), egui::Vec2::ZERO);
        assert!((viewer.zoom() - 1.3).abs() < 1e-6);
        assert!(!viewer.is_dragging());
        assert_eq!(viewer.source(), Some(Path::new("b.jpg")));
    }

    #[test]
    fn same_source_keeps_offset() {
        let mut viewer = ImageViewer::default();
        viewer.set_source(Path::new("a.jpg"));
        viewer.press(egui::pos2(0.0, 0.0));
        viewer.move_pointer(egui::pos2(7.0, 0.0));
        viewer.release();
        viewer.set_source(Path::new("a.jpg"));
        assert_eq!(viewer.offset(), egui::vec2(7.0, 0.0));
    }
}

//! # View
//!
//! The mapping between document pixels and the zoomable, scrollable surface a document is shown
//! on.
//!
//! Three spaces are involved:
//! * document space, in document pixels,
//! * view space, the scrollable surface. It's at least as large as the visible viewport, and at
//!   least as large as the zoomed canvas, which is centered on it,
//! * screen space, view space minus the scroll offset. Screen `(0, 0)` is the top left of the
//!   visible viewport.

mod zoom;

use cgmath::{EuclideanSpace, SquareMatrix};

pub use zoom::{AutoZoom, ZoomLevel};

use crate::geom::{self, Affine, Point, Rect, Vector};
use crate::layer::{LayerID, MaskViewMode};

/// Things the UI may want to know about. Delivered over the channel from [`View::subscribe`].
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    /// Pixels or overlays changed.
    Repaint,
    NavigatorChanged {
        size_changed: bool,
    },
    HistogramChanged,
    ZoomChanged(ZoomLevel),
    LayerCountChanged(usize),
    ActiveLayerChanged(LayerID),
    LayersReordered,
    MaskViewModeChanged(MaskViewMode),
    SelectionChanged,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    #[error("transform is not invertible")]
    Uninvertable,
}

#[derive(Debug)]
pub struct View {
    zoom: ZoomLevel,
    /// Document size, in document pixels.
    canvas: [u32; 2],
    /// Visible area, in screen pixels.
    viewport: [f64; 2],
    /// Scrollable surface size, `max(viewport, zoomed canvas)`.
    size: [f64; 2],
    scroll: Vector,
    /// View-space position of the canvas' top left corner.
    canvas_start: [f64; 2],
    // Rebuilt on demand after `update_canvas_location` clears them.
    doc_to_view: Option<Affine>,
    view_to_doc: Option<Affine>,
    events: Option<crossbeam::channel::Sender<ViewEvent>>,
}

impl View {
    #[must_use]
    pub fn new(canvas: [u32; 2], viewport: [f64; 2], zoom: ZoomLevel) -> Self {
        let mut this = Self {
            zoom,
            canvas,
            viewport,
            size: viewport,
            scroll: Vector::new(0.0, 0.0),
            canvas_start: [0.0; 2],
            doc_to_view: None,
            view_to_doc: None,
            events: None,
        };
        this.update_canvas_location();
        this
    }
    /// View showing the canvas at a zoom picked by `mode`.
    #[must_use]
    pub fn fitting(canvas: [u32; 2], viewport: [f64; 2], mode: AutoZoom) -> Self {
        Self::new(canvas, viewport, ZoomLevel::fitting(canvas, viewport, mode))
    }
    /// Start listening for events. Replaces any previous listener.
    pub fn subscribe(&mut self) -> crossbeam::channel::Receiver<ViewEvent> {
        let (send, recv) = crossbeam::channel::unbounded();
        self.events = Some(send);
        recv
    }
    pub fn notify(&self, event: ViewEvent) {
        if let Some(events) = &self.events {
            // Listener hung up, no one to tell.
            if events.send(event).is_err() {
                log::trace!("view event dropped, no listener");
            }
        }
    }

    #[must_use]
    pub fn zoom(&self) -> ZoomLevel {
        self.zoom
    }
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.zoom.scale()
    }
    #[must_use]
    pub fn scroll(&self) -> Vector {
        self.scroll
    }
    #[must_use]
    pub fn size(&self) -> [f64; 2] {
        self.size
    }
    #[must_use]
    pub fn viewport_size(&self) -> [f64; 2] {
        self.viewport
    }
    #[must_use]
    pub fn canvas_start(&self) -> [f64; 2] {
        self.canvas_start
    }
    /// Zoomed canvas size, in view pixels.
    #[must_use]
    pub fn canvas_co_size(&self) -> [f64; 2] {
        let scale = self.scale();
        [
            (f64::from(self.canvas[0]) * scale).ceil(),
            (f64::from(self.canvas[1]) * scale).ceil(),
        ]
    }

    /// Re-center the canvas on the view and drop the cached transforms. Called after anything that
    /// moves the canvas around: zoom, resizing the canvas, resizing the viewport.
    pub fn update_canvas_location(&mut self) {
        let co = self.canvas_co_size();
        self.size = [self.viewport[0].max(co[0]), self.viewport[1].max(co[1])];
        self.canvas_start = [
            ((self.size[0] - co[0]) / 2.0).floor(),
            ((self.size[1] - co[1]) / 2.0).floor(),
        ];
        self.doc_to_view = None;
        self.view_to_doc = None;
        self.clamp_scroll();
    }
    fn clamp_scroll(&mut self) {
        let max_x = (self.size[0] - self.viewport[0]).max(0.0);
        let max_y = (self.size[1] - self.viewport[1]).max(0.0);
        self.scroll = Vector::new(
            self.scroll.x.clamp(0.0, max_x),
            self.scroll.y.clamp(0.0, max_y),
        );
    }
    pub fn set_canvas_size(&mut self, canvas: [u32; 2]) {
        self.canvas = canvas;
        self.update_canvas_location();
        self.notify(ViewEvent::NavigatorChanged { size_changed: true });
    }
    pub fn set_viewport_size(&mut self, viewport: [f64; 2]) {
        self.viewport = viewport;
        self.update_canvas_location();
    }
    /// Scroll so that view position `to` is at the top left of the viewport, as far as possible.
    pub fn scroll_to(&mut self, to: Vector) {
        self.scroll = to;
        self.clamp_scroll();
        self.notify(ViewEvent::Repaint);
    }

    /// Change the zoom, keeping the document point under `pivot` (in view space) at the same
    /// screen position. Without a pivot, the center of the viewport stays put.
    ///
    /// Returns false if already at `zoom`.
    pub fn set_zoom(&mut self, zoom: ZoomLevel, pivot: Option<Point>) -> bool {
        if zoom == self.zoom {
            return false;
        }
        let pivot = pivot.unwrap_or_else(|| {
            Point::new(
                self.scroll.x + self.viewport[0] / 2.0,
                self.scroll.y + self.viewport[1] / 2.0,
            )
        });
        let on_screen = pivot.to_vec() - self.scroll;
        let doc_point = self.view_to_doc(pivot);

        log::debug!("zoom {} -> {zoom}", self.zoom);
        self.zoom = zoom;
        self.update_canvas_location();

        let moved = self.doc_to_view(doc_point);
        self.scroll = moved.to_vec() - on_screen;
        self.clamp_scroll();

        self.notify(ViewEvent::ZoomChanged(zoom));
        self.notify(ViewEvent::Repaint);
        true
    }
    pub fn zoom_in(&mut self, pivot: Option<Point>) -> bool {
        self.set_zoom(self.zoom.zoom_in(), pivot)
    }
    pub fn zoom_out(&mut self, pivot: Option<Point>) -> bool {
        self.set_zoom(self.zoom.zoom_out(), pivot)
    }

    #[must_use]
    pub fn doc_to_view(&self, point: Point) -> Point {
        let scale = self.scale();
        Point::new(
            self.canvas_start[0] + point.x * scale,
            self.canvas_start[1] + point.y * scale,
        )
    }
    #[must_use]
    pub fn view_to_doc(&self, point: Point) -> Point {
        let scale = self.scale();
        Point::new(
            (point.x - self.canvas_start[0]) / scale,
            (point.y - self.canvas_start[1]) / scale,
        )
    }
    #[must_use]
    pub fn view_to_screen(&self, point: Point) -> Point {
        point - self.scroll
    }
    #[must_use]
    pub fn screen_to_view(&self, point: Point) -> Point {
        point + self.scroll
    }
    #[must_use]
    pub fn doc_rect_to_view(&self, rect: Rect) -> Rect {
        let scale = self.scale();
        let start = self.doc_to_view(Point::new(rect.x, rect.y));
        Rect::new(start.x, start.y, rect.width * scale, rect.height * scale)
    }
    #[must_use]
    pub fn view_rect_to_doc(&self, rect: Rect) -> Rect {
        let scale = self.scale();
        let start = self.view_to_doc(Point::new(rect.x, rect.y));
        Rect::new(start.x, start.y, rect.width / scale, rect.height / scale)
    }
    /// Part of the document currently on screen, in document space.
    #[must_use]
    pub fn visible_doc_rect(&self) -> Rect {
        self.view_rect_to_doc(Rect::new(
            self.scroll.x,
            self.scroll.y,
            self.viewport[0],
            self.viewport[1],
        ))
    }

    /// Document to view transform, for painters.
    pub fn doc_to_view_transform(&mut self) -> Affine {
        if let Some(cached) = self.doc_to_view {
            return cached;
        }
        let scale = self.scale();
        let transform = geom::translation(self.canvas_start[0], self.canvas_start[1])
            * geom::scaling(scale, scale);
        self.doc_to_view = Some(transform);
        transform
    }
    /// View to document transform, for tools.
    ///
    /// # Errors
    /// Never, at any real zoom level. Kept fallible since it's an inversion.
    pub fn view_to_doc_transform(&mut self) -> Result<Affine, TransformError> {
        if let Some(cached) = self.view_to_doc {
            return Ok(cached);
        }
        let transform = self
            .doc_to_view_transform()
            .invert()
            .ok_or(TransformError::Uninvertable)?;
        self.view_to_doc = Some(transform);
        Ok(transform)
    }
    #[must_use]
    pub fn has_cached_transforms(&self) -> bool {
        self.doc_to_view.is_some() || self.view_to_doc.is_some()
    }
}

//! # Document
//!
//! One open image: its canvas, layer stack, selection and the view it's shown in.
//!
//! Every change to the layer list goes through the document (see [`adder`] and the layer
//! operations), which keeps the active layer valid, invalidates the composite, notifies the view
//! and records an [`Edit`] for the history. Recorded edits pile up until collected with
//! [`Document::take_edits`].

pub mod adder;
mod geometry;
mod history;
mod layers;
mod movement;
pub mod save;
mod selection;

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;

use crate::canvas::Canvas;
use crate::commands::{Command, CommandWrite, Edit};
use crate::composite::{ChangeActions, CompositeCache};
use crate::geom::{Point, Region};
use crate::guides::Guides;
use crate::layer::{Layer, LayerID, LayerMask, MaskViewMode, RasterLayer};
use crate::paths::Paths;
use crate::raster::AllocError;
use crate::selection::Selection;
use crate::view::{View, ViewEvent, ZoomLevel};
use crate::StateError;

pub use adder::{LayerAdder, Position};
pub use movement::MoveMode;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    OutOfMemory(#[from] AllocError),
    #[error("crop area doesn't overlap the canvas")]
    EmptyCrop,
}

/// How [`Document::copy`] treats the identity of the copy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CopyMode {
    /// Same file, name and dirtiness, for restoring later.
    ForUndo,
    /// A new, unsaved document.
    Duplicate,
}

/// The part of the document undo needs to restore after whole-document operations. Paths aren't
/// included, they're transformed instead.
#[derive(Clone, Debug)]
pub struct Snapshot {
    canvas: Canvas,
    layers: Vec<Layer>,
    active: Option<LayerID>,
    mask_view_mode: MaskViewMode,
    selection: Option<Region>,
    guides: Option<Guides>,
}
impl Snapshot {
    #[must_use]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
    /// Same canvas and same layers in the same order, ignoring their pixels.
    fn matches(&self, document: &Document) -> bool {
        self.canvas.size() == document.canvas.size()
            && self.layers.len() == document.layers.len()
            && self
                .layers
                .iter()
                .zip(&document.layers)
                .all(|(a, b)| a.id() == b.id())
    }
}

/// What the active layer's pixels can be reached through.
pub enum Drawable<'a> {
    Layer(&'a mut RasterLayer),
    Mask(&'a mut LayerMask),
}

pub struct Document {
    name: String,
    file: Option<PathBuf>,
    dirty: bool,
    canvas: Canvas,
    /// Bottom to top.
    layers: Vec<Layer>,
    active: Option<LayerID>,
    mask_view_mode: MaskViewMode,
    selection: Option<Selection>,
    /// Selection being dragged out by a tool, not yet committed.
    built_selection: Option<Selection>,
    guides: Option<Guides>,
    paths: Option<Paths>,
    view: Option<View>,
    composite: CompositeCache,
    /// Suffix for the next generated layer name.
    new_layer_count: u32,
    /// Whether this is the document the user is currently working on.
    active_in_ui: bool,
    movement: Option<movement::Movement>,
    edits: Vec<Edit>,
}

impl Document {
    /// A document with a canvas and no layers. Layers must be added before it's used.
    ///
    /// # Errors
    /// If either dimension is zero.
    pub fn new_empty(width: u32, height: u32, name: impl Into<String>) -> Result<Self, StateError> {
        Ok(Self {
            name: name.into(),
            file: None,
            dirty: false,
            canvas: Canvas::new(width, height)?,
            layers: Vec::new(),
            active: None,
            mask_view_mode: MaskViewMode::Normal,
            selection: None,
            built_selection: None,
            guides: None,
            paths: None,
            view: None,
            composite: CompositeCache::default(),
            new_layer_count: 1,
            active_in_ui: false,
            movement: None,
            edits: Vec::new(),
        })
    }
    /// A single-layer document holding `image`. Without a `name`, one is taken from `file`.
    ///
    /// # Errors
    /// If the image is empty.
    pub fn from_image(
        image: RgbaImage,
        file: Option<PathBuf>,
        name: Option<String>,
    ) -> Result<Self, StateError> {
        let name = name
            .or_else(|| file.as_deref().and_then(name_from_path))
            .unwrap_or_else(|| "Untitled".to_owned());
        let mut document = Self::new_empty(image.width(), image.height(), name)?;
        document.file = file;
        let layer_name = document.generate_new_layer_name();
        document
            .add_layer()
            .init_mode()
            .add(Layer::raster(layer_name, image))?;
        Ok(document)
    }

    /// Copy of this document. Pixels are shared copy-on-write. The copy is never bound to a view.
    #[must_use]
    pub fn copy(&self, mode: CopyMode) -> Self {
        let (name, file, dirty, layers, active) = match mode {
            CopyMode::ForUndo => (
                self.name.clone(),
                self.file.clone(),
                self.dirty,
                self.layers.clone(),
                self.active,
            ),
            CopyMode::Duplicate => {
                // Fresh IDs, so layers of the two documents can never be confused.
                let layers: Vec<Layer> = self.layers.iter().map(Layer::clone_with_new_id).collect();
                let active = self
                    .active_index()
                    .and_then(|idx| layers.get(idx))
                    .map(Layer::id);
                (
                    crate::layer::copy_name(strip_extension(&self.name)),
                    None,
                    true,
                    layers,
                    active,
                )
            }
        };
        Self {
            name,
            file,
            dirty,
            canvas: self.canvas,
            layers,
            active,
            mask_view_mode: self.mask_view_mode,
            selection: self.selection.as_ref().map(|s| Selection::new(s.shape().clone())),
            built_selection: None,
            guides: self.guides.clone(),
            paths: self.paths.clone(),
            view: None,
            composite: self.composite.clone(),
            new_layer_count: self.new_layer_count,
            active_in_ui: false,
            movement: None,
            edits: Vec::new(),
        }
    }
    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            canvas: self.canvas,
            layers: self.layers.clone(),
            active: self.active,
            mask_view_mode: self.mask_view_mode,
            selection: self.selection.as_ref().map(|s| s.shape().clone()),
            guides: self.guides.clone(),
        }
    }
    fn restore(&mut self, snapshot: &Snapshot) {
        let size_changed = snapshot.canvas.size() != self.canvas.size();
        self.canvas = snapshot.canvas;
        self.layers.clone_from(&snapshot.layers);
        self.active = snapshot.active;
        self.mask_view_mode = snapshot.mask_view_mode;
        self.set_selection_shape(snapshot.selection.clone());
        self.guides.clone_from(&snapshot.guides);
        if let Some(view) = &mut self.view {
            if size_changed {
                view.set_canvas_size(self.canvas.size());
                self.canvas.recalc_co_size(view.scale());
            }
            view.notify(ViewEvent::LayerCountChanged(self.layers.len()));
        }
        self.image_changed(ChangeActions::FULL, size_changed);
    }
    /// Release the view and stop the selection's animation. The document shouldn't be used after.
    pub fn dispose(&mut self) -> Option<View> {
        log::debug!("disposing {:?}", self.name);
        for selection in [&mut self.selection, &mut self.built_selection]
            .into_iter()
            .flatten()
        {
            selection.die();
        }
        self.view.take()
    }

    /// Check the structural invariants: there is at least one layer, layer IDs are unique, and the
    /// active layer is one of them.
    ///
    /// # Errors
    /// The first violation found.
    pub fn check_invariant(&self) -> Result<(), StateError> {
        if self.layers.is_empty() {
            return Err(StateError::NoLayers);
        }
        let mut seen = hashbrown::HashSet::with_capacity(self.layers.len());
        for layer in &self.layers {
            if !seen.insert(layer.id()) {
                return Err(StateError::DuplicateLayer(layer.id()));
            }
        }
        match self.active {
            Some(active) if seen.contains(&active) => Ok(()),
            _ => Err(StateError::ActiveNotInStack),
        }
    }
    /// Loud in debug builds and tests, free in release.
    fn debug_check_invariant(&self) {
        if cfg!(debug_assertions) {
            if let Err(e) = self.check_invariant() {
                panic!("document {:?} is broken: {e}", self.name);
            }
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
    /// Set the file this document is saved to. The name follows the file.
    pub fn set_file(&mut self, file: PathBuf) {
        if let Some(name) = name_from_path(&file) {
            self.name = name;
        }
        self.file = Some(file);
    }
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
    #[must_use]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }
    #[must_use]
    pub fn guides(&self) -> Option<&Guides> {
        self.guides.as_ref()
    }
    /// Replace the guides, recording the change if `history` is given.
    pub fn set_guides(&mut self, guides: Option<Guides>, history: Option<&'static str>) {
        let from = std::mem::replace(&mut self.guides, guides);
        if let Some(name) = history {
            self.record(
                name,
                Command::GuidesChanged {
                    from,
                    to: self.guides.clone(),
                },
            );
        }
        self.notify(ViewEvent::Repaint);
    }
    pub fn clear_guides(&mut self) {
        if self.guides.is_some() {
            self.set_guides(None, Some("Clear Guides"));
        }
    }
    #[must_use]
    pub fn paths(&self) -> Option<&Paths> {
        self.paths.as_ref()
    }
    pub fn paths_mut(&mut self) -> &mut Paths {
        self.paths.get_or_insert_with(Paths::default)
    }
    #[must_use]
    pub fn mask_view_mode(&self) -> MaskViewMode {
        self.mask_view_mode
    }
    /// # Errors
    /// If the mode needs a mask and the active layer doesn't have one.
    pub fn set_mask_view_mode(&mut self, mode: MaskViewMode) -> Result<(), StateError> {
        let active = self.active_layer().ok_or(StateError::NoLayers)?;
        if !mode.can_be_assigned_to(active) {
            return Err(StateError::NoMask);
        }
        if mode != self.mask_view_mode {
            self.mask_view_mode = mode;
            self.notify(ViewEvent::MaskViewModeChanged(mode));
            self.notify(ViewEvent::Repaint);
        }
        Ok(())
    }
    #[must_use]
    pub fn is_active_in_ui(&self) -> bool {
        self.active_in_ui
    }
    /// Set by the owner of the document list when the user switches documents.
    pub fn set_active_in_ui(&mut self, active: bool) {
        self.active_in_ui = active;
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
    #[must_use]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
    /// Number of layers matching `predicate`.
    pub fn layer_count_where(&self, predicate: impl Fn(&Layer) -> bool) -> usize {
        self.layers.iter().filter(|layer| predicate(layer)).count()
    }
    #[must_use]
    pub fn layer(&self, id: LayerID) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }
    /// Direct access to a layer's properties. Call [`Document::image_changed`] after changing
    /// anything visible.
    pub fn layer_mut(&mut self, id: LayerID) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id() == id)
    }
    /// # Errors
    /// If no layer has this id.
    pub fn index_of(&self, id: LayerID) -> Result<usize, StateError> {
        self.layers
            .iter()
            .position(|layer| layer.id() == id)
            .ok_or(StateError::UnknownLayer(id))
    }
    #[must_use]
    pub fn active_layer_id(&self) -> Option<LayerID> {
        self.active
    }
    #[must_use]
    pub fn active_layer(&self) -> Option<&Layer> {
        self.layer(self.active?)
    }
    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        let active = self.active?;
        self.layer_mut(active)
    }
    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        self.index_of(self.active?).ok()
    }
    #[must_use]
    pub fn is_active_drawable(&self) -> bool {
        self.active_layer().is_some_and(|layer| {
            if self.mask_view_mode.edits_mask() {
                layer.mask.is_some()
            } else {
                layer.as_raster().is_some()
            }
        })
    }
    /// The pixels painting tools should write to: the active layer's mask while editing masks,
    /// otherwise the active layer itself.
    ///
    /// # Errors
    /// If the active layer has no pixels to paint on.
    pub fn active_drawable_mut(&mut self) -> Result<Drawable<'_>, StateError> {
        let edits_mask = self.mask_view_mode.edits_mask();
        let layer = self.active_layer_mut().ok_or(StateError::NoLayers)?;
        if edits_mask {
            return layer
                .mask
                .as_mut()
                .map(Drawable::Mask)
                .ok_or(StateError::NoMask);
        }
        layer
            .as_raster_mut()
            .map(Drawable::Layer)
            .ok_or(StateError::NotDrawable)
    }

    #[must_use]
    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }
    pub fn view_mut(&mut self) -> Option<&mut View> {
        self.view.as_mut()
    }
    /// Show this document in `view`, returning the view it was shown in before.
    pub fn bind_view(&mut self, mut view: View) -> Option<View> {
        view.set_canvas_size(self.canvas.size());
        self.canvas.recalc_co_size(view.scale());
        self.view.replace(view)
    }
    pub fn unbind_view(&mut self) -> Option<View> {
        self.view.take()
    }
    /// Zoom the bound view. See [`View::set_zoom`].
    pub fn set_zoom(&mut self, zoom: ZoomLevel, pivot: Option<Point>) -> bool {
        let Some(view) = &mut self.view else {
            return false;
        };
        let changed = view.set_zoom(zoom, pivot);
        self.canvas.recalc_co_size(view.scale());
        changed
    }
    fn notify(&self, event: ViewEvent) {
        if let Some(view) = &self.view {
            view.notify(event);
        }
    }

    /// The flattened image of all visible layers. Shared until the document changes.
    pub fn composite(&mut self) -> Arc<RgbaImage> {
        self.composite
            .get_or_render(&self.layers, self.canvas.width(), self.canvas.height())
    }
    #[must_use]
    pub fn has_cached_composite(&self) -> bool {
        self.composite.is_valid()
    }
    /// Tell the document its pixels changed. The cached composite is always dropped.
    pub fn image_changed(&mut self, actions: ChangeActions, size_changed: bool) {
        self.composite.invalidate();
        if actions.contains(ChangeActions::REPAINT) {
            self.notify(ViewEvent::Repaint);
            self.notify(ViewEvent::NavigatorChanged { size_changed });
        }
        if actions.contains(ChangeActions::HISTOGRAM) && self.active_in_ui {
            self.notify(ViewEvent::HistogramChanged);
        }
    }

    fn record(&mut self, name: impl Into<Cow<'static, str>>, command: Command) {
        let edit = Edit::new(name, command);
        log::trace!("recorded {:?}", edit.name());
        self.edits.write(edit);
    }
    /// Edits recorded since the last call, oldest first.
    pub fn take_edits(&mut self) -> Vec<Edit> {
        std::mem::take(&mut self.edits)
    }
    /// "layer 1", "layer 2"...
    pub fn generate_new_layer_name(&mut self) -> String {
        let name = format!("layer {}", self.new_layer_count);
        self.new_layer_count += 1;
        name
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("file", &self.file)
            .field("canvas", &self.canvas)
            .field("layers", &self.layers.len())
            .field("active", &self.active)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

fn name_from_path(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}
/// "art.png" -> "art". Names without an extension are returned as is.
fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use image::Rgba;

    pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    pub const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// Document with a solid red layer.
    pub fn red_document(width: u32, height: u32) -> Document {
        Document::from_image(RgbaImage::from_pixel(width, height, RED), None, None).unwrap()
    }

    #[test]
    fn from_image() {
        let document = Document::from_image(
            RgbaImage::new(4, 3),
            Some(PathBuf::from("/tmp/picture.png")),
            None,
        )
        .unwrap();
        assert_eq!(document.name(), "picture.png");
        assert_eq!(document.num_layers(), 1);
        assert_eq!(document.layers()[0].name, "layer 1");
        assert_eq!(document.canvas().size(), [4, 3]);
        assert!(!document.is_dirty());
        document.check_invariant().unwrap();
        assert!(Document::from_image(RgbaImage::new(0, 3), None, None).is_err());
    }
    #[test]
    fn empty_fails_invariant() {
        let document = Document::new_empty(10, 10, "empty").unwrap();
        assert_eq!(document.check_invariant(), Err(StateError::NoLayers));
    }
    #[test]
    fn red_blue_composite() {
        let mut document = red_document(10, 10);
        let blue = document
            .add_layer()
            .add(Layer::raster("blue", RgbaImage::from_pixel(10, 10, BLUE)))
            .unwrap();
        document.layer_mut(blue).unwrap().visible = false;
        document.image_changed(ChangeActions::FULL, false);
        let composite = document.composite();
        assert!(composite.pixels().all(|px| *px == RED));
    }
    #[test]
    fn composite_cache_identity() {
        let mut document = red_document(8, 8);
        let first = document.composite();
        let second = document.composite();
        assert!(Arc::ptr_eq(&first, &second));
        document.image_changed(ChangeActions::INVALIDATE_CACHE, false);
        assert!(!document.has_cached_composite());
        let third = document.composite();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }
    #[test]
    fn image_changed_notifies() {
        let mut document = red_document(8, 8);
        let mut view = View::new([8, 8], [100.0, 100.0], ZoomLevel::Z100);
        let events = view.subscribe();
        document.bind_view(view);
        events.try_iter().for_each(drop);

        // Not active in the UI, no histogram.
        document.image_changed(ChangeActions::FULL, false);
        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(
            received,
            [
                ViewEvent::Repaint,
                ViewEvent::NavigatorChanged {
                    size_changed: false
                }
            ]
        );

        document.set_active_in_ui(true);
        document.image_changed(ChangeActions::HISTOGRAM, false);
        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(received, [ViewEvent::HistogramChanged]);
    }
    #[test]
    fn copies() {
        let mut document = red_document(4, 4);
        document.set_file(PathBuf::from("art.png"));
        document.create_selection_from(Region::rect(crate::Rect::new(0.0, 0.0, 2.0, 2.0)))
            .unwrap();

        let undo = document.copy(CopyMode::ForUndo);
        assert_eq!(undo.file(), document.file());
        assert_eq!(undo.name(), "art.png");
        assert!(!undo.is_dirty());
        assert_eq!(undo.active_layer_id(), document.active_layer_id());
        assert!(undo.selection().is_some());

        let dup = document.copy(CopyMode::Duplicate);
        assert_eq!(dup.file(), None);
        assert_eq!(dup.name(), "art copy");
        assert!(dup.is_dirty());
        assert!(dup.view().is_none());
        assert_ne!(dup.active_layer_id(), document.active_layer_id());
        dup.check_invariant().unwrap();

        let again = dup.copy(CopyMode::Duplicate);
        assert_eq!(again.name(), "art copy 2");
    }
    #[test]
    fn copy_names_drop_the_extension() {
        assert_eq!(strip_extension("art.png"), "art");
        assert_eq!(strip_extension("archive.tar.gz"), "archive.tar");
        assert_eq!(strip_extension("Untitled"), "Untitled");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }
    #[test]
    fn drawable() {
        let mut document = red_document(4, 4);
        assert!(document.is_active_drawable());
        assert!(matches!(document.active_drawable_mut(), Ok(Drawable::Layer(_))));
        // No mask to view yet.
        assert_eq!(
            document.set_mask_view_mode(MaskViewMode::EditMask),
            Err(StateError::NoMask)
        );
        document.active_layer_mut().unwrap().mask = Some(LayerMask::reveal_all(4, 4).unwrap());
        document.set_mask_view_mode(MaskViewMode::EditMask).unwrap();
        assert!(matches!(document.active_drawable_mut(), Ok(Drawable::Mask(_))));
    }
    #[test]
    fn guides() {
        let mut document = red_document(4, 4);
        document.clear_guides();
        assert!(document.take_edits().is_empty());
        document.set_guides(Some(Guides::grid(4, 4, 2, 2)), Some("Change Guides"));
        document.clear_guides();
        let names: Vec<_> = document
            .take_edits()
            .iter()
            .map(|edit| edit.name().to_owned())
            .collect();
        assert_eq!(names, ["Change Guides", "Clear Guides"]);
        assert!(document.guides().is_none());
    }
}

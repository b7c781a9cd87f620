//! Views: mapped client windows
//!
//! A view is the kind-independent record of one managed window: where it
//! sits in the layout, its scene subtree, its task-switcher entry and
//! whether it is mapped. Kind-specific behaviour (native toplevels, legacy
//! surfaces) is reached through [`ViewImpl`].
//!
//! Placement rules:
//! - a *primary* view (one without a parent) and any view larger than the
//!   layout is maximized over the whole layout box;
//! - every other view is centred in the layout box.

pub mod xdg;
pub mod xwayland;

use std::fmt;

use log::{debug, info};

use crate::event::ObjectKey;
use crate::geometry::{Rectangle, Size};
use crate::protocol::{ClientId, ForeignToplevelHandle, SurfaceId, XwaylandId};
use crate::scene::{NodeId, NodeOwner};
use crate::server::GameframeServer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    XdgShell,
    Xwayland,
}

/// Identity of a window in its own shell's parent chain. Keys of different
/// kinds never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AncestryKey {
    Toplevel(SurfaceId),
    Xwayland(XwaylandId),
}

/// Kind-specific view behaviour.
pub trait ViewImpl {
    fn kind(&self) -> ViewKind;
    fn title(&self) -> Option<String>;
    fn app_id(&self) -> Option<String>;
    /// Size the client wants, used for centring
    fn geometry(&self) -> Size;
    /// A primary view has no parent
    fn is_primary(&self) -> bool;
    fn ancestry_key(&self) -> AncestryKey;
    fn parent_key(&self) -> Option<AncestryKey>;
    fn surface(&self) -> Option<SurfaceId>;
    fn client(&self) -> Option<ClientId>;
    fn activate(&mut self, activated: bool);
    /// Ask the client to fill `area` (layout coordinates).
    fn maximize(&mut self, area: Rectangle);
    fn set_fullscreen(&mut self, fullscreen: bool);
    /// Fullscreen state the client last asked for
    fn requested_fullscreen(&self) -> bool;
    /// Resize without changing the maximized state.
    fn configure(&mut self, area: Rectangle);
    /// True while the first commit of the window is being handled
    fn initial_commit(&self) -> bool {
        false
    }
    /// Tell the client which window-management actions are supported.
    fn advertise_capabilities(&mut self) {}
    fn close(&mut self);
    /// Release kind-specific resources before the view is dropped.
    fn destroy(&mut self) {}
}

pub struct View {
    pub id: ViewId,
    pub kind: ViewKind,
    /// Surface committed at map time; `None` while unmapped
    pub surface: Option<SurfaceId>,
    pub scene_tree: NodeId,
    /// Layout position, valid while mapped
    pub lx: i32,
    pub ly: i32,
    pub size: Size,
    pub activated: bool,
    pub foreign_toplevel: Option<Box<dyn ForeignToplevelHandle>>,
    imp: Box<dyn ViewImpl>,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("surface", &self.surface)
            .field("lx", &self.lx)
            .field("ly", &self.ly)
            .field("size", &self.size)
            .field("activated", &self.activated)
            .finish_non_exhaustive()
    }
}

impl View {
    pub fn is_mapped(&self) -> bool {
        self.surface.is_some()
    }

    pub fn is_primary(&self) -> bool {
        self.imp.is_primary()
    }

    pub fn title(&self) -> Option<String> {
        self.imp.title()
    }

    pub fn app_id(&self) -> Option<String> {
        self.imp.app_id()
    }

    pub fn client(&self) -> Option<ClientId> {
        self.imp.client()
    }

    pub fn ancestry_key(&self) -> AncestryKey {
        self.imp.ancestry_key()
    }

    pub fn geometry(&self) -> Rectangle {
        Rectangle::from_loc_and_size((self.lx, self.ly), self.size)
    }

    /// True when the client's preferred size does not fit the layout box.
    pub fn extends_output_layout(&self, layout_box: &Rectangle) -> bool {
        let size = self.imp.geometry();
        layout_box.width < size.width || layout_box.height < size.height
    }
}

/// Every live view, in creation order.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    views: Vec<View>,
    next_id: u64,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(
        &mut self,
        imp: Box<dyn ViewImpl>,
        scene_tree: NodeId,
    ) -> ViewId {
        self.next_id += 1;
        let id = ViewId(self.next_id);
        self.views.push(View {
            id,
            kind: imp.kind(),
            surface: None,
            scene_tree,
            lx: 0,
            ly: 0,
            size: Size::default(),
            activated: false,
            foreign_toplevel: None,
            imp,
        });
        id
    }

    /// Next id [`insert`](Self::insert) will hand out.
    pub(crate) fn peek_next_id(&self) -> ViewId {
        ViewId(self.next_id + 1)
    }

    pub(crate) fn remove(&mut self, id: ViewId) -> Option<View> {
        let index = self.views.iter().position(|v| v.id == id)?;
        Some(self.views.remove(index))
    }

    pub fn get(&self, id: ViewId) -> Option<&View> {
        self.views.iter().find(|v| v.id == id)
    }

    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.iter_mut().find(|v| v.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.views.iter()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn mapped_ids(&self) -> Vec<ViewId> {
        self.views
            .iter()
            .filter(|v| v.is_mapped())
            .map(|v| v.id)
            .collect()
    }

    pub fn find_by_key(&self, key: AncestryKey) -> Option<ViewId> {
        self.views
            .iter()
            .find(|v| v.ancestry_key() == key)
            .map(|v| v.id)
    }

    /// Mapped view displaying `surface`.
    pub fn find_by_surface(&self, surface: SurfaceId) -> Option<ViewId> {
        self.views
            .iter()
            .find(|v| v.surface == Some(surface))
            .map(|v| v.id)
    }

    pub fn find_by_scene_tree(&self, node: NodeId) -> Option<ViewId> {
        self.views
            .iter()
            .find(|v| v.scene_tree == node)
            .map(|v| v.id)
    }

    /// True when `parent` is an ancestor of `child` in the child's own
    /// shell. Views of different kinds are never related.
    pub fn is_transient_for(&self, child: ViewId, parent: ViewId) -> bool {
        let (Some(child), Some(parent)) = (self.get(child), self.get(parent)) else {
            return false;
        };
        if child.kind != parent.kind {
            return false;
        }

        let target = parent.ancestry_key();
        let mut current = child.imp.parent_key();
        // Bounded walk: a malformed parent chain cannot loop forever.
        for _ in 0..=self.views.len() {
            let Some(key) = current else {
                return false;
            };
            if key == target {
                return true;
            }
            current = self
                .find_by_key(key)
                .and_then(|id| self.get(id))
                .and_then(|view| view.imp.parent_key());
        }
        false
    }
}

impl GameframeServer {
    /// Start tracking a new window. It stays invisible until mapped.
    pub(crate) fn view_register(&mut self, imp: Box<dyn ViewImpl>) -> ViewId {
        let owner = NodeOwner::View(self.views.peek_next_id());
        let tree = self.scene.create_node(None, owner);
        let id = self.views.insert(imp, tree);
        debug!("Registered view {:?}", id);
        id
    }

    pub fn view_map(&mut self, id: ViewId, surface: SurfaceId) {
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        view.surface = Some(surface);
        let tree = view.scene_tree;
        let title = view.title();
        let app_id = view.app_id();

        if view.foreign_toplevel.is_none() {
            view.foreign_toplevel = Some(self.collaborators.foreign_toplevels.create_handle(id));
        }
        if let Some(handle) = view.foreign_toplevel.as_mut() {
            if let Some(title) = title.as_deref() {
                handle.set_title(title);
            }
            if let Some(app_id) = app_id.as_deref() {
                handle.set_app_id(app_id);
            }
        }

        self.scene.set_surface(tree, Some(surface));
        self.scene.set_enabled(tree, true);
        self.scene.raise_to_top(tree);

        self.view_position(id);
        self.update_nested_titles(title.as_deref());
        info!("Mapped view {:?} ({})", id, title.as_deref().unwrap_or("untitled"));

        self.seat_set_focus(id);
    }

    pub fn view_unmap(&mut self, id: ViewId) {
        let was_focused = self.seat_get_focus() == Some(id);
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        if view.surface.take().is_none() {
            return;
        }
        view.activated = false;
        let tree = view.scene_tree;
        self.scene.set_enabled(tree, false);
        self.scene.set_surface(tree, None);
        debug!("Unmapped view {:?}", id);

        if was_focused {
            self.seat_clear_focus();
            self.focus_topmost_view();
        }
    }

    /// Place a view according to the placement rules.
    pub fn view_position(&mut self, id: ViewId) {
        let layout_box = self.layout.get_box(None);
        if layout_box.is_empty() {
            debug!("No outputs in the layout, not positioning view {:?}", id);
            return;
        }
        let Some(view) = self.views.get(id) else {
            return;
        };

        if view.is_primary() || view.extends_output_layout(&layout_box) {
            self.view_maximize(id, layout_box);
        } else {
            self.view_center(id, layout_box);
        }
    }

    pub fn view_position_all(&mut self) {
        for id in self.views.mapped_ids() {
            self.view_position(id);
        }
    }

    /// The view's geometry always covers the layout box, but the client is
    /// asked for the game size (`-w/-h`) when one is set. The scene scales
    /// that smaller buffer up to fill the box.
    fn view_maximize(&mut self, id: ViewId, layout_box: Rectangle) {
        let area = match self.config.game.size() {
            Some(game) => Rectangle::from_loc_and_size((layout_box.x, layout_box.y), game),
            None => layout_box,
        };
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        view.lx = layout_box.x;
        view.ly = layout_box.y;
        view.size = layout_box.size();
        view.imp.maximize(area);
        if view.is_primary() {
            view.imp.set_fullscreen(true);
            if let Some(handle) = view.foreign_toplevel.as_mut() {
                handle.set_fullscreen(true);
            }
        }
        let tree = view.scene_tree;
        self.scene.set_position(tree, layout_box.x, layout_box.y);
        self.scene.set_size(tree, layout_box.size());
    }

    fn view_center(&mut self, id: ViewId, layout_box: Rectangle) {
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        let size = view.imp.geometry();
        view.lx = layout_box.x + (layout_box.width - size.width) / 2;
        view.ly = layout_box.y + (layout_box.height - size.height) / 2;
        view.size = size;
        let (lx, ly, tree) = (view.lx, view.ly, view.scene_tree);
        self.scene.set_position(tree, lx, ly);
        self.scene.set_size(tree, size);
    }

    pub fn view_activate(&mut self, id: ViewId, activated: bool) {
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        view.activated = activated;
        view.imp.activate(activated);
        if let Some(handle) = view.foreign_toplevel.as_mut() {
            handle.set_activated(activated);
        }
    }

    /// Unmap if needed, then forget the view entirely.
    pub fn view_destroy(&mut self, id: ViewId) {
        self.listeners.release(ObjectKey::View(id));
        if self.views.get(id).map_or(false, View::is_mapped) {
            self.view_unmap(id);
        }
        let Some(mut view) = self.views.remove(id) else {
            return;
        };
        view.imp.destroy();
        self.scene.destroy(view.scene_tree);
        debug!("Destroyed view {:?}", id);
    }

    /// Honour a fullscreen request from a mapped view, sized to the whole
    /// layout.
    pub fn view_request_fullscreen(&mut self, id: ViewId) {
        let layout_box = self.layout.get_box(None);
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        if !view.is_mapped() {
            return;
        }
        let fullscreen = view.imp.requested_fullscreen();
        view.imp.configure(layout_box);
        view.imp.set_fullscreen(fullscreen);
        if let Some(handle) = view.foreign_toplevel.as_mut() {
            handle.set_fullscreen(fullscreen);
        }
        info!("View {:?} fullscreen: {}", id, fullscreen);
    }

    /// View under a layout point, if any.
    pub fn view_at(&self, lx: f64, ly: f64) -> Option<ViewId> {
        let hit = self.scene.node_at(lx, ly)?;
        let tree_view = self.scene.owning_view(hit.node)?;
        self.views.get(tree_view).map(|view| view.id)
    }

    fn focus_topmost_view(&mut self) {
        let topmost = self
            .views
            .iter()
            .filter(|v| v.is_mapped())
            .max_by_key(|v| self.scene.stack_position(v.scene_tree))
            .map(|v| v.id);
        if let Some(id) = topmost {
            self.seat_set_focus(id);
        }
    }

    /// Title of nested host windows follows the focused game.
    fn update_nested_titles(&mut self, title: Option<&str>) {
        let Some(title) = title else {
            return;
        };
        for output in self.outputs.iter_mut().filter(|o| o.is_nested()) {
            output.backend.set_title(title);
        }
    }
}

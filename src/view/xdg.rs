//! Native (xdg-shell) toplevels, their popups and decoration negotiation.

use log::debug;

use crate::event::{ObjectKey, Signal};
use crate::geometry::{Rectangle, Size};
use crate::protocol::{
    ClientId, DecorationHandle, DecorationId, DecorationMode, PopupHandle, PopupId, PopupParent,
    SurfaceId, XdgToplevelHandle,
};
use crate::scene::{NodeId, NodeOwner};
use crate::server::GameframeServer;

use super::{AncestryKey, ViewId, ViewImpl, ViewKind};

const TOPLEVEL_SIGNALS: &[Signal] = &[
    Signal::Commit,
    Signal::Map,
    Signal::Unmap,
    Signal::RequestFullscreen,
    Signal::RequestActivate,
    Signal::RequestClose,
    Signal::Destroy,
];

/// View adapter over a native toplevel.
pub struct XdgShellView {
    toplevel: Box<dyn XdgToplevelHandle>,
}

impl XdgShellView {
    pub fn new(toplevel: Box<dyn XdgToplevelHandle>) -> Self {
        Self { toplevel }
    }
}

impl ViewImpl for XdgShellView {
    fn kind(&self) -> ViewKind {
        ViewKind::XdgShell
    }

    fn title(&self) -> Option<String> {
        self.toplevel.title()
    }

    fn app_id(&self) -> Option<String> {
        self.toplevel.app_id()
    }

    fn geometry(&self) -> Size {
        self.toplevel.geometry()
    }

    fn is_primary(&self) -> bool {
        self.toplevel.parent().is_none()
    }

    fn ancestry_key(&self) -> AncestryKey {
        AncestryKey::Toplevel(self.toplevel.surface())
    }

    fn parent_key(&self) -> Option<AncestryKey> {
        self.toplevel.parent().map(AncestryKey::Toplevel)
    }

    fn surface(&self) -> Option<SurfaceId> {
        Some(self.toplevel.surface())
    }

    fn client(&self) -> Option<ClientId> {
        Some(self.toplevel.client())
    }

    fn activate(&mut self, activated: bool) {
        self.toplevel.set_activated(activated);
    }

    fn maximize(&mut self, area: Rectangle) {
        self.toplevel.set_size(area.width, area.height);
        self.toplevel.set_maximized(true);
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.toplevel.set_fullscreen(fullscreen);
    }

    fn requested_fullscreen(&self) -> bool {
        self.toplevel.requested_fullscreen()
    }

    fn configure(&mut self, area: Rectangle) {
        self.toplevel.set_size(area.width, area.height);
    }

    fn initial_commit(&self) -> bool {
        self.toplevel.initial_commit()
    }

    fn advertise_capabilities(&mut self) {
        self.toplevel.set_fullscreen_capability();
    }

    fn close(&mut self) {
        self.toplevel.send_close();
    }
}

/// A popup and the scene node it renders into.
pub struct Popup {
    pub handle: Box<dyn PopupHandle>,
    pub node: NodeId,
}

impl GameframeServer {
    fn toplevel_view(&self, surface: SurfaceId) -> Option<ViewId> {
        self.views.find_by_key(AncestryKey::Toplevel(surface))
    }

    /// Resolve a toplevel event to its view, honouring subscriptions.
    fn toplevel_target(&self, surface: SurfaceId, signal: Signal) -> Option<ViewId> {
        let Some(id) = self.toplevel_view(surface) else {
            debug!("Dropping {:?} for unknown toplevel {:?}", signal, surface);
            return None;
        };
        self.listeners
            .accepts(ObjectKey::View(id), signal)
            .then_some(id)
    }

    pub(crate) fn handle_new_toplevel(&mut self, toplevel: Box<dyn XdgToplevelHandle>) {
        let surface = toplevel.surface();
        let id = self.view_register(Box::new(XdgShellView::new(toplevel)));
        self.listeners.subscribe_all(ObjectKey::View(id), TOPLEVEL_SIGNALS);
        debug!("New native toplevel {:?} as view {:?}", surface, id);
    }

    /// The first commit advertises capabilities and sends the initial size.
    pub(crate) fn handle_toplevel_commit(&mut self, surface: SurfaceId) {
        let Some(id) = self.toplevel_target(surface, Signal::Commit) else {
            return;
        };
        let Some(view) = self.views.get_mut(id) else {
            return;
        };
        if !view.imp.initial_commit() {
            return;
        }
        view.imp.advertise_capabilities();
        self.view_position(id);
    }

    pub(crate) fn handle_toplevel_map(&mut self, surface: SurfaceId) {
        if let Some(id) = self.toplevel_target(surface, Signal::Map) {
            self.view_map(id, surface);
        }
    }

    pub(crate) fn handle_toplevel_unmap(&mut self, surface: SurfaceId) {
        if let Some(id) = self.toplevel_target(surface, Signal::Unmap) {
            self.view_unmap(id);
        }
    }

    pub(crate) fn handle_toplevel_destroyed(&mut self, surface: SurfaceId) {
        if let Some(id) = self.toplevel_target(surface, Signal::Destroy) {
            self.view_destroy(id);
        }
    }

    pub(crate) fn handle_toplevel_request_fullscreen(&mut self, surface: SurfaceId) {
        if let Some(id) = self.toplevel_target(surface, Signal::RequestFullscreen) {
            self.view_request_fullscreen(id);
        }
    }

    pub(crate) fn handle_foreign_request_activate(&mut self, id: ViewId) {
        if !self.listeners.accepts(ObjectKey::View(id), Signal::RequestActivate) {
            return;
        }
        if self.views.get(id).map_or(false, |view| view.is_mapped()) {
            self.seat_set_focus(id);
        }
    }

    pub(crate) fn handle_foreign_request_close(&mut self, id: ViewId) {
        if !self.listeners.accepts(ObjectKey::View(id), Signal::RequestClose) {
            return;
        }
        if let Some(view) = self.views.get_mut(id) {
            view.imp.close();
        }
    }

    /// View owning a popup chain.
    pub fn popup_get_view(&self, parent: PopupParent) -> Option<ViewId> {
        let mut current = parent;
        for _ in 0..=self.popups.len() {
            match current {
                PopupParent::Toplevel(surface) => return self.toplevel_view(surface),
                PopupParent::Popup(id) => current = self.popups.get(&id)?.handle.parent(),
                PopupParent::Other => return None,
            }
        }
        None
    }

    pub(crate) fn handle_new_popup(&mut self, id: PopupId, handle: Box<dyn PopupHandle>) {
        let parent = handle.parent();
        let Some(view) = self.popup_get_view(parent) else {
            debug!("Popup {:?} has no managed parent, ignoring it", id);
            return;
        };
        let parent_node = match parent {
            PopupParent::Toplevel(_) => self.views.get(view).map(|v| v.scene_tree),
            PopupParent::Popup(parent) => self.popups.get(&parent).map(|p| p.node),
            PopupParent::Other => None,
        };
        let Some(parent_node) = parent_node else {
            return;
        };

        let node = self.scene.create_node(Some(parent_node), NodeOwner::Popup(id));
        let geometry = handle.geometry();
        self.scene.set_position(node, geometry.x, geometry.y);
        self.scene.set_size(node, geometry.size());
        self.scene.set_surface(node, Some(handle.surface()));
        self.scene.set_enabled(node, true);

        self.popups.insert(id, Popup { handle, node });
        self.listeners.subscribe_all(
            ObjectKey::Popup(id),
            &[Signal::Commit, Signal::Reposition, Signal::Destroy],
        );
    }

    pub(crate) fn handle_popup_commit(&mut self, id: PopupId) {
        if !self.listeners.accepts(ObjectKey::Popup(id), Signal::Commit) {
            return;
        }
        let initial = self
            .popups
            .get(&id)
            .map_or(false, |popup| popup.handle.initial_commit());
        if initial {
            self.popup_unconstrain(id);
        }
    }

    pub(crate) fn handle_popup_reposition(&mut self, id: PopupId) {
        if self.listeners.accepts(ObjectKey::Popup(id), Signal::Reposition) {
            self.popup_unconstrain(id);
        }
    }

    pub(crate) fn handle_popup_destroyed(&mut self, id: PopupId) {
        if !self.listeners.accepts(ObjectKey::Popup(id), Signal::Destroy) {
            return;
        }
        self.listeners.release(ObjectKey::Popup(id));
        if let Some(popup) = self.popups.remove(&id) {
            self.scene.destroy(popup.node);
        }
    }

    /// Keep a popup on the output it opens on, in view-relative coordinates.
    fn popup_unconstrain(&mut self, id: PopupId) {
        let Some(popup) = self.popups.get(&id) else {
            return;
        };
        let Some(view) = self
            .popup_get_view(popup.handle.parent())
            .and_then(|view| self.views.get(view))
        else {
            return;
        };
        let (lx, ly) = (view.lx, view.ly);
        let geometry = popup.handle.geometry();

        let px = f64::from(lx + geometry.x);
        let py = f64::from(ly + geometry.y);
        let output_box = self.layout.get_box(self.layout.output_at(px, py));
        let area = output_box.translate(-lx, -ly);

        let Some(popup) = self.popups.get_mut(&id) else {
            return;
        };
        popup.handle.unconstrain_from_box(area);
        let geometry = popup.handle.geometry();
        let node = popup.node;
        self.scene.set_position(node, geometry.x, geometry.y);
        self.scene.set_size(node, geometry.size());
    }

    pub(crate) fn handle_new_decoration(
        &mut self,
        id: DecorationId,
        decoration: Box<dyn DecorationHandle>,
    ) {
        self.decorations.insert(id, decoration);
        self.listeners.subscribe_all(
            ObjectKey::Decoration(id),
            &[Signal::Commit, Signal::RequestMode, Signal::Destroy],
        );
    }

    pub(crate) fn handle_decoration_commit(&mut self, id: DecorationId) {
        if !self.listeners.accepts(ObjectKey::Decoration(id), Signal::Commit) {
            return;
        }
        let mode = self.decoration_mode();
        if let Some(decoration) = self.decorations.get_mut(&id) {
            if decoration.toplevel_initial_commit() {
                decoration.set_mode(mode);
            }
        }
    }

    pub(crate) fn handle_decoration_request_mode(&mut self, id: DecorationId) {
        if !self.listeners.accepts(ObjectKey::Decoration(id), Signal::RequestMode) {
            return;
        }
        let mode = self.decoration_mode();
        if let Some(decoration) = self.decorations.get_mut(&id) {
            if decoration.toplevel_initialized() {
                decoration.set_mode(mode);
            }
        }
    }

    pub(crate) fn handle_decoration_destroyed(&mut self, id: DecorationId) {
        if !self.listeners.accepts(ObjectKey::Decoration(id), Signal::Destroy) {
            return;
        }
        self.listeners.release(ObjectKey::Decoration(id));
        self.decorations.remove(&id);
    }

    fn decoration_mode(&self) -> DecorationMode {
        if self.config.general.server_side_decorations {
            DecorationMode::ServerSide
        } else {
            DecorationMode::ClientSide
        }
    }
}

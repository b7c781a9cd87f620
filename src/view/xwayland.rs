//! Legacy (X11) surfaces hosted by the compatibility server.
//!
//! Override-redirect windows (menus, tooltips, splash screens) position
//! themselves and are never managed as views.

use log::debug;

use crate::event::{ObjectKey, Signal};
use crate::geometry::{Rectangle, Size};
use crate::protocol::{ClientId, SurfaceId, XwaylandId, XwaylandSurfaceHandle};
use crate::server::GameframeServer;

use super::{AncestryKey, ViewId, ViewImpl, ViewKind};

/// View adapter over a legacy surface.
pub struct XwaylandView {
    surface: Box<dyn XwaylandSurfaceHandle>,
}

impl XwaylandView {
    pub fn new(surface: Box<dyn XwaylandSurfaceHandle>) -> Self {
        Self { surface }
    }
}

impl ViewImpl for XwaylandView {
    fn kind(&self) -> ViewKind {
        ViewKind::Xwayland
    }

    fn title(&self) -> Option<String> {
        self.surface.title()
    }

    fn app_id(&self) -> Option<String> {
        self.surface.class()
    }

    fn geometry(&self) -> Size {
        self.surface.size()
    }

    fn is_primary(&self) -> bool {
        self.surface.parent().is_none()
    }

    fn ancestry_key(&self) -> AncestryKey {
        AncestryKey::Xwayland(self.surface.window())
    }

    fn parent_key(&self) -> Option<AncestryKey> {
        self.surface.parent().map(AncestryKey::Xwayland)
    }

    fn surface(&self) -> Option<SurfaceId> {
        self.surface.surface()
    }

    fn client(&self) -> Option<ClientId> {
        self.surface.client()
    }

    fn activate(&mut self, activated: bool) {
        self.surface.activate(activated);
    }

    fn maximize(&mut self, area: Rectangle) {
        self.surface.configure(area);
        self.surface.set_maximized(true);
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.surface.set_fullscreen(fullscreen);
    }

    fn requested_fullscreen(&self) -> bool {
        self.surface.requested_fullscreen()
    }

    fn configure(&mut self, area: Rectangle) {
        self.surface.configure(area);
    }

    fn close(&mut self) {
        self.surface.close();
    }
}

impl GameframeServer {
    fn xwayland_target(&self, window: XwaylandId, signal: Signal) -> Option<ViewId> {
        let Some(id) = self.views.find_by_key(AncestryKey::Xwayland(window)) else {
            debug!("Dropping {:?} for unmanaged legacy window {:?}", signal, window);
            return None;
        };
        self.listeners
            .accepts(ObjectKey::View(id), signal)
            .then_some(id)
    }

    pub(crate) fn handle_new_xwayland_surface(&mut self, surface: Box<dyn XwaylandSurfaceHandle>) {
        let window = surface.window();
        if surface.override_redirect() {
            debug!("Not managing override-redirect legacy window {:?}", window);
            return;
        }
        let id = self.view_register(Box::new(XwaylandView::new(surface)));
        self.listeners.subscribe_all(
            ObjectKey::View(id),
            &[
                Signal::Map,
                Signal::Unmap,
                Signal::RequestFullscreen,
                Signal::RequestActivate,
                Signal::RequestClose,
                Signal::Destroy,
            ],
        );
        debug!("New legacy window {:?} as view {:?}", window, id);
    }

    pub(crate) fn handle_xwayland_map(&mut self, window: XwaylandId) {
        let Some(id) = self.xwayland_target(window, Signal::Map) else {
            return;
        };
        let surface = self
            .views
            .get(id)
            .and_then(|view| view.imp.surface());
        match surface {
            Some(surface) => self.view_map(id, surface),
            None => debug!("Legacy window {:?} mapped without a surface", window),
        }
    }

    pub(crate) fn handle_xwayland_unmap(&mut self, window: XwaylandId) {
        if let Some(id) = self.xwayland_target(window, Signal::Unmap) {
            self.view_unmap(id);
        }
    }

    pub(crate) fn handle_xwayland_request_fullscreen(&mut self, window: XwaylandId) {
        if let Some(id) = self.xwayland_target(window, Signal::RequestFullscreen) {
            self.view_request_fullscreen(id);
        }
    }

    pub(crate) fn handle_xwayland_destroyed(&mut self, window: XwaylandId) {
        if let Some(id) = self.xwayland_target(window, Signal::Destroy) {
            self.view_destroy(id);
        }
    }
}

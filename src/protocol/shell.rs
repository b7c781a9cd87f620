//! Handles to client-created shell objects.
//!
//! A protocol implementation creates one handle per native toplevel,
//! legacy surface, popup or decoration object and passes it to the server
//! in the matching `New*` event. Later events refer to the object by id.

use crate::geometry::{Rectangle, Size};

use super::{ClientId, PopupId, SurfaceId, XwaylandId};

/// A native (xdg-shell) toplevel.
pub trait XdgToplevelHandle: Send {
    /// The toplevel's base surface
    fn surface(&self) -> SurfaceId;
    fn client(&self) -> ClientId;
    fn title(&self) -> Option<String>;
    fn app_id(&self) -> Option<String>;
    /// Base surface of the parent toplevel
    fn parent(&self) -> Option<SurfaceId>;
    /// Geometry the client committed
    fn geometry(&self) -> Size;
    /// True while handling the first commit of the surface
    fn initial_commit(&self) -> bool;
    /// Fullscreen state the client asked for in its latest request
    fn requested_fullscreen(&self) -> bool;

    fn set_activated(&mut self, activated: bool);
    fn set_size(&mut self, width: i32, height: i32);
    fn set_maximized(&mut self, maximized: bool);
    fn set_fullscreen(&mut self, fullscreen: bool);
    /// Advertise that fullscreen is the only window-management action
    fn set_fullscreen_capability(&mut self);
    fn send_close(&mut self);
}

/// A legacy (X11) surface hosted by the compatibility server.
pub trait XwaylandSurfaceHandle: Send {
    fn window(&self) -> XwaylandId;
    /// Associated surface; present once mapped
    fn surface(&self) -> Option<SurfaceId>;
    fn client(&self) -> Option<ClientId>;
    fn title(&self) -> Option<String>;
    fn class(&self) -> Option<String>;
    fn parent(&self) -> Option<XwaylandId>;
    fn override_redirect(&self) -> bool;
    fn size(&self) -> Size;
    fn requested_fullscreen(&self) -> bool;

    fn activate(&mut self, activated: bool);
    fn configure(&mut self, geometry: Rectangle);
    fn set_maximized(&mut self, maximized: bool);
    fn set_fullscreen(&mut self, fullscreen: bool);
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupParent {
    Toplevel(SurfaceId),
    Popup(PopupId),
    /// Parent surface has no shell role the server manages
    Other,
}

/// An xdg popup.
pub trait PopupHandle: Send {
    fn surface(&self) -> SurfaceId;
    fn parent(&self) -> PopupParent;
    /// Geometry relative to the parent surface
    fn geometry(&self) -> Rectangle;
    fn initial_commit(&self) -> bool;
    /// Constrain the popup to `area`, given relative to the owning toplevel.
    fn unconstrain_from_box(&mut self, area: Rectangle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationMode {
    ClientSide,
    ServerSide,
}

/// Server-side decoration negotiation for one toplevel.
pub trait DecorationHandle: Send {
    fn toplevel(&self) -> SurfaceId;
    /// True once the toplevel has received its initial configure
    fn toplevel_initialized(&self) -> bool;
    /// True while the toplevel is handling its first commit
    fn toplevel_initial_commit(&self) -> bool;
    fn set_mode(&mut self, mode: DecorationMode);
}

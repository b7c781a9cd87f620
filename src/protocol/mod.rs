//! Protocol collaborators
//!
//! The server decides *what* happens; protocol implementations deliver it to
//! clients. Each global the shell relies on (seat, idle notification,
//! output management, foreign toplevel management) is reached through a
//! trait here, and client-created shell objects arrive as the handle traits
//! in [`shell`].

pub mod display;
pub mod recording;
pub mod shell;

use crate::backend::input::{AxisEvent, ButtonState, KeyState, Modifiers};
use crate::backend::OutputId;
use crate::geometry::Size;
use crate::view::ViewId;

pub use shell::{
    DecorationHandle, DecorationMode, PopupHandle, PopupParent, XdgToplevelHandle,
    XwaylandSurfaceHandle,
};

/// A client surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// A connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecorationId(pub u64);

/// A drag-and-drop operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DragId(pub u64);

/// Legacy (X11) window id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XwaylandId(pub u32);

/// Offer of clipboard or primary-selection data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataSourceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub keyboard: bool,
    pub pointer: bool,
    pub touch: bool,
}

/// The client-facing seat: focus and input delivery.
pub trait SeatProtocol {
    fn set_capabilities(&mut self, capabilities: Capabilities);

    fn keyboard_enter(&mut self, surface: SurfaceId, pressed: &[u32], modifiers: Modifiers);
    fn keyboard_clear_focus(&mut self);
    fn keyboard_key(&mut self, time_msec: u32, keycode: u32, state: KeyState);
    fn keyboard_modifiers(&mut self, modifiers: Modifiers);

    fn pointer_enter(&mut self, surface: SurfaceId, sx: f64, sy: f64);
    fn pointer_clear_focus(&mut self);
    fn pointer_motion(&mut self, time_msec: u32, sx: f64, sy: f64);
    fn pointer_button(&mut self, time_msec: u32, button: u32, state: ButtonState);
    fn pointer_axis(&mut self, event: &AxisEvent);
    fn pointer_frame(&mut self);

    fn touch_down(&mut self, time_msec: u32, touch_id: i32, surface: SurfaceId, sx: f64, sy: f64);
    fn touch_motion(&mut self, time_msec: u32, touch_id: i32, sx: f64, sy: f64);
    fn touch_up(&mut self, time_msec: u32, touch_id: i32);
    fn touch_frame(&mut self);

    fn set_selection(&mut self, source: Option<DataSourceId>, serial: u32);
    fn set_primary_selection(&mut self, source: Option<DataSourceId>, serial: u32);
    fn start_drag(&mut self, drag: DragId, serial: u32);
}

/// Idle notification towards clients and the session.
pub trait IdleNotifier {
    fn notify_activity(&mut self);
    fn set_inhibited(&mut self, inhibited: bool);
}

/// One output as advertised to output-management clients.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputHead {
    pub output: OutputId,
    pub name: String,
    pub enabled: bool,
    /// Layout position; only meaningful for enabled outputs
    pub x: i32,
    pub y: i32,
    pub size: Option<Size>,
    pub scale: f64,
}

/// Output-management clients.
pub trait OutputConfigObserver {
    /// Publish the current output configuration.
    fn set_configuration(&mut self, heads: &[OutputHead]);

    /// Answer a test or apply request.
    fn configuration_result(&mut self, serial: u32, succeeded: bool);
}

/// Creates the task-switcher entry for each view.
pub trait ForeignToplevelManager {
    fn create_handle(&mut self, view: ViewId) -> Box<dyn ForeignToplevelHandle>;
}

/// Task-switcher entry of a single view. Dropping it withdraws the entry.
pub trait ForeignToplevelHandle {
    fn set_title(&mut self, title: &str);
    fn set_app_id(&mut self, app_id: &str);
    fn set_activated(&mut self, activated: bool);
    fn set_fullscreen(&mut self, fullscreen: bool);
}

/// Every protocol collaborator the server talks to.
pub struct Collaborators {
    pub seat: Box<dyn SeatProtocol>,
    pub idle: Box<dyn IdleNotifier>,
    pub output_config: Box<dyn OutputConfigObserver>,
    pub foreign_toplevels: Box<dyn ForeignToplevelManager>,
}

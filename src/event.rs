//! Events delivered to the server and the subscription table that routes them.
//!
//! Backends and protocol implementations push [`Event`]s into the event
//! loop. Events aimed at an object (an output, a view, a popup...) are only
//! handled while the server holds a subscription for that object and signal
//! in [`Listeners`]; destroying an object releases all of its subscriptions
//! at once, so late events for it are dropped instead of acted upon.

use std::collections::HashSet;
use std::fmt;

use log::{debug, warn};

use crate::backend::input::{InputDevice, InputEvent};
use crate::backend::{BackendOutput, DeviceId, ModeRequest, OutputId, OutputState};
use crate::idle::InhibitorId;
use crate::protocol::{
    ClientId, DataSourceId, DecorationHandle, DecorationId, DragId, PopupHandle, PopupId,
    SurfaceId, XdgToplevelHandle, XwaylandId, XwaylandSurfaceHandle,
};
use crate::view::ViewId;

pub type EventSender = calloop::channel::Sender<Event>;

/// Icon attached to a drag-and-drop operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragIconInfo {
    pub surface: SurfaceId,
    /// Offset of the icon from the cursor hotspot
    pub offset: (i32, i32),
    pub size: crate::geometry::Size,
}

/// One head of an output-management request.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfigHead {
    pub output: OutputId,
    pub enabled: bool,
    pub mode: Option<ModeRequest>,
    pub position: Option<(i32, i32)>,
    pub scale: Option<f64>,
}

/// A complete output configuration proposed by a client.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfiguration {
    pub serial: u32,
    pub heads: Vec<OutputConfigHead>,
}

pub enum Event {
    // Backend
    NewOutput {
        id: OutputId,
        output: Box<dyn BackendOutput>,
    },
    OutputFrame(OutputId),
    OutputRequestState {
        output: OutputId,
        state: OutputState,
    },
    OutputCommitted {
        output: OutputId,
        /// Mode, scale, position or enabled state changed
        configuration_changed: bool,
    },
    OutputDestroyed(OutputId),
    NewInput(InputDevice),
    NewVirtualPointer {
        device: InputDevice,
        suggested_output: Option<OutputId>,
    },
    InputDestroyed(DeviceId),
    Input(InputEvent),

    // Native shell
    NewToplevel(Box<dyn XdgToplevelHandle>),
    ToplevelCommit(SurfaceId),
    ToplevelMap(SurfaceId),
    ToplevelUnmap(SurfaceId),
    ToplevelRequestFullscreen(SurfaceId),
    ToplevelDestroyed(SurfaceId),
    NewPopup {
        id: PopupId,
        popup: Box<dyn PopupHandle>,
    },
    PopupCommit(PopupId),
    PopupReposition(PopupId),
    PopupDestroyed(PopupId),
    NewDecoration {
        id: DecorationId,
        decoration: Box<dyn DecorationHandle>,
    },
    DecorationCommit(DecorationId),
    DecorationRequestMode(DecorationId),
    DecorationDestroyed(DecorationId),

    // Legacy shell
    NewXwaylandSurface(Box<dyn XwaylandSurfaceHandle>),
    XwaylandMap(XwaylandId),
    XwaylandUnmap(XwaylandId),
    XwaylandRequestFullscreen(XwaylandId),
    XwaylandDestroyed(XwaylandId),

    // Task switcher
    ForeignRequestActivate(ViewId),
    ForeignRequestClose(ViewId),

    // Seat requests from clients
    RequestSetCursor {
        client: ClientId,
        surface: Option<SurfaceId>,
        hotspot: (i32, i32),
    },
    RequestSetSelection {
        source: Option<DataSourceId>,
        serial: u32,
    },
    RequestSetPrimarySelection {
        source: Option<DataSourceId>,
        serial: u32,
    },
    RequestStartDrag {
        drag: DragId,
        serial: u32,
    },
    StartDrag {
        drag: DragId,
        icon: Option<DragIconInfo>,
    },
    DragIconDestroyed(DragId),

    // Idle inhibition
    NewIdleInhibitor {
        id: InhibitorId,
        surface: SurfaceId,
    },
    IdleInhibitorDestroyed(InhibitorId),

    // Output management
    OutputConfigApply(OutputConfiguration),
    OutputConfigTest(OutputConfiguration),
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::NewOutput { id, output } => f
                .debug_struct("NewOutput")
                .field("id", id)
                .field("name", &output.name())
                .finish(),
            Event::OutputFrame(id) => f.debug_tuple("OutputFrame").field(id).finish(),
            Event::OutputRequestState { output, state } => f
                .debug_struct("OutputRequestState")
                .field("output", output)
                .field("state", state)
                .finish(),
            Event::OutputCommitted {
                output,
                configuration_changed,
            } => f
                .debug_struct("OutputCommitted")
                .field("output", output)
                .field("configuration_changed", configuration_changed)
                .finish(),
            Event::OutputDestroyed(id) => f.debug_tuple("OutputDestroyed").field(id).finish(),
            Event::NewInput(device) => f.debug_tuple("NewInput").field(device).finish(),
            Event::NewVirtualPointer {
                device,
                suggested_output,
            } => f
                .debug_struct("NewVirtualPointer")
                .field("device", device)
                .field("suggested_output", suggested_output)
                .finish(),
            Event::InputDestroyed(id) => f.debug_tuple("InputDestroyed").field(id).finish(),
            Event::Input(event) => f.debug_tuple("Input").field(event).finish(),
            Event::NewToplevel(toplevel) => f
                .debug_tuple("NewToplevel")
                .field(&toplevel.surface())
                .finish(),
            Event::ToplevelCommit(s) => f.debug_tuple("ToplevelCommit").field(s).finish(),
            Event::ToplevelMap(s) => f.debug_tuple("ToplevelMap").field(s).finish(),
            Event::ToplevelUnmap(s) => f.debug_tuple("ToplevelUnmap").field(s).finish(),
            Event::ToplevelRequestFullscreen(s) => {
                f.debug_tuple("ToplevelRequestFullscreen").field(s).finish()
            }
            Event::ToplevelDestroyed(s) => f.debug_tuple("ToplevelDestroyed").field(s).finish(),
            Event::NewPopup { id, .. } => f.debug_struct("NewPopup").field("id", id).finish(),
            Event::PopupCommit(id) => f.debug_tuple("PopupCommit").field(id).finish(),
            Event::PopupReposition(id) => f.debug_tuple("PopupReposition").field(id).finish(),
            Event::PopupDestroyed(id) => f.debug_tuple("PopupDestroyed").field(id).finish(),
            Event::NewDecoration { id, .. } => {
                f.debug_struct("NewDecoration").field("id", id).finish()
            }
            Event::DecorationCommit(id) => f.debug_tuple("DecorationCommit").field(id).finish(),
            Event::DecorationRequestMode(id) => {
                f.debug_tuple("DecorationRequestMode").field(id).finish()
            }
            Event::DecorationDestroyed(id) => {
                f.debug_tuple("DecorationDestroyed").field(id).finish()
            }
            Event::NewXwaylandSurface(surface) => f
                .debug_tuple("NewXwaylandSurface")
                .field(&surface.window())
                .finish(),
            Event::XwaylandMap(id) => f.debug_tuple("XwaylandMap").field(id).finish(),
            Event::XwaylandUnmap(id) => f.debug_tuple("XwaylandUnmap").field(id).finish(),
            Event::XwaylandRequestFullscreen(id) => {
                f.debug_tuple("XwaylandRequestFullscreen").field(id).finish()
            }
            Event::XwaylandDestroyed(id) => f.debug_tuple("XwaylandDestroyed").field(id).finish(),
            Event::ForeignRequestActivate(id) => {
                f.debug_tuple("ForeignRequestActivate").field(id).finish()
            }
            Event::ForeignRequestClose(id) => {
                f.debug_tuple("ForeignRequestClose").field(id).finish()
            }
            Event::RequestSetCursor {
                client,
                surface,
                hotspot,
            } => f
                .debug_struct("RequestSetCursor")
                .field("client", client)
                .field("surface", surface)
                .field("hotspot", hotspot)
                .finish(),
            Event::RequestSetSelection { source, serial } => f
                .debug_struct("RequestSetSelection")
                .field("source", source)
                .field("serial", serial)
                .finish(),
            Event::RequestSetPrimarySelection { source, serial } => f
                .debug_struct("RequestSetPrimarySelection")
                .field("source", source)
                .field("serial", serial)
                .finish(),
            Event::RequestStartDrag { drag, serial } => f
                .debug_struct("RequestStartDrag")
                .field("drag", drag)
                .field("serial", serial)
                .finish(),
            Event::StartDrag { drag, icon } => f
                .debug_struct("StartDrag")
                .field("drag", drag)
                .field("icon", icon)
                .finish(),
            Event::DragIconDestroyed(id) => f.debug_tuple("DragIconDestroyed").field(id).finish(),
            Event::NewIdleInhibitor { id, surface } => f
                .debug_struct("NewIdleInhibitor")
                .field("id", id)
                .field("surface", surface)
                .finish(),
            Event::IdleInhibitorDestroyed(id) => {
                f.debug_tuple("IdleInhibitorDestroyed").field(id).finish()
            }
            Event::OutputConfigApply(config) => {
                f.debug_tuple("OutputConfigApply").field(config).finish()
            }
            Event::OutputConfigTest(config) => {
                f.debug_tuple("OutputConfigTest").field(config).finish()
            }
        }
    }
}

/// An object the server can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKey {
    Output(OutputId),
    Device(DeviceId),
    View(ViewId),
    Popup(PopupId),
    Decoration(DecorationId),
    DragIcon(DragId),
    Inhibitor(InhibitorId),
}

/// Signals an object can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Destroy,
    Frame,
    Commit,
    RequestState,
    Key,
    Modifiers,
    Pointer,
    Touch,
    Map,
    Unmap,
    RequestFullscreen,
    RequestActivate,
    RequestClose,
    Reposition,
    RequestMode,
}

/// Subscription table: at most one subscription per (object, signal).
#[derive(Debug, Default)]
pub struct Listeners {
    active: HashSet<(ObjectKey, Signal)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the pair was already subscribed.
    pub fn subscribe(&mut self, object: ObjectKey, signal: Signal) -> bool {
        let inserted = self.active.insert((object, signal));
        if !inserted {
            warn!("Duplicate subscription to {:?} on {:?}", signal, object);
        }
        inserted
    }

    pub fn subscribe_all(&mut self, object: ObjectKey, signals: &[Signal]) {
        for signal in signals {
            self.subscribe(object, *signal);
        }
    }

    pub fn is_subscribed(&self, object: ObjectKey, signal: Signal) -> bool {
        self.active.contains(&(object, signal))
    }

    /// Check a subscription, logging events that arrive without one.
    pub fn accepts(&self, object: ObjectKey, signal: Signal) -> bool {
        let subscribed = self.is_subscribed(object, signal);
        if !subscribed {
            debug!("Dropping {:?} for unsubscribed {:?}", signal, object);
        }
        subscribed
    }

    /// Remove every subscription held for `object`.
    pub fn release(&mut self, object: ObjectKey) -> usize {
        let before = self.active.len();
        self.active.retain(|(key, _)| *key != object);
        before - self.active.len()
    }

    pub fn count_for(&self, object: ObjectKey) -> usize {
        self.active.iter().filter(|(key, _)| *key == object).count()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

//! The server context
//!
//! [`GameframeServer`] owns every component (config, output layout, scene,
//! seat, outputs, views, idle inhibitors) plus the backend and protocol
//! collaborators. Events from the event loop enter through
//! [`GameframeServer::dispatch`]; the handlers live next to the component
//! they mostly concern (`output`, `seat`, `view`, `idle`).

use std::collections::HashMap;

use calloop::LoopSignal;
use log::{debug, info, warn};

use crate::backend::Backend;
use crate::config::GameframeConfig;
use crate::error::BackendError;
use crate::event::{Event, EventSender, Listeners};
use crate::idle::IdleInhibitTracker;
use crate::output::{Output, OutputLayout};
use crate::process::Liveness;
use crate::protocol::{Collaborators, DecorationHandle, DecorationId, PopupId};
use crate::scene::Scene;
use crate::seat::Seat;
use crate::view::xdg::Popup;
use crate::view::ViewRegistry;

pub struct GameframeServer {
    pub config: GameframeConfig,
    pub layout: OutputLayout,
    pub scene: Scene,
    pub seat: Seat,
    /// Most recently added first
    pub outputs: Vec<Output>,
    pub views: ViewRegistry,
    pub idle: IdleInhibitTracker,
    pub listeners: Listeners,
    pub(crate) popups: HashMap<PopupId, Popup>,
    pub(crate) decorations: HashMap<DecorationId, Box<dyn DecorationHandle>>,
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) collaborators: Collaborators,
    terminated: bool,
    return_app_code: bool,
    loop_signal: Option<LoopSignal>,
}

impl GameframeServer {
    pub fn new(
        config: GameframeConfig,
        backend: Box<dyn Backend>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            config,
            layout: OutputLayout::new(),
            scene: Scene::new(),
            seat: Seat::new(),
            outputs: Vec::new(),
            views: ViewRegistry::new(),
            idle: IdleInhibitTracker::new(),
            listeners: Listeners::new(),
            popups: HashMap::new(),
            decorations: HashMap::new(),
            backend,
            collaborators,
            terminated: false,
            return_app_code: false,
            loop_signal: None,
        }
    }

    /// Let [`terminate`](Self::terminate) stop the event loop.
    pub fn set_loop_signal(&mut self, signal: LoopSignal) {
        self.loop_signal = Some(signal);
    }

    pub fn start_backend(&mut self, events: EventSender) -> Result<(), BackendError> {
        self.backend.start(events)
    }

    /// Request shutdown. Only the first call has any effect.
    pub fn terminate(&mut self) {
        if self.terminated {
            debug!("Termination already requested");
            return;
        }
        self.terminated = true;
        info!("Terminating");
        if let Some(signal) = &self.loop_signal {
            signal.stop();
            signal.wakeup();
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// True when the exit status should be the primary client's.
    pub fn return_app_code(&self) -> bool {
        self.return_app_code
    }

    /// The primary client went away: hand its status back and shut down.
    pub fn handle_client_liveness(&mut self, liveness: Liveness) {
        match liveness {
            Liveness::Hangup => info!("Primary client exited"),
            Liveness::Error => warn!("Primary client liveness pipe reported an error"),
        }
        self.return_app_code = true;
        self.terminate();
    }

    /// Frame rate cap for the current focus (0 = unlimited).
    pub fn frame_rate_cap(&self) -> u32 {
        let primary_focused = self
            .seat_get_focus()
            .and_then(|id| self.views.get(id))
            .map_or(false, |view| view.is_primary());
        self.config.fps_cap(primary_focused)
    }

    pub fn dispatch(&mut self, event: Event) {
        if self.terminated {
            debug!("Dropping {:?} after termination", event);
            return;
        }

        match event {
            Event::NewOutput { id, output } => self.handle_new_output(id, output),
            Event::OutputFrame(id) => self.handle_output_frame(id),
            Event::OutputRequestState { output, state } => {
                self.handle_output_request_state(output, state)
            }
            Event::OutputCommitted {
                output,
                configuration_changed,
            } => self.handle_output_committed(output, configuration_changed),
            Event::OutputDestroyed(id) => self.handle_output_destroyed(id),
            Event::NewInput(device) => self.handle_new_input(device),
            Event::NewVirtualPointer {
                device,
                suggested_output,
            } => self.handle_new_virtual_pointer(device, suggested_output),
            Event::InputDestroyed(id) => self.handle_input_destroyed(id),
            Event::Input(event) => self.handle_input(event),

            Event::NewToplevel(toplevel) => self.handle_new_toplevel(toplevel),
            Event::ToplevelCommit(surface) => self.handle_toplevel_commit(surface),
            Event::ToplevelMap(surface) => self.handle_toplevel_map(surface),
            Event::ToplevelUnmap(surface) => self.handle_toplevel_unmap(surface),
            Event::ToplevelRequestFullscreen(surface) => {
                self.handle_toplevel_request_fullscreen(surface)
            }
            Event::ToplevelDestroyed(surface) => self.handle_toplevel_destroyed(surface),
            Event::NewPopup { id, popup } => self.handle_new_popup(id, popup),
            Event::PopupCommit(id) => self.handle_popup_commit(id),
            Event::PopupReposition(id) => self.handle_popup_reposition(id),
            Event::PopupDestroyed(id) => self.handle_popup_destroyed(id),
            Event::NewDecoration { id, decoration } => self.handle_new_decoration(id, decoration),
            Event::DecorationCommit(id) => self.handle_decoration_commit(id),
            Event::DecorationRequestMode(id) => self.handle_decoration_request_mode(id),
            Event::DecorationDestroyed(id) => self.handle_decoration_destroyed(id),

            Event::NewXwaylandSurface(surface) => self.handle_new_xwayland_surface(surface),
            Event::XwaylandMap(id) => self.handle_xwayland_map(id),
            Event::XwaylandUnmap(id) => self.handle_xwayland_unmap(id),
            Event::XwaylandRequestFullscreen(id) => self.handle_xwayland_request_fullscreen(id),
            Event::XwaylandDestroyed(id) => self.handle_xwayland_destroyed(id),

            Event::ForeignRequestActivate(id) => self.handle_foreign_request_activate(id),
            Event::ForeignRequestClose(id) => self.handle_foreign_request_close(id),

            Event::RequestSetCursor {
                client,
                surface,
                hotspot,
            } => self.handle_request_set_cursor(client, surface, hotspot),
            Event::RequestSetSelection { source, serial } => {
                self.handle_request_set_selection(source, serial)
            }
            Event::RequestSetPrimarySelection { source, serial } => {
                self.handle_request_set_primary_selection(source, serial)
            }
            Event::RequestStartDrag { drag, serial } => self.handle_request_start_drag(drag, serial),
            Event::StartDrag { drag, icon } => self.handle_start_drag(drag, icon),
            Event::DragIconDestroyed(drag) => self.handle_drag_icon_destroyed(drag),

            Event::NewIdleInhibitor { id, surface } => self.handle_new_idle_inhibitor(id, surface),
            Event::IdleInhibitorDestroyed(id) => self.handle_idle_inhibitor_destroyed(id),

            Event::OutputConfigApply(configuration) => {
                self.handle_output_config_request(configuration, false)
            }
            Event::OutputConfigTest(configuration) => {
                self.handle_output_config_request(configuration, true)
            }
        }
    }
}

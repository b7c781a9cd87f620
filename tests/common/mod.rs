//! Shared fixtures for the integration tests: a server wired to recording
//! collaborators and scriptable fakes for client-side objects.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use xkbcommon::xkb;

use gameframe::backend::headless::{HeadlessMonitor, HeadlessOutput};
use gameframe::backend::input::{
    ButtonState, DeviceId, DeviceKind, InputDevice, InputEvent, KeyEvent, KeyState, KeyboardInfo,
    Keymap, Keysym, Modifiers, PointerEvent,
};
use gameframe::backend::{Backend, OutputId, OutputState};
use gameframe::event::EventSender;
use gameframe::geometry::{Rectangle, Size};
use gameframe::protocol::recording::Recorders;
use gameframe::protocol::{
    ClientId, Collaborators, DecorationHandle, DecorationMode, PopupHandle, PopupParent,
    SurfaceId, XdgToplevelHandle, XwaylandId, XwaylandSurfaceHandle,
};
use gameframe::view::{AncestryKey, ViewId};
use gameframe::{BackendError, Event, GameframeConfig, GameframeServer};

const KEYMAP: &str = include_str!("../data/keymap.xkb");

/// Self-contained keymap with Escape, a, Control_L, Alt_L and XF86Switch_VT_3.
pub fn keymap() -> Keymap {
    Keymap::from_string(KEYMAP).unwrap()
}

/// Combined mask of named modifiers such as [`xkb::MOD_NAME_ALT`].
pub fn mods(names: &[&str]) -> u32 {
    let keymap = keymap();
    names
        .iter()
        .map(|name| keymap.mod_mask(name).unwrap())
        .fold(0, |mask, bit| mask | bit)
}

pub fn alt() -> u32 {
    mods(&[xkb::MOD_NAME_ALT])
}

/// What the fake backend was asked to do.
#[derive(Debug, Default)]
pub struct BackendLog {
    pub vt_switches: Vec<u32>,
    pub swapchain_checks: usize,
}

/// Backend with a controllable session and swapchain verdict.
pub struct FakeBackend {
    pub multi_session: bool,
    pub swapchains_ok: bool,
    pub log: Arc<Mutex<BackendLog>>,
}

impl Backend for FakeBackend {
    fn start(&mut self, _events: EventSender) -> Result<(), BackendError> {
        Ok(())
    }

    fn is_multi_session(&self) -> bool {
        self.multi_session
    }

    fn change_vt(&mut self, vt: u32) -> bool {
        self.log.lock().vt_switches.push(vt);
        true
    }

    fn prepare_swapchains(&mut self, _states: &[(OutputId, OutputState)]) -> bool {
        self.log.lock().swapchain_checks += 1;
        self.swapchains_ok
    }
}

pub struct Harness {
    pub server: GameframeServer,
    pub recorders: Recorders,
    pub backend: Arc<Mutex<BackendLog>>,
    next_output: u64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(GameframeConfig::default())
    }

    pub fn with_config(config: GameframeConfig) -> Self {
        Self::build(config, true, true)
    }

    pub fn build(config: GameframeConfig, multi_session: bool, swapchains_ok: bool) -> Self {
        let (collaborators, recorders) = Collaborators::recording();
        let log = Arc::new(Mutex::new(BackendLog::default()));
        let backend = FakeBackend {
            multi_session,
            swapchains_ok,
            log: Arc::clone(&log),
        };
        Self {
            server: GameframeServer::new(config, Box::new(backend), collaborators),
            recorders,
            backend: log,
            next_output: 0,
        }
    }

    pub fn dispatch(&mut self, event: Event) {
        self.server.dispatch(event);
    }

    /// Plug in an output; returns its id and a monitor onto its state.
    pub fn plug(&mut self, output: HeadlessOutput) -> (OutputId, HeadlessMonitor) {
        self.next_output += 1;
        let id = OutputId(self.next_output);
        let monitor = output.monitor();
        self.dispatch(Event::NewOutput {
            id,
            output: Box::new(output),
        });
        (id, monitor)
    }

    pub fn plug_output(&mut self, width: i32, height: i32) -> (OutputId, HeadlessMonitor) {
        let name = format!("HEADLESS-{}", self.next_output + 1);
        self.plug(HeadlessOutput::new(name, width, height, 60_000))
    }

    pub fn unplug(&mut self, id: OutputId) {
        self.dispatch(Event::OutputDestroyed(id));
    }

    pub fn add_keyboard(&mut self, id: u64) -> DeviceId {
        let device = DeviceId(id);
        self.dispatch(Event::NewInput(InputDevice {
            id: device,
            name: format!("keyboard-{}", id),
            kind: DeviceKind::Keyboard(KeyboardInfo {
                keymap: keymap(),
                ..Default::default()
            }),
            output_name: None,
        }));
        device
    }

    pub fn add_pointer(&mut self, id: u64) -> DeviceId {
        let device = DeviceId(id);
        self.dispatch(Event::NewInput(InputDevice {
            id: device,
            name: format!("pointer-{}", id),
            kind: DeviceKind::Pointer,
            output_name: None,
        }));
        device
    }

    pub fn modifiers(&mut self, device: DeviceId, depressed: u32) {
        self.dispatch(Event::Input(InputEvent::Modifiers {
            device,
            modifiers: Modifiers {
                depressed,
                ..Default::default()
            },
        }));
    }

    pub fn key(&mut self, device: DeviceId, keycode: u32, state: KeyState, keysym: Keysym) {
        self.dispatch(Event::Input(InputEvent::Key {
            device,
            event: KeyEvent {
                time_msec: 0,
                keycode,
                state,
                keysyms: vec![keysym],
            },
        }));
    }

    /// Move the pointer to normalized layout coordinates and click.
    pub fn click_at(&mut self, device: DeviceId, x: f64, y: f64) {
        self.dispatch(Event::Input(InputEvent::Pointer {
            device,
            event: PointerEvent::MotionAbsolute { time_msec: 0, x, y },
        }));
        self.dispatch(Event::Input(InputEvent::Pointer {
            device,
            event: PointerEvent::Button {
                time_msec: 0,
                button: 0x110,
                state: ButtonState::Pressed,
            },
        }));
    }

    /// Create, commit and map a native toplevel.
    pub fn map_toplevel(&mut self, toplevel: &FakeToplevel) -> ViewId {
        self.dispatch(Event::NewToplevel(Box::new(toplevel.clone())));
        toplevel.state.lock().initial_commit = true;
        self.dispatch(Event::ToplevelCommit(toplevel.surface));
        toplevel.state.lock().initial_commit = false;
        self.dispatch(Event::ToplevelMap(toplevel.surface));
        self.view_of(toplevel)
    }

    pub fn view_of(&self, toplevel: &FakeToplevel) -> ViewId {
        self.server
            .views
            .find_by_key(AncestryKey::Toplevel(toplevel.surface))
            .expect("toplevel has a view")
    }

    pub fn focused(&self) -> Option<ViewId> {
        self.server.seat_get_focus()
    }
}

/// Client-visible state of a fake native toplevel.
#[derive(Debug, Clone, Default)]
pub struct ToplevelState {
    pub title: Option<String>,
    pub app_id: Option<String>,
    pub geometry: Size,
    pub initial_commit: bool,
    pub requested_fullscreen: bool,
    pub activated: bool,
    pub size: Option<(i32, i32)>,
    pub maximized: bool,
    pub fullscreen: bool,
    pub fullscreen_capability: bool,
    pub closed: bool,
}

#[derive(Clone)]
pub struct FakeToplevel {
    pub surface: SurfaceId,
    pub client: ClientId,
    pub parent: Option<SurfaceId>,
    pub state: Arc<Mutex<ToplevelState>>,
}

impl FakeToplevel {
    pub fn new(surface: u64, width: i32, height: i32) -> Self {
        Self {
            surface: SurfaceId(surface),
            client: ClientId(1),
            parent: None,
            state: Arc::new(Mutex::new(ToplevelState {
                geometry: Size::new(width, height),
                ..Default::default()
            })),
        }
    }

    pub fn child_of(mut self, parent: &FakeToplevel) -> Self {
        self.parent = Some(parent.surface);
        self
    }

    pub fn titled(self, title: &str) -> Self {
        self.state.lock().title = Some(title.to_string());
        self
    }

    pub fn state(&self) -> ToplevelState {
        self.state.lock().clone()
    }
}

impl XdgToplevelHandle for FakeToplevel {
    fn surface(&self) -> SurfaceId {
        self.surface
    }

    fn client(&self) -> ClientId {
        self.client
    }

    fn title(&self) -> Option<String> {
        self.state.lock().title.clone()
    }

    fn app_id(&self) -> Option<String> {
        self.state.lock().app_id.clone()
    }

    fn parent(&self) -> Option<SurfaceId> {
        self.parent
    }

    fn geometry(&self) -> Size {
        self.state.lock().geometry
    }

    fn initial_commit(&self) -> bool {
        self.state.lock().initial_commit
    }

    fn requested_fullscreen(&self) -> bool {
        self.state.lock().requested_fullscreen
    }

    fn set_activated(&mut self, activated: bool) {
        self.state.lock().activated = activated;
    }

    fn set_size(&mut self, width: i32, height: i32) {
        self.state.lock().size = Some((width, height));
    }

    fn set_maximized(&mut self, maximized: bool) {
        self.state.lock().maximized = maximized;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.state.lock().fullscreen = fullscreen;
    }

    fn set_fullscreen_capability(&mut self) {
        self.state.lock().fullscreen_capability = true;
    }

    fn send_close(&mut self) {
        self.state.lock().closed = true;
    }
}

#[derive(Debug, Clone, Default)]
pub struct XwaylandState {
    pub activated: bool,
    pub configured: Option<Rectangle>,
    pub maximized: bool,
    pub fullscreen: bool,
    pub closed: bool,
}

#[derive(Clone)]
pub struct FakeXwayland {
    pub window: XwaylandId,
    pub surface: Option<SurfaceId>,
    pub parent: Option<XwaylandId>,
    pub override_redirect: bool,
    pub size: Size,
    pub state: Arc<Mutex<XwaylandState>>,
}

impl FakeXwayland {
    pub fn new(window: u32, surface: u64, width: i32, height: i32) -> Self {
        Self {
            window: XwaylandId(window),
            surface: Some(SurfaceId(surface)),
            parent: None,
            override_redirect: false,
            size: Size::new(width, height),
            state: Arc::default(),
        }
    }

    pub fn state(&self) -> XwaylandState {
        self.state.lock().clone()
    }
}

impl XwaylandSurfaceHandle for FakeXwayland {
    fn window(&self) -> XwaylandId {
        self.window
    }

    fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    fn client(&self) -> Option<ClientId> {
        Some(ClientId(2))
    }

    fn title(&self) -> Option<String> {
        Some("legacy".to_string())
    }

    fn class(&self) -> Option<String> {
        Some("Legacy".to_string())
    }

    fn parent(&self) -> Option<XwaylandId> {
        self.parent
    }

    fn override_redirect(&self) -> bool {
        self.override_redirect
    }

    fn size(&self) -> Size {
        self.size
    }

    fn requested_fullscreen(&self) -> bool {
        false
    }

    fn activate(&mut self, activated: bool) {
        self.state.lock().activated = activated;
    }

    fn configure(&mut self, geometry: Rectangle) {
        self.state.lock().configured = Some(geometry);
    }

    fn set_maximized(&mut self, maximized: bool) {
        self.state.lock().maximized = maximized;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.state.lock().fullscreen = fullscreen;
    }

    fn close(&mut self) {
        self.state.lock().closed = true;
    }
}

#[derive(Debug, Clone)]
pub struct PopupState {
    pub geometry: Rectangle,
    pub initial_commit: bool,
    pub constraint: Option<Rectangle>,
}

#[derive(Clone)]
pub struct FakePopup {
    pub surface: SurfaceId,
    pub parent: PopupParent,
    pub state: Arc<Mutex<PopupState>>,
}

impl FakePopup {
    pub fn new(surface: u64, parent: PopupParent, geometry: Rectangle) -> Self {
        Self {
            surface: SurfaceId(surface),
            parent,
            state: Arc::new(Mutex::new(PopupState {
                geometry,
                initial_commit: false,
                constraint: None,
            })),
        }
    }

    pub fn state(&self) -> PopupState {
        self.state.lock().clone()
    }
}

impl PopupHandle for FakePopup {
    fn surface(&self) -> SurfaceId {
        self.surface
    }

    fn parent(&self) -> PopupParent {
        self.parent
    }

    fn geometry(&self) -> Rectangle {
        self.state.lock().geometry
    }

    fn initial_commit(&self) -> bool {
        self.state.lock().initial_commit
    }

    fn unconstrain_from_box(&mut self, area: Rectangle) {
        self.state.lock().constraint = Some(area);
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecorationState {
    pub initialized: bool,
    pub initial_commit: bool,
    pub modes: Vec<DecorationMode>,
}

#[derive(Clone)]
pub struct FakeDecoration {
    pub toplevel: SurfaceId,
    pub state: Arc<Mutex<DecorationState>>,
}

impl FakeDecoration {
    pub fn new(toplevel: SurfaceId) -> Self {
        Self {
            toplevel,
            state: Arc::default(),
        }
    }

    pub fn state(&self) -> DecorationState {
        self.state.lock().clone()
    }
}

impl DecorationHandle for FakeDecoration {
    fn toplevel(&self) -> SurfaceId {
        self.toplevel
    }

    fn toplevel_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    fn toplevel_initial_commit(&self) -> bool {
        self.state.lock().initial_commit
    }

    fn set_mode(&mut self, mode: DecorationMode) {
        self.state.lock().modes.push(mode);
    }
}

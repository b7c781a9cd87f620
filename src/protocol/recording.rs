//! In-process collaborators that record what the server asked of them.
//!
//! Used when no client-facing protocol stack is wired up (headless runs)
//! and by the tests, which inspect the recorded state through the shared
//! monitor handles returned by [`Collaborators::recording`].

use std::collections::BTreeMap;
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;

use super::{
    Capabilities, Collaborators, DataSourceId, DragId, ForeignToplevelHandle,
    ForeignToplevelManager, IdleNotifier, OutputConfigObserver, OutputHead, SeatProtocol,
    SurfaceId,
};
use crate::backend::input::{AxisEvent, ButtonState, KeyState, Modifiers};
use crate::view::ViewId;

/// A pointer or touch delivery, in surface-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerRecord {
    Enter { surface: SurfaceId, sx: f64, sy: f64 },
    Leave,
    Motion { sx: f64, sy: f64 },
    Button { button: u32, state: ButtonState },
    Axis(AxisEvent),
    Frame,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TouchRecord {
    Down { id: i32, surface: SurfaceId, sx: f64, sy: f64 },
    Motion { id: i32, sx: f64, sy: f64 },
    Up { id: i32 },
    Frame,
}

/// Everything the seat was told to deliver.
#[derive(Debug, Clone, Default)]
pub struct SeatLog {
    pub capabilities: Capabilities,
    pub keyboard_focus: Option<SurfaceId>,
    /// Every surface that received keyboard enter, in order
    pub keyboard_enters: Vec<SurfaceId>,
    pub keys: Vec<(u32, KeyState)>,
    pub modifiers: Vec<Modifiers>,
    pub pointer_focus: Option<SurfaceId>,
    pub pointer: Vec<PointerRecord>,
    pub touch: Vec<TouchRecord>,
    pub selection: Option<DataSourceId>,
    pub primary_selection: Option<DataSourceId>,
    pub drags: Vec<DragId>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSeat {
    log: Arc<Mutex<SeatLog>>,
}

impl RecordingSeat {
    pub fn log(&self) -> SeatLog {
        self.log.lock().clone()
    }
}

impl SeatProtocol for RecordingSeat {
    fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.log.lock().capabilities = capabilities;
    }

    fn keyboard_enter(&mut self, surface: SurfaceId, _pressed: &[u32], modifiers: Modifiers) {
        let mut log = self.log.lock();
        log.keyboard_focus = Some(surface);
        log.keyboard_enters.push(surface);
        log.modifiers.push(modifiers);
    }

    fn keyboard_clear_focus(&mut self) {
        self.log.lock().keyboard_focus = None;
    }

    fn keyboard_key(&mut self, _time_msec: u32, keycode: u32, state: KeyState) {
        self.log.lock().keys.push((keycode, state));
    }

    fn keyboard_modifiers(&mut self, modifiers: Modifiers) {
        self.log.lock().modifiers.push(modifiers);
    }

    fn pointer_enter(&mut self, surface: SurfaceId, sx: f64, sy: f64) {
        let mut log = self.log.lock();
        log.pointer_focus = Some(surface);
        log.pointer.push(PointerRecord::Enter { surface, sx, sy });
    }

    fn pointer_clear_focus(&mut self) {
        let mut log = self.log.lock();
        if log.pointer_focus.take().is_some() {
            log.pointer.push(PointerRecord::Leave);
        }
    }

    fn pointer_motion(&mut self, _time_msec: u32, sx: f64, sy: f64) {
        self.log.lock().pointer.push(PointerRecord::Motion { sx, sy });
    }

    fn pointer_button(&mut self, _time_msec: u32, button: u32, state: ButtonState) {
        self.log
            .lock()
            .pointer
            .push(PointerRecord::Button { button, state });
    }

    fn pointer_axis(&mut self, event: &AxisEvent) {
        self.log.lock().pointer.push(PointerRecord::Axis(*event));
    }

    fn pointer_frame(&mut self) {
        self.log.lock().pointer.push(PointerRecord::Frame);
    }

    fn touch_down(&mut self, _time_msec: u32, touch_id: i32, surface: SurfaceId, sx: f64, sy: f64) {
        self.log.lock().touch.push(TouchRecord::Down {
            id: touch_id,
            surface,
            sx,
            sy,
        });
    }

    fn touch_motion(&mut self, _time_msec: u32, touch_id: i32, sx: f64, sy: f64) {
        self.log
            .lock()
            .touch
            .push(TouchRecord::Motion { id: touch_id, sx, sy });
    }

    fn touch_up(&mut self, _time_msec: u32, touch_id: i32) {
        self.log.lock().touch.push(TouchRecord::Up { id: touch_id });
    }

    fn touch_frame(&mut self) {
        self.log.lock().touch.push(TouchRecord::Frame);
    }

    fn set_selection(&mut self, source: Option<DataSourceId>, serial: u32) {
        trace!("Selection set to {:?} (serial {})", source, serial);
        self.log.lock().selection = source;
    }

    fn set_primary_selection(&mut self, source: Option<DataSourceId>, serial: u32) {
        trace!("Primary selection set to {:?} (serial {})", source, serial);
        self.log.lock().primary_selection = source;
    }

    fn start_drag(&mut self, drag: DragId, _serial: u32) {
        self.log.lock().drags.push(drag);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleState {
    pub activity: u64,
    pub inhibited: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingIdle {
    state: Arc<Mutex<IdleState>>,
}

impl RecordingIdle {
    pub fn state(&self) -> IdleState {
        *self.state.lock()
    }
}

impl IdleNotifier for RecordingIdle {
    fn notify_activity(&mut self) {
        self.state.lock().activity += 1;
    }

    fn set_inhibited(&mut self, inhibited: bool) {
        self.state.lock().inhibited = inhibited;
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputConfigLog {
    /// Most recently published configuration
    pub heads: Vec<OutputHead>,
    pub publications: usize,
    /// `(serial, succeeded)` per answered request
    pub results: Vec<(u32, bool)>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingOutputConfig {
    log: Arc<Mutex<OutputConfigLog>>,
}

impl RecordingOutputConfig {
    pub fn log(&self) -> OutputConfigLog {
        self.log.lock().clone()
    }
}

impl OutputConfigObserver for RecordingOutputConfig {
    fn set_configuration(&mut self, heads: &[OutputHead]) {
        let mut log = self.log.lock();
        log.heads = heads.to_vec();
        log.publications += 1;
    }

    fn configuration_result(&mut self, serial: u32, succeeded: bool) {
        self.log.lock().results.push((serial, succeeded));
    }
}

/// Task-switcher entry state of one view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToplevelEntry {
    pub title: String,
    pub app_id: String,
    pub activated: bool,
    pub fullscreen: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingForeignToplevels {
    entries: Arc<Mutex<BTreeMap<ViewId, ToplevelEntry>>>,
}

impl RecordingForeignToplevels {
    /// Entries that are currently advertised.
    pub fn entries(&self) -> BTreeMap<ViewId, ToplevelEntry> {
        self.entries.lock().clone()
    }

    pub fn entry(&self, view: ViewId) -> Option<ToplevelEntry> {
        self.entries.lock().get(&view).cloned()
    }
}

impl ForeignToplevelManager for RecordingForeignToplevels {
    fn create_handle(&mut self, view: ViewId) -> Box<dyn ForeignToplevelHandle> {
        self.entries.lock().insert(view, ToplevelEntry::default());
        Box::new(RecordingToplevelHandle {
            view,
            entries: Arc::clone(&self.entries),
        })
    }
}

struct RecordingToplevelHandle {
    view: ViewId,
    entries: Arc<Mutex<BTreeMap<ViewId, ToplevelEntry>>>,
}

impl RecordingToplevelHandle {
    fn update(&self, f: impl FnOnce(&mut ToplevelEntry)) {
        if let Some(entry) = self.entries.lock().get_mut(&self.view) {
            f(entry);
        }
    }
}

impl ForeignToplevelHandle for RecordingToplevelHandle {
    fn set_title(&mut self, title: &str) {
        self.update(|entry| entry.title = title.to_owned());
    }

    fn set_app_id(&mut self, app_id: &str) {
        self.update(|entry| entry.app_id = app_id.to_owned());
    }

    fn set_activated(&mut self, activated: bool) {
        self.update(|entry| entry.activated = activated);
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.update(|entry| entry.fullscreen = fullscreen);
    }
}

impl Drop for RecordingToplevelHandle {
    fn drop(&mut self) {
        self.entries.lock().remove(&self.view);
    }
}

/// Shared handles onto the recording collaborators.
#[derive(Debug, Clone, Default)]
pub struct Recorders {
    pub seat: RecordingSeat,
    pub idle: RecordingIdle,
    pub output_config: RecordingOutputConfig,
    pub foreign_toplevels: RecordingForeignToplevels,
}

impl Collaborators {
    /// Recording collaborators plus handles sharing their state.
    pub fn recording() -> (Self, Recorders) {
        let recorders = Recorders::default();
        let collaborators = Self {
            seat: Box::new(recorders.seat.clone()),
            idle: Box::new(recorders.idle.clone()),
            output_config: Box::new(recorders.output_config.clone()),
            foreign_toplevels: Box::new(recorders.foreign_toplevels.clone()),
        };
        (collaborators, recorders)
    }
}

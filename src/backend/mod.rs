//! Display/session backend boundary
//!
//! A backend owns the hardware (or nested window, or nothing at all for the
//! headless backend) and reports outputs, input devices and their events to
//! the server through an [`EventSender`]. The server drives outputs through
//! the [`BackendOutput`] trait and never touches hardware directly.

pub mod headless;
pub mod input;

use crate::error::BackendError;
use crate::event::EventSender;
use crate::geometry::Size;
use crate::scene::Frame;

pub use input::{DeviceId, InputDevice, InputEvent};

/// Identifier assigned by the backend to an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u64);

/// A display mode advertised by an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub width: i32,
    pub height: i32,
    /// Refresh rate in mHz (0 = unspecified)
    pub refresh_mhz: i32,
    pub preferred: bool,
}

impl Mode {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Mode part of a pending output state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest {
    /// One of the output's advertised modes
    Mode(Mode),
    /// Arbitrary mode. Nested outputs always honour it, hardware outputs
    /// only when the timing can be synthesized.
    Custom {
        width: i32,
        height: i32,
        refresh_mhz: i32,
    },
}

impl ModeRequest {
    pub fn size(&self) -> Size {
        match *self {
            ModeRequest::Mode(mode) => mode.size(),
            ModeRequest::Custom { width, height, .. } => Size::new(width, height),
        }
    }
}

/// Pending output state. Unset fields keep their current value on commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputState {
    pub enabled: Option<bool>,
    pub mode: Option<ModeRequest>,
    pub scale: Option<f64>,
}

impl OutputState {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: ModeRequest) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }
}

/// A backend output as seen by the server.
pub trait BackendOutput: Send {
    fn name(&self) -> &str;

    /// True when the output is a window inside another compositor
    fn is_nested(&self) -> bool;

    fn modes(&self) -> Vec<Mode>;

    fn preferred_mode(&self) -> Option<Mode> {
        self.modes().into_iter().find(|mode| mode.preferred)
    }

    fn init_render(&mut self) -> Result<(), BackendError>;

    /// Check whether a state would be accepted without applying it.
    fn test_state(&self, state: &OutputState) -> bool;

    /// Atomically apply a state. Returns false and leaves the output
    /// untouched when the state is rejected.
    fn commit_state(&mut self, state: &OutputState) -> bool;

    fn is_enabled(&self) -> bool;

    /// Snapshot of the committed state, with every field set. Committing it
    /// again restores the output.
    fn current_state(&self) -> OutputState;

    /// Effective resolution of the current mode
    fn current_size(&self) -> Option<Size>;

    fn scale(&self) -> f64 {
        1.0
    }

    /// Nested outputs only: request fullscreen from the host compositor.
    fn set_fullscreen(&mut self, _fullscreen: bool) {}

    /// Nested outputs only: title of the host window.
    fn set_title(&mut self, _title: &str) {}

    /// Render and present a frame. Returns false when nothing was shown.
    fn present(&mut self, frame: &Frame) -> bool;
}

/// A display/session backend.
pub trait Backend {
    /// Start producing events. Outputs and devices present at startup are
    /// announced through `events` before this returns.
    fn start(&mut self, events: EventSender) -> Result<(), BackendError>;

    /// True when a session with virtual terminals is available
    fn is_multi_session(&self) -> bool;

    /// Switch to a virtual terminal. Returns false when unsupported.
    fn change_vt(&mut self, vt: u32) -> bool;

    /// Check that a set of pending output states can be presented together.
    fn prepare_swapchains(&mut self, states: &[(OutputId, OutputState)]) -> bool;
}

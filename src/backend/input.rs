//! Input devices and the raw events they produce.

use std::fmt;

use log::warn;
use xkbcommon::xkb::{self, keysyms};

/// Identifier assigned by the backend to an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u64);

/// A keysym value as produced by the keymap.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keysym(pub u32);

impl Keysym {
    pub const ESCAPE: Keysym = Keysym(keysyms::KEY_Escape);

    /// Virtual terminal number for the XF86Switch_VT_1..12 keysyms.
    pub fn vt_number(self) -> Option<u32> {
        if (keysyms::KEY_XF86Switch_VT_1..=keysyms::KEY_XF86Switch_VT_12).contains(&self.0) {
            Some(self.0 - keysyms::KEY_XF86Switch_VT_1 + 1)
        } else {
            None
        }
    }
}

impl fmt::Debug for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keysym({:#x})", self.0)
    }
}

/// A keymap in xkb text format, as printed by libxkbcommon after
/// compilation. Two keymaps are the same when their printed forms are.
///
/// The empty keymap stands for "whatever the system default is" and is
/// resolved by [`Keymap::or_system_default`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Keymap(String);

impl Keymap {
    fn context() -> xkb::Context {
        xkb::Context::new(xkb::CONTEXT_NO_FLAGS)
    }

    fn print(keymap: &xkb::Keymap) -> Self {
        Self(keymap.get_as_string(xkb::KEYMAP_FORMAT_TEXT_V1))
    }

    /// Compile a keymap from RMLVO names. Empty names fall back to the
    /// `XKB_DEFAULT_*` environment and then to libxkbcommon's defaults.
    pub fn from_names(
        rules: &str,
        model: &str,
        layout: &str,
        variant: &str,
        options: Option<String>,
    ) -> Option<Self> {
        let context = Self::context();
        let keymap = xkb::Keymap::new_from_names(
            &context,
            rules,
            model,
            layout,
            variant,
            options,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )?;
        Some(Self::print(&keymap))
    }

    /// Compile a keymap handed over by a backend or a virtual keyboard.
    pub fn from_string(text: &str) -> Option<Self> {
        let context = Self::context();
        let keymap = xkb::Keymap::new_from_string(
            &context,
            text.to_owned(),
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )?;
        Some(Self::print(&keymap))
    }

    /// The system default keymap, used for keyboards that bring none.
    pub fn system_default() -> Option<Self> {
        Self::from_names("", "", "", "", None)
    }

    pub fn or_system_default(self) -> Self {
        if !self.is_empty() {
            return self;
        }
        Self::system_default().unwrap_or_else(|| {
            warn!("Failed to compile the default keymap");
            self
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compile for state tracking.
    pub fn compile(&self) -> Option<xkb::Keymap> {
        if self.is_empty() {
            return None;
        }
        xkb::Keymap::new_from_string(
            &Self::context(),
            self.0.clone(),
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
    }

    /// Mask of a named modifier such as [`xkb::MOD_NAME_ALT`].
    pub fn mod_mask(&self, name: &str) -> Option<u32> {
        let keymap = self.compile()?;
        let index = keymap.mod_get_index(name);
        (index != xkb::MOD_INVALID).then(|| 1 << index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatInfo {
    /// Keys per second
    pub rate: i32,
    /// Milliseconds before repeating starts
    pub delay: i32,
}

impl Default for RepeatInfo {
    fn default() -> Self {
        Self {
            rate: 25,
            delay: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyboardInfo {
    pub keymap: Keymap,
    pub repeat: RepeatInfo,
    /// Created through the virtual keyboard protocol rather than by hardware
    pub is_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceKind {
    Keyboard(KeyboardInfo),
    Pointer,
    Touch,
    Tablet,
    Switch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    pub id: DeviceId,
    pub name: String,
    pub kind: DeviceKind,
    /// Output this device should be confined to, if any
    pub output_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Released,
    Pressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Released,
    Pressed,
}

/// Serialized xkb modifier state, as sent in `wl_keyboard.modifiers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub depressed: u32,
    pub latched: u32,
    pub locked: u32,
    pub group: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub time_msec: u32,
    pub keycode: u32,
    pub state: KeyState,
    /// Keysyms the keycode translates to under the current keymap state
    pub keysyms: Vec<Keysym>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSource {
    Wheel,
    Finger,
    Continuous,
    WheelTilt,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisEvent {
    pub time_msec: u32,
    pub orientation: AxisOrientation,
    pub delta: f64,
    pub delta_discrete: i32,
    pub source: AxisSource,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Motion {
        time_msec: u32,
        dx: f64,
        dy: f64,
    },
    /// Absolute motion, normalized to 0..1 over the mapped region
    MotionAbsolute {
        time_msec: u32,
        x: f64,
        y: f64,
    },
    Button {
        time_msec: u32,
        button: u32,
        state: ButtonState,
    },
    Axis(AxisEvent),
    Frame,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    /// Coordinates are normalized to 0..1 over the mapped region
    Down {
        time_msec: u32,
        touch_id: i32,
        x: f64,
        y: f64,
    },
    Up {
        time_msec: u32,
        touch_id: i32,
    },
    Motion {
        time_msec: u32,
        touch_id: i32,
        x: f64,
        y: f64,
    },
    Frame,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key {
        device: DeviceId,
        event: KeyEvent,
    },
    Modifiers {
        device: DeviceId,
        modifiers: Modifiers,
    },
    Pointer {
        device: DeviceId,
        event: PointerEvent,
    },
    Touch {
        device: DeviceId,
        event: TouchEvent,
    },
}

impl InputEvent {
    pub fn device(&self) -> DeviceId {
        match self {
            InputEvent::Key { device, .. }
            | InputEvent::Modifiers { device, .. }
            | InputEvent::Pointer { device, .. }
            | InputEvent::Touch { device, .. } => *device,
        }
    }
}

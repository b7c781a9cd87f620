//! Keyboard groups and compositor keybindings.
//!
//! Physical keyboards with the same keymap share one group, so holding a key
//! on one keyboard and pressing a modifier on another behaves like a single
//! keyboard. Virtual keyboards always get a group of their own.

use std::collections::BTreeMap;
use std::fmt;

use log::warn;
use xkbcommon::xkb;

use crate::backend::input::{
    DeviceId, KeyState, KeyboardInfo, Keymap, Keysym, Modifiers, RepeatInfo,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u64);

pub struct KeyboardGroup {
    pub id: GroupId,
    pub is_virtual: bool,
    pub keymap: Keymap,
    pub repeat: RepeatInfo,
    devices: Vec<DeviceId>,
    /// Keycode -> number of member keyboards holding it down
    pressed: BTreeMap<u32, u32>,
    modifiers: Modifiers,
    /// None when the keymap failed to compile
    xkb_state: Option<xkb::State>,
}

impl fmt::Debug for KeyboardGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardGroup")
            .field("id", &self.id)
            .field("is_virtual", &self.is_virtual)
            .field("devices", &self.devices)
            .field("modifiers", &self.modifiers)
            .field("xkb_state", &self.xkb_state.is_some())
            .finish()
    }
}

impl KeyboardGroup {
    /// `info.keymap` is expected to be resolved already, see
    /// [`Keymap::or_system_default`].
    pub fn new(id: GroupId, device: DeviceId, info: &KeyboardInfo) -> Self {
        let xkb_state = info.keymap.compile().map(|keymap| xkb::State::new(&keymap));
        if xkb_state.is_none() {
            warn!("Keyboard group {:?} has no usable keymap, bindings are disabled", id);
        }
        Self {
            id,
            is_virtual: info.is_virtual,
            keymap: info.keymap.clone(),
            repeat: info.repeat,
            devices: vec![device],
            pressed: BTreeMap::new(),
            modifiers: Modifiers::default(),
            xkb_state,
        }
    }

    /// Join a keyboard to this group if its compiled keymap matches.
    pub fn try_add(&mut self, device: DeviceId, info: &KeyboardInfo) -> bool {
        if self.is_virtual || info.is_virtual || self.keymap != info.keymap {
            return false;
        }
        if !self.devices.contains(&device) {
            self.devices.push(device);
        }
        true
    }

    /// Remove a keyboard. Returns true when the group is now empty.
    pub fn remove(&mut self, device: DeviceId) -> bool {
        self.devices.retain(|d| *d != device);
        self.devices.is_empty()
    }

    pub fn contains(&self, device: DeviceId) -> bool {
        self.devices.contains(&device)
    }

    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    /// Track a key transition from one member. Returns true when the group
    /// as a whole changed state, i.e. the first press or the last release.
    pub fn update_key(&mut self, keycode: u32, state: KeyState) -> bool {
        match state {
            KeyState::Pressed => {
                let count = self.pressed.entry(keycode).or_insert(0);
                *count += 1;
                *count == 1
            }
            KeyState::Released => match self.pressed.get_mut(&keycode) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    self.pressed.remove(&keycode);
                    true
                }
                None => false,
            },
        }
    }

    pub fn pressed_keycodes(&self) -> Vec<u32> {
        self.pressed.keys().copied().collect()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
        if let Some(state) = self.xkb_state.as_mut() {
            state.update_mask(
                modifiers.depressed,
                modifiers.latched,
                modifiers.locked,
                0,
                0,
                modifiers.group,
            );
        }
    }

    /// True when Alt is in effect, whether held, latched or locked.
    pub fn alt_active(&self) -> bool {
        self.xkb_state.as_ref().map_or(false, |state| {
            state.mod_name_is_active(&xkb::MOD_NAME_ALT, xkb::STATE_MODS_EFFECTIVE)
        })
    }
}

/// Action bound to a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Terminate,
    SwitchVt(u32),
}

/// Look up the action for a keysym pressed with Alt held.
pub fn keybinding_for(keysym: Keysym, allow_vt_switch: bool) -> Option<KeyAction> {
    if keysym == Keysym::ESCAPE {
        return Some(KeyAction::Terminate);
    }
    match keysym.vt_number() {
        Some(vt) if allow_vt_switch => Some(KeyAction::SwitchVt(vt)),
        _ => None,
    }
}

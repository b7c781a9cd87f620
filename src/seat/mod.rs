//! The seat: input devices, keyboard focus and input delivery
//!
//! Input flows from the backend into [`GameframeServer::handle_input`], gets
//! a chance to trigger a compositor keybinding, and is then forwarded to
//! the focused client through the seat protocol. Keyboard focus follows the
//! pointer and touch: any press (and any pointer motion) over a view that is
//! not a dialog of the focused view moves focus to it.

pub mod cursor;
pub mod keyboard;

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::backend::input::{
    ButtonState, DeviceId, DeviceKind, InputDevice, InputEvent, KeyEvent, KeyState, KeyboardInfo,
    Keysym, Modifiers, PointerEvent, TouchEvent,
};
use crate::backend::OutputId;
use crate::event::{DragIconInfo, ObjectKey, Signal};
use crate::protocol::{Capabilities, ClientId, DataSourceId, DragId, SurfaceId};
use crate::scene::{NodeId, NodeOwner};
use crate::server::GameframeServer;
use crate::view::ViewId;

pub use cursor::{Cursor, CursorImage};
pub use keyboard::{keybinding_for, GroupId, KeyAction, KeyboardGroup};

pub const SEAT_NAME: &str = "seat0";

/// Icon following the cursor during drag-and-drop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragIcon {
    pub drag: DragId,
    pub node: NodeId,
    pub surface: SurfaceId,
    pub offset: (i32, i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PointerFocus {
    surface: SurfaceId,
    client: Option<ClientId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TouchPoint {
    surface: SurfaceId,
    /// Layout position of the touched surface's origin
    origin: (f64, f64),
}

#[derive(Debug, Default)]
pub struct Seat {
    pub cursor: Cursor,
    keyboard_groups: Vec<KeyboardGroup>,
    pointers: Vec<DeviceId>,
    touch_devices: Vec<DeviceId>,
    drag_icons: Vec<DragIcon>,
    next_group: u64,
    active_group: Option<GroupId>,
    keyboard_focus: Option<SurfaceId>,
    pointer_focus: Option<PointerFocus>,
    touch_points: HashMap<i32, TouchPoint>,
    /// Most recent touch point, for bookkeeping only
    pub touch_id: i32,
    pub touch_lx: f64,
    pub touch_ly: f64,
}

impl Seat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        SEAT_NAME
    }

    /// Place a keyboard in a compatible group, creating one if needed.
    pub fn add_keyboard(&mut self, device: DeviceId, info: &KeyboardInfo) -> GroupId {
        let info = &KeyboardInfo {
            keymap: info.keymap.clone().or_system_default(),
            ..info.clone()
        };
        if !info.is_virtual {
            if let Some(index) = self
                .keyboard_groups
                .iter_mut()
                .position(|g| g.try_add(device, info))
            {
                return self.keyboard_groups[index].id;
            }
        }
        self.next_group += 1;
        let id = GroupId(self.next_group);
        self.keyboard_groups
            .push(KeyboardGroup::new(id, device, info));
        id
    }

    /// Remove a keyboard; empty groups are destroyed.
    pub fn remove_keyboard(&mut self, device: DeviceId) -> bool {
        let Some(index) = self.keyboard_groups.iter().position(|g| g.contains(device)) else {
            return false;
        };
        if self.keyboard_groups[index].remove(device) {
            let group = self.keyboard_groups.remove(index);
            if self.active_group == Some(group.id) {
                self.active_group = None;
            }
        }
        true
    }

    pub fn keyboard_groups(&self) -> &[KeyboardGroup] {
        &self.keyboard_groups
    }

    fn group_for_device_mut(&mut self, device: DeviceId) -> Option<&mut KeyboardGroup> {
        self.keyboard_groups.iter_mut().find(|g| g.contains(device))
    }

    /// Keyboard whose state is sent on focus changes.
    pub fn active_keyboard(&self) -> Option<&KeyboardGroup> {
        self.active_group
            .and_then(|id| self.keyboard_groups.iter().find(|g| g.id == id))
            .or_else(|| self.keyboard_groups.first())
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            keyboard: !self.keyboard_groups.is_empty(),
            pointer: !self.pointers.is_empty(),
            touch: !self.touch_devices.is_empty(),
        }
    }

    pub fn keyboard_focus(&self) -> Option<SurfaceId> {
        self.keyboard_focus
    }

    pub fn pointer_focus(&self) -> Option<SurfaceId> {
        self.pointer_focus.map(|focus| focus.surface)
    }

    pub fn drag_icons(&self) -> &[DragIcon] {
        &self.drag_icons
    }
}

impl GameframeServer {
    pub(crate) fn handle_new_input(&mut self, device: InputDevice) {
        let key = ObjectKey::Device(device.id);
        match &device.kind {
            DeviceKind::Keyboard(info) => {
                let group = self.seat.add_keyboard(device.id, info);
                self.listeners
                    .subscribe_all(key, &[Signal::Key, Signal::Modifiers, Signal::Destroy]);
                debug!("Keyboard {} joined group {:?}", device.name, group);
            }
            DeviceKind::Pointer => {
                self.seat.pointers.push(device.id);
                self.listeners.subscribe_all(key, &[Signal::Pointer, Signal::Destroy]);
                self.map_device_by_name(&device);
            }
            DeviceKind::Touch => {
                self.seat.touch_devices.push(device.id);
                self.listeners.subscribe_all(key, &[Signal::Touch, Signal::Destroy]);
                self.map_device_by_name(&device);
            }
            DeviceKind::Tablet | DeviceKind::Switch => {
                debug!("Ignoring unsupported input device {}", device.name);
                return;
            }
        }
        info!("New input device {} ({:?})", device.name, device.id);
        self.seat_update_capabilities();
    }

    /// Virtual pointers may ask to be pinned to an output.
    pub(crate) fn handle_new_virtual_pointer(
        &mut self,
        device: InputDevice,
        suggested_output: Option<OutputId>,
    ) {
        let id = device.id;
        self.handle_new_input(device);
        if let Some(output) = suggested_output {
            if self.output(output).is_some() {
                self.seat.cursor.map_to_output(id, output);
            }
        }
    }

    fn map_device_by_name(&mut self, device: &InputDevice) {
        let Some(name) = device.output_name.as_deref() else {
            return;
        };
        match self.outputs.iter().find(|o| o.name() == name) {
            Some(output) => {
                debug!("Mapping {} to output {}", device.name, name);
                self.seat.cursor.map_to_output(device.id, output.id);
            }
            None => warn!("Output {} for device {} not found", name, device.name),
        }
    }

    pub(crate) fn handle_input_destroyed(&mut self, device: DeviceId) {
        let key = ObjectKey::Device(device);
        if !self.listeners.accepts(key, Signal::Destroy) {
            return;
        }
        self.listeners.release(key);
        self.seat.remove_keyboard(device);
        self.seat.pointers.retain(|d| *d != device);
        self.seat.touch_devices.retain(|d| *d != device);
        self.seat.cursor.detach_device(device);
        self.seat_update_capabilities();
    }

    /// Advertise capabilities; the cursor is only shown with a pointer.
    pub fn seat_update_capabilities(&mut self) {
        let capabilities = self.seat.capabilities();
        self.collaborators.seat.set_capabilities(capabilities);
        if capabilities.pointer {
            self.seat.cursor.set_default_image();
        } else {
            self.seat.cursor.unset_image();
        }
    }

    pub(crate) fn handle_input(&mut self, event: InputEvent) {
        let device = event.device();
        let signal = match &event {
            InputEvent::Key { .. } => Signal::Key,
            InputEvent::Modifiers { .. } => Signal::Modifiers,
            InputEvent::Pointer { .. } => Signal::Pointer,
            InputEvent::Touch { .. } => Signal::Touch,
        };
        if !self.listeners.accepts(ObjectKey::Device(device), signal) {
            return;
        }

        match event {
            InputEvent::Key { device, event } => self.handle_keyboard_key(device, event),
            InputEvent::Modifiers { device, modifiers } => {
                self.handle_keyboard_modifiers(device, modifiers)
            }
            InputEvent::Pointer { device, event } => self.handle_pointer(device, event),
            InputEvent::Touch { device, event } => self.handle_touch(device, event),
        }
    }

    fn handle_keyboard_key(&mut self, device: DeviceId, event: KeyEvent) {
        let Some(group) = self.seat.group_for_device_mut(device) else {
            return;
        };
        if !group.update_key(event.keycode, event.state) {
            return;
        }
        let group_id = group.id;
        let alt = group.alt_active();

        let mut handled = false;
        if alt && event.state == KeyState::Pressed {
            for keysym in &event.keysyms {
                handled |= self.handle_keybinding(*keysym);
            }
        }

        if !handled {
            self.seat.active_group = Some(group_id);
            self.collaborators
                .seat
                .keyboard_key(event.time_msec, event.keycode, event.state);
        }

        self.notify_activity();
    }

    fn handle_keyboard_modifiers(&mut self, device: DeviceId, modifiers: Modifiers) {
        let Some(group) = self.seat.group_for_device_mut(device) else {
            return;
        };
        group.set_modifiers(modifiers);
        let group_id = group.id;
        self.seat.active_group = Some(group_id);
        self.collaborators.seat.keyboard_modifiers(modifiers);
        self.notify_activity();
    }

    /// Run the compositor binding for `keysym`, if any. Returns true when the
    /// key was consumed.
    fn handle_keybinding(&mut self, keysym: Keysym) -> bool {
        match keybinding_for(keysym, self.config.general.allow_vt_switch) {
            Some(KeyAction::Terminate) => {
                info!("Alt+Escape pressed, shutting down");
                self.terminate();
                true
            }
            Some(KeyAction::SwitchVt(vt)) => {
                if self.backend.is_multi_session() {
                    if !self.backend.change_vt(vt) {
                        warn!("Failed to switch to VT {}", vt);
                    }
                } else {
                    debug!("No session to switch VT {} with", vt);
                }
                self.notify_activity();
                true
            }
            None => false,
        }
    }

    fn handle_pointer(&mut self, device: DeviceId, event: PointerEvent) {
        match event {
            PointerEvent::Motion { time_msec, dx, dy } => {
                self.seat.cursor.move_by(device, dx, dy, &self.layout);
                self.process_cursor_motion(time_msec);
                self.notify_activity();
            }
            PointerEvent::MotionAbsolute { time_msec, x, y } => {
                self.seat.cursor.warp_absolute(device, x, y, &self.layout);
                self.process_cursor_motion(time_msec);
                self.notify_activity();
            }
            PointerEvent::Button {
                time_msec,
                button,
                state,
            } => {
                self.collaborators.seat.pointer_button(time_msec, button, state);
                if state == ButtonState::Pressed {
                    let (x, y) = self.seat.cursor.position();
                    self.focus_view_at(x, y);
                }
                self.notify_activity();
            }
            PointerEvent::Axis(axis) => {
                self.collaborators.seat.pointer_axis(&axis);
                self.notify_activity();
            }
            PointerEvent::Frame => self.collaborators.seat.pointer_frame(),
        }
    }

    /// Update pointer focus, drag icons and keyboard focus after the cursor
    /// moved.
    fn process_cursor_motion(&mut self, time_msec: u32) {
        let (x, y) = self.seat.cursor.position();
        self.update_drag_icons();

        match self.scene.node_at(x, y) {
            Some(hit) => match hit.surface {
                Some(surface) => {
                    let same = self.seat.pointer_focus.map(|f| f.surface) == Some(surface);
                    if same {
                        self.collaborators.seat.pointer_motion(time_msec, hit.sx, hit.sy);
                    } else {
                        let client = self
                            .scene
                            .owning_view(hit.node)
                            .and_then(|view| self.views.get(view))
                            .and_then(|view| view.client());
                        self.seat.pointer_focus = Some(PointerFocus { surface, client });
                        self.collaborators.seat.pointer_enter(surface, hit.sx, hit.sy);
                    }
                }
                None => self.clear_pointer_focus(),
            },
            None => self.clear_pointer_focus(),
        }

        self.focus_view_at(x, y);
    }

    fn clear_pointer_focus(&mut self) {
        if self.seat.pointer_focus.take().is_some() {
            self.collaborators.seat.pointer_clear_focus();
        }
    }

    fn handle_touch(&mut self, device: DeviceId, event: TouchEvent) {
        match event {
            TouchEvent::Down {
                time_msec,
                touch_id,
                x,
                y,
            } => {
                let (lx, ly) = self.seat.cursor.absolute_to_layout(device, x, y, &self.layout);
                self.seat.touch_id = touch_id;
                self.seat.touch_lx = lx;
                self.seat.touch_ly = ly;

                if let Some(hit) = self.scene.node_at(lx, ly) {
                    if let Some(surface) = hit.surface {
                        let origin = (lx - hit.sx, ly - hit.sy);
                        self.seat
                            .touch_points
                            .insert(touch_id, TouchPoint { surface, origin });
                        self.collaborators
                            .seat
                            .touch_down(time_msec, touch_id, surface, hit.sx, hit.sy);
                    }
                }
                self.focus_view_at(lx, ly);
                self.notify_activity();
            }
            TouchEvent::Up {
                time_msec,
                touch_id,
            } => {
                if self.seat.touch_points.remove(&touch_id).is_some() {
                    self.collaborators.seat.touch_up(time_msec, touch_id);
                }
                self.notify_activity();
            }
            TouchEvent::Motion {
                time_msec,
                touch_id,
                x,
                y,
            } => {
                let (lx, ly) = self.seat.cursor.absolute_to_layout(device, x, y, &self.layout);
                if touch_id == self.seat.touch_id {
                    self.seat.touch_lx = lx;
                    self.seat.touch_ly = ly;
                }
                if let Some(point) = self.seat.touch_points.get(&touch_id) {
                    let (sx, sy) = (lx - point.origin.0, ly - point.origin.1);
                    self.collaborators
                        .seat
                        .touch_motion(time_msec, touch_id, sx, sy);
                }
                self.notify_activity();
            }
            TouchEvent::Frame => self.collaborators.seat.touch_frame(),
        }
    }

    /// View holding keyboard focus.
    pub fn seat_get_focus(&self) -> Option<ViewId> {
        self.seat
            .keyboard_focus
            .and_then(|surface| self.views.find_by_surface(surface))
    }

    /// Give a mapped view keyboard focus. Only one view is activated at a
    /// time.
    pub fn seat_set_focus(&mut self, id: ViewId) {
        let Some(surface) = self.views.get(id).and_then(|view| view.surface) else {
            debug!("Not focusing unmapped view {:?}", id);
            return;
        };

        if let Some(previous) = self.seat_get_focus() {
            if previous != id {
                self.view_activate(previous, false);
            }
        }

        self.seat.keyboard_focus = Some(surface);
        if let Some(keyboard) = self.seat.active_keyboard() {
            let pressed = keyboard.pressed_keycodes();
            let modifiers = keyboard.modifiers();
            self.collaborators
                .seat
                .keyboard_enter(surface, &pressed, modifiers);
        }

        self.view_activate(id, true);
        debug!("Focused view {:?}", id);
    }

    pub(crate) fn seat_clear_focus(&mut self) {
        if self.seat.keyboard_focus.take().is_some() {
            self.collaborators.seat.keyboard_clear_focus();
        }
    }

    /// Focus the view under a point unless it is a dialog of the current
    /// focus.
    pub fn focus_view_at(&mut self, lx: f64, ly: f64) {
        let Some(view) = self.view_at(lx, ly) else {
            return;
        };
        let current = self.seat_get_focus();
        if current == Some(view) {
            return;
        }
        let transient = current.map_or(false, |current| self.views.is_transient_for(view, current));
        if !transient {
            self.seat_set_focus(view);
        }
    }

    pub(crate) fn handle_request_set_cursor(
        &mut self,
        client: ClientId,
        surface: Option<SurfaceId>,
        hotspot: (i32, i32),
    ) {
        let focused_client = self.seat.pointer_focus.and_then(|focus| focus.client);
        if focused_client == Some(client) {
            self.seat.cursor.set_surface(surface, hotspot);
        } else {
            debug!("Ignoring cursor request from unfocused client {:?}", client);
        }
    }

    pub(crate) fn handle_request_set_selection(&mut self, source: Option<DataSourceId>, serial: u32) {
        self.collaborators.seat.set_selection(source, serial);
    }

    pub(crate) fn handle_request_set_primary_selection(
        &mut self,
        source: Option<DataSourceId>,
        serial: u32,
    ) {
        self.collaborators.seat.set_primary_selection(source, serial);
    }

    pub(crate) fn handle_request_start_drag(&mut self, drag: DragId, serial: u32) {
        self.collaborators.seat.start_drag(drag, serial);
    }

    pub(crate) fn handle_start_drag(&mut self, drag: DragId, icon: Option<DragIconInfo>) {
        let Some(icon) = icon else {
            return;
        };
        let node = self.scene.create_node(None, NodeOwner::DragIcon(drag));
        self.scene.set_surface(node, Some(icon.surface));
        self.scene.set_size(node, icon.size);
        self.scene.set_enabled(node, true);
        self.seat.drag_icons.push(DragIcon {
            drag,
            node,
            surface: icon.surface,
            offset: icon.offset,
        });
        self.listeners.subscribe(ObjectKey::DragIcon(drag), Signal::Destroy);
        self.update_drag_icons();
    }

    pub(crate) fn handle_drag_icon_destroyed(&mut self, drag: DragId) {
        if !self.listeners.accepts(ObjectKey::DragIcon(drag), Signal::Destroy) {
            return;
        }
        self.listeners.release(ObjectKey::DragIcon(drag));
        let removed: Vec<DragIcon> = self
            .seat
            .drag_icons
            .iter()
            .filter(|icon| icon.drag == drag)
            .copied()
            .collect();
        self.seat.drag_icons.retain(|icon| icon.drag != drag);
        for icon in removed {
            self.scene.destroy(icon.node);
        }
    }

    /// Icons sit at the cursor plus their offset.
    fn update_drag_icons(&mut self) {
        let (x, y) = self.seat.cursor.position();
        for icon in &self.seat.drag_icons {
            self.scene.set_position(
                icon.node,
                x as i32 + icon.offset.0,
                y as i32 + icon.offset.1,
            );
        }
    }
}

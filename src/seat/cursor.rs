//! The seat's cursor: position, image and per-device output mapping.

use std::collections::HashMap;

use log::debug;

use crate::backend::input::DeviceId;
use crate::backend::OutputId;
use crate::geometry::Rectangle;
use crate::output::OutputLayout;
use crate::protocol::SurfaceId;

pub const DEFAULT_CURSOR: &str = "default";
pub const XCURSOR_SIZE: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorImage {
    Hidden,
    Named(String),
    Surface {
        surface: SurfaceId,
        hotspot: (i32, i32),
    },
}

#[derive(Debug)]
pub struct Cursor {
    x: f64,
    y: f64,
    image: CursorImage,
    mapped: HashMap<DeviceId, OutputId>,
    /// Scales the cursor theme has been loaded at
    theme_scales: Vec<f64>,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            image: CursorImage::Hidden,
            mapped: HashMap::new(),
            theme_scales: Vec::new(),
        }
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn image(&self) -> &CursorImage {
        &self.image
    }

    pub fn set_default_image(&mut self) {
        self.image = CursorImage::Named(DEFAULT_CURSOR.into());
    }

    pub fn unset_image(&mut self) {
        self.image = CursorImage::Hidden;
    }

    /// Show a client-provided surface, or hide the cursor for `None`.
    pub fn set_surface(&mut self, surface: Option<SurfaceId>, hotspot: (i32, i32)) {
        self.image = match surface {
            Some(surface) => CursorImage::Surface { surface, hotspot },
            None => CursorImage::Hidden,
        };
    }

    /// Load the cursor theme for an output scale. Each scale loads once.
    pub fn load_theme(&mut self, scale: f64) -> bool {
        if !(scale.is_finite() && scale > 0.0) {
            return false;
        }
        if !self.theme_scales.iter().any(|s| (*s - scale).abs() < f64::EPSILON) {
            debug!("Loading cursor theme at size {} scale {}", XCURSOR_SIZE, scale);
            self.theme_scales.push(scale);
        }
        true
    }

    pub fn loaded_scales(&self) -> &[f64] {
        &self.theme_scales
    }

    pub fn map_to_output(&mut self, device: DeviceId, output: OutputId) {
        self.mapped.insert(device, output);
    }

    pub fn mapped_output(&self, device: DeviceId) -> Option<OutputId> {
        self.mapped.get(&device).copied()
    }

    pub fn detach_device(&mut self, device: DeviceId) {
        self.mapped.remove(&device);
    }

    /// Forget mappings to an output that went away.
    pub fn unmap_output(&mut self, output: OutputId) {
        self.mapped.retain(|_, mapped| *mapped != output);
    }

    /// Area a device may move the cursor in: its mapped output if that is
    /// still in the layout, else the whole layout.
    fn region(&self, device: Option<DeviceId>, layout: &OutputLayout) -> Rectangle {
        device
            .and_then(|d| self.mapped_output(d))
            .map(|output| layout.get_box(Some(output)))
            .filter(|area| !area.is_empty())
            .unwrap_or_else(|| layout.get_box(None))
    }

    /// Relative motion, clamped to the device's region.
    pub fn move_by(&mut self, device: DeviceId, dx: f64, dy: f64, layout: &OutputLayout) {
        let area = self.region(Some(device), layout);
        if area.is_empty() {
            return;
        }
        let (x, y) = (self.x + dx, self.y + dy);
        let (x, y) = if self.mapped_output(device).is_some() {
            area.closest_point(x, y)
        } else {
            layout.closest_point(x, y)
        };
        self.x = x;
        self.y = y;
    }

    /// Convert normalized device coordinates to layout coordinates.
    pub fn absolute_to_layout(
        &self,
        device: DeviceId,
        x: f64,
        y: f64,
        layout: &OutputLayout,
    ) -> (f64, f64) {
        let area = self.region(Some(device), layout);
        (
            f64::from(area.x) + x * f64::from(area.width),
            f64::from(area.y) + y * f64::from(area.height),
        )
    }

    /// Absolute motion from a device reporting normalized coordinates.
    pub fn warp_absolute(&mut self, device: DeviceId, x: f64, y: f64, layout: &OutputLayout) {
        if layout.is_empty() {
            return;
        }
        let (lx, ly) = self.absolute_to_layout(device, x, y, layout);
        let (lx, ly) = layout.closest_point(lx, ly);
        self.x = lx;
        self.y = ly;
    }

    /// Move to the centre of the layout.
    pub fn center(&mut self, layout: &OutputLayout) {
        let area = layout.get_box(None);
        if area.is_empty() {
            return;
        }
        let (x, y) = area.center();
        self.x = x;
        self.y = y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    fn two_outputs() -> OutputLayout {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), Size::new(1000, 500));
        layout.add_auto(OutputId(2), Size::new(800, 600));
        layout
    }

    #[test]
    fn motion_is_confined_to_the_layout() {
        let layout = two_outputs();
        let mut cursor = Cursor::new();

        cursor.move_by(DeviceId(1), 5000.0, 5000.0, &layout);
        let (x, y) = cursor.position();
        assert!(layout.get_box(None).contains(x, y));
        assert!(layout.output_at(x, y).is_some());
    }

    #[test]
    fn mapped_devices_stay_on_their_output() {
        let layout = two_outputs();
        let mut cursor = Cursor::new();
        cursor.map_to_output(DeviceId(1), OutputId(2));

        cursor.warp_absolute(DeviceId(1), 0.5, 0.5, &layout);
        assert_eq!(cursor.position(), (1400.0, 300.0));

        cursor.move_by(DeviceId(1), -5000.0, 0.0, &layout);
        assert_eq!(layout.output_at(cursor.position().0, cursor.position().1), Some(OutputId(2)));

        cursor.unmap_output(OutputId(2));
        assert_eq!(cursor.mapped_output(DeviceId(1)), None);
    }

    #[test]
    fn center_uses_the_layout_box() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), Size::new(1280, 720));
        let mut cursor = Cursor::new();

        cursor.center(&layout);
        assert_eq!(cursor.position(), (640.0, 360.0));
    }

    #[test]
    fn theme_loads_once_per_scale() {
        let mut cursor = Cursor::new();
        assert!(cursor.load_theme(1.0));
        assert!(cursor.load_theme(1.0));
        assert!(cursor.load_theme(2.0));
        assert!(!cursor.load_theme(0.0));
        assert_eq!(cursor.loaded_scales(), &[1.0, 2.0]);
    }

    #[test]
    fn client_surface_replaces_named_image() {
        let mut cursor = Cursor::new();
        cursor.set_default_image();
        assert_eq!(cursor.image(), &CursorImage::Named(DEFAULT_CURSOR.into()));

        cursor.set_surface(Some(SurfaceId(4)), (2, 3));
        assert_eq!(
            cursor.image(),
            &CursorImage::Surface {
                surface: SurfaceId(4),
                hotspot: (2, 3)
            }
        );

        cursor.set_surface(None, (0, 0));
        assert_eq!(cursor.image(), &CursorImage::Hidden);
    }
}

//! Output layout: where each active output sits in layout coordinates.
//!
//! Automatically placed outputs are laid out left to right, in the order
//! they were added, to the right of any manually placed output.

use crate::backend::OutputId;
use crate::geometry::{Rectangle, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOutput {
    pub output: OutputId,
    pub x: i32,
    pub y: i32,
    pub size: Size,
    /// Placed automatically rather than at a fixed position
    pub auto: bool,
}

impl LayoutOutput {
    pub fn geometry(&self) -> Rectangle {
        Rectangle::from_loc_and_size((self.x, self.y), self.size)
    }
}

#[derive(Debug, Default, Clone)]
pub struct OutputLayout {
    outputs: Vec<LayoutOutput>,
}

impl OutputLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output (or re-place an existing one) automatically.
    pub fn add_auto(&mut self, output: OutputId, size: Size) {
        match self.outputs.iter_mut().find(|o| o.output == output) {
            Some(existing) => {
                existing.size = size;
                existing.auto = true;
            }
            None => self.outputs.push(LayoutOutput {
                output,
                x: 0,
                y: 0,
                size,
                auto: true,
            }),
        }
        self.arrange();
    }

    /// Add an output (or move an existing one) to a fixed position.
    pub fn add(&mut self, output: OutputId, x: i32, y: i32, size: Size) {
        match self.outputs.iter_mut().find(|o| o.output == output) {
            Some(existing) => {
                existing.x = x;
                existing.y = y;
                existing.size = size;
                existing.auto = false;
            }
            None => self.outputs.push(LayoutOutput {
                output,
                x,
                y,
                size,
                auto: false,
            }),
        }
        self.arrange();
    }

    pub fn remove(&mut self, output: OutputId) -> bool {
        let before = self.outputs.len();
        self.outputs.retain(|o| o.output != output);
        let removed = self.outputs.len() != before;
        if removed {
            self.arrange();
        }
        removed
    }

    /// Update the size of an output after a mode change.
    pub fn set_size(&mut self, output: OutputId, size: Size) -> bool {
        let Some(existing) = self.outputs.iter_mut().find(|o| o.output == output) else {
            return false;
        };
        if existing.size == size {
            return false;
        }
        existing.size = size;
        self.arrange();
        true
    }

    pub fn contains(&self, output: OutputId) -> bool {
        self.outputs.iter().any(|o| o.output == output)
    }

    pub fn get(&self, output: OutputId) -> Option<&LayoutOutput> {
        self.outputs.iter().find(|o| o.output == output)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &LayoutOutput> {
        self.outputs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Box of one output, or the union of all outputs for `None`.
    /// Unknown outputs and an empty layout give an empty box.
    pub fn get_box(&self, output: Option<OutputId>) -> Rectangle {
        match output {
            Some(id) => self.get(id).map(|o| o.geometry()).unwrap_or_default(),
            None => self
                .outputs
                .iter()
                .fold(Rectangle::default(), |acc, o| acc.merge(&o.geometry())),
        }
    }

    pub fn output_at(&self, x: f64, y: f64) -> Option<OutputId> {
        self.outputs
            .iter()
            .find(|o| o.geometry().contains(x, y))
            .map(|o| o.output)
    }

    /// Closest point inside any output.
    pub fn closest_point(&self, x: f64, y: f64) -> (f64, f64) {
        self.outputs
            .iter()
            .map(|o| o.geometry().closest_point(x, y))
            .min_by(|a, b| {
                let da = (a.0 - x).powi(2) + (a.1 - y).powi(2);
                let db = (b.0 - x).powi(2) + (b.1 - y).powi(2);
                da.total_cmp(&db)
            })
            .unwrap_or((x, y))
    }

    fn arrange(&mut self) {
        let mut next_x = self
            .outputs
            .iter()
            .filter(|o| !o.auto)
            .map(|o| o.x + o.size.width)
            .max()
            .unwrap_or(0);

        for output in self.outputs.iter_mut().filter(|o| o.auto) {
            output.x = next_x;
            output.y = 0;
            next_x += output.size.width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_outputs_are_placed_left_to_right() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), Size::new(1920, 1080));
        layout.add_auto(OutputId(2), Size::new(1280, 720));

        assert_eq!(layout.get_box(Some(OutputId(1))), Rectangle::new(0, 0, 1920, 1080));
        assert_eq!(layout.get_box(Some(OutputId(2))), Rectangle::new(1920, 0, 1280, 720));
        assert_eq!(layout.get_box(None), Rectangle::new(0, 0, 3200, 1080));
    }

    #[test]
    fn removal_closes_the_gap() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), Size::new(1920, 1080));
        layout.add_auto(OutputId(2), Size::new(1280, 720));

        assert!(layout.remove(OutputId(1)));
        assert!(!layout.remove(OutputId(1)));
        assert_eq!(layout.get_box(Some(OutputId(2))), Rectangle::new(0, 0, 1280, 720));
        assert_eq!(layout.get_box(None), Rectangle::new(0, 0, 1280, 720));
    }

    #[test]
    fn empty_layout_has_empty_box() {
        let layout = OutputLayout::new();
        assert!(layout.get_box(None).is_empty());
        assert!(layout.get_box(Some(OutputId(9))).is_empty());
        assert_eq!(layout.output_at(0.0, 0.0), None);
        assert_eq!(layout.closest_point(5.0, 6.0), (5.0, 6.0));
    }

    #[test]
    fn auto_outputs_follow_fixed_ones() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), Size::new(800, 600));
        layout.add(OutputId(2), 0, 0, Size::new(1024, 768));

        assert_eq!(layout.get_box(Some(OutputId(1))).x, 1024);
        assert_eq!(layout.output_at(1100.0, 10.0), Some(OutputId(1)));
        assert_eq!(layout.output_at(10.0, 10.0), Some(OutputId(2)));
    }

    #[test]
    fn resize_rearranges_neighbours() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), Size::new(1280, 720));
        layout.add_auto(OutputId(2), Size::new(1280, 720));

        assert!(layout.set_size(OutputId(1), Size::new(1920, 1080)));
        assert!(!layout.set_size(OutputId(1), Size::new(1920, 1080)));
        assert_eq!(layout.get_box(Some(OutputId(2))).x, 1920);
    }

    #[test]
    fn closest_point_picks_nearest_output() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), Size::new(100, 100));
        layout.add_auto(OutputId(2), Size::new(100, 50));

        let (x, y) = layout.closest_point(150.0, 90.0);
        assert!(layout.get_box(Some(OutputId(2))).contains(x, y) || layout.get_box(Some(OutputId(1))).contains(x, y));
        assert!(y < 100.0);
    }
}

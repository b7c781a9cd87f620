//! Scene graph
//!
//! A flat arena of nodes stacked bottom to top. Each node belongs to a view,
//! a popup or a drag icon and may have a parent whose position it is
//! relative to. Hit-testing returns the topmost enabled node under a point.

use crate::backend::OutputId;
use crate::geometry::{Rectangle, Size};
use crate::protocol::{DragId, PopupId, SurfaceId};
use crate::view::ViewId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// What a node renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOwner {
    View(ViewId),
    Popup(PopupId),
    DragIcon(DragId),
}

#[derive(Debug, Clone)]
struct SceneNode {
    id: NodeId,
    owner: NodeOwner,
    parent: Option<NodeId>,
    /// Relative to the parent, or to the layout for root nodes
    position: (i32, i32),
    size: Size,
    surface: Option<SurfaceId>,
    enabled: bool,
}

/// Result of a hit-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneHit {
    pub node: NodeId,
    pub owner: NodeOwner,
    pub surface: Option<SurfaceId>,
    /// Point relative to the node origin
    pub sx: f64,
    pub sy: f64,
}

/// One visible surface in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameElement {
    pub surface: SurfaceId,
    /// Output-local placement
    pub geometry: Rectangle,
}

/// Everything an output needs to present one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub output: OutputId,
    pub region: Rectangle,
    /// Bottom to top
    pub elements: Vec<FrameElement>,
    /// Frame rate cap in frames per second (0 = unlimited)
    pub fps_cap: u32,
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node on top of the stack. Nodes start disabled.
    pub fn create_node(&mut self, parent: Option<NodeId>, owner: NodeOwner) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        let parent = parent.filter(|parent| self.contains(*parent));
        self.nodes.push(SceneNode {
            id,
            owner,
            parent,
            position: (0, 0),
            size: Size::default(),
            surface: None,
            enabled: false,
        });
        id
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.index_of(node).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Remove a node together with every descendant.
    pub fn destroy(&mut self, node: NodeId) {
        let mut doomed = vec![node];
        let mut index = 0;
        while index < doomed.len() {
            let current = doomed[index];
            doomed.extend(
                self.nodes
                    .iter()
                    .filter(|n| n.parent == Some(current))
                    .map(|n| n.id),
            );
            index += 1;
        }
        self.nodes.retain(|n| !doomed.contains(&n.id));
    }

    pub fn set_position(&mut self, node: NodeId, x: i32, y: i32) {
        if let Some(n) = self.node_mut(node) {
            n.position = (x, y);
        }
    }

    pub fn set_size(&mut self, node: NodeId, size: Size) {
        if let Some(n) = self.node_mut(node) {
            n.size = size;
        }
    }

    pub fn set_surface(&mut self, node: NodeId, surface: Option<SurfaceId>) {
        if let Some(n) = self.node_mut(node) {
            n.surface = surface;
        }
    }

    pub fn set_enabled(&mut self, node: NodeId, enabled: bool) {
        if let Some(n) = self.node_mut(node) {
            n.enabled = enabled;
        }
    }

    /// Move a node and its descendants to the top of the stack.
    pub fn raise_to_top(&mut self, node: NodeId) {
        let (mut subtree, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.nodes)
            .into_iter()
            .partition(|n| n.id == node);
        self.nodes = rest;
        let mut index = 0;
        while index < subtree.len() {
            let current = subtree[index].id;
            let (children, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.nodes)
                .into_iter()
                .partition(|n| n.parent == Some(current));
            self.nodes = rest;
            subtree.extend(children);
            index += 1;
        }
        self.nodes.extend(subtree);
    }

    /// Index in the stack, bottom first.
    pub fn stack_position(&self, node: NodeId) -> Option<usize> {
        self.index_of(node)
    }

    pub fn owner(&self, node: NodeId) -> Option<NodeOwner> {
        self.node(node).map(|n| n.owner)
    }

    pub fn is_enabled(&self, node: NodeId) -> bool {
        self.node(node).map_or(false, |n| n.enabled)
    }

    /// Layout position of a node, following parent offsets.
    pub fn absolute_position(&self, node: NodeId) -> Option<(i32, i32)> {
        let mut current = self.node(node)?;
        let (mut x, mut y) = current.position;
        let mut depth = 0;
        while let Some(parent) = current.parent.and_then(|p| self.node(p)) {
            x += parent.position.0;
            y += parent.position.1;
            current = parent;
            depth += 1;
            if depth > self.nodes.len() {
                break;
            }
        }
        Some((x, y))
    }

    /// A node is visible when it and every ancestor are enabled.
    pub fn is_visible(&self, node: NodeId) -> bool {
        let mut current = self.node(node);
        let mut depth = 0;
        while let Some(n) = current {
            if !n.enabled || depth > self.nodes.len() {
                return false;
            }
            current = n.parent.and_then(|p| self.node(p));
            depth += 1;
        }
        true
    }

    /// Topmost visible node under a layout point. Drag icons follow the
    /// cursor and never take input.
    pub fn node_at(&self, lx: f64, ly: f64) -> Option<SceneHit> {
        self.nodes.iter().rev().find_map(|n| {
            if matches!(n.owner, NodeOwner::DragIcon(_)) || !self.is_visible(n.id) {
                return None;
            }
            let (x, y) = self.absolute_position(n.id)?;
            let rect = Rectangle::from_loc_and_size((x, y), n.size);
            rect.contains(lx, ly).then(|| SceneHit {
                node: n.id,
                owner: n.owner,
                surface: n.surface,
                sx: lx - f64::from(x),
                sy: ly - f64::from(y),
            })
        })
    }

    /// Walk up from a node to the view that owns its subtree.
    pub fn owning_view(&self, node: NodeId) -> Option<ViewId> {
        let mut current = self.node(node);
        let mut depth = 0;
        while let Some(n) = current {
            if let NodeOwner::View(view) = n.owner {
                return Some(view);
            }
            if depth > self.nodes.len() {
                break;
            }
            current = n.parent.and_then(|p| self.node(p));
            depth += 1;
        }
        None
    }

    /// Visible surfaces intersecting `region`, in output-local coordinates.
    pub fn frame(&self, output: OutputId, region: Rectangle, fps_cap: u32) -> Frame {
        let elements = self
            .nodes
            .iter()
            .filter(|n| self.is_visible(n.id))
            .filter_map(|n| {
                let surface = n.surface?;
                let (x, y) = self.absolute_position(n.id)?;
                let rect = Rectangle::from_loc_and_size((x, y), n.size);
                rect.intersects(&region).then(|| FrameElement {
                    surface,
                    geometry: rect.translate(-region.x, -region.y),
                })
            })
            .collect();

        Frame {
            output,
            region,
            elements,
            fps_cap,
        }
    }

    fn index_of(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == node)
    }

    fn node(&self, node: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == node)
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|n| n.id == node)
    }
}

//! # Scene Node Tree
//!
//! Nodes live in a generational arena owned by [`SceneTree`]. Each entry keeps
//! an ordered child list and a parent id; the parent id is a plain key, so a
//! stale back-reference can never keep a node alive or dangle.
//!
//! Every frame the tree is walked twice:
//!
//! 1. **Update** (`&mut self`): depth-first, each node advances its own state
//!    and returns [`UpdateFlags`]. A node may skip its subtree or ask for a
//!    redraw.
//! 2. **Render** (`&self`): depth-first, each node appends primitives to the
//!    frame's [`PrimitiveChain`]. The shared borrow makes the tree read-only for
//!    the whole pass.
//!
//! Nodes that want their state changes confined to their subtree return `true`
//! from [`Node::brackets_children`]; the tree then wraps the node and its
//! children in `PushMatrix`/`PopMatrix`. Other nodes leak their matrix and
//! colour changes to later siblings, which saves a push/pop pair.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --attach under live tree--> Attached --first update--> Active
//!        ^                                      |                        |
//!        |                                      +-------- detach --------+
//!     (create)                                              v
//!                                                        Detached --attach--> Attached
//! ```
//!
//! `on_setup` runs once, the first time a node becomes reachable from the root.

mod capabilities;
pub mod nodes;

pub use capabilities::{Colorable, Movable, Rotatable, Scalable};
pub use nodes::{CameraNode, ClearNode, ColorNode, GroupNode, MeshNode, TouchRotateNode, TransformNode};

use crate::events::{Event, EventArg, EventType};
use crate::foundation::fixed::Fp;
use crate::input::InputEvent;
use crate::render::{Primitive, PrimitiveChain, RenderError};
use slotmap::SlotMap;
use std::any::Any;
use thiserror::Error;

slotmap::new_key_type! {
    /// Handle to a node in a [`SceneTree`]
    pub struct NodeId;
}

bitflags::bitflags! {
    /// Result of a node's update
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UpdateFlags: u8 {
        /// The node changed and the frame must be rendered
        const REDRAW = 1;
        /// Do not update this node's children this frame
        const SKIP_CHILDREN = 1 << 1;
    }
}

/// Where a node is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Created, never attached to the live tree
    Uninitialized,
    /// Reachable from the root, set up, not yet updated
    Attached,
    /// Reachable from the root and taking part in frames
    Active,
    /// Removed from the live tree after having been attached
    Detached,
}

impl NodeState {
    /// Whether the node is reachable from the root
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Attached | Self::Active)
    }
}

/// Scene errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// A node's callback failed
    #[error("Node '{name}' failed: {reason}")]
    NodeFailed {
        /// Node name
        name: String,
        /// What went wrong
        reason: String,
    },

    /// The id does not refer to a node in this tree
    #[error("Unknown node")]
    UnknownNode,

    /// A node emitted an invalid primitive sequence
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Structural edit to the tree, reported as an event on the next tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    /// `node` was attached under `parent`
    Attached {
        /// Name of the attached node
        node: String,
        /// Name of its new parent
        parent: String,
    },
    /// `node` was detached from `parent`, or destroyed
    Detached {
        /// Name of the removed node
        node: String,
        /// Name of its former parent
        parent: String,
    },
}

impl TreeChange {
    /// The event announcing this change at `time`
    #[must_use]
    pub fn into_event(self, time: f64) -> Event {
        let (event_type, node, parent) = match self {
            Self::Attached { node, parent } => (EventType::NodeAttached, node, parent),
            Self::Detached { node, parent } => (EventType::NodeDetached, node, parent),
        };
        Event::new(event_type, time)
            .with_arg("node", EventArg::Node(node))
            .with_arg("parent", EventArg::Node(parent))
    }
}

/// Per-frame data handed to [`Node::update`]
#[derive(Debug, Default)]
pub struct UpdateContext {
    frame: u64,
    elapsed_ms: u64,
    time: f64,
    current_node: String,
    events: Vec<Event>,
}

impl UpdateContext {
    /// Context for `frame`, `elapsed_ms` after the previous one, `time` seconds since start
    #[must_use]
    pub fn new(frame: u64, elapsed_ms: u64, time: f64) -> Self {
        Self {
            frame,
            elapsed_ms,
            time,
            ..Self::default()
        }
    }

    /// Frame number
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Milliseconds since the previous frame
    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Seconds since the previous frame, in fixed point
    #[must_use]
    pub fn elapsed_seconds(&self) -> Fp {
        Fp::from_f64(self.elapsed_ms as f64 / 1000.0)
    }

    /// Seconds since the scheduler started
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Name of the node being updated
    #[must_use]
    pub fn current_node(&self) -> &str {
        &self.current_node
    }

    /// Queue an event for dispatch after the update pass
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Events emitted so far
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Take the emitted events
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn enter(&mut self, name: &str) {
        self.current_node.clear();
        self.current_node.push_str(name);
    }
}

/// Downcasting support for [`Node`] trait objects
pub trait AsAny: Any {
    /// Upcast to `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Upcast to `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Scene node behaviour
///
/// Every hook has a no-op default; a node implements only what it needs.
pub trait Node: AsAny + Send {
    /// Called once, when the node first becomes reachable from the root
    fn on_setup(&mut self) -> SceneResult<()> {
        Ok(())
    }

    /// Called when the drawing surface changes size, and on attach if the size is known
    fn on_surface_changed(&mut self, _width: u32, _height: u32) {}

    /// Offered each input event; return `true` to consume it
    fn on_input(&mut self, _event: &InputEvent) -> bool {
        false
    }

    /// Advance simulation state for one frame
    ///
    /// # Errors
    ///
    /// An error aborts the frame.
    fn update(&mut self, _ctx: &mut UpdateContext) -> SceneResult<UpdateFlags> {
        Ok(UpdateFlags::empty())
    }

    /// Emit primitives before the children's
    ///
    /// # Errors
    ///
    /// An error aborts the frame.
    fn render_prefix(&self, _chain: &mut PrimitiveChain) -> SceneResult<()> {
        Ok(())
    }

    /// Emit primitives after the children's
    ///
    /// # Errors
    ///
    /// An error aborts the frame.
    fn render_postfix(&self, _chain: &mut PrimitiveChain) -> SceneResult<()> {
        Ok(())
    }

    /// Wrap this node and its subtree in a matrix push/pop pair
    fn brackets_children(&self) -> bool {
        false
    }
}

struct NodeEntry {
    name: String,
    node: Box<dyn Node>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    state: NodeState,
}

/// Arena-backed node tree with a fixed root
pub struct SceneTree {
    nodes: SlotMap<NodeId, NodeEntry>,
    root: NodeId,
    surface: Option<(u32, u32)>,
    changes: Vec<TreeChange>,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    /// Create a tree holding only an empty root group named `"root"`
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(NodeEntry {
            name: "root".to_string(),
            node: Box::new(GroupNode::new()),
            parent: None,
            children: Vec::new(),
            state: NodeState::Attached,
        });
        Self {
            nodes,
            root,
            surface: None,
            changes: Vec::new(),
        }
    }

    /// The root node
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, attached or not, including the root
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Last surface size seen
    #[must_use]
    pub const fn surface(&self) -> Option<(u32, u32)> {
        self.surface
    }

    /// Add a node to the arena without attaching it
    pub fn create(&mut self, name: impl Into<String>, node: impl Node) -> NodeId {
        self.nodes.insert(NodeEntry {
            name: name.into(),
            node: Box::new(node),
            parent: None,
            children: Vec::new(),
            state: NodeState::Uninitialized,
        })
    }

    /// Create a node and attach it as the last child of `parent`
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownNode`] if `parent` is not in the tree, or the
    /// node's `on_setup` error. On error the new node is removed again.
    pub fn insert(&mut self, parent: NodeId, name: impl Into<String>, node: impl Node) -> SceneResult<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::UnknownNode);
        }
        let id = self.create(name, node);
        if let Err(err) = self.attach(parent, id) {
            self.nodes.remove(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Attach `child` as the last child of `parent`.
    ///
    /// Returns `Ok(false)` and logs when the attach is ignored: `child` already
    /// has a parent, is the root, or is an ancestor of `parent`.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownNode`] for an unknown id, or the `on_setup` error of
    /// a node in the attached subtree (the subtree is detached again).
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> SceneResult<bool> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::UnknownNode);
        }
        let child_parent = self.nodes.get(child).ok_or(SceneError::UnknownNode)?.parent;

        if child == self.root || child_parent.is_some() {
            log::warn!("Ignoring attach of '{}': already in the tree", self.label(child));
            return Ok(false);
        }
        if self.is_ancestor(child, parent) || child == parent {
            log::warn!(
                "Ignoring attach of '{}' under '{}': would create a cycle",
                self.label(child),
                self.label(parent)
            );
            return Ok(false);
        }

        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);

        if self.nodes[parent].state.is_live() {
            if let Err(err) = self.activate(child) {
                self.unlink(child);
                self.mark_detached(child);
                return Err(err);
            }
        }
        self.record(TreeChange::Attached {
            node: self.label(child).to_string(),
            parent: self.label(parent).to_string(),
        });
        Ok(true)
    }

    /// Detach `child` from `parent`, keeping it in the arena for re-attachment.
    ///
    /// Returns `false` (a logged no-op) when `child` is not a child of `parent`.
    pub fn detach(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.nodes.get(child).and_then(|entry| entry.parent) != Some(parent) {
            log::debug!(
                "Ignoring detach of '{}': not a child of '{}'",
                self.label(child),
                self.label(parent)
            );
            return false;
        }
        self.unlink(child);
        self.mark_detached(child);
        self.record(TreeChange::Detached {
            node: self.label(child).to_string(),
            parent: self.label(parent).to_string(),
        });
        true
    }

    /// Remove a node and its whole subtree from the arena.
    ///
    /// Returns the number of nodes removed. The root cannot be destroyed.
    pub fn destroy(&mut self, id: NodeId) -> usize {
        if id == self.root {
            log::warn!("Ignoring destroy of the root node");
            return 0;
        }
        let Some(parent) = self.nodes.get(id).map(|entry| entry.parent) else {
            return 0;
        };
        if let Some(parent) = parent {
            self.record(TreeChange::Detached {
                node: self.label(id).to_string(),
                parent: self.label(parent).to_string(),
            });
        }
        self.unlink(id);
        let doomed = self.subtree(id);
        for node in &doomed {
            self.nodes.remove(*node);
        }
        doomed.len()
    }

    /// Take the structural changes made since the last call, oldest first
    pub fn take_changes(&mut self) -> Vec<TreeChange> {
        std::mem::take(&mut self.changes)
    }

    /// Whether `id` refers to a node in the arena
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Parent of `id`
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    /// Children of `id` in order (empty for an unknown id)
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|entry| entry.children.as_slice()).unwrap_or_default()
    }

    /// Name of `id`
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id).map(|entry| entry.name.as_str())
    }

    /// Lifecycle state of `id`
    #[must_use]
    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.nodes.get(id).map(|entry| entry.state)
    }

    /// Borrow a node
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&dyn Node> {
        self.nodes.get(id).map(|entry| entry.node.as_ref())
    }

    /// Borrow a node mutably
    #[must_use]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut (dyn Node + 'static)> {
        self.nodes.get_mut(id).map(|entry| entry.node.as_mut())
    }

    /// Borrow a node as its concrete type
    #[must_use]
    pub fn get_as<T: Node>(&self, id: NodeId) -> Option<&T> {
        self.get(id)?.as_any().downcast_ref::<T>()
    }

    /// Borrow a node mutably as its concrete type
    #[must_use]
    pub fn get_as_mut<T: Node>(&mut self, id: NodeId) -> Option<&mut T> {
        self.get_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Find a node below `from` by dotted path.
    ///
    /// Each segment is matched against the children of the current node first,
    /// then searched depth-first through those children in order; the first
    /// match becomes the starting point for the next segment. `"a.c"` thus finds
    /// the first `c` somewhere under the first `a`.
    #[must_use]
    pub fn find_node(&self, from: NodeId, path: &str) -> Option<NodeId> {
        path.split('.').try_fold(from, |current, segment| {
            if segment.is_empty() {
                None
            } else {
                self.find_below(current, segment)
            }
        })
    }

    /// Find a node below the root by dotted path
    #[must_use]
    pub fn find(&self, path: &str) -> Option<NodeId> {
        self.find_node(self.root, path)
    }

    /// Dotted path of `id` from its topmost ancestor, without the root's name
    #[must_use]
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                break;
            }
            let entry = self.nodes.get(node)?;
            names.push(entry.name.as_str());
            current = entry.parent;
        }
        names.reverse();
        Some(names.join("."))
    }

    /// Whether `ancestor` is a strict ancestor of `id`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Notify every live node of a new surface size
    pub fn surface_changed(&mut self, width: u32, height: u32) {
        log::debug!("Surface changed to {width}x{height}");
        self.surface = Some((width, height));
        for id in self.subtree(self.root) {
            if let Some(entry) = self.nodes.get_mut(id) {
                entry.node.on_surface_changed(width, height);
            }
        }
    }

    /// Offer an input event to the tree depth-first; returns whether a node consumed it
    pub fn dispatch_input(&mut self, event: &InputEvent) -> bool {
        self.offer_input(self.root, event)
    }

    /// Run the update pass. Returns whether any node asked for a redraw.
    ///
    /// # Errors
    ///
    /// The first node error, which aborts the rest of the pass.
    pub fn update(&mut self, ctx: &mut UpdateContext) -> SceneResult<bool> {
        self.update_node(self.root, ctx)
    }

    /// Run the render pass, appending to `chain`. Returns the number of primitives added.
    ///
    /// # Errors
    ///
    /// The first node error, which aborts the rest of the pass.
    pub fn render(&self, chain: &mut PrimitiveChain) -> SceneResult<usize> {
        let before = chain.len();
        self.render_node(self.root, chain)?;
        Ok(chain.len() - before)
    }

    fn find_below(&self, start: NodeId, name: &str) -> Option<NodeId> {
        let children = &self.nodes.get(start)?.children;
        children
            .iter()
            .copied()
            .find(|&child| self.name(child) == Some(name))
            .or_else(|| children.iter().find_map(|&child| self.find_below(child, name)))
    }

    fn record(&mut self, change: TreeChange) {
        log::trace!("{change:?}");
        self.changes.push(change);
    }

    fn label(&self, id: NodeId) -> &str {
        self.name(id).unwrap_or("<unknown>")
    }

    // Pre-order ids of `id` and its descendants
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if let Some(entry) = self.nodes.get(node) {
                out.push(node);
                stack.extend(entry.children.iter().rev());
            }
        }
        out
    }

    fn unlink(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get_mut(child).and_then(|entry| entry.parent.take()) else {
            return;
        };
        if let Some(entry) = self.nodes.get_mut(parent) {
            entry.children.retain(|&c| c != child);
        }
    }

    fn mark_detached(&mut self, id: NodeId) {
        for node in self.subtree(id) {
            if let Some(entry) = self.nodes.get_mut(node) {
                if entry.state.is_live() {
                    entry.state = NodeState::Detached;
                }
            }
        }
    }

    fn activate(&mut self, id: NodeId) -> SceneResult<()> {
        let surface = self.surface;
        for node in self.subtree(id) {
            let Some(entry) = self.nodes.get_mut(node) else {
                continue;
            };
            if entry.state == NodeState::Uninitialized {
                log::debug!("Setting up node '{}'", entry.name);
                entry.node.on_setup()?;
            }
            if let Some((width, height)) = surface {
                entry.node.on_surface_changed(width, height);
            }
            entry.state = NodeState::Attached;
        }
        Ok(())
    }

    fn offer_input(&mut self, id: NodeId, event: &InputEvent) -> bool {
        let Some(entry) = self.nodes.get_mut(id) else {
            return false;
        };
        if entry.node.on_input(event) {
            log::trace!("Input {event:?} consumed by '{}'", entry.name);
            return true;
        }
        let mut index = 0;
        while let Some(child) = self.child_at(id, index) {
            if self.offer_input(child, event) {
                return true;
            }
            index += 1;
        }
        false
    }

    fn update_node(&mut self, id: NodeId, ctx: &mut UpdateContext) -> SceneResult<bool> {
        let Some(entry) = self.nodes.get_mut(id) else {
            return Ok(false);
        };
        ctx.enter(&entry.name);
        let flags = entry.node.update(ctx).map_err(|err| {
            log::debug!("Update of '{}' failed: {err}", entry.name);
            err
        })?;
        entry.state = NodeState::Active;

        let mut redraw = flags.contains(UpdateFlags::REDRAW);
        if flags.contains(UpdateFlags::SKIP_CHILDREN) {
            return Ok(redraw);
        }
        let mut index = 0;
        while let Some(child) = self.child_at(id, index) {
            redraw |= self.update_node(child, ctx)?;
            index += 1;
        }
        Ok(redraw)
    }

    fn render_node(&self, id: NodeId, chain: &mut PrimitiveChain) -> SceneResult<()> {
        let Some(entry) = self.nodes.get(id) else {
            return Ok(());
        };
        let bracket = entry.node.brackets_children();
        if bracket {
            chain.push(Primitive::PushMatrix);
        }
        entry.node.render_prefix(chain)?;
        for &child in &entry.children {
            self.render_node(child, chain)?;
        }
        entry.node.render_postfix(chain)?;
        if bracket {
            chain.push(Primitive::PopMatrix);
        }
        Ok(())
    }

    fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes.get(id)?.children.get(index).copied()
    }
}

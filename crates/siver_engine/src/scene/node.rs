//! Scene nodes

use slotmap::new_key_type;

use crate::scene::component::ComponentId;
use crate::scene::layer::Layer;
use crate::scene::transform::Transform;

new_key_type! {
    /// Handle to a node in a [`crate::scene::Scene`]
    pub struct NodeId;
}

/// A named element of the scene hierarchy
///
/// Nodes are owned by the scene arena. Parent and child links are ids, so a
/// destroyed node can never be reached through a stale link.
#[derive(Debug)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) active: bool,
    pub(crate) active_in_hierarchy: bool,
    pub(crate) layer: Layer,
    pub(crate) transform: Transform,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) components: Vec<ComponentId>,
    pub(crate) destroying: bool,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>, parent: Option<NodeId>, parent_active: bool) -> Self {
        Self {
            name: name.into(),
            active: true,
            active_in_hierarchy: parent_active,
            layer: Layer::default(),
            transform: Transform::default(),
            parent,
            children: Vec::new(),
            components: Vec::new(),
            destroying: false,
        }
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Own active flag
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether this node and every ancestor are active
    pub const fn is_active_in_hierarchy(&self) -> bool {
        self.active_in_hierarchy
    }

    /// Layer membership
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    /// Local transform
    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Parent node, `None` for scene roots
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Attached components in insertion order
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }
}

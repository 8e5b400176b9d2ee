//! Scene graph: node arena, hierarchy, transforms and component lifecycle
//!
//! The scene owns every node and component in slot-map arenas. Hierarchy
//! links are ids, so destroying a node never leaves a dangling reference,
//! and a stale id simply stops resolving.

use slotmap::SlotMap;

use crate::foundation::math::{Mat4, Quat, Vec3};
use crate::render::background::Background;
use crate::render::Renderable;
use crate::scene::change_flag::{ChangeFlagKey, ChangeFlagRegistry};
use crate::scene::component::{
    AsAny, Component, ComponentContext, ComponentEntry, ComponentId, Hook, LifecycleState,
};
use crate::scene::layer::Layer;
use crate::scene::node::{Node, NodeId};

/// Scene errors
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// Node id does not resolve
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    /// Component id does not resolve
    #[error("Unknown component: {0:?}")]
    UnknownComponent(ComponentId),

    /// Parent is the node itself or one of its descendants
    #[error("Cannot attach node {child:?} under its own descendant {parent:?}")]
    CyclicHierarchy {
        /// Node being moved
        child: NodeId,
        /// Requested parent
        parent: NodeId,
    },
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// A tree of nodes with attached components
pub struct Scene {
    name: String,
    nodes: SlotMap<NodeId, Node>,
    components: SlotMap<ComponentId, ComponentEntry>,
    change_flags: ChangeFlagRegistry,
    roots: Vec<NodeId>,
    /// Background drawn behind everything by cameras clearing color and depth
    pub background: Background,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Scene")
    }
}

impl Scene {
    /// Create an empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: SlotMap::with_key(),
            components: SlotMap::with_key(),
            change_flags: ChangeFlagRegistry::new(),
            roots: Vec::new(),
            background: Background::default(),
        }
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    // ---------------------------------------------------------------------
    // Hierarchy
    // ---------------------------------------------------------------------

    /// Create a node at the root of the scene
    pub fn create_root_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.nodes.insert(Node::new(name, None, true));
        self.roots.push(id);
        id
    }

    /// Create a node as the last child of `parent`
    pub fn create_child(&mut self, parent: NodeId, name: impl Into<String>) -> SceneResult<NodeId> {
        let parent_node = self.nodes.get(parent).ok_or(SceneError::UnknownNode(parent))?;
        let node = Node::new(name, Some(parent), parent_node.active_in_hierarchy);
        let id = self.nodes.insert(node);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(id);
        }
        Ok(id)
    }

    /// Move `child` under `parent`, or to the scene root when `parent` is `None`
    ///
    /// The node is appended after the new parent's existing children. Its
    /// subtree is marked world-dirty and its hierarchy activation refreshed.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> SceneResult<()> {
        let current = self.nodes.get(child).ok_or(SceneError::UnknownNode(child))?.parent;
        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) {
                return Err(SceneError::UnknownNode(parent));
            }
            if self.is_ancestor_or_self(child, parent) {
                return Err(SceneError::CyclicHierarchy { child, parent });
            }
        }
        if current == parent {
            return Ok(());
        }

        self.detach(child);
        match parent {
            Some(parent) => {
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.children.push(child);
                }
            }
            None => self.roots.push(child),
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = parent;
        }

        self.mark_subtree_dirty(child);
        self.refresh_active_in_hierarchy(child);
        Ok(())
    }

    /// Set a node's own active flag and propagate to its descendants
    pub fn set_active(&mut self, id: NodeId, active: bool) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.active == active {
            return;
        }
        node.active = active;
        self.refresh_active_in_hierarchy(id);
    }

    /// Set a node's layer bits
    pub fn set_layer(&mut self, id: NodeId, layer: Layer) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.layer = layer;
        }
    }

    /// Destroy a node, its components and its whole subtree
    ///
    /// Components are torn down parent first, in depth-first order; then
    /// the nodes are removed children first. Returns `false` for stale ids
    /// and for nodes already being destroyed.
    pub fn destroy_node(&mut self, id: NodeId) -> bool {
        match self.nodes.get(id) {
            Some(node) if !node.destroying => {}
            _ => return false,
        }

        let mut doomed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            // Already claimed by a destroy running further up the call stack
            if node.destroying {
                continue;
            }
            node.destroying = true;

            let components = node.components.clone();
            for component in components {
                self.destroy_component(component);
            }

            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter().rev().copied());
            }
            doomed.push(current);
        }

        for current in doomed.into_iter().rev() {
            self.detach(current);
            if let Some(node) = self.nodes.remove(current) {
                for key in node.transform.change_flags {
                    self.change_flags.release(key);
                }
                log::trace!("Destroyed node '{}'", node.name);
            }
        }
        true
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether the id refers to a live node
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Scene roots in insertion order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First node named `name` in depth-first order
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if node.name == name {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.nodes.get(id).and_then(|node| node.parent);
        match parent {
            Some(parent) => {
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.children.retain(|child| *child != id);
                }
            }
            None => self.roots.retain(|root| *root != id),
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    /// Recompute active-in-hierarchy for a subtree in depth-first order,
    /// stopping below nodes whose state did not change
    fn refresh_active_in_hierarchy(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            let parent_active = node
                .parent
                .and_then(|parent| self.nodes.get(parent))
                .map_or(true, |parent| parent.active_in_hierarchy);
            let active = node.active && parent_active;
            if active == node.active_in_hierarchy {
                continue;
            }

            let components = node.components.clone();
            if let Some(node) = self.nodes.get_mut(current) {
                node.active_in_hierarchy = active;
            }
            for component in components {
                if active {
                    self.activate_component(component);
                } else {
                    self.deactivate_component(component);
                }
            }

            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    // ---------------------------------------------------------------------
    // Transforms
    // ---------------------------------------------------------------------

    /// Set local position
    pub fn set_position(&mut self, id: NodeId, position: Vec3) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.transform.set_position(position);
            self.mark_subtree_dirty(id);
        }
    }

    /// Set local rotation from Euler angles in degrees
    pub fn set_rotation(&mut self, id: NodeId, euler_degrees: Vec3) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.transform.set_rotation(euler_degrees);
            self.mark_subtree_dirty(id);
        }
    }

    /// Set local rotation from a quaternion
    pub fn set_rotation_quaternion(&mut self, id: NodeId, rotation: Quat) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.transform.set_rotation_quaternion(rotation);
            self.mark_subtree_dirty(id);
        }
    }

    /// Set local scale
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.transform.set_scale(scale);
            self.mark_subtree_dirty(id);
        }
    }

    /// Move a node along its own rotated axes
    pub fn translate(&mut self, id: NodeId, delta: Vec3) {
        if let Some(node) = self.nodes.get_mut(id) {
            let position = node.transform.position() + node.transform.rotation_quaternion() * delta;
            node.transform.set_position(position);
            self.mark_subtree_dirty(id);
        }
    }

    /// Local matrix of a node
    pub fn local_matrix(&self, id: NodeId) -> Option<Mat4> {
        self.nodes.get(id).map(|node| node.transform.local_matrix())
    }

    /// World matrix of a node, `parent.world * local`
    ///
    /// Recomputes only the dirty part of the ancestor chain; a clean node
    /// returns its cached matrix.
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let node = self.nodes.get(id)?;
        Some(self.world_matrix_of(node))
    }

    /// World-space position of a node
    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_matrix(id)
            .map(|matrix| Vec3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]))
    }

    /// Walks up to the nearest clean ancestor, then composes back down,
    /// storing each dirty node's world matrix on the way
    fn world_matrix_of(&self, node: &Node) -> Mat4 {
        let mut dirty = Vec::new();
        let mut clean_parent = None;
        let mut current = Some(node);
        while let Some(node) = current {
            if let Some(cached) = node.transform.cached_world_matrix() {
                clean_parent = Some(cached);
                break;
            }
            dirty.push(node);
            current = node.parent.and_then(|parent| self.nodes.get(parent));
        }

        let mut world = clean_parent;
        for node in dirty.into_iter().rev() {
            let local = node.transform.local_matrix();
            let matrix = world.map_or(local, |parent| parent * local);
            node.transform.store_world_matrix(matrix);
            world = Some(matrix);
        }
        world.unwrap_or_else(Mat4::identity)
    }

    /// Invalidate the world matrix of a node and all its descendants,
    /// setting every change flag observing them
    fn mark_subtree_dirty(&mut self, id: NodeId) {
        let registry = &self.change_flags;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            node.transform.mark_world_dirty();
            node.transform.change_flags.retain(|key| registry.set(*key));
            stack.extend(node.children.iter().copied());
        }
    }

    // ---------------------------------------------------------------------
    // Change flags
    // ---------------------------------------------------------------------

    /// Observe a node's world transform; the returned flag starts set
    pub fn register_world_change_flag(&mut self, id: NodeId) -> Option<ChangeFlagKey> {
        let node = self.nodes.get_mut(id)?;
        let key = self.change_flags.register();
        node.transform.change_flags.push(key);
        Some(key)
    }

    /// Observe the world transform of a component's node
    ///
    /// The flag is released when the component is destroyed.
    pub fn register_component_change_flag(&mut self, component: ComponentId) -> Option<ChangeFlagKey> {
        let node = self.components.get(component)?.node;
        let key = self.register_world_change_flag(node)?;
        if let Some(entry) = self.components.get_mut(component) {
            entry.change_flags.push(key);
        }
        Some(key)
    }

    /// Read and clear a change flag; `None` once released
    pub fn take_change_flag(&self, key: ChangeFlagKey) -> Option<bool> {
        self.change_flags.take(key)
    }

    /// Read a change flag without clearing it
    pub fn is_change_flag_set(&self, key: ChangeFlagKey) -> Option<bool> {
        self.change_flags.is_set(key)
    }

    /// Release a change flag early
    pub fn release_change_flag(&mut self, key: ChangeFlagKey) -> bool {
        self.change_flags.release(key)
    }

    // ---------------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------------

    /// Attach a component to a node
    ///
    /// When the node is active in the hierarchy the component is awoken and
    /// enabled immediately.
    pub fn add_component<C: Component>(&mut self, node: NodeId, component: C) -> SceneResult<ComponentId> {
        self.add_boxed_component(node, Box::new(component))
    }

    /// Attach an already boxed component to a node
    pub fn add_boxed_component(&mut self, node: NodeId, component: Box<dyn Component>) -> SceneResult<ComponentId> {
        let owner = self.nodes.get(node).ok_or(SceneError::UnknownNode(node))?;
        let active = owner.active_in_hierarchy;
        let id = self.components.insert(ComponentEntry::new(node, component));
        if let Some(owner) = self.nodes.get_mut(node) {
            owner.components.push(id);
        }
        if active {
            self.activate_component(id);
        }
        Ok(id)
    }

    /// Borrow a component as its concrete type
    ///
    /// Returns `None` for stale ids, type mismatches, or while the
    /// component's own hook is running.
    pub fn component<C: Component>(&self, id: ComponentId) -> Option<&C> {
        let instance: &dyn Component = self.components.get(id)?.instance.as_deref()?;
        AsAny::as_any(instance).downcast_ref::<C>()
    }

    /// Mutably borrow a component as its concrete type
    pub fn component_mut<C: Component>(&mut self, id: ComponentId) -> Option<&mut C> {
        let instance: &mut dyn Component = self.components.get_mut(id)?.instance.as_deref_mut()?;
        AsAny::as_any_mut(instance).downcast_mut::<C>()
    }

    /// Node owning a component
    pub fn component_node(&self, id: ComponentId) -> Option<NodeId> {
        self.components.get(id).map(|entry| entry.node)
    }

    /// Lifecycle state of a component; `None` once removed
    pub fn component_state(&self, id: ComponentId) -> Option<LifecycleState> {
        self.components.get(id).map(|entry| entry.state)
    }

    /// Effective active state: own enabled flag AND node active in hierarchy
    pub fn is_component_active(&self, id: ComponentId) -> bool {
        self.components.get(id).is_some_and(|entry| {
            entry.enabled
                && entry.state != LifecycleState::Destroyed
                && self.nodes.get(entry.node).is_some_and(|node| node.active_in_hierarchy)
        })
    }

    /// Number of live components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Set a component's own enabled flag
    pub fn set_component_enabled(&mut self, id: ComponentId, enabled: bool) {
        let Some(entry) = self.components.get_mut(id) else {
            return;
        };
        if entry.enabled == enabled || entry.state == LifecycleState::Destroyed {
            return;
        }
        entry.enabled = enabled;
        let node = entry.node;
        let node_active = self.nodes.get(node).is_some_and(|node| node.active_in_hierarchy);
        if !node_active {
            return;
        }
        if enabled {
            self.activate_component(id);
        } else {
            self.deactivate_component(id);
        }
    }

    /// Destroy a component
    ///
    /// Removes it from its node, disables it if enabled, runs `on_destroy`
    /// once and releases its change flags. A second call is a no-op.
    pub fn destroy_component(&mut self, id: ComponentId) -> bool {
        let Some(entry) = self.components.get_mut(id) else {
            return false;
        };
        if entry.state == LifecycleState::Destroyed {
            return false;
        }
        let disable = entry.state == LifecycleState::Enabled;
        entry.state = LifecycleState::Destroyed;
        let node = entry.node;
        let flags = std::mem::take(&mut entry.change_flags);
        let instance = entry.instance.take();

        for key in flags {
            self.change_flags.release(key);
        }
        if let Some(owner) = self.nodes.get_mut(node) {
            owner.components.retain(|component| *component != id);
        }

        match instance {
            Some(instance) => self.teardown(id, node, instance, disable),
            // A hook on this component is running; finish when it returns
            None => {
                if let Some(entry) = self.components.get_mut(id) {
                    entry.teardown_pending = Some(disable);
                }
            }
        }
        true
    }

    fn teardown(&mut self, id: ComponentId, node: NodeId, mut instance: Box<dyn Component>, disable: bool) {
        let mut ctx = ComponentContext::new(self, node, id);
        if disable {
            instance.on_disable(&mut ctx);
        }
        instance.on_destroy(&mut ctx);
        self.components.remove(id);
    }

    fn activate_component(&mut self, id: ComponentId) {
        let Some(entry) = self.components.get_mut(id) else {
            return;
        };
        if entry.state == LifecycleState::Constructed {
            entry.state = LifecycleState::Awake;
            self.run_hook(id, Hook::Awake);
        }

        let Some(entry) = self.components.get_mut(id) else {
            return;
        };
        let node_active = self.nodes.get(entry.node).is_some_and(|node| node.active_in_hierarchy);
        if entry.enabled
            && node_active
            && matches!(entry.state, LifecycleState::Awake | LifecycleState::Disabled)
        {
            entry.state = LifecycleState::Enabled;
            self.run_hook(id, Hook::Enable);
        }
    }

    fn deactivate_component(&mut self, id: ComponentId) {
        let Some(entry) = self.components.get_mut(id) else {
            return;
        };
        if entry.state == LifecycleState::Enabled {
            entry.state = LifecycleState::Disabled;
            self.run_hook(id, Hook::Disable);
        }
    }

    /// Run one hook with the component checked out of the arena
    fn run_hook(&mut self, id: ComponentId, hook: Hook) {
        let Some(entry) = self.components.get_mut(id) else {
            return;
        };
        let node = entry.node;
        let Some(mut instance) = entry.instance.take() else {
            return;
        };

        {
            let mut ctx = ComponentContext::new(self, node, id);
            match hook {
                Hook::Awake => instance.on_awake(&mut ctx),
                Hook::Enable => instance.on_enable(&mut ctx),
                Hook::Disable => instance.on_disable(&mut ctx),
                Hook::Update(delta_time) => instance.on_update(&mut ctx, delta_time),
            }
        }

        let Some(entry) = self.components.get_mut(id) else {
            return;
        };
        if let Some(disable) = entry.teardown_pending.take() {
            self.teardown(id, node, instance, disable);
        } else {
            entry.instance = Some(instance);
        }
    }

    // ---------------------------------------------------------------------
    // Frame
    // ---------------------------------------------------------------------

    /// Run `on_update` on every enabled component in depth-first order
    ///
    /// The set of components is captured before the first hook runs, and
    /// each one is re-checked right before its hook, so components disabled
    /// or destroyed mid-frame are skipped.
    pub fn update(&mut self, delta_time: f32) {
        let mut pending = Vec::new();
        self.walk_active(|node| {
            pending.extend(node.components.iter().copied());
        });

        for id in pending {
            let enabled = self
                .components
                .get(id)
                .is_some_and(|entry| entry.state == LifecycleState::Enabled);
            if enabled {
                self.run_hook(id, Hook::Update(delta_time));
            }
        }
    }

    /// Visit the renderable view of every enabled component whose node is
    /// active in the hierarchy and on a layer selected by `mask`
    pub fn visit_renderables<'s, F>(&'s self, mask: Layer, mut visit: F)
    where
        F: FnMut(NodeId, &'s Node, &'s dyn Renderable),
    {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.active_in_hierarchy {
                continue;
            }
            if node.layer.visible_in(mask) {
                for component in &node.components {
                    let Some(entry) = self.components.get(*component) else {
                        continue;
                    };
                    if entry.state != LifecycleState::Enabled {
                        continue;
                    }
                    if let Some(renderable) = entry.instance.as_deref().and_then(|instance| instance.renderable()) {
                        visit(id, node, renderable);
                    }
                }
            }
            stack.extend(node.children.iter().rev().copied());
        }
    }

    fn walk_active<F: FnMut(&Node)>(&self, mut visit: F) {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.active_in_hierarchy {
                continue;
            }
            visit(node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Destroy every root node
    pub fn clear(&mut self) {
        let roots = self.roots.clone();
        for root in roots {
            self.destroy_node(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    const EPSILON: f32 = 1e-5;

    type EventLog = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        label: &'static str,
        log: EventLog,
    }

    impl Recorder {
        fn new(label: &'static str, log: &EventLog) -> Self {
            Self { label, log: Rc::clone(log) }
        }

        fn record(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}:{}", self.label, event));
        }
    }

    impl Component for Recorder {
        fn on_awake(&mut self, _ctx: &mut ComponentContext<'_>) {
            self.record("awake");
        }

        fn on_enable(&mut self, _ctx: &mut ComponentContext<'_>) {
            self.record("enable");
        }

        fn on_disable(&mut self, _ctx: &mut ComponentContext<'_>) {
            self.record("disable");
        }

        fn on_destroy(&mut self, _ctx: &mut ComponentContext<'_>) {
            self.record("destroy");
        }

        fn on_update(&mut self, _ctx: &mut ComponentContext<'_>, _delta_time: f32) {
            self.record("update");
        }
    }

    /// Destroys itself on its first update
    struct SelfDestruct {
        log: EventLog,
    }

    impl Component for SelfDestruct {
        fn on_disable(&mut self, _ctx: &mut ComponentContext<'_>) {
            self.log.borrow_mut().push("disable".to_string());
        }

        fn on_destroy(&mut self, ctx: &mut ComponentContext<'_>) {
            self.log.borrow_mut().push("destroy".to_string());
            // Re-entrant destroy must be ignored
            assert!(!ctx.scene.destroy_component(ctx.component));
        }

        fn on_update(&mut self, ctx: &mut ComponentContext<'_>, _delta_time: f32) {
            let id = ctx.component;
            assert!(ctx.scene.destroy_component(id));
        }
    }

    fn count(log: &EventLog, event: &str) -> usize {
        log.borrow().iter().filter(|entry| entry.as_str() == event).count()
    }

    #[test]
    fn test_world_matrix_composes_parent_and_child() {
        let mut scene = Scene::default();
        let parent = scene.create_root_node("parent");
        let child = scene.create_child(parent, "child").unwrap();

        scene.set_position(parent, Vec3::new(10.0, 0.0, 0.0));
        scene.set_scale(parent, Vec3::new(2.0, 2.0, 2.0));
        scene.set_position(child, Vec3::new(1.0, 0.0, 0.0));

        let world = scene.world_position(child).unwrap();
        assert_relative_eq!(world, Vec3::new(12.0, 0.0, 0.0), epsilon = EPSILON);

        let expected = scene.world_matrix(parent).unwrap() * scene.local_matrix(child).unwrap();
        assert_relative_eq!(scene.world_matrix(child).unwrap(), expected, epsilon = EPSILON);
    }

    #[test]
    fn test_world_matrix_recomputes_once_for_repeated_reads() {
        let mut scene = Scene::default();
        let node = scene.create_root_node("node");
        scene.set_position(node, Vec3::new(1.0, 2.0, 3.0));

        let first = scene.world_matrix(node).unwrap();
        let second = scene.world_matrix(node).unwrap();

        assert_eq!(first, second);
        assert_eq!(scene.node(node).unwrap().transform().world_update_count(), 1);
    }

    #[test]
    fn test_parent_change_invalidates_descendants() {
        let mut scene = Scene::default();
        let root = scene.create_root_node("root");
        let middle = scene.create_child(root, "middle").unwrap();
        let leaf = scene.create_child(middle, "leaf").unwrap();
        scene.set_position(leaf, Vec3::new(0.0, 0.0, 1.0));
        let _ = scene.world_matrix(leaf);

        scene.set_rotation(root, Vec3::new(0.0, 90.0, 0.0));
        assert!(scene.node(leaf).unwrap().transform().is_world_dirty());

        let world = scene.world_position(leaf).unwrap();
        assert_relative_eq!(world, Vec3::new(1.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_translate_uses_local_axes() {
        let mut scene = Scene::default();
        let node = scene.create_root_node("node");
        scene.set_rotation(node, Vec3::new(0.0, 90.0, 0.0));
        scene.translate(node, Vec3::new(1.0, 0.0, 0.0));

        let position = *scene.node(node).unwrap().transform().position();
        assert_relative_eq!(position, Vec3::new(0.0, 0.0, -1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_change_flag_set_by_ancestor_mutation() {
        let mut scene = Scene::default();
        let root = scene.create_root_node("root");
        let child = scene.create_child(root, "child").unwrap();
        let flag = scene.register_world_change_flag(child).unwrap();

        assert_eq!(scene.take_change_flag(flag), Some(true));
        assert_eq!(scene.take_change_flag(flag), Some(false));

        scene.set_scale(root, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(scene.take_change_flag(flag), Some(true));

        scene.destroy_node(child);
        assert_eq!(scene.take_change_flag(flag), None);
    }

    #[test]
    fn test_reparent_marks_subtree_dirty_and_keeps_world_consistent() {
        let mut scene = Scene::default();
        let a = scene.create_root_node("a");
        let b = scene.create_root_node("b");
        let child = scene.create_child(a, "child").unwrap();
        scene.set_position(b, Vec3::new(0.0, 5.0, 0.0));
        let _ = scene.world_matrix(child);

        scene.set_parent(child, Some(b)).unwrap();

        assert!(scene.node(a).unwrap().children().is_empty());
        assert_eq!(scene.node(b).unwrap().children(), &[child]);
        assert_eq!(scene.roots(), &[a, b]);
        assert_relative_eq!(
            scene.world_position(child).unwrap(),
            Vec3::new(0.0, 5.0, 0.0),
            epsilon = EPSILON
        );

        scene.set_parent(child, None).unwrap();
        assert_eq!(scene.roots(), &[a, b, child]);
        assert_eq!(scene.node(child).unwrap().parent(), None);
    }

    #[test]
    fn test_reparent_under_descendant_is_rejected() {
        let mut scene = Scene::default();
        let root = scene.create_root_node("root");
        let child = scene.create_child(root, "child").unwrap();
        let grandchild = scene.create_child(child, "grandchild").unwrap();

        let result = scene.set_parent(root, Some(grandchild));
        assert_eq!(result, Err(SceneError::CyclicHierarchy { child: root, parent: grandchild }));
        assert_eq!(scene.set_parent(root, Some(root)), Err(SceneError::CyclicHierarchy { child: root, parent: root }));

        // Nothing moved
        assert_eq!(scene.roots(), &[root]);
        assert_eq!(scene.node(root).unwrap().children(), &[child]);
    }

    #[test]
    fn test_add_component_on_active_node_awakes_then_enables() {
        let log = EventLog::default();
        let mut scene = Scene::default();
        let node = scene.create_root_node("node");

        let id = scene.add_component(node, Recorder::new("p", &log)).unwrap();

        assert_eq!(*log.borrow(), vec!["p:awake", "p:enable"]);
        assert_eq!(scene.component_state(id), Some(LifecycleState::Enabled));
        assert!(scene.is_component_active(id));
        assert!(scene.component::<Recorder>(id).is_some());
        assert!(scene.component::<SelfDestruct>(id).is_none());
    }

    #[test]
    fn test_component_on_inactive_node_waits_for_activation() {
        let log = EventLog::default();
        let mut scene = Scene::default();
        let node = scene.create_root_node("node");
        scene.set_active(node, false);

        let id = scene.add_component(node, Recorder::new("p", &log)).unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(scene.component_state(id), Some(LifecycleState::Constructed));

        scene.set_active(node, true);
        assert_eq!(*log.borrow(), vec!["p:awake", "p:enable"]);
    }

    #[test]
    fn test_disabling_parent_disables_descendants_without_reawake() {
        let log = EventLog::default();
        let mut scene = Scene::default();
        let parent = scene.create_root_node("parent");
        let child = scene.create_child(parent, "child").unwrap();
        let grandchild = scene.create_child(child, "grandchild").unwrap();
        let id = scene.add_component(grandchild, Recorder::new("g", &log)).unwrap();

        scene.set_active(parent, false);
        assert!(!scene.is_component_active(id));
        assert!(!scene.node(grandchild).unwrap().is_active_in_hierarchy());
        assert!(scene.node(grandchild).unwrap().is_active());
        assert_eq!(scene.component_state(id), Some(LifecycleState::Disabled));

        scene.set_active(parent, true);
        assert!(scene.is_component_active(id));
        assert_eq!(count(&log, "g:awake"), 1);
        assert_eq!(*log.borrow(), vec!["g:awake", "g:enable", "g:disable", "g:enable"]);
    }

    #[test]
    fn test_inactive_child_stays_inactive_when_parent_reactivates() {
        let log = EventLog::default();
        let mut scene = Scene::default();
        let parent = scene.create_root_node("parent");
        let child = scene.create_child(parent, "child").unwrap();
        let id = scene.add_component(child, Recorder::new("c", &log)).unwrap();

        scene.set_active(child, false);
        scene.set_active(parent, false);
        scene.set_active(parent, true);

        assert!(!scene.is_component_active(id));
        assert_eq!(*log.borrow(), vec!["c:awake", "c:enable", "c:disable"]);
    }

    #[test]
    fn test_component_enabled_flag_combines_with_node_activity() {
        let log = EventLog::default();
        let mut scene = Scene::default();
        let node = scene.create_root_node("node");
        let id = scene.add_component(node, Recorder::new("p", &log)).unwrap();

        scene.set_component_enabled(id, false);
        scene.set_active(node, false);
        scene.set_active(node, true);
        assert!(!scene.is_component_active(id));

        scene.set_component_enabled(id, true);
        assert!(scene.is_component_active(id));
        assert_eq!(*log.borrow(), vec!["p:awake", "p:enable", "p:disable", "p:enable"]);
    }

    #[test]
    fn test_destroy_component_runs_teardown_once() {
        let log = EventLog::default();
        let mut scene = Scene::default();
        let node = scene.create_root_node("node");
        let id = scene.add_component(node, Recorder::new("p", &log)).unwrap();
        let flag = scene.register_component_change_flag(id).unwrap();

        assert!(scene.destroy_component(id));
        assert!(!scene.destroy_component(id));

        assert_eq!(count(&log, "p:destroy"), 1);
        assert_eq!(count(&log, "p:disable"), 1);
        assert!(scene.node(node).unwrap().components().is_empty());
        assert_eq!(scene.component_state(id), None);
        assert_eq!(scene.take_change_flag(flag), None);
    }

    #[test]
    fn test_destroy_node_tears_down_subtree() {
        let log = EventLog::default();
        let mut scene = Scene::default();
        let root = scene.create_root_node("root");
        let parent = scene.create_child(root, "parent").unwrap();
        let first = scene.create_child(parent, "first").unwrap();
        let second = scene.create_child(parent, "second").unwrap();
        scene.add_component(first, Recorder::new("first", &log)).unwrap();
        scene.add_component(second, Recorder::new("second", &log)).unwrap();

        assert!(scene.destroy_node(parent));
        assert!(!scene.destroy_node(parent));

        assert_eq!(count(&log, "first:destroy"), 1);
        assert_eq!(count(&log, "second:destroy"), 1);
        assert!(!scene.contains_node(first));
        assert!(!scene.contains_node(second));
        assert!(scene.node(root).unwrap().children().is_empty());
        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.component_count(), 0);
    }

    #[test]
    fn test_deep_chain_on_small_stack() {
        const DEPTH: usize = 5_000;

        let worker = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let log = EventLog::default();
                let mut scene = Scene::default();
                let root = scene.create_root_node("link0");
                scene.set_position(root, Vec3::new(1.0, 0.0, 0.0));
                let mut leaf = root;
                for i in 1..DEPTH {
                    leaf = scene.create_child(leaf, format!("link{}", i)).unwrap();
                    scene.set_position(leaf, Vec3::new(1.0, 0.0, 0.0));
                }
                scene.add_component(leaf, Recorder::new("leaf", &log)).unwrap();

                let position = scene.world_position(leaf).unwrap();
                assert_relative_eq!(position.x, DEPTH as f32, epsilon = EPSILON);
                scene.world_matrix(leaf).unwrap();
                assert_eq!(scene.node(root).unwrap().transform().world_update_count(), 1);
                assert_eq!(scene.node(leaf).unwrap().transform().world_update_count(), 1);

                scene.set_active(root, false);
                scene.set_active(root, true);
                assert_eq!(count(&log, "leaf:enable"), 2);
                assert_eq!(count(&log, "leaf:disable"), 1);

                assert!(scene.destroy_node(root));
                assert_eq!(count(&log, "leaf:destroy"), 1);
                assert_eq!(scene.node_count(), 0);
                assert!(scene.roots().is_empty());
            })
            .unwrap();
        worker.join().unwrap();
    }

    #[test]
    fn test_component_destroying_itself_during_update() {
        let log = EventLog::default();
        let mut scene = Scene::default();
        let node = scene.create_root_node("node");
        let id = scene.add_component(node, SelfDestruct { log: Rc::clone(&log) }).unwrap();

        scene.update(0.016);
        scene.update(0.016);

        assert_eq!(*log.borrow(), vec!["disable", "destroy"]);
        assert_eq!(scene.component_state(id), None);
        assert!(scene.node(node).unwrap().components().is_empty());
    }

    #[test]
    fn test_update_skips_inactive_components() {
        let log = EventLog::default();
        let mut scene = Scene::default();
        let active = scene.create_root_node("active");
        let inactive = scene.create_root_node("inactive");
        scene.add_component(active, Recorder::new("a", &log)).unwrap();
        scene.add_component(inactive, Recorder::new("i", &log)).unwrap();
        scene.set_active(inactive, false);

        scene.update(0.1);

        assert_eq!(count(&log, "a:update"), 1);
        assert_eq!(count(&log, "i:update"), 0);
    }

    #[test]
    fn test_stale_ids_are_ignored() {
        let mut scene = Scene::default();
        let node = scene.create_root_node("node");
        scene.destroy_node(node);

        scene.set_position(node, Vec3::new(1.0, 0.0, 0.0));
        assert!(scene.world_matrix(node).is_none());
        assert!(scene.register_world_change_flag(node).is_none());
        assert_eq!(scene.create_child(node, "orphan"), Err(SceneError::UnknownNode(node)));

        // Slot reuse hands out a new generation
        let newer = scene.create_root_node("newer");
        assert_ne!(node, newer);
        assert!(scene.node(node).is_none());
    }

    #[test]
    fn test_find_node_depth_first() {
        let mut scene = Scene::default();
        let a = scene.create_root_node("a");
        let target = scene.create_child(a, "target").unwrap();
        let b = scene.create_root_node("b");
        scene.create_child(b, "target").unwrap();

        assert_eq!(scene.find_node("target"), Some(target));
        assert_eq!(scene.find_node("missing"), None);
    }
}

//! Component trait and lifecycle bookkeeping
//!
//! Components are behaviors attached to nodes. The scene drives their
//! lifecycle:
//!
//! ```text
//! Constructed -> Awake -> Enabled <-> Disabled -> Destroyed
//! ```
//!
//! `on_awake` runs once, the first time the component's node is active in
//! the hierarchy. `on_enable` / `on_disable` follow the effective active
//! state: the component's own enabled flag AND the node being active in the
//! hierarchy. `on_destroy` runs exactly once.

use std::any::Any;

use slotmap::new_key_type;

use crate::render::Renderable;
use crate::scene::change_flag::ChangeFlagKey;
use crate::scene::node::NodeId;
use crate::scene::Scene;

new_key_type! {
    /// Handle to a component in a [`Scene`]
    pub struct ComponentId;
}

/// Lifecycle state of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Attached but its node has never been active
    Constructed,
    /// `on_awake` ran; not enabled
    Awake,
    /// Effectively active
    Enabled,
    /// Was enabled, now inactive
    Disabled,
    /// Torn down
    Destroyed,
}

/// Upcast helper so components can be downcast to their concrete type
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;

    /// Borrow as `&mut dyn Any`
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

/// Behavior attached to a node
///
/// All hooks have empty defaults. Hooks receive a [`ComponentContext`] with
/// mutable access to the scene, so a component may move its node, spawn
/// nodes or destroy itself from inside a hook.
pub trait Component: AsAny {
    /// Runs once, when the node first becomes active in the hierarchy
    fn on_awake(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Runs when the component becomes effectively active
    fn on_enable(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Runs when the component stops being effectively active
    fn on_disable(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Runs exactly once when the component is destroyed
    fn on_destroy(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Runs once per frame while enabled
    fn on_update(&mut self, _ctx: &mut ComponentContext<'_>, _delta_time: f32) {}

    /// Drawable view of this component, if it renders anything
    fn renderable(&self) -> Option<&dyn Renderable> {
        None
    }
}

/// Access handed to component hooks
pub struct ComponentContext<'a> {
    /// Scene owning the component
    pub scene: &'a mut Scene,
    /// Node the component is attached to
    pub node: NodeId,
    /// The component receiving the hook
    pub component: ComponentId,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(scene: &'a mut Scene, node: NodeId, component: ComponentId) -> Self {
        Self { scene, node, component }
    }

    /// Observe the owning node's world transform
    ///
    /// The flag is released automatically when this component is destroyed.
    pub fn register_world_change_flag(&mut self) -> Option<ChangeFlagKey> {
        self.scene.register_component_change_flag(self.component)
    }
}

/// Hook selector used by the scene's dispatcher
#[derive(Debug, Clone, Copy)]
pub(crate) enum Hook {
    Awake,
    Enable,
    Disable,
    Update(f32),
}

/// Arena slot for a component
pub(crate) struct ComponentEntry {
    pub(crate) node: NodeId,
    pub(crate) enabled: bool,
    pub(crate) state: LifecycleState,
    /// `None` while a hook on this component is running
    pub(crate) instance: Option<Box<dyn Component>>,
    /// Set when destroyed while checked out; holds whether `on_disable` is owed
    pub(crate) teardown_pending: Option<bool>,
    pub(crate) change_flags: Vec<ChangeFlagKey>,
}

impl ComponentEntry {
    pub(crate) fn new(node: NodeId, instance: Box<dyn Component>) -> Self {
        Self {
            node,
            enabled: true,
            state: LifecycleState::Constructed,
            instance: Some(instance),
            teardown_pending: None,
            change_flags: Vec::new(),
        }
    }
}

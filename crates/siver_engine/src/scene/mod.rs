//! Scene management
//!
//! A scene is a forest of nodes. Each node carries a transform whose world
//! matrix is cached and invalidated along the hierarchy, a layer mask, and a
//! list of components whose lifecycle follows the node's activation.
//!
//! ## Architecture
//!
//! ```text
//! Scene
//!  ├─ nodes       (arena, NodeId)       -> Transform, children, components
//!  ├─ components  (arena, ComponentId)  -> Box<dyn Component> + lifecycle state
//!  └─ change flags (arena, ChangeFlagKey) observing transforms
//! ```

pub mod change_flag;
pub mod component;
pub mod layer;
pub mod node;
pub mod scene_graph;
pub mod transform;

pub use change_flag::{ChangeFlagKey, ChangeFlagRegistry};
pub use component::{AsAny, Component, ComponentContext, ComponentId, LifecycleState};
pub use layer::Layer;
pub use node::{Node, NodeId};
pub use scene_graph::{Scene, SceneError, SceneResult};
pub use transform::Transform;

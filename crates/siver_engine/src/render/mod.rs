//! # Rendering System
//!
//! Turns the active part of a [`Scene`](crate::scene::Scene) into backend
//! commands, once per camera per frame.
//!
//! ## Architecture
//!
//! - **Renderable**: Drawable view of a component; pushes render elements
//! - **RenderQueues**: Opaque, alpha-test and transparent queues sorted by depth
//! - **RenderPass**: One ordered step of the frame with optional hooks
//! - **RenderPipeline**: Runs the passes over two ping-ponged intermediate targets
//! - **Camera**: View/projection source that owns its pipeline
//! - **HardwareRenderer**: Backend boundary every GPU command goes through
//!
//! Nothing in the frame path returns an error. Missing configuration is
//! logged with `log::warn!` and the affected element is skipped; backend
//! failures are logged by the backend.

pub mod api;
pub mod background;
pub mod batching;
pub mod camera;
pub mod material;
pub mod mesh;
pub mod pipeline;
pub mod post_effect;
pub mod render_pass;
pub mod render_queue;
pub mod render_state;
pub mod renderers;
pub mod shader;
pub mod target;

pub use api::{
    BackendResult, HardwareRenderer, MeshHandle, ProgramHandle, RenderTargetHandle, ShaderDataGroup,
    TextureHandle, Viewport,
};
pub use background::{Background, BackgroundMode, BackgroundTexture, BackgroundTextureFillMode, Sky};
pub use camera::Camera;
pub use material::{Material, RenderQueueType, ShaderData, ShaderValue};
pub use mesh::{Mesh, MeshData, SubMesh};
pub use pipeline::{FrameStats, PassOutput, PassRecord, RenderContext, RenderPipeline};
pub use post_effect::{PostEffect, PostEffectPass};
pub use render_pass::{PassContext, RenderPass, RenderPassHooks};
pub use render_queue::{QueueBands, QueueType, RenderElement, RenderQueue, RenderQueues};
pub use render_state::RenderState;
pub use renderers::{MeshRenderer, SpriteMask, SpriteRenderer};
pub use shader::{MacroSet, Shader};
pub use target::{ClearFlags, RenderTarget, RenderTargetDescriptor};

use std::rc::Rc;

use thiserror::Error;

use crate::foundation::math::{Mat4, Point3};
use crate::render::batching::SpriteQuad;
use crate::render::render_queue::ElementPrimitive;
use crate::scene::{Layer, NodeId};

/// Rendering errors
///
/// Returned by resource creation. Per-frame commands never fail outward;
/// backends log their own failures and carry on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    ///
    /// Occurs when the backend cannot be brought up, for example because no
    /// suitable device or surface is available.
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Resource creation or management failed
    ///
    /// Occurs when meshes, targets or textures cannot be created, typically
    /// due to memory constraints or invalid data.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A shader variant failed to compile or link
    #[error("Invalid shader program: {0}")]
    InvalidProgram(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Drawable view of a component
///
/// Called once per camera per frame for every enabled component whose node
/// is active and visible to the camera's culling mask.
pub trait Renderable {
    /// Push this frame's render elements
    fn collect(&self, collector: &mut RenderCollector<'_>);
}

/// Sink handed to [`Renderable::collect`]
///
/// Carries the owning node's world matrix and layer, computes camera depth
/// and classifies each element into its queue.
pub struct RenderCollector<'a> {
    queues: &'a mut RenderQueues,
    view: Mat4,
    world_matrix: Mat4,
    layer: Layer,
    node: Option<NodeId>,
    node_name: &'a str,
    pushed: usize,
    skipped: usize,
}

impl<'a> RenderCollector<'a> {
    /// Create a collector writing into `queues` for a camera with this view matrix
    pub fn new(queues: &'a mut RenderQueues, view: Mat4) -> Self {
        Self {
            queues,
            view,
            world_matrix: Mat4::identity(),
            layer: Layer::default(),
            node: None,
            node_name: "",
            pushed: 0,
            skipped: 0,
        }
    }

    /// Point the collector at the next node
    pub fn bind_node(&mut self, node: NodeId, name: &'a str, layer: Layer, world_matrix: Mat4) {
        self.node = Some(node);
        self.node_name = name;
        self.layer = layer;
        self.world_matrix = world_matrix;
    }

    /// World matrix of the node being collected
    pub const fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// Layer of the node being collected
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    /// Node being collected
    pub const fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Elements pushed so far
    pub const fn pushed(&self) -> usize {
        self.pushed
    }

    /// Elements skipped for missing configuration
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Camera-space depth of a point given in the node's local space
    pub fn depth_of(&self, local: Point3) -> f32 {
        let view_space = self.view.transform_point(&self.world_matrix.transform_point(&local));
        -view_space.z
    }

    /// Push one sub-mesh
    ///
    /// A missing material or an out-of-range sub-mesh skips the element.
    pub fn push_mesh(&mut self, mesh: &Rc<Mesh>, sub_mesh: usize, material: Option<&Rc<Material>>) {
        let Some(material) = material else {
            self.skip(format_args!("mesh '{}' sub-mesh {} has no material", mesh.name(), sub_mesh));
            return;
        };
        if mesh.sub_mesh(sub_mesh).is_none() {
            self.skip(format_args!("mesh '{}' has no sub-mesh {}", mesh.name(), sub_mesh));
            return;
        }

        let depth = self.depth_of(Point3::origin());
        self.push(
            ElementPrimitive::Mesh {
                mesh: Rc::clone(mesh),
                sub_mesh,
            },
            material,
            depth,
        );
    }

    /// Push a batchable quad
    pub fn push_sprite(&mut self, quad: SpriteQuad, material: Option<&Rc<Material>>) {
        let Some(material) = material else {
            self.skip(format_args!("sprite has no material"));
            return;
        };
        let center = quad.positions.iter().fold(Point3::origin(), |sum, corner| sum + corner * 0.25);
        let depth = self.depth_of(center);
        self.push(ElementPrimitive::Sprite(quad), material, depth);
    }

    /// Log a missing piece of configuration and count the element as skipped
    pub fn skip(&mut self, reason: std::fmt::Arguments<'_>) {
        log::warn!("Node '{}': {}, skipped", self.node_name, reason);
        self.skipped += 1;
    }

    fn push(&mut self, primitive: ElementPrimitive, material: &Rc<Material>, depth: f32) {
        self.queues.push_element(RenderElement {
            primitive,
            material: Rc::clone(material),
            world_matrix: self.world_matrix,
            depth,
            layer: self.layer,
            queue: QueueType::Opaque,
            node: self.node,
        });
        self.pushed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingRenderer;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn unlit(name: &str, queue: i32) -> Rc<Material> {
        Rc::new(Material::new(name, Rc::new(Shader::new("unlit", "vs", "fs"))).with_render_queue(queue))
    }

    #[test]
    fn test_depth_is_distance_along_view_direction() {
        let mut queues = RenderQueues::new(QueueBands::default(), 4);
        let mut collector = RenderCollector::new(&mut queues, Mat4::identity());
        collector.bind_node(
            NodeId::default(),
            "quad",
            Layer::LAYER0,
            Mat4::new_translation(&Vec3::new(0.0, 0.0, -7.0)),
        );

        assert_relative_eq!(collector.depth_of(Point3::origin()), 7.0);
    }

    #[test]
    fn test_missing_material_skips_element() {
        let mut rhi = RecordingRenderer::new(64, 64);
        let mesh = Rc::new(Mesh::new(&mut rhi, "cube", &MeshData::cube(1.0)).unwrap());
        let mut queues = RenderQueues::new(QueueBands::default(), 4);
        let mut collector = RenderCollector::new(&mut queues, Mat4::identity());

        collector.push_mesh(&mesh, 0, None);
        collector.push_mesh(&mesh, 3, Some(&unlit("m", 1000)));
        collector.push_sprite(SpriteQuad::centered(1.0, 1.0), None);
        assert_eq!(collector.skipped(), 3);
        assert_eq!(collector.pushed(), 0);
        assert!(queues.is_empty());
    }

    #[test]
    fn test_elements_classified_by_material_queue() {
        let mut rhi = RecordingRenderer::new(64, 64);
        let mesh = Rc::new(Mesh::new(&mut rhi, "cube", &MeshData::cube(1.0)).unwrap());
        let mut queues = RenderQueues::new(QueueBands::default(), 4);
        let mut collector = RenderCollector::new(&mut queues, Mat4::identity());

        collector.push_mesh(&mesh, 0, Some(&unlit("opaque", 1000)));
        collector.push_sprite(SpriteQuad::centered(1.0, 1.0), Some(&unlit("glass", 3000)));

        assert_eq!(queues.opaque.len(), 1);
        assert_eq!(queues.transparent.len(), 1);
        assert_eq!(queues.transparent.elements()[0].queue, QueueType::Transparent);
    }
}

//! Hardware rendering interface
//!
//! This module defines the trait a GPU backend implements so the render
//! pipeline can drive it. The pipeline never talks to a graphics API
//! directly; every render target switch, clear, state change and draw goes
//! through [`HardwareRenderer`].
//!
//! Resource creation returns [`BackendResult`]. Per-frame commands do not:
//! a backend that fails mid-frame logs the failure and carries on so the
//! frame loop is never interrupted.

use crate::foundation::math::{Color, Vec3};
use crate::render::batching::VertexLayout;
use crate::render::material::ShaderData;
use crate::render::mesh::{MeshData, SubMesh};
use crate::render::render_state::RenderState;
use crate::render::shader::{MacroSet, ShaderSource};
use crate::render::target::{ClearFlags, RenderTargetDescriptor};
use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Handle to a mesh resource stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Handle to a linked shader program stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Handle to a texture stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to an offscreen render target stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle(pub u64);

/// Backend resources allocated for one render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetResources {
    /// Framebuffer handle
    pub target: RenderTargetHandle,
    /// Color attachment, sampleable by later passes
    pub color_texture: TextureHandle,
}

/// Normalized viewport rectangle (0..1 of the bound target)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge
    pub x: f32,
    /// Bottom edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, width: 1.0, height: 1.0 }
    }
}

impl Viewport {
    /// Pixel rectangle of this viewport on a surface of the given size
    pub fn to_pixels(self, surface_width: u32, surface_height: u32) -> (u32, u32, u32, u32) {
        let scale = |value: f32, extent: u32| (value * extent as f32).round().max(0.0) as u32;
        (
            scale(self.x, surface_width),
            scale(self.y, surface_height),
            scale(self.width, surface_width),
            scale(self.height, surface_height),
        )
    }
}

/// Scope of a block of shader data uploaded before a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderDataGroup {
    /// Per-camera values (view, projection)
    Camera,
    /// Per-draw values (model, model-view-projection)
    Renderer,
    /// Material properties
    Material,
}

/// A batched draw of generated vertices
#[derive(Debug, Clone, Copy)]
pub struct BatchDraw<'a> {
    /// Layout of one vertex in `vertices`
    pub layout: &'a VertexLayout,
    /// Interleaved vertex bytes
    pub vertices: &'a [u8],
    /// Number of vertices in `vertices`
    pub vertex_count: usize,
    /// Triangle-list indices into `vertices`
    pub indices: &'a [u16],
    /// Number of elements merged into this draw
    pub element_count: usize,
}

/// GPU backend driven by the render pipeline
pub trait HardwareRenderer {
    /// Size of the default framebuffer in pixels
    fn canvas_size(&self) -> (u32, u32);

    /// Allocate an offscreen render target
    fn create_render_target(&mut self, descriptor: &RenderTargetDescriptor) -> BackendResult<RenderTargetResources>;

    /// Release an offscreen render target
    fn destroy_render_target(&mut self, target: RenderTargetHandle);

    /// Upload a mesh
    fn create_mesh(&mut self, data: &MeshData) -> BackendResult<MeshHandle>;

    /// Replace the vertex positions of an uploaded mesh
    fn update_mesh_positions(&mut self, mesh: MeshHandle, positions: &[Vec3]) -> BackendResult<()>;

    /// Release a mesh's vertex and index buffers
    fn destroy_mesh(&mut self, mesh: MeshHandle);

    /// Compile and link a shader variant
    fn compile_program(&mut self, source: &ShaderSource, macros: &MacroSet) -> BackendResult<ProgramHandle>;

    /// Release a linked program
    fn destroy_program(&mut self, program: ProgramHandle);

    /// Bind a render target (`None` for the canvas) and set its viewport
    fn active_render_target(&mut self, target: Option<RenderTargetHandle>, viewport: Viewport, mip_level: u32);

    /// Set the viewport in pixels
    fn viewport(&mut self, x: u32, y: u32, width: u32, height: u32);

    /// Clear the bound target
    fn clear_render_target(&mut self, flags: ClearFlags, color: Color);

    /// Make a program current
    fn bind_program(&mut self, program: ProgramHandle);

    /// Upload a block of uniforms and textures to the current program
    fn upload_shader_data(&mut self, group: ShaderDataGroup, data: &ShaderData);

    /// Apply fixed-function state
    fn apply_render_state(&mut self, state: &RenderState);

    /// Draw one sub-mesh
    fn draw_primitive(&mut self, mesh: MeshHandle, sub_mesh: &SubMesh, program: ProgramHandle);

    /// Draw generated vertices
    fn draw_batch(&mut self, batch: &BatchDraw<'_>, program: ProgramHandle);

    /// Resolve a multisampled target into its color texture
    fn blit_render_target(&mut self, target: RenderTargetHandle);

    /// Regenerate the mip chain of a target's color texture
    fn generate_mipmaps(&mut self, target: RenderTargetHandle);
}

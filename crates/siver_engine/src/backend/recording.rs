//! Headless recording backend
//!
//! Hands out sequential handles and appends one [`RhiCommand`] per call.
//! Failures can be injected for shader compilation and render target
//! creation to exercise the pipeline's error paths.

use crate::foundation::math::{Color, Vec3};
use crate::render::api::{
    BackendResult, BatchDraw, HardwareRenderer, MeshHandle, ProgramHandle, RenderTargetHandle,
    RenderTargetResources, ShaderDataGroup, TextureHandle, Viewport,
};
use crate::render::material::ShaderData;
use crate::render::mesh::{MeshData, SubMesh};
use crate::render::render_state::RenderState;
use crate::render::shader::{MacroSet, ShaderSource};
use crate::render::target::{ClearFlags, RenderTargetDescriptor};
use crate::render::RenderError;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum RhiCommand {
    /// A render target was allocated
    CreateRenderTarget {
        /// Returned handle
        target: RenderTargetHandle,
        /// Requested parameters
        descriptor: RenderTargetDescriptor,
    },
    /// A render target was released
    DestroyRenderTarget(RenderTargetHandle),
    /// A mesh was uploaded
    CreateMesh {
        /// Returned handle
        mesh: MeshHandle,
        /// Vertex count
        vertices: usize,
        /// Sub-mesh count
        sub_meshes: usize,
    },
    /// Mesh positions were replaced
    UpdateMeshPositions {
        /// Mesh
        mesh: MeshHandle,
        /// New positions
        positions: Vec<Vec3>,
    },
    /// A mesh was released
    DestroyMesh(MeshHandle),
    /// A program was compiled, successfully or not
    CompileProgram {
        /// Vertex stage source
        vertex: String,
        /// Enabled macros
        macros: Vec<String>,
        /// Returned handle, `None` on failure
        program: Option<ProgramHandle>,
    },
    /// A program was released
    DestroyProgram(ProgramHandle),
    /// A render target (`None` for the canvas) was bound
    ActiveRenderTarget {
        /// Bound target
        target: Option<RenderTargetHandle>,
        /// Normalized viewport
        viewport: Viewport,
        /// Mip level
        mip_level: u32,
    },
    /// The pixel viewport was set
    Viewport {
        /// Left
        x: u32,
        /// Bottom
        y: u32,
        /// Width
        width: u32,
        /// Height
        height: u32,
    },
    /// The bound target was cleared
    Clear {
        /// Cleared buffers
        flags: ClearFlags,
        /// Clear color
        color: Color,
    },
    /// A program was made current
    BindProgram(ProgramHandle),
    /// Shader data was uploaded
    UploadShaderData {
        /// Scope
        group: ShaderDataGroup,
        /// Snapshot of the uploaded values
        data: ShaderData,
    },
    /// Fixed-function state was applied
    ApplyRenderState(RenderState),
    /// A sub-mesh was drawn
    DrawPrimitive {
        /// Mesh
        mesh: MeshHandle,
        /// Drawn range
        sub_mesh: SubMesh,
        /// Program
        program: ProgramHandle,
    },
    /// Generated vertices were drawn
    DrawBatch {
        /// Vertices in the batch
        vertex_count: usize,
        /// Indices in the batch
        index_count: usize,
        /// Elements merged into the batch
        element_count: usize,
        /// Program
        program: ProgramHandle,
    },
    /// A multisampled target was resolved
    BlitRenderTarget(RenderTargetHandle),
    /// A target's mip chain was regenerated
    GenerateMipmaps(RenderTargetHandle),
}

/// [`HardwareRenderer`] that records instead of drawing
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    canvas: (u32, u32),
    commands: Vec<RhiCommand>,
    next_handle: u64,
    failing_shaders: Vec<String>,
    fail_render_targets: bool,
}

impl RecordingRenderer {
    /// Create a recorder with a canvas of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: (width, height),
            ..Self::default()
        }
    }

    /// Recorded commands in call order
    pub fn commands(&self) -> &[RhiCommand] {
        &self.commands
    }

    /// Drop every recorded command
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Take the recorded commands, leaving the log empty
    pub fn take_commands(&mut self) -> Vec<RhiCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Make every program whose vertex source equals `vertex_source` fail to compile
    pub fn fail_shader(&mut self, vertex_source: impl Into<String>) {
        self.failing_shaders.push(vertex_source.into());
    }

    /// Make render target creation fail
    pub fn set_fail_render_targets(&mut self, fail: bool) {
        self.fail_render_targets = fail;
    }

    /// Resize the canvas
    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        self.canvas = (width, height);
    }

    /// Number of recorded draw calls of either kind
    pub fn draw_call_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RhiCommand::DrawPrimitive { .. } | RhiCommand::DrawBatch { .. }))
            .count()
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl HardwareRenderer for RecordingRenderer {
    fn canvas_size(&self) -> (u32, u32) {
        self.canvas
    }

    fn create_render_target(&mut self, descriptor: &RenderTargetDescriptor) -> BackendResult<RenderTargetResources> {
        if self.fail_render_targets {
            return Err(RenderError::ResourceCreationFailed(format!(
                "render target {}x{} refused",
                descriptor.width, descriptor.height
            )));
        }
        let target = RenderTargetHandle(self.next_handle());
        let color_texture = TextureHandle(self.next_handle());
        self.commands.push(RhiCommand::CreateRenderTarget {
            target,
            descriptor: *descriptor,
        });
        Ok(RenderTargetResources { target, color_texture })
    }

    fn destroy_render_target(&mut self, target: RenderTargetHandle) {
        self.commands.push(RhiCommand::DestroyRenderTarget(target));
    }

    fn create_mesh(&mut self, data: &MeshData) -> BackendResult<MeshHandle> {
        let mesh = MeshHandle(self.next_handle());
        self.commands.push(RhiCommand::CreateMesh {
            mesh,
            vertices: data.positions.len(),
            sub_meshes: data.sub_meshes.len(),
        });
        Ok(mesh)
    }

    fn update_mesh_positions(&mut self, mesh: MeshHandle, positions: &[Vec3]) -> BackendResult<()> {
        self.commands.push(RhiCommand::UpdateMeshPositions {
            mesh,
            positions: positions.to_vec(),
        });
        Ok(())
    }

    fn destroy_mesh(&mut self, mesh: MeshHandle) {
        self.commands.push(RhiCommand::DestroyMesh(mesh));
    }

    fn compile_program(&mut self, source: &ShaderSource, macros: &MacroSet) -> BackendResult<ProgramHandle> {
        let failed = self.failing_shaders.iter().any(|vertex| *vertex == source.vertex);
        let program = (!failed).then(|| ProgramHandle(self.next_handle()));
        self.commands.push(RhiCommand::CompileProgram {
            vertex: source.vertex.clone(),
            macros: macros.iter().map(str::to_string).collect(),
            program,
        });
        program.ok_or_else(|| RenderError::InvalidProgram(format!("vertex source '{}' rejected", source.vertex)))
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        self.commands.push(RhiCommand::DestroyProgram(program));
    }

    fn active_render_target(&mut self, target: Option<RenderTargetHandle>, viewport: Viewport, mip_level: u32) {
        self.commands.push(RhiCommand::ActiveRenderTarget {
            target,
            viewport,
            mip_level,
        });
    }

    fn viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.commands.push(RhiCommand::Viewport { x, y, width, height });
    }

    fn clear_render_target(&mut self, flags: ClearFlags, color: Color) {
        self.commands.push(RhiCommand::Clear { flags, color });
    }

    fn bind_program(&mut self, program: ProgramHandle) {
        self.commands.push(RhiCommand::BindProgram(program));
    }

    fn upload_shader_data(&mut self, group: ShaderDataGroup, data: &ShaderData) {
        self.commands.push(RhiCommand::UploadShaderData {
            group,
            data: data.clone(),
        });
    }

    fn apply_render_state(&mut self, state: &RenderState) {
        self.commands.push(RhiCommand::ApplyRenderState(*state));
    }

    fn draw_primitive(&mut self, mesh: MeshHandle, sub_mesh: &SubMesh, program: ProgramHandle) {
        self.commands.push(RhiCommand::DrawPrimitive {
            mesh,
            sub_mesh: *sub_mesh,
            program,
        });
    }

    fn draw_batch(&mut self, batch: &BatchDraw<'_>, program: ProgramHandle) {
        log::trace!(
            "Batch of {} elements: {} vertices, {} bytes",
            batch.element_count,
            batch.vertex_count,
            batch.vertices.len()
        );
        self.commands.push(RhiCommand::DrawBatch {
            vertex_count: batch.vertex_count,
            index_count: batch.indices.len(),
            element_count: batch.element_count,
            program,
        });
    }

    fn blit_render_target(&mut self, target: RenderTargetHandle) {
        self.commands.push(RhiCommand::BlitRenderTarget(target));
    }

    fn generate_mipmaps(&mut self, target: RenderTargetHandle) {
        self.commands.push(RhiCommand::GenerateMipmaps(target));
    }
}

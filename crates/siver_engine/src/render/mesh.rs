//! Meshes and sub-meshes

use std::cell::Cell;

use crate::foundation::math::{Vec2, Vec3};
use crate::render::api::{BackendResult, HardwareRenderer, MeshHandle};
use crate::render::RenderError;

/// Primitive assembly of a sub-mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    /// Triangle list
    #[default]
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Line list
    Lines,
    /// Point list
    Points,
}

/// A drawable index range of a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubMesh {
    /// First index
    pub start: u32,
    /// Number of indices
    pub count: u32,
    /// Primitive assembly
    pub topology: PrimitiveTopology,
}

impl SubMesh {
    /// Triangle-list range
    pub const fn new(start: u32, count: u32) -> Self {
        Self {
            start,
            count,
            topology: PrimitiveTopology::Triangles,
        }
    }
}

/// CPU-side mesh data uploaded through [`HardwareRenderer::create_mesh`]
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Vertex normals (may be empty)
    pub normals: Vec<Vec3>,
    /// Texture coordinates (may be empty)
    pub uvs: Vec<Vec2>,
    /// Triangle indices
    pub indices: Vec<u32>,
    /// Drawable ranges of `indices`
    pub sub_meshes: Vec<SubMesh>,
}

impl MeshData {
    /// Screen-space quad covering clip space at the far plane
    ///
    /// Vertex `i` has uv `(i % 2, 1 - i / 2)`; positions are set per use.
    pub fn screen_quad() -> Self {
        let indices = vec![1, 2, 0, 1, 3, 2];
        Self {
            positions: fill_quad_positions(1.0, 1.0).to_vec(),
            normals: Vec::new(),
            uvs: (0..4u8).map(|i| Vec2::new(f32::from(i % 2), 1.0 - f32::from(i / 2))).collect(),
            sub_meshes: vec![SubMesh::new(0, 6)],
            indices,
        }
    }

    /// Axis-aligned cube of the given half extent
    pub fn cube(half_extent: f32) -> Self {
        let h = half_extent;
        let positions = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
            3, 7, 6, 3, 6, 2, // top
            0, 1, 5, 0, 5, 4, // bottom
        ];
        Self {
            positions,
            normals: Vec::new(),
            uvs: Vec::new(),
            sub_meshes: vec![SubMesh::new(0, 36)],
            indices,
        }
    }
}

/// Quad corner positions at the far plane, scaled on X and Y
pub(crate) fn fill_quad_positions(scale_x: f32, scale_y: f32) -> [Vec3; 4] {
    [
        Vec3::new(-scale_x, -scale_y, 1.0),
        Vec3::new(scale_x, -scale_y, 1.0),
        Vec3::new(-scale_x, scale_y, 1.0),
        Vec3::new(scale_x, scale_y, 1.0),
    ]
}

/// A mesh uploaded to the backend
///
/// Meshes are shared between renderers through `Rc`, so
/// [`Mesh::destroy`] takes `&self`. Draws of a destroyed mesh are skipped.
#[derive(Debug)]
pub struct Mesh {
    name: String,
    handle: MeshHandle,
    sub_meshes: Vec<SubMesh>,
    vertex_count: usize,
    destroyed: Cell<bool>,
}

impl Mesh {
    /// Upload mesh data
    pub fn new(rhi: &mut dyn HardwareRenderer, name: impl Into<String>, data: &MeshData) -> BackendResult<Self> {
        let handle = rhi.create_mesh(data)?;
        Ok(Self {
            name: name.into(),
            handle,
            sub_meshes: data.sub_meshes.clone(),
            vertex_count: data.positions.len(),
            destroyed: Cell::new(false),
        })
    }

    /// Mesh name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend handle
    pub const fn handle(&self) -> MeshHandle {
        self.handle
    }

    /// Sub-mesh by index
    pub fn sub_mesh(&self, index: usize) -> Option<&SubMesh> {
        self.sub_meshes.get(index)
    }

    /// All sub-meshes
    pub fn sub_meshes(&self) -> &[SubMesh] {
        &self.sub_meshes
    }

    /// Number of vertices
    pub const fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Replace vertex positions on the backend
    pub fn set_positions(&self, rhi: &mut dyn HardwareRenderer, positions: &[Vec3]) -> BackendResult<()> {
        if self.is_destroyed() {
            return Err(RenderError::RenderingFailed(format!("mesh '{}' was destroyed", self.name)));
        }
        rhi.update_mesh_positions(self.handle, positions)
    }

    /// Whether the backend buffers were released
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Release the backend buffers; returns `false` if already released
    pub fn destroy(&self, rhi: &mut dyn HardwareRenderer) -> bool {
        if self.destroyed.replace(true) {
            return false;
        }
        rhi.destroy_mesh(self.handle);
        log::debug!("Destroyed mesh '{}' ({:?})", self.name, self.handle);
        true
    }
}

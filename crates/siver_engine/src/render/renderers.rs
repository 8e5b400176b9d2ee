//! Drawable components

use std::rc::Rc;

use crate::foundation::math::{Color, Vec2};
use crate::render::api::TextureHandle;
use crate::render::batching::{SpriteMaskMode, SpriteQuad};
use crate::render::material::Material;
use crate::render::mesh::Mesh;
use crate::render::{RenderCollector, Renderable};
use crate::scene::Component;

/// Draws a mesh with one material per sub-mesh
#[derive(Debug, Clone, Default)]
pub struct MeshRenderer {
    /// Mesh to draw
    pub mesh: Option<Rc<Mesh>>,
    materials: Vec<Option<Rc<Material>>>,
}

impl MeshRenderer {
    /// Create a renderer drawing every sub-mesh of `mesh` with `material`
    pub fn new(mesh: Rc<Mesh>, material: Rc<Material>) -> Self {
        let materials = vec![Some(material); mesh.sub_meshes().len().max(1)];
        Self {
            mesh: Some(mesh),
            materials,
        }
    }

    /// Material of a sub-mesh
    pub fn material(&self, sub_mesh: usize) -> Option<&Rc<Material>> {
        self.materials.get(sub_mesh).and_then(Option::as_ref)
    }

    /// Set the material of a sub-mesh
    pub fn set_material(&mut self, sub_mesh: usize, material: Option<Rc<Material>>) {
        if self.materials.len() <= sub_mesh {
            self.materials.resize(sub_mesh + 1, None);
        }
        self.materials[sub_mesh] = material;
    }

    /// Materials by sub-mesh index
    pub fn materials(&self) -> &[Option<Rc<Material>>] {
        &self.materials
    }
}

impl Component for MeshRenderer {
    fn renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }
}

impl Renderable for MeshRenderer {
    fn collect(&self, collector: &mut RenderCollector<'_>) {
        let Some(mesh) = &self.mesh else {
            collector.skip(format_args!("mesh renderer has no mesh"));
            return;
        };
        for sub_mesh in 0..mesh.sub_meshes().len() {
            collector.push_mesh(mesh, sub_mesh, self.material(sub_mesh));
        }
    }
}

/// Draws a textured, tinted quad through the sprite batcher
#[derive(Debug, Clone)]
pub struct SpriteRenderer {
    /// Material; sprites sharing it (and the texture) batch together
    pub material: Option<Rc<Material>>,
    /// Sampled texture
    pub texture: Option<TextureHandle>,
    /// Quad size in local units
    pub size: Vec2,
    /// Pivot in normalized quad coordinates; (0.5, 0.5) is the center
    pub pivot: Vec2,
    /// Vertex tint
    pub color: Color,
    /// Mirror horizontally
    pub flip_x: bool,
    /// Mirror vertically
    pub flip_y: bool,
}

impl Default for SpriteRenderer {
    fn default() -> Self {
        Self {
            material: None,
            texture: None,
            size: Vec2::new(1.0, 1.0),
            pivot: Vec2::new(0.5, 0.5),
            color: Color::WHITE,
            flip_x: false,
            flip_y: false,
        }
    }
}

impl SpriteRenderer {
    /// Create a sprite of the given size
    pub fn new(material: Rc<Material>, width: f32, height: f32) -> Self {
        Self {
            material: Some(material),
            size: Vec2::new(width, height),
            ..Self::default()
        }
    }

    /// Local-space quad of this sprite
    pub fn quad(&self) -> SpriteQuad {
        let mut quad = pivoted_quad(self.size, self.pivot);
        if self.flip_x {
            quad.uvs.swap(0, 1);
            quad.uvs.swap(2, 3);
        }
        if self.flip_y {
            quad.uvs.swap(0, 2);
            quad.uvs.swap(1, 3);
        }
        quad.color = self.color;
        quad.texture = self.texture;
        quad
    }
}

impl Component for SpriteRenderer {
    fn renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }
}

impl Renderable for SpriteRenderer {
    fn collect(&self, collector: &mut RenderCollector<'_>) {
        collector.push_sprite(self.quad(), self.material.as_ref());
    }
}

/// Writes the stencil buffer where its texture is opaque enough
///
/// Masks are drawn through the sprite batcher with a stencil-only render
/// state; [`SpriteMaskMode::Add`] increments and
/// [`SpriteMaskMode::Subtract`] decrements.
#[derive(Debug, Clone)]
pub struct SpriteMask {
    /// Mask material
    pub material: Option<Rc<Material>>,
    /// Texture defining the mask shape; without one nothing is drawn
    pub texture: Option<TextureHandle>,
    /// Quad size in local units
    pub size: Vec2,
    /// Stencil operation
    pub mode: SpriteMaskMode,
    /// Texels with lower alpha do not write the stencil
    pub alpha_cutoff: f32,
}

impl Default for SpriteMask {
    fn default() -> Self {
        Self {
            material: None,
            texture: None,
            size: Vec2::new(1.0, 1.0),
            mode: SpriteMaskMode::Add,
            alpha_cutoff: 0.5,
        }
    }
}

impl Component for SpriteMask {
    fn renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }
}

impl Renderable for SpriteMask {
    fn collect(&self, collector: &mut RenderCollector<'_>) {
        let Some(texture) = self.texture else {
            return;
        };
        let mut quad = pivoted_quad(self.size, Vec2::new(0.5, 0.5));
        quad.texture = Some(texture);
        quad.mask = Some(self.mode);
        quad.alpha_cutoff = self.alpha_cutoff;
        collector.push_sprite(quad, self.material.as_ref());
    }
}

fn pivoted_quad(size: Vec2, pivot: Vec2) -> SpriteQuad {
    let mut quad = SpriteQuad::centered(size.x, size.y);
    let offset = Vec2::new((0.5 - pivot.x) * size.x, (0.5 - pivot.y) * size.y);
    for corner in &mut quad.positions {
        corner.x += offset.x;
        corner.y += offset.y;
    }
    quad
}

//! Sprite quad batching
//!
//! Sprites and sprite masks are quads generated on the CPU. Consecutive
//! quads sharing a material, texture, mask mode and alpha cutoff are merged
//! into one draw of world-space vertices.

use std::rc::Rc;

use crate::foundation::math::{Color, Mat4, Point3, Vec2, Vec3};
use crate::render::api::TextureHandle;
use crate::render::batching::{Batcher, VertexFormat, VertexLayout};
use crate::render::render_queue::{ElementPrimitive, RenderElement};

/// Stencil effect of a sprite mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteMaskMode {
    /// Increment the stencil where the mask covers
    Add,
    /// Decrement the stencil where the mask covers
    Subtract,
}

/// A quad in local space
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteQuad {
    /// Corners in local space: bottom-left, bottom-right, top-left, top-right
    pub positions: [Vec3; 4],
    /// Corner texture coordinates
    pub uvs: [Vec2; 4],
    /// Vertex tint
    pub color: Color,
    /// Sampled texture
    pub texture: Option<TextureHandle>,
    /// Set when the quad writes the stencil buffer instead of color
    pub mask: Option<SpriteMaskMode>,
    /// Fragments with alpha below this are discarded
    pub alpha_cutoff: f32,
}

impl SpriteQuad {
    /// Axis-aligned quad of the given size centered on the origin
    pub fn centered(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self {
            positions: [
                Vec3::new(-hw, -hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
                Vec3::new(-hw, hh, 0.0),
                Vec3::new(hw, hh, 0.0),
            ],
            uvs: [
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
            ],
            color: Color::WHITE,
            texture: None,
            mask: None,
            alpha_cutoff: 0.0,
        }
    }
}

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

/// Batches [`ElementPrimitive::Sprite`] elements
///
/// Vertex layout: `POSITION` (float3, world space), `TEXCOORD_0` (float2),
/// `COLOR_0` (float4).
#[derive(Debug, Clone)]
pub struct SpriteBatcher {
    layout: VertexLayout,
}

impl Default for SpriteBatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteBatcher {
    /// Create the batcher
    pub fn new() -> Self {
        Self {
            layout: VertexLayout::packed(&[
                ("POSITION", VertexFormat::Float3),
                ("TEXCOORD_0", VertexFormat::Float2),
                ("COLOR_0", VertexFormat::Float4),
            ]),
        }
    }

    fn quad(element: &RenderElement) -> Option<&SpriteQuad> {
        match &element.primitive {
            ElementPrimitive::Sprite(quad) => Some(quad),
            ElementPrimitive::Mesh { .. } => None,
        }
    }
}

impl Batcher for SpriteBatcher {
    type Element = RenderElement;

    fn vertex_layout(&self) -> &VertexLayout {
        &self.layout
    }

    fn vertex_count(&self, element: &RenderElement) -> usize {
        if Self::quad(element).is_some() {
            4
        } else {
            0
        }
    }

    fn can_batch(&self, previous: &RenderElement, current: &RenderElement) -> bool {
        let (Some(a), Some(b)) = (Self::quad(previous), Self::quad(current)) else {
            return false;
        };
        Rc::ptr_eq(&previous.material, &current.material)
            && a.texture == b.texture
            && a.mask == b.mask
            && a.alpha_cutoff.to_bits() == b.alpha_cutoff.to_bits()
    }

    fn write_vertices(
        &self,
        element: &RenderElement,
        vertices: &mut Vec<f32>,
        indices: &mut Vec<u16>,
        vertex_offset: usize,
    ) -> usize {
        let Some(quad) = Self::quad(element) else {
            return vertex_offset;
        };
        write_quad(&element.world_matrix, quad, vertices);

        let base = u16::try_from(vertex_offset).unwrap_or(u16::MAX);
        indices.extend(QUAD_INDICES.iter().map(|&index| base.saturating_add(index)));
        vertex_offset + 4
    }
}

fn write_quad(world: &Mat4, quad: &SpriteQuad, vertices: &mut Vec<f32>) {
    let color = quad.color.to_array();
    for (position, uv) in quad.positions.iter().zip(&quad.uvs) {
        let world_position = world.transform_point(&Point3::from(*position));
        vertices.extend_from_slice(&[world_position.x, world_position.y, world_position.z]);
        vertices.extend_from_slice(&[uv.x, uv.y]);
        vertices.extend_from_slice(&color);
    }
}

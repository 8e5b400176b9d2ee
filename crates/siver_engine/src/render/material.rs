//! Materials and shader data
//!
//! A material pairs a shader with the values fed to it, the fixed-function
//! state it draws with and the render-queue value that decides which queue
//! its elements land in. Materials are shared between renderers through
//! `Rc<Material>`.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::foundation::math::{Color, Mat4, Vec2, Vec3, Vec4};
use crate::render::api::TextureHandle;
use crate::render::render_state::RenderState;
use crate::render::shader::{MacroSet, Shader};

/// Standard render-queue values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderQueueType {
    /// Opaque geometry
    Opaque = 1000,
    /// Alpha-tested geometry
    AlphaTest = 2000,
    /// Blended geometry
    Transparent = 3000,
}

impl RenderQueueType {
    /// Numeric queue value
    pub const fn value(self) -> i32 {
        self as i32
    }
}

/// A uniform or texture value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShaderValue {
    /// Scalar float
    Float(f32),
    /// Scalar int
    Int(i32),
    /// 2-component vector
    Vec2(Vec2),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// Color
    Color(Color),
    /// 4x4 matrix
    Mat4(Mat4),
    /// Sampled texture
    Texture(TextureHandle),
}

/// Named shader values plus the macros they enable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderData {
    properties: BTreeMap<String, ShaderValue>,
    macros: MacroSet,
}

impl ShaderData {
    /// Empty data block
    pub fn new() -> Self {
        Self::default()
    }

    /// Set any value
    pub fn set(&mut self, name: impl Into<String>, value: ShaderValue) {
        self.properties.insert(name.into(), value);
    }

    /// Set a float
    pub fn set_float(&mut self, name: impl Into<String>, value: f32) {
        self.set(name, ShaderValue::Float(value));
    }

    /// Set a color
    pub fn set_color(&mut self, name: impl Into<String>, value: Color) {
        self.set(name, ShaderValue::Color(value));
    }

    /// Set a 3-component vector
    pub fn set_vector3(&mut self, name: impl Into<String>, value: Vec3) {
        self.set(name, ShaderValue::Vec3(value));
    }

    /// Set a matrix
    pub fn set_matrix(&mut self, name: impl Into<String>, value: Mat4) {
        self.set(name, ShaderValue::Mat4(value));
    }

    /// Set a texture
    pub fn set_texture(&mut self, name: impl Into<String>, value: TextureHandle) {
        self.set(name, ShaderValue::Texture(value));
    }

    /// Look up a value
    pub fn get(&self, name: &str) -> Option<&ShaderValue> {
        self.properties.get(name)
    }

    /// Remove a value
    pub fn remove(&mut self, name: &str) -> Option<ShaderValue> {
        self.properties.remove(name)
    }

    /// Iterate values in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ShaderValue)> {
        self.properties.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no value is set
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Macros enabled by this data block
    pub const fn macros(&self) -> &MacroSet {
        &self.macros
    }

    /// Mutable macro set
    pub fn macros_mut(&mut self) -> &mut MacroSet {
        &mut self.macros
    }
}

/// Shader plus the values and state it draws with
#[derive(Debug, Clone)]
pub struct Material {
    /// Material name
    pub name: String,
    /// Shader program source
    pub shader: Rc<Shader>,
    /// Material-scope shader values
    pub shader_data: ShaderData,
    /// Fixed-function state
    pub render_state: RenderState,
    /// Render-queue value; see [`RenderQueueType`]
    pub render_queue: i32,
}

impl Material {
    /// Create an opaque material
    pub fn new(name: impl Into<String>, shader: Rc<Shader>) -> Self {
        Self {
            name: name.into(),
            shader,
            shader_data: ShaderData::new(),
            render_state: RenderState::default(),
            render_queue: RenderQueueType::Opaque.value(),
        }
    }

    /// Set the render-queue value
    #[must_use]
    pub const fn with_render_queue(mut self, render_queue: i32) -> Self {
        self.render_queue = render_queue;
        self
    }

    /// Use a standard queue and the matching default render state
    #[must_use]
    pub fn with_queue_type(mut self, queue: RenderQueueType) -> Self {
        self.render_queue = queue.value();
        self.render_state = match queue {
            RenderQueueType::Transparent => RenderState::transparent(),
            RenderQueueType::Opaque | RenderQueueType::AlphaTest => RenderState::default(),
        };
        self
    }

    /// Set the fixed-function state
    #[must_use]
    pub const fn with_render_state(mut self, render_state: RenderState) -> Self {
        self.render_state = render_state;
        self
    }

    /// Set the base color property
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.shader_data.set_color("u_baseColor", color);
        self
    }

    /// Set the base texture property and enable its macro
    #[must_use]
    pub fn with_texture(mut self, texture: TextureHandle) -> Self {
        self.shader_data.set_texture("u_baseTexture", texture);
        self.shader_data.macros_mut().enable("HAS_BASE_TEXTURE");
        self
    }
}

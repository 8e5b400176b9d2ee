//! Full-screen post effect
//!
//! [`PostEffectPass`] replaces the queue walk of its pass: it samples the
//! previous pass's color texture and draws it onto a screen quad with
//! brightness, contrast and bloom uniforms. Put it after the passes that
//! produce the image, e.g. at priority 1 behind the default pass.

use std::rc::Rc;

use crate::render::api::{BackendResult, HardwareRenderer, ShaderDataGroup};
use crate::render::material::ShaderData;
use crate::render::mesh::{Mesh, MeshData};
use crate::render::render_pass::{PassContext, RenderPass, RenderPassHooks};
use crate::render::shader::Shader;
use crate::render::target::ClearFlags;

/// Uniforms and geometry of a post effect
#[derive(Debug)]
pub struct PostEffect {
    shader: Rc<Shader>,
    mesh: Mesh,
    shader_data: ShaderData,
    brightness: f32,
    contrast: f32,
    bloom_intensity: f32,
    bloom_threshold: f32,
}

impl PostEffect {
    /// Create a post effect drawing with `shader`
    pub fn new(rhi: &mut dyn HardwareRenderer, shader: Rc<Shader>) -> BackendResult<Self> {
        let mesh = Mesh::new(rhi, "post-effect-quad", &MeshData::screen_quad())?;
        let mut effect = Self {
            shader,
            mesh,
            shader_data: ShaderData::new(),
            brightness: f32::NAN,
            contrast: f32::NAN,
            bloom_intensity: f32::NAN,
            bloom_threshold: f32::NAN,
        };
        effect.set_brightness(1.0);
        effect.set_contrast(1.0);
        effect.set_bloom_intensity(0.0);
        effect.set_bloom_threshold(1.0);
        Ok(effect)
    }

    /// Brightness multiplier
    pub const fn brightness(&self) -> f32 {
        self.brightness
    }

    /// Set the brightness multiplier
    pub fn set_brightness(&mut self, brightness: f32) {
        if self.brightness != brightness {
            self.brightness = brightness;
            self.shader_data.set_float("u_brightness", brightness);
        }
    }

    /// Contrast multiplier
    pub const fn contrast(&self) -> f32 {
        self.contrast
    }

    /// Set the contrast multiplier
    pub fn set_contrast(&mut self, contrast: f32) {
        if self.contrast != contrast {
            self.contrast = contrast;
            self.shader_data.set_float("u_contrast", contrast);
        }
    }

    /// Bloom strength
    pub const fn bloom_intensity(&self) -> f32 {
        self.bloom_intensity
    }

    /// Set the bloom strength
    pub fn set_bloom_intensity(&mut self, intensity: f32) {
        if self.bloom_intensity != intensity {
            self.bloom_intensity = intensity;
            self.shader_data.set_float("u_bloomIntensity", intensity);
        }
    }

    /// Luminance above which pixels bloom
    pub const fn bloom_threshold(&self) -> f32 {
        self.bloom_threshold
    }

    /// Set the bloom threshold
    pub fn set_bloom_threshold(&mut self, threshold: f32) {
        if self.bloom_threshold != threshold {
            self.bloom_threshold = threshold;
            self.shader_data.set_float("u_bloomThreshold", threshold);
        }
    }

    /// Uniform block uploaded with each draw
    pub const fn shader_data(&self) -> &ShaderData {
        &self.shader_data
    }

    /// Release the screen quad; returns `false` if already released
    ///
    /// The shader is shared and stays with its owner.
    pub fn destroy(&mut self, rhi: &mut dyn HardwareRenderer) -> bool {
        self.mesh.destroy(rhi)
    }
}

/// Pass hooks drawing a [`PostEffect`]
#[derive(Debug)]
pub struct PostEffectPass {
    effect: PostEffect,
}

impl PostEffectPass {
    /// Wrap an effect
    pub const fn new(effect: PostEffect) -> Self {
        Self { effect }
    }

    /// Build a render pass that clears color and depth and runs this effect
    pub fn into_render_pass(self, name: impl Into<String>, priority: i32) -> RenderPass {
        RenderPass::new(name, priority)
            .with_clear_flags(ClearFlags::DEPTH_COLOR)
            .with_hooks(Box::new(self))
    }

    /// The effect
    pub const fn effect(&self) -> &PostEffect {
        &self.effect
    }

    /// The effect, mutably
    pub fn effect_mut(&mut self) -> &mut PostEffect {
        &mut self.effect
    }
}

impl RenderPassHooks for PostEffectPass {
    fn overrides_render(&self) -> bool {
        true
    }

    fn render(&mut self, ctx: &mut PassContext<'_>) {
        let Some(previous) = ctx.previous_result else {
            log::warn!("Post effect pass '{}' has no previous result to sample", ctx.pass_name);
            return;
        };
        let effect = &mut self.effect;
        if effect.mesh.is_destroyed() {
            return;
        }
        let Some(sub_mesh) = effect.mesh.sub_mesh(0) else {
            return;
        };
        let Some(program) = effect.shader.program(ctx.rhi, ctx.camera.macros) else {
            return;
        };

        effect.shader_data.set_texture("u_baseTexture", previous.color_texture());
        ctx.rhi.bind_program(program);
        ctx.rhi.upload_shader_data(ShaderDataGroup::Renderer, &effect.shader_data);
        ctx.rhi.draw_primitive(effect.mesh.handle(), sub_mesh, program);
        ctx.draw_calls += 1;
    }

    fn destroy(&mut self, rhi: &mut dyn HardwareRenderer) {
        self.effect.destroy(rhi);
    }
}

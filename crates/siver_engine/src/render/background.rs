//! Scene background: solid color, sky or screen-space texture
//!
//! The background is scene data. Each pipeline owns a
//! [`BackgroundRenderer`] holding the screen quad used for texture
//! backgrounds, so the quad is sized for that pipeline's canvas.

use std::rc::Rc;

use crate::foundation::math::{Color, Mat4, Vec3};
use crate::render::api::{HardwareRenderer, ShaderDataGroup, TextureHandle};
use crate::render::material::{Material, ShaderData};
use crate::render::mesh::{fill_quad_positions, Mesh, MeshData};
use crate::render::pipeline::{DrawState, RenderContext};

/// What is drawn behind the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundMode {
    /// Only the clear color
    #[default]
    SolidColor,
    /// Sky mesh drawn around the camera
    Sky,
    /// Texture on a screen quad
    Texture,
}

/// How a background texture is fitted to the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundTextureFillMode {
    /// Stretch over the whole canvas
    Fill,
    /// Keep aspect, match the canvas width
    AspectFitWidth,
    /// Keep aspect, match the canvas height
    #[default]
    AspectFitHeight,
}

/// Sky mesh and material
#[derive(Debug, Clone, Default)]
pub struct Sky {
    /// Sky material; its shader reads `u_mvpNoscale`
    pub material: Option<Rc<Material>>,
    /// Sky mesh
    pub mesh: Option<Rc<Mesh>>,
}

/// Texture shown by [`BackgroundMode::Texture`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundTexture {
    /// Backend texture
    pub texture: TextureHandle,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Background of a scene
#[derive(Debug, Clone)]
pub struct Background {
    /// Active mode
    pub mode: BackgroundMode,
    /// Clear color used by passes without their own
    pub solid_color: Color,
    /// Used by [`BackgroundMode::Sky`]
    pub sky: Sky,
    /// Used by [`BackgroundMode::Texture`]
    pub texture: Option<BackgroundTexture>,
    /// Material drawing the texture quad; receives `u_baseTexture`
    pub texture_material: Option<Rc<Material>>,
    /// Fit of the texture quad
    pub texture_fill_mode: BackgroundTextureFillMode,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            mode: BackgroundMode::SolidColor,
            solid_color: Color::new(0.25, 0.25, 0.25, 1.0),
            sky: Sky::default(),
            texture: None,
            texture_material: None,
            texture_fill_mode: BackgroundTextureFillMode::AspectFitHeight,
        }
    }
}

/// Corner positions of the background quad for a texture and canvas size
pub fn background_quad_positions(
    fill_mode: BackgroundTextureFillMode,
    texture_size: (u32, u32),
    canvas_size: (u32, u32),
) -> [Vec3; 4] {
    let (tw, th) = (texture_size.0 as f32, texture_size.1 as f32);
    let (cw, ch) = (canvas_size.0 as f32, canvas_size.1 as f32);
    if tw <= 0.0 || th <= 0.0 || cw <= 0.0 || ch <= 0.0 {
        return fill_quad_positions(1.0, 1.0);
    }

    match fill_mode {
        BackgroundTextureFillMode::Fill => fill_quad_positions(1.0, 1.0),
        BackgroundTextureFillMode::AspectFitWidth => fill_quad_positions(1.0, th * cw / tw / ch),
        BackgroundTextureFillMode::AspectFitHeight => fill_quad_positions(tw * ch / th / cw, 1.0),
    }
}

/// Inputs the texture quad was last sized for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QuadKey {
    fill_mode: BackgroundTextureFillMode,
    texture_size: (u32, u32),
    canvas_size: (u32, u32),
}

/// Draws sky and texture backgrounds for one pipeline
#[derive(Debug, Default)]
pub struct BackgroundRenderer {
    quad: Option<Mesh>,
    quad_key: Option<QuadKey>,
    sky_data: ShaderData,
    texture_data: ShaderData,
}

impl BackgroundRenderer {
    /// Create a renderer; the quad is uploaded on first use
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the background of `background.mode`; returns whether a draw was issued
    pub(crate) fn draw(
        &mut self,
        rhi: &mut dyn HardwareRenderer,
        ctx: &RenderContext<'_>,
        background: &Background,
        state: &mut DrawState,
    ) -> bool {
        let drawn = match background.mode {
            BackgroundMode::SolidColor => false,
            BackgroundMode::Sky => self.draw_sky(rhi, ctx, &background.sky, state),
            BackgroundMode::Texture => self.draw_texture(rhi, ctx, background, state),
        };
        if drawn {
            // The queue drawer must rebind and re-upload camera data
            state.invalidate_program();
        }
        drawn
    }

    fn draw_sky(
        &mut self,
        rhi: &mut dyn HardwareRenderer,
        ctx: &RenderContext<'_>,
        sky: &Sky,
        state: &mut DrawState,
    ) -> bool {
        let Some(material) = &sky.material else {
            log::warn!("The material of sky is not defined");
            return false;
        };
        let Some(mesh) = &sky.mesh else {
            log::warn!("The mesh of sky is not defined");
            return false;
        };
        if mesh.is_destroyed() {
            log::warn!("Sky mesh '{}' was destroyed", mesh.name());
            return false;
        }
        let Some(sub_mesh) = mesh.sub_mesh(0) else {
            log::warn!("Sky mesh '{}' has no sub-mesh", mesh.name());
            return false;
        };

        let macros = ctx.macros.union(material.shader_data.macros());
        let Some(program) = material.shader.program(rhi, &macros) else {
            return false;
        };

        self.sky_data
            .set_matrix("u_mvpNoscale", sky_view_projection(&ctx.view, &ctx.projection));

        rhi.bind_program(program);
        rhi.upload_shader_data(ShaderDataGroup::Renderer, &self.sky_data);
        rhi.upload_shader_data(ShaderDataGroup::Material, &material.shader_data);
        material.render_state.apply(rhi, &mut state.render_state);
        rhi.draw_primitive(mesh.handle(), sub_mesh, program);
        true
    }

    fn draw_texture(
        &mut self,
        rhi: &mut dyn HardwareRenderer,
        ctx: &RenderContext<'_>,
        background: &Background,
        state: &mut DrawState,
    ) -> bool {
        let Some(texture) = background.texture else {
            return false;
        };
        let Some(material) = &background.texture_material else {
            log::warn!("The material of the background texture is not defined");
            return false;
        };

        let key = QuadKey {
            fill_mode: background.texture_fill_mode,
            texture_size: (texture.width, texture.height),
            canvas_size: rhi.canvas_size(),
        };
        if !self.prepare_quad(rhi, key) {
            return false;
        }
        let Some(quad) = &self.quad else {
            return false;
        };
        let Some(sub_mesh) = quad.sub_mesh(0) else {
            return false;
        };

        let macros = ctx.macros.union(material.shader_data.macros());
        let Some(program) = material.shader.program(rhi, &macros) else {
            return false;
        };

        self.texture_data.set_texture("u_baseTexture", texture.texture);
        rhi.bind_program(program);
        rhi.upload_shader_data(ShaderDataGroup::Material, &material.shader_data);
        rhi.upload_shader_data(ShaderDataGroup::Renderer, &self.texture_data);
        material.render_state.apply(rhi, &mut state.render_state);
        rhi.draw_primitive(quad.handle(), sub_mesh, program);
        true
    }

    /// Release the texture quad; it is uploaded again on next use
    pub fn destroy(&mut self, rhi: &mut dyn HardwareRenderer) -> bool {
        self.quad_key = None;
        self.quad.take().is_some_and(|quad| quad.destroy(rhi))
    }

    /// Upload the quad if needed and resize it when its inputs changed
    fn prepare_quad(&mut self, rhi: &mut dyn HardwareRenderer, key: QuadKey) -> bool {
        if self.quad.is_none() {
            match Mesh::new(rhi, "background-quad", &MeshData::screen_quad()) {
                Ok(mesh) => self.quad = Some(mesh),
                Err(e) => {
                    log::error!("Failed to create background quad: {}", e);
                    return false;
                }
            }
            self.quad_key = None;
        }
        if self.quad_key == Some(key) {
            return true;
        }

        let Some(quad) = &self.quad else {
            return false;
        };
        let positions = background_quad_positions(key.fill_mode, key.texture_size, key.canvas_size);
        if let Err(e) = quad.set_positions(rhi, &positions) {
            log::error!("Failed to resize background quad: {}", e);
            return false;
        }
        log::debug!(
            "Background quad resized for {:?} on {}x{}",
            key.fill_mode,
            key.canvas_size.0,
            key.canvas_size.1
        );
        self.quad_key = Some(key);
        true
    }

    /// Whether the texture quad was uploaded
    pub fn has_quad(&self) -> bool {
        self.quad.is_some()
    }
}

/// View-projection with the view translation removed
pub fn sky_view_projection(view: &Mat4, projection: &Mat4) -> Mat4 {
    let mut view = *view;
    view.fixed_view_mut::<3, 1>(0, 3).fill(0.0);
    projection * view
}

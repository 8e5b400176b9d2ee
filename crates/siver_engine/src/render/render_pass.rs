//! Render passes
//!
//! A pass is one ordered step of a camera's frame. The pipeline keeps its
//! passes sorted ascending by priority; the default pass has priority 0, so
//! negative priorities run before it and positive ones after it.

use std::rc::Rc;

use crate::foundation::math::Color;
use crate::render::api::HardwareRenderer;
use crate::render::material::Material;
use crate::render::pipeline::RenderContext;
use crate::render::render_queue::RenderQueues;
use crate::render::target::{ClearFlags, RenderTarget};
use crate::scene::{AsAny, Layer, Scene};

/// State handed to pass hooks
pub struct PassContext<'a> {
    /// Backend
    pub rhi: &'a mut dyn HardwareRenderer,
    /// Camera being rendered
    pub camera: &'a RenderContext<'a>,
    /// Scene being rendered
    pub scene: &'a Scene,
    /// Sorted queues of this frame
    pub queues: &'a RenderQueues,
    /// Target holding the result of the previous pass, if any was written
    pub previous_result: Option<&'a RenderTarget>,
    /// Target this pass writes; `None` is the canvas
    pub output: Option<&'a RenderTarget>,
    /// Name of the running pass
    pub pass_name: &'a str,
    /// Draw calls issued by the hook; added to the frame statistics
    pub draw_calls: usize,
}

/// Custom behavior of a pass
///
/// All hooks default to doing nothing. When [`overrides_render`] returns
/// true, [`render`] replaces the queue walk for that pass. Hooks can be
/// reached again through [`RenderPass::hooks_as`] to tweak their settings.
///
/// [`overrides_render`]: RenderPassHooks::overrides_render
/// [`render`]: RenderPassHooks::render
pub trait RenderPassHooks: AsAny {
    /// Runs before the output is bound
    fn pre_render(&mut self, _ctx: &mut PassContext<'_>) {}

    /// Whether [`RenderPassHooks::render`] replaces the default drawing
    fn overrides_render(&self) -> bool {
        false
    }

    /// Draws the pass after the output is bound and cleared
    fn render(&mut self, _ctx: &mut PassContext<'_>) {}

    /// Runs after the output is resolved
    fn post_render(&mut self, _ctx: &mut PassContext<'_>) {}

    /// Releases backend resources owned by the hooks
    ///
    /// Called once, from [`RenderPipeline::destroy`](crate::render::RenderPipeline::destroy).
    fn destroy(&mut self, _rhi: &mut dyn HardwareRenderer) {}
}

/// One step of a camera's frame
pub struct RenderPass {
    /// Pass name, unique by convention
    pub name: String,
    /// Disabled passes are skipped entirely
    pub enabled: bool,
    /// Sort key; lower runs first
    pub priority: i32,
    /// Material used instead of every element's own
    pub replace_material: Option<Rc<Material>>,
    /// Elements whose layer does not intersect the mask are not drawn
    pub mask: Layer,
    /// Clear flags; falls back to the camera's
    pub clear_flags: Option<ClearFlags>,
    /// Clear color; falls back to the scene background color
    pub clear_color: Option<Color>,
    /// Write the camera output even when this is not the last pass
    pub render_to_camera: bool,
    pub(crate) hooks: Option<Box<dyn RenderPassHooks>>,
}

impl std::fmt::Debug for RenderPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPass")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("priority", &self.priority)
            .field("mask", &self.mask)
            .field("clear_flags", &self.clear_flags)
            .field("render_to_camera", &self.render_to_camera)
            .field("has_hooks", &self.hooks.is_some())
            .finish()
    }
}

impl RenderPass {
    /// Create an enabled pass drawing every layer
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            priority,
            replace_material: None,
            mask: Layer::EVERYTHING,
            clear_flags: None,
            clear_color: None,
            render_to_camera: false,
            hooks: None,
        }
    }

    /// Attach hooks
    #[must_use]
    pub fn with_hooks(mut self, hooks: Box<dyn RenderPassHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Draw every element with this material
    #[must_use]
    pub fn with_replace_material(mut self, material: Rc<Material>) -> Self {
        self.replace_material = Some(material);
        self
    }

    /// Restrict drawing to these layers
    #[must_use]
    pub const fn with_mask(mut self, mask: Layer) -> Self {
        self.mask = mask;
        self
    }

    /// Override the camera's clear flags
    #[must_use]
    pub const fn with_clear_flags(mut self, flags: ClearFlags) -> Self {
        self.clear_flags = Some(flags);
        self
    }

    /// Override the clear color
    #[must_use]
    pub const fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = Some(color);
        self
    }

    /// Always write the camera output
    #[must_use]
    pub const fn with_render_to_camera(mut self, render_to_camera: bool) -> Self {
        self.render_to_camera = render_to_camera;
        self
    }

    /// Whether hooks replace the default drawing
    pub fn overrides_render(&self) -> bool {
        self.hooks.as_ref().is_some_and(|hooks| hooks.overrides_render())
    }

    /// Attached hooks
    pub fn hooks(&self) -> Option<&dyn RenderPassHooks> {
        self.hooks.as_deref()
    }

    /// Attached hooks as their concrete type
    pub fn hooks_as<T: RenderPassHooks>(&self) -> Option<&T> {
        let hooks: &dyn RenderPassHooks = self.hooks.as_deref()?;
        AsAny::as_any(hooks).downcast_ref::<T>()
    }

    /// Attached hooks as their concrete type, mutably
    pub fn hooks_as_mut<T: RenderPassHooks>(&mut self) -> Option<&mut T> {
        let hooks: &mut dyn RenderPassHooks = self.hooks.as_deref_mut()?;
        AsAny::as_any_mut(hooks).downcast_mut::<T>()
    }
}

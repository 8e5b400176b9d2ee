//! # Render Pipeline
//!
//! Runs one camera's frame: collect, sort, then execute every enabled pass
//! in priority order.
//!
//! ## Ping-pong targets
//!
//! The pipeline owns two intermediate targets, A and B. At the start of a
//! frame A is the "previous result". A pass that is neither the last
//! enabled pass nor forced to the camera writes the target that is not the
//! previous result, and that target becomes the previous result for the
//! next pass. The last enabled pass (and any pass with `render_to_camera`)
//! writes the camera output instead and leaves the previous result alone.
//! A pass therefore never reads the target it writes.
//!
//! Intermediate targets are created on first use and released by
//! [`RenderPipeline::destroy`].

use std::rc::Rc;

use crate::config::PipelineConfig;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::api::{BatchDraw, HardwareRenderer, ProgramHandle, ShaderDataGroup, Viewport};
use crate::render::background::BackgroundRenderer;
use crate::render::batching::{BatchAccumulator, BatchFlush, SpriteBatcher, SpriteMaskMode};
use crate::render::material::{Material, ShaderData};
use crate::render::render_pass::{PassContext, RenderPass};
use crate::render::render_queue::{ElementPrimitive, RenderElement, RenderQueue, RenderQueues};
use crate::render::render_state::RenderState;
use crate::render::shader::MacroSet;
use crate::render::target::{ClearFlags, RenderTarget, RenderTargetDescriptor};
use crate::render::RenderCollector;
use crate::scene::{Layer, Scene};

/// Name of the pass every pipeline starts with
pub const DEFAULT_PASS_NAME: &str = "default";

/// Per-camera inputs of one frame
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// World-to-view matrix
    pub view: Mat4,
    /// View-to-clip matrix
    pub projection: Mat4,
    /// World position of the camera
    pub camera_position: Vec3,
    /// Camera clear flags; passes may override them
    pub clear_flags: ClearFlags,
    /// Only nodes on these layers are collected
    pub culling_mask: Layer,
    /// Camera output; `None` is the canvas
    pub output: Option<&'a RenderTarget>,
    /// Viewport applied when binding targets
    pub viewport: Viewport,
    /// Mip level written by the last pass
    pub mip_level: u32,
    /// Camera-wide shader macros
    pub macros: &'a MacroSet,
}

/// Where a pass wrote its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutput {
    /// The camera output
    Camera,
    /// Intermediate target 0 (A) or 1 (B)
    Intermediate(usize),
}

/// Record of one executed pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRecord {
    /// Pass name
    pub name: String,
    /// Target written
    pub output: PassOutput,
    /// Intermediate target offered as the previous result
    pub input: Option<usize>,
    /// Whether hooks replaced the default drawing
    pub overridden: bool,
}

/// Counters of one rendered frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Elements collected into the queues
    pub elements: usize,
    /// Elements skipped for missing configuration or invalid programs
    pub skipped: usize,
    /// Draw calls issued
    pub draw_calls: usize,
    /// Batched draws among `draw_calls`
    pub batches: usize,
    /// Executed passes in order
    pub passes: Vec<PassRecord>,
}

/// Binding state shared by the draws of one pass
///
/// Programs, camera data, material data and render state are only sent to
/// the backend when they change.
#[derive(Debug, Default)]
pub(crate) struct DrawState {
    pub(crate) program: Option<ProgramHandle>,
    pub(crate) material: Option<Rc<Material>>,
    pub(crate) render_state: Option<RenderState>,
}

impl DrawState {
    /// Forget the bound program and material
    pub(crate) fn invalidate_program(&mut self) {
        self.program = None;
        self.material = None;
    }
}

/// Queue walker for one pass
struct QueueDrawer<'a> {
    rhi: &'a mut dyn HardwareRenderer,
    ctx: &'a RenderContext<'a>,
    camera_data: &'a ShaderData,
    renderer_data: &'a mut ShaderData,
    replace_material: Option<&'a Rc<Material>>,
    mask: Layer,
    state: DrawState,
    program_for_material: Option<(Rc<Material>, Option<ProgramHandle>)>,
    draw_calls: usize,
    batches: usize,
    skipped: usize,
}

impl QueueDrawer<'_> {
    fn draw_queue(&mut self, queue: &RenderQueue, batcher: &mut BatchAccumulator<SpriteBatcher>) {
        let elements = queue.elements();
        batcher.reset();
        for (index, element) in elements.iter().enumerate() {
            if !element.layer.visible_in(self.mask) {
                continue;
            }
            if element.primitive.is_batchable() {
                batcher.push(elements, index, &mut |flush: BatchFlush<'_, RenderElement>| {
                    self.draw_batch(&flush);
                });
            } else {
                batcher.flush(elements, &mut |flush: BatchFlush<'_, RenderElement>| {
                    self.draw_batch(&flush);
                });
                self.draw_mesh(element);
            }
        }
        batcher.flush(elements, &mut |flush: BatchFlush<'_, RenderElement>| {
            self.draw_batch(&flush);
        });
    }

    fn material_for(&self, element: &RenderElement) -> Rc<Material> {
        Rc::clone(self.replace_material.unwrap_or(&element.material))
    }

    /// Resolve and bind the program of a material; `None` skips the draw
    fn bind_material(&mut self, material: &Rc<Material>) -> Option<ProgramHandle> {
        let cached = self
            .program_for_material
            .as_ref()
            .filter(|(cached, _)| Rc::ptr_eq(cached, material))
            .map(|(_, program)| *program);
        let program = match cached {
            Some(program) => program,
            None => {
                let macros = self.ctx.macros.union(material.shader_data.macros());
                let program = material.shader.program(self.rhi, &macros);
                self.program_for_material = Some((Rc::clone(material), program));
                program
            }
        }?;

        if self.state.program != Some(program) {
            self.rhi.bind_program(program);
            self.rhi.upload_shader_data(ShaderDataGroup::Camera, self.camera_data);
            self.state.program = Some(program);
            self.state.material = None;
        }
        let uploaded = self
            .state
            .material
            .as_ref()
            .is_some_and(|last| Rc::ptr_eq(last, material));
        if !uploaded {
            self.rhi.upload_shader_data(ShaderDataGroup::Material, &material.shader_data);
            self.state.material = Some(Rc::clone(material));
        }
        Some(program)
    }

    fn draw_mesh(&mut self, element: &RenderElement) {
        let ElementPrimitive::Mesh { mesh, sub_mesh } = &element.primitive else {
            return;
        };
        if mesh.is_destroyed() {
            log::warn!("Mesh '{}' was destroyed; element skipped", mesh.name());
            self.skipped += 1;
            return;
        }
        let Some(sub_mesh) = mesh.sub_mesh(*sub_mesh) else {
            self.skipped += 1;
            return;
        };
        let material = self.material_for(element);
        let Some(program) = self.bind_material(&material) else {
            self.skipped += 1;
            return;
        };

        let model_view = self.ctx.view * element.world_matrix;
        self.renderer_data.set_matrix("u_modelMat", element.world_matrix);
        self.renderer_data.set_matrix("u_MVMat", model_view);
        self.renderer_data.set_matrix("u_MVPMat", self.ctx.projection * model_view);
        self.rhi.upload_shader_data(ShaderDataGroup::Renderer, &*self.renderer_data);

        material.render_state.apply(self.rhi, &mut self.state.render_state);
        self.rhi.draw_primitive(mesh.handle(), sub_mesh, program);
        self.draw_calls += 1;
    }

    fn draw_batch(&mut self, flush: &BatchFlush<'_, RenderElement>) {
        let first = flush.first;
        let ElementPrimitive::Sprite(quad) = &first.primitive else {
            return;
        };
        let material = self.material_for(first);
        let Some(program) = self.bind_material(&material) else {
            self.skipped += flush.element_count;
            return;
        };

        self.renderer_data.remove("u_modelMat");
        self.renderer_data.remove("u_MVMat");
        self.renderer_data.set_matrix("u_MVPMat", self.ctx.projection * self.ctx.view);
        match quad.texture {
            Some(texture) => self.renderer_data.set_texture("u_spriteTexture", texture),
            None => {
                self.renderer_data.remove("u_spriteTexture");
            }
        }
        self.renderer_data.set_float("u_alphaCutoff", quad.alpha_cutoff);
        self.rhi.upload_shader_data(ShaderDataGroup::Renderer, &*self.renderer_data);

        let state = match quad.mask {
            Some(mode) => RenderState::stencil_mask(mode == SpriteMaskMode::Add),
            None => material.render_state,
        };
        state.apply(self.rhi, &mut self.state.render_state);

        let draw = BatchDraw {
            layout: flush.layout,
            vertices: bytemuck::cast_slice(flush.vertices),
            vertex_count: flush.vertex_count,
            indices: flush.indices,
            element_count: flush.element_count,
        };
        self.rhi.draw_batch(&draw, program);
        self.draw_calls += 1;
        self.batches += 1;
    }
}

/// Per-camera render pipeline
pub struct RenderPipeline {
    config: PipelineConfig,
    queues: RenderQueues,
    passes: Vec<RenderPass>,
    targets: [Option<RenderTarget>; 2],
    previous: usize,
    pass_counter: u32,
    batcher: BatchAccumulator<SpriteBatcher>,
    background: BackgroundRenderer,
    camera_data: ShaderData,
    renderer_data: ShaderData,
    destroyed: bool,
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("passes", &self.passes)
            .field("previous", &self.previous)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl RenderPipeline {
    /// Create a pipeline holding only the default pass
    pub fn new(config: PipelineConfig) -> Self {
        let queues = RenderQueues::new(config.queue_bands, config.initial_queue_capacity);
        let batcher = BatchAccumulator::new(SpriteBatcher::new(), config.batch_max_vertices);
        let mut pipeline = Self {
            config,
            queues,
            passes: Vec::new(),
            targets: [None, None],
            previous: 0,
            pass_counter: 0,
            batcher,
            background: BackgroundRenderer::new(),
            camera_data: ShaderData::new(),
            renderer_data: ShaderData::new(),
            destroyed: false,
        };
        pipeline.add_render_pass(RenderPass::new(DEFAULT_PASS_NAME, 0));
        pipeline
    }

    /// Configuration
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Queues of the last rendered frame
    pub const fn queues(&self) -> &RenderQueues {
        &self.queues
    }

    // ---------------------------------------------------------------------
    // Passes
    // ---------------------------------------------------------------------

    /// Insert a pass after every pass with the same or lower priority
    pub fn add_render_pass(&mut self, pass: RenderPass) {
        let index = self.passes.partition_point(|existing| existing.priority <= pass.priority);
        log::debug!("Adding render pass '{}' (priority {}) at {}", pass.name, pass.priority, index);
        self.passes.insert(index, pass);
    }

    /// Create and insert an enabled pass named `RENDER_PASS{n}`
    pub fn create_render_pass(&mut self, priority: i32) -> &mut RenderPass {
        let name = self.next_pass_name();
        self.add_render_pass(RenderPass::new(name.clone(), priority));
        let index = self
            .passes
            .iter()
            .rposition(|pass| pass.name == name)
            .unwrap_or(self.passes.len() - 1);
        &mut self.passes[index]
    }

    /// Next generated pass name
    pub fn next_pass_name(&mut self) -> String {
        let name = format!("RENDER_PASS{}", self.pass_counter);
        self.pass_counter += 1;
        name
    }

    /// Remove the first pass with this name
    pub fn remove_render_pass(&mut self, name: &str) -> Option<RenderPass> {
        let index = self.passes.iter().position(|pass| pass.name == name)?;
        Some(self.passes.remove(index))
    }

    /// First pass with this name
    pub fn get_render_pass(&self, name: &str) -> Option<&RenderPass> {
        self.passes.iter().find(|pass| pass.name == name)
    }

    /// First pass with this name, mutably
    ///
    /// Changing `priority` through this reference does not re-sort; remove
    /// and re-add the pass instead.
    pub fn get_render_pass_mut(&mut self, name: &str) -> Option<&mut RenderPass> {
        self.passes.iter_mut().find(|pass| pass.name == name)
    }

    /// The default pass, unless it was removed
    pub fn default_render_pass(&self) -> Option<&RenderPass> {
        self.get_render_pass(DEFAULT_PASS_NAME)
    }

    /// The default pass, mutably
    pub fn default_render_pass_mut(&mut self) -> Option<&mut RenderPass> {
        self.get_render_pass_mut(DEFAULT_PASS_NAME)
    }

    /// Passes in execution order
    pub fn render_passes(&self) -> &[RenderPass] {
        &self.passes
    }

    /// Intermediate target `index` (0 = A, 1 = B), if created
    pub fn intermediate_target(&self, index: usize) -> Option<&RenderTarget> {
        self.targets.get(index).and_then(Option::as_ref)
    }

    /// Index of the intermediate target holding the previous result
    pub const fn previous_result_index(&self) -> usize {
        self.previous
    }

    // ---------------------------------------------------------------------
    // Frame
    // ---------------------------------------------------------------------

    /// Classify an element and push it into its queue
    pub fn push_element(&mut self, element: RenderElement) {
        self.queues.push_element(element);
    }

    /// Render one frame of `scene` for the camera described by `ctx`
    pub fn render(&mut self, ctx: &RenderContext<'_>, scene: &Scene, rhi: &mut dyn HardwareRenderer) -> FrameStats {
        let mut stats = FrameStats::default();
        if self.destroyed {
            log::warn!("Render called on a destroyed pipeline");
            return stats;
        }

        self.queues.clear();
        let (pushed, skipped) = self.collect(ctx, scene);
        stats.elements = pushed;
        stats.skipped = skipped;
        self.queues.sort();

        self.update_camera_data(ctx);
        self.previous = 0;

        let last_enabled = self.passes.iter().rposition(|pass| pass.enabled);
        for index in 0..self.passes.len() {
            if !self.passes[index].enabled {
                continue;
            }
            self.execute_pass(index, Some(index) == last_enabled, ctx, scene, rhi, &mut stats);
        }

        log::debug!(
            "Frame: {} elements, {} draw calls ({} batched), {} passes, {} skipped",
            stats.elements,
            stats.draw_calls,
            stats.batches,
            stats.passes.len(),
            stats.skipped
        );
        stats
    }

    fn collect(&mut self, ctx: &RenderContext<'_>, scene: &Scene) -> (usize, usize) {
        let mut collector = RenderCollector::new(&mut self.queues, ctx.view);
        scene.visit_renderables(ctx.culling_mask, |id, node, renderable| {
            let world = scene.world_matrix(id).unwrap_or_else(Mat4::identity);
            collector.bind_node(id, node.name(), node.layer(), world);
            renderable.collect(&mut collector);
        });
        (collector.pushed(), collector.skipped())
    }

    fn update_camera_data(&mut self, ctx: &RenderContext<'_>) {
        self.camera_data.set_matrix("u_viewMat", ctx.view);
        self.camera_data.set_matrix("u_projMat", ctx.projection);
        self.camera_data.set_matrix("u_VPMat", ctx.projection * ctx.view);
        self.camera_data.set_vector3("u_cameraPos", ctx.camera_position);
    }

    fn ensure_target(&mut self, index: usize, rhi: &mut dyn HardwareRenderer) -> bool {
        if self.targets[index].is_some() {
            return true;
        }
        let descriptor = RenderTargetDescriptor {
            msaa_samples: self.config.msaa_samples.max(1),
            generate_mipmaps: self.config.generate_mipmaps,
            ..RenderTargetDescriptor::new(self.config.intermediate_width, self.config.intermediate_height)
        };
        match RenderTarget::new(rhi, descriptor) {
            Ok(target) => {
                self.targets[index] = Some(target);
                true
            }
            Err(e) => {
                log::error!("Failed to create intermediate render target: {}", e);
                false
            }
        }
    }

    fn execute_pass(
        &mut self,
        index: usize,
        is_last: bool,
        ctx: &RenderContext<'_>,
        scene: &Scene,
        rhi: &mut dyn HardwareRenderer,
        stats: &mut FrameStats,
    ) {
        let previous = self.previous;
        let mut output = if is_last || self.passes[index].render_to_camera {
            PassOutput::Camera
        } else {
            PassOutput::Intermediate(1 - previous)
        };
        if let PassOutput::Intermediate(target) = output {
            if !self.ensure_target(target, rhi) {
                output = PassOutput::Camera;
            }
        }

        let Self {
            passes,
            targets,
            queues,
            batcher,
            background,
            camera_data,
            renderer_data,
            ..
        } = self;
        let pass = &mut passes[index];
        let overridden = pass.overrides_render();
        let previous_result = targets[previous].as_ref();
        let (output_target, mip_level) = match output {
            PassOutput::Camera => (ctx.output, ctx.mip_level),
            PassOutput::Intermediate(target) => (targets[target].as_ref(), 0),
        };

        let RenderPass {
            name,
            replace_material,
            mask,
            clear_flags,
            clear_color,
            hooks,
            ..
        } = pass;
        let name = name.as_str();
        log::trace!("Pass '{}' -> {:?}", name, output);

        let mut draw_calls = 0;
        if let Some(hooks) = hooks.as_deref_mut() {
            let mut pass_ctx = PassContext {
                rhi: &mut *rhi,
                camera: ctx,
                scene,
                queues: &*queues,
                previous_result,
                output: output_target,
                pass_name: name,
                draw_calls: 0,
            };
            hooks.pre_render(&mut pass_ctx);
            draw_calls += pass_ctx.draw_calls;
        }

        rhi.active_render_target(output_target.and_then(RenderTarget::handle), ctx.viewport, mip_level);
        let (surface_width, surface_height) = output_target.map_or_else(|| rhi.canvas_size(), RenderTarget::size);
        let (x, y, width, height) = ctx
            .viewport
            .to_pixels(mip_extent(surface_width, mip_level), mip_extent(surface_height, mip_level));
        rhi.viewport(x, y, width, height);
        let flags = clear_flags.unwrap_or(ctx.clear_flags);
        if !flags.is_empty() {
            let color = clear_color.unwrap_or(scene.background.solid_color);
            rhi.clear_render_target(flags, color);
        }

        match hooks.as_deref_mut() {
            Some(hooks) if overridden => {
                let mut pass_ctx = PassContext {
                    rhi: &mut *rhi,
                    camera: ctx,
                    scene,
                    queues: &*queues,
                    previous_result,
                    output: output_target,
                    pass_name: name,
                    draw_calls: 0,
                };
                hooks.render(&mut pass_ctx);
                draw_calls += pass_ctx.draw_calls;
            }
            _ => {
                let mut drawer = QueueDrawer {
                    rhi: &mut *rhi,
                    ctx,
                    camera_data: &*camera_data,
                    renderer_data,
                    replace_material: replace_material.as_ref(),
                    mask: *mask,
                    state: DrawState::default(),
                    program_for_material: None,
                    draw_calls: 0,
                    batches: 0,
                    skipped: 0,
                };
                drawer.draw_queue(&queues.opaque, batcher);
                drawer.draw_queue(&queues.alpha_test, batcher);
                if ctx.clear_flags.contains(ClearFlags::DEPTH_COLOR)
                    && background.draw(drawer.rhi, ctx, &scene.background, &mut drawer.state)
                {
                    drawer.draw_calls += 1;
                }
                drawer.draw_queue(&queues.transparent, batcher);

                draw_calls += drawer.draw_calls;
                stats.batches += drawer.batches;
                stats.skipped += drawer.skipped;
            }
        }

        if let Some(target) = output_target {
            target.finish(rhi);
        }

        if let Some(hooks) = hooks.as_deref_mut() {
            let mut pass_ctx = PassContext {
                rhi: &mut *rhi,
                camera: ctx,
                scene,
                queues: &*queues,
                previous_result,
                output: output_target,
                pass_name: name,
                draw_calls: 0,
            };
            hooks.post_render(&mut pass_ctx);
            draw_calls += pass_ctx.draw_calls;
        }

        stats.draw_calls += draw_calls;
        stats.passes.push(PassRecord {
            name: name.to_string(),
            output,
            input: previous_result.map(|_| previous),
            overridden,
        });

        if let PassOutput::Intermediate(target) = output {
            self.previous = target;
        }
    }

    /// Release the intermediate targets, the background quad and the
    /// resources of every pass's hooks; returns `false` if already destroyed
    pub fn destroy(&mut self, rhi: &mut dyn HardwareRenderer) -> bool {
        if self.destroyed {
            return false;
        }
        for target in self.targets.iter_mut().flatten() {
            target.destroy(rhi);
        }
        self.targets = [None, None];
        self.background.destroy(rhi);
        for pass in &mut self.passes {
            if let Some(hooks) = pass.hooks.as_deref_mut() {
                hooks.destroy(rhi);
            }
        }
        self.queues.clear();
        self.destroyed = true;
        log::debug!("Render pipeline destroyed");
        true
    }

    /// Whether [`RenderPipeline::destroy`] ran
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

/// Size of one dimension at a mip level, never below one pixel
fn mip_extent(extent: u32, mip_level: u32) -> u32 {
    extent.checked_shr(mip_level).unwrap_or(0).max(1)
}

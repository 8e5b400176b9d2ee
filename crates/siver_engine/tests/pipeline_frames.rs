//! Whole-frame tests of the render pipeline against the recording backend

use std::cell::RefCell;
use std::rc::Rc;

use siver_engine::backend::{RecordingRenderer, RhiCommand};
use siver_engine::config::PipelineConfig;
use siver_engine::foundation::logging;
use siver_engine::foundation::math::{Color, Vec3};
use siver_engine::render::{
    BackgroundMode, BackgroundTexture, Camera, ClearFlags, Material, Mesh, MeshData, MeshHandle, MeshRenderer,
    PassContext, PassOutput, PostEffect, PostEffectPass, ProgramHandle, RenderPass, RenderPassHooks, Shader,
    ShaderDataGroup, ShaderValue, SpriteRenderer, TextureHandle, Viewport,
};
use siver_engine::scene::{Layer, NodeId, Scene};

struct Fixture {
    scene: Scene,
    rhi: RecordingRenderer,
    camera: Camera,
}

impl Fixture {
    fn new() -> Self {
        logging::init();
        let mut scene = Scene::new("frames");
        let camera_node = scene.create_root_node("camera");
        scene.set_position(camera_node, Vec3::new(0.0, 0.0, 10.0));
        let camera = Camera::new(&mut scene, camera_node, PipelineConfig::default()).unwrap();
        Self {
            scene,
            rhi: RecordingRenderer::new(800, 600),
            camera,
        }
    }

    fn render(&mut self) -> siver_engine::render::FrameStats {
        self.camera.render(&self.scene, &mut self.rhi)
    }

    fn spawn_mesh(&mut self, name: &str, z: f32, material: &Rc<Material>) -> NodeId {
        let mesh = Rc::new(Mesh::new(&mut self.rhi, name, &MeshData::cube(0.5)).unwrap());
        let node = self.scene.create_root_node(name);
        self.scene.set_position(node, Vec3::new(0.0, 0.0, z));
        self.scene
            .add_component(node, MeshRenderer::new(mesh, Rc::clone(material)))
            .unwrap();
        node
    }

    fn spawn_sprite(&mut self, name: &str, z: f32, material: &Rc<Material>, texture: u64) -> NodeId {
        let node = self.scene.create_root_node(name);
        self.scene.set_position(node, Vec3::new(0.0, 0.0, z));
        let sprite = SpriteRenderer {
            texture: Some(TextureHandle(texture)),
            ..SpriteRenderer::new(Rc::clone(material), 1.0, 1.0)
        };
        self.scene.add_component(node, sprite).unwrap();
        node
    }

    fn count(&self, predicate: impl Fn(&RhiCommand) -> bool) -> usize {
        self.rhi.commands().iter().filter(|&command| predicate(command)).count()
    }

    fn program_of(&self, vertex_source: &str) -> Option<ProgramHandle> {
        self.rhi.commands().iter().find_map(|command| match command {
            RhiCommand::CompileProgram { vertex, program, .. } if vertex == vertex_source => *program,
            _ => None,
        })
    }

    fn drawn_programs(&self) -> Vec<ProgramHandle> {
        self.rhi
            .commands()
            .iter()
            .filter_map(|command| match command {
                RhiCommand::DrawPrimitive { program, .. } | RhiCommand::DrawBatch { program, .. } => Some(*program),
                _ => None,
            })
            .collect()
    }
}

fn material(name: &str, queue: i32) -> Rc<Material> {
    let shader = Rc::new(Shader::new(name, format!("{}_vs", name), "fs"));
    Rc::new(Material::new(name, shader).with_render_queue(queue))
}

#[derive(Default)]
struct HookLog {
    entries: RefCell<Vec<String>>,
}

struct HookRecorder {
    log: Rc<HookLog>,
    overrides: bool,
}

impl HookRecorder {
    fn record(&self, entry: String) {
        self.log.entries.borrow_mut().push(entry);
    }
}

impl RenderPassHooks for HookRecorder {
    fn pre_render(&mut self, ctx: &mut PassContext<'_>) {
        self.record(format!("pre {}", ctx.pass_name));
    }

    fn overrides_render(&self) -> bool {
        self.overrides
    }

    fn render(&mut self, ctx: &mut PassContext<'_>) {
        self.record(format!(
            "render {} previous={} queued={}",
            ctx.pass_name,
            ctx.previous_result.is_some(),
            ctx.queues.len()
        ));
    }

    fn post_render(&mut self, ctx: &mut PassContext<'_>) {
        self.record(format!("post {}", ctx.pass_name));
    }
}

#[test]
fn test_passes_run_in_priority_order() {
    let mut f = Fixture::new();
    let pipeline = f.camera.pipeline_mut();
    pipeline.add_render_pass(RenderPass::new("late", 1));
    pipeline.add_render_pass(RenderPass::new("early", -1));

    let stats = f.render();
    let names: Vec<&str> = stats.passes.iter().map(|record| record.name.as_str()).collect();
    assert_eq!(names, ["early", "default", "late"]);

    let priorities: Vec<i32> = f.camera.pipeline().render_passes().iter().map(|pass| pass.priority).collect();
    assert!(priorities.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn test_equal_priorities_keep_insertion_order() {
    let mut f = Fixture::new();
    let pipeline = f.camera.pipeline_mut();
    pipeline.add_render_pass(RenderPass::new("first", 0));
    pipeline.add_render_pass(RenderPass::new("second", 0));

    let names: Vec<&str> = f
        .camera
        .pipeline()
        .render_passes()
        .iter()
        .map(|pass| pass.name.as_str())
        .collect();
    assert_eq!(names, ["default", "first", "second"]);
}

#[test]
fn test_intermediate_targets_ping_pong() {
    let mut f = Fixture::new();
    let pipeline = f.camera.pipeline_mut();
    pipeline.add_render_pass(RenderPass::new("early", -1));
    pipeline.add_render_pass(RenderPass::new("late", 1));

    let stats = f.render();
    let outputs: Vec<PassOutput> = stats.passes.iter().map(|record| record.output).collect();
    assert_eq!(
        outputs,
        [PassOutput::Intermediate(1), PassOutput::Intermediate(0), PassOutput::Camera]
    );
    let inputs: Vec<Option<usize>> = stats.passes.iter().map(|record| record.input).collect();
    assert_eq!(inputs, [None, Some(1), Some(0)]);

    for record in &stats.passes {
        if let (PassOutput::Intermediate(written), Some(read)) = (record.output, record.input) {
            assert_ne!(written, read, "pass '{}' read its own output", record.name);
        }
    }
    for pair in stats.passes.windows(2) {
        if let PassOutput::Intermediate(written) = pair[0].output {
            assert_eq!(pair[1].input, Some(written));
        }
    }
    assert_eq!(f.count(|c| matches!(c, RhiCommand::CreateRenderTarget { .. })), 2);
}

#[test]
fn test_single_pass_writes_camera_directly() {
    let mut f = Fixture::new();
    let stats = f.render();

    assert_eq!(stats.passes.len(), 1);
    assert_eq!(stats.passes[0].output, PassOutput::Camera);
    assert_eq!(f.count(|c| matches!(c, RhiCommand::CreateRenderTarget { .. })), 0);
    assert!(f
        .rhi
        .commands()
        .iter()
        .any(|c| matches!(c, RhiCommand::ActiveRenderTarget { target: None, .. })));
}

#[test]
fn test_forced_camera_pass_leaves_previous_result() {
    let mut f = Fixture::new();
    f.camera
        .pipeline_mut()
        .add_render_pass(RenderPass::new("overlay", -1).with_render_to_camera(true));

    let stats = f.render();
    assert!(stats.passes.iter().all(|record| record.output == PassOutput::Camera));
    assert_eq!(f.camera.pipeline().previous_result_index(), 0);
    assert!(f.camera.pipeline().intermediate_target(1).is_none());
}

#[test]
fn test_disabled_last_pass_hands_camera_to_previous() {
    let mut f = Fixture::new();
    let mut late = RenderPass::new("late", 1);
    late.enabled = false;
    f.camera.pipeline_mut().add_render_pass(late);

    let stats = f.render();
    assert_eq!(stats.passes.len(), 1);
    assert_eq!(stats.passes[0].name, "default");
    assert_eq!(stats.passes[0].output, PassOutput::Camera);
}

#[test]
fn test_hooks_run_around_overridden_render() {
    let mut f = Fixture::new();
    let opaque = material("opaque", 1000);
    f.spawn_mesh("cube", 0.0, &opaque);
    let log = Rc::new(HookLog::default());
    let recorder = HookRecorder {
        log: Rc::clone(&log),
        overrides: true,
    };
    f.camera
        .pipeline_mut()
        .add_render_pass(RenderPass::new("hooked", 1).with_hooks(Box::new(recorder)));

    let stats = f.render();

    assert_eq!(
        *log.entries.borrow(),
        ["pre hooked", "render hooked previous=true queued=1", "post hooked"]
    );
    assert!(stats.passes[1].overridden);
    // only the default pass drew the cube
    assert_eq!(f.count(|c| matches!(c, RhiCommand::DrawPrimitive { .. })), 1);
}

#[test]
fn test_hooks_of_plain_pass_do_not_replace_drawing() {
    let mut f = Fixture::new();
    let opaque = material("opaque", 1000);
    f.spawn_mesh("cube", 0.0, &opaque);
    let log = Rc::new(HookLog::default());
    f.camera.pipeline_mut().add_render_pass(
        RenderPass::new("hooked", 1).with_hooks(Box::new(HookRecorder {
            log: Rc::clone(&log),
            overrides: false,
        })),
    );

    f.render();
    assert_eq!(*log.entries.borrow(), ["pre hooked", "post hooked"]);
    assert_eq!(f.count(|c| matches!(c, RhiCommand::DrawPrimitive { .. })), 2);

    let hooks = f.camera.pipeline().get_render_pass("hooked").unwrap().hooks_as::<HookRecorder>();
    assert!(hooks.is_some());
}

#[test]
fn test_opaque_near_to_far_transparent_far_to_near() {
    let mut f = Fixture::new();
    let opaque = material("opaque", 1000);
    let glass = material("glass", 3000);
    f.spawn_mesh("far-opaque", 5.0, &opaque);
    f.spawn_mesh("near-opaque", 8.0, &opaque);
    f.spawn_mesh("near-glass", 8.0, &glass);
    f.spawn_mesh("far-glass", 5.0, &glass);

    let stats = f.render();
    assert_eq!(stats.elements, 4);

    let queues = f.camera.pipeline().queues();
    let opaque_depths: Vec<f32> = queues.opaque.elements().iter().map(|e| e.depth.round()).collect();
    let glass_depths: Vec<f32> = queues.transparent.elements().iter().map(|e| e.depth.round()).collect();
    assert_eq!(opaque_depths, [2.0, 5.0]);
    assert_eq!(glass_depths, [5.0, 2.0]);

    let opaque_program = f.program_of("opaque_vs").unwrap();
    let glass_program = f.program_of("glass_vs").unwrap();
    assert_eq!(
        f.drawn_programs(),
        [opaque_program, opaque_program, glass_program, glass_program]
    );
}

#[test]
fn test_layer_masks_filter_collection_and_drawing() {
    let mut f = Fixture::new();
    let opaque = material("opaque", 1000);
    let node = f.spawn_mesh("cube", 0.0, &opaque);
    f.scene.set_layer(node, Layer::LAYER1);

    f.camera.culling_mask = Layer::LAYER0;
    assert_eq!(f.render().elements, 0);

    f.camera.culling_mask = Layer::EVERYTHING;
    f.camera.pipeline_mut().default_render_pass_mut().unwrap().mask = Layer::LAYER0;
    f.rhi.clear_commands();
    let stats = f.render();
    assert_eq!(stats.elements, 1);
    assert_eq!(stats.draw_calls, 0);
}

#[test]
fn test_inactive_nodes_are_not_collected() {
    let mut f = Fixture::new();
    let opaque = material("opaque", 1000);
    let node = f.spawn_mesh("cube", 0.0, &opaque);
    f.scene.set_active(node, false);

    assert_eq!(f.render().elements, 0);
}

#[test]
fn test_sprites_sharing_state_batch_together() {
    let mut f = Fixture::new();
    let sprite = material("sprite", 3000);
    f.spawn_sprite("a", 1.0, &sprite, 7);
    f.spawn_sprite("b", 2.0, &sprite, 7);
    f.spawn_sprite("c", 3.0, &sprite, 7);

    let stats = f.render();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.batches, 1);
    assert!(f.rhi.commands().iter().any(|c| matches!(
        c,
        RhiCommand::DrawBatch {
            element_count: 3,
            vertex_count: 12,
            index_count: 18,
            ..
        }
    )));
}

#[test]
fn test_texture_change_splits_batch_without_reordering() {
    let mut f = Fixture::new();
    let sprite = material("sprite", 3000);
    f.spawn_sprite("far", 1.0, &sprite, 7);
    f.spawn_sprite("middle", 2.0, &sprite, 8);
    f.spawn_sprite("near", 3.0, &sprite, 7);

    let stats = f.render();
    assert_eq!(stats.batches, 3);
    let textures: Vec<ShaderValue> = f
        .rhi
        .commands()
        .iter()
        .filter_map(|c| match c {
            RhiCommand::UploadShaderData {
                group: ShaderDataGroup::Renderer,
                data,
            } => data.get("u_spriteTexture").copied(),
            _ => None,
        })
        .collect();
    assert_eq!(
        textures,
        [
            ShaderValue::Texture(TextureHandle(7)),
            ShaderValue::Texture(TextureHandle(8)),
            ShaderValue::Texture(TextureHandle(7)),
        ]
    );
}

#[test]
fn test_mesh_between_sprites_flushes_batch() {
    let mut f = Fixture::new();
    let glass = material("glass", 3000);
    f.spawn_sprite("far", 1.0, &glass, 7);
    f.spawn_mesh("middle", 2.0, &glass);
    f.spawn_sprite("near", 3.0, &glass, 7);

    let stats = f.render();
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.draw_calls, 3);
}

#[test]
fn test_sky_drawn_between_opaque_and_transparent() {
    let mut f = Fixture::new();
    let opaque = material("opaque", 1000);
    let glass = material("glass", 3000);
    f.spawn_mesh("cube", 0.0, &opaque);
    f.spawn_mesh("pane", 0.0, &glass);
    let sky_mesh = Rc::new(Mesh::new(&mut f.rhi, "sky", &MeshData::cube(1.0)).unwrap());
    f.scene.background.mode = BackgroundMode::Sky;
    f.scene.background.sky.mesh = Some(sky_mesh);
    f.scene.background.sky.material = Some(material("sky", 1000));

    let stats = f.render();
    assert_eq!(stats.draw_calls, 3);
    let sky_program = f.program_of("sky_vs").unwrap();
    assert_eq!(f.drawn_programs()[1], sky_program);
    assert!(f.rhi.commands().iter().any(|c| matches!(
        c,
        RhiCommand::UploadShaderData { group: ShaderDataGroup::Renderer, data }
            if data.get("u_mvpNoscale").is_some()
    )));

    f.camera.clear_flags = ClearFlags::DEPTH;
    f.rhi.clear_commands();
    assert_eq!(f.render().draw_calls, 2);
}

#[test]
fn test_sky_without_material_is_skipped() {
    let mut f = Fixture::new();
    f.scene.background.mode = BackgroundMode::Sky;

    let stats = f.render();
    assert_eq!(stats.draw_calls, 0);
}

#[test]
fn test_background_quad_resized_only_when_canvas_changes() {
    let mut f = Fixture::new();
    f.scene.background.mode = BackgroundMode::Texture;
    f.scene.background.texture = Some(BackgroundTexture {
        texture: TextureHandle(42),
        width: 512,
        height: 256,
    });
    f.scene.background.texture_material = Some(material("background", 1000));
    let resizes = |f: &Fixture| f.count(|c| matches!(c, RhiCommand::UpdateMeshPositions { .. }));

    assert_eq!(f.render().draw_calls, 1);
    f.render();
    assert_eq!(resizes(&f), 1);

    f.rhi.set_canvas_size(1024, 768);
    f.render();
    assert_eq!(resizes(&f), 2);
}

#[test]
fn test_clear_uses_pass_color_or_background() {
    let mut f = Fixture::new();
    f.render();
    assert!(f.rhi.commands().iter().any(|c| matches!(
        c,
        RhiCommand::Clear { flags, color }
            if *flags == ClearFlags::DEPTH_COLOR && *color == Color::new(0.25, 0.25, 0.25, 1.0)
    )));

    let pass = f.camera.pipeline_mut().default_render_pass_mut().unwrap();
    pass.clear_color = Some(Color::BLACK);
    pass.clear_flags = Some(ClearFlags::DEPTH);
    f.rhi.clear_commands();
    f.render();
    assert!(f.rhi.commands().iter().any(|c| matches!(
        c,
        RhiCommand::Clear { flags, color } if *flags == ClearFlags::DEPTH && *color == Color::BLACK
    )));
}

#[test]
fn test_replacement_material_draws_everything() {
    let mut f = Fixture::new();
    let opaque = material("opaque", 1000);
    let glass = material("glass", 3000);
    f.spawn_mesh("cube", 0.0, &opaque);
    f.spawn_mesh("pane", 1.0, &glass);
    f.camera.pipeline_mut().default_render_pass_mut().unwrap().replace_material = Some(material("depth", 1000));

    f.render();
    let depth_program = f.program_of("depth_vs").unwrap();
    assert_eq!(f.drawn_programs(), [depth_program, depth_program]);
    assert!(f.program_of("opaque_vs").is_none());
}

#[test]
fn test_invalid_program_skips_draw_and_compiles_once() {
    let mut f = Fixture::new();
    f.rhi.fail_shader("broken_vs");
    let broken = material("broken", 1000);
    f.spawn_mesh("cube", 0.0, &broken);

    let first = f.render();
    let second = f.render();
    assert_eq!(first.skipped, 1);
    assert_eq!(second.skipped, 1);
    assert_eq!(first.draw_calls, 0);
    assert_eq!(f.count(|c| matches!(c, RhiCommand::CompileProgram { .. })), 1);
}

#[test]
fn test_post_effect_samples_previous_result() {
    let mut f = Fixture::new();
    let opaque = material("opaque", 1000);
    f.spawn_mesh("cube", 0.0, &opaque);
    let effect = PostEffect::new(&mut f.rhi, Rc::new(Shader::new("post", "post_vs", "fs"))).unwrap();
    f.camera
        .pipeline_mut()
        .add_render_pass(PostEffectPass::new(effect).into_render_pass("post", 1));

    let stats = f.render();
    assert_eq!(stats.passes[0].output, PassOutput::Intermediate(1));
    assert_eq!(stats.passes[1].output, PassOutput::Camera);
    assert_eq!(stats.passes[1].input, Some(1));
    assert!(stats.passes[1].overridden);
    assert_eq!(stats.draw_calls, 2);

    let sampled = f.camera.pipeline().intermediate_target(1).unwrap().color_texture();
    assert!(f.rhi.commands().iter().any(|c| matches!(
        c,
        RhiCommand::UploadShaderData { group: ShaderDataGroup::Renderer, data }
            if data.get("u_baseTexture") == Some(&ShaderValue::Texture(sampled))
    )));

    let post = f.camera.pipeline_mut().get_render_pass_mut("post").unwrap();
    post.hooks_as_mut::<PostEffectPass>().unwrap().effect_mut().set_brightness(2.0);
    assert_eq!(
        f.camera
            .pipeline()
            .get_render_pass("post")
            .and_then(|pass| pass.hooks_as::<PostEffectPass>())
            .map(|pass| pass.effect().brightness()),
        Some(2.0)
    );
}

#[test]
fn test_failed_target_creation_falls_back_to_camera() {
    let mut f = Fixture::new();
    f.rhi.set_fail_render_targets(true);
    f.camera.pipeline_mut().add_render_pass(RenderPass::new("late", 1));

    let stats = f.render();
    assert!(stats.passes.iter().all(|record| record.output == PassOutput::Camera));
}

#[test]
fn test_msaa_targets_resolved_after_each_write() {
    let mut scene = Scene::new("msaa");
    let node = scene.create_root_node("camera");
    let config = PipelineConfig {
        msaa_samples: 4,
        generate_mipmaps: true,
        ..PipelineConfig::default()
    };
    let mut camera = Camera::new(&mut scene, node, config).unwrap();
    camera.pipeline_mut().add_render_pass(RenderPass::new("late", 1));
    let mut rhi = RecordingRenderer::new(64, 64);

    camera.render(&scene, &mut rhi);
    let blits = rhi.commands().iter().filter(|c| matches!(c, RhiCommand::BlitRenderTarget(_))).count();
    let mips = rhi.commands().iter().filter(|c| matches!(c, RhiCommand::GenerateMipmaps(_))).count();
    assert_eq!(blits, 1);
    assert_eq!(mips, 1);
}

#[test]
fn test_pipeline_destroy_releases_targets_once() {
    let mut f = Fixture::new();
    let pipeline = f.camera.pipeline_mut();
    pipeline.add_render_pass(RenderPass::new("early", -1));
    pipeline.add_render_pass(RenderPass::new("late", 1));
    f.render();

    assert!(f.camera.pipeline_mut().destroy(&mut f.rhi));
    assert!(!f.camera.pipeline_mut().destroy(&mut f.rhi));
    assert_eq!(f.count(|c| matches!(c, RhiCommand::DestroyRenderTarget(_))), 2);

    f.rhi.clear_commands();
    let stats = f.render();
    assert!(stats.passes.is_empty());
    assert!(f.rhi.commands().is_empty());
}

#[test]
fn test_removed_pass_is_not_run() {
    let mut f = Fixture::new();
    let name = f.camera.pipeline_mut().create_render_pass(1).name.clone();
    assert_eq!(name, "RENDER_PASS0");
    assert!(f.camera.pipeline_mut().remove_render_pass(&name).is_some());
    assert!(f.camera.pipeline_mut().remove_render_pass(&name).is_none());
    assert!(f.camera.pipeline().get_render_pass("missing").is_none());

    assert_eq!(f.render().passes.len(), 1);
}

#[test]
fn test_camera_destroy_releases_each_created_resource_once() {
    let mut f = Fixture::new();
    f.scene.background.mode = BackgroundMode::Texture;
    f.scene.background.texture = Some(BackgroundTexture {
        texture: TextureHandle(42),
        width: 512,
        height: 256,
    });
    f.scene.background.texture_material = Some(material("background", 1000));
    let effect = PostEffect::new(&mut f.rhi, Rc::new(Shader::new("post", "post_vs", "fs"))).unwrap();
    f.camera
        .pipeline_mut()
        .add_render_pass(PostEffectPass::new(effect).into_render_pass("post", 1));
    f.render();

    assert!(f.camera.destroy(&mut f.scene, &mut f.rhi));
    let released = f.rhi.commands().len();
    assert!(!f.camera.destroy(&mut f.scene, &mut f.rhi));
    assert_eq!(f.rhi.commands().len(), released);

    let created_meshes: Vec<MeshHandle> = f
        .rhi
        .commands()
        .iter()
        .filter_map(|c| match c {
            RhiCommand::CreateMesh { mesh, .. } => Some(*mesh),
            _ => None,
        })
        .collect();
    let released_meshes: Vec<MeshHandle> = f
        .rhi
        .commands()
        .iter()
        .filter_map(|c| match c {
            RhiCommand::DestroyMesh(mesh) => Some(*mesh),
            _ => None,
        })
        .collect();
    assert_eq!(created_meshes.len(), 2);
    assert_eq!(released_meshes.len(), created_meshes.len());
    for mesh in &created_meshes {
        assert_eq!(released_meshes.iter().filter(|released| *released == mesh).count(), 1);
    }
    assert_eq!(
        f.count(|c| matches!(c, RhiCommand::CreateRenderTarget { .. })),
        f.count(|c| matches!(c, RhiCommand::DestroyRenderTarget(_)))
    );
}

#[test]
fn test_destroyed_mesh_is_skipped() {
    let mut f = Fixture::new();
    let opaque = material("opaque", 1000);
    let mesh = Rc::new(Mesh::new(&mut f.rhi, "cube", &MeshData::cube(0.5)).unwrap());
    let node = f.scene.create_root_node("cube");
    f.scene
        .add_component(node, MeshRenderer::new(Rc::clone(&mesh), opaque))
        .unwrap();

    assert_eq!(f.render().draw_calls, 1);
    assert!(mesh.destroy(&mut f.rhi));
    f.rhi.clear_commands();

    let stats = f.render();
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(stats.skipped, 1);
    assert_eq!(f.rhi.draw_call_count(), 0);
}

#[test]
fn test_viewport_set_in_pixels_after_binding() {
    let mut f = Fixture::new();
    f.camera.viewport = Viewport {
        x: 0.5,
        y: 0.0,
        width: 0.5,
        height: 1.0,
    };
    f.render();

    let commands = f.rhi.commands();
    let bind = commands
        .iter()
        .position(|c| matches!(c, RhiCommand::ActiveRenderTarget { target: None, .. }))
        .unwrap();
    assert_eq!(
        commands[bind + 1],
        RhiCommand::Viewport {
            x: 400,
            y: 0,
            width: 400,
            height: 600,
        }
    );
}

//! Headless scene viewer
//!
//! Builds a small scene (a spinning cube, a row of sprites, a sky and a post
//! effect), renders it against the recording backend for a fixed number of
//! frames and logs what each frame did.
//!
//! Usage: `siver_viewer [config.toml|config.ron]`

use std::rc::Rc;

use siver_engine::foundation::logging;
use siver_engine::prelude::*;
use siver_engine::render::{PassOutput, RenderQueueType, TextureHandle};

const DEFAULT_FRAMES: u64 = 120;
const LOG_EVERY: u64 = 30;

/// Rotates its node around the Y axis
struct Spinner {
    degrees_per_second: f32,
    angle: f32,
}

impl Component for Spinner {
    fn on_enable(&mut self, ctx: &mut ComponentContext<'_>) {
        logging::debug!("Spinner enabled on node {:?}", ctx.node);
    }

    fn on_update(&mut self, ctx: &mut ComponentContext<'_>, delta_time: f32) {
        self.angle = (self.angle + self.degrees_per_second * delta_time) % 360.0;
        ctx.scene.set_rotation(ctx.node, Vec3::new(15.0, self.angle, 0.0));
    }
}

struct ViewerApp {
    frames_logged: u64,
    wall_clock: Stopwatch,
}

impl ViewerApp {
    fn build_scene(engine: &mut Engine) -> Result<(), AppError> {
        let camera_node = engine.scene.create_root_node("camera");
        engine.scene.set_position(camera_node, Vec3::new(0.0, 1.0, 6.0));
        let camera = engine.create_camera(camera_node)?;

        let lit = Rc::new(Shader::new("lit", "lit_vs", "lit_fs"));
        let cube_material = Rc::new(
            Material::new("cube", Rc::clone(&lit)).with_color(Color::new(0.8, 0.7, 0.5, 1.0)),
        );
        let cube_mesh = Rc::new(
            Mesh::new(engine.rhi_mut(), "cube", &MeshData::cube(0.5))
                .map_err(|e| AppError::Engine(e.into()))?,
        );
        let cube = engine.scene.create_root_node("cube");
        engine.scene.add_component(cube, MeshRenderer::new(cube_mesh, cube_material))?;
        engine.scene.add_component(
            cube,
            Spinner {
                degrees_per_second: 45.0,
                angle: 0.0,
            },
        )?;

        let sprite_shader = Rc::new(Shader::new("sprite", "sprite_vs", "sprite_fs"));
        let sprite_material = Rc::new(Material::new("sprite", sprite_shader).with_queue_type(RenderQueueType::Transparent));
        let row = engine.scene.create_root_node("sprites");
        engine.scene.set_position(row, Vec3::new(0.0, -1.0, 0.0));
        for i in 0..5u8 {
            let sprite = engine.scene.create_child(row, format!("sprite{}", i))?;
            engine
                .scene
                .set_position(sprite, Vec3::new(f32::from(i) - 2.0, 0.0, -f32::from(i) * 0.1));
            engine.scene.add_component(
                sprite,
                SpriteRenderer {
                    texture: Some(TextureHandle(1)),
                    ..SpriteRenderer::new(Rc::clone(&sprite_material), 0.8, 0.8)
                },
            )?;
        }

        let sky_mesh = Mesh::new(engine.rhi_mut(), "sky", &MeshData::cube(50.0))
            .map_err(|e| AppError::Engine(e.into()))?;
        let sky_shader = Rc::new(Shader::new("sky", "sky_vs", "sky_fs"));
        engine.scene.background.mode = BackgroundMode::Sky;
        engine.scene.background.sky.mesh = Some(Rc::new(sky_mesh));
        engine.scene.background.sky.material = Some(Rc::new(Material::new("sky", sky_shader)));

        let post_shader = Rc::new(Shader::new("post", "post_vs", "post_fs"));
        let mut effect = PostEffect::new(engine.rhi_mut(), post_shader).map_err(|e| AppError::Engine(e.into()))?;
        effect.set_contrast(1.1);
        effect.set_bloom_intensity(0.3);
        if let Some(camera) = engine.camera_mut(camera) {
            camera
                .pipeline_mut()
                .add_render_pass(PostEffectPass::new(effect).into_render_pass("post", 1));
        }

        logging::info!(
            "Scene '{}' built: {} nodes, {} components",
            engine.scene.name(),
            engine.scene.node_count(),
            engine.scene.component_count()
        );
        Ok(())
    }
}

impl Application for ViewerApp {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        Self::build_scene(engine)?;
        self.wall_clock.start();
        Ok(())
    }

    fn frame_rendered(&mut self, engine: &mut Engine, stats: &[FrameStats]) -> Result<(), AppError> {
        let frame = engine.frame_count();
        if frame % LOG_EVERY != 1 {
            return Ok(());
        }
        for (index, camera) in stats.iter().enumerate() {
            let offscreen = camera
                .passes
                .iter()
                .filter(|pass| matches!(pass.output, PassOutput::Intermediate(_)))
                .count();
            logging::info!(
                "Frame {} camera {}: {} elements, {} draw calls ({} batched), {} passes ({} offscreen), {} skipped",
                frame,
                index,
                camera.elements,
                camera.draw_calls,
                camera.batches,
                camera.passes.len(),
                offscreen,
                camera.skipped
            );
        }
        self.frames_logged += 1;
        Ok(())
    }

    fn cleanup(&mut self, engine: &mut Engine) {
        self.wall_clock.stop();
        logging::info!(
            "Rendered {} frames in {:.1}ms, {:.1} fps average ({} summaries)",
            engine.frame_count(),
            self.wall_clock.elapsed_millis(),
            engine.timer().average_fps(),
            self.frames_logged
        );
    }
}

fn load_config() -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            logging::info!("Loading configuration from {}", path);
            EngineConfig::load_from_file(&path)?
        }
        None => EngineConfig::default(),
    };
    if config.max_frames.is_none() {
        config.max_frames = Some(DEFAULT_FRAMES);
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default("info");

    logging::info!("Starting Siver viewer");
    let config = load_config()?;
    let rhi = RecordingRenderer::new(config.window.width, config.window.height);
    let mut engine = Engine::new(config, Box::new(rhi));
    engine.run(&mut ViewerApp {
        frames_logged: 0,
        wall_clock: Stopwatch::new(),
    })?;
    Ok(())
}

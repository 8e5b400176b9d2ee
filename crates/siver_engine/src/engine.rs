//! Core engine implementation

use crate::{
    application::Application,
    config::{ConfigError, EngineConfig},
    foundation::time::Timer,
    render::{Camera, FrameStats, HardwareRenderer, RenderError},
    scene::{NodeId, Scene, SceneError},
};
use thiserror::Error;

/// Main engine struct
///
/// The engine owns the scene, the cameras and the backend, and drives the
/// frame loop: `update(dt)` runs component updates, `render()` renders every
/// camera. Clearing the running flag ends [`Engine::run`] after the current
/// frame.
pub struct Engine {
    /// Scene being simulated and rendered
    pub scene: Scene,

    /// Cameras in render order
    cameras: Vec<Camera>,

    /// Backend every camera renders through
    rhi: Box<dyn HardwareRenderer>,

    /// Frame timing
    timer: Timer,

    /// Engine configuration
    config: EngineConfig,

    /// Whether the engine should continue running
    running: bool,

    /// Paused engines render but skip component updates
    paused: bool,

    /// Frames rendered since creation
    frames: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("scene", &self.scene.name())
            .field("cameras", &self.cameras.len())
            .field("running", &self.running)
            .field("paused", &self.paused)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create a new engine rendering through `rhi`
    pub fn new(config: EngineConfig, rhi: Box<dyn HardwareRenderer>) -> Self {
        log::info!("Initializing engine ({}x{})...", config.window.width, config.window.height);
        Self {
            scene: Scene::new(config.window.title.clone()),
            cameras: Vec::new(),
            rhi,
            timer: Timer::new(),
            config,
            running: true,
            paused: false,
            frames: 0,
        }
    }

    /// Run the engine main loop with the given application
    ///
    /// Returns when the application or the engine clears the running flag,
    /// or when `max_frames` is reached. Cameras are destroyed on exit.
    pub fn run<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        app.initialize(self)
            .map_err(|e| EngineError::ApplicationError(format!("App initialization: {}", e)))?;

        log::info!("Starting main loop...");
        self.timer.reset();
        while self.running {
            self.timer.update();
            let delta_time = self.timer.delta_time();

            app.update(self, delta_time)
                .map_err(|e| EngineError::ApplicationError(format!("App update: {}", e)))?;
            let stats = self.frame(delta_time);
            app.frame_rendered(self, &stats)
                .map_err(|e| EngineError::ApplicationError(format!("App frame: {}", e)))?;
        }

        app.cleanup(self);
        self.shutdown();
        log::info!("Engine shutdown complete after {} frames", self.frames);
        Ok(())
    }

    /// Advance by a fixed step and render one frame
    ///
    /// Returns the statistics of every camera, or `None` once stopped.
    pub fn step(&mut self, delta_time: f32) -> Option<Vec<FrameStats>> {
        if !self.running {
            return None;
        }
        self.timer.advance(delta_time);
        Some(self.frame(self.timer.delta_time()))
    }

    fn frame(&mut self, delta_time: f32) -> Vec<FrameStats> {
        self.update(delta_time);
        let stats = self.render();
        self.frames += 1;
        if self.config.max_frames.is_some_and(|max| self.frames >= max) {
            log::info!("Reached {} frames, stopping", self.frames);
            self.running = false;
        }
        stats
    }

    /// Run `on_update` on every enabled component, unless paused
    pub fn update(&mut self, delta_time: f32) {
        if self.paused {
            return;
        }
        self.scene.update(delta_time);
    }

    /// Render every camera in creation order
    pub fn render(&mut self) -> Vec<FrameStats> {
        let Self {
            scene, cameras, rhi, ..
        } = self;
        cameras
            .iter_mut()
            .map(|camera| camera.render(scene, rhi.as_mut()))
            .collect()
    }

    /// Create a camera on `node`; returns its index
    pub fn create_camera(&mut self, node: NodeId) -> Result<usize, EngineError> {
        let camera = Camera::new(&mut self.scene, node, self.config.pipeline.clone())?;
        self.cameras.push(camera);
        Ok(self.cameras.len() - 1)
    }

    /// Camera by index
    pub fn camera(&self, index: usize) -> Option<&Camera> {
        self.cameras.get(index)
    }

    /// Camera by index, mutably
    pub fn camera_mut(&mut self, index: usize) -> Option<&mut Camera> {
        self.cameras.get_mut(index)
    }

    /// Number of cameras
    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    /// Destroy and remove a camera
    ///
    /// Later cameras shift down by one index.
    pub fn remove_camera(&mut self, index: usize) -> Option<Camera> {
        if index >= self.cameras.len() {
            return None;
        }
        let mut camera = self.cameras.remove(index);
        camera.destroy(&mut self.scene, self.rhi.as_mut());
        Some(camera)
    }

    /// Backend
    pub fn rhi(&self) -> &dyn HardwareRenderer {
        self.rhi.as_ref()
    }

    /// Backend, mutably; used to create meshes and targets
    pub fn rhi_mut(&mut self) -> &mut dyn HardwareRenderer {
        self.rhi.as_mut()
    }

    /// Engine configuration
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Frame timer
    pub const fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Get the current frame delta time
    pub const fn delta_time(&self) -> f32 {
        self.timer.delta_time()
    }

    /// Frames rendered since creation
    pub const fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Stop component updates; rendering continues
    pub fn pause(&mut self) {
        if !self.paused {
            log::info!("Engine paused");
            self.paused = true;
        }
    }

    /// Resume component updates
    ///
    /// The timer restarts so the paused interval is not reported as one
    /// long frame.
    pub fn resume(&mut self) {
        if self.paused {
            log::info!("Engine resumed");
            self.paused = false;
            self.timer.reset();
        }
    }

    /// Whether component updates are paused
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the main loop keeps going
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// Stop the loop and release every camera's GPU resources
    pub fn shutdown(&mut self) {
        self.running = false;
        for camera in &mut self.cameras {
            camera.destroy(&mut self.scene, self.rhi.as_mut());
        }
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Initialization error
    #[error("Engine initialization failed: {0}")]
    InitializationFailed(String),

    /// Scene error
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Rendering error
    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),

    /// Application error
    #[error("Application error: {0}")]
    ApplicationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

//! # Siver Engine
//!
//! A hierarchical scene renderer: a tree of nodes with cached world
//! transforms, components with a managed lifecycle, and a per-camera
//! multi-pass render pipeline with ping-ponged intermediate targets.
//!
//! ## Features
//!
//! - **Scene Graph**: Slot-map node arena, dirty-flag world matrices, change flags
//! - **Components**: `Constructed -> Awake -> Enabled <-> Disabled -> Destroyed`
//! - **Render Queues**: Opaque / alpha-test / transparent, sorted by camera depth
//! - **Render Passes**: Priority-ordered, with hooks and post effects
//! - **Batching**: Sprites and sprite masks merged into few draw calls
//! - **Backend Boundary**: Every GPU call goes through [`render::HardwareRenderer`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use siver_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let camera = engine.scene.create_root_node("camera");
//!         engine.scene.set_position(camera, Vec3::new(0.0, 0.0, 5.0));
//!         engine.create_camera(camera)?;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig { max_frames: Some(10), ..EngineConfig::default() };
//!     let mut engine = Engine::new(config, Box::new(RecordingRenderer::new(1280, 720)));
//!     engine.run(&mut MyApp)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod backend;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        backend::RecordingRenderer,
        config::{Config, EngineConfig, PipelineConfig},
        foundation::{
            math::{Color, Mat4, Quat, Vec2, Vec3},
            time::{Stopwatch, Timer},
        },
        render::{
            Background, BackgroundMode, Camera, ClearFlags, FrameStats, HardwareRenderer, Material, Mesh,
            MeshData, MeshRenderer, PostEffect, PostEffectPass, RenderPass, RenderPassHooks, Shader,
            SpriteMask, SpriteRenderer,
        },
        scene::{Component, ComponentContext, Layer, NodeId, Scene},
        AppError, Application, Engine, EngineError,
    };
}

//! Public rendering API
//!
//! The hardware rendering interface and the opaque handles it hands out.

pub mod render_backend;

// Re-export commonly used types
pub use render_backend::{
    BackendResult, BatchDraw, HardwareRenderer, MeshHandle, ProgramHandle, RenderTargetHandle,
    RenderTargetResources, ShaderDataGroup, TextureHandle, Viewport,
};

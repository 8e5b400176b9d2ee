//! # Backend Module
//!
//! Concrete implementations of [`HardwareRenderer`](crate::render::HardwareRenderer).
//!
//! ## Organization
//!
//! - **Recording**: Headless backend that records every call as an
//!   [`RhiCommand`]. Used by tests, the viewer and any tool that needs to
//!   inspect a frame without a GPU.

pub mod recording;

pub use recording::{RecordingRenderer, RhiCommand};

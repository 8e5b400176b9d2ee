//! Foundation types shared by the scene and the renderer
//!
//! - [`math`]: nalgebra aliases, colors and transform helpers
//! - [`time`]: frame timer and stopwatch
//! - [`logging`]: `log` re-exports and `env_logger` setup

pub mod logging;
pub mod math;
pub mod time;

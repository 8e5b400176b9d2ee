//! Fixed-function render state
//!
//! State blocks are plain values. [`RenderState::apply`] forwards a block to
//! the backend only when it differs from the last block applied in the same
//! pass.

use crate::render::api::HardwareRenderer;

/// Depth / stencil comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    /// Never passes
    Never,
    /// Passes if less
    Less,
    /// Passes if equal
    Equal,
    /// Passes if less or equal
    LessEqual,
    /// Passes if greater
    Greater,
    /// Passes if not equal
    NotEqual,
    /// Passes if greater or equal
    GreaterEqual,
    /// Always passes
    Always,
}

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    /// Draw both faces
    Off,
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source alpha
    SourceAlpha,
    /// 1 - source alpha
    OneMinusSourceAlpha,
    /// Destination alpha
    DestinationAlpha,
    /// 1 - destination alpha
    OneMinusDestinationAlpha,
}

/// Stencil buffer operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOperation {
    /// Keep the current value
    Keep,
    /// Set to zero
    Zero,
    /// Replace with the reference value
    Replace,
    /// Increment, clamping at the maximum
    IncrementSaturate,
    /// Decrement, clamping at zero
    DecrementSaturate,
    /// Bitwise invert
    Invert,
}

/// Depth test and write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    /// Depth testing enabled
    pub enabled: bool,
    /// Depth writes enabled
    pub write_enabled: bool,
    /// Comparison used by the test
    pub compare: CompareFunction,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            enabled: true,
            write_enabled: true,
            compare: CompareFunction::Less,
        }
    }
}

/// Rasterizer state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterState {
    /// Face culling
    pub cull_mode: CullMode,
    /// Constant depth bias
    pub depth_bias: f32,
    /// Slope-scaled depth bias
    pub slope_scaled_depth_bias: f32,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            depth_bias: 0.0,
            slope_scaled_depth_bias: 0.0,
        }
    }
}

/// Color blending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendState {
    /// Blending enabled
    pub enabled: bool,
    /// Source color factor
    pub source_color: BlendFactor,
    /// Destination color factor
    pub destination_color: BlendFactor,
    /// Source alpha factor
    pub source_alpha: BlendFactor,
    /// Destination alpha factor
    pub destination_alpha: BlendFactor,
    /// RGBA write mask, one bit per channel
    pub color_write_mask: u8,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enabled: false,
            source_color: BlendFactor::One,
            destination_color: BlendFactor::Zero,
            source_alpha: BlendFactor::One,
            destination_alpha: BlendFactor::Zero,
            color_write_mask: 0b1111,
        }
    }
}

/// Stencil test and write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilState {
    /// Stencil testing enabled
    pub enabled: bool,
    /// Reference value
    pub reference: u32,
    /// Read mask
    pub mask: u32,
    /// Write mask
    pub write_mask: u32,
    /// Comparison used by the test
    pub compare: CompareFunction,
    /// Operation when both tests pass
    pub pass_operation: StencilOperation,
    /// Operation when the stencil test fails
    pub fail_operation: StencilOperation,
    /// Operation when the depth test fails
    pub z_fail_operation: StencilOperation,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            enabled: false,
            reference: 0,
            mask: 0xFF,
            write_mask: 0xFF,
            compare: CompareFunction::Always,
            pass_operation: StencilOperation::Keep,
            fail_operation: StencilOperation::Keep,
            z_fail_operation: StencilOperation::Keep,
        }
    }
}

/// Complete fixed-function state of a draw
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderState {
    /// Depth block
    pub depth: DepthState,
    /// Raster block
    pub raster: RasterState,
    /// Blend block
    pub blend: BlendState,
    /// Stencil block
    pub stencil: StencilState,
}

impl RenderState {
    /// Alpha blending without depth writes
    pub fn transparent() -> Self {
        Self {
            depth: DepthState {
                write_enabled: false,
                ..DepthState::default()
            },
            blend: BlendState {
                enabled: true,
                source_color: BlendFactor::SourceAlpha,
                destination_color: BlendFactor::OneMinusSourceAlpha,
                source_alpha: BlendFactor::One,
                destination_alpha: BlendFactor::OneMinusSourceAlpha,
                ..BlendState::default()
            },
            ..Self::default()
        }
    }

    /// Stencil-only state writing a sprite mask
    ///
    /// Additive masks increment the stencil buffer, subtractive ones
    /// decrement it. Color writes are disabled.
    pub fn stencil_mask(additive: bool) -> Self {
        let operation = if additive {
            StencilOperation::IncrementSaturate
        } else {
            StencilOperation::DecrementSaturate
        };
        Self {
            depth: DepthState {
                enabled: false,
                write_enabled: false,
                ..DepthState::default()
            },
            raster: RasterState {
                cull_mode: CullMode::Off,
                ..RasterState::default()
            },
            blend: BlendState {
                color_write_mask: 0,
                ..BlendState::default()
            },
            stencil: StencilState {
                enabled: true,
                pass_operation: operation,
                ..StencilState::default()
            },
        }
    }

    /// Depth test at less-or-equal with no writes, for backgrounds at the far plane
    pub fn background() -> Self {
        Self {
            depth: DepthState {
                enabled: true,
                write_enabled: false,
                compare: CompareFunction::LessEqual,
            },
            raster: RasterState {
                cull_mode: CullMode::Off,
                ..RasterState::default()
            },
            ..Self::default()
        }
    }

    /// Apply to the backend unless it equals the last applied state
    pub fn apply(&self, rhi: &mut dyn HardwareRenderer, last: &mut Option<Self>) {
        if last.as_ref() == Some(self) {
            return;
        }
        rhi.apply_render_state(self);
        *last = Some(*self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordingRenderer, RhiCommand};

    #[test]
    fn test_apply_skips_unchanged_state() {
        let mut rhi = RecordingRenderer::new(64, 64);
        let mut last = None;

        RenderState::default().apply(&mut rhi, &mut last);
        RenderState::default().apply(&mut rhi, &mut last);
        RenderState::transparent().apply(&mut rhi, &mut last);
        RenderState::transparent().apply(&mut rhi, &mut last);

        let applied = rhi
            .commands()
            .iter()
            .filter(|command| matches!(command, RhiCommand::ApplyRenderState(_)))
            .count();
        assert_eq!(applied, 2);
    }

    #[test]
    fn test_stencil_mask_operations() {
        assert_eq!(
            RenderState::stencil_mask(true).stencil.pass_operation,
            StencilOperation::IncrementSaturate
        );
        assert_eq!(
            RenderState::stencil_mask(false).stencil.pass_operation,
            StencilOperation::DecrementSaturate
        );
        assert_eq!(RenderState::stencil_mask(true).blend.color_write_mask, 0);
    }
}

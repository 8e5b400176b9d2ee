//! Render targets and clear flags

use bitflags::bitflags;

use crate::render::api::{BackendResult, HardwareRenderer, RenderTargetHandle, TextureHandle};

bitflags! {
    /// Buffers cleared when a target is bound
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        /// Color attachment
        const COLOR = 0b001;
        /// Depth attachment
        const DEPTH = 0b010;
        /// Stencil attachment
        const STENCIL = 0b100;
        /// Color and depth
        const DEPTH_COLOR = Self::COLOR.bits() | Self::DEPTH.bits();
        /// Every attachment
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

impl Default for ClearFlags {
    fn default() -> Self {
        Self::DEPTH_COLOR
    }
}

/// Parameters of an offscreen render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// MSAA sample count (1 disables multisampling)
    pub msaa_samples: u32,
    /// Keep a full mip chain on the color texture
    pub generate_mipmaps: bool,
    /// Attach a depth buffer
    pub depth: bool,
}

impl RenderTargetDescriptor {
    /// Single-sampled color + depth target
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            msaa_samples: 1,
            generate_mipmaps: false,
            depth: true,
        }
    }
}

/// An offscreen render target owned by its creator
///
/// The backend resources are released by [`RenderTarget::destroy`]; calling
/// it again is a no-op.
#[derive(Debug)]
pub struct RenderTarget {
    descriptor: RenderTargetDescriptor,
    handle: Option<RenderTargetHandle>,
    color_texture: TextureHandle,
}

impl RenderTarget {
    /// Allocate a render target on the backend
    pub fn new(rhi: &mut dyn HardwareRenderer, descriptor: RenderTargetDescriptor) -> BackendResult<Self> {
        let resources = rhi.create_render_target(&descriptor)?;
        log::debug!(
            "Created render target {:?} ({}x{}, {} samples)",
            resources.target,
            descriptor.width,
            descriptor.height,
            descriptor.msaa_samples
        );
        Ok(Self {
            descriptor,
            handle: Some(resources.target),
            color_texture: resources.color_texture,
        })
    }

    /// Backend handle, `None` once destroyed
    pub const fn handle(&self) -> Option<RenderTargetHandle> {
        self.handle
    }

    /// Color attachment texture
    pub const fn color_texture(&self) -> TextureHandle {
        self.color_texture
    }

    /// Creation parameters
    pub const fn descriptor(&self) -> &RenderTargetDescriptor {
        &self.descriptor
    }

    /// Size in pixels
    pub const fn size(&self) -> (u32, u32) {
        (self.descriptor.width, self.descriptor.height)
    }

    /// Whether the backend resources were released
    pub const fn is_destroyed(&self) -> bool {
        self.handle.is_none()
    }

    /// Resolve MSAA and regenerate mipmaps after rendering into this target
    pub fn finish(&self, rhi: &mut dyn HardwareRenderer) {
        let Some(handle) = self.handle else {
            return;
        };
        if self.descriptor.msaa_samples > 1 {
            rhi.blit_render_target(handle);
        }
        if self.descriptor.generate_mipmaps {
            rhi.generate_mipmaps(handle);
        }
    }

    /// Release the backend resources; returns `false` if already released
    pub fn destroy(&mut self, rhi: &mut dyn HardwareRenderer) -> bool {
        match self.handle.take() {
            Some(handle) => {
                rhi.destroy_render_target(handle);
                true
            }
            None => false,
        }
    }
}

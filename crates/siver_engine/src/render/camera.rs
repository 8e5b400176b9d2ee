//! # Scene Camera
//!
//! A camera is bound to a scene node and looks down the node's local -Z
//! axis. The view matrix is the inverse of the node's world matrix; it is
//! cached and only recomputed when the node's world change flag was set.
//!
//! Each camera owns its [`RenderPipeline`], so passes added to one camera
//! never affect another.

use crate::config::PipelineConfig;
use crate::foundation::math::{utils, Mat4, Vec3};
use crate::render::api::{HardwareRenderer, Viewport};
use crate::render::pipeline::{FrameStats, RenderContext, RenderPipeline};
use crate::render::shader::MacroSet;
use crate::render::target::{ClearFlags, RenderTarget};
use crate::scene::{ChangeFlagKey, Layer, NodeId, Scene, SceneError, SceneResult};

/// Perspective camera attached to a node
#[derive(Debug)]
pub struct Camera {
    node: NodeId,
    change_flag: Option<ChangeFlagKey>,
    view: Mat4,
    view_updates: u64,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
    /// Buffers cleared by passes without their own flags
    pub clear_flags: ClearFlags,
    /// Only nodes on these layers are drawn
    pub culling_mask: Layer,
    /// Normalized viewport on the output
    pub viewport: Viewport,
    /// Mip level of the output written by the last pass
    pub mip_level: u32,
    /// Shader macros enabled for everything this camera draws
    pub macros: MacroSet,
    output: Option<RenderTarget>,
    pipeline: RenderPipeline,
    destroyed: bool,
}

impl Camera {
    /// Create a camera bound to `node`
    ///
    /// Registers a change flag on the node's world transform so the view
    /// matrix is recomputed only after the node moved.
    pub fn new(scene: &mut Scene, node: NodeId, config: PipelineConfig) -> SceneResult<Self> {
        let change_flag = scene
            .register_world_change_flag(node)
            .ok_or(SceneError::UnknownNode(node))?;
        log::debug!("Camera created on node '{}'", scene.node(node).map_or("", |n| n.name()));
        Ok(Self {
            node,
            change_flag: Some(change_flag),
            view: Mat4::identity(),
            view_updates: 0,
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            clear_flags: ClearFlags::DEPTH_COLOR,
            culling_mask: Layer::EVERYTHING,
            viewport: Viewport::default(),
            mip_level: 0,
            macros: MacroSet::new(),
            output: None,
            pipeline: RenderPipeline::new(config),
            destroyed: false,
        })
    }

    /// Node this camera is bound to
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// World-to-view matrix
    ///
    /// Falls back to identity if the node is gone or its world matrix is
    /// not invertible.
    pub fn view_matrix(&mut self, scene: &Scene) -> Mat4 {
        let dirty = self
            .change_flag
            .map_or(true, |key| scene.take_change_flag(key) != Some(false));
        if dirty {
            self.view = scene
                .world_matrix(self.node)
                .and_then(|world| world.try_inverse())
                .unwrap_or_else(Mat4::identity);
            self.view_updates += 1;
        }
        self.view
    }

    /// How many times the view matrix was recomputed
    pub const fn view_updates(&self) -> u64 {
        self.view_updates
    }

    /// World position of the camera
    pub fn position(&self, scene: &Scene) -> Vec3 {
        scene.world_position(self.node).unwrap_or_else(Vec3::zeros)
    }

    /// Width over height of the viewport on the output
    pub fn aspect_ratio(&self, rhi: &dyn HardwareRenderer) -> f32 {
        let (width, height) = self
            .output
            .as_ref()
            .map_or_else(|| rhi.canvas_size(), RenderTarget::size);
        let width = width as f32 * self.viewport.width;
        let height = height as f32 * self.viewport.height;
        if height > 0.0 {
            width / height
        } else {
            1.0
        }
    }

    /// View-to-clip matrix
    pub fn projection_matrix(&self, rhi: &dyn HardwareRenderer) -> Mat4 {
        utils::perspective(self.fov, self.aspect_ratio(rhi), self.near, self.far)
    }

    /// Offscreen target this camera renders into; `None` is the canvas
    pub const fn output_target(&self) -> Option<&RenderTarget> {
        self.output.as_ref()
    }

    /// Replace the output target, returning the previous one
    pub fn set_output_target(&mut self, target: Option<RenderTarget>) -> Option<RenderTarget> {
        std::mem::replace(&mut self.output, target)
    }

    /// The camera's pipeline
    pub const fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// The camera's pipeline, mutably
    pub fn pipeline_mut(&mut self) -> &mut RenderPipeline {
        &mut self.pipeline
    }

    /// Render one frame of `scene`
    pub fn render(&mut self, scene: &Scene, rhi: &mut dyn HardwareRenderer) -> FrameStats {
        if self.destroyed {
            log::warn!("Render called on a destroyed camera");
            return FrameStats::default();
        }
        let view = self.view_matrix(scene);
        let projection = self.projection_matrix(&*rhi);
        let ctx = RenderContext {
            view,
            projection,
            camera_position: self.position(scene),
            clear_flags: self.clear_flags,
            culling_mask: self.culling_mask,
            output: self.output.as_ref(),
            viewport: self.viewport,
            mip_level: self.mip_level,
            macros: &self.macros,
        };
        self.pipeline.render(&ctx, scene, rhi)
    }

    /// Release the pipeline, the output target and the change flag
    ///
    /// Returns `false` if the camera was already destroyed.
    pub fn destroy(&mut self, scene: &mut Scene, rhi: &mut dyn HardwareRenderer) -> bool {
        if self.destroyed {
            return false;
        }
        if let Some(key) = self.change_flag.take() {
            scene.release_change_flag(key);
        }
        self.pipeline.destroy(rhi);
        if let Some(mut output) = self.output.take() {
            output.destroy(rhi);
        }
        self.destroyed = true;
        true
    }

    /// Whether [`Camera::destroy`] ran
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordingRenderer, RhiCommand};
    use crate::render::target::RenderTargetDescriptor;
    use approx::assert_relative_eq;

    fn setup() -> (Scene, NodeId, Camera) {
        let mut scene = Scene::new("camera-test");
        let node = scene.create_root_node("camera");
        let camera = Camera::new(&mut scene, node, PipelineConfig::default()).unwrap();
        (scene, node, camera)
    }

    #[test]
    fn test_view_matrix_is_inverse_world() {
        let (mut scene, node, mut camera) = setup();
        scene.set_position(node, Vec3::new(0.0, 0.0, 10.0));

        let view = camera.view_matrix(&scene);
        let origin = view.transform_point(&crate::foundation::math::Point3::origin());

        assert_relative_eq!(origin.z, -10.0, epsilon = 1e-5);
    }

    #[test]
    fn test_view_matrix_cached_until_node_moves() {
        let (mut scene, node, mut camera) = setup();
        camera.view_matrix(&scene);
        camera.view_matrix(&scene);
        assert_eq!(camera.view_updates(), 1);

        scene.translate(node, Vec3::new(1.0, 0.0, 0.0));
        camera.view_matrix(&scene);
        assert_eq!(camera.view_updates(), 2);
    }

    #[test]
    fn test_parent_move_invalidates_view() {
        let mut scene = Scene::new("camera-test");
        let rig = scene.create_root_node("rig");
        let node = scene.create_child(rig, "camera").unwrap();
        let mut camera = Camera::new(&mut scene, node, PipelineConfig::default()).unwrap();
        camera.view_matrix(&scene);

        scene.set_position(rig, Vec3::new(0.0, 3.0, 0.0));
        let view = camera.view_matrix(&scene);

        assert_eq!(camera.view_updates(), 2);
        assert_relative_eq!(view[(1, 3)], -3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_aspect_follows_output_and_viewport() {
        let (_, _, mut camera) = setup();
        let mut rhi = RecordingRenderer::new(800, 600);
        assert_relative_eq!(camera.aspect_ratio(&rhi), 800.0 / 600.0);

        camera.viewport = Viewport { x: 0.0, y: 0.0, width: 0.5, height: 1.0 };
        assert_relative_eq!(camera.aspect_ratio(&rhi), 400.0 / 600.0);

        let target = RenderTarget::new(&mut rhi, RenderTargetDescriptor::new(256, 256)).unwrap();
        camera.set_output_target(Some(target));
        assert_relative_eq!(camera.aspect_ratio(&rhi), 0.5);
    }

    #[test]
    fn test_unknown_node_rejected() {
        let mut scene = Scene::new("camera-test");
        let node = scene.create_root_node("gone");
        scene.destroy_node(node);
        assert!(matches!(
            Camera::new(&mut scene, node, PipelineConfig::default()),
            Err(SceneError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_destroy_releases_once() {
        let (mut scene, _, mut camera) = setup();
        let mut rhi = RecordingRenderer::new(64, 64);
        let target = RenderTarget::new(&mut rhi, RenderTargetDescriptor::new(32, 32)).unwrap();
        camera.set_output_target(Some(target));

        assert!(camera.destroy(&mut scene, &mut rhi));
        assert!(!camera.destroy(&mut scene, &mut rhi));
        let destroyed = rhi
            .commands()
            .iter()
            .filter(|command| matches!(command, RhiCommand::DestroyRenderTarget(_)))
            .count();
        assert_eq!(destroyed, 1);
        assert!(camera.render(&scene, &mut rhi).passes.is_empty());
    }
}

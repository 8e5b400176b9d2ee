//! Node transform with cached local and world matrices
//!
//! The local matrix is rebuilt from position, rotation and scale only when
//! one of them changed. The world matrix is rebuilt only when the transform
//! or one of its ancestors changed; the scene drives that invalidation
//! because it owns the hierarchy (see [`crate::scene::Scene::world_matrix`]).

use std::cell::Cell;

use crate::foundation::math::{utils, Mat4, Quat, Vec3};
use crate::scene::change_flag::ChangeFlagKey;

/// Local placement of a node relative to its parent
#[derive(Debug)]
pub struct Transform {
    position: Vec3,
    rotation_euler: Vec3,
    rotation: Quat,
    scale: Vec3,

    local_matrix: Cell<Mat4>,
    world_matrix: Cell<Mat4>,
    local_dirty: Cell<bool>,
    world_dirty: Cell<bool>,
    world_updates: Cell<u64>,

    pub(crate) change_flags: Vec<ChangeFlagKey>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation_euler: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            local_matrix: Cell::new(Mat4::identity()),
            world_matrix: Cell::new(Mat4::identity()),
            local_dirty: Cell::new(false),
            world_dirty: Cell::new(true),
            world_updates: Cell::new(0),
            change_flags: Vec::new(),
        }
    }
}

impl Transform {
    /// Local position
    pub const fn position(&self) -> &Vec3 {
        &self.position
    }

    /// Local rotation as Euler angles in degrees (pitch X, yaw Y, roll Z)
    pub const fn rotation(&self) -> &Vec3 {
        &self.rotation_euler
    }

    /// Local rotation as a quaternion
    pub const fn rotation_quaternion(&self) -> &Quat {
        &self.rotation
    }

    /// Local scale
    pub const fn scale(&self) -> &Vec3 {
        &self.scale
    }

    /// Local matrix `T * R * S`, rebuilt if any component changed
    pub fn local_matrix(&self) -> Mat4 {
        if self.local_dirty.get() {
            let matrix = utils::compose_trs(&self.position, &self.rotation, &self.scale);
            self.local_matrix.set(matrix);
            self.local_dirty.set(false);
        }
        self.local_matrix.get()
    }

    /// Whether the cached world matrix is stale
    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty.get()
    }

    /// Number of times the world matrix has been recomputed
    pub fn world_update_count(&self) -> u64 {
        self.world_updates.get()
    }

    /// Number of live or stale change-flag keys observing this transform
    pub fn observer_count(&self) -> usize {
        self.change_flags.len()
    }

    pub(crate) fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.local_dirty.set(true);
    }

    pub(crate) fn set_rotation(&mut self, euler_degrees: Vec3) {
        self.rotation_euler = euler_degrees;
        self.rotation = utils::quat_from_euler_degrees(&euler_degrees);
        self.local_dirty.set(true);
    }

    pub(crate) fn set_rotation_quaternion(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.rotation_euler = utils::euler_degrees_from_quat(&rotation);
        self.local_dirty.set(true);
    }

    pub(crate) fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.local_dirty.set(true);
    }

    pub(crate) fn mark_world_dirty(&self) {
        self.world_dirty.set(true);
    }

    pub(crate) fn cached_world_matrix(&self) -> Option<Mat4> {
        (!self.world_dirty.get()).then(|| self.world_matrix.get())
    }

    pub(crate) fn store_world_matrix(&self, matrix: Mat4) {
        self.world_matrix.set(matrix);
        self.world_dirty.set(false);
        self.world_updates.set(self.world_updates.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_default_is_identity() {
        let transform = Transform::default();
        assert_relative_eq!(transform.local_matrix(), Mat4::identity(), epsilon = EPSILON);
        assert!(transform.is_world_dirty());
    }

    #[test]
    fn test_local_matrix_rebuilds_after_setter() {
        let mut transform = Transform::default();
        transform.set_position(Vec3::new(1.0, 2.0, 3.0));
        transform.set_scale(Vec3::new(2.0, 2.0, 2.0));

        let matrix = transform.local_matrix();
        assert_relative_eq!(matrix[(0, 3)], 1.0, epsilon = EPSILON);
        assert_relative_eq!(matrix[(1, 3)], 2.0, epsilon = EPSILON);
        assert_relative_eq!(matrix[(2, 3)], 3.0, epsilon = EPSILON);
        assert_relative_eq!(matrix[(0, 0)], 2.0, epsilon = EPSILON);
    }

    #[test]
    fn test_rotation_representations_stay_in_sync() {
        let mut transform = Transform::default();
        transform.set_rotation(Vec3::new(0.0, 90.0, 0.0));
        let expected = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(transform.rotation_quaternion().angle_to(&expected), 0.0, epsilon = 1e-4);

        transform.set_rotation_quaternion(Quat::from_axis_angle(&Vec3::x_axis(), 0.5));
        assert_relative_eq!(transform.rotation().x, 0.5_f32.to_degrees(), epsilon = 1e-3);
        assert_relative_eq!(transform.rotation().y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_store_world_matrix_counts_updates() {
        let transform = Transform::default();
        assert!(transform.cached_world_matrix().is_none());

        transform.store_world_matrix(Mat4::identity());
        assert_eq!(transform.world_update_count(), 1);
        assert!(transform.cached_world_matrix().is_some());

        transform.mark_world_dirty();
        assert!(transform.cached_world_matrix().is_none());
    }
}

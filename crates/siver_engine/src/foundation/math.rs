//! Math utilities and types
//!
//! Provides the vector, matrix and rotation types used by transforms,
//! cameras and the render pipeline.

use serde::{Deserialize, Serialize};

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit, UnitQuaternion,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Unit quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Linear RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Alpha channel
    pub a: f32,
}

impl Color {
    /// Opaque black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Fully transparent black
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a color from its four channels
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Channels as an array in RGBA order
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Quat, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Compose an affine matrix as `T * R * S`
    pub fn compose_trs(position: &Vec3, rotation: &Quat, scale: &Vec3) -> Mat4 {
        Mat4::new_translation(position)
            * rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(scale)
    }

    /// Build a rotation from Euler angles in degrees
    ///
    /// Rotations are applied roll (Z) first, then pitch (X), then yaw (Y),
    /// so the resulting matrix is `Ry * Rx * Rz`.
    pub fn quat_from_euler_degrees(euler: &Vec3) -> Quat {
        let yaw = Quat::from_axis_angle(&Vec3::y_axis(), deg_to_rad(euler.y));
        let pitch = Quat::from_axis_angle(&Vec3::x_axis(), deg_to_rad(euler.x));
        let roll = Quat::from_axis_angle(&Vec3::z_axis(), deg_to_rad(euler.z));
        yaw * pitch * roll
    }

    /// Decompose a rotation into Euler angles in degrees
    ///
    /// Inverse of [`quat_from_euler_degrees`]. Near the pitch singularity the
    /// roll is folded into yaw and reported as zero.
    pub fn euler_degrees_from_quat(rotation: &Quat) -> Vec3 {
        let rotation_matrix = rotation.to_rotation_matrix();
        let m = rotation_matrix.matrix();
        let pitch = (-m[(1, 2)]).clamp(-1.0, 1.0).asin();
        let (yaw, roll) = if m[(1, 2)].abs() < 0.999_999_9 {
            (m[(0, 2)].atan2(m[(2, 2)]), m[(1, 0)].atan2(m[(1, 1)]))
        } else {
            ((-m[(2, 0)]).atan2(m[(0, 0)]), 0.0)
        };
        Vec3::new(rad_to_deg(pitch), rad_to_deg(yaw), rad_to_deg(roll))
    }

    /// Right-handed perspective projection with a vertical field of view in degrees
    pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, deg_to_rad(fov_degrees), near, far)
    }
}

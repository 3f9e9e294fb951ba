//! Transform component for scene objects.
//!
//! This module provides the [`Transform`] struct for representing position,
//! rotation, and scale of scene objects.
//!
//! # Example
//!
//! ```
//! use prism_scene::Transform;
//! use glam::Vec3;
//!
//! let transform = Transform::new()
//!     .with_position(Vec3::new(1.0, 0.0, 0.0))
//!     .with_rotation(Vec3::new(0.0, 45.0, 0.0));
//!
//! let model = transform.model_matrix();
//! ```

use glam::{EulerRot, Mat4, Quat, Vec3};

/// A transform representing position, rotation, and scale.
///
/// Rotation is stored as Euler angles in degrees and applied in X, Y, Z
/// order.
#[derive(Clone, Debug)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,
    /// Euler rotation in degrees, applied around X, then Y, then Z
    pub rotation: Vec3,
    /// Scale factor
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with the given position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Create a transform with the given Euler rotation in degrees.
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Create a transform with the given scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Get the rotation as a quaternion.
    pub fn rotation_quat(&self) -> Quat {
        let radians = Vec3::new(
            self.rotation.x.to_radians(),
            self.rotation.y.to_radians(),
            self.rotation.z.to_radians(),
        );
        Quat::from_euler(EulerRot::XYZ, radians.x, radians.y, radians.z)
    }

    /// Get the model matrix.
    ///
    /// Composed as translation * rotation * scale, so scale is applied
    /// first, then rotation, then translation.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation_quat(), self.position)
    }

    /// Get the normal matrix (inverse transpose of the model matrix).
    ///
    /// The normal matrix is used for transforming normal vectors correctly
    /// when the model matrix contains non-uniform scaling.
    ///
    /// # Non-invertible transforms
    ///
    /// If the transform is not invertible (e.g., contains zero scale),
    /// the identity matrix is returned as a fallback to avoid NaN/Inf values.
    pub fn normal_matrix(&self) -> Mat4 {
        const EPSILON: f32 = 1e-6;

        let model = self.model_matrix();
        if model.determinant().abs() < EPSILON {
            Mat4::IDENTITY
        } else {
            model.inverse().transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq_vec3(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPSILON
    }

    #[test]
    fn test_transform_default() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_transform_builder() {
        let t = Transform::new()
            .with_position(Vec3::new(1.0, 2.0, 3.0))
            .with_scale(Vec3::splat(2.0));

        assert_eq!(t.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.scale, Vec3::splat(2.0));
    }

    #[test]
    fn test_translation_only() {
        let t = Transform::new().with_position(Vec3::new(1.0, 2.0, 3.0));
        let pos = t.model_matrix().transform_point3(Vec3::ZERO);
        assert!(approx_eq_vec3(pos, Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_rotation_is_in_degrees() {
        let t = Transform::new().with_rotation(Vec3::new(0.0, 90.0, 0.0));
        let rotated = t.model_matrix().transform_point3(Vec3::X);

        // 90 degrees around Y maps +X to -Z
        assert!(
            approx_eq_vec3(rotated, Vec3::new(0.0, 0.0, -1.0)),
            "Expected (0, 0, -1), got {:?}",
            rotated
        );
    }

    #[test]
    fn test_rotation_order_x_then_y_then_z() {
        let t = Transform::new()
            .with_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Vec3::new(30.0, 60.0, 90.0))
            .with_scale(Vec3::new(1.0, 2.0, 3.0));

        let expected = Mat4::from_translation(t.position)
            * Mat4::from_rotation_x(30.0_f32.to_radians())
            * Mat4::from_rotation_y(60.0_f32.to_radians())
            * Mat4::from_rotation_z(90.0_f32.to_radians())
            * Mat4::from_scale(t.scale);

        assert!(
            t.model_matrix().abs_diff_eq(expected, EPSILON),
            "Expected {:?}, got {:?}",
            expected,
            t.model_matrix()
        );
    }

    #[test]
    fn test_normal_matrix_with_scale() {
        let t = Transform::new().with_scale(Vec3::new(1.0, 2.0, 1.0));
        let normal = t.normal_matrix();
        let model = t.model_matrix();

        // Normal matrix should be inverse transpose of model matrix
        let expected = model.inverse().transpose();
        assert_eq!(normal, expected);
    }

    #[test]
    fn test_normal_matrix_non_invertible() {
        // Zero scale makes the transform non-invertible
        let t = Transform::new().with_scale(Vec3::ZERO);
        let normal = t.normal_matrix();

        // Should return identity matrix as fallback, not NaN
        assert_eq!(normal, Mat4::IDENTITY);
    }
}

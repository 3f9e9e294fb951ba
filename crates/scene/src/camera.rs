//! Camera for rendering the scene.

use glam::{Mat4, Vec3};

/// A perspective camera.
///
/// The camera is described by a world-space position and a forward
/// direction rather than a rotation, matching how the demo scenes steer it.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// View direction (does not need to be normalized)
    pub forward: Vec3,
    /// Vertical field of view in degrees
    pub fovy: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clip plane distance
    pub near: f32,
    /// Far clip plane distance
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(1.0, 0.0, 1.0),
            forward: Vec3::new(-1.0, 0.0, -1.0),
            fovy: 45.0,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the aspect ratio, typically after a window resize.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Point the camera at a target position.
    pub fn look_at(&mut self, target: Vec3) {
        self.forward = target - self.position;
    }

    /// Get the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        let forward = self.forward.normalize_or(Vec3::NEG_Z);
        let target = self.position + forward;
        Mat4::look_at_rh(self.position, target, Vec3::Y)
    }

    /// Get the projection matrix (with Vulkan Y-flip).
    ///
    /// On surfaces wider than tall the vertical field of view is narrowed
    /// by the aspect ratio so the framed scene does not stretch.
    pub fn projection_matrix(&self) -> Mat4 {
        let mut fovy = self.fovy.to_radians();
        if self.aspect > 1.0 {
            fovy /= self.aspect;
        }

        let mut proj = Mat4::perspective_rh(fovy, self.aspect, self.near, self.far);
        // Flip Y for Vulkan coordinate system
        proj.y_axis.y *= -1.0;
        proj
    }

    /// Get the view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_default_camera_faces_origin() {
        let camera = Camera::default();
        let view = camera.view_matrix();

        // The default camera sits at (1, 0, 1) looking back at the origin,
        // so the origin lands on the view-space -Z axis
        let origin_in_view = view.transform_point3(Vec3::ZERO);
        assert!(origin_in_view.x.abs() < EPSILON);
        assert!(origin_in_view.y.abs() < EPSILON);
        assert!(origin_in_view.z < 0.0);
    }

    #[test]
    fn test_view_matrix_normalizes_forward() {
        let mut long = Camera::default();
        long.forward = Vec3::new(-10.0, 0.0, -10.0);
        let short = Camera::default();

        assert!(long.view_matrix().abs_diff_eq(short.view_matrix(), EPSILON));
    }

    #[test]
    fn test_projection_flips_y() {
        let camera = Camera::default();
        let proj = camera.projection_matrix();
        assert!(proj.y_axis.y < 0.0);
    }

    #[test]
    fn test_square_aspect_keeps_fovy() {
        let camera = Camera::default();
        let mut expected = Mat4::perspective_rh(45.0_f32.to_radians(), 1.0, 0.1, 100.0);
        expected.y_axis.y *= -1.0;

        assert!(camera.projection_matrix().abs_diff_eq(expected, EPSILON));
    }

    #[test]
    fn test_wide_aspect_narrows_fovy() {
        let mut camera = Camera::default();
        camera.set_aspect(2.0);

        let mut expected = Mat4::perspective_rh(45.0_f32.to_radians() / 2.0, 2.0, 0.1, 100.0);
        expected.y_axis.y *= -1.0;

        assert!(camera.projection_matrix().abs_diff_eq(expected, EPSILON));
    }

    #[test]
    fn test_look_at_sets_forward() {
        let mut camera = Camera::default();
        camera.look_at(Vec3::new(1.0, 5.0, 1.0));
        assert_eq!(camera.forward, Vec3::new(0.0, 5.0, 0.0));
    }
}

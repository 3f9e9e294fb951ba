//! Uniform buffer object definitions for shaders.
//!
//! These structures must match the GLSL std140 uniform block layouts exactly.
//! All structures use `#[repr(C)]` for predictable memory layout and implement
//! `Pod` and `Zeroable` for safe byte casting.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use prism_scene::{Camera, DirectionalLight};

/// Per-drawable transform uniform buffer data.
///
/// This structure matches the GLSL `Transforms` uniform block (set 0,
/// binding 0) read by the vertex stage.
///
/// # Memory Layout
///
/// - Offset 0: model matrix (64 bytes)
/// - Offset 64: view matrix (64 bytes)
/// - Offset 128: projection matrix (64 bytes)
/// - Total size: 192 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct TransformsUBO {
    /// Model matrix (object to world space).
    pub model: Mat4,
    /// View matrix (world to view space).
    pub view: Mat4,
    /// Projection matrix (view to clip space).
    pub projection: Mat4,
}

impl TransformsUBO {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates a new transform UBO from the three stage matrices.
    pub fn new(model: Mat4, view: Mat4, projection: Mat4) -> Self {
        Self {
            model,
            view,
            projection,
        }
    }

    /// Creates an identity transform UBO.
    pub fn identity() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

/// Directional light uniform buffer data.
///
/// This structure matches the GLSL `Light` uniform block (set 2, binding 0)
/// read by the vertex stage.
///
/// # Memory Layout
///
/// - Offset 0: color (16 bytes)
/// - Offset 16: direction (12 bytes)
/// - Offset 28: intensity (4 bytes)
/// - Total size: 32 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct LightUBO {
    /// Light color (RGBA).
    pub color: Vec4,
    /// Direction the light travels. Always normalized (or zero).
    pub direction: Vec3,
    /// Scalar intensity multiplier.
    pub intensity: f32,
}

impl LightUBO {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates a light UBO from a scene light.
    ///
    /// The direction is normalized before upload; a zero vector is passed
    /// through unchanged.
    pub fn new(light: &DirectionalLight) -> Self {
        Self {
            color: light.color,
            direction: light.direction.normalize_or_zero(),
            intensity: light.intensity,
        }
    }
}

/// Camera uniform buffer data.
///
/// This structure matches the GLSL `CameraData` uniform block (set 3,
/// binding 0) read by the vertex stage.
///
/// # Memory Layout
///
/// - Offset 0: position (12 bytes)
/// - Offset 12: vertical field of view (4 bytes)
/// - Offset 16: forward (12 bytes)
/// - Offset 28: aspect ratio (4 bytes)
/// - Offset 32: near plane (4 bytes)
/// - Offset 36: far plane (4 bytes)
/// - Offset 40: padding (8 bytes)
/// - Total size: 48 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct CameraUBO {
    /// Camera world position.
    pub position: Vec3,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// View direction.
    pub forward: Vec3,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Near clip plane distance.
    pub near: f32,
    /// Far clip plane distance.
    pub far: f32,
    /// Padding up to the std140 block size.
    pub _padding: [f32; 2],
}

impl CameraUBO {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates a camera UBO from a scene camera.
    pub fn new(camera: &Camera) -> Self {
        Self {
            position: camera.position,
            fovy: camera.fovy,
            forward: camera.forward,
            aspect: camera.aspect,
            near: camera.near,
            far: camera.far,
            _padding: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transforms_ubo_size() {
        // 3 Mat4 (3 * 64) = 192 bytes
        assert_eq!(TransformsUBO::SIZE, 192);
    }

    #[test]
    fn test_transforms_ubo_alignment() {
        // Verify proper alignment for GPU (Mat4 requires 16-byte alignment)
        assert_eq!(std::mem::align_of::<TransformsUBO>(), 16);
    }

    #[test]
    fn test_light_ubo_size() {
        // Vec4 (16) + Vec3 (12) + f32 (4) = 32 bytes
        assert_eq!(LightUBO::SIZE, 32);
    }

    #[test]
    fn test_light_ubo_alignment() {
        // Verify proper alignment for GPU (Vec4 requires 16-byte alignment)
        assert_eq!(std::mem::align_of::<LightUBO>(), 16);
    }

    #[test]
    fn test_camera_ubo_size() {
        // Vec3 (12) + f32 (4) + Vec3 (12) + 3 f32 (12) + padding (8) = 48 bytes
        assert_eq!(CameraUBO::SIZE, 48);
    }

    #[test]
    fn test_transforms_ubo_identity() {
        let ubo = TransformsUBO::identity();
        assert_eq!(ubo.model, Mat4::IDENTITY);
        assert_eq!(ubo.view, Mat4::IDENTITY);
        assert_eq!(ubo.projection, Mat4::IDENTITY);
    }

    #[test]
    fn test_transforms_ubo_new() {
        let model = Mat4::from_scale(Vec3::new(2.0, 2.0, 2.0));
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(45.0_f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);

        let ubo = TransformsUBO::new(model, view, projection);

        assert_eq!(ubo.model, model);
        assert_eq!(ubo.view, view);
        assert_eq!(ubo.projection, projection);
    }

    #[test]
    fn test_light_ubo_normalizes_direction() {
        let light = DirectionalLight {
            direction: Vec3::new(3.0, 0.0, 0.0),
            ..DirectionalLight::default()
        };

        let ubo = LightUBO::new(&light);

        assert_eq!(ubo.direction, Vec3::X);
        assert_eq!(ubo.color, light.color);
        assert_eq!(ubo.intensity, light.intensity);
    }

    #[test]
    fn test_light_ubo_zero_direction() {
        let light = DirectionalLight {
            direction: Vec3::ZERO,
            ..DirectionalLight::default()
        };

        let ubo = LightUBO::new(&light);

        assert_eq!(ubo.direction, Vec3::ZERO);
    }

    #[test]
    fn test_camera_ubo_from_camera() {
        let camera = Camera::default();
        let ubo = CameraUBO::new(&camera);

        assert_eq!(ubo.position, camera.position);
        assert_eq!(ubo.fovy, camera.fovy);
        assert_eq!(ubo.forward, camera.forward);
        assert_eq!(ubo.aspect, camera.aspect);
        assert_eq!(ubo.near, camera.near);
        assert_eq!(ubo.far, camera.far);
    }

    #[test]
    fn test_ubo_pod_zeroable() {
        // Verify Pod and Zeroable traits work
        let transforms = TransformsUBO::default();
        let bytes: &[u8] = bytemuck::bytes_of(&transforms);
        assert_eq!(bytes.len(), TransformsUBO::SIZE);

        let light = LightUBO::default();
        let bytes: &[u8] = bytemuck::bytes_of(&light);
        assert_eq!(bytes.len(), LightUBO::SIZE);

        let camera = CameraUBO::default();
        let bytes: &[u8] = bytemuck::bytes_of(&camera);
        assert_eq!(bytes.len(), CameraUBO::SIZE);
    }
}

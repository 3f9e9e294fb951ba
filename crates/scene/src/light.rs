//! Light definitions for the scene.

use glam::{Vec3, Vec4};

/// A directional light (sun-like).
#[derive(Clone, Debug)]
pub struct DirectionalLight {
    /// Light color
    pub color: Vec4,
    /// Light direction (normalized before upload)
    pub direction: Vec3,
    /// Light intensity
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            direction: Vec3::new(-1.0, -1.0, -1.0),
            intensity: 0.8,
        }
    }
}

//! Scene data and components.
//!
//! This crate provides the CPU side of the scene:
//! - Transforms, camera, and light components
//! - The drawable registry the renderer consumes

pub mod camera;
pub mod drawable;
pub mod light;
pub mod scene;
pub mod transform;

pub use camera::Camera;
pub use drawable::Drawable;
pub use light::DirectionalLight;
pub use scene::{DrawableId, Scene, DEFAULT_PIPELINE};
pub use transform::Transform;

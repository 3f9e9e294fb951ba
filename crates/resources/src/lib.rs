//! Asset loading for the renderer.
//!
//! This crate handles loading of external assets:
//! - Triangle mesh loading and interleaving
//! - Image/texture decoding to normalized RGBA
//! - GLSL to SPIR-V shader compilation

mod error;

pub mod mesh;
pub mod shader;
pub mod texture;

pub use error::{ResourceError, ResourceResult};
pub use mesh::{Mesh, FLOATS_PER_VERTEX};
pub use shader::{compile_glsl, ShaderSet};
pub use texture::Texture;

//! Drawable scene objects.

use prism_resources::{Mesh, Texture};

use crate::transform::Transform;

/// A renderable object: a mesh, its surface data, and a world transform.
///
/// Drawables carry CPU-side data only. GPU resources (vertex buffer,
/// uniform buffers, descriptor sets) are created by the renderer when the
/// drawable is first seen.
#[derive(Clone, Debug)]
pub struct Drawable {
    /// Display name, also used to look the drawable up in the scene
    pub name: String,
    /// Triangle geometry
    pub mesh: Mesh,
    /// Surface texture; `None` selects the renderer's built-in default
    pub texture: Option<Texture>,
    /// World transform
    pub transform: Transform,
    /// Pipeline key, stamped by the scene when the drawable is added
    pub pipeline: String,
}

impl Drawable {
    /// Create a drawable with an identity transform and no texture.
    ///
    /// The pipeline key is assigned by [`Scene::add_drawable`](crate::Scene::add_drawable).
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            texture: None,
            transform: Transform::default(),
            pipeline: String::new(),
        }
    }

    /// Create a drawable with the given texture.
    pub fn with_texture(mut self, texture: Texture) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Create a drawable with the given transform.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

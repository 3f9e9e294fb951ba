//! Scene registry.
//!
//! The [`Scene`] owns every drawable together with the camera and the
//! directional light. Drawables are addressed by [`DrawableId`] handles
//! returned at insertion time; there is no global object table.
//!
//! # Example
//!
//! ```
//! use prism_resources::Mesh;
//! use prism_scene::{Drawable, Scene};
//!
//! let mut scene = Scene::new();
//! let id = scene.add_drawable(Drawable::new("cube", Mesh::default()));
//!
//! // Animate the drawable by mutating its transform between frames
//! if let Some(drawable) = scene.drawable_mut(id) {
//!     drawable.transform.rotation.y += 1.0;
//! }
//! ```

use tracing::debug;

use crate::camera::Camera;
use crate::drawable::Drawable;
use crate::light::DirectionalLight;

/// Pipeline key assigned to drawables when no other pipeline is selected.
pub const DEFAULT_PIPELINE: &str = "default";

/// Handle to a drawable owned by a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DrawableId(usize);

impl DrawableId {
    /// Returns the underlying index.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Container for everything the renderer draws.
///
/// The scene tracks a "current pipeline" cursor: [`Scene::use_pipeline`]
/// moves it, and [`Scene::add_drawable`] stamps it onto the drawable being
/// added. Changing the cursor never affects drawables already in the scene.
#[derive(Clone, Debug)]
pub struct Scene {
    /// Viewpoint for the whole scene
    pub camera: Camera,
    /// Single directional light
    pub light: DirectionalLight,
    drawables: Vec<Drawable>,
    current_pipeline: String,
    revision: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            camera: Camera::default(),
            light: DirectionalLight::default(),
            drawables: Vec::new(),
            current_pipeline: DEFAULT_PIPELINE.to_string(),
            revision: 0,
        }
    }
}

impl Scene {
    /// Create an empty scene with the default camera and light.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the pipeline stamped onto subsequently added drawables.
    ///
    /// The key is resolved against the renderer's pipeline registry at
    /// record time; unknown keys fall back to [`DEFAULT_PIPELINE`].
    pub fn use_pipeline(&mut self, name: impl Into<String>) {
        self.current_pipeline = name.into();
    }

    /// Returns the pipeline key new drawables will receive.
    pub fn current_pipeline(&self) -> &str {
        &self.current_pipeline
    }

    /// Add a drawable, stamping the current pipeline key onto it.
    ///
    /// Returns a handle for later access.
    pub fn add_drawable(&mut self, mut drawable: Drawable) -> DrawableId {
        drawable.pipeline = self.current_pipeline.clone();

        debug!(
            "Added drawable '{}' with pipeline '{}'",
            drawable.name, drawable.pipeline
        );

        let id = DrawableId(self.drawables.len());
        self.drawables.push(drawable);
        self.revision += 1;
        id
    }

    /// Get a drawable by handle.
    pub fn drawable(&self, id: DrawableId) -> Option<&Drawable> {
        self.drawables.get(id.0)
    }

    /// Get mutable access to a drawable, e.g. to animate its transform.
    ///
    /// Transform changes take effect on the next frame without any
    /// re-recording; uniform data is uploaded every frame.
    pub fn drawable_mut(&mut self, id: DrawableId) -> Option<&mut Drawable> {
        self.drawables.get_mut(id.0)
    }

    /// Look up a drawable handle by name.
    ///
    /// Returns the first match when names collide.
    pub fn find(&self, name: &str) -> Option<DrawableId> {
        self.drawables
            .iter()
            .position(|d| d.name == name)
            .map(DrawableId)
    }

    /// Iterate over all drawables with their handles, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (DrawableId, &Drawable)> {
        self.drawables
            .iter()
            .enumerate()
            .map(|(i, d)| (DrawableId(i), d))
    }

    /// Number of drawables in the scene.
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    /// Returns `true` if the scene has no drawables.
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    /// Monotonic counter bumped whenever the drawable set changes.
    ///
    /// The renderer compares this against the value it last synchronized
    /// to decide whether GPU resources and command buffers are stale.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Update the camera aspect ratio from a surface size in pixels.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.camera.set_aspect(width as f32 / height as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use prism_resources::Mesh;

    use super::*;

    fn cube_stub(name: &str) -> Drawable {
        Drawable::new(name, Mesh::default())
    }

    #[test]
    fn test_empty_scene() {
        let scene = Scene::new();
        assert!(scene.is_empty());
        assert_eq!(scene.len(), 0);
        assert_eq!(scene.current_pipeline(), DEFAULT_PIPELINE);
        assert_eq!(scene.revision(), 0);
    }

    #[test]
    fn test_add_and_get_drawable() {
        let mut scene = Scene::new();
        let id = scene.add_drawable(cube_stub("cube"));

        assert_eq!(scene.len(), 1);
        assert_eq!(scene.drawable(id).map(|d| d.name.as_str()), Some("cube"));
    }

    #[test]
    fn test_pipeline_stamped_at_add_time() {
        let mut scene = Scene::new();
        let first = scene.add_drawable(cube_stub("a"));

        scene.use_pipeline("skybox");
        let second = scene.add_drawable(cube_stub("b"));

        // Moving the cursor after the fact must not retag earlier drawables
        scene.use_pipeline("other");

        assert_eq!(scene.drawable(first).map(|d| d.pipeline.as_str()), Some("default"));
        assert_eq!(scene.drawable(second).map(|d| d.pipeline.as_str()), Some("skybox"));
    }

    #[test]
    fn test_find_by_name() {
        let mut scene = Scene::new();
        scene.add_drawable(cube_stub("floor"));
        let player = scene.add_drawable(cube_stub("player"));

        assert_eq!(scene.find("player"), Some(player));
        assert_eq!(scene.find("missing"), None);
    }

    #[test]
    fn test_drawable_mut_animates_transform() {
        let mut scene = Scene::new();
        let id = scene.add_drawable(cube_stub("cube"));

        let drawable = scene.drawable_mut(id).unwrap();
        drawable.transform.rotation.y = 45.0;

        assert_eq!(scene.drawable(id).unwrap().transform.rotation.y, 45.0);
    }

    #[test]
    fn test_revision_tracks_additions() {
        let mut scene = Scene::new();
        assert_eq!(scene.revision(), 0);

        scene.add_drawable(cube_stub("a"));
        assert_eq!(scene.revision(), 1);

        scene.add_drawable(cube_stub("b"));
        assert_eq!(scene.revision(), 2);

        // Mutating a drawable does not change the revision
        let id = scene.find("a").unwrap();
        scene.drawable_mut(id).unwrap().transform.position.x = 1.0;
        assert_eq!(scene.revision(), 2);
    }

    #[test]
    fn test_iter_in_insertion_order() {
        let mut scene = Scene::new();
        scene.add_drawable(cube_stub("a"));
        scene.add_drawable(cube_stub("b"));

        let names: Vec<&str> = scene.iter().map(|(_, d)| d.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_set_viewport_size() {
        let mut scene = Scene::new();
        scene.set_viewport_size(1280, 720);
        assert!((scene.camera.aspect - 1280.0 / 720.0).abs() < 1e-6);

        // Zero height leaves the aspect untouched
        scene.set_viewport_size(100, 0);
        assert!((scene.camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
    }
}

//! Integration tests for asset loading.

use std::path::Path;

use prism_resources::{Mesh, ShaderSet, FLOATS_PER_VERTEX};

#[test]
fn test_load_cube_mesh() {
    // Path to the demo cube asset
    let mesh_path = Path::new("../../assets/meshes/cube.mesh");

    // Skip test if file doesn't exist (CI environment may not have assets)
    if !mesh_path.exists() {
        println!("Skipping test: mesh file not found at {:?}", mesh_path);
        return;
    }

    let mesh = Mesh::load(mesh_path).expect("Failed to load cube mesh");

    // A cube is six quadrilateral sides, two triangles each
    assert_eq!(mesh.triangle_count(), 12, "Cube should have 12 triangles");
    assert_eq!(mesh.vertex_count(), 36, "Cube should have 36 corners");

    let interleaved = mesh.interleave();
    assert_eq!(
        interleaved.len(),
        mesh.vertex_count() * FLOATS_PER_VERTEX,
        "Interleaved data should have 8 floats per corner"
    );

    println!(
        "Loaded mesh {:?} with {} triangles",
        mesh.name(),
        mesh.triangle_count()
    );
}

#[test]
fn test_compile_default_shader_set() {
    let shader_dir = Path::new("../../assets/shaders");

    // Skip test if shaders aren't present (CI environment may not have assets)
    if !shader_dir.join("default.vert").exists() {
        println!("Skipping test: shaders not found at {:?}", shader_dir);
        return;
    }

    let shaders = ShaderSet::load(shader_dir, "default").expect("Failed to compile shader set");

    assert!(!shaders.vertex.is_empty(), "Vertex SPIR-V should be non-empty");
    assert!(
        !shaders.fragment.is_empty(),
        "Fragment SPIR-V should be non-empty"
    );
}

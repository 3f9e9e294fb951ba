//! GLSL to SPIR-V compilation.
//!
//! Shaders ship as GLSL source and are compiled at load time with
//! `shaderc`, targeting Vulkan 1.1. Compilation failures surface the
//! compiler's full diagnostic log so a bad shader is debuggable from the
//! error alone.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use prism_resources::ShaderSet;
//!
//! # fn example() -> Result<(), prism_resources::ResourceError> {
//! // Compiles assets/shaders/default.vert and assets/shaders/default.frag
//! let shaders = ShaderSet::load(Path::new("assets/shaders"), "default")?;
//! assert!(!shaders.vertex.is_empty());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use tracing::{info, warn};

use crate::error::{ResourceError, ResourceResult};

/// Compiles GLSL source to SPIR-V words.
///
/// `name` identifies the shader in diagnostics (typically the file name).
/// The entry point is always `main`.
///
/// # Errors
///
/// Returns [`ResourceError::ShaderCompile`] with the compiler log when the
/// source does not compile.
pub fn compile_glsl(
    source: &str,
    kind: shaderc::ShaderKind,
    name: &str,
) -> ResourceResult<Vec<u32>> {
    let compiler = shaderc::Compiler::new().ok_or_else(|| ResourceError::ShaderCompile {
        name: name.to_string(),
        log: "failed to initialize the shaderc compiler".to_string(),
    })?;

    let mut options =
        shaderc::CompileOptions::new().ok_or_else(|| ResourceError::ShaderCompile {
            name: name.to_string(),
            log: "failed to initialize shaderc compile options".to_string(),
        })?;
    options.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_1 as u32,
    );

    let artifact = compiler
        .compile_into_spirv(source, kind, name, "main", Some(&options))
        .map_err(|e| match e {
            shaderc::Error::CompilationError(_, log) => ResourceError::ShaderCompile {
                name: name.to_string(),
                log,
            },
            other => ResourceError::ShaderCompile {
                name: name.to_string(),
                log: other.to_string(),
            },
        })?;

    if artifact.get_num_warnings() > 0 {
        warn!(
            "Shader '{}' compiled with warnings:\n{}",
            name,
            artifact.get_warning_messages()
        );
    }

    Ok(artifact.as_binary().to_vec())
}

/// A compiled vertex/fragment shader pair.
///
/// Pipelines are built from exactly one such pair.
#[derive(Debug, Clone)]
pub struct ShaderSet {
    /// Vertex stage SPIR-V.
    pub vertex: Vec<u32>,
    /// Fragment stage SPIR-V.
    pub fragment: Vec<u32>,
}

impl ShaderSet {
    /// Loads and compiles `<dir>/<name>.vert` and `<dir>/<name>.frag`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file is missing, unreadable, or fails to
    /// compile.
    pub fn load(dir: &Path, name: &str) -> ResourceResult<Self> {
        let vertex_path = dir.join(format!("{name}.vert"));
        let fragment_path = dir.join(format!("{name}.frag"));

        let vertex = Self::compile_file(&vertex_path, shaderc::ShaderKind::Vertex)?;
        let fragment = Self::compile_file(&fragment_path, shaderc::ShaderKind::Fragment)?;

        info!("Compiled shader set '{}' from {:?}", name, dir);

        Ok(Self { vertex, fragment })
    }

    fn compile_file(path: &Path, kind: shaderc::ShaderKind) -> ResourceResult<Vec<u32>> {
        if !path.exists() {
            return Err(ResourceError::FileNotFound(path.to_path_buf()));
        }

        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        compile_glsl(&source, kind, &name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_VERT: &str = "\
#version 450
layout(location = 0) in vec3 in_position;
void main() {
    gl_Position = vec4(in_position, 1.0);
}
";

    #[test]
    fn test_compile_minimal_vertex_shader() {
        let spirv = compile_glsl(MINIMAL_VERT, shaderc::ShaderKind::Vertex, "minimal.vert")
            .expect("minimal shader should compile");

        // SPIR-V magic number
        assert_eq!(spirv[0], 0x0723_0203);
        assert!(spirv.len() > 5);
    }

    #[test]
    fn test_compile_error_carries_log() {
        let err = compile_glsl(
            "#version 450\nvoid main() { this is not glsl }\n",
            shaderc::ShaderKind::Fragment,
            "broken.frag",
        )
        .unwrap_err();

        match err {
            ResourceError::ShaderCompile { name, log } => {
                assert_eq!(name, "broken.frag");
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_shader_file() {
        let err = ShaderSet::load(Path::new("/nonexistent"), "missing").unwrap_err();
        assert!(matches!(err, ResourceError::FileNotFound(_)));
    }
}

//! Errors for asset loading and shader compilation.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading, parsing, or compiling assets.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The mesh text could not be parsed.
    #[error("mesh parse error at line {line}: {message}")]
    MeshParse {
        /// 1-based line number the error was detected on.
        line: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// GLSL compilation failed.
    #[error("shader compilation failed for '{name}':\n{log}")]
    ShaderCompile {
        /// Name of the shader that failed to compile.
        name: String,
        /// The compiler's diagnostic log.
        log: String,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The image crate rejected the texture file.
    #[error("image: {0}")]
    Image(#[from] image::ImageError),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
}

/// Shorthand for results carrying [`ResourceError`].
pub type ResourceResult<T> = Result<T, ResourceError>;

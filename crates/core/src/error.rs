//! Errors shared by the platform layer and the app shell.

use thiserror::Error;

/// Failures from windowing and surface plumbing.
///
/// GPU-side failures live in the RHI's own error type; this one covers
/// what can go wrong before Vulkan is up.
#[derive(Error, Debug)]
pub enum Error {
    /// Window creation or raw handle access failed.
    #[error("window: {0}")]
    Window(String),

    /// A Vulkan loader or surface call failed outside the RHI.
    #[error("vulkan: {0}")]
    Vulkan(String),
}

/// Shorthand for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

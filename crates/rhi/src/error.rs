//! Error and result types for the RHI.

use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong inside the RHI.
///
/// Raw `vk::Result` codes and loader failures convert via `From`, so `?`
/// works directly on ash calls. The remaining variants carry enough
/// context to tell which stage of setup or rendering gave out.
#[derive(Error, Debug)]
pub enum RhiError {
    #[error("vulkan call failed: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// The Vulkan loader is missing or unusable.
    #[error("cannot load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// Device selection found no discrete GPU to run on.
    #[error("no discrete GPU found")]
    NoDiscreteGpu,

    /// The selected GPU has no queue family doing graphics and present.
    #[error("no queue family supports both graphics and present")]
    NoGraphicsPresentQueue,

    /// No memory type matches the requested bits and property flags.
    #[error("no compatible memory type for bits {type_bits:#x} with flags {required_flags:?}")]
    NoCompatibleMemoryType {
        type_bits: u32,
        required_flags: ash::vk::MemoryPropertyFlags,
    },

    /// A host-side wait on the GPU exceeded the configured limit.
    #[error("GPU wait timed out after {0:?}")]
    Timeout(Duration),

    #[error("GPU device lost")]
    DeviceLost,

    /// SPIR-V or entry point validation failed, or module creation was
    /// rejected.
    #[error("shader module: {0}")]
    ShaderError(String),

    /// Surface plumbing between the window and the instance failed.
    #[error("surface: {0}")]
    SurfaceError(String),

    #[error("swapchain: {0}")]
    SwapchainError(String),

    /// A caller-supplied handle or range did not pass validation.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("pipeline: {0}")]
    PipelineError(String),
}

/// Shorthand for results carrying [`RhiError`].
pub type RhiResult<T> = std::result::Result<T, RhiError>;

//! Forward renderer over the Vulkan RHI.
//!
//! This crate turns a [`prism_scene::Scene`] into presented frames:
//! - Device and swapchain bootstrap ([`context`])
//! - Scene-to-GPU mirroring with cached secondary command buffers
//!   ([`gpu_scene`])
//! - Frame pacing bounded by [`FRAME_LAG`] synchronization slots
//!   ([`frame`], [`renderer`])

pub mod context;
pub mod frame;
pub mod gpu_scene;
pub mod renderer;
pub mod ubo;

pub use frame::{FrameCursor, FrameOutcome};
pub use prism_rhi::sync::FRAME_LAG;
pub use renderer::Renderer;

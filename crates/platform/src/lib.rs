//! Platform layer for the renderer.
//!
//! Wraps winit window management and Vulkan surface plumbing:
//! - Window creation and resize tracking
//! - Surface creation with RAII cleanup
//! - Instance extension enumeration for the current window system

mod window;

pub use window::{get_required_extensions, Surface, Window};

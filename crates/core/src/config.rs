//! Engine configuration.

use std::time::Duration;

/// Renderer and window configuration.
///
/// Values are set in code; there is no config-file layer. The defaults give a
/// windowed 800x600 surface and an effectively unbounded GPU wait.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use prism_core::RendererConfig;
///
/// let config = RendererConfig::new()
///     .with_title("demo")
///     .with_window_size(1280, 720)
///     .with_gpu_wait_timeout(Duration::from_secs(2));
/// assert_eq!(config.window_width, 1280);
/// ```
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window title.
    pub title: String,
    /// Initial window width in physical pixels.
    pub window_width: u32,
    /// Initial window height in physical pixels.
    pub window_height: u32,
    /// Upper bound for host-side GPU waits (fence waits, image acquisition).
    ///
    /// Exceeding it surfaces as a timeout error rather than a device loss.
    pub gpu_wait_timeout: Duration,
    /// Preferred number of swapchain images. The actual count is clamped to
    /// what the surface supports.
    pub desired_swapchain_images: u32,
    /// Whether to request the Khronos validation layer. Defaults to on in
    /// debug builds.
    pub enable_validation: bool,
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    pub fn with_gpu_wait_timeout(mut self, timeout: Duration) -> Self {
        self.gpu_wait_timeout = timeout;
        self
    }

    pub fn with_desired_swapchain_images(mut self, count: u32) -> Self {
        self.desired_swapchain_images = count;
        self
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = enabled;
        self
    }

    /// The GPU wait timeout in nanoseconds, saturated to `u64::MAX`.
    ///
    /// Vulkan wait calls take a `u64` nanosecond timeout, so the default
    /// `Duration::MAX` collapses to an unbounded wait.
    pub fn gpu_wait_timeout_ns(&self) -> u64 {
        u64::try_from(self.gpu_wait_timeout.as_nanos()).unwrap_or(u64::MAX)
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "prism".to_string(),
            window_width: 800,
            window_height: 600,
            gpu_wait_timeout: Duration::MAX,
            desired_swapchain_images: 3,
            enable_validation: cfg!(debug_assertions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout_is_unbounded_in_nanos() {
        let config = RendererConfig::default();
        assert_eq!(config.gpu_wait_timeout_ns(), u64::MAX);
    }

    #[test]
    fn test_finite_timeout_converts_to_nanos() {
        let config = RendererConfig::new().with_gpu_wait_timeout(Duration::from_millis(250));
        assert_eq!(config.gpu_wait_timeout_ns(), 250_000_000);
    }

    #[test]
    fn test_builder_setters_apply() {
        let config = RendererConfig::new()
            .with_title("cube")
            .with_window_size(640, 480)
            .with_desired_swapchain_images(2)
            .with_validation(false);
        assert_eq!(config.title, "cube");
        assert_eq!(config.window_width, 640);
        assert_eq!(config.window_height, 480);
        assert_eq!(config.desired_swapchain_images, 2);
        assert!(!config.enable_validation);
    }
}

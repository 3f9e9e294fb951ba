//! Framebuffer creation.
//!
//! One framebuffer exists per swapchain image. Each one pairs that image's
//! color view with the shared depth view, in the attachment order the
//! render pass expects (color at 0, depth at 1).

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan framebuffer wrapper.
pub struct Framebuffer {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan framebuffer handle.
    framebuffer: vk::Framebuffer,
    /// Dimensions, matching the swapchain extent.
    extent: vk::Extent2D,
}

impl Framebuffer {
    /// Creates a framebuffer over one color view plus the shared depth view.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `render_pass` - The render pass the framebuffer is used with
    /// * `color_view` - This swapchain image's color view
    /// * `depth_view` - The depth view shared by all framebuffers
    /// * `extent` - The swapchain extent
    ///
    /// # Errors
    ///
    /// Returns an error if framebuffer creation fails.
    pub fn new(
        device: Arc<Device>,
        render_pass: vk::RenderPass,
        color_view: vk::ImageView,
        depth_view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        let attachments = [color_view, depth_view];

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { device.handle().create_framebuffer(&create_info, None)? };

        debug!("Created framebuffer {}x{}", extent.width, extent.height);

        Ok(Self {
            device,
            framebuffer,
            extent,
        })
    }

    /// Returns the Vulkan framebuffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    /// Returns the framebuffer dimensions.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_framebuffer(self.framebuffer, None);
        }
        debug!("Destroyed framebuffer");
    }
}

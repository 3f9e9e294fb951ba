//! Vulkan bootstrap and teardown.
//!
//! [`RenderContext`] owns everything between the instance and the
//! framebuffers. It is created once per window and rebuilds the
//! swapchain-dependent tail of that chain on resize.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use tracing::{debug, error, info};

use prism_core::RendererConfig;
use prism_platform::{Surface, Window, get_required_extensions};
use prism_rhi::command::{CommandBuffer, CommandPool};
use prism_rhi::device::Device;
use prism_rhi::framebuffer::Framebuffer;
use prism_rhi::image::DepthImage;
use prism_rhi::instance::Instance;
use prism_rhi::physical_device::select_physical_device;
use prism_rhi::render_pass::RenderPass;
use prism_rhi::swapchain::Swapchain;
use prism_rhi::sync::{FRAME_LAG, FrameSlot};
use prism_rhi::vk;
use prism_rhi::{RhiError, RhiResult};

/// Device, swapchain, and attachment state bootstrapped for one window.
///
/// # Resource Destruction Order
///
/// Vulkan resources must be destroyed in the correct order:
/// 1. Wait for all GPU work to complete
/// 2. Destroy framebuffers
/// 3. Destroy per-slot fences and semaphores
/// 4. Destroy the render pass and depth image
/// 5. Destroy the command pool, releasing all command buffer handles
/// 6. Destroy the swapchain
/// 7. Destroy the device
/// 8. Destroy the surface
/// 9. Destroy the instance
///
/// ManuallyDrop is used to ensure correct destruction order.
pub struct RenderContext {
    // Core Vulkan resources (in reverse destruction order)
    /// Vulkan instance (destroyed last).
    instance: ManuallyDrop<Instance>,
    /// Logical device (released after every device-backed resource).
    device: ManuallyDrop<Arc<Device>>,
    /// Window surface (destroyed after the swapchain, before the instance).
    surface: ManuallyDrop<Surface>,
    /// Swapchain and its image views.
    swapchain: ManuallyDrop<Swapchain>,
    /// Command pool backing all primary and secondary buffers.
    command_pool: ManuallyDrop<CommandPool>,

    // Frame resources
    /// Fence and semaphore pair per in-flight frame.
    frame_slots: Vec<FrameSlot>,
    /// Primary buffer for setup work outside the frame loop.
    base_cmd: ManuallyDrop<CommandBuffer>,
    /// One primary buffer per swapchain image.
    primary_cmds: Vec<CommandBuffer>,

    // Attachments
    /// Depth attachment shared by every framebuffer.
    depth_image: ManuallyDrop<DepthImage>,
    /// Two-attachment render pass (color + depth).
    render_pass: ManuallyDrop<RenderPass>,
    /// One framebuffer per swapchain image.
    framebuffers: Vec<Framebuffer>,

    /// Fence wait budget in nanoseconds.
    gpu_wait_timeout_ns: u64,
}

impl RenderContext {
    /// Bootstraps the full Vulkan stack for the given window.
    ///
    /// Each step depends on the previous one: instance, surface, physical
    /// device, logical device, command pool, synchronization slots,
    /// swapchain, command buffers, depth image, render pass, framebuffers.
    ///
    /// # Errors
    ///
    /// Returns an error if any Vulkan resource creation fails. Resources
    /// created before the failing step are destroyed on the way out.
    pub fn new(window: &Window, config: &RendererConfig) -> RhiResult<Self> {
        info!("Initializing Vulkan render context");

        let display_handle = window
            .display_handle()
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?
            .as_raw();
        let surface_extensions = get_required_extensions(display_handle)
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let instance = Instance::new(config.enable_validation, &surface_extensions)?;

        // Create surface
        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        // Select physical device and create the logical device
        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &physical_device_info)?;

        let command_pool = CommandPool::new(device.clone(), device.queue_family_index())?;

        // Per-slot synchronization, fences pre-signaled
        let mut frame_slots = Vec::with_capacity(FRAME_LAG);
        for i in 0..FRAME_LAG {
            frame_slots.push(FrameSlot::new(device.clone())?);
            debug!("Created synchronization slot {}", i);
        }

        let swapchain = Swapchain::new(
            &instance,
            device.clone(),
            surface.handle(),
            config.desired_swapchain_images,
        )?;

        let base_cmd = CommandBuffer::new(device.clone(), &command_pool)?;
        let primary_cmds =
            Self::allocate_primaries(&device, &command_pool, swapchain.image_count() as usize)?;

        let depth_image = DepthImage::new(device.clone(), swapchain.extent())?;
        let render_pass = RenderPass::new(device.clone(), swapchain.format())?;
        let framebuffers =
            Self::create_framebuffers(&device, &render_pass, &swapchain, &depth_image)?;

        info!(
            "Render context ready: {} swapchain images, {} frames in flight",
            swapchain.image_count(),
            FRAME_LAG
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            device: ManuallyDrop::new(device),
            surface: ManuallyDrop::new(surface),
            swapchain: ManuallyDrop::new(swapchain),
            command_pool: ManuallyDrop::new(command_pool),
            frame_slots,
            base_cmd: ManuallyDrop::new(base_cmd),
            primary_cmds,
            depth_image: ManuallyDrop::new(depth_image),
            render_pass: ManuallyDrop::new(render_pass),
            framebuffers,
            gpu_wait_timeout_ns: config.gpu_wait_timeout_ns(),
        })
    }

    /// Creates one framebuffer per swapchain image, all sharing the depth
    /// attachment.
    fn create_framebuffers(
        device: &Arc<Device>,
        render_pass: &RenderPass,
        swapchain: &Swapchain,
        depth_image: &DepthImage,
    ) -> RhiResult<Vec<Framebuffer>> {
        let count = swapchain.image_count() as usize;
        let mut framebuffers = Vec::with_capacity(count);

        for i in 0..count {
            framebuffers.push(Framebuffer::new(
                device.clone(),
                render_pass.handle(),
                swapchain.image_view(i),
                depth_image.view(),
                swapchain.extent(),
            )?);
        }

        Ok(framebuffers)
    }

    /// Allocates one primary command buffer per swapchain image.
    fn allocate_primaries(
        device: &Arc<Device>,
        pool: &CommandPool,
        count: usize,
    ) -> RhiResult<Vec<CommandBuffer>> {
        let mut buffers = Vec::with_capacity(count);
        for _ in 0..count {
            buffers.push(CommandBuffer::new(device.clone(), pool)?);
        }
        Ok(buffers)
    }

    /// Rebuilds the swapchain and everything derived from it.
    ///
    /// Drains all in-flight frames first, then tears down the framebuffers,
    /// recreates the swapchain (chaining the old one), and rebuilds the
    /// depth image and framebuffers at the new extent. Cached secondary
    /// command buffers recorded against the old framebuffers must be
    /// re-recorded by the caller.
    pub fn recreate_swapchain(&mut self) -> RhiResult<()> {
        // Attachments below may still be referenced by submitted work
        // until every slot fence signals.
        for slot in &self.frame_slots {
            slot.in_flight_fence().wait(self.gpu_wait_timeout_ns)?;
        }
        self.device.wait_idle()?;

        self.framebuffers.clear();

        self.swapchain.recreate(&self.instance, self.surface.handle())?;

        let depth_image = DepthImage::new(self.device().clone(), self.swapchain.extent())?;
        unsafe {
            ManuallyDrop::drop(&mut self.depth_image);
        }
        self.depth_image = ManuallyDrop::new(depth_image);

        let framebuffers = Self::create_framebuffers(
            self.device(),
            &self.render_pass,
            &self.swapchain,
            &self.depth_image,
        )?;
        self.framebuffers = framebuffers;

        // Primaries stay valid across swapchain rebuilds; reallocate only
        // when the image count changed.
        let image_count = self.swapchain.image_count() as usize;
        if self.primary_cmds.len() != image_count {
            let primary_cmds =
                Self::allocate_primaries(self.device(), &self.command_pool, image_count)?;
            self.primary_cmds = primary_cmds;
        }

        debug!(
            "Swapchain recreated: {}x{}, {} images",
            self.swapchain.extent().width,
            self.swapchain.extent().height,
            self.swapchain.image_count()
        );

        Ok(())
    }

    /// Returns the logical device.
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the swapchain.
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    /// Returns the render pass.
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    /// Returns the framebuffer for a swapchain image.
    pub fn framebuffer(&self, index: usize) -> &Framebuffer {
        &self.framebuffers[index]
    }

    /// Returns the shared command pool.
    pub fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }

    /// Returns the setup command buffer.
    pub fn base_cmd(&self) -> &CommandBuffer {
        &self.base_cmd
    }

    /// Returns the primary command buffer for a swapchain image.
    pub fn primary_cmd(&self, index: usize) -> &CommandBuffer {
        &self.primary_cmds[index]
    }

    /// Returns the synchronization slot for an in-flight frame.
    pub fn frame_slot(&self, index: usize) -> &FrameSlot {
        &self.frame_slots[index]
    }

    /// Returns the current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Returns the fence wait budget in nanoseconds.
    pub fn gpu_wait_timeout_ns(&self) -> u64 {
        self.gpu_wait_timeout_ns
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        // Wait for all GPU work to complete before destroying resources
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during context drop: {:?}",
                e
            );
        }

        self.framebuffers.clear();
        self.primary_cmds.clear();
        self.frame_slots.clear();

        // Manually drop resources in correct order
        unsafe {
            ManuallyDrop::drop(&mut self.render_pass);
            ManuallyDrop::drop(&mut self.depth_image);
            ManuallyDrop::drop(&mut self.base_cmd);
            ManuallyDrop::drop(&mut self.command_pool);
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.instance);
        }

        debug!("Render context destroyed");
    }
}

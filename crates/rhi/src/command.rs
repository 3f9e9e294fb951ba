//! Command pools and command buffer recording.
//!
//! [`CommandPool`] allocates, [`CommandBuffer`] records. The methods here
//! cover the patterns the renderer relies on: per-frame primary buffers
//! that replay cached secondaries inside a render pass, and one-shot
//! buffers for image layout transitions at upload time.
//!
//! ```no_run
//! use std::sync::Arc;
//! use prism_rhi::device::Device;
//! use prism_rhi::command::{CommandPool, CommandBuffer};
//!
//! # fn example(device: Arc<Device>) -> Result<(), prism_rhi::RhiError> {
//! // One pool on the combined graphics/present queue family
//! let pool = CommandPool::new(device.clone(), device.queue_family_index())?;
//!
//! let cmd = CommandBuffer::new(device.clone(), &pool)?;
//! cmd.begin()?;
//! // record...
//! cmd.end()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Returns the access mask an image must be visible to after moving into
/// `layout`.
///
/// Used as the destination access mask of layout transition barriers.
/// Layouts that are not written or read through a known access path
/// (such as `UNDEFINED` or `PREINITIALIZED`) map to an empty mask.
pub fn dst_access_mask_for_layout(layout: vk::ImageLayout) -> vk::AccessFlags {
    match layout {
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => vk::AccessFlags::TRANSFER_WRITE,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => {
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        }
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => {
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::INPUT_ATTACHMENT_READ
        }
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => vk::AccessFlags::TRANSFER_READ,
        vk::ImageLayout::PRESENT_SRC_KHR => vk::AccessFlags::MEMORY_READ,
        _ => vk::AccessFlags::empty(),
    }
}

/// Allocation pool for command buffers.
///
/// Buffers allocated from a pool may only be submitted to queues of the
/// pool's family. Pools are single-threaded; recording from multiple
/// threads needs one pool each.
pub struct CommandPool {
    device: Arc<Device>,
    pool: vk::CommandPool,
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a pool for the given queue family.
    ///
    /// `RESET_COMMAND_BUFFER` is set so individual buffers can be reset
    /// without recycling the whole pool.
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };
        debug!("Created command pool on queue family {}", queue_family_index);

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Queue family the pool was created on. Buffers from this pool may
    /// only be submitted to queues of this family.
    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Allocates one primary command buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn allocate_command_buffer(&self) -> RhiResult<vk::CommandBuffer> {
        self.allocate(vk::CommandBufferLevel::PRIMARY)
    }

    /// Allocates one secondary command buffer, replayable from a primary
    /// inside a render pass.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn allocate_secondary_command_buffer(&self) -> RhiResult<vk::CommandBuffer> {
        self.allocate(vk::CommandBufferLevel::SECONDARY)
    }

    fn allocate(&self, level: vk::CommandBufferLevel) -> RhiResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(level)
            .command_buffer_count(1);

        let buffers = unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? };
        Ok(buffers[0])
    }

    /// Device the pool was created against.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        debug!(
            "Destroyed command pool (queue family {})",
            self.queue_family_index
        );
    }
}

/// Recording interface over a `VkCommandBuffer`.
///
/// Commands go between `begin()` (or [`begin_secondary`]) and `end()`:
///
/// ```no_run
/// # use std::sync::Arc;
/// # use prism_rhi::device::Device;
/// # use prism_rhi::command::{CommandPool, CommandBuffer};
/// # fn example(device: Arc<Device>, pool: &CommandPool) -> Result<(), prism_rhi::RhiError> {
/// let cmd = CommandBuffer::new(device, pool)?;
///
/// cmd.begin()?;
/// // record...
/// cmd.end()?;
/// # Ok(())
/// # }
/// ```
///
/// The wrapper does not free the underlying handle; that happens when the
/// owning [`CommandPool`] is destroyed. There is deliberately no `Drop`
/// here.
///
/// [`begin_secondary`]: CommandBuffer::begin_secondary
pub struct CommandBuffer {
    device: Arc<Device>,
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    /// Creates a new primary command buffer from the given pool.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn new(device: Arc<Device>, pool: &CommandPool) -> RhiResult<Self> {
        let buffer = pool.allocate_command_buffer()?;
        Ok(Self { device, buffer })
    }

    /// Creates a new secondary command buffer from the given pool.
    ///
    /// Secondary buffers are recorded with [`begin_secondary`] and replayed
    /// from a primary buffer with [`execute_commands`].
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    ///
    /// [`begin_secondary`]: CommandBuffer::begin_secondary
    /// [`execute_commands`]: CommandBuffer::execute_commands
    pub fn new_secondary(device: Arc<Device>, pool: &CommandPool) -> RhiResult<Self> {
        let buffer = pool.allocate_secondary_command_buffer()?;
        Ok(Self { device, buffer })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    // =========================================================================
    // Recording
    // =========================================================================

    /// Starts recording for a single submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot enter the recording state.
    pub fn begin(&self) -> RhiResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .handle()
                .begin_command_buffer(self.buffer, &begin_info)?;
        }

        Ok(())
    }

    /// Begins recording a secondary command buffer that executes entirely
    /// inside the given render pass and framebuffer.
    ///
    /// The buffer is recorded with `RENDER_PASS_CONTINUE` so it may only be
    /// replayed from a primary buffer that is inside the inherited render
    /// pass, and `SIMULTANEOUS_USE` so overlapping in-flight frames can
    /// replay the same recording.
    ///
    /// The recording stays valid until the render pass or framebuffer it
    /// inherits is destroyed, after which it must be reset and re-recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if beginning fails.
    pub fn begin_secondary(
        &self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
    ) -> RhiResult<()> {
        let inheritance_info = vk::CommandBufferInheritanceInfo::default()
            .render_pass(render_pass)
            .subpass(0)
            .framebuffer(framebuffer);

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(
                vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE
                    | vk::CommandBufferUsageFlags::SIMULTANEOUS_USE,
            )
            .inheritance_info(&inheritance_info);

        unsafe {
            self.device
                .handle()
                .begin_command_buffer(self.buffer, &begin_info)?;
        }

        Ok(())
    }

    /// Finishes recording, leaving the buffer ready to submit.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer was not recording.
    pub fn end(&self) -> RhiResult<()> {
        unsafe {
            self.device.handle().end_command_buffer(self.buffer)?;
        }

        Ok(())
    }

    /// Returns the buffer to its initial state for re-recording.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset fails.
    pub fn reset(&self) -> RhiResult<()> {
        unsafe {
            self.device
                .handle()
                .reset_command_buffer(self.buffer, vk::CommandBufferResetFlags::empty())?;
        }

        Ok(())
    }

    // =========================================================================
    // Render Pass
    // =========================================================================

    /// Begins the render pass on the given framebuffer.
    ///
    /// The color attachment is cleared to opaque black and the depth
    /// attachment to the far plane. Subpass contents are recorded as
    /// `SECONDARY_COMMAND_BUFFERS`, so only [`execute_commands`] may be
    /// issued until [`end_render_pass`].
    ///
    /// [`execute_commands`]: CommandBuffer::execute_commands
    /// [`end_render_pass`]: CommandBuffer::end_render_pass
    pub fn begin_render_pass(
        &self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
    ) {
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.0, 0.0, 0.0, 1.0],
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        unsafe {
            self.device.handle().cmd_begin_render_pass(
                self.buffer,
                &begin_info,
                vk::SubpassContents::SECONDARY_COMMAND_BUFFERS,
            );
        }
    }

    /// Ends the current render pass.
    pub fn end_render_pass(&self) {
        unsafe {
            self.device.handle().cmd_end_render_pass(self.buffer);
        }
    }

    /// Executes secondary command buffers from this primary buffer.
    pub fn execute_commands(&self, command_buffers: &[vk::CommandBuffer]) {
        unsafe {
            self.device
                .handle()
                .cmd_execute_commands(self.buffer, command_buffers);
        }
    }

    // =========================================================================
    // Binding
    // =========================================================================

    /// Binds a pipeline to the command buffer.
    pub fn bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_pipeline(self.buffer, bind_point, pipeline);
        }
    }

    /// Binds vertex buffers starting at `first_binding`, with a byte
    /// offset into each.
    pub fn bind_vertex_buffers(
        &self,
        first_binding: u32,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        unsafe {
            self.device.handle().cmd_bind_vertex_buffers(
                self.buffer,
                first_binding,
                buffers,
                offsets,
            );
        }
    }

    /// Binds descriptor sets against `layout` starting at `first_set`.
    pub fn bind_descriptor_sets(
        &self,
        bind_point: vk::PipelineBindPoint,
        layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
        dynamic_offsets: &[u32],
    ) {
        unsafe {
            self.device.handle().cmd_bind_descriptor_sets(
                self.buffer,
                bind_point,
                layout,
                first_set,
                descriptor_sets,
                dynamic_offsets,
            );
        }
    }

    // =========================================================================
    // Viewport and scissor
    // =========================================================================

    /// Sets the viewport dynamically.
    pub fn set_viewport(&self, viewport: &vk::Viewport) {
        unsafe {
            self.device
                .handle()
                .cmd_set_viewport(self.buffer, 0, std::slice::from_ref(viewport));
        }
    }

    /// Sets the scissor rectangle dynamically.
    pub fn set_scissor(&self, scissor: &vk::Rect2D) {
        unsafe {
            self.device
                .handle()
                .cmd_set_scissor(self.buffer, 0, std::slice::from_ref(scissor));
        }
    }

    // =========================================================================
    // Draws
    // =========================================================================

    /// Issues a non-indexed draw.
    pub fn draw(
        &self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.handle().cmd_draw(
                self.buffer,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }

    // =========================================================================
    // Barriers
    // =========================================================================

    /// Inserts a pipeline barrier carrying image memory barriers.
    pub fn pipeline_barrier(
        &self,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        image_barriers: &[vk::ImageMemoryBarrier],
    ) {
        unsafe {
            self.device.handle().cmd_pipeline_barrier(
                self.buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                image_barriers,
            );
        }
    }

    /// Records an image layout transition barrier.
    ///
    /// The destination access mask is derived from `new_layout` via
    /// [`dst_access_mask_for_layout`]; the source access mask must be
    /// supplied by the caller since it depends on how the image was last
    /// used, not just on its layout.
    ///
    /// The barrier covers mip level 0 and array layer 0 only, matching the
    /// single-level images this crate creates.
    #[allow(clippy::too_many_arguments)]
    pub fn transition_image_layout(
        &self,
        image: vk::Image,
        aspect_mask: vk::ImageAspectFlags,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        src_access_mask: vk::AccessFlags,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
    ) {
        let barrier = vk::ImageMemoryBarrier::default()
            .src_access_mask(src_access_mask)
            .dst_access_mask(dst_access_mask_for_layout(new_layout))
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(aspect_mask)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        self.pipeline_barrier(src_stage, dst_stage, std::slice::from_ref(&barrier));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dst_access_for_transfer_layouts() {
        assert_eq!(
            dst_access_mask_for_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL),
            vk::AccessFlags::TRANSFER_WRITE
        );
        assert_eq!(
            dst_access_mask_for_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
            vk::AccessFlags::TRANSFER_READ
        );
    }

    #[test]
    fn test_dst_access_for_attachment_layouts() {
        assert_eq!(
            dst_access_mask_for_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        );
        assert_eq!(
            dst_access_mask_for_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        );
    }

    #[test]
    fn test_dst_access_for_shader_read() {
        assert_eq!(
            dst_access_mask_for_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::INPUT_ATTACHMENT_READ
        );
    }

    #[test]
    fn test_dst_access_for_present() {
        assert_eq!(
            dst_access_mask_for_layout(vk::ImageLayout::PRESENT_SRC_KHR),
            vk::AccessFlags::MEMORY_READ
        );
    }

    #[test]
    fn test_dst_access_for_unknown_layouts_is_empty() {
        assert_eq!(
            dst_access_mask_for_layout(vk::ImageLayout::UNDEFINED),
            vk::AccessFlags::empty()
        );
        assert_eq!(
            dst_access_mask_for_layout(vk::ImageLayout::PREINITIALIZED),
            vk::AccessFlags::empty()
        );
        assert_eq!(
            dst_access_mask_for_layout(vk::ImageLayout::GENERAL),
            vk::AccessFlags::empty()
        );
    }

    #[test]
    fn test_command_buffer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandBuffer>();
    }

    #[test]
    fn test_command_pool_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandPool>();
    }
}

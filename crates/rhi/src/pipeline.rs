//! Graphics pipeline management.
//!
//! This module handles VkPipeline creation. Every pipeline in the engine
//! shares the same fixed-function state; only the shader pair differs
//! between pipelines.
//!
//! # Fixed state
//!
//! - Vertex input: [`MeshVertex`] at binding 0
//! - Input assembly: triangle list
//! - Rasterization: filled polygons, back-face culling, counter-clockwise
//!   front faces
//! - Depth: test and write enabled, less-or-equal comparison, no stencil
//! - Color blend: one attachment, blending disabled, full RGBA write mask
//! - Dynamic state: viewport and scissor (set per frame to the swapchain
//!   extent)
//!
//! The pipeline is built against subpass 0 of the engine's render pass and
//! owns its layout chain: one single-binding descriptor set layout per
//! entry in the binding list, aggregated into a pipeline layout. Drawables
//! create their own descriptor sets from an identical binding list, which
//! makes their sets layout-compatible with every pipeline.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use prism_rhi::device::Device;
//! use prism_rhi::descriptor::DescriptorBinding;
//! use prism_rhi::pipeline::Pipeline;
//! use prism_rhi::shader::Shader;
//!
//! # fn example(
//! #     device: Arc<Device>,
//! #     vertex_shader: &Shader,
//! #     fragment_shader: &Shader,
//! #     render_pass: vk::RenderPass,
//! # ) -> Result<(), prism_rhi::RhiError> {
//! let bindings = [
//!     DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX),
//!     DescriptorBinding::combined_image_sampler(vk::ShaderStageFlags::FRAGMENT),
//! ];
//!
//! let pipeline = Pipeline::new(
//!     device,
//!     vertex_shader,
//!     fragment_shader,
//!     render_pass,
//!     &bindings,
//! )?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::info;

use crate::descriptor::{
    DescriptorBinding, create_pipeline_layout, create_set_layouts, destroy_set_layouts,
};
use crate::device::Device;
use crate::error::RhiResult;
use crate::shader::Shader;
use crate::vertex::MeshVertex;

/// Vulkan graphics pipeline wrapper.
///
/// Owns the pipeline handle together with the layout chain it was built
/// from. The set layouts here are never used to allocate descriptor sets;
/// drawables build their own layout-compatible sets.
///
/// # Thread Safety
///
/// The pipeline is immutable after creation and can be safely shared
/// between threads.
pub struct Pipeline {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan pipeline handle.
    pipeline: vk::Pipeline,
    /// Pipeline layout aggregating the set layouts below.
    pipeline_layout: vk::PipelineLayout,
    /// One single-binding set layout per binding list entry.
    set_layouts: Vec<vk::DescriptorSetLayout>,
}

impl Pipeline {
    /// Creates a graphics pipeline for the given shader pair.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `vertex_shader` - The vertex shader module
    /// * `fragment_shader` - The fragment shader module
    /// * `render_pass` - The render pass the pipeline renders within
    /// * `bindings` - Ordered resource bindings shared with drawables
    ///
    /// # Errors
    ///
    /// Returns an error if layout or pipeline creation fails. Objects
    /// created before the failing step are destroyed first.
    pub fn new(
        device: Arc<Device>,
        vertex_shader: &Shader,
        fragment_shader: &Shader,
        render_pass: vk::RenderPass,
        bindings: &[DescriptorBinding],
    ) -> RhiResult<Self> {
        let set_layouts = create_set_layouts(&device, bindings)?;

        let pipeline_layout = match create_pipeline_layout(&device, &set_layouts) {
            Ok(layout) => layout,
            Err(e) => {
                destroy_set_layouts(&device, &set_layouts);
                return Err(e);
            }
        };

        let shader_stages = [
            vertex_shader.stage_create_info(),
            fragment_shader.stage_create_info(),
        ];

        let vertex_bindings = [MeshVertex::binding_description()];
        let vertex_attributes = MeshVertex::attribute_descriptions();
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic, only the counts are baked in
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false)
            .line_width(1.0);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState {
            blend_enable: vk::FALSE,
            color_write_mask: vk::ColorComponentFlags::RGBA,
            ..Default::default()
        }];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(pipeline_layout)
            .render_pass(render_pass)
            .subpass(0);

        let result = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        };

        let pipeline = match result {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe {
                    device.handle().destroy_pipeline_layout(pipeline_layout, None);
                }
                destroy_set_layouts(&device, &set_layouts);
                return Err(e.into());
            }
        };

        info!("Graphics pipeline created");

        Ok(Self {
            device,
            pipeline,
            pipeline_layout,
            set_layouts,
        })
    }

    /// Returns the Vulkan pipeline handle.
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Returns the pipeline layout handle.
    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    /// Returns the pipeline bind point.
    #[inline]
    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        vk::PipelineBindPoint::GRAPHICS
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
            self.device
                .handle()
                .destroy_pipeline_layout(self.pipeline_layout, None);
        }
        destroy_set_layouts(&self.device, &self.set_layouts);
        info!("Graphics pipeline destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_is_send_sync() {
        // Compile-time check that Pipeline is Send + Sync
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
    }
}

//! GPU mirror of the scene registry.
//!
//! Every drawable added to a [`Scene`] gets a [`DrawableGpu`] holding its
//! vertex buffer, uniform buffers, sampled texture, descriptor sets, and
//! cached secondary command buffers. The mirror is synchronized against the
//! scene's revision counter, so unchanged scenes cost nothing per frame.

use std::sync::Arc;

use tracing::debug;

use prism_resources::Texture;
use prism_rhi::RhiResult;
use prism_rhi::buffer::{Buffer, BufferUsage};
use prism_rhi::command::{CommandBuffer, CommandPool};
use prism_rhi::descriptor::{DescriptorBinding, DescriptorBundle};
use prism_rhi::device::Device;
use prism_rhi::framebuffer::Framebuffer;
use prism_rhi::image::SampledImage;
use prism_rhi::pipeline::Pipeline;
use prism_rhi::render_pass::RenderPass;
use prism_rhi::sampler::Sampler;
use prism_rhi::sync::Fence;
use prism_rhi::vk;
use prism_scene::{Drawable, DrawableId, Scene};

use crate::context::RenderContext;
use crate::ubo::{CameraUBO, LightUBO, TransformsUBO};

/// Descriptor layout shared by every drawable and every pipeline.
///
/// Entry `i` becomes descriptor set `i`, each with a single binding 0:
/// set 0 = transform UBO, set 1 = texture sampler, set 2 = light UBO,
/// set 3 = camera UBO. Pipelines built from this list are layout-compatible
/// with every drawable's descriptor bundle.
pub(crate) const DRAWABLE_BINDINGS: [DescriptorBinding; 4] = [
    DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX),
    DescriptorBinding::combined_image_sampler(vk::ShaderStageFlags::FRAGMENT),
    DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX),
    DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX),
];

/// GPU resources backing one drawable.
pub struct DrawableGpu {
    /// Drawable name, for logs.
    pub(crate) name: String,
    /// Pipeline key stamped when the drawable entered the scene.
    pub(crate) pipeline: String,
    /// Interleaved vertex data, alive as long as the drawable.
    pub(crate) vertex_buffer: Buffer,
    /// Number of vertices to draw (triangle count times three).
    pub(crate) vertex_count: u32,
    /// Model/view/projection matrices, rewritten every frame.
    pub(crate) transforms_ubo: Buffer,
    /// Directional light parameters, rewritten every frame.
    pub(crate) light_ubo: Buffer,
    /// Camera parameters, rewritten every frame.
    pub(crate) camera_ubo: Buffer,
    /// Sampled texture image.
    pub(crate) image: SampledImage,
    /// Sampler for the texture image.
    pub(crate) sampler: Sampler,
    /// Four descriptor sets wired to the buffers and image above.
    pub(crate) bundle: DescriptorBundle,
    /// Cached secondary command buffer per swapchain image.
    pub(crate) secondaries: Vec<CommandBuffer>,
    /// Set when the cached secondaries no longer match the GPU state.
    pub(crate) dirty: bool,
}

impl DrawableGpu {
    /// Uploads one drawable's mesh and texture and wires its descriptors.
    ///
    /// The sampled image is left in `PREINITIALIZED` layout; the caller
    /// batches the transition to `SHADER_READ_ONLY_OPTIMAL` for all new
    /// images in one submit.
    fn new(context: &RenderContext, drawable: &Drawable, image_count: usize) -> RhiResult<Self> {
        let device = context.device();

        let vertices = drawable.mesh.interleave();
        let vertex_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Vertex,
            bytemuck::cast_slice(&vertices),
        )?;
        let vertex_count = (drawable.mesh.triangle_count() * 3) as u32;

        let transforms_ubo = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Uniform,
            bytemuck::bytes_of(&TransformsUBO::identity()),
        )?;
        let light_ubo = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Uniform,
            bytemuck::bytes_of(&LightUBO::default()),
        )?;
        let camera_ubo = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Uniform,
            bytemuck::bytes_of(&CameraUBO::default()),
        )?;

        // Drawables without a texture sample an opaque white pixel
        let fallback;
        let texture = match &drawable.texture {
            Some(texture) => texture,
            None => {
                fallback = Texture::solid(1, 1, [1.0, 1.0, 1.0, 1.0]);
                &fallback
            }
        };

        let image = SampledImage::new(
            device.clone(),
            vk::Extent2D {
                width: texture.width(),
                height: texture.height(),
            },
        )?;
        image.write_pixels(texture.pixels())?;

        let sampler = Sampler::new(device.clone())?;

        let bundle = DescriptorBundle::new(device.clone(), &DRAWABLE_BINDINGS)?;
        bundle.bind_buffer(0, transforms_ubo.handle())?;
        bundle.bind_image_sampler(1, image.view(), sampler.handle())?;
        bundle.bind_buffer(2, light_ubo.handle())?;
        bundle.bind_buffer(3, camera_ubo.handle())?;

        let mut secondaries = Vec::with_capacity(image_count);
        for _ in 0..image_count {
            secondaries.push(CommandBuffer::new_secondary(
                device.clone(),
                context.command_pool(),
            )?);
        }

        debug!(
            "Drawable '{}': {} vertices, {}x{} texture",
            drawable.name,
            vertex_count,
            texture.width(),
            texture.height()
        );

        Ok(Self {
            name: drawable.name.clone(),
            pipeline: drawable.pipeline.clone(),
            vertex_buffer,
            vertex_count,
            transforms_ubo,
            light_ubo,
            camera_ubo,
            image,
            sampler,
            bundle,
            secondaries,
            dirty: true,
        })
    }

    /// Rewrites the three uniform buffers for the current frame.
    pub(crate) fn upload_uniforms(
        &self,
        transforms: &TransformsUBO,
        light: &LightUBO,
        camera: &CameraUBO,
    ) -> RhiResult<()> {
        self.transforms_ubo
            .write_data(0, bytemuck::bytes_of(transforms))?;
        self.light_ubo.write_data(0, bytemuck::bytes_of(light))?;
        self.camera_ubo.write_data(0, bytemuck::bytes_of(camera))?;
        Ok(())
    }

    /// Reallocates the cached secondaries when the swapchain image count
    /// changed, marking them for re-recording.
    pub(crate) fn ensure_secondaries(
        &mut self,
        device: &Arc<Device>,
        pool: &CommandPool,
        image_count: usize,
    ) -> RhiResult<()> {
        if self.secondaries.len() != image_count {
            self.secondaries.clear();
            for _ in 0..image_count {
                self.secondaries
                    .push(CommandBuffer::new_secondary(device.clone(), pool)?);
            }
            self.dirty = true;
        }
        Ok(())
    }

    /// Records the cached secondary for one swapchain image.
    ///
    /// The buffer is begun with render-pass-continue and simultaneous-use,
    /// so it survives resubmission across frames until marked dirty.
    pub(crate) fn record_secondary(
        &self,
        image_index: usize,
        pipeline: &Pipeline,
        render_pass: &RenderPass,
        framebuffer: &Framebuffer,
    ) -> RhiResult<()> {
        let cmd = &self.secondaries[image_index];
        let extent = framebuffer.extent();

        cmd.begin_secondary(render_pass.handle(), framebuffer.handle())?;
        cmd.bind_pipeline(pipeline.bind_point(), pipeline.handle());

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        cmd.set_viewport(&viewport);

        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        cmd.set_scissor(&scissor);

        cmd.bind_descriptor_sets(
            pipeline.bind_point(),
            self.bundle.pipeline_layout(),
            0,
            self.bundle.sets(),
            &[],
        );
        cmd.bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
        cmd.draw(self.vertex_count, 1, 0, 0);
        cmd.end()?;

        Ok(())
    }
}

/// All GPU-side drawables, indexed like the scene registry.
pub struct GpuScene {
    /// One entry per scene drawable; `None` for drawables with no geometry.
    drawables: Vec<Option<DrawableGpu>>,
    /// Scene revision the mirror was last synchronized against.
    last_revision: u64,
}

impl GpuScene {
    /// Creates an empty mirror.
    pub fn new() -> Self {
        Self {
            drawables: Vec::new(),
            last_revision: 0,
        }
    }

    /// Uploads GPU resources for scene drawables added since the last call.
    ///
    /// The scene registry is append-only, so entries before the current
    /// length are already mirrored. New sampled images are transitioned to
    /// shader-read layout in a single blocking submit on the base command
    /// buffer.
    pub fn sync(&mut self, context: &RenderContext, scene: &Scene) -> RhiResult<()> {
        if scene.revision() == self.last_revision {
            return Ok(());
        }

        let image_count = context.swapchain().image_count() as usize;
        let mut new_images = Vec::new();

        for (id, drawable) in scene.iter() {
            if id.index() < self.drawables.len() {
                continue;
            }
            if drawable.mesh.triangle_count() == 0 {
                debug!("Drawable '{}' has no geometry, skipping upload", drawable.name);
                self.drawables.push(None);
                continue;
            }

            let gpu = DrawableGpu::new(context, drawable, image_count)?;
            new_images.push(gpu.image.handle());
            self.drawables.push(Some(gpu));
        }

        if !new_images.is_empty() {
            Self::prepare_images(context, &new_images)?;
        }

        self.last_revision = scene.revision();
        Ok(())
    }

    /// Transitions freshly written sampled images from `PREINITIALIZED` to
    /// `SHADER_READ_ONLY_OPTIMAL` and blocks until the GPU is done.
    fn prepare_images(context: &RenderContext, images: &[vk::Image]) -> RhiResult<()> {
        let cmd = context.base_cmd();

        cmd.begin()?;
        for &image in images {
            cmd.transition_image_layout(
                image,
                vk::ImageAspectFlags::COLOR,
                vk::ImageLayout::PREINITIALIZED,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::AccessFlags::HOST_WRITE,
                vk::PipelineStageFlags::HOST,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
            );
        }
        cmd.end()?;

        let fence = Fence::new(context.device().clone(), false)?;
        let command_buffers = [cmd.handle()];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        unsafe {
            context.device().submit(&[submit_info], fence.handle())?;
        }
        fence.wait(context.gpu_wait_timeout_ns())?;
        cmd.reset()?;

        debug!("Prepared {} sampled images for shader reads", images.len());
        Ok(())
    }

    /// Marks every cached secondary for re-recording.
    pub fn mark_dirty(&mut self) {
        for drawable in self.drawables.iter_mut().flatten() {
            drawable.dirty = true;
        }
    }

    /// Looks up the GPU mirror for a scene drawable.
    pub fn get(&self, id: DrawableId) -> Option<&DrawableGpu> {
        self.drawables.get(id.index()).and_then(|slot| slot.as_ref())
    }

    /// Iterates mutably over mirrored drawables.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut DrawableGpu> {
        self.drawables.iter_mut().flatten()
    }

    /// Number of drawables with GPU resources.
    pub fn len(&self) -> usize {
        self.drawables.iter().flatten().count()
    }

    /// Returns true if nothing has been mirrored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GpuScene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawable_binding_contract() {
        // Sets are transforms, sampler, light, camera in that order.
        assert_eq!(DRAWABLE_BINDINGS.len(), 4);

        assert_eq!(
            DRAWABLE_BINDINGS[0].descriptor_type,
            vk::DescriptorType::UNIFORM_BUFFER
        );
        assert_eq!(
            DRAWABLE_BINDINGS[1].descriptor_type,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        );
        assert_eq!(
            DRAWABLE_BINDINGS[2].descriptor_type,
            vk::DescriptorType::UNIFORM_BUFFER
        );
        assert_eq!(
            DRAWABLE_BINDINGS[3].descriptor_type,
            vk::DescriptorType::UNIFORM_BUFFER
        );

        assert_eq!(
            DRAWABLE_BINDINGS[1].stage_flags,
            vk::ShaderStageFlags::FRAGMENT
        );
        for binding in [0, 2, 3] {
            assert_eq!(
                DRAWABLE_BINDINGS[binding].stage_flags,
                vk::ShaderStageFlags::VERTEX
            );
        }
    }

    #[test]
    fn test_empty_gpu_scene() {
        use prism_resources::Mesh;

        let gpu_scene = GpuScene::new();
        assert!(gpu_scene.is_empty());
        assert_eq!(gpu_scene.len(), 0);

        // A never-synchronized mirror has no entry for any scene drawable.
        let mut scene = Scene::new();
        let mesh = Mesh::parse("o probe\n").unwrap();
        let id = scene.add_drawable(Drawable::new("probe", mesh));
        assert!(gpu_scene.get(id).is_none());
    }
}

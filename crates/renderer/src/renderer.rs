//! Top-level renderer.
//!
//! [`Renderer`] owns the Vulkan context, the graphics pipelines and the GPU
//! mirrors of scene drawables. Each call to [`Renderer::render_frame`]
//! uploads fresh uniform data, records the primary command buffer for the
//! acquired swapchain image and submits it, pacing the CPU at most
//! [`FRAME_LAG`](prism_rhi::sync::FRAME_LAG) frames ahead of the GPU.

use std::collections::HashMap;

use tracing::{debug, error, info};

use prism_core::RendererConfig;
use prism_platform::Window;
use prism_resources::ShaderSet;
use prism_rhi::pipeline::Pipeline;
use prism_rhi::shader::{Shader, ShaderStage};
use prism_rhi::swapchain::{AcquireResult, PresentResult};
use prism_rhi::vk;
use prism_rhi::{RhiError, RhiResult};
use prism_scene::{DEFAULT_PIPELINE, Scene};

use crate::context::RenderContext;
use crate::frame::{FrameCursor, FrameOutcome};
use crate::gpu_scene::{DRAWABLE_BINDINGS, GpuScene};
use crate::ubo::{CameraUBO, LightUBO, TransformsUBO};

/// Forward renderer drawing a [`Scene`] through the Vulkan backend.
///
/// Field order doubles as destruction order: the GPU scene and the
/// pipelines hold device references and must drop before the context tears
/// the device down.
pub struct Renderer {
    /// GPU mirrors of scene drawables.
    gpu_scene: GpuScene,
    /// Graphics pipelines keyed by the name drawables request.
    pipelines: HashMap<String, Pipeline>,
    /// Device, swapchain and per-slot synchronization state.
    context: RenderContext,
    /// Which synchronization slot and swapchain image the next frame uses.
    cursor: FrameCursor,
    /// Set when the swapchain must be rebuilt before the next frame.
    swapchain_stale: bool,
    /// Last known drawable surface width.
    width: u32,
    /// Last known drawable surface height.
    height: u32,
}

impl Renderer {
    /// Creates a renderer for the given window.
    ///
    /// Brings up the full Vulkan stack: instance, surface, device,
    /// swapchain, depth buffer, render pass, framebuffers and
    /// synchronization slots. No pipelines are registered yet; call
    /// [`Renderer::add_pipeline`] before the first frame.
    ///
    /// # Errors
    ///
    /// Returns an error if any Vulkan object creation fails or if no
    /// suitable GPU is found.
    pub fn new(window: &Window, config: &RendererConfig) -> RhiResult<Self> {
        info!(
            "Initializing renderer ({}x{})",
            window.width(),
            window.height()
        );

        let context = RenderContext::new(window, config)?;

        Ok(Self {
            gpu_scene: GpuScene::new(),
            pipelines: HashMap::new(),
            context,
            cursor: FrameCursor::new(),
            swapchain_stale: false,
            width: window.width(),
            height: window.height(),
        })
    }

    /// Compiles a shader set into a graphics pipeline and registers it
    /// under `name`.
    ///
    /// Drawables select a pipeline by name; unknown names fall back to
    /// [`DEFAULT_PIPELINE`], so at minimum a pipeline with that name must
    /// be registered before rendering a non-empty scene.
    ///
    /// # Errors
    ///
    /// Returns an error if shader module or pipeline creation fails.
    pub fn add_pipeline(&mut self, name: impl Into<String>, shaders: &ShaderSet) -> RhiResult<()> {
        let name = name.into();
        let device = self.context.device();

        let vertex =
            Shader::from_spirv_words(device.clone(), &shaders.vertex, ShaderStage::Vertex, "main")?;
        let fragment = Shader::from_spirv_words(
            device.clone(),
            &shaders.fragment,
            ShaderStage::Fragment,
            "main",
        )?;

        let pipeline = Pipeline::new(
            device.clone(),
            &vertex,
            &fragment,
            self.context.render_pass().handle(),
            &DRAWABLE_BINDINGS,
        )?;

        info!("Pipeline '{}' created", name);
        self.pipelines.insert(name, pipeline);
        Ok(())
    }

    /// Notifies the renderer that the drawable surface changed size.
    ///
    /// The swapchain is not rebuilt here; the next [`Renderer::render_frame`]
    /// call performs the recreation. Zero-sized dimensions are ignored, as
    /// produced by minimized windows.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            debug!("Ignoring resize to zero dimensions");
            return;
        }
        if width == self.width && height == self.height {
            return;
        }

        debug!(
            "Resize triggered: {}x{} -> {}x{}",
            self.width, self.height, width, height
        );
        self.width = width;
        self.height = height;
        self.swapchain_stale = true;
    }

    /// Renders one frame of the scene.
    ///
    /// # Rendering Steps
    ///
    /// 1. Rebuild the swapchain if a resize or stale present was flagged
    /// 2. Mirror new scene drawables to GPU resources
    /// 3. Wait on the current slot's fence, then acquire a swapchain image
    /// 4. Upload per-drawable uniform data for this frame
    /// 5. Record and submit the primary command buffer
    /// 6. Present and advance to the next synchronization slot
    ///
    /// A swapchain reported stale at acquire or present is rebuilt before
    /// returning, so the next call starts from a clean chain.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::Timeout`] if the GPU does not finish the oldest
    /// in-flight frame within the configured wait timeout, and
    /// [`RhiError::DeviceLost`] if the device is lost. Any other Vulkan
    /// failure is fatal and propagated as-is.
    pub fn render_frame(&mut self, scene: &Scene) -> RhiResult<()> {
        if self.swapchain_stale {
            self.recreate_swapchain()?;
        }

        self.gpu_scene.sync(&self.context, scene)?;

        match self.drive_frame(scene)? {
            FrameOutcome::Presented => Ok(()),
            FrameOutcome::SwapchainStale => {
                debug!("Swapchain stale, recreating before next frame");
                self.recreate_swapchain()
            }
        }
    }

    /// Returns the current swapchain extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.context.extent()
    }

    /// Rebuilds the swapchain and everything derived from it, then marks
    /// every cached secondary command buffer for re-recording.
    fn recreate_swapchain(&mut self) -> RhiResult<()> {
        self.context.recreate_swapchain()?;
        self.gpu_scene.mark_dirty();
        self.swapchain_stale = false;
        Ok(())
    }

    /// Runs the acquire, submit and present protocol for one frame.
    ///
    /// On [`FrameOutcome::SwapchainStale`] from acquire, the slot fence is
    /// left signaled and the cursor does not advance, so the retried frame
    /// reuses the same slot without deadlocking on its own fence.
    fn drive_frame(&mut self, scene: &Scene) -> RhiResult<FrameOutcome> {
        let slot_index = self.cursor.slot_index();
        let timeout_ns = self.context.gpu_wait_timeout_ns();

        self.context
            .frame_slot(slot_index)
            .in_flight_fence()
            .wait(timeout_ns)?;

        let acquire_semaphore = self.context.frame_slot(slot_index).image_acquired_handle();
        let image_index = match self.context.swapchain().acquire_next_image(acquire_semaphore)? {
            AcquireResult::Ready(index) => index,
            AcquireResult::OutOfDate => {
                debug!("Swapchain out of date at acquire");
                return Ok(FrameOutcome::SwapchainStale);
            }
        };
        self.cursor.set_image_index(image_index);

        // Reset the fence only once submission is certain.
        self.context
            .frame_slot(slot_index)
            .in_flight_fence()
            .reset()?;

        self.upload_uniforms(scene)?;
        self.record_commands(image_index as usize)?;

        let slot = self.context.frame_slot(slot_index);
        let wait_semaphores = [slot.image_acquired_handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [slot.draw_complete_handle()];
        let command_buffers = [self.context.primary_cmd(image_index as usize).handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.context
                .device()
                .submit(&[submit_info], slot.in_flight_fence_handle())?;
        }

        let present_result = self.context.swapchain().present(
            self.context.device().queue(),
            image_index,
            slot.draw_complete_handle(),
        )?;

        self.cursor.advance();

        match present_result {
            PresentResult::Presented => Ok(FrameOutcome::Presented),
            PresentResult::OutOfDate => Ok(FrameOutcome::SwapchainStale),
        }
    }

    /// Writes this frame's uniform data into every mirrored drawable.
    ///
    /// View and projection are computed once; the model matrix varies per
    /// drawable.
    fn upload_uniforms(&self, scene: &Scene) -> RhiResult<()> {
        let view = scene.camera.view_matrix();
        let projection = scene.camera.projection_matrix();
        let light = LightUBO::new(&scene.light);
        let camera = CameraUBO::new(&scene.camera);

        for (id, drawable) in scene.iter() {
            if let Some(gpu) = self.gpu_scene.get(id) {
                let transforms =
                    TransformsUBO::new(drawable.transform.model_matrix(), view, projection);
                gpu.upload_uniforms(&transforms, &light, &camera)?;
            }
        }

        Ok(())
    }

    /// Records the primary command buffer for the acquired image.
    ///
    /// Secondary command buffers are re-recorded only for drawables marked
    /// dirty; everything else replays the cached recording.
    fn record_commands(&mut self, image_index: usize) -> RhiResult<()> {
        let context = &self.context;
        let pipelines = &self.pipelines;
        let image_count = context.swapchain().image_count() as usize;

        let mut handles = Vec::with_capacity(self.gpu_scene.len());
        for gpu in self.gpu_scene.iter_mut() {
            gpu.ensure_secondaries(context.device(), context.command_pool(), image_count)?;

            if gpu.dirty {
                let pipeline = match pipelines.get(&gpu.pipeline) {
                    Some(pipeline) => pipeline,
                    None => {
                        debug!(
                            "Drawable '{}' wants unknown pipeline '{}', using '{}'",
                            gpu.name, gpu.pipeline, DEFAULT_PIPELINE
                        );
                        pipelines.get(DEFAULT_PIPELINE).ok_or_else(|| {
                            RhiError::PipelineError(format!(
                                "no pipeline registered under '{DEFAULT_PIPELINE}'"
                            ))
                        })?
                    }
                };

                for index in 0..image_count {
                    gpu.record_secondary(
                        index,
                        pipeline,
                        context.render_pass(),
                        context.framebuffer(index),
                    )?;
                }
                gpu.dirty = false;
            }

            handles.push(gpu.secondaries[image_index].handle());
        }

        let primary = context.primary_cmd(image_index);
        primary.begin()?;
        primary.begin_render_pass(
            context.render_pass().handle(),
            context.framebuffer(image_index).handle(),
            context.extent(),
        );
        // vkCmdExecuteCommands rejects an empty list; an empty scene still
        // clears the attachments.
        if !handles.is_empty() {
            primary.execute_commands(&handles);
        }
        primary.end_render_pass();
        primary.end()?;

        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.context.device().wait_idle() {
            error!("Failed to wait for device idle during renderer drop: {:?}", e);
        }
        info!("Renderer destroyed");
    }
}

//! VkSwapchainKHR creation, acquisition, presentation, and recreation.
//!
//! A [`Swapchain`] negotiates its settings with the surface rather than
//! taking them from the caller: extent, image count, pre-transform, and
//! composite alpha all come from the reported capabilities, and the pixel
//! format is whatever the surface lists first. Presentation always uses
//! FIFO, the one mode every Vulkan implementation provides.
//!
//! Acquire and present report a stale swapchain through their return
//! values rather than as errors; [`Swapchain::recreate`] then rebuilds
//! against the resized surface.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use prism_rhi::instance::Instance;
//! use prism_rhi::device::Device;
//! use prism_rhi::swapchain::{AcquireResult, Swapchain};
//! use ash::vk;
//!
//! # fn example(
//! #     instance: &Instance,
//! #     device: Arc<Device>,
//! #     surface: vk::SurfaceKHR,
//! # ) -> Result<(), prism_rhi::RhiError> {
//! // Ask for three images; the surface may clamp the count
//! let swapchain = Swapchain::new(instance, device, surface, 3)?;
//!
//! // In the render loop:
//! // let image_index = match swapchain.acquire_next_image(semaphore)? {
//! //     AcquireResult::Ready(index) => index,
//! //     AcquireResult::OutOfDate => { /* recreate and retry */ }
//! // };
//! // ... render to swapchain.image_view(image_index as usize) ...
//! // swapchain.present(queue, image_index, draw_complete_semaphore)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;

/// Outcome of acquiring a swapchain image.
///
/// A suboptimal acquire still signals the semaphore and yields a usable
/// image, so it is reported as [`AcquireResult::Ready`]. Only an
/// out-of-date swapchain forces the caller to recreate before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireResult {
    /// An image was acquired and can be rendered to.
    Ready(u32),
    /// The swapchain no longer matches the surface and must be recreated.
    OutOfDate,
}

/// Outcome of presenting a swapchain image.
///
/// Unlike acquire, a suboptimal present is reported as
/// [`PresentResult::OutOfDate`]: the image already reached the screen, so
/// recreating before the next frame costs nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    /// The image was queued for presentation.
    Presented,
    /// The swapchain no longer matches the surface and must be recreated.
    OutOfDate,
}

/// What a surface offers swapchains built against it.
#[derive(Debug, Clone)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// Runs the three surface queries for one physical device.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the queries fail.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        let support = unsafe {
            Self {
                capabilities: surface_loader
                    .get_physical_device_surface_capabilities(physical_device, surface)?,
                formats: surface_loader
                    .get_physical_device_surface_formats(physical_device, surface)?,
                present_modes: surface_loader
                    .get_physical_device_surface_present_modes(physical_device, surface)?,
            }
        };

        debug!(
            "Surface offers {} format(s), {} present mode(s)",
            support.formats.len(),
            support.present_modes.len()
        );

        Ok(support)
    }

    /// True when at least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Owner of a `VkSwapchainKHR` and one color view per image.
///
/// The images themselves belong to the swapchain; only the views are
/// created and destroyed here. Nothing is internally synchronized, so
/// acquire, present, and recreate all stay on the render thread.
pub struct Swapchain {
    device: Arc<Device>,
    loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    // Carried across recreates so resizes keep the configured depth.
    desired_image_count: u32,
}

impl Swapchain {
    /// Builds a swapchain against `surface`.
    ///
    /// Settings are negotiated from the surface: the first reported
    /// format, the reported extent (or the maximum image extent when the
    /// surface leaves the choice open), `desired_image_count` clamped to
    /// the supported range, and FIFO presentation.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface queries fail, the surface reports
    /// no formats or present modes, or swapchain or image view creation
    /// fails.
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        desired_image_count: u32,
    ) -> Result<Self, RhiError> {
        let loader = ash::khr::swapchain::Device::new(instance.handle(), device.handle());
        let parts = build_swapchain(
            instance,
            &device,
            &loader,
            surface,
            desired_image_count,
            vk::SwapchainKHR::null(),
        )?;

        Ok(Self {
            device,
            loader,
            swapchain: parts.swapchain,
            images: parts.images,
            image_views: parts.image_views,
            format: parts.format,
            extent: parts.extent,
            desired_image_count,
        })
    }

    /// Rebuilds the swapchain against the current surface state.
    ///
    /// Call this after a resize, or when acquire or present report the
    /// swapchain out of date. The retiring swapchain is handed to the
    /// driver as `old_swapchain` and destroyed once the rebuild succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error when the rebuild fails; the swapchain is not
    /// usable afterwards and callers treat this as fatal.
    pub fn recreate(
        &mut self,
        instance: &Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(), RhiError> {
        // In-flight frames may still reference the old views.
        self.device.wait_idle()?;

        info!("Recreating swapchain");
        self.destroy_image_views();

        let retiring = self.swapchain;
        let parts = build_swapchain(
            instance,
            &self.device,
            &self.loader,
            surface,
            self.desired_image_count,
            retiring,
        )?;
        unsafe { self.loader.destroy_swapchain(retiring, None) };

        self.swapchain = parts.swapchain;
        self.images = parts.images;
        self.image_views = parts.image_views;
        self.format = parts.format;
        self.extent = parts.extent;

        Ok(())
    }

    /// Acquires the next image, blocking until one is available.
    ///
    /// `semaphore` is signaled when the image can be written. A
    /// suboptimal swapchain still hands out usable images, so only
    /// `OUT_OF_DATE` demands action from the caller.
    ///
    /// # Errors
    ///
    /// Returns an error on any acquisition failure other than the
    /// swapchain being out of date.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> RhiResult<AcquireResult> {
        let result = unsafe {
            self.loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, suboptimal)) => {
                if suboptimal {
                    debug!("Acquired suboptimal swapchain image {}", image_index);
                }
                Ok(AcquireResult::Ready(image_index))
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireResult::OutOfDate),
            Err(e) => Err(e.into()),
        }
    }

    /// Queues `image_index` for presentation on `queue`.
    ///
    /// Presentation waits on `wait_semaphore`, signaled by the frame's
    /// submission when rendering finishes.
    ///
    /// # Errors
    ///
    /// Returns an error on any presentation failure other than the
    /// swapchain being out of date.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> RhiResult<PresentResult> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe { self.loader.queue_present(queue, &present_info) };

        match result {
            Ok(false) => Ok(PresentResult::Presented),
            Ok(true) => {
                debug!("Presented to suboptimal swapchain");
                Ok(PresentResult::OutOfDate)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentResult::OutOfDate),
            Err(e) => Err(e.into()),
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Pixel format of the swapchain images.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Current swapchain resolution.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Number of images the swapchain actually created.
    #[inline]
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    /// View over the image at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn image_view(&self, index: usize) -> vk::ImageView {
        self.image_views[index]
    }

    fn destroy_image_views(&mut self) {
        for view in self.image_views.drain(..) {
            unsafe { self.device.handle().destroy_image_view(view, None) };
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        // Views go first; the images they wrap belong to the swapchain.
        self.destroy_image_views();
        unsafe { self.loader.destroy_swapchain(self.swapchain, None) };
        info!(
            "Swapchain destroyed ({}x{}, {} images)",
            self.extent.width,
            self.extent.height,
            self.images.len()
        );
    }
}

/// Handles produced by one swapchain build, before they are installed.
struct SwapchainParts {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
}

/// Negotiates settings with the surface and builds the swapchain.
///
/// On failure every handle created along the way is destroyed, including
/// a partially built swapchain.
fn build_swapchain(
    instance: &Instance,
    device: &Device,
    loader: &ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    desired_image_count: u32,
    old_swapchain: vk::SwapchainKHR,
) -> Result<SwapchainParts, RhiError> {
    let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
    let support = SurfaceSupport::query(device.physical_device(), surface, &surface_loader)?;
    if !support.is_adequate() {
        return Err(RhiError::SwapchainError(
            "surface reports no formats or present modes".to_string(),
        ));
    }

    // The render pass takes its color attachment format from the
    // swapchain, so any reported format works; take the first.
    let surface_format = support.formats[0];
    let extent = choose_extent(&support.capabilities);
    let image_count = clamp_image_count(desired_image_count, &support.capabilities);

    info!(
        "Creating swapchain: {}x{}, {:?}/{:?}, {} images, FIFO",
        extent.width,
        extent.height,
        surface_format.format,
        surface_format.color_space,
        image_count
    );

    // Graphics and present share one queue family, so EXCLUSIVE sharing
    // needs no queue family index list.
    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(choose_pre_transform(&support.capabilities))
        .composite_alpha(choose_composite_alpha(&support.capabilities))
        .present_mode(vk::PresentModeKHR::FIFO)
        .clipped(true)
        .old_swapchain(old_swapchain);

    let swapchain = unsafe { loader.create_swapchain(&create_info, None)? };

    let images = unsafe { loader.get_swapchain_images(swapchain) }.map_err(|e| {
        unsafe { loader.destroy_swapchain(swapchain, None) };
        RhiError::from(e)
    })?;

    let image_views = create_image_views(device, &images, surface_format.format).map_err(|e| {
        unsafe { loader.destroy_swapchain(swapchain, None) };
        e
    })?;

    info!("Swapchain ready with {} images", images.len());

    Ok(SwapchainParts {
        swapchain,
        images,
        image_views,
        format: surface_format.format,
        extent,
    })
}

/// Extent reported by the surface, or its maximum image extent when the
/// surface leaves the choice to the swapchain (both dimensions `u32::MAX`).
fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR) -> vk::Extent2D {
    if capabilities.current_extent.width == u32::MAX {
        debug!(
            "Surface leaves the extent open, taking maximum {}x{}",
            capabilities.max_image_extent.width, capabilities.max_image_extent.height
        );
        capabilities.max_image_extent
    } else {
        capabilities.current_extent
    }
}

/// `desired` raised to the surface minimum and capped at its maximum.
/// A maximum of zero means the surface imposes no cap.
fn clamp_image_count(desired: u32, capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = desired.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count = count.min(capabilities.max_image_count);
    }

    if count != desired {
        debug!("Image count {} not available, using {}", desired, count);
    }

    count
}

/// IDENTITY when the surface supports it, otherwise whatever transform
/// the surface currently applies.
fn choose_pre_transform(capabilities: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    if capabilities
        .supported_transforms
        .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
    {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        capabilities.current_transform
    }
}

/// First supported mode out of opaque, pre-multiplied, post-multiplied,
/// then inherit.
fn choose_composite_alpha(
    capabilities: &vk::SurfaceCapabilitiesKHR,
) -> vk::CompositeAlphaFlagsKHR {
    const PREFERENCE: [vk::CompositeAlphaFlagsKHR; 4] = [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::INHERIT,
    ];

    PREFERENCE
        .into_iter()
        .find(|&mode| capabilities.supported_composite_alpha.contains(mode))
        .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

/// Builds one 2D color view per swapchain image.
///
/// The default component mapping keeps every channel on identity. If a
/// view fails, the ones already built are destroyed before returning.
fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<vk::ImageView>, RhiError> {
    let subresource_range = vk::ImageSubresourceRange::default()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1);

    let mut views = Vec::with_capacity(images.len());
    for &image in images {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(subresource_range);

        match unsafe { device.handle().create_image_view(&create_info, None) } {
            Ok(view) => views.push(view),
            Err(e) => {
                for &view in &views {
                    unsafe { device.handle().destroy_image_view(view, None) };
                }
                return Err(RhiError::SwapchainError(format!(
                    "failed to create image view {} of {}: {:?}",
                    views.len(),
                    images.len(),
                    e
                )));
            }
        }
    }

    debug!("Created {} swapchain image views", views.len());
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min_images: u32, max_images: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_images,
            max_image_count: max_images,
            ..Default::default()
        }
    }

    #[test]
    fn test_extent_follows_surface() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
            max_image_extent: vk::Extent2D {
                width: 8192,
                height: 8192,
            },
            ..Default::default()
        };

        let extent = choose_extent(&capabilities);
        assert_eq!((extent.width, extent.height), (1280, 720));
    }

    #[test]
    fn test_open_extent_takes_maximum() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            max_image_extent: vk::Extent2D {
                width: 2560,
                height: 1440,
            },
            ..Default::default()
        };

        let extent = choose_extent(&capabilities);
        assert_eq!((extent.width, extent.height), (2560, 1440));
    }

    #[test]
    fn test_clamp_image_count() {
        // In range, below the minimum, above the maximum
        assert_eq!(clamp_image_count(3, &caps(2, 4)), 3);
        assert_eq!(clamp_image_count(1, &caps(2, 4)), 2);
        assert_eq!(clamp_image_count(9, &caps(2, 4)), 4);

        // max_image_count of 0 leaves the count uncapped
        assert_eq!(clamp_image_count(12, &caps(2, 0)), 12);
    }

    #[test]
    fn test_choose_pre_transform_prefers_identity() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY
                | vk::SurfaceTransformFlagsKHR::ROTATE_90,
            current_transform: vk::SurfaceTransformFlagsKHR::ROTATE_90,
            ..Default::default()
        };
        assert_eq!(
            choose_pre_transform(&capabilities),
            vk::SurfaceTransformFlagsKHR::IDENTITY
        );
    }

    #[test]
    fn test_choose_pre_transform_falls_back_to_current() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            supported_transforms: vk::SurfaceTransformFlagsKHR::ROTATE_90
                | vk::SurfaceTransformFlagsKHR::ROTATE_180,
            current_transform: vk::SurfaceTransformFlagsKHR::ROTATE_180,
            ..Default::default()
        };
        assert_eq!(
            choose_pre_transform(&capabilities),
            vk::SurfaceTransformFlagsKHR::ROTATE_180
        );
    }

    #[test]
    fn test_choose_composite_alpha_prefers_opaque() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE
                | vk::CompositeAlphaFlagsKHR::INHERIT,
            ..Default::default()
        };
        assert_eq!(
            choose_composite_alpha(&capabilities),
            vk::CompositeAlphaFlagsKHR::OPAQUE
        );
    }

    #[test]
    fn test_choose_composite_alpha_preference_order() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED
                | vk::CompositeAlphaFlagsKHR::INHERIT,
            ..Default::default()
        };
        assert_eq!(
            choose_composite_alpha(&capabilities),
            vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED
        );

        let capabilities = vk::SurfaceCapabilitiesKHR {
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::INHERIT,
            ..Default::default()
        };
        assert_eq!(
            choose_composite_alpha(&capabilities),
            vk::CompositeAlphaFlagsKHR::INHERIT
        );
    }

    #[test]
    fn test_surface_support_adequacy() {
        let full = SurfaceSupport {
            capabilities: caps(2, 4),
            formats: vec![vk::SurfaceFormatKHR::default()],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(full.is_adequate());

        let mut no_formats = full.clone();
        no_formats.formats.clear();
        assert!(!no_formats.is_adequate());

        let mut no_modes = full;
        no_modes.present_modes.clear();
        assert!(!no_modes.is_adequate());
    }

    #[test]
    fn test_acquire_result_equality() {
        assert_eq!(AcquireResult::Ready(2), AcquireResult::Ready(2));
        assert_ne!(AcquireResult::Ready(0), AcquireResult::OutOfDate);
        assert_eq!(PresentResult::OutOfDate, PresentResult::OutOfDate);
    }
}

//! GPU image management.
//!
//! This module provides the two image kinds the engine needs:
//! - [`SampledImage`] - a linear-tiled texture written directly by the CPU
//! - [`DepthImage`] - an optimal-tiled depth attachment
//!
//! # Overview
//!
//! Sampled images use `R32G32B32A32_SFLOAT` with linear tiling and
//! host-visible memory, so texel data is written through a memory mapping
//! rather than a staging copy. The driver reports the actual row pitch of
//! the linear layout, which may be wider than the tightly packed row, so
//! uploads advance destination rows by the reported pitch.
//!
//! Depth images use `D16_UNORM` with optimal tiling and device-local
//! memory. Their contents never leave the GPU.
//!
//! Each image owns a dedicated allocation bound at offset 0 and an image
//! view over its single mip level.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::memory::find_memory_type_index;

/// Creates an image, allocates dedicated memory for it, and binds the two.
///
/// Any handle created before a failing step is destroyed before the error
/// is returned, so callers never see a partially constructed image.
fn create_bound_image(
    device: &Device,
    image_info: &vk::ImageCreateInfo,
    memory_flags: vk::MemoryPropertyFlags,
) -> RhiResult<(vk::Image, vk::DeviceMemory)> {
    let image = unsafe { device.handle().create_image(image_info, None)? };

    let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

    let memory_type_index = match find_memory_type_index(
        requirements.memory_type_bits,
        device.memory_properties(),
        memory_flags,
    ) {
        Ok(index) => index,
        Err(e) => {
            unsafe { device.handle().destroy_image(image, None) };
            return Err(e);
        }
    };

    let alloc_info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);

    let memory = match unsafe { device.handle().allocate_memory(&alloc_info, None) } {
        Ok(memory) => memory,
        Err(e) => {
            unsafe { device.handle().destroy_image(image, None) };
            return Err(e.into());
        }
    };

    if let Err(e) = unsafe { device.handle().bind_image_memory(image, memory, 0) } {
        unsafe {
            device.handle().free_memory(memory, None);
            device.handle().destroy_image(image, None);
        }
        return Err(e.into());
    }

    Ok((image, memory))
}

/// A 2D texture image the CPU writes and shaders sample.
///
/// The image starts in `PREINITIALIZED` layout so texel data written through
/// the mapping survives the later transition to `SHADER_READ_ONLY_OPTIMAL`.
pub struct SampledImage {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan image handle.
    image: vk::Image,
    /// Dedicated memory backing the image, bound at offset 0.
    memory: vk::DeviceMemory,
    /// View over the single mip level.
    view: vk::ImageView,
    /// Image dimensions.
    extent: vk::Extent2D,
}

impl SampledImage {
    /// Texel format of every sampled image.
    pub const FORMAT: vk::Format = vk::Format::R32G32B32A32_SFLOAT;

    /// Floats per texel (RGBA).
    pub const CHANNELS: usize = 4;

    /// Creates a sampled image of the given dimensions.
    ///
    /// The image uses linear tiling and host-visible, host-coherent memory
    /// so [`write_pixels`](Self::write_pixels) can fill it directly.
    ///
    /// # Errors
    ///
    /// Returns an error if image creation, memory allocation, binding, or
    /// view creation fails. No partially constructed handles are leaked.
    pub fn new(device: Arc<Device>, extent: vk::Extent2D) -> RhiResult<Self> {
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(Self::FORMAT)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::LINEAR)
            .usage(vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::PREINITIALIZED);

        let (image, memory) = create_bound_image(
            &device,
            &image_info,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(Self::FORMAT)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let view = match unsafe { device.handle().create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                unsafe {
                    device.handle().destroy_image(image, None);
                    device.handle().free_memory(memory, None);
                }
                return Err(e.into());
            }
        };

        debug!("Created sampled image {}x{}", extent.width, extent.height);

        Ok(Self {
            device,
            image,
            memory,
            view,
            extent,
        })
    }

    /// Writes RGBA float texels into the image through a memory mapping.
    ///
    /// `pixels` must hold exactly `width * height * 4` floats in row-major
    /// order. Destination rows are spaced by the row pitch the driver
    /// reports for the linear layout; source rows are tightly packed.
    ///
    /// # Errors
    ///
    /// Returns an error if the pixel count does not match the image
    /// dimensions or if mapping fails.
    pub fn write_pixels(&self, pixels: &[f32]) -> RhiResult<()> {
        let width = self.extent.width as usize;
        let height = self.extent.height as usize;
        let expected = width * height * Self::CHANNELS;
        if pixels.len() != expected {
            return Err(RhiError::InvalidHandle(format!(
                "Pixel count mismatch: expected {} floats for {}x{}, got {}",
                expected,
                self.extent.width,
                self.extent.height,
                pixels.len()
            )));
        }

        let subresource = vk::ImageSubresource {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            array_layer: 0,
        };
        let layout = unsafe {
            self.device
                .handle()
                .get_image_subresource_layout(self.image, subresource)
        };

        let row_floats = width * Self::CHANNELS;

        unsafe {
            let mapped = self.device.handle().map_memory(
                self.memory,
                0,
                vk::WHOLE_SIZE,
                vk::MemoryMapFlags::empty(),
            )? as *mut u8;

            for row in 0..height {
                let src = pixels[row * row_floats..(row + 1) * row_floats].as_ptr();
                let dst = mapped
                    .add(layout.offset as usize + row * layout.row_pitch as usize)
                    as *mut f32;
                std::ptr::copy_nonoverlapping(src, dst, row_floats);
            }

            self.device.handle().unmap_memory(self.memory);
        }

        Ok(())
    }

    /// Returns the Vulkan image handle.
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Returns the image view handle.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Returns the image dimensions.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for SampledImage {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_image_view(self.view, None);
            self.device.handle().destroy_image(self.image, None);
            self.device.handle().free_memory(self.memory, None);
        }
        debug!("Destroyed sampled image");
    }
}

/// The depth attachment backing a framebuffer.
///
/// A single depth image is shared by all framebuffers of a swapchain; only
/// one frame writes depth at a time because the render pass serializes on
/// the depth attachment.
pub struct DepthImage {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan image handle.
    image: vk::Image,
    /// Dedicated memory backing the image, bound at offset 0.
    memory: vk::DeviceMemory,
    /// Depth-aspect view used as a framebuffer attachment.
    view: vk::ImageView,
    /// Image dimensions, matching the swapchain extent.
    extent: vk::Extent2D,
}

impl DepthImage {
    /// Texel format of every depth image.
    pub const FORMAT: vk::Format = vk::Format::D16_UNORM;

    /// Creates a depth image matching the given swapchain extent.
    ///
    /// # Errors
    ///
    /// Returns an error if image creation, memory allocation, binding, or
    /// view creation fails. No partially constructed handles are leaked.
    pub fn new(device: Arc<Device>, extent: vk::Extent2D) -> RhiResult<Self> {
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(Self::FORMAT)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let (image, memory) = create_bound_image(
            &device,
            &image_info,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(Self::FORMAT)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::DEPTH)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let view = match unsafe { device.handle().create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                unsafe {
                    device.handle().destroy_image(image, None);
                    device.handle().free_memory(memory, None);
                }
                return Err(e.into());
            }
        };

        debug!("Created depth image {}x{}", extent.width, extent.height);

        Ok(Self {
            device,
            image,
            memory,
            view,
            extent,
        })
    }

    /// Returns the Vulkan image handle.
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Returns the image view handle.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Returns the image dimensions.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for DepthImage {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_image_view(self.view, None);
            self.device.handle().destroy_image(self.image, None);
            self.device.handle().free_memory(self.memory, None);
        }
        debug!("Destroyed depth image");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampled_image_format() {
        assert_eq!(SampledImage::FORMAT, vk::Format::R32G32B32A32_SFLOAT);
        assert_eq!(SampledImage::CHANNELS, 4);
    }

    #[test]
    fn test_depth_image_format() {
        assert_eq!(DepthImage::FORMAT, vk::Format::D16_UNORM);
    }
}

//! Texture sampler.
//!
//! Every material in the engine samples its texture the same way, so a
//! single fixed sampler configuration is enough: nearest filtering,
//! clamp-to-edge addressing, no anisotropy, no mipmaps.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan sampler wrapper with the engine's fixed configuration.
pub struct Sampler {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan sampler handle.
    sampler: vk::Sampler,
}

impl Sampler {
    /// Creates a sampler.
    ///
    /// # Errors
    ///
    /// Returns an error if sampler creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::NEAREST)
            .min_filter(vk::Filter::NEAREST)
            .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .mip_lod_bias(0.0)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .compare_enable(false)
            .compare_op(vk::CompareOp::NEVER)
            .min_lod(0.0)
            .max_lod(0.0)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE)
            .unnormalized_coordinates(false);

        let sampler = unsafe { device.handle().create_sampler(&create_info, None)? };

        debug!("Created sampler");

        Ok(Self { device, sampler })
    }

    /// Returns the Vulkan sampler handle.
    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_sampler(self.sampler, None);
        }
        debug!("Destroyed sampler");
    }
}

//! Vulkan logical device and its queue.
//!
//! [`Device`] owns the `VkDevice` and the one queue all work runs on.
//! Device selection guarantees that queue family supports both graphics and
//! presentation, so submissions and presents never cross queues and no
//! queue ownership transfers are needed. The only extension enabled is
//! swapchain support. [`Device::memory_properties`] exposes the memory
//! layout that buffer and image allocations pick their memory types from.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use prism_rhi::instance::Instance;
//! use prism_rhi::physical_device::select_physical_device;
//! use prism_rhi::device::Device;
//! use ash::vk;
//!
//! # fn example(surface: vk::SurfaceKHR) -> Result<(), prism_rhi::RhiError> {
//! let instance = Instance::new(false, &[])?;
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//!
//! let physical_device_info = select_physical_device(instance.handle(), surface, &surface_loader)?;
//! let device = Device::new(&instance, &physical_device_info)?;
//!
//! // All submissions and presents go through the same queue
//! let queue = device.queue();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::error::RhiError;
use crate::instance::Instance;
use crate::physical_device::PhysicalDeviceInfo;

/// Required device extensions.
const DEVICE_EXTENSIONS: &[&std::ffi::CStr] = &[ash::khr::swapchain::NAME];

/// Owner of the `VkDevice` and its combined graphics + present queue.
///
/// Shared as `Arc<Device>`: every resource wrapper keeps a clone, so the
/// device is destroyed only after everything created from it is gone.
pub struct Device {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    queue: vk::Queue,
    queue_family_index: u32,
    // Cached at creation so allocations need no further instance calls.
    memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl Device {
    /// Creates the logical device and retrieves its queue.
    ///
    /// Enables the swapchain extension and nothing else; no optional device
    /// features are requested. The queue comes from the combined family
    /// chosen during physical device selection.
    ///
    /// # Errors
    ///
    /// Returns an error if device creation fails.
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
    ) -> Result<Arc<Self>, RhiError> {
        let queue_family_index = physical_device_info.queue_family_index;
        let queue_priorities = [1.0f32];

        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(&queue_priorities)];

        debug!("Creating one queue from family {}", queue_family_index);

        let extension_names: Vec<*const i8> =
            DEVICE_EXTENSIONS.iter().map(|ext| ext.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };

        info!(
            "Logical device created with {} extension(s)",
            DEVICE_EXTENSIONS.len()
        );

        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };
        debug!("Queue retrieved from family {}", queue_family_index);

        Ok(Arc::new(Self {
            device,
            physical_device: physical_device_info.device,
            queue,
            queue_family_index,
            memory_properties: physical_device_info.memory_properties,
        }))
    }

    /// Raw `ash::Device`, for issuing Vulkan calls directly.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// The queue all submissions and presents go through.
    #[inline]
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Memory layout of the physical device. Resource constructors pick
    /// their memory types from this.
    #[inline]
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    /// Blocks until all queues drain. Called before teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails.
    pub fn wait_idle(&self) -> Result<(), RhiError> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Submits command buffers to the queue, signaling `fence` when done.
    ///
    /// # Safety
    ///
    /// Every command buffer referenced by `submit_infos` must be fully
    /// recorded and must stay alive until the submission retires, and
    /// `fence` must be unsignaled and not in use by another submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission fails.
    pub unsafe fn submit(
        &self,
        submit_infos: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> Result<(), RhiError> {
        unsafe {
            self.device.queue_submit(self.queue, submit_infos, fence)?;
        }
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            // Work may still be in flight; the queue must drain before destroy_device.
            if let Err(e) = self.device.device_wait_idle() {
                tracing::error!("Failed to wait for device idle during drop: {:?}", e);
            }

            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// Safety: ash::Device is Send + Sync, and the remaining fields are raw
// handles and plain data with no interior mutability.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_extensions_defined() {
        assert!(!DEVICE_EXTENSIONS.is_empty());
        assert!(DEVICE_EXTENSIONS.contains(&ash::khr::swapchain::NAME));
    }

    #[test]
    fn test_device_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }
}

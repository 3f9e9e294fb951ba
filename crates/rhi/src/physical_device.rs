//! GPU enumeration and selection.
//!
//! The policy is fixed: the first discrete GPU wins, and within it the
//! first queue family that can do both graphics and presentation to the
//! target surface. Every submission in the engine goes through that one
//! family, so a GPU without a combined family is rejected outright.
//!
//! # Example
//!
//! ```no_run
//! use prism_rhi::instance::Instance;
//! use prism_rhi::physical_device::select_physical_device;
//! use ash::vk;
//!
//! # fn example(surface: vk::SurfaceKHR) -> Result<(), prism_rhi::RhiError> {
//! let instance = Instance::new(false, &[])?;
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//!
//! let device_info = select_physical_device(instance.handle(), surface, &surface_loader)?;
//! println!("Selected GPU: {}", device_info.device_name());
//! # Ok(())
//! # }
//! ```

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::RhiError;

/// The selected GPU and the facts logical device creation needs from it.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    pub device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    /// Heap and memory type layout, cached for buffer and image allocation.
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// The combined graphics + present family all work is submitted to.
    pub queue_family_index: u32,
}

impl PhysicalDeviceInfo {
    /// GPU name as reported by the driver.
    pub fn device_name(&self) -> &str {
        unsafe {
            CStr::from_ptr(self.properties.device_name.as_ptr())
                .to_str()
                .unwrap_or("<unknown>")
        }
    }

    /// Lowercase label for the device type, for log output.
    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "discrete",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "integrated",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "virtual",
            vk::PhysicalDeviceType::CPU => "cpu",
            _ => "other",
        }
    }

    /// Major, minor, and patch of the driver's reported API version.
    pub fn api_version(&self) -> (u32, u32, u32) {
        let version = self.properties.api_version;
        (
            vk::api_version_major(version),
            vk::api_version_minor(version),
            vk::api_version_patch(version),
        )
    }

    /// Total bytes across all `DEVICE_LOCAL` memory heaps.
    pub fn local_memory_bytes(&self) -> u64 {
        let heap_count = self.memory_properties.memory_heap_count as usize;
        self.memory_properties.memory_heaps[..heap_count]
            .iter()
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size)
            .sum()
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (major, minor, patch) = self.api_version();
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("kind", &self.device_type_name())
            .field("vulkan", &format_args!("{}.{}.{}", major, minor, patch))
            .field("queue_family_index", &self.queue_family_index)
            .finish()
    }
}

/// Picks the GPU the renderer will run on.
///
/// The first enumerated discrete GPU wins. Within that GPU, the first
/// queue family supporting both graphics operations and presentation to
/// `surface` carries all submissions.
///
/// # Errors
///
/// Returns [`RhiError::NoDiscreteGpu`] if no discrete GPU is present, or
/// [`RhiError::NoGraphicsPresentQueue`] if the selected GPU has no queue
/// family supporting both graphics and present.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<PhysicalDeviceInfo, RhiError> {
    let devices = unsafe { instance.enumerate_physical_devices()? };
    if devices.is_empty() {
        warn!("Vulkan reports no physical devices");
        return Err(RhiError::NoDiscreteGpu);
    }
    info!("Enumerated {} Vulkan device(s)", devices.len());

    let device = devices
        .iter()
        .copied()
        .find(|&device| {
            let properties = unsafe { instance.get_physical_device_properties(device) };
            if properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
                return true;
            }
            let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };
            debug!("Skipping non-discrete GPU {:?}", name);
            false
        })
        .ok_or(RhiError::NoDiscreteGpu)?;

    let properties = unsafe { instance.get_physical_device_properties(device) };
    let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };
    let queue_family_index =
        find_graphics_present_family(instance, device, surface, surface_loader)?;

    let selected = PhysicalDeviceInfo {
        device,
        properties,
        memory_properties,
        queue_family_index,
    };

    let (major, minor, patch) = selected.api_version();
    info!(
        "Selected GPU '{}' ({}), Vulkan {}.{}.{}, queue family {}, {} MB local memory",
        selected.device_name(),
        selected.device_type_name(),
        major,
        minor,
        patch,
        queue_family_index,
        selected.local_memory_bytes() / (1024 * 1024)
    );

    Ok(selected)
}

/// First queue family on `device` that has graphics support and can
/// present to `surface`.
fn find_graphics_present_family(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<u32, RhiError> {
    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };

    for (index, family) in queue_families.iter().enumerate() {
        let index = index as u32;
        let has_graphics =
            family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
        if !has_graphics {
            continue;
        }

        let can_present = unsafe {
            surface_loader
                .get_physical_device_surface_support(device, index, surface)
                .unwrap_or(false)
        };
        if can_present {
            debug!("Queue family {} handles graphics and present", index);
            return Ok(index);
        }
    }

    warn!("No queue family supports both graphics and present");
    Err(RhiError::NoGraphicsPresentQueue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_with_properties(properties: vk::PhysicalDeviceProperties) -> PhysicalDeviceInfo {
        PhysicalDeviceInfo {
            device: vk::PhysicalDevice::null(),
            properties,
            memory_properties: vk::PhysicalDeviceMemoryProperties::default(),
            queue_family_index: 0,
        }
    }

    #[test]
    fn test_device_type_names() {
        let mut properties = vk::PhysicalDeviceProperties::default();

        properties.device_type = vk::PhysicalDeviceType::DISCRETE_GPU;
        assert_eq!(info_with_properties(properties).device_type_name(), "discrete");

        properties.device_type = vk::PhysicalDeviceType::INTEGRATED_GPU;
        assert_eq!(
            info_with_properties(properties).device_type_name(),
            "integrated"
        );

        properties.device_type = vk::PhysicalDeviceType::CPU;
        assert_eq!(info_with_properties(properties).device_type_name(), "cpu");
    }

    #[test]
    fn test_api_version_unpacking() {
        let mut properties = vk::PhysicalDeviceProperties::default();
        properties.api_version = vk::make_api_version(0, 1, 3, 250);

        let (major, minor, patch) = info_with_properties(properties).api_version();
        assert_eq!((major, minor, patch), (1, 3, 250));
    }

    #[test]
    fn test_local_memory_counts_device_local_heaps_only() {
        let mut memory_properties = vk::PhysicalDeviceMemoryProperties::default();
        memory_properties.memory_heap_count = 3;
        memory_properties.memory_heaps[0] = vk::MemoryHeap {
            size: 6 << 30,
            flags: vk::MemoryHeapFlags::DEVICE_LOCAL,
        };
        memory_properties.memory_heaps[1] = vk::MemoryHeap {
            size: 8 << 30,
            flags: vk::MemoryHeapFlags::empty(),
        };
        memory_properties.memory_heaps[2] = vk::MemoryHeap {
            size: 256 << 20,
            flags: vk::MemoryHeapFlags::DEVICE_LOCAL,
        };

        let info = PhysicalDeviceInfo {
            device: vk::PhysicalDevice::null(),
            properties: vk::PhysicalDeviceProperties::default(),
            memory_properties,
            queue_family_index: 0,
        };

        assert_eq!(info.local_memory_bytes(), (6 << 30) + (256 << 20));
    }
}

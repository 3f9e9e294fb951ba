//! Vertex and uniform buffers with dedicated, host-visible memory.
//!
//! Every [`Buffer`] gets its own `VkDeviceMemory` allocation, bound at
//! offset 0. Both [`BufferUsage`] variants live in host-visible,
//! host-coherent memory so the CPU writes vertex and uniform data
//! directly and no staging copies are involved.
//!
//! ```no_run
//! use std::sync::Arc;
//! use prism_rhi::device::Device;
//! use prism_rhi::buffer::{Buffer, BufferUsage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), prism_rhi::RhiError> {
//! let vertices: [f32; 6] = [0.0, 0.5, -0.5, -0.5, 0.5, -0.5];
//! let vertex_buffer = Buffer::new_with_data(
//!     device,
//!     BufferUsage::Vertex,
//!     bytemuck::cast_slice(&vertices),
//! )?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::memory::find_memory_type_index;

/// What a buffer is for. Picks the Vulkan usage flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Uniform,
}

impl BufferUsage {
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        }
    }

    /// Memory property flags the backing allocation must have.
    ///
    /// Both usage types are written directly by the CPU, so both require
    /// host-visible, host-coherent memory.
    pub fn memory_flags(self) -> vk::MemoryPropertyFlags {
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
    }

    /// Lowercase usage name for log output.
    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Uniform => "uniform",
        }
    }
}

/// A `VkBuffer` plus the dedicated `VkDeviceMemory` backing it.
///
/// Creation, allocation, and binding happen atomically: if any step
/// fails, the handles created so far are destroyed before the error is
/// returned. Access is not synchronized; share across threads behind
/// external locking.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    // Bound at offset 0, one allocation per buffer.
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    usage: BufferUsage,
}

impl Buffer {
    /// Creates an empty buffer of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer creation, memory type selection,
    /// allocation, or binding fails. No partially constructed handles
    /// are leaked on failure.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::InvalidHandle(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };

        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let memory_type_index = match find_memory_type_index(
            requirements.memory_type_bits,
            device.memory_properties(),
            usage.memory_flags(),
        ) {
            Ok(index) => index,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match unsafe { device.handle().allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(e.into());
            }
        };

        if let Err(e) = unsafe { device.handle().bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.handle().free_memory(memory, None);
                device.handle().destroy_buffer(buffer, None);
            }
            return Err(e.into());
        }

        debug!("Created {} buffer: {} bytes", usage.name(), size);

        Ok(Self {
            device,
            buffer,
            memory,
            size,
            usage,
        })
    }

    /// Creates a buffer sized to `data` and uploads it in one go.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer creation or the upload fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use prism_rhi::device::Device;
    /// use prism_rhi::buffer::{Buffer, BufferUsage};
    ///
    /// # fn example(device: Arc<Device>) -> Result<(), prism_rhi::RhiError> {
    /// let vertices: [f32; 6] = [0.0, 0.5, -0.5, -0.5, 0.5, -0.5];
    /// let buffer = Buffer::new_with_data(
    ///     device,
    ///     BufferUsage::Vertex,
    ///     bytemuck::cast_slice(&vertices),
    /// )?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new_with_data(device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> RhiResult<Self> {
        let buffer = Self::new(device, usage, data.len() as vk::DeviceSize)?;
        buffer.write_data(0, data)?;
        Ok(buffer)
    }

    /// Copies `data` into the buffer starting at `offset` bytes.
    ///
    /// The memory is mapped for the duration of the copy and unmapped
    /// afterwards. Host-coherent memory makes the write visible to the GPU
    /// without an explicit flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the write would exceed the buffer size or if
    /// mapping fails.
    pub fn write_data(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let end = offset + data.len() as vk::DeviceSize;
        if end > self.size {
            return Err(RhiError::InvalidHandle(format!(
                "Write exceeds buffer size: offset {} + data {} > buffer {}",
                offset,
                data.len(),
                self.size
            )));
        }

        unsafe {
            let mapped = self.device.handle().map_memory(
                self.memory,
                offset,
                data.len() as vk::DeviceSize,
                vk::MemoryMapFlags::empty(),
            )?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped as *mut u8, data.len());
            self.device.handle().unmap_memory(self.memory);
        }

        Ok(())
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Capacity in bytes.
    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
            self.device.handle().free_memory(self.memory, None);
        }

        debug!("Destroyed {} buffer", self.usage.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_to_vk_usage() {
        assert_eq!(
            BufferUsage::Vertex.to_vk_usage(),
            vk::BufferUsageFlags::VERTEX_BUFFER
        );
        assert_eq!(
            BufferUsage::Uniform.to_vk_usage(),
            vk::BufferUsageFlags::UNIFORM_BUFFER
        );
    }

    #[test]
    fn test_buffer_usage_memory_flags() {
        for usage in [BufferUsage::Vertex, BufferUsage::Uniform] {
            let flags = usage.memory_flags();
            assert!(flags.contains(vk::MemoryPropertyFlags::HOST_VISIBLE));
            assert!(flags.contains(vk::MemoryPropertyFlags::HOST_COHERENT));
        }
    }

    #[test]
    fn test_buffer_usage_name() {
        assert_eq!(BufferUsage::Vertex.name(), "vertex");
        assert_eq!(BufferUsage::Uniform.name(), "uniform");
    }
}

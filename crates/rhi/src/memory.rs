//! Memory type selection for dedicated device allocations.
//!
//! Every buffer and image in the engine binds its own `vk::DeviceMemory`
//! allocation at offset 0. The only policy decision is which memory type the
//! allocation comes from, and that selection is a pure function over the
//! resource's requirements and the adapter's memory properties.

use ash::vk;

use crate::error::{RhiError, RhiResult};

/// Finds the lowest memory type index compatible with a resource.
///
/// A type at index `i` qualifies when bit `i` of `type_bits` (from
/// `vk::MemoryRequirements::memory_type_bits`) is set and the type's property
/// flags contain every flag in `required_flags`. The first qualifying index
/// is returned.
///
/// # Errors
///
/// Returns [`RhiError::NoCompatibleMemoryType`] when no type qualifies.
///
/// # Example
///
/// ```no_run
/// use ash::vk;
/// use prism_rhi::memory::find_memory_type_index;
///
/// # fn example(
/// #     requirements: vk::MemoryRequirements,
/// #     properties: &vk::PhysicalDeviceMemoryProperties,
/// # ) -> Result<(), prism_rhi::RhiError> {
/// let index = find_memory_type_index(
///     requirements.memory_type_bits,
///     properties,
///     vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn find_memory_type_index(
    type_bits: u32,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    required_flags: vk::MemoryPropertyFlags,
) -> RhiResult<u32> {
    memory_properties
        .memory_types
        .iter()
        .take(memory_properties.memory_type_count as usize)
        .enumerate()
        .find(|(index, memory_type)| {
            type_bits & (1 << index) != 0
                && memory_type.property_flags.contains(required_flags)
        })
        .map(|(index, _)| index as u32)
        .ok_or(RhiError::NoCompatibleMemoryType {
            type_bits,
            required_flags,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties_with(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties::default();
        properties.memory_type_count = types.len() as u32;
        for (i, &flags) in types.iter().enumerate() {
            properties.memory_types[i] = vk::MemoryType {
                property_flags: flags,
                heap_index: 0,
            };
        }
        properties
    }

    #[test]
    fn test_picks_lowest_satisfying_index() {
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        let index = find_memory_type_index(
            0b111,
            &properties,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )
        .unwrap();

        // Index 1 and 2 both satisfy; the lower one wins.
        assert_eq!(index, 1);
    }

    #[test]
    fn test_respects_type_bits_mask() {
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);

        // Bit 0 is cleared, so index 0 is ineligible even though it matches.
        let index =
            find_memory_type_index(0b10, &properties, vk::MemoryPropertyFlags::HOST_VISIBLE)
                .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_requires_flag_superset() {
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT
                | vk::MemoryPropertyFlags::HOST_CACHED,
        ]);

        // Index 0 lacks HOST_COHERENT; index 1 has a superset of the request.
        let index = find_memory_type_index(
            0b11,
            &properties,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )
        .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_no_compatible_type_is_an_error() {
        let properties = properties_with(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);

        let result =
            find_memory_type_index(0b11, &properties, vk::MemoryPropertyFlags::HOST_VISIBLE);
        assert!(matches!(
            result,
            Err(RhiError::NoCompatibleMemoryType { type_bits: 0b11, .. })
        ));
    }

    #[test]
    fn test_empty_mask_is_an_error() {
        let properties = properties_with(&[vk::MemoryPropertyFlags::HOST_VISIBLE]);

        let result = find_memory_type_index(0, &properties, vk::MemoryPropertyFlags::HOST_VISIBLE);
        assert!(result.is_err());
    }

    #[test]
    fn test_ignores_types_beyond_count() {
        // memory_types is a fixed-size array; entries past memory_type_count
        // are stale and must not be considered.
        let mut properties = properties_with(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        properties.memory_types[1] = vk::MemoryType {
            property_flags: vk::MemoryPropertyFlags::HOST_VISIBLE,
            heap_index: 0,
        };

        let result =
            find_memory_type_index(0b11, &properties, vk::MemoryPropertyFlags::HOST_VISIBLE);
        assert!(result.is_err());
    }
}

//! Descriptor set management for shader resource binding.
//!
//! This module provides the engine's descriptor model:
//! - [`DescriptorBinding`] describes one resource a shader consumes
//! - [`DescriptorBundle`] owns the layouts, pool, and sets for one drawable
//!
//! # Overview
//!
//! Shaders in the engine bind each resource through its own descriptor set,
//! always at binding 0. An ordered list of [`DescriptorBinding`]s therefore
//! maps directly to set indices: entry 0 becomes set 0, entry 1 becomes
//! set 1, and so on. [`DescriptorBundle`] turns such a list into one set
//! layout per entry, a pipeline layout aggregating them, a pool sized
//! exactly for the list, and one allocated set per layout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use prism_rhi::device::Device;
//! use prism_rhi::descriptor::{DescriptorBinding, DescriptorBundle};
//!
//! # fn example(device: Arc<Device>, buffer: vk::Buffer) -> Result<(), prism_rhi::RhiError> {
//! let bindings = [
//!     DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX),
//!     DescriptorBinding::combined_image_sampler(vk::ShaderStageFlags::FRAGMENT),
//! ];
//!
//! let bundle = DescriptorBundle::new(device, &bindings)?;
//! bundle.bind_buffer(0, buffer)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// One resource binding a shader consumes.
///
/// Each binding occupies its own descriptor set, at binding index 0 with a
/// descriptor count of 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorBinding {
    /// The descriptor type (uniform buffer, combined image sampler, ...).
    pub descriptor_type: vk::DescriptorType,
    /// The shader stages that can access this binding.
    pub stage_flags: vk::ShaderStageFlags,
}

impl DescriptorBinding {
    /// Creates a uniform buffer binding.
    #[inline]
    pub const fn uniform_buffer(stage_flags: vk::ShaderStageFlags) -> Self {
        Self {
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            stage_flags,
        }
    }

    /// Creates a combined image sampler binding.
    #[inline]
    pub const fn combined_image_sampler(stage_flags: vk::ShaderStageFlags) -> Self {
        Self {
            descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            stage_flags,
        }
    }
}

/// Creates one single-binding descriptor set layout per entry.
///
/// On failure, layouts created so far are destroyed before the error is
/// returned.
pub fn create_set_layouts(
    device: &Device,
    bindings: &[DescriptorBinding],
) -> RhiResult<Vec<vk::DescriptorSetLayout>> {
    let mut layouts = Vec::with_capacity(bindings.len());

    for binding in bindings {
        let layout_binding = vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(binding.descriptor_type)
            .descriptor_count(1)
            .stage_flags(binding.stage_flags);

        let layout_bindings = [layout_binding];
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&layout_bindings);

        match unsafe { device.handle().create_descriptor_set_layout(&create_info, None) } {
            Ok(layout) => layouts.push(layout),
            Err(e) => {
                destroy_set_layouts(device, &layouts);
                return Err(e.into());
            }
        }
    }

    debug!("Created {} descriptor set layout(s)", layouts.len());

    Ok(layouts)
}

/// Destroys a list of descriptor set layouts.
pub fn destroy_set_layouts(device: &Device, layouts: &[vk::DescriptorSetLayout]) {
    for &layout in layouts {
        unsafe {
            device.handle().destroy_descriptor_set_layout(layout, None);
        }
    }
}

/// Creates a pipeline layout aggregating the given set layouts in order.
pub fn create_pipeline_layout(
    device: &Device,
    set_layouts: &[vk::DescriptorSetLayout],
) -> RhiResult<vk::PipelineLayout> {
    let create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(set_layouts);

    let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };

    debug!("Created pipeline layout over {} set(s)", set_layouts.len());

    Ok(layout)
}

/// Aggregates bindings into pool sizes, one entry per descriptor type.
fn aggregate_pool_sizes(bindings: &[DescriptorBinding]) -> Vec<vk::DescriptorPoolSize> {
    let mut pool_sizes: Vec<vk::DescriptorPoolSize> = Vec::new();

    for binding in bindings {
        if let Some(existing) = pool_sizes
            .iter_mut()
            .find(|size| size.ty == binding.descriptor_type)
        {
            existing.descriptor_count += 1;
        } else {
            pool_sizes.push(vk::DescriptorPoolSize {
                ty: binding.descriptor_type,
                descriptor_count: 1,
            });
        }
    }

    pool_sizes
}

/// Descriptor resources for one drawable.
///
/// Owns the set layouts, pipeline layout, pool, and allocated sets derived
/// from an ordered binding list. Set `i` corresponds to binding list entry
/// `i` and is bound to the pipeline at set index `i`.
///
/// # Thread Safety
///
/// The bundle is not thread-safe. Synchronize access externally when
/// sharing between threads.
pub struct DescriptorBundle {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// One single-binding layout per binding list entry.
    set_layouts: Vec<vk::DescriptorSetLayout>,
    /// Pipeline layout aggregating all set layouts in order.
    pipeline_layout: vk::PipelineLayout,
    /// Pool sized exactly for the binding list.
    pool: vk::DescriptorPool,
    /// One allocated set per layout.
    sets: Vec<vk::DescriptorSet>,
}

impl DescriptorBundle {
    /// Creates the full descriptor state for one binding list.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `bindings` - Ordered resource bindings; entry `i` becomes set `i`
    ///
    /// # Errors
    ///
    /// Returns an error if any Vulkan object creation fails. Objects
    /// created before the failing step are destroyed first.
    pub fn new(device: Arc<Device>, bindings: &[DescriptorBinding]) -> RhiResult<Self> {
        if bindings.is_empty() {
            return Err(RhiError::InvalidHandle(
                "Descriptor bundle requires at least one binding".to_string(),
            ));
        }

        let set_layouts = create_set_layouts(&device, bindings)?;

        let pipeline_layout = match create_pipeline_layout(&device, &set_layouts) {
            Ok(layout) => layout,
            Err(e) => {
                destroy_set_layouts(&device, &set_layouts);
                return Err(e);
            }
        };

        let pool_sizes = aggregate_pool_sizes(bindings);
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(bindings.len() as u32)
            .pool_sizes(&pool_sizes);

        let pool = match unsafe { device.handle().create_descriptor_pool(&pool_info, None) } {
            Ok(pool) => pool,
            Err(e) => {
                unsafe {
                    device.handle().destroy_pipeline_layout(pipeline_layout, None);
                }
                destroy_set_layouts(&device, &set_layouts);
                return Err(e.into());
            }
        };

        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&set_layouts);

        let sets = match unsafe { device.handle().allocate_descriptor_sets(&alloc_info) } {
            Ok(sets) => sets,
            Err(e) => {
                unsafe {
                    device.handle().destroy_descriptor_pool(pool, None);
                    device.handle().destroy_pipeline_layout(pipeline_layout, None);
                }
                destroy_set_layouts(&device, &set_layouts);
                return Err(e.into());
            }
        };

        debug!(
            "Created descriptor bundle: {} set(s), {} pool size(s)",
            sets.len(),
            pool_sizes.len()
        );

        Ok(Self {
            device,
            set_layouts,
            pipeline_layout,
            pool,
            sets,
        })
    }

    /// Writes a uniform buffer into the set at `set_index`.
    ///
    /// The whole buffer is bound at binding 0 of that set.
    ///
    /// # Errors
    ///
    /// Returns an error if `set_index` is out of range.
    pub fn bind_buffer(&self, set_index: usize, buffer: vk::Buffer) -> RhiResult<()> {
        let set = self.set_at(set_index)?;

        let buffer_infos = [vk::DescriptorBufferInfo::default()
            .buffer(buffer)
            .offset(0)
            .range(vk::WHOLE_SIZE)];

        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(0)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_infos);

        unsafe {
            self.device.handle().update_descriptor_sets(&[write], &[]);
        }

        Ok(())
    }

    /// Writes a combined image sampler into the set at `set_index`.
    ///
    /// The image is expected to be in `SHADER_READ_ONLY_OPTIMAL` layout by
    /// the time the set is used.
    ///
    /// # Errors
    ///
    /// Returns an error if `set_index` is out of range.
    pub fn bind_image_sampler(
        &self,
        set_index: usize,
        view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> RhiResult<()> {
        let set = self.set_at(set_index)?;

        let image_infos = [vk::DescriptorImageInfo::default()
            .sampler(sampler)
            .image_view(view)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];

        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(0)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_infos);

        unsafe {
            self.device.handle().update_descriptor_sets(&[write], &[]);
        }

        Ok(())
    }

    fn set_at(&self, set_index: usize) -> RhiResult<vk::DescriptorSet> {
        self.sets.get(set_index).copied().ok_or_else(|| {
            RhiError::InvalidHandle(format!(
                "Descriptor set index {} out of range (bundle has {} sets)",
                set_index,
                self.sets.len()
            ))
        })
    }

    /// Returns the allocated descriptor sets, in binding list order.
    #[inline]
    pub fn sets(&self) -> &[vk::DescriptorSet] {
        &self.sets
    }

    /// Returns the pipeline layout aggregating all set layouts.
    #[inline]
    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    /// Returns the number of descriptor sets in the bundle.
    #[inline]
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }
}

impl Drop for DescriptorBundle {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees all sets allocated from it
            self.device.handle().destroy_descriptor_pool(self.pool, None);
            self.device
                .handle()
                .destroy_pipeline_layout(self.pipeline_layout, None);
        }
        destroy_set_layouts(&self.device, &self.set_layouts);
        debug!("Destroyed descriptor bundle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_buffer_binding() {
        let binding = DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX);
        assert_eq!(binding.descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(binding.stage_flags, vk::ShaderStageFlags::VERTEX);
    }

    #[test]
    fn test_combined_image_sampler_binding() {
        let binding = DescriptorBinding::combined_image_sampler(vk::ShaderStageFlags::FRAGMENT);
        assert_eq!(
            binding.descriptor_type,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        );
        assert_eq!(binding.stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn test_pool_sizes_aggregate_by_type() {
        let bindings = [
            DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX),
            DescriptorBinding::combined_image_sampler(vk::ShaderStageFlags::FRAGMENT),
            DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX),
            DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX),
        ];

        let pool_sizes = aggregate_pool_sizes(&bindings);

        assert_eq!(pool_sizes.len(), 2);
        assert_eq!(pool_sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(pool_sizes[0].descriptor_count, 3);
        assert_eq!(pool_sizes[1].ty, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(pool_sizes[1].descriptor_count, 1);
    }

    #[test]
    fn test_pool_sizes_empty_bindings() {
        let pool_sizes = aggregate_pool_sizes(&[]);
        assert!(pool_sizes.is_empty());
    }
}

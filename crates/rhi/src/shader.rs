//! SPIR-V shader modules.
//!
//! GLSL compilation happens in the resources crate; this layer only turns
//! finished SPIR-V code words into `VkShaderModule`s and pairs them with a
//! [`ShaderStage`] and entry point for pipeline creation.
//!
//! ```no_run
//! use std::sync::Arc;
//! use prism_rhi::device::Device;
//! use prism_rhi::shader::{Shader, ShaderStage};
//!
//! # fn example(device: Arc<Device>, spirv: &[u32]) -> Result<(), prism_rhi::RhiError> {
//! let vertex = Shader::from_spirv_words(device, spirv, ShaderStage::Vertex, "main")?;
//! let stage_info = vertex.stage_create_info();
//! # Ok(())
//! # }
//! ```

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Pipeline stage a shader module is bound to.
///
/// The forward pass only uses the vertex and fragment stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// The `vk::ShaderStageFlags` bit for this stage.
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    /// Lowercase stage name for log output.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A `VkShaderModule` together with its stage and entry point.
///
/// Immutable once created, so sharing one across threads is fine; the
/// module is destroyed against the owning device on drop.
pub struct Shader {
    device: Arc<Device>,
    module: vk::ShaderModule,
    stage: ShaderStage,
    entry_point: CString,
}

impl Shader {
    /// Creates a shader module from SPIR-V code words.
    ///
    /// This is the primary constructor: SPIR-V compilers hand back 32-bit
    /// code words, which pass through unchanged.
    ///
    /// # Errors
    ///
    /// Fails when `entry_point` contains an interior null byte or module
    /// creation is rejected by the driver.
    pub fn from_spirv_words(
        device: Arc<Device>,
        words: &[u32],
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(words);

        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        let entry_point_cstring = match CString::new(entry_point) {
            Ok(cstring) => cstring,
            Err(e) => {
                unsafe { device.handle().destroy_shader_module(module, None) };
                return Err(RhiError::ShaderError(format!(
                    "Invalid entry point name: {}",
                    e
                )));
            }
        };

        info!("{} shader module ready (entry '{}')", stage, entry_point);

        Ok(Self {
            device,
            module,
            stage,
            entry_point: entry_point_cstring,
        })
    }

    /// Creates a shader module from raw SPIR-V bytes.
    ///
    /// Convenience over [`Shader::from_spirv_words`] for callers holding a
    /// byte buffer, e.g. SPIR-V read from disk. The length must be a
    /// multiple of 4; words are decoded little-endian.
    ///
    /// # Errors
    ///
    /// Fails on a misaligned byte length, plus every failure mode of
    /// [`Shader::from_spirv_words`].
    pub fn from_spirv_bytes(
        device: Arc<Device>,
        bytes: &[u8],
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        if bytes.len() % 4 != 0 {
            return Err(RhiError::ShaderError(format!(
                "SPIR-V code must be 4-byte aligned, got {} bytes",
                bytes.len()
            )));
        }

        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Self::from_spirv_words(device, &words, stage, entry_point)
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Entry point name as passed to pipeline creation.
    #[inline]
    pub fn entry_point(&self) -> &std::ffi::CStr {
        &self.entry_point
    }

    /// Builds the stage description used during pipeline creation.
    ///
    /// The returned struct borrows the module handle and entry point name,
    /// so it cannot outlive this shader.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("{} shader module destroyed", self.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_stage_to_vk_stage() {
        assert_eq!(
            ShaderStage::Vertex.to_vk_stage(),
            vk::ShaderStageFlags::VERTEX
        );
        assert_eq!(
            ShaderStage::Fragment.to_vk_stage(),
            vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn test_shader_stage_name() {
        assert_eq!(ShaderStage::Vertex.name(), "vertex");
        assert_eq!(ShaderStage::Fragment.name(), "fragment");
    }

    #[test]
    fn test_shader_stage_display() {
        assert_eq!(format!("{}", ShaderStage::Vertex), "vertex");
        assert_eq!(format!("{}", ShaderStage::Fragment), "fragment");
    }

    #[test]
    fn test_shader_stage_equality() {
        assert_eq!(ShaderStage::Vertex, ShaderStage::Vertex);
        assert_ne!(ShaderStage::Vertex, ShaderStage::Fragment);
    }
}

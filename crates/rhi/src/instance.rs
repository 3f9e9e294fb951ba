//! Vulkan instance bootstrap.
//!
//! [`Instance`] owns the loader entry point, the `VkInstance`, and the
//! optional debug messenger that forwards validation output into `tracing`.
//! Surface extensions are dictated by the windowing layer and passed in by
//! the caller, which keeps this crate free of per-platform `cfg` blocks.
//!
//! ```no_run
//! use prism_rhi::instance::Instance;
//!
//! # fn demo(surface_extensions: &[*const i8]) -> Result<(), prism_rhi::RhiError> {
//! let instance = Instance::new(cfg!(debug_assertions), surface_extensions)?;
//! let raw = instance.handle();
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::ffi::CStr;

use ash::{Entry, vk};
use tracing::{error, info, warn};

use crate::error::RhiError;

const KHRONOS_VALIDATION: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Owns the `VkInstance` and, when validation is active, the debug
/// messenger. Dropping it tears the messenger down before the instance.
pub struct Instance {
    entry: Entry,
    instance: ash::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Instance {
    /// Loads the Vulkan library and creates an instance.
    ///
    /// `surface_extensions` lists the instance extensions the windowing
    /// layer needs for surface creation. When `enable_validation` is set
    /// and the Khronos validation layer is installed, the layer and a
    /// debug messenger are enabled; a missing layer downgrades to a
    /// warning rather than an error.
    ///
    /// # Errors
    ///
    /// Fails when the Vulkan loader is absent, instance creation is
    /// rejected, or the debug messenger cannot be installed.
    pub fn new(
        enable_validation: bool,
        surface_extensions: &[*const i8],
    ) -> Result<Self, RhiError> {
        let entry = unsafe { Entry::load()? };

        let validation_available = enable_validation && Self::validation_layer_present(&entry)?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(c"Prism")
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"Prism Engine")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_1);

        let mut extensions = surface_extensions.to_vec();
        let mut layers = Vec::new();
        if validation_available {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
            layers.push(KHRONOS_VALIDATION.as_ptr());
        }

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe { entry.create_instance(&create_info, None)? };
        info!("Vulkan instance created (API version 1.1)");

        let (debug_utils, debug_messenger) = if validation_available {
            let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger = Self::install_messenger(&loader)?;
            info!("Validation layer active");
            (Some(loader), Some(messenger))
        } else {
            if enable_validation {
                warn!("Validation layer requested but not installed");
            }
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// True when the debug messenger was installed.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug_messenger.is_some()
    }

    fn validation_layer_present(entry: &Entry) -> Result<bool, RhiError> {
        let layers = unsafe { entry.enumerate_instance_layer_properties()? };
        let wanted = KHRONOS_VALIDATION.to_bytes();
        Ok(layers.iter().any(|layer| {
            let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
            name.to_bytes() == wanted
        }))
    }

    fn install_messenger(
        loader: &ash::ext::debug_utils::Instance,
    ) -> Result<vk::DebugUtilsMessengerEXT, RhiError> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(validation_callback));

        let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None)? };
        Ok(messenger)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            // The messenger must not outlive the instance.
            if let (Some(loader), Some(messenger)) = (&self.debug_utils, self.debug_messenger) {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

/// Routes validation layer output into `tracing`.
///
/// # Safety
///
/// Invoked by the driver under the debug utils extension's pointer
/// contract; the callback data is only read for the duration of the call.
unsafe extern "system" fn validation_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    kind: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }

    let data = unsafe { &*data };
    let message = if data.p_message.is_null() {
        Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(data.p_message).to_string_lossy() }
    };

    let kind = if kind.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if kind.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!("[Vulkan {kind}] {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!("[Vulkan {kind}] {message}");
    } else {
        info!("[Vulkan {kind}] {message}");
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_creation_without_validation() {
        // Needs a working Vulkan loader on the host
        let result = Instance::new(false, &[ash::khr::surface::NAME.as_ptr()]);
        match result {
            Ok(instance) => {
                assert!(!instance.has_validation());
            }
            Err(RhiError::LoadingError(_)) => {
                eprintln!("Skipping test: Vulkan not available");
            }
            Err(RhiError::VulkanError(_)) => {
                // Loader present but no usable ICD or surface extension
                eprintln!("Skipping test: no usable Vulkan driver");
            }
            Err(e) => {
                panic!("Unexpected error: {:?}", e);
            }
        }
    }
}

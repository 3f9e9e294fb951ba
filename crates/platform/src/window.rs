//! Windowing built on winit.
//!
//! Owns the OS window and everything the RHI needs from it: the raw
//! display/window handles, the instance extensions the platform requires,
//! and Vulkan surface creation.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use prism_core::{Error, Result};

/// A `vk::SurfaceKHR` that destroys itself on drop.
///
/// The loader rides along with the handle, so teardown never needs the
/// instance again. The instance the surface came from must still outlive
/// this value.
pub struct Surface {
    handle: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Raw surface handle; valid only while this wrapper exists.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Loader for capability, format, and present mode queries.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: the handle came from ash_window::create_surface against
        // the instance this loader wraps, and nothing else destroys it.
        unsafe { self.loader.destroy_surface(self.handle, None) };
        tracing::debug!("Surface destroyed");
    }
}

/// The OS window plus the dimensions the renderer tracks for it.
pub struct Window {
    window: WinitWindow,
    width: u32,
    height: u32,
}

impl Window {
    /// Opens a resizable window of the given size.
    pub fn new(event_loop: &ActiveEventLoop, width: u32, height: u32, title: &str) -> Result<Self> {
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title(title)
                    .with_inner_size(PhysicalSize::new(width, height))
                    .with_resizable(true),
            )
            .map_err(|e| Error::Window(format!("creation failed: {e}")))?;

        tracing::info!("Opened {}x{} window '{}'", width, height, title);

        Ok(Self {
            window,
            width,
            height,
        })
    }

    /// The underlying winit window.
    pub fn inner(&self) -> &WinitWindow {
        &self.window
    }

    /// Current width in physical pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Current height in physical pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Records new dimensions. Call from the resize event handler.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        tracing::debug!("Window now {}x{}", width, height);
    }

    /// Width over height of the current window size.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Display handle, needed to look up surface extensions.
    pub fn display_handle(
        &self,
    ) -> std::result::Result<raw_window_handle::DisplayHandle<'_>, raw_window_handle::HandleError>
    {
        self.window.display_handle()
    }

    /// Ask the compositor for another redraw.
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Creates a Vulkan surface targeting this window.
    ///
    /// # Errors
    ///
    /// Fails when the raw handles are unavailable, or when the platform
    /// surface extension rejects the creation call.
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let raw_handle_err =
            |e: raw_window_handle::HandleError| Error::Window(format!("raw handle unavailable: {e}"));
        let display = self.window.display_handle().map_err(raw_handle_err)?;
        let window = self.window.window_handle().map_err(raw_handle_err)?;

        // SAFETY: both handles come straight from the live winit window,
        // and the resulting surface is destroyed exactly once, in
        // Surface::drop.
        let handle = unsafe {
            ash_window::create_surface(entry, instance, display.as_raw(), window.as_raw(), None)
                .map_err(|e| Error::Vulkan(format!("surface creation failed: {e}")))?
        };

        tracing::info!("Surface created");

        Ok(Surface {
            handle,
            loader: ash::khr::surface::Instance::new(entry, instance),
        })
    }
}

/// Instance extensions the platform needs before a surface can exist.
///
/// The returned pointers reference static strings owned by the Vulkan
/// loader; they stay valid for the life of the process.
///
/// # Errors
///
/// Fails if the display is not backed by a supported window system.
pub fn get_required_extensions(
    display_handle: raw_window_handle::RawDisplayHandle,
) -> Result<Vec<*const i8>> {
    let extensions = ash_window::enumerate_required_extensions(display_handle)
        .map_err(|e| Error::Vulkan(format!("no surface extensions for this display: {e}")))?;

    // SAFETY: ash_window returns valid, null-terminated C strings.
    let names: Vec<_> = extensions
        .iter()
        .map(|&ext| unsafe { std::ffi::CStr::from_ptr(ext) })
        .collect();
    tracing::debug!("Surface needs instance extensions {:?}", names);

    Ok(extensions.to_vec())
}

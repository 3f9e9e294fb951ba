//! Vulkan synchronization objects.
//!
//! [`Semaphore`] orders work between queue operations on the GPU,
//! [`Fence`] lets the host wait for submitted work, and [`FrameSlot`]
//! bundles the per-frame set the renderer cycles through: one semaphore
//! for swapchain acquisition, one for draw completion, and the in-flight
//! fence that gates slot reuse.
//!
//! ```no_run
//! use std::sync::Arc;
//! use prism_rhi::device::Device;
//! use prism_rhi::sync::{FRAME_LAG, FrameSlot};
//!
//! # fn example(device: Arc<Device>) -> Result<(), prism_rhi::RhiError> {
//! let slots: Vec<FrameSlot> = (0..FRAME_LAG)
//!     .map(|_| FrameSlot::new(device.clone()))
//!     .collect::<Result<_, _>>()?;
//!
//! // Each frame: wait on the slot's fence, reset it, then acquire,
//! // submit, and present against the slot's semaphores.
//! slots[0].in_flight_fence().wait(u64::MAX)?;
//! slots[0].in_flight_fence().reset()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Binary semaphore for GPU-to-GPU ordering.
///
/// Signal and wait operations are enqueued through submissions, so a
/// `Semaphore` can be shared across threads freely.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates an unsignaled semaphore.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        debug!("Created semaphore");

        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed semaphore");
    }
}

/// Fence for host-side waits on GPU work.
///
/// The renderer uses one per frame slot to gate resource reuse, and a
/// transient one to block on texture uploads.
pub struct Fence {
    device: Arc<Device>,
    fence: vk::Fence,
}

impl Fence {
    /// Creates a fence, optionally already signaled.
    ///
    /// Pass `signaled: true` for fences that are waited on before the
    /// first submission that would signal them, such as the in-flight
    /// fence on frame zero.
    ///
    /// # Errors
    ///
    /// Returns an error if fence creation fails.
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);

        let fence = unsafe { device.handle().create_fence(&create_info, None)? };

        debug!(
            "Created fence ({})",
            if signaled { "signaled" } else { "unsignaled" }
        );

        Ok(Self { device, fence })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence signals or `timeout_ns` elapses.
    ///
    /// An elapsed timeout and a lost device come back as distinct errors
    /// so callers can tell a stall from a dead GPU. Pass `u64::MAX` for
    /// an effectively unbounded wait.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::Timeout`] when the wait times out,
    /// [`RhiError::DeviceLost`] when the device was lost while waiting,
    /// or the underlying Vulkan error otherwise.
    pub fn wait(&self, timeout_ns: u64) -> Result<(), RhiError> {
        let fences = [self.fence];
        let result = unsafe {
            self.device
                .handle()
                .wait_for_fences(&fences, true, timeout_ns)
        };
        match result {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(RhiError::Timeout(Duration::from_nanos(timeout_ns))),
            Err(vk::Result::ERROR_DEVICE_LOST) => Err(RhiError::DeviceLost),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the fence to the unsignaled state.
    ///
    /// Must not be called while a queue operation still references the
    /// fence.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset operation fails.
    pub fn reset(&self) -> Result<(), RhiError> {
        let fences = [self.fence];
        unsafe { self.device.handle().reset_fences(&fences)? };
        Ok(())
    }

    /// Non-blocking signal check.
    pub fn is_signaled(&self) -> bool {
        let result = unsafe { self.device.handle().get_fence_status(self.fence) };
        matches!(result, Ok(true))
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
        debug!("Destroyed fence");
    }
}

/// Number of frames that can be recorded ahead of the GPU.
///
/// Using 2 allows the CPU to prepare the next frame while the GPU
/// renders the current one. Per-frame resources (command buffers and
/// synchronization objects) are duplicated this many times.
pub const FRAME_LAG: usize = 2;

/// The synchronization objects belonging to one frame slot.
///
/// A slot is reused every [`FRAME_LAG`] frames. Its fence is signaled by
/// the submission that last used the slot, so waiting on the fence
/// guarantees the slot's command buffer and semaphores are idle before
/// they are recycled.
pub struct FrameSlot {
    image_acquired_semaphore: Semaphore,
    draw_complete_semaphore: Semaphore,
    in_flight_fence: Fence,
}

impl FrameSlot {
    /// Creates the slot's two semaphores and its fence.
    ///
    /// The fence starts signaled so the slot's first wait returns
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if any synchronization object creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let image_acquired_semaphore = Semaphore::new(device.clone())?;
        let draw_complete_semaphore = Semaphore::new(device.clone())?;
        let in_flight_fence = Fence::new(device, true)?;

        info!("Created frame synchronization primitives");

        Ok(Self {
            image_acquired_semaphore,
            draw_complete_semaphore,
            in_flight_fence,
        })
    }

    /// Signaled by swapchain acquisition; the frame's submission waits on it.
    #[inline]
    pub fn image_acquired_semaphore(&self) -> &Semaphore {
        &self.image_acquired_semaphore
    }

    /// Signaled by the frame's submission; presentation waits on it.
    #[inline]
    pub fn draw_complete_semaphore(&self) -> &Semaphore {
        &self.draw_complete_semaphore
    }

    /// Signaled when the slot's submission retires.
    #[inline]
    pub fn in_flight_fence(&self) -> &Fence {
        &self.in_flight_fence
    }

    #[inline]
    pub fn image_acquired_handle(&self) -> vk::Semaphore {
        self.image_acquired_semaphore.handle()
    }

    #[inline]
    pub fn draw_complete_handle(&self) -> vk::Semaphore {
        self.draw_complete_semaphore.handle()
    }

    #[inline]
    pub fn in_flight_fence_handle(&self) -> vk::Fence {
        self.in_flight_fence.handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_lag_constant() {
        assert!(FRAME_LAG >= 1);
        assert!(FRAME_LAG <= 4);
    }

    #[test]
    fn test_semaphore_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Semaphore>();
    }

    #[test]
    fn test_fence_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Fence>();
    }

    #[test]
    fn test_frame_slot_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FrameSlot>();
    }
}

//! Frame pacing state for the render loop.
//!
//! The GPU may run up to [`FRAME_LAG`] frames behind the CPU. Each in-flight
//! frame owns a synchronization slot ([`prism_rhi::sync::FrameSlot`]); this
//! module tracks which slot the next frame uses and what the frame drive
//! reported, with no Vulkan calls of its own.

use prism_rhi::sync::FRAME_LAG;

/// Result of driving one frame through acquire/submit/present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and handed to the presentation engine.
    Presented,
    /// The swapchain no longer matches the surface. The caller must
    /// recreate it before rendering again; nothing was presented.
    SwapchainStale,
}

/// Slot bookkeeping for the frame loop.
///
/// Tracks the synchronization slot for the frame being recorded and the
/// swapchain image the current frame acquired.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameCursor {
    /// Slot index in `0..FRAME_LAG`.
    slot_index: usize,
    /// Swapchain image index acquired for the current frame.
    image_index: u32,
}

impl FrameCursor {
    /// Creates a cursor starting at slot 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot used by the frame currently being recorded.
    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    /// Swapchain image acquired for the current frame.
    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    /// Records which swapchain image the current frame acquired.
    pub fn set_image_index(&mut self, index: u32) {
        self.image_index = index;
    }

    /// Moves to the next synchronization slot, wrapping at [`FRAME_LAG`].
    pub fn advance(&mut self) {
        self.slot_index = (self.slot_index + 1) % FRAME_LAG;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_starts_at_slot_zero() {
        let cursor = FrameCursor::new();
        assert_eq!(cursor.slot_index(), 0);
        assert_eq!(cursor.image_index(), 0);
    }

    #[test]
    fn test_cursor_alternates_slots() {
        let mut cursor = FrameCursor::new();
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(cursor.slot_index());
            cursor.advance();
        }
        assert_eq!(seen, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_cursor_tracks_image_index() {
        let mut cursor = FrameCursor::new();
        cursor.set_image_index(2);
        assert_eq!(cursor.image_index(), 2);

        // Advancing the slot does not touch the acquired image.
        cursor.advance();
        assert_eq!(cursor.image_index(), 2);
    }

    #[test]
    fn test_slot_reuse_spacing() {
        // The slot fence is waited at the top of each frame, so the
        // submission previously in flight on a slot must be exactly
        // FRAME_LAG frames old when the slot comes around again.
        let mut cursor = FrameCursor::new();
        let mut in_flight: [Option<usize>; FRAME_LAG] = [None; FRAME_LAG];

        for submission in 0..100 {
            let slot = cursor.slot_index();
            if let Some(previous) = in_flight[slot] {
                assert_eq!(previous + FRAME_LAG, submission);
            }
            in_flight[slot] = Some(submission);
            cursor.advance();
        }
    }
}

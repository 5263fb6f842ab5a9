//! Collaborator traits consumed by the frame graph.
//!
//! The frame graph never talks to the GPU directly. Everything it needs --
//! resource creation, barrier recording, surface acquire/present and the
//! per-frame blocking wait -- goes through [`RenderDevice`]. The GUI overlay
//! is a second, independent collaborator drawn once per frame after the
//! graph has composited its final image.

use thiserror::Error;

use crate::device::types::{BufferHandle, Extent2d, ImageBarrier, ImageHandle, SurfaceTarget};

/// Device error type.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The surface is out of date; the frame must be skipped and the
    /// surface recreated before the next attempt. Recoverable.
    #[error("surface is out of date and must be recreated")]
    SurfaceStale,
    /// The blocking wait for a frame slot to become idle failed. Fatal:
    /// there is no retry policy for a broken fence.
    #[error("blocking wait on frame slot {slot} failed: {reason}")]
    WaitFailed { slot: usize, reason: String },
    #[error("failed to acquire surface target: {0}")]
    AcquireFailed(String),
    #[error("failed to create image: {0}")]
    ImageCreationFailed(String),
    #[error("failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("failed to recreate surface: {0}")]
    SurfaceRecreationFailed(String),
    #[error("failed to submit or present: {0}")]
    PresentFailed(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Interface the frame graph drives each frame.
///
/// Implementations own the swapchain, the per-frame command buffers and
/// synchronization primitives. The graph guarantees single-threaded access:
/// exactly one frame is recorded at a time, and `wait_frame_slot` is called
/// before a slot's command buffer is reused.
pub trait RenderDevice {
    /// Block until the given frame slot's previous submission has finished
    /// on the GPU. Called once at the start of every frame; a failure here
    /// is fatal for the device.
    fn wait_frame_slot(&mut self, slot: usize) -> DeviceResult<()>;

    /// Acquire the presentation image for this frame and begin recording
    /// into the current slot's command buffer.
    ///
    /// Returns [`DeviceError::SurfaceStale`] when the surface needs to be
    /// recreated; the caller skips the frame and retries after a resize.
    fn acquire_target(&mut self) -> DeviceResult<SurfaceTarget>;

    /// Current surface extent.
    fn surface_extent(&self) -> Extent2d;

    /// Recreate the surface at a new extent after it went stale or the
    /// window was resized.
    fn recreate_surface(&mut self, extent: Extent2d) -> DeviceResult<()>;

    /// Create a color render target.
    fn create_color_image(&mut self, label: &str, extent: Extent2d) -> DeviceResult<ImageHandle>;

    /// Create a depth render target.
    fn create_depth_image(&mut self, label: &str, extent: Extent2d) -> DeviceResult<ImageHandle>;

    /// Create a buffer of `size` bytes.
    fn create_buffer(&mut self, label: &str, size: u64) -> DeviceResult<BufferHandle>;

    /// Destroy an image previously created through this device.
    fn destroy_image(&mut self, image: ImageHandle);

    /// Destroy a buffer previously created through this device.
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Record an image memory barrier into the current command buffer.
    fn pipeline_barrier(&mut self, barrier: &ImageBarrier);

    /// Record a blit from `src` to `dst`, stretching between the two extents.
    fn blit_image(
        &mut self,
        src: ImageHandle,
        src_extent: Extent2d,
        dst: ImageHandle,
        dst_extent: Extent2d,
    );

    /// End recording, submit the frame slot's command buffer and present
    /// the target.
    ///
    /// Returns [`DeviceError::SurfaceStale`] when presentation reports the
    /// surface went stale; the submission itself has still happened.
    fn submit_present(&mut self, slot: usize, target: &SurfaceTarget) -> DeviceResult<()>;
}

/// GUI overlay drawn on top of the composited frame, before the present
/// transition.
pub trait GuiOverlay {
    fn draw(&mut self, device: &mut dyn RenderDevice, target: &SurfaceTarget);
}

/// No-op overlay for headless use.
#[derive(Debug, Default)]
pub struct NoOverlay;

impl GuiOverlay for NoOverlay {
    fn draw(&mut self, _device: &mut dyn RenderDevice, _target: &SurfaceTarget) {}
}

//! Shared device-facing types: extents, handles, and barrier records.

use ash::vk;

/// Two-dimensional extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scale both dimensions by a factor, truncating to whole pixels.
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            width: (self.width as f32 * factor) as u32,
            height: (self.height as f32 * factor) as u32,
        }
    }
}

/// Handle to a GPU image owned by the device collaborator.
///
/// Handles are opaque to the frame graph; the device mints them and is the
/// only party that can dereference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(u64);

impl ImageHandle {
    /// Create an image handle from a raw device-side identifier.
    pub fn from_raw(handle: u64) -> Self {
        Self(handle)
    }

    /// Get the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Handle to a GPU buffer owned by the device collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(u64);

impl BufferHandle {
    /// Create a buffer handle from a raw device-side identifier.
    pub fn from_raw(handle: u64) -> Self {
        Self(handle)
    }

    /// Get the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Physical backing of a logical resource once it has been created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalResource {
    Image(ImageHandle),
    Buffer(BufferHandle),
}

impl PhysicalResource {
    pub fn as_image(&self) -> Option<ImageHandle> {
        match self {
            Self::Image(image) => Some(*image),
            Self::Buffer(_) => None,
        }
    }

    pub fn as_buffer(&self) -> Option<BufferHandle> {
        match self {
            Self::Buffer(buffer) => Some(*buffer),
            Self::Image(_) => None,
        }
    }
}

/// The presentation image acquired for the current frame.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceTarget {
    pub image: ImageHandle,
    pub extent: Extent2d,
}

/// A single image memory barrier, fully resolved to Vulkan stage, access
/// and layout masks.
///
/// The source half describes whoever last touched the image; the destination
/// half describes the upcoming use. The device submits this as one
/// `vkCmdPipelineBarrier` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: ImageHandle,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_stage_mask: vk::PipelineStageFlags,
    pub src_access_mask: vk::AccessFlags,
    pub dst_stage_mask: vk::PipelineStageFlags,
    pub dst_access_mask: vk::AccessFlags,
    pub aspect_mask: vk::ImageAspectFlags,
}

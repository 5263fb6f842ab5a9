//! Access-state tracking and barrier emission.
//!
//! Each physical image is in exactly one access state at a time. Before a
//! pass uses a resource, the tracker compares the image's current state to
//! the state its usage requires and, when they differ, records a single
//! pipeline barrier whose source half comes from the current state and
//! destination half from the target state. Asking for the state an image
//! is already in emits nothing.

use ash::vk;

use crate::device::{ImageBarrier, ImageHandle, RenderDevice};
use crate::frame_graph::pass::ResourceUsage;
use crate::frame_graph::resource::ResourceKind;

use std::collections::HashMap;

/// Access states an image moves through over a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessState {
    /// Initial state, contents undefined.
    #[default]
    Undefined,
    /// Color attachment writes.
    ColorAttachment,
    /// Depth attachment writes.
    DepthAttachment,
    /// Sampled in a shader.
    ShaderReadOnly,
    /// Depth read-only: sampled and/or depth-tested without writes.
    DepthReadOnly,
    /// Source of a transfer operation.
    TransferSrc,
    /// Destination of a transfer operation.
    TransferDst,
    /// Ready for presentation.
    PresentSrc,
}

impl AccessState {
    /// Convert to the Vulkan image layout.
    pub fn to_vk(self) -> vk::ImageLayout {
        match self {
            Self::Undefined => vk::ImageLayout::UNDEFINED,
            Self::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            Self::DepthAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            Self::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            Self::DepthReadOnly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            Self::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            Self::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            Self::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
        }
    }

    /// Access mask for this state as the source of a barrier.
    pub fn src_access_mask(self) -> vk::AccessFlags {
        match self {
            Self::Undefined => vk::AccessFlags::empty(),
            Self::ColorAttachment => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            Self::DepthAttachment => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            Self::ShaderReadOnly => vk::AccessFlags::SHADER_READ,
            Self::DepthReadOnly => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            Self::TransferSrc => vk::AccessFlags::TRANSFER_READ,
            Self::TransferDst => vk::AccessFlags::TRANSFER_WRITE,
            Self::PresentSrc => vk::AccessFlags::empty(),
        }
    }

    /// Access mask for this state as the destination of a barrier.
    pub fn dst_access_mask(self) -> vk::AccessFlags {
        match self {
            Self::Undefined => vk::AccessFlags::empty(),
            Self::ColorAttachment => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            Self::DepthAttachment => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            Self::ShaderReadOnly => vk::AccessFlags::SHADER_READ,
            Self::DepthReadOnly => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            Self::TransferSrc => vk::AccessFlags::TRANSFER_READ,
            Self::TransferDst => vk::AccessFlags::TRANSFER_WRITE,
            Self::PresentSrc => vk::AccessFlags::empty(),
        }
    }

    /// Pipeline stage whose completion the barrier waits on when leaving
    /// this state.
    pub fn src_stage(self) -> vk::PipelineStageFlags {
        match self {
            Self::Undefined => vk::PipelineStageFlags::TOP_OF_PIPE,
            Self::ColorAttachment => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            Self::DepthAttachment => vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            Self::ShaderReadOnly => vk::PipelineStageFlags::FRAGMENT_SHADER,
            Self::DepthReadOnly => vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            Self::TransferSrc => vk::PipelineStageFlags::TRANSFER,
            Self::TransferDst => vk::PipelineStageFlags::TRANSFER,
            Self::PresentSrc => vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        }
    }

    /// Pipeline stage blocked until the barrier completes when entering
    /// this state.
    pub fn dst_stage(self) -> vk::PipelineStageFlags {
        match self {
            Self::Undefined => vk::PipelineStageFlags::TOP_OF_PIPE,
            Self::ColorAttachment => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            Self::DepthAttachment => vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            Self::ShaderReadOnly => vk::PipelineStageFlags::FRAGMENT_SHADER,
            Self::DepthReadOnly => vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            Self::TransferSrc => vk::PipelineStageFlags::TRANSFER,
            Self::TransferDst => vk::PipelineStageFlags::TRANSFER,
            Self::PresentSrc => vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        }
    }

    /// The state a usage of the given resource kind requires. Buffers take
    /// no layout transitions.
    pub fn required(kind: ResourceKind, usage: ResourceUsage) -> Option<AccessState> {
        match (kind, usage) {
            (ResourceKind::Color, ResourceUsage::Write) => Some(Self::ColorAttachment),
            (ResourceKind::Color, _) => Some(Self::ShaderReadOnly),
            (ResourceKind::Depth, ResourceUsage::Write) => Some(Self::DepthAttachment),
            // Depth-stencil reads and sampled reads share the read-only
            // depth state.
            (ResourceKind::Depth, _) => Some(Self::DepthReadOnly),
            (ResourceKind::Buffer { .. }, _) => None,
        }
    }
}

fn aspect_mask(kind: ResourceKind) -> vk::ImageAspectFlags {
    match kind {
        ResourceKind::Depth => vk::ImageAspectFlags::DEPTH,
        _ => vk::ImageAspectFlags::COLOR,
    }
}

/// Current access state of every physical image touched this topology.
///
/// State is recorded once per physical backing, never per logical name;
/// two names aliasing the same image through the version chains share one
/// entry, so no barrier is duplicated or lost across a rename.
#[derive(Debug, Default)]
pub struct StateTracker {
    states: HashMap<ImageHandle, AccessState>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of an image, `Undefined` if never seen.
    pub fn current(&self, image: ImageHandle) -> AccessState {
        self.states.get(&image).copied().unwrap_or_default()
    }

    /// Forget an image's state, returning it to `Undefined`. Used when a
    /// presentation image is re-acquired and its contents are no longer
    /// defined.
    pub fn reset(&mut self, image: ImageHandle) {
        self.states.remove(&image);
    }

    /// Bring an image into `target`, emitting a barrier through the device
    /// if the state actually changes. Returns whether a barrier was
    /// emitted.
    pub fn transition(
        &mut self,
        device: &mut dyn RenderDevice,
        image: ImageHandle,
        kind: ResourceKind,
        target: AccessState,
    ) -> bool {
        let current = self.current(image);
        if current == target {
            return false;
        }

        device.pipeline_barrier(&ImageBarrier {
            image,
            old_layout: current.to_vk(),
            new_layout: target.to_vk(),
            src_stage_mask: current.src_stage(),
            src_access_mask: current.src_access_mask(),
            dst_stage_mask: target.dst_stage(),
            dst_access_mask: target.dst_access_mask(),
            aspect_mask: aspect_mask(kind),
        });
        self.states.insert(image, target);
        true
    }

    /// Transition for a declared usage of the given resource kind. Buffer
    /// usages emit nothing.
    pub fn transition_for(
        &mut self,
        device: &mut dyn RenderDevice,
        image: ImageHandle,
        kind: ResourceKind,
        usage: ResourceUsage,
    ) -> bool {
        match AccessState::required(kind, usage) {
            Some(target) => self.transition(device, image, kind, target),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{
        BufferHandle, DeviceResult, Extent2d, SurfaceTarget,
    };

    /// Device stub that only counts barriers.
    #[derive(Default)]
    struct BarrierCounter {
        barriers: Vec<ImageBarrier>,
    }

    impl RenderDevice for BarrierCounter {
        fn wait_frame_slot(&mut self, _slot: usize) -> DeviceResult<()> {
            Ok(())
        }
        fn acquire_target(&mut self) -> DeviceResult<SurfaceTarget> {
            unimplemented!()
        }
        fn surface_extent(&self) -> Extent2d {
            Extent2d::default()
        }
        fn recreate_surface(&mut self, _extent: Extent2d) -> DeviceResult<()> {
            Ok(())
        }
        fn create_color_image(&mut self, _: &str, _: Extent2d) -> DeviceResult<ImageHandle> {
            unimplemented!()
        }
        fn create_depth_image(&mut self, _: &str, _: Extent2d) -> DeviceResult<ImageHandle> {
            unimplemented!()
        }
        fn create_buffer(&mut self, _: &str, _: u64) -> DeviceResult<BufferHandle> {
            unimplemented!()
        }
        fn destroy_image(&mut self, _: ImageHandle) {}
        fn destroy_buffer(&mut self, _: BufferHandle) {}
        fn pipeline_barrier(&mut self, barrier: &ImageBarrier) {
            self.barriers.push(*barrier);
        }
        fn blit_image(&mut self, _: ImageHandle, _: Extent2d, _: ImageHandle, _: Extent2d) {}
        fn submit_present(&mut self, _: usize, _: &SurfaceTarget) -> DeviceResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_transition_is_idempotent() {
        let mut device = BarrierCounter::default();
        let mut tracker = StateTracker::new();
        let image = ImageHandle::from_raw(1);

        assert!(tracker.transition_for(
            &mut device,
            image,
            ResourceKind::Color,
            ResourceUsage::Write
        ));
        assert!(!tracker.transition_for(
            &mut device,
            image,
            ResourceKind::Color,
            ResourceUsage::Write
        ));
        assert_eq!(device.barriers.len(), 1);
    }

    #[test]
    fn test_read_after_write_emits_new_barrier() {
        let mut device = BarrierCounter::default();
        let mut tracker = StateTracker::new();
        let image = ImageHandle::from_raw(1);

        tracker.transition_for(&mut device, image, ResourceKind::Color, ResourceUsage::Write);
        tracker.transition_for(&mut device, image, ResourceKind::Color, ResourceUsage::Read);
        assert!(tracker.transition_for(
            &mut device,
            image,
            ResourceKind::Color,
            ResourceUsage::Write
        ));
        assert_eq!(device.barriers.len(), 3);

        let read_to_write = &device.barriers[2];
        assert_eq!(
            read_to_write.old_layout,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        );
        assert_eq!(
            read_to_write.new_layout,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        );
        assert_eq!(
            read_to_write.src_stage_mask,
            vk::PipelineStageFlags::FRAGMENT_SHADER
        );
    }

    #[test]
    fn test_first_transition_leaves_undefined() {
        let mut device = BarrierCounter::default();
        let mut tracker = StateTracker::new();
        let image = ImageHandle::from_raw(9);

        tracker.transition_for(&mut device, image, ResourceKind::Depth, ResourceUsage::Write);
        let barrier = &device.barriers[0];
        assert_eq!(barrier.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(
            barrier.new_layout,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        );
        assert_eq!(barrier.aspect_mask, vk::ImageAspectFlags::DEPTH);
        assert_eq!(barrier.src_access_mask, vk::AccessFlags::empty());
    }

    #[test]
    fn test_depth_stencil_read_matches_plain_read() {
        assert_eq!(
            AccessState::required(ResourceKind::Depth, ResourceUsage::DepthStencilRead),
            AccessState::required(ResourceKind::Depth, ResourceUsage::Read),
        );
    }

    #[test]
    fn test_buffers_take_no_transitions() {
        let mut device = BarrierCounter::default();
        let mut tracker = StateTracker::new();
        let image = ImageHandle::from_raw(2);

        assert!(!tracker.transition_for(
            &mut device,
            image,
            ResourceKind::Buffer { size: 64 },
            ResourceUsage::Read
        ));
        assert!(device.barriers.is_empty());
    }

    #[test]
    fn test_reset_returns_to_undefined() {
        let mut device = BarrierCounter::default();
        let mut tracker = StateTracker::new();
        let image = ImageHandle::from_raw(3);

        tracker.transition_for(&mut device, image, ResourceKind::Color, ResourceUsage::Write);
        tracker.reset(image);
        assert_eq!(tracker.current(image), AccessState::Undefined);

        // The next transition starts from Undefined again.
        tracker.transition_for(&mut device, image, ResourceKind::Color, ResourceUsage::Write);
        assert_eq!(device.barriers[1].old_layout, vk::ImageLayout::UNDEFINED);
    }
}

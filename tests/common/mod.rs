//! Common utilities for frame graph integration tests.
//!
//! Provides a mock [`RenderDevice`] that records every operation the
//! executor drives, plus a pass implementation that logs its execution.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ash::vk;

use frame_graph_engine::{
    BufferHandle, DeviceError, DeviceResult, Extent2d, GuiOverlay, ImageBarrier, ImageHandle,
    PassContext, PassDeclaration, RenderDevice, RenderPass, SurfaceTarget,
};

/// Initialize test logging once; later calls are no-ops.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Everything the mock device was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceOp {
    Wait {
        slot: usize,
    },
    Acquire,
    RecreateSurface {
        extent: Extent2d,
    },
    CreateColor {
        label: String,
        extent: Extent2d,
    },
    CreateDepth {
        label: String,
        extent: Extent2d,
    },
    CreateBuffer {
        label: String,
        size: u64,
    },
    DestroyImage(ImageHandle),
    DestroyBuffer(BufferHandle),
    Barrier {
        image: ImageHandle,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    },
    Blit {
        src: ImageHandle,
        dst: ImageHandle,
    },
    Present {
        slot: usize,
    },
}

/// Mock device: mints handles, records operations, and can be told to
/// report a stale surface on the next acquires or presents.
pub struct MockDevice {
    pub ops: Vec<DeviceOp>,
    pub surface_extent: Extent2d,
    /// Number of upcoming `acquire_target` calls that report staleness.
    pub stale_acquires: usize,
    /// Number of upcoming `submit_present` calls that report staleness.
    pub stale_presents: usize,
    /// Label each image handle was created with.
    pub image_labels: HashMap<ImageHandle, String>,
    next_handle: u64,
}

impl MockDevice {
    pub fn new(surface_extent: Extent2d) -> Self {
        Self {
            ops: Vec::new(),
            surface_extent,
            stale_acquires: 0,
            stale_presents: 0,
            image_labels: HashMap::new(),
            next_handle: 1,
        }
    }

    fn mint(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Handle of the image created with the given label.
    pub fn image_named(&self, label: &str) -> Option<ImageHandle> {
        self.image_labels
            .iter()
            .find(|(_, l)| l.as_str() == label)
            .map(|(&handle, _)| handle)
    }

    /// All barriers recorded for one image, as (old, new) layout pairs.
    pub fn barriers_for(&self, image: ImageHandle) -> Vec<(vk::ImageLayout, vk::ImageLayout)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DeviceOp::Barrier {
                    image: i,
                    old_layout,
                    new_layout,
                } if *i == image => Some((*old_layout, *new_layout)),
                _ => None,
            })
            .collect()
    }

    pub fn count_of(&self, matcher: impl Fn(&DeviceOp) -> bool) -> usize {
        self.ops.iter().filter(|op| matcher(op)).count()
    }
}

impl RenderDevice for MockDevice {
    fn wait_frame_slot(&mut self, slot: usize) -> DeviceResult<()> {
        self.ops.push(DeviceOp::Wait { slot });
        Ok(())
    }

    fn acquire_target(&mut self) -> DeviceResult<SurfaceTarget> {
        if self.stale_acquires > 0 {
            self.stale_acquires -= 1;
            return Err(DeviceError::SurfaceStale);
        }
        self.ops.push(DeviceOp::Acquire);
        let image = ImageHandle::from_raw(self.mint());
        self.image_labels.insert(image, "swapchain".to_string());
        Ok(SurfaceTarget {
            image,
            extent: self.surface_extent,
        })
    }

    fn surface_extent(&self) -> Extent2d {
        self.surface_extent
    }

    fn recreate_surface(&mut self, extent: Extent2d) -> DeviceResult<()> {
        self.surface_extent = extent;
        self.ops.push(DeviceOp::RecreateSurface { extent });
        Ok(())
    }

    fn create_color_image(&mut self, label: &str, extent: Extent2d) -> DeviceResult<ImageHandle> {
        let image = ImageHandle::from_raw(self.mint());
        self.image_labels.insert(image, label.to_string());
        self.ops.push(DeviceOp::CreateColor {
            label: label.to_string(),
            extent,
        });
        Ok(image)
    }

    fn create_depth_image(&mut self, label: &str, extent: Extent2d) -> DeviceResult<ImageHandle> {
        let image = ImageHandle::from_raw(self.mint());
        self.image_labels.insert(image, label.to_string());
        self.ops.push(DeviceOp::CreateDepth {
            label: label.to_string(),
            extent,
        });
        Ok(image)
    }

    fn create_buffer(&mut self, label: &str, size: u64) -> DeviceResult<BufferHandle> {
        let buffer = BufferHandle::from_raw(self.mint());
        self.ops.push(DeviceOp::CreateBuffer {
            label: label.to_string(),
            size,
        });
        Ok(buffer)
    }

    fn destroy_image(&mut self, image: ImageHandle) {
        self.image_labels.remove(&image);
        self.ops.push(DeviceOp::DestroyImage(image));
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.ops.push(DeviceOp::DestroyBuffer(buffer));
    }

    fn pipeline_barrier(&mut self, barrier: &ImageBarrier) {
        self.ops.push(DeviceOp::Barrier {
            image: barrier.image,
            old_layout: barrier.old_layout,
            new_layout: barrier.new_layout,
        });
    }

    fn blit_image(
        &mut self,
        src: ImageHandle,
        _src_extent: Extent2d,
        dst: ImageHandle,
        _dst_extent: Extent2d,
    ) {
        self.ops.push(DeviceOp::Blit { src, dst });
    }

    fn submit_present(&mut self, slot: usize, _target: &SurfaceTarget) -> DeviceResult<()> {
        if self.stale_presents > 0 {
            self.stale_presents -= 1;
            self.ops.push(DeviceOp::Present { slot });
            return Err(DeviceError::SurfaceStale);
        }
        self.ops.push(DeviceOp::Present { slot });
        Ok(())
    }
}

/// Pass that records its executions into a shared log.
pub struct RecordingPass {
    name: String,
    decl: PassDeclaration,
    log: Rc<RefCell<Vec<String>>>,
}

impl RecordingPass {
    pub fn new(
        name: impl Into<String>,
        decl: PassDeclaration,
        log: Rc<RefCell<Vec<String>>>,
    ) -> Self {
        Self {
            name: name.into(),
            decl,
            log,
        }
    }
}

impl RenderPass for RecordingPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare(&self) -> PassDeclaration {
        self.decl.clone()
    }

    fn execute(&mut self, _ctx: &mut PassContext<'_>) {
        self.log.borrow_mut().push(self.name.clone());
    }
}

/// Overlay that counts its draw calls.
#[derive(Default)]
pub struct CountingOverlay {
    pub draws: usize,
}

impl GuiOverlay for CountingOverlay {
    fn draw(&mut self, _device: &mut dyn RenderDevice, _target: &SurfaceTarget) {
        self.draws += 1;
    }
}

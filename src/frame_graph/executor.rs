//! Frame graph executor.
//!
//! Drives a compiled [`FrameGraph`] once per frame: wait for the frame
//! slot, acquire the presentation target, run every pass in scheduled
//! order with its transitions, composite the final output onto the
//! target, hand the target to the GUI overlay and present.
//!
//! CPU recording of frame N+1 overlaps GPU execution of frame N through a
//! small fixed number of frame slots; the blocking wait at the top of a
//! frame guarantees a slot's command buffer is idle before it is reused.

use std::collections::HashMap;

use crate::device::{
    DeviceError, Extent2d, GuiOverlay, PhysicalResource, RenderDevice, SurfaceTarget,
};
use crate::frame_graph::graph::{FrameGraph, GraphError};
use crate::frame_graph::pass::{PassContext, ResourceUsage};
use crate::frame_graph::resource::ResourceKind;
use crate::frame_graph::state::{AccessState, StateTracker};
use crate::frame_graph::FrameError;

/// Default number of frames recorded ahead of the GPU.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Number of independent frame slots.
    pub frames_in_flight: usize,
    /// Logical name of the resource composited onto the presentation
    /// target at the end of the frame. Resolved through the version
    /// chains, so the stable root name works no matter how many renames
    /// the pipeline accumulates.
    pub final_target: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            final_target: "scene_color".to_string(),
        }
    }
}

/// What happened to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was recorded, submitted and presented.
    Presented,
    /// The surface was stale; no pass ran. The caller should simply try
    /// again next frame -- the resize is applied automatically.
    SkippedForResize,
}

/// Per-frame driver for a compiled graph.
pub struct FrameGraphExecutor {
    config: GraphConfig,
    states: StateTracker,
    frame_index: usize,
    resize_pending: bool,
}

impl FrameGraphExecutor {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            states: StateTracker::new(),
            frame_index: 0,
            resize_pending: false,
        }
    }

    /// Frames completed so far.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Apply a window resize immediately: recreate the surface and the
    /// viewport-scaled resources. The schedule is untouched.
    pub fn resize(
        &mut self,
        graph: &mut FrameGraph,
        device: &mut dyn RenderDevice,
        extent: Extent2d,
    ) -> Result<(), FrameError> {
        device.recreate_surface(extent)?;
        graph.resize(device, extent)?;
        self.resize_pending = false;
        Ok(())
    }

    /// Record, submit and present one frame.
    pub fn run_frame(
        &mut self,
        graph: &mut FrameGraph,
        device: &mut dyn RenderDevice,
        overlay: &mut dyn GuiOverlay,
    ) -> Result<FrameOutcome, FrameError> {
        if self.resize_pending {
            let extent = device.surface_extent();
            self.resize(graph, device, extent)?;
        }

        let slot = self.frame_index % self.config.frames_in_flight;
        device.wait_frame_slot(slot)?;

        let target = match device.acquire_target() {
            Ok(target) => target,
            Err(DeviceError::SurfaceStale) => {
                log::warn!("surface stale on acquire, skipping frame");
                self.resize_pending = true;
                return Ok(FrameOutcome::SkippedForResize);
            }
            Err(err) => return Err(err.into()),
        };
        // A freshly acquired presentation image holds no defined contents.
        self.states.reset(target.image);

        // Unwind the previous frame's rename commits so every chain runs
        // from its root again.
        for (root, last) in graph.versions.pairs() {
            graph.table.rename(last, root);
        }

        let schedule = graph.schedule.clone();
        for idx in schedule {
            self.run_pass(graph, device, idx)?;
        }

        self.composite(graph, device, overlay, &target)?;

        match device.submit_present(slot, &target) {
            Ok(()) => {}
            Err(DeviceError::SurfaceStale) => {
                log::warn!("surface stale on present, scheduling resize");
                self.resize_pending = true;
            }
            Err(err) => return Err(err.into()),
        }

        self.frame_index += 1;
        Ok(FrameOutcome::Presented)
    }

    /// Transition, execute and commit a single pass.
    fn run_pass(
        &mut self,
        graph: &mut FrameGraph,
        device: &mut dyn RenderDevice,
        idx: usize,
    ) -> Result<(), FrameError> {
        let node = graph.nodes[idx].clone();
        let mut resolved: HashMap<String, PhysicalResource> = HashMap::new();

        for &(name, usage) in &node.reads {
            let entry = graph.table.get(name, &graph.versions)?;
            let kind = entry.kind;
            let physical = entry.physical.ok_or_else(|| GraphError::ResourceLookupMiss {
                name: graph.table.name_str(name).to_string(),
            })?;
            if let PhysicalResource::Image(image) = physical {
                self.states.transition_for(device, image, kind, usage);
            }
            resolved.insert(graph.table.name_str(name).to_string(), physical);
        }

        for write in &node.writes {
            let entry = graph.table.get(write.source, &graph.versions)?;
            let kind = entry.kind;
            let physical = entry.physical.ok_or_else(|| GraphError::ResourceLookupMiss {
                name: graph.table.name_str(write.source).to_string(),
            })?;
            if let PhysicalResource::Image(image) = physical {
                self.states
                    .transition_for(device, image, kind, ResourceUsage::Write);
            }
            resolved.insert(graph.table.name_str(write.source).to_string(), physical);
            resolved.insert(graph.table.name_str(write.output).to_string(), physical);
        }

        let viewport = graph.table.viewport();
        let mut ctx = PassContext::new(device, &resolved, viewport);
        graph.passes[idx].execute(&mut ctx);

        // Rename commit: the data written under each source is now
        // addressable by the declared output name.
        for write in &node.writes {
            graph.table.rename(write.source, write.output);
        }

        Ok(())
    }

    /// Blit the resolved final output onto the presentation target and
    /// bring the target through overlay drawing to its presentable state.
    fn composite(
        &mut self,
        graph: &mut FrameGraph,
        device: &mut dyn RenderDevice,
        overlay: &mut dyn GuiOverlay,
        target: &SurfaceTarget,
    ) -> Result<(), FrameError> {
        let final_key = graph.table.lookup(&self.config.final_target).ok_or_else(|| {
            GraphError::ResourceLookupMiss {
                name: self.config.final_target.clone(),
            }
        })?;
        let entry = graph.table.get(final_key, &graph.versions)?;
        let (image, kind, extent) = match (entry.physical, entry.extent) {
            (Some(PhysicalResource::Image(image)), Some(extent)) => (image, entry.kind, extent),
            _ => {
                return Err(GraphError::NotAnImage {
                    name: self.config.final_target.clone(),
                }
                .into())
            }
        };

        self.states
            .transition(device, image, kind, AccessState::TransferSrc);
        self.states.transition(
            device,
            target.image,
            ResourceKind::Color,
            AccessState::TransferDst,
        );
        device.blit_image(image, extent, target.image, target.extent);
        self.states.transition(
            device,
            target.image,
            ResourceKind::Color,
            AccessState::ColorAttachment,
        );

        overlay.draw(device, target);

        self.states.transition(
            device,
            target.image,
            ResourceKind::Color,
            AccessState::PresentSrc,
        );

        Ok(())
    }
}

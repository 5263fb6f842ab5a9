//! Frame Graph Engine - a render-frame scheduler with resource versioning
//!
//! This crate coordinates a rendering frame as a set of passes that declare
//! which named GPU resources they read and write. From those declarations it
//!
//! - infers a deterministic execution order that respects producer/consumer
//!   relationships (and rejects cyclic topologies outright),
//! - resolves resource renaming, so a pass addressing a stable name
//!   transparently receives whichever physical version currently backs it,
//! - records the exact access-state transition (Vulkan layout plus
//!   stage/access barrier) each resource needs immediately before use.
//!
//! Pass rendering logic, pipeline compilation, windowing and the GUI overlay
//! are collaborators behind the traits in [`device`]; the graph owns only
//! the scheduling, versioning and synchronization decisions.
//!
//! # Example
//!
//! ```ignore
//! use frame_graph_engine::{FrameGraph, FrameGraphExecutor, GraphConfig};
//!
//! let mut graph = FrameGraph::build(passes, &mut device, viewport)?;
//! let mut executor = FrameGraphExecutor::new(GraphConfig::default());
//! loop {
//!     executor.run_frame(&mut graph, &mut device, &mut overlay)?;
//! }
//! ```

pub mod device;
pub mod frame_graph;

pub use device::{
    BufferHandle, DeviceError, DeviceResult, Extent2d, GuiOverlay, ImageBarrier, ImageHandle,
    NoOverlay, PhysicalResource, RenderDevice, SurfaceTarget,
};
pub use frame_graph::{
    AccessState, FrameError, FrameGraph, FrameGraphExecutor, FrameOutcome, GraphConfig,
    GraphError, PassContext, PassDeclaration, RenderPass, ResourceInfo, ResourceKind,
    ResourceSizing, ResourceUsage, DEFAULT_FRAMES_IN_FLIGHT,
};

//! Frame Graph System
//!
//! A declarative system for defining render passes as a directed acyclic
//! graph. Passes declare which named resources they read and which they
//! write; the graph infers the execution order, resolves the version a
//! name refers to after renames accumulate through the pipeline, and
//! records the access-state transition every resource needs before use.

pub mod executor;
pub mod graph;
pub mod pass;
pub mod resource;
pub mod state;

mod version;

pub use executor::{
    FrameGraphExecutor, FrameOutcome, GraphConfig, DEFAULT_FRAMES_IN_FLIGHT,
};
pub use graph::{FrameGraph, GraphError};
pub use pass::{PassContext, PassDeclaration, ReadDecl, RenderPass, ResourceUsage, WriteDecl};
pub use resource::{ResourceInfo, ResourceKind, ResourceSizing};
pub use state::{AccessState, StateTracker};

use thiserror::Error;

use crate::device::DeviceError;

/// Unified error for building and running a frame graph.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

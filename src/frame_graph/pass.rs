//! Render pass interface and resource-usage declarations.

use std::collections::HashMap;

use crate::device::{BufferHandle, Extent2d, ImageHandle, PhysicalResource, RenderDevice};
use crate::frame_graph::resource::{ResourceInfo, ResourceName};

/// How a pass uses a declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUsage {
    /// Sampled in a shader.
    Read,
    /// Written as a color or depth attachment.
    Write,
    /// Bound as a read-only depth attachment while also sampled. Treated
    /// exactly like [`ResourceUsage::Read`] for transition purposes.
    DepthStencilRead,
}

/// A read declared by a pass.
#[derive(Debug, Clone)]
pub struct ReadDecl {
    pub info: ResourceInfo,
    pub usage: ResourceUsage,
}

/// A write declared by a pass: the pass consumes `source` and produces a
/// new version of it addressable as `output` afterwards. The two names may
/// be different (a rename) or equal (an in-place update).
#[derive(Debug, Clone)]
pub struct WriteDecl {
    pub output: String,
    pub source: ResourceInfo,
}

/// The set of resources a pass reads and writes.
#[derive(Debug, Clone, Default)]
pub struct PassDeclaration {
    pub reads: Vec<ReadDecl>,
    pub writes: Vec<WriteDecl>,
}

impl PassDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a sampled read.
    pub fn reads(mut self, info: ResourceInfo) -> Self {
        self.reads.push(ReadDecl {
            info,
            usage: ResourceUsage::Read,
        });
        self
    }

    /// Declare a read-only depth-stencil usage.
    pub fn reads_depth_stencil(mut self, info: ResourceInfo) -> Self {
        self.reads.push(ReadDecl {
            info,
            usage: ResourceUsage::DepthStencilRead,
        });
        self
    }

    /// Declare a write producing a new version of `source` under `output`.
    pub fn writes(mut self, output: impl Into<String>, source: ResourceInfo) -> Self {
        self.writes.push(WriteDecl {
            output: output.into(),
            source,
        });
        self
    }
}

/// Trait for render passes.
///
/// A pass is an opaque unit of rendering work. The frame graph reads its
/// declaration once at build time, then invokes `execute` every frame with
/// all declared resources already transitioned to the required access
/// state.
pub trait RenderPass {
    /// Pass name, used for diagnostics and cycle reports.
    fn name(&self) -> &str;

    /// Declare the resources this pass reads and writes.
    fn declare(&self) -> PassDeclaration;

    /// Record this pass's commands.
    fn execute(&mut self, ctx: &mut PassContext<'_>);
}

/// Execution context handed to a pass for the duration of its
/// `execute` call.
///
/// Resolved physical handles are addressable by the names the pass used in
/// its declaration (read names, write sources and write outputs). The pass
/// must not retain handles beyond the call.
pub struct PassContext<'a> {
    pub device: &'a mut dyn RenderDevice,
    resolved: &'a HashMap<String, PhysicalResource>,
    viewport: Extent2d,
}

impl<'a> PassContext<'a> {
    pub(crate) fn new(
        device: &'a mut dyn RenderDevice,
        resolved: &'a HashMap<String, PhysicalResource>,
        viewport: Extent2d,
    ) -> Self {
        Self {
            device,
            resolved,
            viewport,
        }
    }

    /// Resolved image handle for a declared resource name.
    pub fn image(&self, name: &str) -> Option<ImageHandle> {
        self.resolved.get(name).and_then(|r| r.as_image())
    }

    /// Resolved buffer handle for a declared resource name.
    pub fn buffer(&self, name: &str) -> Option<BufferHandle> {
        self.resolved.get(name).and_then(|r| r.as_buffer())
    }

    /// Current viewport extent.
    pub fn viewport(&self) -> Extent2d {
        self.viewport
    }
}

/// Interned form of a pass declaration, produced once at graph build.
#[derive(Debug, Clone)]
pub(crate) struct PassNode {
    pub name: String,
    pub reads: Vec<(ResourceName, ResourceUsage)>,
    pub writes: Vec<PassWrite>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PassWrite {
    pub output: ResourceName,
    pub source: ResourceName,
}

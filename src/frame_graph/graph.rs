//! Dependency graph construction, pass scheduling and the compiled graph.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::device::{DeviceResult, Extent2d, PhysicalResource, RenderDevice};
use crate::frame_graph::pass::{PassNode, PassWrite, RenderPass};
use crate::frame_graph::resource::{ResourceName, ResourceTable};
use crate::frame_graph::version::VersionMap;
use crate::frame_graph::FrameError;

/// Errors raised while building or querying the graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The pass dependencies form a cycle. Fatal for the topology: no
    /// partial schedule is ever produced.
    #[error("cyclic dependency between passes: {passes:?}")]
    CycleDetected { passes: Vec<String> },
    /// A name with neither a direct resource nor a version-chain entry.
    #[error("no resource or version chain entry for \"{name}\"")]
    ResourceLookupMiss { name: String },
    /// The configured final output resolved to a buffer.
    #[error("final output \"{name}\" is not an image resource")]
    NotAnImage { name: String },
}

/// Producer/consumer edges between passes as adjacency lists plus
/// in-degree counts.
#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    pub adjacency: Vec<Vec<usize>>,
    pub in_degree: Vec<usize>,
}

/// Derive the dependency edges from the ordered pass list.
///
/// Two rules produce edges:
///
/// - a pass reading a name is ordered after the pass that produced that
///   version (when the only producer is declared later, the edge still
///   points at it -- that is the cyclic-hazard case the scheduler rejects);
/// - successive writers deriving from the same resource are ordered by
///   declaration, tracked through a last-writer map keyed by both the
///   consumed source and the produced output.
pub(crate) fn build_dependencies(nodes: &[PassNode]) -> DependencyGraph {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree = vec![0usize; nodes.len()];

    fn add_edge(
        adjacency: &mut [Vec<usize>],
        in_degree: &mut [usize],
        from: usize,
        to: usize,
    ) {
        if from == to || adjacency[from].contains(&to) {
            return;
        }
        adjacency[from].push(to);
        in_degree[to] += 1;
    }

    // Every pass producing a version under a name, in declaration order.
    let mut producers: HashMap<ResourceName, Vec<usize>> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        for write in &node.writes {
            producers.entry(write.output).or_default().push(i);
        }
    }

    let mut last_writer: HashMap<ResourceName, usize> = HashMap::new();

    for (i, node) in nodes.iter().enumerate() {
        for &(name, _) in &node.reads {
            let Some(writers) = producers.get(&name) else {
                // Never written by any pass: externally supplied, no edge.
                continue;
            };
            let producer = writers
                .iter()
                .rev()
                .find(|&&w| w < i)
                .or_else(|| writers.iter().rev().find(|&&w| w != i))
                .copied();
            if let Some(writer) = producer {
                add_edge(&mut adjacency, &mut in_degree, writer, i);
            }
        }
        for write in &node.writes {
            if let Some(&writer) = last_writer.get(&write.source) {
                add_edge(&mut adjacency, &mut in_degree, writer, i);
            }
            last_writer.insert(write.source, i);
            last_writer.insert(write.output, i);
        }
    }

    DependencyGraph {
        adjacency,
        in_degree,
    }
}

/// Kahn's algorithm over the dependency graph.
///
/// The ready queue is FIFO, so passes with equal in-degree keep their
/// declaration order and the result is deterministic for a fixed pass
/// list. A short result means a cycle; the unscheduled pass names are
/// reported and no ordering is returned.
pub(crate) fn topological_sort(
    nodes: &[PassNode],
    graph: &DependencyGraph,
) -> Result<Vec<usize>, GraphError> {
    let mut in_degree = graph.in_degree.clone();
    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(nodes.len());

    while let Some(current) = queue.pop_front() {
        sorted.push(current);
        for &next in &graph.adjacency[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if sorted.len() != nodes.len() {
        let scheduled: HashSet<usize> = sorted.iter().copied().collect();
        let passes = (0..nodes.len())
            .filter(|i| !scheduled.contains(i))
            .map(|i| nodes[i].name.clone())
            .collect();
        return Err(GraphError::CycleDetected { passes });
    }

    Ok(sorted)
}

/// A compiled frame graph: the passes, their schedule, the version chains
/// and the resource table with realized backings.
///
/// Built once per topology. Physical resources created here persist until
/// [`FrameGraph::destroy`]; only viewport-scaled images are recreated on
/// [`FrameGraph::resize`]. The schedule never changes after a successful
/// build -- a cyclic topology fails the build before any frame can run.
pub struct FrameGraph {
    pub(crate) passes: Vec<Box<dyn RenderPass>>,
    pub(crate) nodes: Vec<PassNode>,
    pub(crate) schedule: Vec<usize>,
    pub(crate) versions: VersionMap,
    pub(crate) table: ResourceTable,
}

impl FrameGraph {
    /// Compile a topology from an ordered list of passes.
    ///
    /// Interns every declared resource, derives the version chains,
    /// creates physical backings for all chain roots, builds the
    /// dependency graph and schedules it. Fails with
    /// [`GraphError::CycleDetected`] before any resource of a cyclic
    /// topology could be used by a frame.
    pub fn build(
        passes: Vec<Box<dyn RenderPass>>,
        device: &mut dyn RenderDevice,
        viewport: Extent2d,
    ) -> Result<Self, FrameError> {
        let mut table = ResourceTable::new(viewport);
        let mut nodes = Vec::with_capacity(passes.len());

        for pass in &passes {
            let decl = pass.declare();
            let reads = decl
                .reads
                .iter()
                .map(|read| (table.declare(&read.info), read.usage))
                .collect();
            let writes = decl
                .writes
                .iter()
                .map(|write| PassWrite {
                    source: table.declare(&write.source),
                    output: table.intern(&write.output),
                })
                .collect();
            nodes.push(PassNode {
                name: pass.name().to_string(),
                reads,
                writes,
            });
        }

        let versions = VersionMap::build(&nodes);
        table.remove_renamed(&versions);
        table.realize(device)?;

        let deps = build_dependencies(&nodes);
        let schedule = topological_sort(&nodes, &deps)?;

        if log::log_enabled!(log::Level::Debug) {
            let order: Vec<&str> = schedule.iter().map(|&i| nodes[i].name.as_str()).collect();
            log::debug!("frame graph schedule: {order:?}");
        }

        Ok(Self {
            passes,
            nodes,
            schedule,
            versions,
            table,
        })
    }

    /// Number of passes in the topology.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Pass names in scheduled order.
    pub fn schedule(&self) -> impl Iterator<Item = &str> {
        self.schedule.iter().map(|&i| self.nodes[i].name.as_str())
    }

    /// Resolve a logical name to the physical resource currently backing
    /// it, following version chains when the direct lookup misses.
    pub fn resolve(&self, name: &str) -> Result<PhysicalResource, GraphError> {
        let key = self
            .table
            .lookup(name)
            .ok_or_else(|| GraphError::ResourceLookupMiss {
                name: name.to_string(),
            })?;
        let entry = self.table.get(key, &self.versions)?;
        entry
            .physical
            .ok_or_else(|| GraphError::ResourceLookupMiss {
                name: name.to_string(),
            })
    }

    /// Viewport the resource table is currently sized against.
    pub fn viewport(&self) -> Extent2d {
        self.table.viewport()
    }

    /// Recreate viewport-scaled resources at a new extent. Fixed-size
    /// backings and the schedule are untouched.
    pub fn resize(&mut self, device: &mut dyn RenderDevice, viewport: Extent2d) -> DeviceResult<()> {
        // Entries sit at the end of their rename chains once a frame has
        // run; move them back to their roots before recreating anything.
        for (root, last) in self.versions.pairs() {
            self.table.rename(last, root);
        }
        self.table.invalidate_scaled(device);
        self.table.set_viewport(viewport);
        self.table.realize(device)
    }

    /// Destroy every physical resource owned by the topology.
    pub fn destroy(&mut self, device: &mut dyn RenderDevice) {
        self.table.destroy_all(device);
    }
}

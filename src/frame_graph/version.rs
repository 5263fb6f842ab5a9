//! Resource version chains.
//!
//! A write `(output, source)` declares that the pass consumes `source` and
//! leaves its data addressable under `output`. Chaining these across passes
//! gives every original resource a trail of names ending in the one that
//! holds live data once the frame has run. This module derives, from the
//! ordered pass list:
//!
//! - `transformations`: each source name to the output name replacing it,
//! - `final_of`: each chain root (a name that is never itself produced by
//!   a write) to the last name of its chain,
//! - `root_of`: every name on any chain back to its root, for O(1)
//!   fallback lookups.

use std::collections::{HashMap, HashSet};

use crate::frame_graph::pass::PassNode;
use crate::frame_graph::resource::ResourceName;

#[derive(Debug, Default)]
pub(crate) struct VersionMap {
    transformations: HashMap<ResourceName, ResourceName>,
    final_of: HashMap<ResourceName, ResourceName>,
    root_of: HashMap<ResourceName, ResourceName>,
}

impl VersionMap {
    pub fn build(nodes: &[PassNode]) -> Self {
        let mut transformations: HashMap<ResourceName, ResourceName> = HashMap::new();
        let mut predecessors: HashMap<ResourceName, ResourceName> = HashMap::new();

        for node in nodes {
            for write in &node.writes {
                // An in-place update is not a rename.
                if write.output == write.source {
                    continue;
                }
                transformations.insert(write.source, write.output);
                predecessors.insert(write.output, write.source);
            }
        }

        let mut root_of: HashMap<ResourceName, ResourceName> = HashMap::new();
        for (&output, &source) in &predecessors {
            let mut root = source;
            let mut visited = HashSet::new();
            while let Some(&prev) = predecessors.get(&root) {
                if !visited.insert(root) {
                    log::warn!("cyclic rename chain detected while tracing root of a resource");
                    break;
                }
                root = prev;
            }
            root_of.insert(output, root);
        }

        // Original names: sources that are never themselves the output of
        // another pass's write.
        let outputs: HashSet<ResourceName> = transformations.values().copied().collect();
        let mut final_of = HashMap::new();
        for &source in transformations.keys() {
            if outputs.contains(&source) {
                continue;
            }
            final_of.insert(source, Self::walk(&transformations, source));
            root_of.insert(source, source);
        }

        Self {
            transformations,
            final_of,
            root_of,
        }
    }

    fn walk(
        transformations: &HashMap<ResourceName, ResourceName>,
        start: ResourceName,
    ) -> ResourceName {
        let mut current = start;
        let mut visited = HashSet::new();
        while let Some(&next) = transformations.get(&current) {
            if !visited.insert(current) {
                log::warn!("cyclic rename chain detected while resolving a final name");
                break;
            }
            current = next;
        }
        current
    }

    /// The name currently bound to live data for whatever chain `name`
    /// belongs to, or `None` for names on no chain.
    pub fn resolve_current(&self, name: ResourceName) -> Option<ResourceName> {
        self.final_of(self.root_of(name)?)
    }

    /// The root of the chain `name` sits on, if any.
    pub fn root_of(&self, name: ResourceName) -> Option<ResourceName> {
        self.root_of.get(&name).copied()
    }

    /// The final name of the chain rooted at `root`, if `root` is a root.
    pub fn final_of(&self, root: ResourceName) -> Option<ResourceName> {
        self.final_of.get(&root).copied()
    }

    /// True for names that sit on a chain without being its root. They
    /// never receive their own physical backing.
    pub fn is_renamed(&self, name: ResourceName) -> bool {
        self.root_of.get(&name).is_some_and(|root| *root != name)
    }

    /// The `(root, final)` pair of every chain.
    pub fn pairs(&self) -> impl Iterator<Item = (ResourceName, ResourceName)> + '_ {
        self.final_of.iter().map(|(&root, &last)| (root, last))
    }

    /// The output name a source is renamed to, if any.
    #[cfg(test)]
    pub fn renamed_to(&self, source: ResourceName) -> Option<ResourceName> {
        self.transformations.get(&source).copied()
    }
}

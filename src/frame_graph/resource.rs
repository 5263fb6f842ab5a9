//! Logical resources and the string-keyed resource table.
//!
//! Passes refer to resources by name. The table interns every name to a
//! dense [`ResourceName`] key and stores entries in an arena indexed by it,
//! so all internal bookkeeping (version chains, rename commits, adjacency)
//! works on plain integers while the string stays the external contract.

use std::collections::HashMap;

use crate::device::{
    DeviceResult, Extent2d, PhysicalResource, RenderDevice,
};
use crate::frame_graph::graph::GraphError;
use crate::frame_graph::version::VersionMap;

/// Interned key for a logical resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceName(pub(crate) u32);

impl ResourceName {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// What kind of physical object backs a resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResourceKind {
    /// Color image, usable as render target and sampled texture.
    Color,
    /// Depth image, usable as depth attachment and sampled texture.
    Depth,
    /// Plain buffer of the given byte size.
    Buffer { size: u64 },
}

impl ResourceKind {
    pub fn is_image(&self) -> bool {
        !matches!(self, Self::Buffer { .. })
    }
}

/// How a resource's extent is determined when its backing is first created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResourceSizing {
    /// Absolute extent in pixels.
    Fixed(Extent2d),
    /// Fraction of the current viewport (1.0 = full viewport).
    ViewportScale(f32),
}

impl ResourceSizing {
    /// Resolve to a concrete extent against the given viewport.
    pub fn resolve(&self, viewport: Extent2d) -> Extent2d {
        match self {
            Self::Fixed(extent) => *extent,
            Self::ViewportScale(factor) => viewport.scaled(*factor),
        }
    }
}

/// Declarative record of a resource as referenced by a pass declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInfo {
    pub name: String,
    pub kind: ResourceKind,
    pub sizing: ResourceSizing,
}

impl ResourceInfo {
    pub fn color(name: impl Into<String>, sizing: ResourceSizing) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Color,
            sizing,
        }
    }

    pub fn depth(name: impl Into<String>, sizing: ResourceSizing) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Depth,
            sizing,
        }
    }

    pub fn buffer(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Buffer { size },
            sizing: ResourceSizing::Fixed(Extent2d::default()),
        }
    }
}

/// A table entry: the declarative info plus the lazily created backing.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub kind: ResourceKind,
    pub sizing: ResourceSizing,
    /// Created on first realization, destroyed only on teardown (or on
    /// resize for viewport-scaled entries).
    pub physical: Option<PhysicalResource>,
    /// Extent the backing was created with (images only).
    pub extent: Option<Extent2d>,
}

/// Owned, explicit registry of every logical resource in the topology.
///
/// Entries are created the first time any pass references a name; a second
/// reference to the same name reuses the first declaration. Rename commits
/// move an entry from one name key to another without touching the backing.
#[derive(Debug, Default)]
pub struct ResourceTable {
    names: Vec<String>,
    index: HashMap<String, ResourceName>,
    entries: Vec<Option<ResourceEntry>>,
    viewport: Extent2d,
}

impl ResourceTable {
    pub fn new(viewport: Extent2d) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }

    /// Intern a name, minting a fresh key on first sight.
    pub(crate) fn intern(&mut self, name: &str) -> ResourceName {
        if let Some(&key) = self.index.get(name) {
            return key;
        }
        let key = ResourceName(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), key);
        self.entries.push(None);
        key
    }

    /// Look up an already interned name.
    pub(crate) fn lookup(&self, name: &str) -> Option<ResourceName> {
        self.index.get(name).copied()
    }

    /// The string a key was interned from.
    pub(crate) fn name_str(&self, name: ResourceName) -> &str {
        &self.names[name.index()]
    }

    pub fn viewport(&self) -> Extent2d {
        self.viewport
    }

    pub(crate) fn set_viewport(&mut self, viewport: Extent2d) {
        self.viewport = viewport;
    }

    /// Register a declaration under its name. The first declaration of a
    /// name wins; later references only resolve the key.
    pub(crate) fn declare(&mut self, info: &ResourceInfo) -> ResourceName {
        let key = self.intern(&info.name);
        if self.entries[key.index()].is_none() {
            self.entries[key.index()] = Some(ResourceEntry {
                kind: info.kind,
                sizing: info.sizing,
                physical: None,
                extent: None,
            });
        }
        key
    }

    /// Drop the entries of names that sit on a rename chain without being
    /// its root. Such names never own a backing; they only ever alias the
    /// root entry as renames commit during a frame.
    pub(crate) fn remove_renamed(&mut self, versions: &VersionMap) {
        for idx in 0..self.entries.len() {
            if versions.is_renamed(ResourceName(idx as u32)) {
                self.entries[idx] = None;
            }
        }
    }

    /// Create physical backings for every entry that lacks one.
    pub(crate) fn realize(&mut self, device: &mut dyn RenderDevice) -> DeviceResult<()> {
        for idx in 0..self.entries.len() {
            let Some(entry) = self.entries[idx].as_mut() else {
                continue;
            };
            if entry.physical.is_some() {
                continue;
            }
            let label = &self.names[idx];
            match entry.kind {
                ResourceKind::Color => {
                    let extent = entry.sizing.resolve(self.viewport);
                    entry.physical =
                        Some(PhysicalResource::Image(device.create_color_image(label, extent)?));
                    entry.extent = Some(extent);
                }
                ResourceKind::Depth => {
                    let extent = entry.sizing.resolve(self.viewport);
                    entry.physical =
                        Some(PhysicalResource::Image(device.create_depth_image(label, extent)?));
                    entry.extent = Some(extent);
                }
                ResourceKind::Buffer { size } => {
                    entry.physical =
                        Some(PhysicalResource::Buffer(device.create_buffer(label, size)?));
                }
            }
        }
        Ok(())
    }

    /// Direct lookup by key, no version fallback.
    pub(crate) fn get_direct(&self, name: ResourceName) -> Option<&ResourceEntry> {
        self.entries.get(name.index()).and_then(|e| e.as_ref())
    }

    /// Resolve a name to its entry.
    ///
    /// Tries the table directly first; on a miss, maps the name to its
    /// original root through the version chains and retries under the
    /// root's current final name, then under the root itself (before the
    /// first frame has committed any rename, chain entries still sit at
    /// their roots). A name with neither a direct entry nor a chain entry
    /// is a hard failure.
    pub(crate) fn get(
        &self,
        name: ResourceName,
        versions: &VersionMap,
    ) -> Result<&ResourceEntry, GraphError> {
        if let Some(entry) = self.get_direct(name) {
            return Ok(entry);
        }
        if let Some(root) = versions.root_of(name) {
            if let Some(entry) = versions
                .final_of(root)
                .and_then(|current| self.get_direct(current))
            {
                return Ok(entry);
            }
            if let Some(entry) = self.get_direct(root) {
                return Ok(entry);
            }
        }
        Err(GraphError::ResourceLookupMiss {
            name: self.name_str(name).to_string(),
        })
    }

    /// Move an entry from one name key to another (rename commit). A
    /// missing source or identical keys are no-ops; an existing entry
    /// under `to` is replaced.
    pub(crate) fn rename(&mut self, from: ResourceName, to: ResourceName) {
        if from == to {
            return;
        }
        if let Some(entry) = self.entries[from.index()].take() {
            self.entries[to.index()] = Some(entry);
        }
    }

    /// Destroy the backings of viewport-scaled entries so they are
    /// recreated at the new viewport on the next realization. Fixed-size
    /// entries keep their backing.
    pub(crate) fn invalidate_scaled(&mut self, device: &mut dyn RenderDevice) {
        for entry in self.entries.iter_mut().flatten() {
            if !matches!(entry.sizing, ResourceSizing::ViewportScale(_)) {
                continue;
            }
            if let Some(PhysicalResource::Image(image)) = entry.physical.take() {
                device.destroy_image(image);
            }
            entry.extent = None;
        }
    }

    /// Destroy every backing. Called once at topology teardown.
    pub(crate) fn destroy_all(&mut self, device: &mut dyn RenderDevice) {
        for entry in self.entries.iter_mut().flatten() {
            match entry.physical.take() {
                Some(PhysicalResource::Image(image)) => device.destroy_image(image),
                Some(PhysicalResource::Buffer(buffer)) => device.destroy_buffer(buffer),
                None => {}
            }
            entry.extent = None;
        }
    }
}

//! Dependency graph for ordering provisionable resources.
//!
//! This module provides the directed acyclic graph callers use to sequence
//! multi-resource provisioning batches: insert resources, declare "from
//! depends on to" edges, then ask for a provisioning order in which every
//! dependency precedes its dependents.
//!
//! The graph is an arena: a map from opaque id to a node record holding two
//! adjacency sets (ids this node depends on, ids that depend on it). There
//! are no shared pointers between nodes, so removal just severs ids from the
//! neighbouring sets.
//!
//! Edges are validated at insertion. A self-referencing edge, an edge with a
//! missing endpoint, or an edge that would close a cycle is rejected with a
//! typed error and leaves the graph unchanged, so the structure is never
//! observably cyclic and [`resolve_order`](DependencyGraph::resolve_order)
//! cannot fail for graphs built purely through the public API.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use uuid::Uuid;

use crate::core::KeelError;

/// Identity of a provisionable resource within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(Uuid);

impl ResourceId {
    /// Mint a fresh random identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A provisionable unit tracked by the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionUnit {
    /// Identity used for edges and lookups.
    pub id: ResourceId,
    /// Human-readable identifier, carried through to error messages.
    pub identifier: String,
}

impl ProvisionUnit {
    /// New unit with a fresh identity.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(),
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for ProvisionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)
    }
}

#[derive(Debug)]
struct NodeEntry {
    unit: ProvisionUnit,
    /// Out-edges: resources this one depends on.
    depends_on: HashSet<ResourceId>,
    /// In-edges: resources that depend on this one.
    required_by: HashSet<ResourceId>,
}

/// Directed acyclic dependency graph over [`ProvisionUnit`]s.
///
/// Not thread-safe by design: the intended use is sequential batch
/// construction by a single caller followed by one
/// [`resolve_order`](Self::resolve_order) call. It is a planning structure,
/// not a runtime scheduler.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: HashMap<ResourceId, NodeEntry>,
    /// Insertion order, used to seed resolution deterministically.
    order: Vec<ResourceId>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a resource with this id is present.
    #[must_use]
    pub fn contains(&self, id: ResourceId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Insert a resource. Idempotent: re-inserting an existing id is a no-op.
    pub fn add_resource(&mut self, unit: ProvisionUnit) {
        if self.nodes.contains_key(&unit.id) {
            return;
        }
        self.order.push(unit.id);
        self.nodes.insert(
            unit.id,
            NodeEntry {
                unit,
                depends_on: HashSet::new(),
                required_by: HashSet::new(),
            },
        );
    }

    /// Remove a resource and sever every edge referencing it.
    ///
    /// Returns false when the id is not present.
    pub fn remove_resource(&mut self, id: ResourceId) -> bool {
        let Some(entry) = self.nodes.remove(&id) else {
            return false;
        };
        for dep in &entry.depends_on {
            if let Some(node) = self.nodes.get_mut(dep) {
                node.required_by.remove(&id);
            }
        }
        for dependent in &entry.required_by {
            if let Some(node) = self.nodes.get_mut(dependent) {
                node.depends_on.remove(&id);
            }
        }
        self.order.retain(|existing| *existing != id);
        true
    }

    /// Declare that `from` depends on `to`, i.e. `to` must be provisioned
    /// before `from`. Re-declaring an existing edge is a no-op.
    ///
    /// # Errors
    ///
    /// - [`KeelError::SelfDependency`] when `from == to`
    /// - [`KeelError::GraphNodeMissing`] when either endpoint is absent
    /// - [`KeelError::DependencyCycle`] when a path already runs from `to`
    ///   back to `from`; the edge is not inserted and the graph is unchanged
    pub fn add_dependency(&mut self, from: ResourceId, to: ResourceId) -> Result<(), KeelError> {
        if from == to {
            return Err(KeelError::SelfDependency {
                id: self.display_id(from),
            });
        }
        if !self.nodes.contains_key(&from) {
            return Err(KeelError::GraphNodeMissing {
                id: from.to_string(),
            });
        }
        if !self.nodes.contains_key(&to) {
            return Err(KeelError::GraphNodeMissing {
                id: to.to_string(),
            });
        }
        if self.has_path(to, from) {
            return Err(KeelError::DependencyCycle {
                from: self.display_id(from),
                to: self.display_id(to),
            });
        }
        if let Some(node) = self.nodes.get_mut(&from) {
            node.depends_on.insert(to);
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.required_by.insert(from);
        }
        Ok(())
    }

    /// Remove the `from` depends-on `to` edge. Returns false when either
    /// endpoint or the edge itself is absent.
    pub fn remove_dependency(&mut self, from: ResourceId, to: ResourceId) -> bool {
        let removed = match self.nodes.get_mut(&from) {
            Some(node) => node.depends_on.remove(&to),
            None => false,
        };
        if removed {
            if let Some(node) = self.nodes.get_mut(&to) {
                node.required_by.remove(&from);
            }
        }
        removed
    }

    /// Depth-first reachability along depends-on edges.
    ///
    /// Trivially true when `start == target` and both exist; false when
    /// either id is absent.
    #[must_use]
    pub fn has_path(&self, start: ResourceId, target: ResourceId) -> bool {
        if !self.nodes.contains_key(&start) || !self.nodes.contains_key(&target) {
            return false;
        }
        if start == target {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(entry) = self.nodes.get(&current) {
                for next in &entry.depends_on {
                    if *next == target {
                        return true;
                    }
                    stack.push(*next);
                }
            }
        }
        false
    }

    /// Number of resources this one depends on. Zero when the id is absent.
    #[must_use]
    pub fn dependency_count(&self, id: ResourceId) -> usize {
        self.nodes.get(&id).map_or(0, |entry| entry.depends_on.len())
    }

    /// Number of resources depending on this one. Zero when the id is absent.
    #[must_use]
    pub fn dependent_count(&self, id: ResourceId) -> usize {
        self.nodes.get(&id).map_or(0, |entry| entry.required_by.len())
    }

    /// Topological provisioning order: every dependency precedes all of its
    /// dependents.
    ///
    /// Kahn's algorithm over the depends-on relation. The FIFO queue is
    /// seeded with dependency-free resources in insertion order; as each
    /// resource is emitted its dependents' pending counts drop, and those
    /// reaching zero join the queue. Tie-break between simultaneously ready
    /// resources is queue order and nothing stronger.
    ///
    /// # Errors
    ///
    /// [`KeelError::CycleDetected`] when fewer resources are emitted than the
    /// graph holds. Unreachable through the public API, which rejects cycles
    /// at insertion.
    pub fn resolve_order(&self) -> Result<Vec<&ProvisionUnit>, KeelError> {
        let mut pending: HashMap<ResourceId, usize> = self
            .nodes
            .iter()
            .map(|(id, entry)| (*id, entry.depends_on.len()))
            .collect();

        let mut queue: VecDeque<ResourceId> = self
            .order
            .iter()
            .copied()
            .filter(|id| pending.get(id) == Some(&0))
            .collect();

        let mut resolved = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            let entry = match self.nodes.get(&id) {
                Some(entry) => entry,
                None => continue,
            };
            resolved.push(&entry.unit);
            for dependent in &entry.required_by {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }

        if resolved.len() != self.nodes.len() {
            return Err(KeelError::CycleDetected);
        }
        Ok(resolved)
    }

    fn display_id(&self, id: ResourceId) -> String {
        self.nodes.get(&id).map_or_else(|| id.to_string(), |entry| entry.unit.identifier.clone())
    }
}

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChartError, ChartResult};

use super::PlotId;

/// Axis a binding keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingAxis {
    /// Shares the x-range.
    Horizontal,
    /// Shares the y-range.
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// One receiver of a propagated viewport update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationTarget {
    pub node: PlotId,
    pub copy_x: bool,
    pub copy_y: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    first: PlotId,
    second: PlotId,
    axis: BindingAxis,
}

impl Binding {
    fn connects(&self, a: PlotId, b: PlotId, axis: BindingAxis) -> bool {
        self.axis == axis
            && ((self.first == a && self.second == b) || (self.first == b && self.second == a))
    }

    fn involves(&self, node: PlotId) -> bool {
        self.first == node || self.second == node
    }
}

/// Undirected graph for one axis with a cached transitive closure.
#[derive(Debug, Default)]
struct AxisGraph {
    adjacency: IndexMap<PlotId, IndexSet<PlotId>>,
    reachable: IndexMap<PlotId, IndexSet<PlotId>>,
}

impl AxisGraph {
    fn connect(&mut self, a: PlotId, b: PlotId) {
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        self.rebuild();
    }

    fn disconnect(&mut self, a: PlotId, b: PlotId) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(neighbours) = self.adjacency.get_mut(&from) {
                neighbours.shift_remove(&to);
                if neighbours.is_empty() {
                    self.adjacency.shift_remove(&from);
                }
            }
        }
        self.rebuild();
    }

    /// Breadth-first closure from every node, linear in the graph size per start node.
    fn rebuild(&mut self) {
        let mut reachable = IndexMap::with_capacity(self.adjacency.len());
        for &start in self.adjacency.keys() {
            let mut seen = IndexSet::new();
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                let Some(neighbours) = self.adjacency.get(&node) else {
                    continue;
                };
                for &next in neighbours {
                    if next != start && seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
            reachable.insert(start, seen);
        }
        self.reachable = reachable;
    }

    fn reachable_from(&self, node: PlotId) -> impl Iterator<Item = PlotId> + '_ {
        self.reachable.get(&node).into_iter().flatten().copied()
    }

    fn reaches(&self, from: PlotId, to: PlotId) -> bool {
        self.reachable
            .get(&from)
            .is_some_and(|targets| targets.contains(&to))
    }
}

/// Axis-scoped viewport links between masters.
///
/// Both axis graphs are symmetric; reachability is recomputed on every change
/// since binding edits are rare compared to the per-frame lookups.
#[derive(Debug, Default)]
pub struct BindingGraph {
    bindings: IndexMap<BindingId, Binding>,
    horizontal: AxisGraph,
    vertical: AxisGraph,
    next_id: u64,
}

impl BindingGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `a` and `b` on `axis`. Binding an already linked pair returns the
    /// existing handle.
    pub fn bind(&mut self, a: PlotId, b: PlotId, axis: BindingAxis) -> ChartResult<BindingId> {
        if a == b {
            return Err(ChartError::SelfBinding(a));
        }
        if let Some((&id, _)) = self
            .bindings
            .iter()
            .find(|(_, binding)| binding.connects(a, b, axis))
        {
            return Ok(id);
        }

        self.next_id += 1;
        let id = BindingId(self.next_id);
        self.bindings.insert(
            id,
            Binding {
                first: a,
                second: b,
                axis,
            },
        );
        self.graph_mut(axis).connect(a, b);
        debug!(binding = id.raw(), first = a.raw(), second = b.raw(), ?axis, "bound plots");
        Ok(id)
    }

    /// Removes a binding; `false` when it was already gone.
    pub fn unbind(&mut self, id: BindingId) -> bool {
        let Some(binding) = self.bindings.shift_remove(&id) else {
            return false;
        };
        self.graph_mut(binding.axis)
            .disconnect(binding.first, binding.second);
        debug!(binding = id.raw(), axis = ?binding.axis, "unbound plots");
        true
    }

    /// Drops every binding touching `node`, returning how many were removed.
    pub fn remove_node(&mut self, node: PlotId) -> usize {
        let ids = self.bindings_of(node);
        for &id in &ids {
            self.unbind(id);
        }
        ids.len()
    }

    #[must_use]
    pub fn bindings_of(&self, node: PlotId) -> Vec<BindingId> {
        self.bindings
            .iter()
            .filter(|(_, binding)| binding.involves(node))
            .map(|(&id, _)| id)
            .collect()
    }

    #[must_use]
    pub fn binding(&self, id: BindingId) -> Option<(PlotId, PlotId, BindingAxis)> {
        self.bindings
            .get(&id)
            .map(|binding| (binding.first, binding.second, binding.axis))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Nodes transitively linked to `node` on `axis`, excluding `node` itself.
    #[must_use]
    pub fn reachable(&self, node: PlotId, axis: BindingAxis) -> Vec<PlotId> {
        self.graph(axis).reachable_from(node).collect()
    }

    /// Receivers of an update from `source`, one entry per node.
    ///
    /// A node reachable on both axes appears once with both copy flags set.
    #[must_use]
    pub fn propagation_targets(&self, source: PlotId) -> Vec<PropagationTarget> {
        let mut targets: Vec<PropagationTarget> = self
            .horizontal
            .reachable_from(source)
            .map(|node| PropagationTarget {
                node,
                copy_x: true,
                copy_y: self.vertical.reaches(source, node),
            })
            .collect();
        targets.extend(
            self.vertical
                .reachable_from(source)
                .filter(|&node| !self.horizontal.reaches(source, node))
                .map(|node| PropagationTarget {
                    node,
                    copy_x: false,
                    copy_y: true,
                }),
        );
        targets
    }

    fn graph(&self, axis: BindingAxis) -> &AxisGraph {
        match axis {
            BindingAxis::Horizontal => &self.horizontal,
            BindingAxis::Vertical => &self.vertical,
        }
    }

    fn graph_mut(&mut self, axis: BindingAxis) -> &mut AxisGraph {
        match axis {
            BindingAxis::Horizontal => &mut self.horizontal,
            BindingAxis::Vertical => &mut self.vertical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BindingAxis, BindingGraph, PropagationTarget};
    use crate::api::PlotId;

    fn ids() -> (PlotId, PlotId, PlotId) {
        (PlotId::new(1), PlotId::new(2), PlotId::new(3))
    }

    #[test]
    fn reachability_is_transitive_and_symmetric() {
        let (a, b, c) = ids();
        let mut graph = BindingGraph::new();
        graph.bind(a, b, BindingAxis::Horizontal).expect("bind a-b");
        graph.bind(b, c, BindingAxis::Horizontal).expect("bind b-c");

        assert_eq!(graph.reachable(a, BindingAxis::Horizontal), vec![b, c]);
        assert_eq!(graph.reachable(c, BindingAxis::Horizontal), vec![b, a]);
        assert!(graph.reachable(a, BindingAxis::Vertical).is_empty());
    }

    #[test]
    fn unbinding_the_bridge_splits_the_component() {
        let (a, b, c) = ids();
        let mut graph = BindingGraph::new();
        graph.bind(a, b, BindingAxis::Vertical).expect("bind a-b");
        let bridge = graph.bind(b, c, BindingAxis::Vertical).expect("bind b-c");

        assert!(graph.unbind(bridge));
        assert_eq!(graph.reachable(a, BindingAxis::Vertical), vec![b]);
        assert!(graph.reachable(c, BindingAxis::Vertical).is_empty());
    }

    #[test]
    fn dual_axis_receiver_gets_a_single_target() {
        let (a, b, c) = ids();
        let mut graph = BindingGraph::new();
        graph.bind(a, b, BindingAxis::Horizontal).expect("bind h");
        graph.bind(a, b, BindingAxis::Vertical).expect("bind v");
        graph.bind(a, c, BindingAxis::Vertical).expect("bind v");

        assert_eq!(
            graph.propagation_targets(a),
            vec![
                PropagationTarget {
                    node: b,
                    copy_x: true,
                    copy_y: true,
                },
                PropagationTarget {
                    node: c,
                    copy_x: false,
                    copy_y: true,
                },
            ]
        );
    }
}

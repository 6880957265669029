use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::PlotId;

/// How the nodes of one tree map onto drawing surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SurfaceMode {
    /// Every node owns its own surface.
    #[default]
    PerNode,
    /// The whole tree draws into the master's surface.
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(u64);

impl SurfaceId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Allocation table from plots to drawing surfaces.
///
/// Surfaces are opaque handles; the host maps them onto whatever drawing API
/// it uses. Tearing a tree down and recreating it always yields fresh ids, so
/// the host can tell stale surfaces apart.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    assignments: IndexMap<PlotId, SurfaceId>,
    next_id: u64,
    created: u64,
    destroyed: u64,
}

impl SurfaceRegistry {
    #[must_use]
    pub fn surface_of(&self, plot: PlotId) -> Option<SurfaceId> {
        self.assignments.get(&plot).copied()
    }

    /// Total surfaces allocated so far.
    #[must_use]
    pub fn created_count(&self) -> u64 {
        self.created
    }

    #[must_use]
    pub fn destroyed_count(&self) -> u64 {
        self.destroyed
    }

    /// Tears down every surface of `nodes` and allocates new ones for `mode`.
    ///
    /// `nodes` must list the tree's master first.
    pub fn rebuild(&mut self, nodes: &[PlotId], mode: SurfaceMode) {
        self.release(nodes);
        let Some(master) = nodes.first().copied() else {
            return;
        };
        match mode {
            SurfaceMode::PerNode => {
                for plot in nodes {
                    let surface = self.allocate();
                    self.assignments.insert(*plot, surface);
                }
            }
            SurfaceMode::Shared => {
                let surface = self.allocate();
                for plot in nodes {
                    self.assignments.insert(*plot, surface);
                }
            }
        }
        debug!(master = ?master, nodes = nodes.len(), ?mode, "rebuilt drawing surfaces");
    }

    /// Drops the surfaces of `nodes`; a shared surface counts once.
    pub fn release(&mut self, nodes: &[PlotId]) {
        let mut released = Vec::new();
        for plot in nodes {
            if let Some(surface) = self.assignments.shift_remove(plot) {
                if !released.contains(&surface) {
                    released.push(surface);
                }
            }
        }
        self.destroyed += released.len() as u64;
    }

    fn allocate(&mut self) -> SurfaceId {
        self.next_id = self.next_id.wrapping_add(1);
        self.created += 1;
        SurfaceId(self.next_id)
    }
}

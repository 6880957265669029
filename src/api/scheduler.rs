use tracing::{trace, warn};

use crate::error::ChartResult;

use super::events::VisibleRectChanged;
use super::{Composition, PlotId};

/// Host-side frame loop.
///
/// The composition calls `request_frame` at most once per master until the
/// host answers with [`Composition::run_frame`] for that master.
pub trait FrameHost {
    fn request_frame(&mut self, master: PlotId);
}

/// Host that drops frame requests; drive frames with `update_layouts`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFrameHost;

impl FrameHost for NullFrameHost {
    fn request_frame(&mut self, _master: PlotId) {}
}

/// Host that records frame requests for deterministic, test-driven loops.
#[derive(Debug, Default, Clone)]
pub struct RecordingFrameHost {
    requests: Vec<PlotId>,
}

impl RecordingFrameHost {
    #[must_use]
    pub fn requests(&self) -> &[PlotId] {
        &self.requests
    }

    /// Returns and clears the requests recorded so far.
    pub fn take_requests(&mut self) -> Vec<PlotId> {
        std::mem::take(&mut self.requests)
    }
}

impl FrameHost for RecordingFrameHost {
    fn request_frame(&mut self, master: PlotId) {
        self.requests.push(master);
    }
}

/// Summary of one executed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// Measure and arrange ran before rendering.
    pub relayout: bool,
    /// Number of nodes whose `render_core` was called.
    pub rendered: usize,
    pub visible_rect_changed: bool,
}

impl<H: FrameHost> Composition<H> {
    /// Marks `id` render-dirty and schedules its master's frame.
    pub fn request_next_frame(&mut self, id: PlotId) -> ChartResult<()> {
        let master = self.master_of(id)?;
        self.node_mut(id)?.requests_render = true;
        self.schedule_frame(master);
        Ok(())
    }

    /// Marks the whole tree of `id` dirty and forces a remeasure on the next frame.
    pub fn request_update_layout(&mut self, id: PlotId) -> ChartResult<()> {
        let master = self.master_of(id)?;
        self.master_state_mut(master)?.requests_update_layout = true;
        self.schedule_frame(master);
        Ok(())
    }

    /// Whether a frame callback is outstanding for the tree of `id`.
    pub fn is_frame_pending(&self, id: PlotId) -> ChartResult<bool> {
        Ok(self.master_state(id)?.frame_pending)
    }

    /// Executes the pending work of one tree: measure, arrange, render, notify.
    ///
    /// Calls for a plot that stopped being a master since the request are
    /// ignored and return an empty report.
    pub fn run_frame(&mut self, master: PlotId) -> ChartResult<FrameReport> {
        let node = self.node_mut(master)?;
        let Some(state) = node.master_state.as_mut() else {
            trace!(plot = master.raw(), "skipping frame for a plot that is no longer a master");
            return Ok(FrameReport::default());
        };
        state.frame_pending = false;
        let relayout = std::mem::take(&mut state.requests_update_layout);

        if relayout {
            self.measure(master)?;
            self.arrange(master)?;
        }
        let rendered = self.render_tree(master, relayout)?;
        let visible_rect_changed = self.notify_visible_rect(master)?;
        trace!(
            master = master.raw(),
            relayout, rendered, visible_rect_changed, "frame complete"
        );
        Ok(FrameReport {
            relayout,
            rendered,
            visible_rect_changed,
        })
    }

    /// Runs every master with an outstanding frame until the composition settles.
    ///
    /// Frames requested while propagating bindings are picked up by the next
    /// pass. Returns how many frames ran.
    pub fn update_layouts(&mut self) -> ChartResult<usize> {
        let max_passes = self.nodes.len() + 1;
        let mut frames = 0;
        for _ in 0..max_passes {
            let pending: Vec<PlotId> = self
                .nodes
                .iter()
                .filter(|(_, node)| node.master_state.as_ref().is_some_and(|s| s.frame_pending))
                .map(|(&id, _)| id)
                .collect();
            if pending.is_empty() {
                return Ok(frames);
            }
            for master in pending {
                self.run_frame(master)?;
                frames += 1;
            }
        }
        warn!(frames, "layout updates did not settle");
        Ok(frames)
    }

    pub(super) fn schedule_frame(&mut self, master: PlotId) {
        let Some(state) = self
            .nodes
            .get_mut(&master)
            .and_then(|node| node.master_state.as_mut())
        else {
            return;
        };
        if state.frame_pending {
            trace!(master = master.raw(), "frame request coalesced");
            return;
        }
        state.frame_pending = true;
        trace!(master = master.raw(), "frame requested");
        self.host.request_frame(master);
    }

    /// Infallible relayout request used right after inserting a master.
    pub(super) fn schedule_update_layout(&mut self, master: PlotId) {
        if let Some(state) = self
            .nodes
            .get_mut(&master)
            .and_then(|node| node.master_state.as_mut())
        {
            state.requests_update_layout = true;
        }
        self.schedule_frame(master);
    }

    /// Emits visible-rect-changed when the rect or animating flag moved since
    /// the last notification, then pushes the rect to bound masters unless
    /// the change came only from one of them.
    fn notify_visible_rect(&mut self, master: PlotId) -> ChartResult<bool> {
        let state = self.master_state_mut(master)?;
        let pushed = std::mem::take(&mut state.suppress_binding_echo);
        let own_change = std::mem::take(&mut state.own_change_pending);
        let suppress = pushed && !own_change;
        let current = (state.visible_rect, state.is_animating_frame);
        if state.last_notified == Some(current) {
            return Ok(false);
        }
        state.last_notified = Some(current);
        let event = VisibleRectChanged {
            master,
            rect: current.0,
            is_animating: current.1,
            origin: state.change_origin,
        };
        state.events.emit_visible_rect_changed(&event);

        if suppress {
            trace!(master = master.raw(), "binding echo suppressed");
        } else {
            self.propagate_visible_rect(master, event.rect, event.is_animating)?;
        }
        Ok(true)
    }
}

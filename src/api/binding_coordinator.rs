use tracing::trace;

use crate::core::Rect;
use crate::error::{ChartError, ChartResult};

use super::binding::{BindingAxis, BindingGraph, BindingId};
use super::events::RectChangeOrigin;
use super::plot_node::FitRequest;
use super::{Composition, FrameHost, PlotId};

impl<H: FrameHost> Composition<H> {
    /// Keeps the `axis` range of the trees of `a` and `b` in sync.
    ///
    /// Both plots are resolved to their masters; binding two plots of the same
    /// tree is rejected. Repeated calls for the same pair return the same id.
    pub fn bind(&mut self, a: PlotId, b: PlotId, axis: BindingAxis) -> ChartResult<BindingId> {
        let first = self
            .master_of(a)
            .map_err(|_| ChartError::UnresolvedMaster(a))?;
        let second = self
            .master_of(b)
            .map_err(|_| ChartError::UnresolvedMaster(b))?;
        if first == second {
            return Err(ChartError::SelfBinding(a));
        }
        self.bindings.bind(first, second, axis)
    }

    /// Removes a binding regardless of how many times it was bound.
    pub fn unbind(&mut self, binding: BindingId) -> bool {
        self.bindings.unbind(binding)
    }

    pub fn bindings_of(&self, id: PlotId) -> ChartResult<Vec<BindingId>> {
        Ok(self.bindings.bindings_of(self.master_of(id)?))
    }

    /// Masters whose `axis` range follows the tree of `id`.
    pub fn bound_masters(&self, id: PlotId, axis: BindingAxis) -> ChartResult<Vec<PlotId>> {
        Ok(self.bindings.reachable(self.master_of(id)?, axis))
    }

    #[must_use]
    pub fn binding_graph(&self) -> &BindingGraph {
        &self.bindings
    }

    /// Pushes `rect` to every master bound to `source`.
    ///
    /// Each receiver gets one write with the bound ranges copied, x before y,
    /// and is marked so that its own frame does not echo the update back.
    /// A receiver with its own change pending keeps broadcasting the merged rect.
    pub(super) fn propagate_visible_rect(
        &mut self,
        source: PlotId,
        rect: Rect,
        is_animating: bool,
    ) -> ChartResult<()> {
        for target in self.bindings.propagation_targets(source) {
            let Some(state) = self
                .nodes
                .get_mut(&target.node)
                .and_then(|node| node.master_state.as_mut())
            else {
                trace!(target = target.node.raw(), "skipping binding target without master state");
                continue;
            };

            let mut next = state.visible_rect;
            if target.copy_x {
                next = next.with_x_range_of(rect);
            }
            if target.copy_y {
                next = next.with_y_range_of(rect);
            }
            if next == state.visible_rect && state.is_animating_frame == is_animating {
                continue;
            }

            let _ = state.navigation.stop();
            state.auto_fit = false;
            state.fit_request = FitRequest::default();
            state.apply_explicit_rect(next);
            state.navigation.jump(next);
            state.is_animating_frame = is_animating;
            if !state.own_change_pending {
                state.change_origin = RectChangeOrigin::Binding;
            }
            state.suppress_binding_echo = true;
            trace!(
                source = source.raw(),
                target = target.node.raw(),
                copy_x = target.copy_x,
                copy_y = target.copy_y,
                "propagated visible rect"
            );
            self.request_update_layout(target.node)?;
        }
        Ok(())
    }
}

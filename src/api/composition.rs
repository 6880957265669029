use indexmap::IndexMap;
use tracing::debug;

use crate::core::{CoordinateTransform, Rect, ScreenSize};
use crate::error::{ChartError, ChartResult};
use crate::interaction::{
    Clock, GestureSourceId, NavigationController, PointerGestureSource, SystemClock,
    VelocityAnimation,
};
use crate::render::{Plot, SurfaceId, SurfaceMode, SurfaceRegistry};

use super::binding::BindingGraph;
use super::events::{
    AppearanceChanged, ChildrenChanged, SubscriptionId, VisibleRectChanged,
};
use super::plot_node::{MasterState, PlotNode};
use super::{CompositionConfig, FrameHost, PlotId};

/// Arena of plot trees sharing one configuration, frame host and binding graph.
///
/// Every tree has exactly one master (its root). Viewport, scheduling and
/// subscription calls accept any node of a tree and act on its master.
pub struct Composition<H: FrameHost> {
    pub(super) host: H,
    pub(super) config: CompositionConfig,
    pub(super) clock: Box<dyn Clock>,
    pub(super) nodes: IndexMap<PlotId, PlotNode>,
    pub(super) bindings: BindingGraph,
    pub(super) surfaces: SurfaceRegistry,
    next_id: u32,
}

impl<H: FrameHost> Composition<H> {
    pub fn new(host: H, config: CompositionConfig) -> ChartResult<Self> {
        Self::with_clock(host, config, Box::new(SystemClock::default()))
    }

    /// Builds a composition whose animations read time from `clock`.
    pub fn with_clock(
        host: H,
        config: CompositionConfig,
        clock: Box<dyn Clock>,
    ) -> ChartResult<Self> {
        config.validate()?;
        Ok(Self {
            host,
            config,
            clock,
            nodes: IndexMap::new(),
            bindings: BindingGraph::new(),
            surfaces: SurfaceRegistry::default(),
            next_id: 0,
        })
    }

    #[must_use]
    pub fn config(&self) -> &CompositionConfig {
        &self.config
    }

    /// Mouse input source whose wheel notches use the configured zoom step.
    #[must_use]
    pub fn pointer_gesture_source(&self, id: GestureSourceId) -> PointerGestureSource {
        PointerGestureSource::new(id, self.config.zoom_level_factor)
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub fn into_host(self) -> H {
        self.host
    }

    /// Inserts `plot` as the master of a new single-node tree.
    pub fn create_plot(&mut self, plot: Box<dyn Plot>) -> PlotId {
        self.next_id += 1;
        let id = PlotId::new(self.next_id);
        let kind = plot.kind().to_owned();
        let state = self.new_master_state(self.config.default_screen_size, self.config.aspect_ratio);
        let mode = state.surface_mode;
        self.nodes.insert(id, PlotNode::new(id, plot, state));
        self.surfaces.rebuild(&[id], mode);
        debug!(plot = id.raw(), kind = %kind, "created plot");
        self.schedule_update_layout(id);
        id
    }

    /// Removes the whole tree rooted at `id`, detaching it from its parent first.
    pub fn dispose_plot(&mut self, id: PlotId) -> ChartResult<()> {
        if let Some(parent) = self.node(id)?.parent {
            self.remove_child(parent, id)?;
        }
        let subtree = self.subtree(id);
        self.surfaces.release(&subtree);
        let unbound = self.bindings.remove_node(id);
        for node in &subtree {
            self.nodes.shift_remove(node);
        }
        debug!(plot = id.raw(), nodes = subtree.len(), unbound, "disposed plot tree");
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, id: PlotId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn plot_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn plot_ids(&self) -> impl Iterator<Item = PlotId> + '_ {
        self.nodes.keys().copied()
    }

    /// Roots of every tree, in creation order.
    pub fn masters(&self) -> impl Iterator<Item = PlotId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.master_state.is_some())
            .map(|(&id, _)| id)
    }

    pub fn is_master(&self, id: PlotId) -> ChartResult<bool> {
        Ok(self.node(id)?.master_state.is_some())
    }

    pub fn master_of(&self, id: PlotId) -> ChartResult<PlotId> {
        Ok(self.node(id)?.master)
    }

    pub fn parent(&self, id: PlotId) -> ChartResult<Option<PlotId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: PlotId) -> ChartResult<&[PlotId]> {
        Ok(&self.node(id)?.children)
    }

    pub fn plot(&self, id: PlotId) -> ChartResult<&dyn Plot> {
        Ok(self.node(id)?.plot.as_ref())
    }

    pub fn plot_mut(&mut self, id: PlotId) -> ChartResult<&mut dyn Plot> {
        Ok(self.node_mut(id)?.plot.as_mut())
    }

    /// Nodes of the tree below `id` (inclusive) in depth-first pre-order.
    #[must_use]
    pub fn subtree(&self, id: PlotId) -> Vec<PlotId> {
        let mut ordered = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            ordered.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        ordered
    }

    /// Attaches the tree rooted at `child` under `parent`.
    ///
    /// `child` stops being a master: its bindings, subscriptions, gesture stream
    /// and viewport provider are dropped and its subtree delegates to
    /// `parent`'s master from now on.
    pub fn add_child(&mut self, parent: PlotId, child: PlotId) -> ChartResult<()> {
        let new_master = self.master_of(parent)?;
        let child_node = self.node(child)?;
        if let Some(existing) = child_node.parent {
            return Err(ChartError::ChildAlreadyAttached {
                child,
                parent: existing,
            });
        }
        if new_master == child {
            return Err(ChartError::WouldCreateCycle { parent, child });
        }

        let old_state = self
            .node_mut(child)?
            .master_state
            .take()
            .ok_or(ChartError::UnresolvedMaster(child))?;
        let unbound = self.bindings.remove_node(child);
        debug!(
            parent = parent.raw(),
            child = child.raw(),
            master = new_master.raw(),
            unbound,
            dropped_subscriptions = old_state.events.subscription_count(),
            "attaching child"
        );

        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        let moved = self.subtree(child);
        for id in &moved {
            self.node_mut(*id)?.master = new_master;
        }

        let mode = self.master_state(new_master)?.surface_mode;
        if mode == SurfaceMode::Shared || old_state.surface_mode == SurfaceMode::Shared {
            let tree = self.subtree(new_master);
            self.surfaces.rebuild(&tree, mode);
        }

        self.master_state_mut(new_master)?
            .events
            .emit_children_changed(&ChildrenChanged {
                master: new_master,
                parent,
                added: Some(child),
                removed: None,
            });
        self.request_update_layout(new_master)
    }

    /// Detaches `child` from `parent`; it becomes the master of its own tree.
    ///
    /// Returns `false` when `child` is not a direct child of `parent`.
    pub fn remove_child(&mut self, parent: PlotId, child: PlotId) -> ChartResult<bool> {
        if self.node(child)?.parent != Some(parent) {
            return Ok(false);
        }
        let old_master = self.master_of(parent)?;
        let (screen_size, aspect_ratio, old_mode) = {
            let state = self.master_state(old_master)?;
            (state.screen_size, state.aspect_ratio, state.surface_mode)
        };

        self.node_mut(parent)?.children.retain(|&id| id != child);
        let mut state = self.new_master_state(screen_size, aspect_ratio);
        state.surface_mode = old_mode;
        let node = self.node_mut(child)?;
        node.parent = None;
        node.master_state = Some(state);
        let moved = self.subtree(child);
        for id in &moved {
            self.node_mut(*id)?.master = child;
        }

        if old_mode == SurfaceMode::Shared {
            let remaining = self.subtree(old_master);
            self.surfaces.rebuild(&remaining, old_mode);
            self.surfaces.rebuild(&moved, old_mode);
        }
        debug!(
            parent = parent.raw(),
            child = child.raw(),
            former_master = old_master.raw(),
            "detached child"
        );

        self.master_state_mut(old_master)?
            .events
            .emit_children_changed(&ChildrenChanged {
                master: old_master,
                parent,
                added: None,
                removed: Some(child),
            });
        self.request_update_layout(old_master)?;
        self.request_update_layout(child)?;
        Ok(true)
    }

    pub fn screen_size(&self, id: PlotId) -> ChartResult<ScreenSize> {
        Ok(self.master_state(id)?.screen_size)
    }

    /// Resizes the tree's screen and requests a full relayout.
    pub fn set_screen_size(&mut self, id: PlotId, size: ScreenSize) -> ChartResult<()> {
        let size = size.validate()?;
        let master = self.master_of(id)?;
        let state = self.master_state_mut(master)?;
        if state.screen_size == size {
            return Ok(());
        }
        state.screen_size = size;
        let rect = state.explicit_rect;
        state.apply_explicit_rect(rect);
        self.request_update_layout(master)
    }

    pub fn visible_rect(&self, id: PlotId) -> ChartResult<Rect> {
        Ok(self.master_state(id)?.visible_rect)
    }

    pub fn transform(&self, id: PlotId) -> ChartResult<CoordinateTransform> {
        Ok(self.master_state(id)?.transform)
    }

    pub fn aspect_ratio(&self, id: PlotId) -> ChartResult<Option<f64>> {
        Ok(self.master_state(id)?.aspect_ratio)
    }

    pub fn set_aspect_ratio(&mut self, id: PlotId, aspect_ratio: Option<f64>) -> ChartResult<()> {
        if let Some(ratio) = aspect_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(ChartError::InvalidData(
                    "aspect ratio must be finite and > 0".to_owned(),
                ));
            }
        }
        let master = self.master_of(id)?;
        let state = self.master_state_mut(master)?;
        state.aspect_ratio = aspect_ratio;
        let rect = state.explicit_rect;
        state.apply_explicit_rect(rect);
        self.request_update_layout(master)
    }

    pub fn surface_mode(&self, id: PlotId) -> ChartResult<SurfaceMode> {
        Ok(self.master_state(id)?.surface_mode)
    }

    /// Switches how the tree maps onto drawing surfaces.
    ///
    /// Surfaces are torn down and recreated and the tree is redrawn in full.
    pub fn set_surface_mode(&mut self, id: PlotId, mode: SurfaceMode) -> ChartResult<()> {
        let master = self.master_of(id)?;
        let state = self.master_state_mut(master)?;
        if state.surface_mode == mode {
            return Ok(());
        }
        state.surface_mode = mode;
        let tree = self.subtree(master);
        self.surfaces.rebuild(&tree, mode);
        self.request_update_layout(master)
    }

    pub fn surface_of(&self, id: PlotId) -> ChartResult<Option<SurfaceId>> {
        self.node(id)?;
        Ok(self.surfaces.surface_of(id))
    }

    #[must_use]
    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    pub fn on_visible_rect_changed(
        &mut self,
        id: PlotId,
        handler: impl FnMut(&VisibleRectChanged) + 'static,
    ) -> ChartResult<SubscriptionId> {
        Ok(self
            .master_state_mut(id)?
            .events
            .on_visible_rect_changed(Box::new(handler)))
    }

    pub fn on_children_changed(
        &mut self,
        id: PlotId,
        handler: impl FnMut(&ChildrenChanged) + 'static,
    ) -> ChartResult<SubscriptionId> {
        Ok(self
            .master_state_mut(id)?
            .events
            .on_children_changed(Box::new(handler)))
    }

    pub fn on_appearance_changed(
        &mut self,
        id: PlotId,
        handler: impl FnMut(&AppearanceChanged) + 'static,
    ) -> ChartResult<SubscriptionId> {
        Ok(self
            .master_state_mut(id)?
            .events
            .on_appearance_changed(Box::new(handler)))
    }

    pub fn unsubscribe(&mut self, id: PlotId, subscription: SubscriptionId) -> ChartResult<bool> {
        Ok(self.master_state_mut(id)?.events.unsubscribe(subscription))
    }

    /// Tells the tree that a renderer's style changed; redraws that node.
    pub fn notify_appearance_changed(&mut self, id: PlotId) -> ChartResult<()> {
        let master = self.master_of(id)?;
        self.master_state_mut(master)?
            .events
            .emit_appearance_changed(&AppearanceChanged { master, plot: id });
        self.request_next_frame(id)
    }

    pub(super) fn node(&self, id: PlotId) -> ChartResult<&PlotNode> {
        self.nodes.get(&id).ok_or(ChartError::UnknownPlot(id))
    }

    pub(super) fn node_mut(&mut self, id: PlotId) -> ChartResult<&mut PlotNode> {
        self.nodes.get_mut(&id).ok_or(ChartError::UnknownPlot(id))
    }

    /// Master state of the tree containing `id`.
    pub(super) fn master_state(&self, id: PlotId) -> ChartResult<&MasterState> {
        let master = self.master_of(id)?;
        self.node(master)?
            .master_state
            .as_ref()
            .ok_or(ChartError::UnresolvedMaster(id))
    }

    pub(super) fn master_state_mut(&mut self, id: PlotId) -> ChartResult<&mut MasterState> {
        let master = self.master_of(id)?;
        self.node_mut(master)?
            .master_state
            .as_mut()
            .ok_or(ChartError::UnresolvedMaster(id))
    }

    fn new_master_state(&self, screen_size: ScreenSize, aspect_ratio: Option<f64>) -> MasterState {
        let animation = self.config.animation;
        let navigation = if animation.enabled {
            NavigationController::new(
                Some(Box::new(VelocityAnimation::new(animation))),
                self.config.min_viewport_extent,
            )
        } else {
            NavigationController::synchronous(self.config.min_viewport_extent)
        };
        MasterState::new(
            screen_size,
            aspect_ratio,
            self.config.surface_mode,
            navigation,
        )
    }
}

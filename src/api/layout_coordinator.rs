use tracing::{debug, trace, warn};

use crate::core::{CoordinateTransform, Padding, Rect, ScreenRect};
use crate::error::ChartResult;
use crate::render::RenderContext;

use super::events::RectChangeOrigin;
use super::plot_node::FitRequest;
use super::{Composition, FrameHost, PlotId};

/// Padded screen rects narrower than this fall back to the full screen.
const MIN_FIT_SCREEN_EXTENT: f64 = 1.0;

impl<H: FrameHost> Composition<H> {
    pub fn is_auto_fit_enabled(&self, id: PlotId) -> ChartResult<bool> {
        Ok(self.master_state(id)?.auto_fit)
    }

    /// Enables or disables fitting the viewport to content on every relayout.
    pub fn set_auto_fit(&mut self, id: PlotId, enabled: bool) -> ChartResult<()> {
        let master = self.master_of(id)?;
        let state = self.master_state_mut(master)?;
        if state.auto_fit == enabled {
            return Ok(());
        }
        state.auto_fit = enabled;
        self.request_update_layout(master)
    }

    /// Fits both axes to the content and keeps fitting until navigation
    /// disables auto fit again.
    pub fn fit_to_view(&mut self, id: PlotId) -> ChartResult<()> {
        let master = self.master_of(id)?;
        let state = self.master_state_mut(master)?;
        let _ = state.navigation.stop();
        state.auto_fit = true;
        self.request_update_layout(master)
    }

    /// One-shot fit of the x-range; the y-range stays where it is.
    pub fn fit_to_view_x(&mut self, id: PlotId) -> ChartResult<()> {
        self.request_fit(id, FitRequest { x: true, y: false })
    }

    /// One-shot fit of the y-range; the x-range stays where it is.
    pub fn fit_to_view_y(&mut self, id: PlotId) -> ChartResult<()> {
        self.request_fit(id, FitRequest { x: false, y: true })
    }

    /// Drops the cached content bounds of `id` after its data changed.
    pub fn invalidate_local_bounds(&mut self, id: PlotId) -> ChartResult<()> {
        let node = self.node_mut(id)?;
        node.cached_bounds = None;
        node.requests_render = true;
        self.request_update_layout(id)
    }

    /// Content bounds of `id` alone, computed on first use and cached.
    pub fn local_bounds(&mut self, id: PlotId) -> ChartResult<Option<Rect>> {
        let node = self.node_mut(id)?;
        if let Some(bounds) = node.cached_bounds {
            return Ok(bounds);
        }
        let bounds = node
            .plot
            .compute_local_bounds()
            .filter(|rect| rect.is_finite() && rect.width >= 0.0 && rect.height >= 0.0);
        node.cached_bounds = Some(bounds);
        Ok(bounds)
    }

    /// Union of every node's content in the tree of `id`.
    ///
    /// A zero-width or zero-height union is widened around its center; a tree
    /// without content follows its viewport provider, or the unit square.
    pub fn aggregate_bounds(&mut self, id: PlotId) -> ChartResult<Rect> {
        let master = self.master_of(id)?;
        let mut union: Option<Rect> = None;
        for node in self.subtree(master) {
            if let Some(bounds) = self.local_bounds(node)? {
                union = Some(union.map_or(bounds, |acc| acc.union(bounds)));
            }
        }

        let Some(mut bounds) = union else {
            let external = self.master_state(master)?.navigation.external_viewport();
            return Ok(external.unwrap_or(Rect::UNIT));
        };
        let extent = self.config.degenerate_bounds_extent;
        if bounds.width <= 0.0 {
            bounds.x -= extent / 2.0;
            bounds.width = extent;
        }
        if bounds.height <= 0.0 {
            bounds.y -= extent / 2.0;
            bounds.height = extent;
        }
        Ok(bounds)
    }

    /// Per-edge maximum of every node's padding plus the configured margin.
    pub fn aggregate_padding(&self, id: PlotId) -> ChartResult<Padding> {
        let master = self.master_of(id)?;
        let padding = self
            .subtree(master)
            .into_iter()
            .filter_map(|node| self.nodes.get(&node))
            .fold(Padding::ZERO, |acc, node| acc.max(node.plot.local_padding()));
        Ok(padding.grow(self.config.padding_margin))
    }

    /// Screen rect the tree of `id` was last arranged into.
    pub fn arranged_rect(&self, id: PlotId) -> ChartResult<ScreenRect> {
        Ok(self.node(id)?.arranged_rect)
    }

    fn request_fit(&mut self, id: PlotId, request: FitRequest) -> ChartResult<()> {
        let master = self.master_of(id)?;
        let state = self.master_state_mut(master)?;
        let _ = state.navigation.stop();
        state.fit_request.x |= request.x;
        state.fit_request.y |= request.y;
        self.request_update_layout(master)
    }

    /// Transform that fits the aggregate bounds into the padded screen.
    fn fitted_transform(&mut self, master: PlotId) -> ChartResult<CoordinateTransform> {
        let bounds = self.aggregate_bounds(master)?;
        let padding = self.aggregate_padding(master)?;
        let state = self.master_state(master)?;
        let full = ScreenRect::from_size(state.screen_size);
        let mut screen = full.inset(padding);
        if screen.width < MIN_FIT_SCREEN_EXTENT || screen.height < MIN_FIT_SCREEN_EXTENT {
            debug!(
                master = master.raw(),
                "padding leaves no room on screen, fitting without padding"
            );
            screen = full;
        }
        Ok(CoordinateTransform::new(bounds, screen, state.aspect_ratio))
    }

    pub(super) fn measure(&mut self, master: PlotId) -> ChartResult<()> {
        let (auto_fit, fit_request) = {
            let state = self.master_state(master)?;
            (state.auto_fit, state.fit_request)
        };

        if auto_fit || fit_request.any() {
            let fitted = self.fitted_transform(master)?;
            let state = self.master_state_mut(master)?;
            state.fit_request = FitRequest::default();
            if auto_fit || (fit_request.x && fit_request.y) {
                state.apply_transform(fitted);
            } else {
                let fitted_rect = fitted.plot_rect(ScreenRect::from_size(state.screen_size));
                let rect = if fit_request.x {
                    state.visible_rect.with_x_range_of(fitted_rect)
                } else {
                    state.visible_rect.with_y_range_of(fitted_rect)
                };
                state.apply_explicit_rect(rect);
            }
            state.change_origin = RectChangeOrigin::Layout;
            state.own_change_pending = true;
            state.is_animating_frame = false;
            let visible = state.visible_rect;
            state.navigation.jump(visible);
            debug!(
                master = master.raw(),
                auto_fit,
                fit_x = fit_request.x,
                fit_y = fit_request.y,
                ?visible,
                "fitted viewport to content"
            );
            return Ok(());
        }

        let state = self.master_state_mut(master)?;
        let rect = state
            .navigation
            .external_viewport()
            .unwrap_or(state.explicit_rect);
        state.apply_explicit_rect(rect);
        trace!(master = master.raw(), ?rect, "measured explicit viewport");
        Ok(())
    }

    pub(super) fn arrange(&mut self, master: PlotId) -> ChartResult<()> {
        let screen = ScreenRect::from_size(self.master_state(master)?.screen_size);
        for id in self.subtree(master) {
            self.node_mut(id)?.arranged_rect = screen;
        }
        Ok(())
    }

    /// Draws dirty nodes, or every node when `full`. Returns how many drew.
    pub(super) fn render_tree(&mut self, master: PlotId, full: bool) -> ChartResult<usize> {
        let (plot_rect, screen_size, transform) = {
            let state = self.master_state(master)?;
            (state.visible_rect, state.screen_size, state.transform)
        };
        let mut rendered = 0;
        for id in self.subtree(master) {
            let surface = match self.surfaces.surface_of(id) {
                Some(surface) => surface,
                None => {
                    let mode = self.master_state(master)?.surface_mode;
                    let tree = self.subtree(master);
                    self.surfaces.rebuild(&tree, mode);
                    match self.surfaces.surface_of(id) {
                        Some(surface) => surface,
                        None => continue,
                    }
                }
            };
            let node = self.node_mut(id)?;
            if !full && !node.requests_render {
                continue;
            }
            node.requests_render = false;
            let context = RenderContext {
                plot_rect,
                screen_size,
                transform,
                surface,
            };
            if let Err(err) = node.plot.render_core(&context) {
                warn!(
                    plot = id.raw(),
                    kind = %node.plot.kind(),
                    error = %err,
                    "plot failed to render, skipping it for this frame"
                );
                continue;
            }
            rendered += 1;
        }
        Ok(rendered)
    }
}

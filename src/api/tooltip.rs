use crate::core::Point;
use crate::error::ChartResult;
use crate::render::TooltipQuery;

use super::{Composition, FrameHost, PlotId};

/// Tooltip text reported by one plot of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotTooltip {
    pub plot: PlotId,
    pub text: String,
}

impl<H: FrameHost> Composition<H> {
    /// Collects the tooltips of every plot in the tree of `id` for a screen
    /// position, in depth-first order.
    ///
    /// Each plot receives the position both in shared plot coordinates and in
    /// its own data coordinates.
    pub fn tooltip_at(&self, id: PlotId, screen_x: f64, screen_y: f64) -> ChartResult<Vec<PlotTooltip>> {
        let master = self.master_of(id)?;
        let plot_point = self
            .master_state(master)?
            .transform
            .to_plot(Point::new(screen_x, screen_y));

        let mut tooltips = Vec::new();
        for node_id in self.subtree(master) {
            let plot = self.node(node_id)?.plot.as_ref();
            let query = TooltipQuery {
                data_x: plot.data_transform_x().plot_to_data(plot_point.x),
                data_y: plot.data_transform_y().plot_to_data(plot_point.y),
                plot_x: plot_point.x,
                plot_y: plot_point.y,
            };
            if let Some(text) = plot.tooltip(&query) {
                tooltips.push(PlotTooltip {
                    plot: node_id,
                    text,
                });
            }
        }
        Ok(tooltips)
    }
}

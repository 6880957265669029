use crate::core::{CoordinateTransform, DataTransform, Padding, Rect, ScreenSize};
use crate::error::ChartResult;

use super::SurfaceId;

/// Everything a plot needs to draw one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    /// Visible plot-space rect of the master.
    pub plot_rect: Rect,
    pub screen_size: ScreenSize,
    pub transform: CoordinateTransform,
    /// Surface the plot draws into; shared by the whole tree in shared mode.
    pub surface: SurfaceId,
}

/// Pointer location handed to [`Plot::tooltip`] in both coordinate systems.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TooltipQuery {
    pub data_x: f64,
    pub data_y: f64,
    pub plot_x: f64,
    pub plot_y: f64,
}

/// Contract implemented by concrete chart renderers (lines, markers, grids...).
///
/// The composition core decides when and at which transform a plot draws; the
/// plot only reports its content extent and turns a [`RenderContext`] into
/// pixels on its surface.
pub trait Plot {
    /// Short, stable name of the renderer kind, used in logs.
    fn kind(&self) -> &str;

    /// Plot-space extent of this node's own content, `None` when empty.
    fn compute_local_bounds(&self) -> Option<Rect>;

    /// Screen-space room this node needs around the fitted content.
    fn local_padding(&self) -> Padding {
        Padding::ZERO
    }

    fn render_core(&mut self, context: &RenderContext) -> ChartResult<()>;

    fn tooltip(&self, _query: &TooltipQuery) -> Option<String> {
        None
    }

    /// Mapping applied to the vertical axis of this plot's data.
    fn data_transform_y(&self) -> DataTransform {
        DataTransform::Identity
    }

    /// Mapping applied to the horizontal axis of this plot's data.
    fn data_transform_x(&self) -> DataTransform {
        DataTransform::Identity
    }
}

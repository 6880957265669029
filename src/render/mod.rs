mod null_plot;
mod plot;
mod surface;

pub use null_plot::{NullPlot, NullPlotHandle};
pub use plot::{Plot, RenderContext, TooltipQuery};
pub use surface::{SurfaceId, SurfaceMode, SurfaceRegistry};

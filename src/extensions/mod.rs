//! Concrete plot variants built on the [`Plot`](crate::render::Plot) contract.

mod composite;
mod heat_grid;
mod point_series;

pub use composite::CompositePlot;
pub use heat_grid::{
    HeatGrid, HeatGridHandle, HeatGridPlot, HeatGridShading, HeatGridShadingTask,
    shade_heat_grid,
};
pub use point_series::PointSeriesPlot;

use ordered_float::OrderedFloat;

use crate::core::{DataTransform, Point, Rect};
use crate::error::{ChartError, ChartResult};
use crate::render::{Plot, RenderContext, TooltipQuery};

/// Scatter/polyline data in data coordinates.
///
/// The y axis goes through `data_transform_y` before it reaches plot space,
/// so latitude series line up with Mercator map layers.
#[derive(Debug, Clone)]
pub struct PointSeriesPlot {
    name: String,
    points: Vec<Point>,
    y_transform: DataTransform,
    /// Plot-space distance within which a point answers a tooltip query.
    hit_radius: f64,
    projected: Vec<Point>,
}

impl PointSeriesPlot {
    pub fn new(name: impl Into<String>, points: Vec<Point>) -> ChartResult<Self> {
        if let Some(bad) = points
            .iter()
            .find(|point| !point.x.is_finite() || !point.y.is_finite())
        {
            return Err(ChartError::InvalidData(format!(
                "series points must be finite: {bad:?}"
            )));
        }
        Ok(Self {
            name: name.into(),
            points,
            y_transform: DataTransform::Identity,
            hit_radius: f64::INFINITY,
            projected: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_y_transform(mut self, transform: DataTransform) -> Self {
        self.y_transform = transform;
        self
    }

    #[must_use]
    pub fn with_hit_radius(mut self, radius: f64) -> Self {
        self.hit_radius = radius.abs();
        self
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Screen positions computed by the last render.
    #[must_use]
    pub fn projected(&self) -> &[Point] {
        &self.projected
    }

    fn to_plot(&self, point: Point) -> Point {
        Point::new(point.x, self.y_transform.data_to_plot(point.y))
    }
}

impl Plot for PointSeriesPlot {
    fn kind(&self) -> &str {
        "point-series"
    }

    fn compute_local_bounds(&self) -> Option<Rect> {
        let mut plot_points = self.points.iter().map(|point| self.to_plot(*point));
        let first = plot_points.next()?;
        let (min, max) = plot_points.fold((first, first), |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        });
        Some(Rect::from_corners(min.x, min.y, max.x, max.y))
    }

    fn render_core(&mut self, context: &RenderContext) -> ChartResult<()> {
        let projected: Vec<Point> = self
            .points
            .iter()
            .map(|point| context.transform.to_screen(self.to_plot(*point)))
            .collect();
        self.projected = projected;
        Ok(())
    }

    fn tooltip(&self, query: &TooltipQuery) -> Option<String> {
        let pointer = Point::new(query.plot_x, query.plot_y);
        let (distance, point) = self
            .points
            .iter()
            .map(|point| (OrderedFloat(self.to_plot(*point).distance_to(pointer)), *point))
            .min_by_key(|(distance, _)| *distance)?;
        (distance.0 <= self.hit_radius)
            .then(|| format!("{}: ({}, {})", self.name, point.x, point.y))
    }

    fn data_transform_y(&self) -> DataTransform {
        self.y_transform
    }
}

use serde::{Deserialize, Serialize};

use super::types::{Point, Rect, ScreenRect, ScreenSize};

/// Smallest plot extent used as a scale denominator.
const MIN_PLOT_EXTENT: f64 = 1e-12;

/// Affine mapping between plot space (y up) and screen space (y down).
///
/// This is the only place where the vertical flip between the two spaces is
/// resolved: `to_screen_y` subtracts from `offset_y` instead of adding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransform {
    scale_x: f64,
    scale_y: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self::new(Rect::UNIT, ScreenRect::new(0.0, 0.0, 1.0, 1.0), None)
    }
}

impl CoordinateTransform {
    /// Builds the transform that maps `plot_rect` onto `screen_rect`.
    ///
    /// With a positive `aspect_ratio` the looser axis is tightened so that
    /// `scale_x == aspect_ratio * scale_y`.
    #[must_use]
    pub fn new(plot_rect: Rect, screen_rect: ScreenRect, aspect_ratio: Option<f64>) -> Self {
        let mut scale_x = screen_rect.width / plot_rect.width.max(MIN_PLOT_EXTENT);
        let mut scale_y = screen_rect.height / plot_rect.height.max(MIN_PLOT_EXTENT);

        if let Some(ratio) = aspect_ratio.filter(|ratio| ratio.is_finite() && *ratio > 0.0) {
            scale_x = scale_x.min(ratio * scale_y);
            scale_y = scale_x / ratio;
        }

        Self {
            scale_x,
            scale_y,
            offset_x: screen_rect.left - scale_x * plot_rect.x,
            offset_y: screen_rect.top + screen_rect.height + scale_y * plot_rect.y,
        }
    }

    /// Transform that maps `plot_rect` onto the whole surface of `screen_size`.
    #[must_use]
    pub fn for_screen(plot_rect: Rect, screen_size: ScreenSize, aspect_ratio: Option<f64>) -> Self {
        Self::new(plot_rect, ScreenRect::from_size(screen_size), aspect_ratio)
    }

    #[must_use]
    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    #[must_use]
    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    #[must_use]
    pub fn offset_x(&self) -> f64 {
        self.offset_x
    }

    #[must_use]
    pub fn offset_y(&self) -> f64 {
        self.offset_y
    }

    #[must_use]
    pub fn to_screen_x(&self, x: f64) -> f64 {
        x * self.scale_x + self.offset_x
    }

    #[must_use]
    pub fn to_screen_y(&self, y: f64) -> f64 {
        self.offset_y - y * self.scale_y
    }

    #[must_use]
    pub fn to_plot_x(&self, screen_x: f64) -> f64 {
        (screen_x - self.offset_x) / self.scale_x
    }

    #[must_use]
    pub fn to_plot_y(&self, screen_y: f64) -> f64 {
        (self.offset_y - screen_y) / self.scale_y
    }

    #[must_use]
    pub fn to_screen(&self, point: Point) -> Point {
        Point::new(self.to_screen_x(point.x), self.to_screen_y(point.y))
    }

    #[must_use]
    pub fn to_plot(&self, screen: Point) -> Point {
        Point::new(self.to_plot_x(screen.x), self.to_plot_y(screen.y))
    }

    #[must_use]
    pub fn width_to_screen(&self, width: f64) -> f64 {
        width * self.scale_x
    }

    #[must_use]
    pub fn height_to_screen(&self, height: f64) -> f64 {
        height * self.scale_y
    }

    #[must_use]
    pub fn width_to_plot(&self, width: f64) -> f64 {
        width / self.scale_x
    }

    #[must_use]
    pub fn height_to_plot(&self, height: f64) -> f64 {
        height / self.scale_y
    }

    /// Projects a plot rect into screen space.
    #[must_use]
    pub fn screen_rect(&self, plot_rect: Rect) -> ScreenRect {
        let left = self.to_screen_x(plot_rect.x);
        let top = self.to_screen_y(plot_rect.top());
        ScreenRect::new(
            left,
            top,
            self.width_to_screen(plot_rect.width),
            self.height_to_screen(plot_rect.height),
        )
    }

    /// Inverse-projects all four corners of `screen_rect` into plot space.
    #[must_use]
    pub fn plot_rect(&self, screen_rect: ScreenRect) -> Rect {
        let x1 = self.to_plot_x(screen_rect.left);
        let x2 = self.to_plot_x(screen_rect.right());
        let y1 = self.to_plot_y(screen_rect.top);
        let y2 = self.to_plot_y(screen_rect.bottom());
        Rect::from_corners(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
    }
}

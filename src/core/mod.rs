pub mod data_transform;
pub mod transform;
pub mod types;

pub use data_transform::{DataTransform, MERCATOR_MAX_LATITUDE};
pub use transform::CoordinateTransform;
pub use types::{Padding, Point, Rect, ScreenRect, ScreenSize};

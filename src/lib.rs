//! chart-compose: navigation and rendering core for composable 2D charts.
//!
//! Plots form trees whose root (the master) owns the shared viewport,
//! screen size and frame scheduling. Gestures turn into viewport targets,
//! animations interpolate towards them, bindings keep the ranges of separate
//! trees in sync and heavy per-frame work runs on a background worker.

pub mod api;
pub mod background;
pub mod core;
pub mod error;
pub mod extensions;
pub mod interaction;
pub mod render;
pub mod telemetry;

pub use api::{Composition, CompositionConfig, PlotId};
pub use error::{ChartError, ChartResult};

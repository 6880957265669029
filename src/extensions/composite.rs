use crate::core::{Padding, Rect};
use crate::error::ChartResult;
use crate::render::{Plot, RenderContext};

/// Content-less grouping node; its children carry the data.
///
/// A composite may reserve screen room (for axes drawn by the host, say)
/// through its padding.
#[derive(Debug, Clone, Default)]
pub struct CompositePlot {
    name: String,
    padding: Padding,
}

impl CompositePlot {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            padding: Padding::ZERO,
        }
    }

    #[must_use]
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Plot for CompositePlot {
    fn kind(&self) -> &str {
        "composite"
    }

    fn compute_local_bounds(&self) -> Option<Rect> {
        None
    }

    fn local_padding(&self) -> Padding {
        self.padding
    }

    fn render_core(&mut self, _context: &RenderContext) -> ChartResult<()> {
        Ok(())
    }
}

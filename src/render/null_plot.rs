use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::{Padding, Rect};
use crate::error::ChartResult;

use super::{Plot, RenderContext};

/// Content-less plot used by tests and headless compositions.
///
/// It records what it was asked to draw so the frame pipeline can be checked
/// without a real backend. The paired [`NullPlotHandle`] observes and edits the
/// plot after it has been moved into a composition.
#[derive(Debug, Default)]
pub struct NullPlot {
    bounds: Rc<Cell<Option<Rect>>>,
    padding: Padding,
    renders: Rc<RefCell<Vec<RenderContext>>>,
}

/// Host-side view of a [`NullPlot`] living inside a composition.
#[derive(Debug, Clone, Default)]
pub struct NullPlotHandle {
    bounds: Rc<Cell<Option<Rect>>>,
    renders: Rc<RefCell<Vec<RenderContext>>>,
}

impl NullPlot {
    #[must_use]
    pub fn new(bounds: Option<Rect>) -> (Self, NullPlotHandle) {
        let plot = Self {
            bounds: Rc::new(Cell::new(bounds)),
            ..Self::default()
        };
        let handle = plot.handle();
        (plot, handle)
    }

    #[must_use]
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    #[must_use]
    pub fn handle(&self) -> NullPlotHandle {
        NullPlotHandle {
            bounds: Rc::clone(&self.bounds),
            renders: Rc::clone(&self.renders),
        }
    }
}

impl NullPlotHandle {
    /// Replaces the content bounds; the composition sees it after
    /// `invalidate_local_bounds`.
    pub fn set_bounds(&self, bounds: Option<Rect>) {
        self.bounds.set(bounds);
    }

    #[must_use]
    pub fn render_count(&self) -> usize {
        self.renders.borrow().len()
    }

    #[must_use]
    pub fn last_context(&self) -> Option<RenderContext> {
        self.renders.borrow().last().copied()
    }
}

impl Plot for NullPlot {
    fn kind(&self) -> &str {
        "null"
    }

    fn compute_local_bounds(&self) -> Option<Rect> {
        self.bounds.get()
    }

    fn local_padding(&self) -> Padding {
        self.padding
    }

    fn render_core(&mut self, context: &RenderContext) -> ChartResult<()> {
        self.renders.borrow_mut().push(*context);
        Ok(())
    }
}

use std::cell::RefCell;
use std::rc::Rc;

#[cfg(feature = "parallel-shading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::background::{
    AbandonedTask, BackgroundTaskQueue, EnqueueOutcome, TaskResult, TaskSourceId, Worker,
};
use crate::core::{Rect, ScreenRect};
use crate::error::{ChartError, ChartResult};
use crate::render::{Plot, RenderContext, TooltipQuery};

/// Regular grid of values anchored at its bottom-left corner in plot space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatGrid {
    pub x: f64,
    pub y: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub columns: usize,
    pub rows: usize,
    /// Row-major values, bottom row first; `NaN` marks a missing cell.
    pub values: Vec<f64>,
}

impl HeatGrid {
    pub fn validate(&self) -> ChartResult<()> {
        if !self.x.is_finite()
            || !self.y.is_finite()
            || !self.cell_width.is_finite()
            || !self.cell_height.is_finite()
            || self.cell_width <= 0.0
            || self.cell_height <= 0.0
        {
            return Err(ChartError::InvalidData(
                "heat grid origin and cell size must be finite, cells positive".to_owned(),
            ));
        }
        if self.values.len() != self.columns * self.rows {
            return Err(ChartError::InvalidData(format!(
                "heat grid expects {} values, got {}",
                self.columns * self.rows,
                self.values.len()
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn extent(&self) -> Option<Rect> {
        (self.columns > 0 && self.rows > 0).then(|| {
            Rect::new(
                self.x,
                self.y,
                self.cell_width * self.columns as f64,
                self.cell_height * self.rows as f64,
            )
        })
    }

    /// Value of the cell containing the plot point, if any.
    #[must_use]
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        let column = ((x - self.x) / self.cell_width).floor();
        let row = ((y - self.y) / self.cell_height).floor();
        if column < 0.0 || row < 0.0 {
            return None;
        }
        let (column, row) = (column as usize, row as usize);
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.values
            .get(row * self.columns + column)
            .copied()
            .filter(|value| !value.is_nan())
    }
}

/// Background payload: normalize `values` into `[0, 1]` intensities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatGridShadingTask {
    /// Data version the result belongs to; older results are ignored.
    pub generation: u64,
    pub values: Vec<f64>,
    /// Fixed palette range; the finite data range when `None`.
    pub range: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatGridShading {
    pub generation: u64,
    /// One entry per cell; `None` for missing values.
    pub intensities: Vec<Option<f32>>,
    pub min: f64,
    pub max: f64,
}

/// Pure shading function run on the worker thread or synchronously.
#[must_use]
pub fn shade_heat_grid(task: HeatGridShadingTask) -> HeatGridShading {
    let (min, max) = task.range.unwrap_or_else(|| finite_range(&task.values));
    let span = max - min;
    let shade = |value: &f64| -> Option<f32> {
        if !value.is_finite() {
            return None;
        }
        if span <= 0.0 || !span.is_finite() {
            return Some(0.5);
        }
        Some(((value - min) / span).clamp(0.0, 1.0) as f32)
    };

    #[cfg(feature = "parallel-shading")]
    let intensities: Vec<Option<f32>> = task.values.par_iter().map(shade).collect();

    #[cfg(not(feature = "parallel-shading"))]
    let intensities: Vec<Option<f32>> = task.values.iter().map(shade).collect();

    HeatGridShading {
        generation: task.generation,
        intensities,
        min,
        max,
    }
}

fn finite_range(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, value| match acc {
            Some((min, max)) => Some((min.min(value), max.max(value))),
            None => Some((value, value)),
        })
        .unwrap_or((0.0, 0.0))
}

#[derive(Debug)]
struct HeatGridState {
    grid: HeatGrid,
    range: Option<(f64, f64)>,
    generation: u64,
    shading: Option<HeatGridShading>,
    source: Option<TaskSourceId>,
    last_screen_rect: Option<ScreenRect>,
    render_count: usize,
}

impl HeatGridState {
    fn task(&self) -> HeatGridShadingTask {
        HeatGridShadingTask {
            generation: self.generation,
            values: self.grid.values.clone(),
            range: self.range,
        }
    }
}

/// Heat map whose shading is computed off the frame loop when a background
/// worker is available and synchronously otherwise.
#[derive(Debug)]
pub struct HeatGridPlot {
    state: Rc<RefCell<HeatGridState>>,
}

/// Host-side control of a [`HeatGridPlot`] living inside a composition.
#[derive(Debug, Clone)]
pub struct HeatGridHandle {
    state: Rc<RefCell<HeatGridState>>,
}

impl HeatGridPlot {
    pub fn new(grid: HeatGrid) -> ChartResult<(Self, HeatGridHandle)> {
        grid.validate()?;
        let state = Rc::new(RefCell::new(HeatGridState {
            grid,
            range: None,
            generation: 0,
            shading: None,
            source: None,
            last_screen_rect: None,
            render_count: 0,
        }));
        let handle = HeatGridHandle {
            state: Rc::clone(&state),
        };
        Ok((Self { state }, handle))
    }
}

impl HeatGridHandle {
    /// Replaces the grid values; the current shading stays until a new one lands.
    pub fn set_values(&self, values: Vec<f64>) -> ChartResult<()> {
        let mut state = self.state.borrow_mut();
        let expected = state.grid.columns * state.grid.rows;
        if values.len() != expected {
            return Err(ChartError::InvalidData(format!(
                "heat grid expects {expected} values, got {}",
                values.len()
            )));
        }
        state.grid.values = values;
        state.generation += 1;
        Ok(())
    }

    pub fn set_range(&self, range: Option<(f64, f64)>) {
        let mut state = self.state.borrow_mut();
        state.range = range;
        state.generation += 1;
    }

    /// Schedules shading of the current values.
    ///
    /// Without a worker the shading is computed right away and the returned
    /// outcome is [`EnqueueOutcome::Unavailable`].
    pub fn request_shading<W>(&self, queue: &mut BackgroundTaskQueue<W>) -> ChartResult<EnqueueOutcome>
    where
        W: Worker<Payload = HeatGridShadingTask, Output = HeatGridShading>,
    {
        let mut state = self.state.borrow_mut();
        let source = *state.source.get_or_insert_with(|| queue.register_source());
        let outcome = queue.enqueue(source, state.task())?;
        if outcome == EnqueueOutcome::Unavailable {
            let shading = shade_heat_grid(state.task());
            debug!(cells = shading.intensities.len(), "shaded heat grid synchronously");
            state.shading = Some(shading);
        }
        Ok(outcome)
    }

    /// Stores a finished shading if it belongs to this grid and its current
    /// values. Returns whether it was applied.
    pub fn apply(&self, result: &TaskResult<HeatGridShading>) -> bool {
        let mut state = self.state.borrow_mut();
        if state.source != Some(result.source) {
            return false;
        }
        if result.output.generation != state.generation {
            trace!(
                stale = result.output.generation,
                current = state.generation,
                "ignoring stale heat grid shading"
            );
            return false;
        }
        state.shading = Some(result.output.clone());
        true
    }

    /// Shades the current values synchronously when `abandoned` holds a task
    /// of this grid. Returns whether it did.
    pub fn recover_abandoned(&self, abandoned: &[AbandonedTask<HeatGridShadingTask>]) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(source) = state.source else {
            return false;
        };
        if !abandoned.iter().any(|task| task.source == source) {
            return false;
        }
        let shading = shade_heat_grid(state.task());
        debug!(source = source.index(), "shaded abandoned heat grid task synchronously");
        state.shading = Some(shading);
        true
    }

    #[must_use]
    pub fn task_source(&self) -> Option<TaskSourceId> {
        self.state.borrow().source
    }

    #[must_use]
    pub fn shading(&self) -> Option<HeatGridShading> {
        self.state.borrow().shading.clone()
    }

    #[must_use]
    pub fn render_count(&self) -> usize {
        self.state.borrow().render_count
    }

    #[must_use]
    pub fn last_screen_rect(&self) -> Option<ScreenRect> {
        self.state.borrow().last_screen_rect
    }
}

impl Plot for HeatGridPlot {
    fn kind(&self) -> &str {
        "heat-grid"
    }

    fn compute_local_bounds(&self) -> Option<Rect> {
        self.state.borrow().grid.extent()
    }

    fn render_core(&mut self, context: &RenderContext) -> ChartResult<()> {
        let mut state = self.state.borrow_mut();
        state.last_screen_rect = state
            .grid
            .extent()
            .map(|extent| context.transform.screen_rect(extent));
        state.render_count += 1;
        Ok(())
    }

    fn tooltip(&self, query: &TooltipQuery) -> Option<String> {
        self.state
            .borrow()
            .grid
            .value_at(query.data_x, query.data_y)
            .map(|value| format!("value: {value}"))
    }
}

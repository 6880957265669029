use thiserror::Error;

use crate::api::PlotId;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid screen size: width={width}, height={height}")]
    InvalidScreenSize { width: f64, height: f64 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unknown plot {0:?}")]
    UnknownPlot(PlotId),

    #[error("plot {0:?} cannot be bound to itself")]
    SelfBinding(PlotId),

    #[error("plot {0:?} has no resolvable master")]
    UnresolvedMaster(PlotId),

    #[error("plot {child:?} is already attached under {parent:?}")]
    ChildAlreadyAttached { child: PlotId, parent: PlotId },

    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle { parent: PlotId, child: PlotId },

    #[error("composition rooted at {0:?} already has an external viewport provider")]
    ViewportProviderAlreadyRegistered(PlotId),

    #[error("background worker is unavailable")]
    WorkerUnavailable,
}

//! Composition of plot trees: masters, frame scheduling, layout, navigation
//! and viewport bindings.

mod binding;
mod binding_coordinator;
mod composition;
mod engine_config;
mod events;
mod layout_coordinator;
mod navigation_coordinator;
mod plot_node;
mod scheduler;
mod tooltip;

pub use binding::{BindingAxis, BindingGraph, BindingId, PropagationTarget};
pub use composition::Composition;
pub use engine_config::CompositionConfig;
pub use events::{
    AppearanceChanged, ChildrenChanged, RectChangeOrigin, SubscriptionId, VisibleRectChanged,
};
pub use navigation_coordinator::VisibleRectOptions;
pub use plot_node::PlotId;
pub use scheduler::{FrameHost, FrameReport, NullFrameHost, RecordingFrameHost};
pub use tooltip::PlotTooltip;

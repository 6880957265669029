//! Input normalization, viewport animation and navigation.

mod animation;
mod clock;
mod gesture;
mod navigation;

pub use animation::{
    AnimationConfig, AnimationFrame, AnimationState, AnimationStrategy, ProviderSyncedAnimation,
    VelocityAnimation, ViewportProvider,
};
pub use clock::{Clock, SystemClock, VirtualClock};
pub use gesture::{
    AxisRestriction, Gesture, GestureBatch, GestureSourceId, GestureStream, PointerGestureSource,
    TimedGesture, TouchGestureSource, TouchPoint, wheel_scale_factor,
};
pub use navigation::{
    NavigationContext, NavigationController, NavigationOutcome, ZoomRequest, pan_target,
    zoom_target,
};

//! Viewport animation strategies.
//!
//! A strategy is an explicit `Idle -> Animating -> Idle` state machine. It is
//! advanced only by [`AnimationStrategy::tick`] with a caller-supplied
//! timestamp, so a real timer and a virtual test clock drive it the same way.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{Point, Rect};

const MOTION_EPSILON: f64 = 1e-12;

/// One step of an animation, applied by the navigation pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationFrame {
    pub rect: Rect,
    /// Set on the single, non-animated frame emitted when the strategy goes idle.
    pub is_last: bool,
}

impl AnimationFrame {
    #[must_use]
    pub const fn moving(rect: Rect) -> Self {
        Self {
            rect,
            is_last: false,
        }
    }

    #[must_use]
    pub const fn last(rect: Rect) -> Self {
        Self {
            rect,
            is_last: true,
        }
    }
}

pub trait AnimationStrategy {
    fn name(&self) -> &str;

    fn is_animating(&self) -> bool;

    /// Starts, or retargets, an animation from `current` towards `target`.
    ///
    /// Returns a last frame when there is nothing to animate.
    fn animate(&mut self, current: Rect, target: Rect, now_ms: f64) -> Option<AnimationFrame>;

    /// Advances the animation to `now_ms`; `None` while idle.
    fn tick(&mut self, now_ms: f64) -> Option<AnimationFrame>;

    /// Cancels any pending tick and returns the last frame at the true current rect.
    ///
    /// Synchronous and idempotent: stopping an idle strategy returns `None`.
    fn stop(&mut self) -> Option<AnimationFrame>;

    /// Moves the viewport without animation.
    fn jump(&mut self, _rect: Rect) {}

    /// Rect owned by an external viewport provider, if this strategy follows one.
    fn external_viewport(&self) -> Option<Rect> {
        None
    }
}

/// Speed presets for [`VelocityAnimation`], in fractions of the remaining path per millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Velocity used when only the position changes.
    pub pan_velocity: f64,
    /// Velocity used when the size changes as well.
    pub zoom_velocity: f64,
    /// Gestures and animated `set_visible_rect` calls animate only when enabled.
    pub enabled: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            pan_velocity: 0.008,
            zoom_velocity: 0.006,
            enabled: true,
        }
    }
}

/// Snapshot of an in-flight velocity animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    pub start_rect: Rect,
    pub target_rect: Rect,
    pub current_rect: Rect,
    /// Unit vector from the start origin to the target origin.
    pub direction: Point,
    /// Distance between the start and target origins (bottom-left corners).
    pub path_length: f64,
    pub velocity: f64,
    /// Distance covered so far, in the same units as `path_length`.
    pub traveled: f64,
    /// Width change applied so far (absolute).
    pub width_delta: f64,
    /// Height change applied so far (absolute).
    pub height_delta: f64,
    last_tick_ms: f64,
}

impl AnimationState {
    fn requested_width_delta(&self) -> f64 {
        (self.target_rect.width - self.start_rect.width).abs()
    }

    fn requested_height_delta(&self) -> f64 {
        (self.target_rect.height - self.start_rect.height).abs()
    }

    /// Length of the progress axis: the origin path, or the largest size change
    /// when the origin stays put.
    fn reference_length(&self) -> f64 {
        if self.path_length > MOTION_EPSILON {
            self.path_length
        } else {
            self.requested_width_delta()
                .max(self.requested_height_delta())
        }
    }

    fn progress(&self) -> f64 {
        if self.path_length > MOTION_EPSILON {
            self.traveled
        } else {
            let reference = self.reference_length();
            let width = self.requested_width_delta();
            let height = self.requested_height_delta();
            if width >= height && width > 0.0 {
                self.width_delta
            } else if height > 0.0 {
                self.height_delta
            } else {
                reference
            }
        }
    }

    fn reached_target(&self) -> bool {
        let path_done = self.path_length > MOTION_EPSILON && self.traveled >= self.path_length;
        let width = self.requested_width_delta();
        let height = self.requested_height_delta();
        let width_done = width > MOTION_EPSILON && self.width_delta >= width;
        let height_done = height > MOTION_EPSILON && self.height_delta >= height;
        path_done || width_done || height_done
    }

    /// Origin moved `fraction` of the way along the path, size lerped by the same amount.
    fn interpolated(&self, fraction: f64) -> Rect {
        let distance = self.path_length * fraction;
        let width =
            self.start_rect.width + (self.target_rect.width - self.start_rect.width) * fraction;
        let height =
            self.start_rect.height + (self.target_rect.height - self.start_rect.height) * fraction;
        Rect::new(
            self.start_rect.x + self.direction.x * distance,
            self.start_rect.y + self.direction.y * distance,
            width,
            height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Animating(AnimationState),
}

/// Default strategy: moves the viewport at a velocity proportional to the
/// remaining distance, with a floor tied to the target width.
///
/// The adaptive step keeps the perceived speed roughly constant whether the
/// viewport spans millimetres or light years.
#[derive(Debug, Clone)]
pub struct VelocityAnimation {
    config: AnimationConfig,
    phase: Phase,
}

impl VelocityAnimation {
    #[must_use]
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> Option<&AnimationState> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Animating(state) => Some(state),
        }
    }
}

impl Default for VelocityAnimation {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}

impl AnimationStrategy for VelocityAnimation {
    fn name(&self) -> &str {
        "velocity"
    }

    fn is_animating(&self) -> bool {
        matches!(self.phase, Phase::Animating(_))
    }

    fn animate(&mut self, current: Rect, target: Rect, now_ms: f64) -> Option<AnimationFrame> {
        let start_rect = match &self.phase {
            Phase::Animating(state) => state.current_rect,
            Phase::Idle => current,
        };

        let start_origin = Point::new(start_rect.x, start_rect.y);
        let target_origin = Point::new(target.x, target.y);
        let path_length = start_origin.distance_to(target_origin);
        let size_changes = (target.width - start_rect.width).abs() > MOTION_EPSILON
            || (target.height - start_rect.height).abs() > MOTION_EPSILON;

        if path_length <= MOTION_EPSILON && !size_changes {
            self.phase = Phase::Idle;
            return Some(AnimationFrame::last(target));
        }

        let direction = if path_length > MOTION_EPSILON {
            Point::new(
                (target_origin.x - start_origin.x) / path_length,
                (target_origin.y - start_origin.y) / path_length,
            )
        } else {
            Point::new(0.0, 0.0)
        };
        let velocity = if size_changes {
            self.config.zoom_velocity
        } else {
            self.config.pan_velocity
        };

        trace!(?start_rect, ?target, path_length, velocity, "animation started");
        self.phase = Phase::Animating(AnimationState {
            start_rect,
            target_rect: target,
            current_rect: start_rect,
            direction,
            path_length,
            velocity,
            traveled: 0.0,
            width_delta: 0.0,
            height_delta: 0.0,
            last_tick_ms: now_ms,
        });
        None
    }

    fn tick(&mut self, now_ms: f64) -> Option<AnimationFrame> {
        let Phase::Animating(state) = &mut self.phase else {
            return None;
        };

        let elapsed = (now_ms - state.last_tick_ms).max(0.0);
        state.last_tick_ms = now_ms;
        if elapsed <= 0.0 {
            return Some(AnimationFrame::moving(state.current_rect));
        }

        let reference = state.reference_length();
        let remaining = (reference - state.progress()).max(0.0);
        let step = elapsed * state.velocity * (state.target_rect.width / 1000.0).max(remaining);
        let progress = state.progress() + step;

        if state.path_length > MOTION_EPSILON {
            state.traveled = progress;
        }
        state.width_delta = state.requested_width_delta() * progress / reference;
        state.height_delta = state.requested_height_delta() * progress / reference;

        if state.reached_target() {
            let target = state.target_rect;
            trace!(?target, "animation reached target");
            self.phase = Phase::Idle;
            return Some(AnimationFrame::last(target));
        }

        state.current_rect = state.interpolated(progress / reference);
        Some(AnimationFrame::moving(state.current_rect))
    }

    fn stop(&mut self) -> Option<AnimationFrame> {
        let Phase::Animating(state) = self.phase else {
            return None;
        };
        self.phase = Phase::Idle;
        trace!(rect = ?state.current_rect, "animation stopped");
        Some(AnimationFrame::last(state.current_rect))
    }
}

/// Viewport owned by an external component, such as a tiled map, that runs
/// its own transitions.
pub trait ViewportProvider {
    fn current_rect(&self) -> Rect;

    /// Starts moving towards `target`; `animate == false` jumps immediately.
    fn begin_move(&mut self, target: Rect, animate: bool);

    fn is_moving(&self) -> bool;

    /// Stops at the current position.
    fn halt(&mut self);
}

/// Strategy that delegates motion to a [`ViewportProvider`] and mirrors its
/// viewport on every tick until the provider settles.
pub struct ProviderSyncedAnimation {
    provider: Box<dyn ViewportProvider>,
    animating: bool,
}

impl std::fmt::Debug for ProviderSyncedAnimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSyncedAnimation")
            .field("animating", &self.animating)
            .field("provider_rect", &self.provider.current_rect())
            .finish()
    }
}

impl ProviderSyncedAnimation {
    #[must_use]
    pub fn new(provider: Box<dyn ViewportProvider>) -> Self {
        Self {
            provider,
            animating: false,
        }
    }
}

impl AnimationStrategy for ProviderSyncedAnimation {
    fn name(&self) -> &str {
        "provider-synced"
    }

    fn is_animating(&self) -> bool {
        self.animating
    }

    fn animate(&mut self, _current: Rect, target: Rect, _now_ms: f64) -> Option<AnimationFrame> {
        self.provider.begin_move(target, true);
        self.animating = true;
        None
    }

    fn tick(&mut self, _now_ms: f64) -> Option<AnimationFrame> {
        if !self.animating {
            return None;
        }
        let rect = self.provider.current_rect();
        if self.provider.is_moving() {
            return Some(AnimationFrame::moving(rect));
        }
        self.animating = false;
        Some(AnimationFrame::last(rect))
    }

    fn stop(&mut self) -> Option<AnimationFrame> {
        if !self.animating {
            return None;
        }
        self.provider.halt();
        self.animating = false;
        Some(AnimationFrame::last(self.provider.current_rect()))
    }

    fn jump(&mut self, rect: Rect) {
        self.provider.begin_move(rect, false);
    }

    fn external_viewport(&self) -> Option<Rect> {
        Some(self.provider.current_rect())
    }
}

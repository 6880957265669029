use tracing::trace;

use crate::core::{CoordinateTransform, Point, Rect, ScreenSize};

use super::{AnimationFrame, AnimationStrategy, Gesture};

/// Live viewport state the controller navigates from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationContext {
    pub visible_rect: Rect,
    pub screen_size: ScreenSize,
    pub transform: CoordinateTransform,
    pub now_ms: f64,
}

/// What the owner of the viewport has to do after a navigation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavigationOutcome {
    /// Nothing changed.
    Unchanged,
    /// Apply this rect now.
    Apply(AnimationFrame),
    /// An animation is running; frames arrive through [`NavigationController::tick`].
    Animating,
}

/// Turns gestures and explicit viewport requests into target rects and hands
/// them to the active animation strategy, or applies them synchronously when
/// there is none.
pub struct NavigationController {
    strategy: Option<Box<dyn AnimationStrategy>>,
    min_extent: f64,
}

impl std::fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationController")
            .field(
                "strategy",
                &self.strategy.as_ref().map(|strategy| strategy.name().to_owned()),
            )
            .field("min_extent", &self.min_extent)
            .finish()
    }
}

impl NavigationController {
    #[must_use]
    pub fn new(strategy: Option<Box<dyn AnimationStrategy>>, min_extent: f64) -> Self {
        Self {
            strategy,
            min_extent,
        }
    }

    /// Controller that applies every target immediately.
    #[must_use]
    pub fn synchronous(min_extent: f64) -> Self {
        Self::new(None, min_extent)
    }

    #[must_use]
    pub fn strategy_name(&self) -> Option<&str> {
        self.strategy.as_deref().map(AnimationStrategy::name)
    }

    /// Replaces the strategy, stopping the previous one first.
    ///
    /// Returns the previous strategy's last frame, if it was animating.
    pub fn set_strategy(
        &mut self,
        strategy: Option<Box<dyn AnimationStrategy>>,
    ) -> Option<AnimationFrame> {
        let last = self.stop();
        self.strategy = strategy;
        last
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.strategy
            .as_deref()
            .is_some_and(AnimationStrategy::is_animating)
    }

    #[must_use]
    pub fn external_viewport(&self) -> Option<Rect> {
        self.strategy
            .as_deref()
            .and_then(AnimationStrategy::external_viewport)
    }

    pub fn handle_gesture(
        &mut self,
        gesture: Gesture,
        context: &NavigationContext,
    ) -> NavigationOutcome {
        trace!(?gesture, "navigation gesture");
        match gesture {
            Gesture::Pin { .. } => match self.stop() {
                Some(frame) => NavigationOutcome::Apply(frame),
                None => NavigationOutcome::Unchanged,
            },
            Gesture::Pan { dx, dy, .. } => {
                if dx == 0.0 && dy == 0.0 {
                    return NavigationOutcome::Unchanged;
                }
                let target = pan_target(context.visible_rect, dx, dy, context.screen_size);
                self.navigate_to(target, true, context)
            }
            Gesture::Zoom {
                origin_x,
                origin_y,
                scale_factor,
                prevent_horizontal,
                prevent_vertical,
                ..
            } => {
                let target = zoom_target(
                    context.visible_rect,
                    &context.transform,
                    ZoomRequest {
                        origin: Point::new(origin_x, origin_y),
                        scale_factor,
                        prevent_horizontal,
                        prevent_vertical,
                    },
                    self.min_extent,
                );
                self.navigate_to(target, true, context)
            }
        }
    }

    /// Moves to `target`, animated when requested and a strategy is configured.
    pub fn navigate_to(
        &mut self,
        target: Rect,
        animate: bool,
        context: &NavigationContext,
    ) -> NavigationOutcome {
        match self.strategy.as_deref_mut() {
            Some(strategy) if animate => {
                match strategy.animate(context.visible_rect, target, context.now_ms) {
                    Some(frame) => NavigationOutcome::Apply(frame),
                    None => NavigationOutcome::Animating,
                }
            }
            Some(strategy) => {
                let _ = strategy.stop();
                strategy.jump(target);
                NavigationOutcome::Apply(AnimationFrame::last(target))
            }
            None => NavigationOutcome::Apply(AnimationFrame::last(target)),
        }
    }

    /// Moves an externally owned viewport to `rect` without animating.
    pub fn jump(&mut self, rect: Rect) {
        if let Some(strategy) = self.strategy.as_deref_mut() {
            strategy.jump(rect);
        }
    }

    pub fn tick(&mut self, now_ms: f64) -> Option<AnimationFrame> {
        self.strategy.as_deref_mut()?.tick(now_ms)
    }

    pub fn stop(&mut self) -> Option<AnimationFrame> {
        self.strategy.as_deref_mut()?.stop()
    }
}

/// Zoom parameters in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRequest {
    pub origin: Point,
    pub scale_factor: f64,
    pub prevent_horizontal: bool,
    pub prevent_vertical: bool,
}

/// Viewport after dragging the content by `(dx, dy)` screen pixels.
///
/// Content follows the pointer, so the viewport moves the opposite way on x
/// and, because screen y points down, the same way on plot y.
#[must_use]
pub fn pan_target(current: Rect, dx: f64, dy: f64, screen_size: ScreenSize) -> Rect {
    if !screen_size.is_valid() {
        return current;
    }
    let plot_dx = dx * current.width / screen_size.width;
    let plot_dy = dy * current.height / screen_size.height;
    Rect::new(
        current.x - plot_dx,
        current.y + plot_dy,
        current.width,
        current.height,
    )
}

/// Viewport after scaling `current` about the plot point under `request.origin`.
///
/// A dimension that would shrink below `min_extent` keeps its previous value.
#[must_use]
pub fn zoom_target(
    current: Rect,
    transform: &CoordinateTransform,
    request: ZoomRequest,
    min_extent: f64,
) -> Rect {
    let scale = request.scale_factor;
    if !scale.is_finite() || scale <= 0.0 {
        return current;
    }
    let anchor = transform.to_plot(request.origin);
    let mut target = current;

    if !request.prevent_horizontal {
        let width = current.width * scale;
        if width >= min_extent {
            target.x = anchor.x - (anchor.x - current.x) * scale;
            target.width = width;
        }
    }
    if !request.prevent_vertical {
        let height = current.height * scale;
        if height >= min_extent {
            target.y = anchor.y - (anchor.y - current.y) * scale;
            target.height = height;
        }
    }
    target
}

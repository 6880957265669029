use tracing::{debug, trace};

use crate::core::Rect;
use crate::error::{ChartError, ChartResult};
use crate::interaction::{
    AnimationFrame, AnimationStrategy, Gesture, GestureStream, NavigationContext,
    NavigationOutcome, ProviderSyncedAnimation, ViewportProvider,
};

use super::events::RectChangeOrigin;
use super::plot_node::FitRequest;
use super::{Composition, FrameHost, PlotId};

/// Extra switches for [`Composition::set_visible_rect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleRectOptions {
    /// Do not push the resulting rect to bound masters.
    pub suppress_binding_echo: bool,
}

impl<H: FrameHost> Composition<H> {
    /// Moves the viewport of the tree of `id` to `rect`, disabling auto fit.
    ///
    /// With `animate` set (and animation enabled in the config) the active
    /// strategy interpolates towards `rect` over the following ticks.
    pub fn set_visible_rect(
        &mut self,
        id: PlotId,
        rect: Rect,
        animate: bool,
        options: VisibleRectOptions,
    ) -> ChartResult<NavigationOutcome> {
        let rect = rect.validate()?;
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return Err(ChartError::InvalidData(format!(
                "visible rect must have a positive size: {rect:?}"
            )));
        }
        let master = self.master_of(id)?;
        let animate = animate && self.config.animation.enabled;
        let context = self.begin_navigation(master)?;
        let outcome = self
            .master_state_mut(master)?
            .navigation
            .navigate_to(rect, animate, &context);
        self.apply_outcome(master, outcome, options.suppress_binding_echo)?;
        Ok(outcome)
    }

    /// Feeds a single gesture to the navigation controller of the tree of `id`.
    pub fn handle_gesture(&mut self, id: PlotId, gesture: Gesture) -> ChartResult<NavigationOutcome> {
        let master = self.master_of(id)?;
        let context = if matches!(gesture, Gesture::Pin { .. }) {
            self.navigation_context(master)?
        } else {
            self.begin_navigation(master)?
        };
        let outcome = self
            .master_state_mut(master)?
            .navigation
            .handle_gesture(gesture, &context);
        self.apply_outcome(master, outcome, false)?;
        Ok(outcome)
    }

    /// Installs `stream` as the gesture source of the tree of `id`, returning
    /// the previous one.
    pub fn attach_gesture_stream(
        &mut self,
        id: PlotId,
        stream: GestureStream,
    ) -> ChartResult<Option<GestureStream>> {
        Ok(self.master_state_mut(id)?.gestures.replace(stream))
    }

    pub fn detach_gesture_stream(&mut self, id: PlotId) -> ChartResult<Option<GestureStream>> {
        Ok(self.master_state_mut(id)?.gestures.take())
    }

    pub fn gesture_stream_mut(&mut self, id: PlotId) -> ChartResult<Option<&mut GestureStream>> {
        Ok(self.master_state_mut(id)?.gestures.as_mut())
    }

    /// Drains the attached gesture stream in merged order. Returns how many
    /// gestures were handled.
    pub fn process_gestures(&mut self, id: PlotId) -> ChartResult<usize> {
        let master = self.master_of(id)?;
        let drained = self
            .master_state_mut(master)?
            .gestures
            .as_mut()
            .map(GestureStream::drain);
        let Some(gestures) = drained else {
            return Ok(0);
        };
        for gesture in &gestures {
            self.handle_gesture(master, *gesture)?;
        }
        Ok(gestures.len())
    }

    pub fn is_animating(&self, id: PlotId) -> ChartResult<bool> {
        Ok(self.master_state(id)?.navigation.is_animating())
    }

    /// Ticks every running animation with the composition clock.
    ///
    /// Returns how many masters received a frame.
    pub fn advance_animations(&mut self) -> ChartResult<usize> {
        let now_ms = self.clock.now_ms();
        let animating: Vec<PlotId> = self
            .nodes
            .iter()
            .filter(|(_, node)| {
                node.master_state
                    .as_ref()
                    .is_some_and(|state| state.navigation.is_animating())
            })
            .map(|(&id, _)| id)
            .collect();

        let mut advanced = 0;
        for master in animating {
            let frame = self.master_state_mut(master)?.navigation.tick(now_ms);
            if let Some(frame) = frame {
                trace!(master = master.raw(), ?frame, now_ms, "animation tick");
                self.apply_frame(master, frame, false)?;
                advanced += 1;
            }
        }
        Ok(advanced)
    }

    /// Stops the running animation of the tree of `id` where it currently is.
    ///
    /// Returns `false` when nothing was animating.
    pub fn stop_animation(&mut self, id: PlotId) -> ChartResult<bool> {
        let master = self.master_of(id)?;
        let stopped = self.master_state_mut(master)?.navigation.stop();
        let Some(frame) = stopped else {
            return Ok(false);
        };
        self.apply_frame(master, frame, false)?;
        Ok(true)
    }

    #[must_use]
    pub fn animation_strategy_name(&self, id: PlotId) -> Option<String> {
        self.master_state(id)
            .ok()
            .and_then(|state| state.navigation.strategy_name().map(str::to_owned))
    }

    /// Replaces the animation strategy of the tree of `id`; `None` makes
    /// navigation synchronous. Detaches any viewport provider.
    pub fn set_animation_strategy(
        &mut self,
        id: PlotId,
        strategy: Option<Box<dyn AnimationStrategy>>,
    ) -> ChartResult<()> {
        let master = self.master_of(id)?;
        let state = self.master_state_mut(master)?;
        state.has_viewport_provider = false;
        let last = state.navigation.set_strategy(strategy);
        match last {
            Some(frame) => self.apply_frame(master, frame, false),
            None => Ok(()),
        }
    }

    /// Lets an externally owned viewport (a map, for instance) drive the tree
    /// of `id`. Only one provider per tree is allowed.
    pub fn attach_viewport_provider(
        &mut self,
        id: PlotId,
        provider: Box<dyn ViewportProvider>,
    ) -> ChartResult<()> {
        let master = self.master_of(id)?;
        let state = self.master_state_mut(master)?;
        if state.has_viewport_provider {
            return Err(ChartError::ViewportProviderAlreadyRegistered(master));
        }
        let rect = provider.current_rect();
        let _ = state
            .navigation
            .set_strategy(Some(Box::new(ProviderSyncedAnimation::new(provider))));
        state.has_viewport_provider = true;
        state.auto_fit = false;
        state.fit_request = FitRequest::default();
        state.change_origin = RectChangeOrigin::Navigation;
        state.own_change_pending = true;
        state.apply_explicit_rect(rect);
        debug!(master = master.raw(), ?rect, "attached viewport provider");
        self.request_update_layout(master)
    }

    pub fn has_viewport_provider(&self, id: PlotId) -> ChartResult<bool> {
        Ok(self.master_state(id)?.has_viewport_provider)
    }

    /// Context for a navigation request that takes over from auto fit.
    fn begin_navigation(&mut self, master: PlotId) -> ChartResult<NavigationContext> {
        let state = self.master_state_mut(master)?;
        state.auto_fit = false;
        state.fit_request = FitRequest::default();
        self.navigation_context(master)
    }

    fn navigation_context(&self, master: PlotId) -> ChartResult<NavigationContext> {
        let state = self.master_state(master)?;
        Ok(NavigationContext {
            visible_rect: state.visible_rect,
            screen_size: state.screen_size,
            transform: state.transform,
            now_ms: self.clock.now_ms(),
        })
    }

    fn apply_outcome(
        &mut self,
        master: PlotId,
        outcome: NavigationOutcome,
        suppress_binding_echo: bool,
    ) -> ChartResult<()> {
        match outcome {
            NavigationOutcome::Unchanged => Ok(()),
            NavigationOutcome::Animating => {
                trace!(master = master.raw(), "navigation animating");
                Ok(())
            }
            NavigationOutcome::Apply(frame) => {
                self.apply_frame(master, frame, suppress_binding_echo)
            }
        }
    }

    fn apply_frame(
        &mut self,
        master: PlotId,
        frame: AnimationFrame,
        suppress_binding_echo: bool,
    ) -> ChartResult<()> {
        let state = self.master_state_mut(master)?;
        state.auto_fit = false;
        state.apply_explicit_rect(frame.rect);
        state.is_animating_frame = !frame.is_last;
        state.change_origin = RectChangeOrigin::Navigation;
        state.suppress_binding_echo = suppress_binding_echo;
        state.own_change_pending = !suppress_binding_echo;
        self.request_update_layout(master)
    }
}

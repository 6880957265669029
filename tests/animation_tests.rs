use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use chart_compose::api::{
    Composition, CompositionConfig, PlotId, RecordingFrameHost, RectChangeOrigin,
    VisibleRectChanged, VisibleRectOptions,
};
use chart_compose::core::{Rect, ScreenSize};
use chart_compose::interaction::{
    AnimationConfig, AnimationStrategy, Gesture, GestureSourceId, NavigationOutcome,
    VelocityAnimation, VirtualClock, ViewportProvider,
};
use chart_compose::render::NullPlot;
use chart_compose::ChartError;

const MOUSE: GestureSourceId = GestureSourceId::new(3);

struct Harness {
    composition: Composition<RecordingFrameHost>,
    clock: VirtualClock,
    plot: PlotId,
    events: Rc<RefCell<Vec<VisibleRectChanged>>>,
}

impl Harness {
    fn step(&mut self, delta_ms: f64) -> usize {
        self.clock.advance(delta_ms);
        let advanced = self.composition.advance_animations().expect("tick");
        self.composition.update_layouts().expect("settle");
        advanced
    }

    fn visible(&self) -> Rect {
        self.composition.visible_rect(self.plot).expect("master")
    }

    fn last_event(&self) -> VisibleRectChanged {
        *self.events.borrow().last().expect("at least one event")
    }
}

fn build_harness(content: Option<Rect>) -> Harness {
    let clock = VirtualClock::new(0.0);
    let config = CompositionConfig::default()
        .with_padding_margin(0.0)
        .with_default_screen_size(ScreenSize::new(100.0, 100.0));
    let mut composition = Composition::with_clock(
        RecordingFrameHost::default(),
        config,
        Box::new(clock.clone()),
    )
    .expect("valid config");
    let (plot, _handle) = NullPlot::new(content);
    let plot = composition.create_plot(Box::new(plot));
    let events: Rc<RefCell<Vec<VisibleRectChanged>>> = Rc::default();
    let sink = Rc::clone(&events);
    composition
        .on_visible_rect_changed(plot, move |event| sink.borrow_mut().push(*event))
        .expect("subscribe");
    composition.update_layouts().expect("settle");
    Harness {
        composition,
        clock,
        plot,
        events,
    }
}

#[test]
fn animated_pan_moves_gradually_and_ends_on_target() {
    let mut harness = build_harness(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    let target = Rect::new(10.0, 0.0, 10.0, 10.0);

    let outcome = harness
        .composition
        .set_visible_rect(harness.plot, target, true, VisibleRectOptions::default())
        .expect("navigate");
    assert_eq!(outcome, NavigationOutcome::Animating);
    assert!(harness.composition.is_animating(harness.plot).expect("master"));
    assert_eq!(
        harness.composition.animation_strategy_name(harness.plot).as_deref(),
        Some("velocity")
    );

    assert_eq!(harness.step(16.0), 1);
    let midway = harness.visible();
    assert!(midway.x > 0.0 && midway.x < 10.0);
    assert_relative_eq!(midway.width, 10.0);
    let event = harness.last_event();
    assert!(event.is_animating);
    assert_eq!(event.origin, RectChangeOrigin::Navigation);

    harness.step(16.0);
    assert!(harness.visible().x > midway.x);

    harness.step(10_000.0);
    assert!(!harness.composition.is_animating(harness.plot).expect("master"));
    assert_eq!(harness.visible(), target);
    let last = harness.last_event();
    assert!(!last.is_animating);
    assert_eq!(last.rect, target);

    assert_eq!(harness.step(16.0), 0);
}

#[test]
fn animated_zoom_reaches_the_target_size() {
    let mut harness = build_harness(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    let target = Rect::new(2.5, 2.5, 5.0, 5.0);
    harness
        .composition
        .set_visible_rect(harness.plot, target, true, VisibleRectOptions::default())
        .expect("navigate");

    harness.step(16.0);
    let midway = harness.visible();
    assert!(midway.width < 10.0 && midway.width > 5.0);
    assert_relative_eq!(midway.center().x, 5.0, epsilon = 1e-9);

    for _ in 0..1000 {
        if harness.step(16.0) == 0 {
            break;
        }
    }
    assert!(!harness.composition.is_animating(harness.plot).expect("master"));
    assert_eq!(harness.visible(), target);
}

fn ticks_until_idle(start: Rect, target: Rect) -> usize {
    let mut animation = VelocityAnimation::new(AnimationConfig::default());
    assert!(animation.animate(start, target, 0.0).is_none());
    let mut now = 0.0;
    for ticks in 1..=10_000 {
        now += 16.0;
        let frame = animation.tick(now).expect("frame while animating");
        if frame.is_last {
            assert_eq!(frame.rect, target);
            return ticks;
        }
    }
    panic!("animation never finished");
}

#[test]
fn nearly_centered_zoom_takes_as_long_as_a_centered_one() {
    let start = Rect::new(0.0, 0.0, 10.0, 10.0);
    let centered = ticks_until_idle(start, Rect::new(2.5, 2.5, 5.0, 5.0));
    let off_center = ticks_until_idle(start, Rect::new(2.501, 2.5, 5.0, 5.0));
    assert!(centered > 10, "zoom finished after {centered} ticks");
    assert!(centered.abs_diff(off_center) <= 2, "{centered} vs {off_center} ticks");
}

#[test]
fn stop_freezes_at_the_current_rect_and_is_idempotent() {
    let mut harness = build_harness(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    harness
        .composition
        .set_visible_rect(
            harness.plot,
            Rect::new(100.0, 0.0, 10.0, 10.0),
            true,
            VisibleRectOptions::default(),
        )
        .expect("navigate");
    harness.step(16.0);
    let frozen = harness.visible();

    assert!(harness.composition.stop_animation(harness.plot).expect("stop"));
    harness.composition.update_layouts().expect("settle");
    assert!(!harness.composition.stop_animation(harness.plot).expect("already idle"));

    assert_eq!(harness.visible(), frozen);
    assert!(!harness.last_event().is_animating);
    assert_eq!(harness.step(1_000.0), 0);
    assert_eq!(harness.visible(), frozen);
}

#[test]
fn pin_stops_a_running_animation() {
    let mut harness = build_harness(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    harness
        .composition
        .handle_gesture(
            harness.plot,
            Gesture::Pan {
                dx: -500.0,
                dy: 0.0,
                source: MOUSE,
            },
        )
        .expect("pan");
    harness.step(16.0);
    let frozen = harness.visible();

    let outcome = harness
        .composition
        .handle_gesture(harness.plot, Gesture::Pin { source: MOUSE })
        .expect("pin");
    harness.composition.update_layouts().expect("settle");

    assert!(matches!(outcome, NavigationOutcome::Apply(frame) if frame.is_last && frame.rect.approx_eq(frozen, 1e-9)));
    assert!(!harness.composition.is_animating(harness.plot).expect("master"));
    assert!(!harness.last_event().is_animating);
}

#[test]
fn retargeting_continues_from_the_current_rect() {
    let mut harness = build_harness(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    harness
        .composition
        .set_visible_rect(
            harness.plot,
            Rect::new(50.0, 0.0, 10.0, 10.0),
            true,
            VisibleRectOptions::default(),
        )
        .expect("navigate");
    harness.step(16.0);
    let midway = harness.visible();

    harness
        .composition
        .set_visible_rect(
            harness.plot,
            Rect::new(-50.0, 0.0, 10.0, 10.0),
            true,
            VisibleRectOptions::default(),
        )
        .expect("retarget");
    harness.step(16.0);

    assert!(harness.visible().x < midway.x);
}

#[test]
fn fit_to_view_cancels_the_animation() {
    let mut harness = build_harness(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    harness
        .composition
        .set_visible_rect(
            harness.plot,
            Rect::new(100.0, 0.0, 10.0, 10.0),
            true,
            VisibleRectOptions::default(),
        )
        .expect("navigate");
    harness.step(16.0);

    harness.composition.fit_to_view(harness.plot).expect("fit");
    harness.composition.update_layouts().expect("settle");

    assert!(!harness.composition.is_animating(harness.plot).expect("master"));
    assert_eq!(harness.visible(), Rect::new(0.0, 0.0, 10.0, 10.0));
    assert_eq!(harness.last_event().origin, RectChangeOrigin::Layout);
}

#[derive(Debug)]
struct MapState {
    current: Rect,
    target: Rect,
    moving: bool,
    halted: bool,
}

#[derive(Debug, Clone)]
struct FakeMap(Rc<RefCell<MapState>>);

impl FakeMap {
    fn new(rect: Rect) -> Self {
        Self(Rc::new(RefCell::new(MapState {
            current: rect,
            target: rect,
            moving: false,
            halted: false,
        })))
    }

    fn move_to(&self, rect: Rect, still_moving: bool) {
        let mut state = self.0.borrow_mut();
        state.current = rect;
        state.moving = still_moving;
    }
}

impl ViewportProvider for FakeMap {
    fn current_rect(&self) -> Rect {
        self.0.borrow().current
    }

    fn begin_move(&mut self, target: Rect, animate: bool) {
        let mut state = self.0.borrow_mut();
        state.target = target;
        if animate {
            state.moving = true;
        } else {
            state.current = target;
        }
    }

    fn is_moving(&self) -> bool {
        self.0.borrow().moving
    }

    fn halt(&mut self) {
        let mut state = self.0.borrow_mut();
        state.moving = false;
        state.halted = true;
    }
}

#[test]
fn viewport_provider_drives_the_visible_rect() {
    let mut harness = build_harness(None);
    let map = FakeMap::new(Rect::new(0.0, 0.0, 50.0, 50.0));
    harness
        .composition
        .attach_viewport_provider(harness.plot, Box::new(map.clone()))
        .expect("attach");
    harness.composition.update_layouts().expect("settle");

    assert!(harness.composition.has_viewport_provider(harness.plot).expect("master"));
    assert!(!harness.composition.is_auto_fit_enabled(harness.plot).expect("master"));
    assert_eq!(harness.visible(), Rect::new(0.0, 0.0, 50.0, 50.0));
    assert_eq!(
        harness.composition.aggregate_bounds(harness.plot).expect("master"),
        Rect::new(0.0, 0.0, 50.0, 50.0)
    );

    let outcome = harness
        .composition
        .handle_gesture(
            harness.plot,
            Gesture::Pan {
                dx: -20.0,
                dy: 0.0,
                source: MOUSE,
            },
        )
        .expect("pan");
    assert_eq!(outcome, NavigationOutcome::Animating);
    assert_eq!(map.0.borrow().target, Rect::new(10.0, 0.0, 50.0, 50.0));

    map.move_to(Rect::new(5.0, 0.0, 50.0, 50.0), true);
    assert_eq!(harness.step(16.0), 1);
    assert_eq!(harness.visible(), Rect::new(5.0, 0.0, 50.0, 50.0));
    assert!(harness.last_event().is_animating);

    map.move_to(Rect::new(10.0, 0.0, 50.0, 50.0), false);
    harness.step(16.0);
    assert_eq!(harness.visible(), Rect::new(10.0, 0.0, 50.0, 50.0));
    assert!(!harness.last_event().is_animating);
    assert!(!harness.composition.is_animating(harness.plot).expect("master"));
}

#[test]
fn pin_halts_the_provider() {
    let mut harness = build_harness(None);
    let map = FakeMap::new(Rect::new(0.0, 0.0, 50.0, 50.0));
    harness
        .composition
        .attach_viewport_provider(harness.plot, Box::new(map.clone()))
        .expect("attach");
    harness
        .composition
        .set_visible_rect(
            harness.plot,
            Rect::new(100.0, 100.0, 50.0, 50.0),
            true,
            VisibleRectOptions::default(),
        )
        .expect("navigate");

    harness
        .composition
        .handle_gesture(harness.plot, Gesture::Pin { source: MOUSE })
        .expect("pin");

    assert!(map.0.borrow().halted);
    assert!(!harness.composition.is_animating(harness.plot).expect("master"));
}

#[test]
fn only_one_viewport_provider_per_tree() {
    let mut harness = build_harness(None);
    let (child, _) = NullPlot::new(None);
    let child = harness.composition.create_plot(Box::new(child));
    harness
        .composition
        .add_child(harness.plot, child)
        .expect("attach child");
    harness
        .composition
        .attach_viewport_provider(harness.plot, Box::new(FakeMap::new(Rect::UNIT)))
        .expect("first provider");

    let err = harness
        .composition
        .attach_viewport_provider(child, Box::new(FakeMap::new(Rect::UNIT)))
        .expect_err("second provider");
    assert!(matches!(err, ChartError::ViewportProviderAlreadyRegistered(master) if master == harness.plot));

    harness
        .composition
        .set_animation_strategy(harness.plot, None)
        .expect("drop provider");
    assert!(!harness.composition.has_viewport_provider(harness.plot).expect("master"));
    assert!(harness
        .composition
        .attach_viewport_provider(child, Box::new(FakeMap::new(Rect::UNIT)))
        .is_ok());
}

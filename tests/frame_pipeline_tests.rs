use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use chart_compose::api::{
    AppearanceChanged, Composition, CompositionConfig, FrameReport, PlotId, RecordingFrameHost,
    RectChangeOrigin, VisibleRectChanged, VisibleRectOptions,
};
use chart_compose::core::{Padding, Rect, ScreenSize};
use chart_compose::interaction::VirtualClock;
use chart_compose::render::{NullPlot, NullPlotHandle, Plot, RenderContext};
use chart_compose::{ChartError, ChartResult};

fn build_composition(config: CompositionConfig) -> Composition<RecordingFrameHost> {
    Composition::with_clock(
        RecordingFrameHost::default(),
        config
            .without_animation()
            .with_default_screen_size(ScreenSize::new(100.0, 100.0)),
        Box::new(VirtualClock::new(0.0)),
    )
    .expect("valid config")
}

fn unpadded() -> CompositionConfig {
    CompositionConfig::default().with_padding_margin(0.0)
}

fn add_tracked_plot(
    composition: &mut Composition<RecordingFrameHost>,
    bounds: Option<Rect>,
) -> (PlotId, NullPlotHandle) {
    let (plot, handle) = NullPlot::new(bounds);
    (composition.create_plot(Box::new(plot)), handle)
}

fn assert_rect_eq(actual: Rect, expected: Rect) {
    assert_relative_eq!(actual.x, expected.x, epsilon = 1e-9);
    assert_relative_eq!(actual.y, expected.y, epsilon = 1e-9);
    assert_relative_eq!(actual.width, expected.width, epsilon = 1e-9);
    assert_relative_eq!(actual.height, expected.height, epsilon = 1e-9);
}

#[derive(Debug)]
struct FailingPlot;

impl Plot for FailingPlot {
    fn kind(&self) -> &str {
        "failing"
    }

    fn compute_local_bounds(&self) -> Option<Rect> {
        None
    }

    fn render_core(&mut self, _context: &RenderContext) -> ChartResult<()> {
        Err(ChartError::InvalidData("backend lost".to_owned()))
    }
}

#[test]
fn repeated_requests_coalesce_into_one_frame_callback() {
    let mut composition = build_composition(unpadded());
    let (plot, _handle) = add_tracked_plot(&mut composition, None);
    assert_eq!(composition.host().requests(), &[plot]);

    for _ in 0..5 {
        composition.request_next_frame(plot).expect("request");
        composition.request_update_layout(plot).expect("request");
    }
    assert_eq!(composition.host().requests().len(), 1);
    assert!(composition.is_frame_pending(plot).expect("master"));

    composition.run_frame(plot).expect("frame");
    assert!(!composition.is_frame_pending(plot).expect("master"));

    composition.request_next_frame(plot).expect("request");
    assert_eq!(composition.host_mut().take_requests(), vec![plot, plot]);
}

#[test]
fn dependent_requests_schedule_the_master() {
    let mut composition = build_composition(unpadded());
    let (root, _) = add_tracked_plot(&mut composition, None);
    let (child, _) = add_tracked_plot(&mut composition, None);
    composition.add_child(root, child).expect("attach");
    composition.update_layouts().expect("settle");
    composition.host_mut().take_requests();

    composition.request_next_frame(child).expect("request");

    assert_eq!(composition.host().requests(), &[root]);
}

#[test]
fn only_dirty_nodes_render_without_relayout() {
    let mut composition = build_composition(unpadded());
    let (root, root_handle) = add_tracked_plot(&mut composition, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    let (child, child_handle) = add_tracked_plot(&mut composition, None);
    composition.add_child(root, child).expect("attach");
    composition.update_layouts().expect("settle");
    assert_eq!(root_handle.render_count(), 1);
    assert_eq!(child_handle.render_count(), 1);

    composition.request_next_frame(child).expect("request");
    let report = composition.run_frame(root).expect("frame");

    assert_eq!(
        report,
        FrameReport {
            relayout: false,
            rendered: 1,
            visible_rect_changed: false,
        }
    );
    assert_eq!(root_handle.render_count(), 1);
    assert_eq!(child_handle.render_count(), 2);
}

#[test]
fn relayout_renders_the_whole_tree_with_the_master_transform() {
    let mut composition = build_composition(unpadded());
    let (root, root_handle) = add_tracked_plot(&mut composition, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    let (child, child_handle) = add_tracked_plot(&mut composition, Some(Rect::new(5.0, 5.0, 10.0, 10.0)));
    composition.add_child(root, child).expect("attach");

    composition.update_layouts().expect("settle");

    let root_context = root_handle.last_context().expect("rendered");
    let child_context = child_handle.last_context().expect("rendered");
    assert_eq!(root_context.transform, child_context.transform);
    assert_rect_eq(root_context.plot_rect, Rect::new(0.0, 0.0, 15.0, 15.0));
    assert_ne!(root_context.surface, child_context.surface);
}

#[test]
fn frame_for_a_former_master_is_ignored() {
    let mut composition = build_composition(unpadded());
    let (root, root_handle) = add_tracked_plot(&mut composition, None);
    let (child, child_handle) = add_tracked_plot(&mut composition, None);
    assert_eq!(composition.host().requests(), &[root, child]);

    composition.add_child(root, child).expect("attach");

    assert_eq!(composition.run_frame(child).expect("stale"), FrameReport::default());
    assert_eq!(child_handle.render_count(), 0);

    let report = composition.run_frame(root).expect("frame");
    assert!(report.relayout);
    assert_eq!(report.rendered, 2);
    assert_eq!(root_handle.render_count(), 1);
}

#[test]
fn auto_fit_maps_content_onto_the_screen() {
    let mut composition = build_composition(unpadded());
    let (plot, _) = add_tracked_plot(&mut composition, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));

    composition.update_layouts().expect("settle");

    let transform = composition.transform(plot).expect("master");
    assert_relative_eq!(transform.scale_x(), 10.0);
    assert_relative_eq!(transform.scale_y(), 10.0);
    assert_rect_eq(
        composition.visible_rect(plot).expect("master"),
        Rect::new(0.0, 0.0, 10.0, 10.0),
    );
}

#[test]
fn auto_fit_leaves_room_for_padding_and_margin() {
    let mut composition = build_composition(CompositionConfig::default().with_padding_margin(5.0));
    let (plot, _) = add_tracked_plot(&mut composition, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    let (padded, _) = NullPlot::new(None);
    let child = composition.create_plot(Box::new(padded.with_padding(Padding::uniform(5.0))));
    composition.add_child(plot, child).expect("attach");

    composition.update_layouts().expect("settle");

    assert_eq!(
        composition.aggregate_padding(plot).expect("master"),
        Padding::uniform(10.0)
    );
    assert_relative_eq!(composition.transform(plot).expect("master").scale_x(), 8.0);
    assert_rect_eq(
        composition.visible_rect(plot).expect("master"),
        Rect::new(-1.25, -1.25, 12.5, 12.5),
    );
}

#[test]
fn oversized_padding_falls_back_to_the_full_screen() {
    let mut composition = build_composition(unpadded());
    let (plot, _) = NullPlot::new(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    let plot = composition.create_plot(Box::new(plot.with_padding(Padding::uniform(60.0))));

    composition.update_layouts().expect("settle");

    assert_rect_eq(
        composition.visible_rect(plot).expect("master"),
        Rect::new(0.0, 0.0, 10.0, 10.0),
    );
}

#[test]
fn degenerate_content_is_widened_around_its_center() {
    let mut composition = build_composition(unpadded());
    let (plot, _) = add_tracked_plot(&mut composition, Some(Rect::new(5.0, 3.0, 0.0, 4.0)));

    let bounds = composition.aggregate_bounds(plot).expect("master");

    assert_rect_eq(bounds, Rect::new(4.5, 3.0, 1.0, 4.0));
    composition.update_layouts().expect("settle");
    let visible = composition.visible_rect(plot).expect("master");
    assert!(visible.width > 0.0 && visible.height > 0.0);
}

#[test]
fn empty_tree_defaults_to_the_unit_square() {
    let mut composition = build_composition(unpadded());
    let (plot, _) = add_tracked_plot(&mut composition, None);

    composition.update_layouts().expect("settle");

    assert_eq!(composition.aggregate_bounds(plot).expect("master"), Rect::UNIT);
    assert_rect_eq(composition.visible_rect(plot).expect("master"), Rect::UNIT);
}

#[test]
fn invalidated_bounds_are_recomputed_on_the_next_layout() {
    let mut composition = build_composition(unpadded());
    let (plot, handle) = add_tracked_plot(&mut composition, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    composition.update_layouts().expect("settle");

    handle.set_bounds(Some(Rect::new(0.0, 0.0, 20.0, 40.0)));
    composition.update_layouts().expect("nothing pending");
    assert_rect_eq(
        composition.visible_rect(plot).expect("master"),
        Rect::new(0.0, 0.0, 10.0, 10.0),
    );

    composition.invalidate_local_bounds(plot).expect("invalidate");
    composition.update_layouts().expect("settle");
    assert_rect_eq(
        composition.visible_rect(plot).expect("master"),
        Rect::new(0.0, 0.0, 20.0, 40.0),
    );
}

#[test]
fn fit_to_view_x_keeps_the_y_range() {
    let mut composition = build_composition(unpadded());
    let (plot, _) = add_tracked_plot(&mut composition, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    composition.update_layouts().expect("settle");
    composition
        .set_visible_rect(plot, Rect::new(50.0, 50.0, 5.0, 5.0), false, VisibleRectOptions::default())
        .expect("navigate");
    composition.update_layouts().expect("settle");
    assert!(!composition.is_auto_fit_enabled(plot).expect("master"));

    composition.fit_to_view_x(plot).expect("fit x");
    composition.update_layouts().expect("settle");

    assert_rect_eq(
        composition.visible_rect(plot).expect("master"),
        Rect::new(0.0, 50.0, 10.0, 5.0),
    );
    assert!(!composition.is_auto_fit_enabled(plot).expect("one-shot fit"));

    composition.fit_to_view(plot).expect("fit");
    composition.update_layouts().expect("settle");
    assert!(composition.is_auto_fit_enabled(plot).expect("master"));
    assert_rect_eq(
        composition.visible_rect(plot).expect("master"),
        Rect::new(0.0, 0.0, 10.0, 10.0),
    );
}

#[test]
fn resize_keeps_the_explicit_viewport() {
    let mut composition = build_composition(unpadded());
    let (plot, _) = add_tracked_plot(&mut composition, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    composition
        .set_visible_rect(plot, Rect::new(2.0, 2.0, 4.0, 4.0), false, VisibleRectOptions::default())
        .expect("navigate");
    composition.update_layouts().expect("settle");

    composition
        .set_screen_size(plot, ScreenSize::new(400.0, 200.0))
        .expect("resize");
    composition.update_layouts().expect("settle");

    assert_rect_eq(
        composition.visible_rect(plot).expect("master"),
        Rect::new(2.0, 2.0, 4.0, 4.0),
    );
    assert_relative_eq!(composition.transform(plot).expect("master").scale_x(), 100.0);
    assert!(matches!(
        composition.set_screen_size(plot, ScreenSize::new(0.0, 10.0)),
        Err(ChartError::InvalidScreenSize { .. })
    ));
}

#[test]
fn visible_rect_changes_are_reported_once_per_change() {
    let mut composition = build_composition(unpadded());
    let (plot, _) = add_tracked_plot(&mut composition, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    let seen: Rc<RefCell<Vec<VisibleRectChanged>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let subscription = composition
        .on_visible_rect_changed(plot, move |event| sink.borrow_mut().push(*event))
        .expect("subscribe");

    composition.update_layouts().expect("settle");
    composition.request_update_layout(plot).expect("relayout");
    composition.update_layouts().expect("settle");

    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(seen.borrow()[0].origin, RectChangeOrigin::Layout);
    assert!(!seen.borrow()[0].is_animating);

    assert!(composition.unsubscribe(plot, subscription).expect("master"));
    composition
        .set_visible_rect(plot, Rect::new(1.0, 1.0, 2.0, 2.0), false, VisibleRectOptions::default())
        .expect("navigate");
    composition.update_layouts().expect("settle");
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn appearance_change_redraws_only_that_plot() {
    let mut composition = build_composition(unpadded());
    let (root, root_handle) = add_tracked_plot(&mut composition, None);
    let (child, child_handle) = add_tracked_plot(&mut composition, None);
    composition.add_child(root, child).expect("attach");
    composition.update_layouts().expect("settle");
    let seen: Rc<RefCell<Vec<AppearanceChanged>>> = Rc::default();
    let sink = Rc::clone(&seen);
    composition
        .on_appearance_changed(child, move |event| sink.borrow_mut().push(*event))
        .expect("subscribe through dependent");

    composition.notify_appearance_changed(child).expect("notify");
    composition.update_layouts().expect("settle");

    assert_eq!(
        seen.borrow().as_slice(),
        &[AppearanceChanged {
            master: root,
            plot: child
        }]
    );
    assert_eq!(root_handle.render_count(), 1);
    assert_eq!(child_handle.render_count(), 2);
}

#[test]
fn a_failing_renderer_does_not_stop_the_frame() {
    let mut composition = build_composition(unpadded());
    let (root, root_handle) = add_tracked_plot(&mut composition, None);
    let failing = composition.create_plot(Box::new(FailingPlot));
    let (sibling, sibling_handle) = add_tracked_plot(&mut composition, None);
    composition.add_child(root, failing).expect("attach");
    composition.add_child(root, sibling).expect("attach");
    composition.update_layouts().expect("stale frames are skipped");
    composition.request_update_layout(root).expect("relayout");

    let report = composition.run_frame(root).expect("frame");

    assert_eq!(report.rendered, 2);
    assert_eq!(root_handle.render_count(), 2);
    assert_eq!(sibling_handle.render_count(), 2);
}

#[test]
fn update_layouts_runs_every_pending_master() {
    let mut composition = build_composition(unpadded());
    let (a, a_handle) = add_tracked_plot(&mut composition, None);
    let (b, b_handle) = add_tracked_plot(&mut composition, None);

    assert_eq!(composition.update_layouts().expect("settle"), 2);
    assert_eq!(composition.update_layouts().expect("idle"), 0);
    assert_eq!(a_handle.render_count(), 1);
    assert_eq!(b_handle.render_count(), 1);
    assert_eq!(composition.arranged_rect(b).expect("master").width, 100.0);
    assert!(!composition.is_frame_pending(a).expect("master"));
}

use std::cell::RefCell;
use std::rc::Rc;

use chart_compose::api::{ChildrenChanged, Composition, CompositionConfig, PlotId, RecordingFrameHost};
use chart_compose::core::{Rect, ScreenSize};
use chart_compose::interaction::VirtualClock;
use chart_compose::render::{NullPlot, SurfaceMode};
use chart_compose::ChartError;
use proptest::prelude::*;

fn build_composition() -> Composition<RecordingFrameHost> {
    Composition::with_clock(
        RecordingFrameHost::default(),
        CompositionConfig::default().without_animation(),
        Box::new(VirtualClock::new(0.0)),
    )
    .expect("valid config")
}

fn add_plot(composition: &mut Composition<RecordingFrameHost>, bounds: Option<Rect>) -> PlotId {
    let (plot, _handle) = NullPlot::new(bounds);
    composition.create_plot(Box::new(plot))
}

#[test]
fn new_plots_are_masters_of_themselves() {
    let mut composition = build_composition();
    let a = add_plot(&mut composition, None);
    let b = add_plot(&mut composition, None);

    assert!(composition.is_master(a).expect("known plot"));
    assert_eq!(composition.master_of(b).expect("known plot"), b);
    assert_eq!(composition.masters().collect::<Vec<_>>(), vec![a, b]);
    assert_eq!(composition.plot_count(), 2);
}

#[test]
fn attached_child_delegates_viewport_calls_to_master() {
    let mut composition = build_composition();
    let root = add_plot(&mut composition, None);
    let child = add_plot(&mut composition, None);
    let grandchild = add_plot(&mut composition, None);

    composition.add_child(child, grandchild).expect("attach grandchild");
    composition.add_child(root, child).expect("attach child");

    assert!(!composition.is_master(child).expect("known plot"));
    assert_eq!(composition.master_of(grandchild).expect("known plot"), root);
    assert_eq!(composition.parent(grandchild).expect("known plot"), Some(child));
    assert_eq!(composition.subtree(root), vec![root, child, grandchild]);

    composition
        .set_screen_size(grandchild, ScreenSize::new(300.0, 200.0))
        .expect("resize through dependent");
    assert_eq!(
        composition.screen_size(root).expect("master"),
        ScreenSize::new(300.0, 200.0)
    );
    assert_eq!(
        composition.visible_rect(grandchild).expect("dependent"),
        composition.visible_rect(root).expect("master")
    );
}

#[test]
fn attaching_an_owned_child_is_rejected() {
    let mut composition = build_composition();
    let first = add_plot(&mut composition, None);
    let second = add_plot(&mut composition, None);
    let child = add_plot(&mut composition, None);
    composition.add_child(first, child).expect("first attach");

    let err = composition
        .add_child(second, child)
        .expect_err("child already has a parent");

    assert!(matches!(err, ChartError::ChildAlreadyAttached { child: c, parent: p } if c == child && p == first));
    assert_eq!(composition.master_of(child).expect("known plot"), first);
}

#[test]
fn attaching_a_tree_under_its_own_descendant_is_rejected() {
    let mut composition = build_composition();
    let root = add_plot(&mut composition, None);
    let child = add_plot(&mut composition, None);
    composition.add_child(root, child).expect("attach");

    let err = composition.add_child(child, root).expect_err("cycle");
    assert!(matches!(err, ChartError::WouldCreateCycle { .. }));
    assert!(matches!(
        composition.add_child(root, root),
        Err(ChartError::WouldCreateCycle { .. })
    ));
}

#[test]
fn removed_child_becomes_master_and_keeps_screen_size() {
    let mut composition = build_composition();
    let root = add_plot(&mut composition, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    let child = add_plot(&mut composition, Some(Rect::new(100.0, 100.0, 1.0, 1.0)));
    let grandchild = add_plot(&mut composition, None);
    composition.add_child(root, child).expect("attach");
    composition.add_child(child, grandchild).expect("attach");
    composition
        .set_screen_size(root, ScreenSize::new(320.0, 240.0))
        .expect("resize");

    assert!(composition.remove_child(root, child).expect("detach"));

    assert!(composition.is_master(child).expect("known plot"));
    assert_eq!(composition.master_of(grandchild).expect("known plot"), child);
    assert_eq!(
        composition.screen_size(child).expect("new master"),
        ScreenSize::new(320.0, 240.0)
    );
    assert!(composition.children(root).expect("known plot").is_empty());
    assert!(!composition.remove_child(root, child).expect("not a child any more"));
}

#[test]
fn children_changed_is_emitted_on_attach_and_detach() {
    let mut composition = build_composition();
    let root = add_plot(&mut composition, None);
    let child = add_plot(&mut composition, None);
    let seen: Rc<RefCell<Vec<ChildrenChanged>>> = Rc::default();
    let sink = Rc::clone(&seen);
    composition
        .on_children_changed(root, move |event| sink.borrow_mut().push(*event))
        .expect("subscribe");

    composition.add_child(root, child).expect("attach");
    composition.remove_child(root, child).expect("detach");

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].added, Some(child));
    assert_eq!(seen[0].removed, None);
    assert_eq!(seen[1].removed, Some(child));
    assert_eq!(seen[1].master, root);
}

#[test]
fn disposing_a_dependent_removes_its_subtree_only() {
    let mut composition = build_composition();
    let root = add_plot(&mut composition, None);
    let child = add_plot(&mut composition, None);
    let grandchild = add_plot(&mut composition, None);
    composition.add_child(root, child).expect("attach");
    composition.add_child(child, grandchild).expect("attach");

    composition.dispose_plot(child).expect("dispose");

    assert!(composition.contains(root));
    assert!(!composition.contains(child));
    assert!(!composition.contains(grandchild));
    assert!(composition.children(root).expect("root").is_empty());
    assert!(matches!(
        composition.master_of(grandchild),
        Err(ChartError::UnknownPlot(_))
    ));
}

#[test]
fn shared_surface_mode_rebuilds_surfaces_on_reparent() {
    let mut composition = build_composition();
    let root = add_plot(&mut composition, None);
    let child = add_plot(&mut composition, None);
    composition
        .set_surface_mode(root, SurfaceMode::Shared)
        .expect("shared mode");
    let before = composition.surface_of(root).expect("root").expect("allocated");

    composition.add_child(root, child).expect("attach");

    let shared = composition.surface_of(root).expect("root").expect("allocated");
    assert_ne!(shared, before);
    assert_eq!(composition.surface_of(child).expect("child"), Some(shared));

    composition.remove_child(root, child).expect("detach");
    let detached = composition.surface_of(child).expect("child").expect("allocated");
    assert_ne!(detached, shared);
    assert_eq!(composition.surface_mode(child).expect("new master"), SurfaceMode::Shared);
}

#[derive(Debug, Clone)]
enum TreeOp {
    Attach(usize, usize),
    Detach(usize),
}

fn tree_op(plots: usize) -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        (0..plots, 0..plots).prop_map(|(parent, child)| TreeOp::Attach(parent, child)),
        (0..plots).prop_map(TreeOp::Detach),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn every_tree_keeps_exactly_one_master(ops in prop::collection::vec(tree_op(6), 0..40)) {
        let mut composition = build_composition();
        let ids: Vec<PlotId> = (0..6).map(|_| add_plot(&mut composition, None)).collect();

        for op in ops {
            match op {
                TreeOp::Attach(parent, child) => {
                    let _ = composition.add_child(ids[parent], ids[child]);
                }
                TreeOp::Detach(child) => {
                    if let Some(parent) = composition.parent(ids[child]).expect("known plot") {
                        prop_assert!(composition.remove_child(parent, ids[child]).expect("detach"));
                    }
                }
            }
        }

        for &id in &ids {
            let mut root = id;
            while let Some(parent) = composition.parent(root).expect("known plot") {
                root = parent;
            }
            let master = composition.master_of(id).expect("known plot");
            prop_assert_eq!(master, root);
            prop_assert!(composition.is_master(master).expect("known plot"));
            prop_assert_eq!(
                composition.is_master(id).expect("known plot"),
                composition.parent(id).expect("known plot").is_none()
            );
        }

        let in_trees: usize = composition
            .masters()
            .map(|master| composition.subtree(master).len())
            .sum();
        prop_assert_eq!(in_trees, ids.len());
    }
}

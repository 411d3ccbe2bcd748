use std::path::{Path, PathBuf};

use som_overlay::config::SomConfig;
use som_overlay::geometry::Rect;
use som_overlay::marks_dump::MarksDump;
use som_overlay::pipeline::Mark;
use som_overlay::pipeline::nesting::NestingConsolidator;
use som_overlay::pipeline::selector::{CandidateSelector, RoleSelector};
use som_overlay::pipeline::stacking::ContainmentIndex;
use som_overlay::render::render_svg;
use som_overlay::scene::{NodeId, NodeSnapshot, SceneSnapshot, Viewport};
use som_overlay::theme::Theme;
use som_overlay::{Scene, SceneProvider, SetOfMarks};

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str) -> Scene {
    Scene::load(&fixture_path(name)).expect("fixture load failed")
}

fn overlay() -> SetOfMarks {
    SetOfMarks::new(
        SomConfig::default(),
        Theme {
            fast_text_metrics: true,
            ..Theme::default()
        },
    )
}

async fn marked_ids(scene: &Scene) -> Vec<String> {
    let mut som = overlay();
    let marks = som.display(scene).await.expect("pass failed");
    element_ids(scene, marks)
}

fn element_ids(scene: &Scene, marks: &[Mark]) -> Vec<String> {
    marks
        .iter()
        .map(|mark| {
            scene
                .element(mark.node)
                .element_id
                .clone()
                .unwrap_or_else(|| format!("#{}", mark.node.0))
        })
        .collect()
}

#[tokio::test]
async fn storefront_marks_expected_elements_in_order() {
    let scene = load("storefront.json");
    let ids = marked_ids(&scene).await;
    assert_eq!(
        ids,
        vec![
            "logo-img", "nav-shop", "nav-deals", "nav-help", "search", "cart", "add-1", "add-2",
            "email", "note", "submit", "accept", "card-1", "card-2", "tool-0", "tool-1", "tool-2",
            "tool-3",
        ]
    );
}

#[tokio::test]
async fn storefront_rejections() {
    let scene = load("storefront.json");
    let ids = marked_ids(&scene).await;
    for rejected in [
        "hidden-item",
        "under-banner",
        "offscreen",
        "wide-banner",
        "toolbar",
        "logo",
    ] {
        assert!(!ids.iter().any(|id| id == rejected), "{rejected} should not be marked");
    }
}

#[tokio::test]
async fn storefront_marks_are_consistent() {
    let scene = load("storefront.json");
    let viewport = scene.viewport_bound();
    let mut som = overlay();
    som.display(&scene).await.unwrap();

    for (position, mark) in som.marks().iter().enumerate() {
        assert_eq!(mark.index, position);
        assert_eq!(som.resolve(position), Some(mark.node));
        assert_eq!(som.annotation(mark.node), Some(position));
        assert!(mark.rect.fraction_inside(&viewport) >= 0.6);
    }

    let editable: Vec<String> = element_ids(
        &scene,
        &som.marks()
            .iter()
            .filter(|m| m.editable)
            .cloned()
            .collect::<Vec<_>>(),
    );
    assert_eq!(editable, vec!["search", "email", "note"]);
}

#[tokio::test]
async fn sparse_labels_stay_inside_and_never_overlap() {
    let mut root = NodeSnapshot::new("body", Rect::new(0.0, 0.0, 800.0, 600.0));
    for (idx, (x, y)) in [(200.0, 200.0), (500.0, 200.0), (200.0, 400.0), (500.0, 400.0)]
        .into_iter()
        .enumerate()
    {
        root = root.child(
            NodeSnapshot::new("button", Rect::new(x, y, 80.0, 30.0)).with_id(&format!("b{idx}")),
        );
    }
    let snapshot = SceneSnapshot {
        viewport: Viewport {
            width: 800.0,
            height: 600.0,
        },
        root,
    };
    let scene = Scene::from_snapshot(&snapshot).unwrap();
    let viewport = scene.viewport_bound();
    let mut som = overlay();
    let marks = som.display(&scene).await.unwrap();
    assert_eq!(marks.len(), 4);

    let labels: Vec<Rect> = marks.iter().map(Mark::label_rect).collect();
    for (i, a) in labels.iter().enumerate() {
        assert!(viewport.contains(a), "label {i} left the viewport");
        for b in &labels[i + 1..] {
            assert_eq!(a.overlap_area(b), 0.0, "labels {a:?} and {b:?} overlap");
        }
        for mark in marks.iter() {
            assert_eq!(a.overlap_area(&mark.rect), 0.0);
        }
    }
}

#[tokio::test]
async fn occlusion_threshold_boundary() {
    let scene = load("threshold.json");
    assert_eq!(marked_ids(&scene).await, vec!["target"]);

    let text = std::fs::read_to_string(fixture_path("threshold.json")).unwrap();
    let mut snapshot: SceneSnapshot = serde_json::from_str(&text).unwrap();
    snapshot.root.children[1].rect.height = 41.0;
    let scene = Scene::from_snapshot(&snapshot).unwrap();
    assert!(marked_ids(&scene).await.is_empty());
}

#[tokio::test]
async fn removing_occluders_restores_visibility() {
    let text = std::fs::read_to_string(fixture_path("threshold.json")).unwrap();
    let mut snapshot: SceneSnapshot = serde_json::from_str(&text).unwrap();
    snapshot.root.children[1].rect.height = 100.0;
    let covered = Scene::from_snapshot(&snapshot).unwrap();
    assert!(marked_ids(&covered).await.is_empty());

    snapshot.root.children.truncate(1);
    let bare = Scene::from_snapshot(&snapshot).unwrap();
    assert_eq!(marked_ids(&bare).await, vec!["target"]);
}

#[tokio::test]
async fn nested_chain_keeps_only_outermost() {
    let scene = load("nested_chain.json");
    assert_eq!(marked_ids(&scene).await, vec!["a"]);
}

#[tokio::test]
async fn stacking_and_clip_rules() {
    let scene = load("stacking.json");
    assert_eq!(marked_ids(&scene).await, vec!["raised", "clipped-over"]);
}

#[tokio::test]
async fn clear_then_display_twice_is_identical() {
    let scene = load("storefront.json");
    let mut som = overlay();
    som.clear();
    let first = som.display(&scene).await.unwrap().to_vec();
    som.clear();
    let second = som.display(&scene).await.unwrap().to_vec();
    assert_eq!(first, second);
}

#[tokio::test]
async fn outputs_render_for_every_fixture() {
    for name in [
        "storefront.json",
        "threshold.json",
        "nested_chain.json",
        "stacking.json",
    ] {
        let scene = load(name);
        let mut som = overlay();
        som.display(&scene).await.unwrap();
        let svg = render_svg(
            som.marks(),
            &scene.viewport_bound(),
            som.theme(),
            &Default::default(),
            false,
        );
        assert!(svg.contains("<svg"), "{name}: missing <svg");
        assert_eq!(
            svg.matches("class=\"som-mark\"").count(),
            som.marks().len(),
            "{name}"
        );
        let dump = MarksDump::from_marks(&scene, som.marks(), false);
        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["marks"].as_array().unwrap().len(), som.marks().len());
    }
}

/// Marks that contain one another structurally must be explained either by a
/// fixed-role descendant, which consolidation never drops, or by a container
/// kept together with a few large sub-targets.
fn assert_nested_marks_are_justified(scene: &Scene, marks: &[Mark], label: &str) {
    let config = SomConfig::default();
    let containment = ContainmentIndex::build(scene);
    let fixed = RoleSelector.select(scene).fixed;
    let consolidator = NestingConsolidator::new(scene, &containment, &config);
    let nodes: Vec<NodeId> = marks.iter().map(|m| m.node).collect();

    for &outer in &nodes {
        let inside: Vec<NodeId> = nodes
            .iter()
            .copied()
            .filter(|inner| containment.contains(outer, *inner))
            .collect();
        for &inner in &inside {
            if fixed.contains(&inner) {
                continue;
            }
            let branches = consolidator.branches(outer, &inside).len();
            assert!(
                (2..=config.quantity_threshold).contains(&branches),
                "{label}: node {} kept inside node {} with {branches} sub-targets",
                inner.0,
                outer.0
            );
        }
    }
}

#[tokio::test]
async fn nested_marks_only_survive_as_kept_levels() {
    for name in [
        "storefront.json",
        "threshold.json",
        "nested_chain.json",
        "stacking.json",
    ] {
        let scene = load(name);
        let mut som = overlay();
        let marks = som.display(&scene).await.unwrap();
        assert_nested_marks_are_justified(&scene, marks, name);
    }
}

#[tokio::test]
async fn dropped_decoration_takes_its_subtree_with_it() {
    // panel > [ upper, lower, badge > dot ]; badge is far smaller than panel
    let pointer = |id: &str, rect: Rect| NodeSnapshot::new("div", rect).with_id(id).cursor("pointer");
    let root = NodeSnapshot::new("body", Rect::new(0.0, 0.0, 800.0, 600.0)).child(
        pointer("panel", Rect::new(0.0, 0.0, 400.0, 240.0))
            .child(pointer("upper", Rect::new(5.0, 5.0, 390.0, 90.0)))
            .child(pointer("lower", Rect::new(5.0, 100.0, 390.0, 90.0)))
            .child(
                pointer("badge", Rect::new(10.0, 200.0, 20.0, 20.0))
                    .child(pointer("dot", Rect::new(12.0, 202.0, 10.0, 10.0))),
            ),
    );
    let scene = Scene::from_snapshot(&SceneSnapshot {
        viewport: Viewport {
            width: 800.0,
            height: 600.0,
        },
        root,
    })
    .unwrap();

    let mut som = overlay();
    let marks = som.display(&scene).await.unwrap();
    assert_eq!(element_ids(&scene, marks), vec!["panel", "upper", "lower"]);
    assert_nested_marks_are_justified(&scene, marks, "decoration");
}

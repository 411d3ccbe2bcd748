use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use som_overlay::config::SomConfig;
use som_overlay::geometry::Rect;
use som_overlay::pipeline::colors::ContrastColorChooser;
use som_overlay::pipeline::run_pass;
use som_overlay::pipeline::selector::RoleSelector;
use som_overlay::pipeline::spatial_index::{DEFAULT_NODE_CAPACITY, SpatialIndex};
use som_overlay::scene::{NodeSnapshot, SceneSnapshot, Viewport};
use som_overlay::theme::Theme;
use som_overlay::{Scene, SceneProvider};
use std::hint::black_box;

/// A page of `rows * cols` cards, each holding a link and a button, with a
/// sticky header painted above the first row.
fn grid_scene(rows: usize, cols: usize) -> Scene {
    let width = 1280.0;
    let height = 720.0;
    let cell_w = width / cols as f32;
    let cell_h = height / rows as f32;
    let mut main = NodeSnapshot::new("main", Rect::new(0.0, 0.0, width, height));
    for row in 0..rows {
        for col in 0..cols {
            let x = col as f32 * cell_w;
            let y = row as f32 * cell_h;
            let card = NodeSnapshot::new("div", Rect::new(x + 2.0, y + 2.0, cell_w - 4.0, cell_h - 4.0))
                .cursor("pointer")
                .background("#f4f4f4")
                .radius(&[6.0])
                .child(NodeSnapshot::new(
                    "a",
                    Rect::new(x + 6.0, y + 6.0, cell_w * 0.5, cell_h * 0.3),
                ))
                .child(NodeSnapshot::new(
                    "button",
                    Rect::new(x + 6.0, y + cell_h * 0.55, cell_w * 0.4, cell_h * 0.3),
                ));
            main = main.child(card);
        }
    }
    let header = NodeSnapshot::new("header", Rect::new(0.0, 0.0, width, 48.0))
        .z(10)
        .background("#222222");
    let root = NodeSnapshot::new("body", Rect::new(0.0, 0.0, width, height))
        .child(main)
        .child(header);
    let snapshot = SceneSnapshot {
        viewport: Viewport { width, height },
        root,
    };
    Scene::from_snapshot(&snapshot).expect("synthetic scene")
}

fn storefront() -> Scene {
    Scene::from_json(include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/storefront.json"
    )))
    .expect("storefront fixture")
}

fn bench_spatial_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_index");
    for (rows, cols) in [(4usize, 6usize), (12, 16), (30, 40)] {
        let scene = grid_scene(rows, cols);
        let name = format!("grid_{}x{}", rows, cols);
        group.bench_with_input(BenchmarkId::new("build", &name), &scene, |b, scene| {
            b.iter(|| {
                let index = SpatialIndex::build(
                    scene.viewport_bound(),
                    scene.walk_all_painted_nodes(),
                    DEFAULT_NODE_CAPACITY,
                );
                black_box(index.len());
            });
        });
        let index = SpatialIndex::build(
            scene.viewport_bound(),
            scene.walk_all_painted_nodes(),
            DEFAULT_NODE_CAPACITY,
        );
        group.bench_with_input(BenchmarkId::new("query", &name), &index, |b, index| {
            let probe = Rect::new(600.0, 300.0, 120.0, 80.0);
            b.iter(|| black_box(index.query(black_box(&probe)).len()));
        });
    }
    group.finish();
}

fn bench_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("pass");
    group.sample_size(20);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime");
    let config = SomConfig::default();
    let theme = Theme {
        fast_text_metrics: true,
        ..Theme::default()
    };
    let selector = RoleSelector;
    let chooser = ContrastColorChooser::default();

    let mut scenes = vec![("storefront".to_string(), storefront())];
    for (rows, cols) in [(4usize, 6usize), (12, 16)] {
        scenes.push((format!("grid_{}x{}", rows, cols), grid_scene(rows, cols)));
    }
    for (name, scene) in &scenes {
        group.bench_with_input(BenchmarkId::from_parameter(name), scene, |b, scene| {
            b.iter(|| {
                let marks = runtime
                    .block_on(run_pass(black_box(scene), &config, &theme, &selector, &chooser))
                    .expect("pass failed");
                black_box(marks.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_spatial_index, bench_pass);
criterion_main!(benches);

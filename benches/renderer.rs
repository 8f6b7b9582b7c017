use cld_render::assemble::{assemble, build_snapshot};
use cld_render::config::LayoutConfig;
use cld_render::ir::{Diagram, Polarity};
use cld_render::layout::{Point, Positions, resolve_overlaps, wrap_label};
use cld_render::parser::parse_diagram;
use cld_render::render::render_svg;
use cld_render::store::MemoryLayoutStore;
use cld_render::theme::Theme;
use cld_render::view::lay_out;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const ARCHETYPE_TYPES: [&str; 4] = [
    "FIXES_THAT_FAIL",
    "LIMITS_TO_SUCCESS",
    "ESCALATION",
    "SHIFTING_THE_BURDEN",
];

/// A ring of variables with chords, loops over consecutive triples and
/// archetypes that overlap so many nodes get multi-slice glyphs.
fn synthetic_diagram(nodes: usize, archetypes: usize) -> Diagram {
    let mut diagram = Diagram::new(&format!("bench-{nodes}"));
    for i in 0..nodes {
        diagram.add_node(&format!("v{i}"), &format!("Variable number {i} in the system"));
    }
    for i in 0..nodes {
        let polarity = if i % 3 == 0 {
            Polarity::Negative
        } else {
            Polarity::Positive
        };
        diagram.add_edge(&format!("v{i}"), &format!("v{}", (i + 1) % nodes), polarity);
        if i % 4 == 0 {
            diagram.add_edge(&format!("v{i}"), &format!("v{}", (i + nodes / 2) % nodes), Polarity::Positive);
        }
    }
    for i in (0..nodes.saturating_sub(2)).step_by(3) {
        let members = [format!("v{i}"), format!("v{}", i + 1), format!("v{}", i + 2)];
        let members: Vec<&str> = members.iter().map(String::as_str).collect();
        let kind = if i % 2 == 0 { "REINFORCING" } else { "BALANCING" };
        diagram.add_loop(&format!("l{i}"), kind, &members);
    }
    for a in 0..archetypes {
        let start = (a * 2) % nodes.max(1);
        let members: Vec<String> = (start..start + 4).map(|i| format!("v{}", i % nodes.max(1))).collect();
        let members: Vec<&str> = members.iter().map(String::as_str).collect();
        diagram.add_archetype(&format!("x{a}"), ARCHETYPE_TYPES[a % ARCHETYPE_TYPES.len()], &members);
    }
    diagram
}

fn crowded_positions(nodes: usize) -> (Vec<String>, Positions) {
    let order: Vec<String> = (0..nodes).map(|i| format!("v{i}")).collect();
    let positions = order
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), Point::new((i % 7) as f64 * 40.0, (i / 7) as f64 * 35.0)))
        .collect();
    (order, positions)
}

fn config() -> LayoutConfig {
    LayoutConfig {
        fast_text_metrics: true,
        ..Default::default()
    }
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for nodes in [10usize, 50, 200] {
        let json = serde_json::to_string(&synthetic_diagram(nodes, nodes / 3)).expect("serialize");
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &json, |b, data| {
            b.iter(|| {
                let parsed = parse_diagram(black_box(data)).expect("parse failed");
                black_box(parsed.diagram.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_wrap(c: &mut Criterion) {
    let labels = [
        "Short",
        "Number of customers waiting in line for service",
        "Perceived quality of the delivered product relative to expectations of long-term buyers",
    ];
    c.bench_function("wrap_label", |b| {
        b.iter(|| {
            for label in labels {
                black_box(wrap_label(black_box(label), 20, 3));
            }
        });
    });
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");
    let theme = Theme::classic();
    let config = config();
    for nodes in [10usize, 50, 200] {
        let diagram = synthetic_diagram(nodes, nodes / 3);
        group.bench_with_input(BenchmarkId::new("snapshot", nodes), &diagram, |b, diagram| {
            b.iter(|| black_box(build_snapshot(black_box(diagram), &theme, &config).legend().len()));
        });
        group.bench_with_input(BenchmarkId::new("render_spec", nodes), &diagram, |b, diagram| {
            b.iter(|| black_box(assemble(black_box(diagram), None, &theme, &config).1.nodes.len()));
        });
    }
    group.finish();
}

fn bench_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlap");
    let config = LayoutConfig::default();
    for nodes in [10usize, 40, 120] {
        let (order, positions) = crowded_positions(nodes);
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &positions, |b, positions| {
            b.iter(|| {
                let mut working = positions.clone();
                black_box(resolve_overlaps(&order, &mut working, &config.overlap).corrections);
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let theme = Theme::classic();
    let config = config();
    for nodes in [10usize, 50, 200] {
        let diagram = synthetic_diagram(nodes, nodes / 3);
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &diagram, |b, diagram| {
            b.iter(|| {
                let (layout, _) = lay_out(
                    diagram.clone(),
                    MemoryLayoutStore::default(),
                    &theme,
                    &config,
                    false,
                );
                let layout = layout.expect("layout");
                black_box(render_svg(&layout, &theme, &config).len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_wrap, bench_assemble, bench_overlap, bench_end_to_end
);
criterion_main!(benches);

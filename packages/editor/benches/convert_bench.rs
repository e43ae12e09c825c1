use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tandem_editor::{convert, default_providers, ConversionContext, DiagramTypeConfig};
use tandem_identity::Registry;
use tandem_model::ModelMetadata;
use tandem_parser::parse;

fn workflow_source(activities: usize, tasks: usize) -> String {
    let mut source = String::new();
    for a in 0..activities {
        source.push_str(&format!("activity Stage{} @at({}, 0) {{\n", a, a * 400));
        for t in 0..tasks {
            source.push_str(&format!("  task \"Step {}.{}\"\n", a, t));
        }
        for t in 1..tasks {
            source.push_str(&format!("  flow \"Step {a}.{}\" -> \"Step {a}.{}\"\n", t - 1, t));
        }
        source.push_str("}\n");
    }
    source
}

fn flat_source(tasks: usize) -> String {
    (0..tasks).map(|t| format!("task T{}\n", t)).collect()
}

fn convert_wide(c: &mut Criterion) {
    let config = DiagramTypeConfig::workflow();
    let providers = default_providers(&config);
    let tree = parse(&flat_source(10_000)).tree;
    let mut registry = Registry::new("file:///bench.flow");
    let mut metadata = ModelMetadata::new();
    {
        let mut ctx = ConversionContext::new(&config, &providers, &mut registry, &mut metadata);
        convert(&tree, &mut ctx);
    }

    let mut group = c.benchmark_group("wide");
    group.sample_size(10);
    group.bench_function("reconvert_10k_siblings", |b| {
        b.iter(|| {
            let mut ctx = ConversionContext::new(&config, &providers, &mut registry, &mut metadata);
            convert(black_box(&tree), &mut ctx)
        })
    });
    group.finish();
}

fn convert_fresh(c: &mut Criterion) {
    let config = DiagramTypeConfig::workflow();
    let providers = default_providers(&config);
    let source = workflow_source(10, 20);
    let tree = parse(&source).tree;

    c.bench_function("convert_fresh_registry", |b| {
        b.iter(|| {
            let mut registry = Registry::new("file:///bench.flow");
            let mut metadata = ModelMetadata::new();
            let mut ctx = ConversionContext::new(&config, &providers, &mut registry, &mut metadata);
            convert(black_box(&tree), &mut ctx)
        })
    });
}

fn convert_warm(c: &mut Criterion) {
    let config = DiagramTypeConfig::workflow();
    let providers = default_providers(&config);
    let source = workflow_source(10, 20);
    let tree = parse(&source).tree;
    let mut registry = Registry::new("file:///bench.flow");
    let mut metadata = ModelMetadata::new();
    {
        let mut ctx = ConversionContext::new(&config, &providers, &mut registry, &mut metadata);
        convert(&tree, &mut ctx);
    }

    c.bench_function("convert_warm_registry", |b| {
        b.iter(|| {
            let mut ctx = ConversionContext::new(&config, &providers, &mut registry, &mut metadata);
            convert(black_box(&tree), &mut ctx)
        })
    });
}

fn parse_and_convert(c: &mut Criterion) {
    let config = DiagramTypeConfig::workflow();
    let providers = default_providers(&config);
    let source = workflow_source(4, 8);
    let mut registry = Registry::new("file:///bench.flow");
    let mut metadata = ModelMetadata::new();

    c.bench_function("parse_and_convert_small", |b| {
        b.iter(|| {
            let tree = parse(black_box(&source)).tree;
            let mut ctx = ConversionContext::new(&config, &providers, &mut registry, &mut metadata);
            convert(&tree, &mut ctx).model
        })
    });
}

criterion_group!(benches, convert_fresh, convert_warm, convert_wide, parse_and_convert);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use event_stream_config::{Settings, StreamConfigEntries, StreamConfigRegistry};
use serde_json::{json, Value};

const LITERAL_STREAMS: usize = 200;
const PATTERN_STREAMS: usize = 20;

fn build_registry() -> StreamConfigRegistry {
    let mut entries = StreamConfigEntries::new();
    for idx in 0..LITERAL_STREAMS {
        let service = if idx % 2 == 0 {
            "eventgate-main"
        } else {
            "eventgate-analytics"
        };
        entries.insert(
            format!("bench.stream.{idx}"),
            json!({
                "schema_title": format!("bench/stream/{idx}"),
                "destination_event_service": service,
                "sample": {"rate": 0.5, "unit": "session"}
            }),
        );
    }
    for idx in 0..PATTERN_STREAMS {
        entries.insert(
            format!(r"/^bench\.job{idx}\..+/"),
            json!({"schema_title": "bench/job", "destination_event_service": "eventgate-main"}),
        );
    }

    let defaults = match json!({"topic_prefixes": ["eqiad.", "codfw."]}) {
        Value::Object(map) => map,
        _ => Settings::new(),
    };
    StreamConfigRegistry::new(&entries, &defaults).expect("bench registry")
}

fn bench_registry_lookup(c: &mut Criterion) {
    let registry = build_registry();

    let literal_targets: Vec<String> = (0..50)
        .map(|idx| format!("bench.stream.{}", idx * 3))
        .collect();
    let pattern_targets: Vec<String> = (0..50)
        .map(|idx| format!("bench.job{}.run-{idx}", idx % PATTERN_STREAMS))
        .collect();
    let constraints = json!({
        "destination_event_service": "eventgate-main",
        "sample": {"unit": "session"}
    });

    let mut group = c.benchmark_group("registry_lookup");
    group.throughput(Throughput::Elements(50));
    group.bench_with_input(
        BenchmarkId::new("literal", literal_targets.len()),
        &literal_targets,
        |b, targets| b.iter(|| registry.get(Some(black_box(targets.as_slice())), None)),
    );
    group.bench_with_input(
        BenchmarkId::new("pattern", pattern_targets.len()),
        &pattern_targets,
        |b, targets| b.iter(|| registry.get(Some(black_box(targets.as_slice())), None)),
    );
    group.finish();

    c.bench_function("registry_lookup/all_with_constraints", |b| {
        b.iter(|| registry.get::<String>(None, Some(black_box(&constraints))))
    });
}

criterion_group!(benches, bench_registry_lookup);
criterion_main!(benches);

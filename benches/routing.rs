//! Routing performance benchmarks
//!
//! Measures performance of non-I/O routing logic components (excludes network calls).
//!
//! ## Expected Performance Characteristics
//!
//! - Fuzzy scoring: low microseconds per pair (quadratic in string length)
//! - Knowledge base classification: one scoring pass over every entry
//! - Intent detection: sub-microsecond (one regex scan)
//!
//! **Note**: Actual measurements vary with compiler version, CPU architecture, and system load.
//!
//! Run with: `cargo bench`

use chatrelay::{
    knowledge::{KnowledgeBase, SupportInfo, fuzzy::token_sort_ratio, loader::parse_json},
    router::{CURRENT_MESSAGE_MARKER, extract_current_message, is_image_request},
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const SAMPLE_KNOWLEDGE_BASE: &str = include_str!("../data/questions_and_answers.json");

fn sample_knowledge_base() -> KnowledgeBase {
    let entries = parse_json(SAMPLE_KNOWLEDGE_BASE.as_bytes()).unwrap();
    KnowledgeBase::new(
        entries,
        SupportInfo::new("+355676038187", "support@baboon.al"),
    )
}

/// Benchmark the token-sort similarity score on its own
fn bench_token_sort_ratio(c: &mut Criterion) {
    let pairs = vec![
        ("short", ("track order", "How do I track my order?")),
        (
            "medium",
            (
                "can I change the delivery address after ordering",
                "Can I change my delivery address after placing an order?",
            ),
        ),
        (
            "unrelated",
            (
                "write me a poem about the sea at night",
                "What payment methods do you accept?",
            ),
        ),
    ];

    let mut group = c.benchmark_group("token_sort_ratio");

    for (name, (a, b)) in pairs {
        group.bench_with_input(BenchmarkId::from_parameter(name), &(a, b), |bench, (a, b)| {
            bench.iter(|| token_sort_ratio(black_box(a), black_box(b)));
        });
    }

    group.finish();
}

/// Benchmark classification against the full sample knowledge base
///
/// This is the per-message cost paid before any backend is contacted.
fn bench_classify(c: &mut Criterion) {
    let kb = sample_knowledge_base();
    let queries = vec![
        ("exact", "How do I track my order?"),
        ("partial", "track order"),
        ("miss", "tell me a story about dragons"),
    ];

    let mut group = c.benchmark_group("knowledge_base_classify");

    for (name, query) in queries {
        group.bench_with_input(BenchmarkId::from_parameter(name), &query, |b, q| {
            b.iter(|| kb.classify(black_box(q)));
        });
    }

    group.finish();
}

/// Benchmark current-message extraction and image intent detection
fn bench_intent_detection(c: &mut Criterion) {
    let framed = format!(
        "You are a helpful assistant.\nEarlier context goes here.\n{}\nimage: a lighthouse in a storm",
        CURRENT_MESSAGE_MARKER
    );

    c.bench_function("extract_and_detect_image", |b| {
        b.iter(|| is_image_request(extract_current_message(black_box(&framed))));
    });

    c.bench_function("detect_plain_text", |b| {
        b.iter(|| is_image_request(black_box("what is the capital of albania")));
    });
}

criterion_group!(
    benches,
    bench_token_sort_ratio,
    bench_classify,
    bench_intent_detection,
);
criterion_main!(benches);

//! Benchmarks for trigger scanning and the template codec.
//!
//! Scanning runs on every keystroke, so it has to stay well under a
//! millisecond even for long lines.

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use textplate::services::{TemplateCodec, derive_file_stem, scan_trigger};
use textplate::{Template, TemplateIndex};

const SHORT_LINE: &str = "See !!meet";
const NO_TRIGGER_LINE: &str = "Nothing to expand in this perfectly ordinary sentence at all";
const UNICODE_LINE: &str = "議事録のテンプレートは !!日本語";

fn long_line(words: usize) -> String {
    let mut line = "lorem ipsum ".repeat(words);
    line.push_str("!!meeting-notes");
    line
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("trigger_scan");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("short", |b| {
        b.iter(|| scan_trigger(black_box(SHORT_LINE), black_box(10)));
    });

    group.bench_function("no_trigger", |b| {
        b.iter(|| scan_trigger(black_box(NO_TRIGGER_LINE), black_box(60)));
    });

    group.bench_function("unicode", |b| {
        b.iter(|| scan_trigger(black_box(UNICODE_LINE), black_box(usize::MAX)));
    });

    for words in [10, 100, 1000] {
        let line = long_line(words);
        let cursor = line.chars().count();
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_with_input(BenchmarkId::new("long_line", words), &line, |b, line| {
            b.iter(|| scan_trigger(black_box(line), black_box(cursor)));
        });
    }

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_codec");

    let template = Template::new("Meeting notes", "## Attendees\n\n## Actions\n".repeat(20));
    let text = TemplateCodec::serialize(&template);

    group.bench_function("serialize", |b| {
        b.iter(|| TemplateCodec::serialize(black_box(&template)));
    });

    group.bench_function("deserialize", |b| {
        b.iter(|| TemplateCodec::deserialize(black_box(&text), "fallback"));
    });

    group.bench_function("derive_file_stem", |b| {
        b.iter(|| derive_file_stem(black_box("Daily: standup / retro <draft>")));
    });

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let index: TemplateIndex = (0..500)
        .map(|i| Template::new(format!("template-{i}"), "body"))
        .collect();

    c.bench_function("index_filter_500", |b| {
        b.iter(|| index.filter(black_box("PLATE-4")));
    });
}

criterion_group!(benches, bench_scan, bench_codec, bench_filter);
criterion_main!(benches);

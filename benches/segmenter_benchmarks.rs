//! Performance benchmarks for voxchat
//!
//! Run with: cargo bench
//! Or for specific benchmarks: cargo bench -- <filter>

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;
use voxchat::core::chat::parse_event_line;
use voxchat::core::segmenter::{Segmenter, SegmenterConfig};

const ENGLISH_REPLY: &str = "[happy]Hello there! It is a lovely day, isn't it? \
    [relaxed]Let's take a walk by the river and enjoy the breeze. \
    [sad]I wish it lasted longer... [neutral]Anyway, what would you like to do next?";

const CHINESE_REPLY: &str = "[happy]你好呀！今天天气真不错，我们出去走走吧。\
    [relaxed]河边的风很舒服，可以慢慢散步。[sad]可惜明天就要下雨了……\
    [neutral]你接下来想做什么呢？";

/// Split `text` into fragments of at most `size` chars, like a token stream.
fn chunk(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

fn segment(fragments: &[String]) -> usize {
    let mut segmenter = Segmenter::new(SegmenterConfig::default());
    let mut count = 0;
    for fragment in fragments {
        count += segmenter.push(fragment).len();
    }
    count + usize::from(segmenter.finish().is_some())
}

/// Benchmark segmentation at different fragment sizes
fn bench_segmenter(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmenter");
    group.measurement_time(Duration::from_secs(5));

    for (name, reply) in [("english", ENGLISH_REPLY), ("chinese", CHINESE_REPLY)] {
        group.throughput(Throughput::Bytes(reply.len() as u64));
        for size in [1, 4, 16] {
            let fragments = chunk(reply, size);
            group.bench_with_input(
                BenchmarkId::new(name, format!("{size}_chars")),
                &fragments,
                |b, fragments| b.iter(|| segment(black_box(fragments))),
            );
        }
    }

    // Long reply without terminals exercises the buffering path
    let long = chunk(&"word ".repeat(2_000), 8);
    group.bench_function("unterminated_long", |b| {
        b.iter(|| segment(black_box(&long)))
    });

    group.finish();
}

/// Benchmark SSE line classification
fn bench_sse_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("sse_parsing");

    let delta = r#"data: {"id":"chatcmpl-1","choices":[{"index":0,"delta":{"content":"你好"}}]}"#;
    let malformed = r#"data: {"choices":[{"delta":"#;

    group.bench_function("delta", |b| b.iter(|| parse_event_line(black_box(delta))));
    group.bench_function("done", |b| {
        b.iter(|| parse_event_line(black_box("data: [DONE]")))
    });
    group.bench_function("keep_alive", |b| {
        b.iter(|| parse_event_line(black_box(": keep-alive")))
    });
    group.bench_function("malformed", |b| {
        b.iter(|| parse_event_line(black_box(malformed)))
    });

    group.finish();
}

criterion_group!(benches, bench_segmenter, bench_sse_parsing);
criterion_main!(benches);

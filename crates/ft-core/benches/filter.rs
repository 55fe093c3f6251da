//! Filter pass benchmarks.
//!
//! Runs the tree filter over a synthetic search results page of increasing
//! size, with keyword and channel rules active.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ft_core::{
    ChannelFilter, ChannelIndex, ChannelMap, CompiledKeywords, FilterFlags, FilterState,
    KeywordFilter,
};
use serde_json::{json, Value};

fn video(i: usize) -> Value {
    json!({"richItemRenderer": {"content": {"videoRenderer": {
        "videoId": format!("vid{i:08}"),
        "title": {"runs": [{"text": format!("Video number {i} about cooking")}]},
        "descriptionSnippet": {"runs": [{"text": "A long enough description of the video"}]},
        "shortBylineText": {"runs": [{
            "text": format!("Channel {}", i % 50),
            "navigationEndpoint": {"browseEndpoint": {
                "browseId": format!("UC{:022}", i % 50),
                "canonicalBaseUrl": format!("/@channel{}", i % 50)
            }}
        }]}
    }}}})
}

fn page(items: usize) -> Value {
    let contents: Vec<Value> = (0..items)
        .map(|i| {
            if i % 10 == 0 {
                json!({"reelShelfRenderer": {"items": [
                    {"reelItemRenderer": {"videoId": format!("short{i}"), "headline": {"simpleText": "A short"}}}
                ]}})
            } else {
                video(i)
            }
        })
        .collect();

    json!({"contents": {"twoColumnBrowseResultsRenderer": {"tabs": [
        {"tabRenderer": {"content": {"richGridRenderer": {"contents": contents}}}}
    ]}}})
}

fn state() -> FilterState {
    let keywords: Vec<KeywordFilter> = ["spoiler", "giveaway", "reaction", "prank"]
        .into_iter()
        .map(|w| KeywordFilter::new(w, true))
        .chain([KeywordFilter::new("número 7", false)])
        .collect();
    let channels: Vec<ChannelFilter> = ["@channel3", "@channel17", "Channel 42"]
        .into_iter()
        .filter_map(ChannelFilter::from_legacy)
        .collect();
    let map: ChannelMap = [(format!("UC{:022}", 9), "@channel9".to_string())].into_iter().collect();

    FilterState {
        keywords: Arc::new(CompiledKeywords::compile(&keywords)),
        channels: Arc::new(ChannelIndex::build(&channels)),
        channel_map: Arc::new(map),
        flags: FilterFlags::HIDE_ALL_SHORTS,
    }
}

fn bench_filter_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/page");
    let state = state();

    for items in [20usize, 200, 1000] {
        let input = page(items);
        group.bench_with_input(BenchmarkId::from_parameter(items), &input, |b, input| {
            b.iter(|| state.filter(black_box(input)));
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/compile");
    let keywords: Vec<KeywordFilter> = (0..200).map(|i| KeywordFilter::new(format!("word{i}"), i % 2 == 0)).collect();
    let channels: Vec<ChannelFilter> = (0..200)
        .filter_map(|i| ChannelFilter::from_legacy(&format!("@handle{i}")))
        .collect();

    group.bench_function("keywords_200", |b| {
        b.iter(|| CompiledKeywords::compile(black_box(&keywords)));
    });
    group.bench_function("channels_200", |b| {
        b.iter(|| ChannelIndex::build(black_box(&channels)));
    });

    group.finish();
}

criterion_group!(benches, bench_filter_page, bench_compile);
criterion_main!(benches);

//! Per-drain hot path: token extraction and keyword canonicalization.

use adzerk_display::application::ImpressionTokenDecoder;
use adzerk_display::application::canonical_keywords;
use adzerk_display::infrastructure::ad_library::house_ad_markup;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

const DOMAIN: &str = "engine.adzerk.net";

fn keywords(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("K.Subreddit{}", count - i)).collect()
}

fn bench_token_decoding(c: &mut Criterion) {
    let decoder = ImpressionTokenDecoder::new(DOMAIN);
    let markup = house_ad_markup(DOMAIN, &keywords(8), "0f8b2c1e6d");
    let escaped = markup.replace('/', "\\/");

    let mut group = c.benchmark_group("impression_token");
    group.bench_function("plain_markup", |b| {
        b.iter(|| decoder.decode(black_box(&markup)));
    });
    group.bench_function("escaped_markup", |b| {
        b.iter(|| decoder.decode(black_box(&escaped)));
    });
    group.bench_function("no_pixel", |b| {
        b.iter(|| decoder.decode(black_box("<div class=\"ad\">house</div>")));
    });
    group.finish();
}

fn bench_keyword_canonicalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical_keywords");
    for count in [4, 32, 256] {
        let input = keywords(count);
        group.bench_function(format!("{count}_keywords"), |b| {
            b.iter(|| canonical_keywords(black_box(&input)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_token_decoding, bench_keyword_canonicalization);
criterion_main!(benches);

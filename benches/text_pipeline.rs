//! Text Pipeline Benchmarks
//!
//! Cost of the post-OCR steps that run on every request: tokenization,
//! spelling normalization and dictionary correction.
//!
//! Run with: `cargo bench --bench text_pipeline`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ocr_lexicon_server::lexicon::{tokenize, DictionaryCorrector, Vocabulary, WordTracker, DEFAULT_MIN_SIMILARITY};
use ocr_lexicon_server::text::SpellingNormalizer;

/// A page of typical archive text with some recognition noise
fn sample_page(paragraphs: usize) -> String {
    let paragraph = "SURAT KEPUTUSAN Kepala Djawatan Keuamgan nomor 12 tahun 1958 \
        tentang persewaan tanah di Kramat, dikeloearkan oleh Wedana \
        Kabupaten atas nama Menteri. Koperasl simpan pinjam tjatatan. ";
    paragraph.repeat(paragraphs)
}

fn bench_tokenize(c: &mut Criterion) {
    let page = sample_page(40);
    let tracker = WordTracker::new(Arc::new(Vocabulary::builtin()));

    let mut group = c.benchmark_group("tokenize");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("tokenize_page", |b| {
        b.iter(|| tokenize(black_box(&page)))
    });
    group.bench_function("unknown_tokens_page", |b| {
        b.iter(|| tracker.unknown_tokens(black_box(&page)))
    });

    group.finish();
}

fn bench_correction(c: &mut Criterion) {
    let page = sample_page(40);
    let corrector = DictionaryCorrector::new(Arc::new(Vocabulary::builtin()), DEFAULT_MIN_SIMILARITY);
    let approved: HashSet<String> = ["koperasi", "pinjam", "simpan"]
        .iter()
        .map(|w| w.to_string())
        .collect();

    let mut group = c.benchmark_group("correction");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(50);

    group.bench_function("correct_page", |b| {
        b.iter(|| corrector.correct(black_box(&page), &approved))
    });

    group.finish();
}

fn bench_spelling(c: &mut Criterion) {
    let page = sample_page(40);
    let normalizer = SpellingNormalizer::new();

    c.bench_function("normalize_spelling_page", |b| {
        b.iter(|| normalizer.normalize(black_box(&page)))
    });
}

criterion_group!(benches, bench_tokenize, bench_correction, bench_spelling);
criterion_main!(benches);

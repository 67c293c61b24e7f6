//! This bench test measures substring search across a large seeded catalog.

#![allow(missing_docs)]

use std::hint::black_box;

use circulation::{Isbn, Library};
use criterion::{Criterion, criterion_group, criterion_main};

/// Builds a catalog large enough that a scan dominates the measurement.
fn seed_library() -> Library {
    let mut library = Library::new("Bench Library");
    for i in 0..1_000 {
        let isbn = Isbn::new(&format!("978-0-00-{i:06}")).unwrap();
        library
            .add_title(
                &format!("Collected Essays, Volume {i}"),
                &format!("Author {}", i % 97),
                &isbn,
                3,
            )
            .unwrap();
    }
    library
}

fn catalog_search(c: &mut Criterion) {
    let library = seed_library();

    c.bench_function("search by title substring", |b| {
        b.iter(|| library.search(black_box("volume 9")).count());
    });

    c.bench_function("search with empty query", |b| {
        b.iter(|| library.search(black_box("")).count());
    });
}

criterion_group!(benches, catalog_search);
criterion_main!(benches);

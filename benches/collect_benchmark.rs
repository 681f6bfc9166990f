use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lexigraph::core::{sanitize, RelationshipType, Term, Triple};
use lexigraph::ingest::TripleCollector;

/// Synthetic lexical graph: `words` entries, each with a hypernym, a part of speech and a label.
fn lexicon(words: usize) -> Vec<Triple> {
    let mut triples = Vec::with_capacity(words * 3);
    for i in 0..words {
        let word = format!("http://ex.org/words/w{}", i);
        triples.push(Triple::new(
            Term::iri(&word),
            "https://en-word.net/ontology#hypernym",
            Term::iri(format!("http://ex.org/words/w{}", i / 10)),
        ));
        triples.push(Triple::new(
            Term::iri(&word),
            "https://en-word.net/ontology#partOfSpeech",
            Term::iri(format!("https://en-word.net/ontology#pos{}", i % 4)),
        ));
        triples.push(Triple::new(
            Term::iri(&word),
            "http://www.w3.org/2000/01/rdf-schema#label",
            Term::literal(format!("word {}", i)),
        ));
    }
    triples
}

fn bench_collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect");
    for words in [1_000usize, 10_000, 100_000] {
        let triples = lexicon(words);
        group.throughput(Throughput::Elements(triples.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(triples.len()), &triples, |b, triples| {
            b.iter(|| {
                let collection = TripleCollector::new(0).collect(triples.iter().cloned(), None);
                black_box(collection.nodes.len())
            });
        });
    }
    group.finish();
}

fn bench_sanitize(c: &mut Criterion) {
    let predicates = [
        "https://en-word.net/ontology#partOfSpeech",
        "http://ex.org/2025-updated:flag",
        "http://www.w3.org/1999/02/22-rdf-syntax-ns#type",
        "urn:isbn:0451450523",
    ];
    c.bench_function("relationship_type", |b| {
        b.iter(|| {
            for predicate in predicates {
                black_box(RelationshipType::from_predicate(black_box(predicate)));
            }
        });
    });
    c.bench_function("sanitize_unicode", |b| b.iter(|| black_box(sanitize(black_box("größe der Welt-2")))));
}

criterion_group!(benches, bench_collect, bench_sanitize);
criterion_main!(benches);

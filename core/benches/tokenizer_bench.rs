use concord_core::parser::parse_chapters;
use concord_core::tokenizer::tokenize;
use criterion::{criterion_group, criterion_main, Criterion};

fn sample_book(chapters: usize, verses: usize) -> String {
    let mut text = String::new();
    for c in 1..=chapters {
        text.push_str(&format!("Genesis.{c}\n"));
        for v in 1..=verses {
            text.push_str(&format!("[{v}] And God said, Let there be light: and there was light.\n"));
        }
    }
    text
}

fn bench_tokenize(c: &mut Criterion) {
    let verse = "And the earth was without form, and void; and darkness was upon the face of the deep.";
    c.bench_function("tokenize_verse", |b| b.iter(|| tokenize(verse)));
}

fn bench_parse(c: &mut Criterion) {
    let book = sample_book(50, 30);
    c.bench_function("parse_book_50x30", |b| b.iter(|| parse_chapters(&book)));
}

criterion_group!(benches, bench_tokenize, bench_parse);
criterion_main!(benches);

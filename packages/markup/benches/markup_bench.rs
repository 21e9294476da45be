use criterion::{black_box, criterion_group, criterion_main, Criterion};
use redline_markup::{parse, serialize};

fn parse_short_review(c: &mut Criterion) {
    let source = "# Draft\nThe {~~quick~>swift~~}{>>verify tone<<} fox \
                  {--really --}jumps {++again ++}over the {==lazy==} dog.";

    c.bench_function("parse_short_review", |b| b.iter(|| parse(black_box(source))));
}

fn parse_long_review(c: &mut Criterion) {
    // Simulate a document after a full review pass
    let mut source = String::new();
    source.push_str("Changes: 60\nCommented: 20\nUncommented: 40\n\n");

    for i in 0..20 {
        source.push_str(&format!("## Section {}\n", i));
        source.push_str(&format!(
            "Paragraph {} keeps most of its text but {{--loses a phrase--}}\
             {{>>reviewer {} asked for this<<}} and {{++gains another++}} \
             while one term is {{~~swapped~>replaced~~}} mid-sentence.\n",
            i, i
        ));
        source.push_str("An untouched paragraph sits between the edits.\n");
    }

    c.bench_function("parse_long_review", |b| b.iter(|| parse(black_box(&source))));
}

fn serialize_long_review(c: &mut Criterion) {
    let mut source = String::new();
    for i in 0..20 {
        source.push_str(&format!(
            "Line {} with {{--cuts--}} and {{++adds++}} and {{==marks==}}\n",
            i
        ));
    }
    let parsed = parse(&source);

    c.bench_function("serialize_long_review", |b| {
        b.iter(|| serialize(black_box(&parsed.document), black_box(&parsed.comments)))
    });
}

fn tokenize_only(c: &mut Criterion) {
    use redline_markup::tokenizer::tokenize_line;

    let line = "prefix {--deleted--}{>>first note<<} middle {~~old~>new~~} \
                suffix {++inserted++} and {==highlighted==} text";

    c.bench_function("tokenize_only", |b| {
        b.iter(|| tokenize_line(black_box(line)))
    });
}

criterion_group!(
    benches,
    parse_short_review,
    parse_long_review,
    serialize_long_review,
    tokenize_only
);
criterion_main!(benches);

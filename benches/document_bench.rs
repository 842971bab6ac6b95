use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use crpt_api::document::{Description, Document, Product};

fn bench_encode_document(c: &mut Criterion) {
    let product = Product {
        certificate_document: "doc".to_string(),
        certificate_document_date: "2021-01-01".to_string(),
        certificate_document_number: "123".to_string(),
        owner_inn: "9988776655".to_string(),
        producer_inn: "5544332211".to_string(),
        production_date: "2021-01-01".to_string(),
        tnved_code: "0000".to_string(),
        uit_code: "1111".to_string(),
        uitu_code: "2222".to_string(),
    };

    // A realistic batch: one document declaring fifty products.
    let document = Document {
        description: Description { participant_inn: "0123456789".to_string() },
        doc_id: "123".to_string(),
        doc_status: "NEW".to_string(),
        doc_type: "LP_INTRODUCE_GOODS".to_string(),
        import_request: true,
        products: vec![product; 50],
        ..Default::default()
    };

    c.bench_function("encode_document", |b| b.iter(|| {
        serde_json::to_vec(black_box(&document))
    }));
}

criterion_group!(benches, bench_encode_document);
criterion_main!(benches);

use catalog_assist::ingest::{CatalogTable, PRODUCT_ID_COLUMN};
use criterion::{Criterion, criterion_group, criterion_main};
use std::fmt::Write;
use std::hint::black_box;

fn synthetic_catalog(rows: usize) -> String {
    let mut text =
        String::from("ProductID,ProductName,ProductCategory,ProductDescription,Price,Stock\n");
    for index in 0..rows {
        writeln!(
            text,
            "OM-{index},Product {index},Category {},\"Description of product {index}, with a comma\",{}.99,{}",
            index % 17,
            index % 90,
            index % 300
        )
        .expect("can write to string");
    }
    text
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = synthetic_catalog(5_000);

    c.bench_function("catalog_parse", |b| {
        b.iter(|| CatalogTable::parse(black_box(&text)))
    });

    let mut table = CatalogTable::parse(&text).expect("synthetic catalog parses");
    table.derive_search_text();
    c.bench_function("catalog_documents", |b| {
        b.iter(|| {
            table
                .rows()
                .iter()
                .map(|row| table.to_document(black_box(row), PRODUCT_ID_COLUMN))
                .collect::<Result<Vec<_>, _>>()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

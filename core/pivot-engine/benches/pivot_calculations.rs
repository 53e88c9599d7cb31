use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dash_engine::cell::{row, CellValue, Row};
use pivot_engine::{build_pivot_tree, flatten, PivotDefinition, PivotDimension, SortOrder};

const REGIONS: usize = 20;
const PRODUCTS: usize = 50;
const MONTHS: usize = 12;

fn create_definition() -> PivotDefinition {
    PivotDefinition::new()
        .with_dimension(PivotDimension::new("region"))
        .with_dimension(PivotDimension::new("product").sorted(SortOrder::Descending))
        .with_dimension(PivotDimension::new("month"))
        .with_measure("sales")
        .with_measure("orders")
}

fn create_result_sets() -> Vec<Vec<Row>> {
    let cell = |v: usize| CellValue::Number(v as f64);
    let mut levels: Vec<Vec<Row>> = vec![Vec::new(), Vec::new(), Vec::new()];

    for r in 0..REGIONS {
        let region = CellValue::text(format!("Region {}", r));
        levels[0].push(row([("region", region.clone()), ("sales", cell(r * 1000)), ("orders", cell(r))]));
        for p in 0..PRODUCTS {
            let product = CellValue::text(format!("Product {}", p));
            levels[1].push(row([
                ("region", region.clone()),
                ("product", product.clone()),
                ("sales", cell(r * p)),
                ("orders", cell(p)),
            ]));
            for m in 0..MONTHS {
                levels[2].push(row([
                    ("region", region.clone()),
                    ("product", product.clone()),
                    ("month", CellValue::text(format!("2024-{:02}-01", m + 1))),
                    ("sales", cell(r + p + m)),
                    ("orders", cell(m)),
                ]));
            }
        }
    }
    levels
}

fn bench_build_tree(c: &mut Criterion) {
    let definition = create_definition();
    let result_sets = create_result_sets();

    c.bench_function("build_pivot_tree_3_levels_12k_rows", |b| {
        b.iter(|| {
            let tree = build_pivot_tree(black_box(&definition), black_box(&result_sets));
            black_box(tree)
        });
    });
}

fn bench_flatten(c: &mut Criterion) {
    let definition = create_definition();
    let result_sets = create_result_sets();
    let tree = build_pivot_tree(&definition, &result_sets).expect("build pivot tree");

    c.bench_function("flatten_pivot_tree", |b| {
        b.iter(|| black_box(flatten(black_box(&tree))));
    });
}

criterion_group!(benches, bench_build_tree, bench_flatten);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use duke_frame_core::{Column, Table, Value};
use duke_frame_formula::{compile, evaluate};

fn sales_table(rows: usize) -> Table {
    let revenue = (0..rows).map(|i| Value::Float(100.0 + (i % 97) as f64 * 1.5));
    let growth = (0..rows).map(|i| {
        if i % 11 == 0 {
            Value::Null
        } else {
            Value::Float((i % 13) as f64 / 100.0)
        }
    });
    let region = (0..rows).map(|i| Value::string(["North", "South", "East", "West"][i % 4]));

    Table::from_columns(vec![
        Column::new("Revenue", revenue.collect()),
        Column::new("Revenue Growth", growth.collect()),
        Column::new("Sales Region", region.collect()),
    ])
    .unwrap()
}

const FORMULAS: &[(&str, &str)] = &[
    ("arithmetic", "Revenue * (1 + Revenue Growth) - 10"),
    ("row_sum", "SUM(Revenue, Revenue Growth, 1)"),
    ("zscore", "ZSCORE(Revenue)"),
    ("rolling", "ROLLING_AVG(Revenue, 7)"),
    ("map", "MAP(Sales Region, {'North': 1, 'South': 2})"),
    ("conditional", "IF(GT(Revenue, 150), 'high', 'low')"),
];

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for rows in [1_000, 100_000] {
        let table = sales_table(rows);
        group.throughput(Throughput::Elements(rows as u64));

        for (name, formula) in FORMULAS {
            group.bench_with_input(BenchmarkId::new(*name, rows), &table, |b, table| {
                b.iter(|| evaluate(black_box(formula), table).unwrap())
            });
        }
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let columns: Vec<String> = (0..200).map(|i| format!("Metric {} (USD)", i)).collect();
    let formula = "Metric 1 (USD) + Metric 10 (USD) * Metric 100 (USD) - Metric 199 (USD)";

    c.bench_function("compile_wide_schema", |b| {
        b.iter(|| compile(black_box(formula), columns.iter().map(String::as_str)).unwrap())
    });
}

criterion_group!(benches, bench_evaluate, bench_compile);
criterion_main!(benches);

//! Benchmarks for Insight query validation and execution
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use insight::dataset::{Dataset, DatasetStore, Kind, Record, Section};
use insight::query::{QueryExecutor, QueryValidator};
use serde_json::{json, Value};

const DEPTS: [&str; 6] = ["cpsc", "math", "biol", "crwr", "phys", "chem"];

fn create_test_store(count: usize) -> DatasetStore {
    let records: Vec<Record> = (0..count)
        .map(|i| {
            Record::from(Section {
                uuid: i.to_string(),
                id: format!("{}", 100 + i % 400),
                title: format!("course {}", i % 400),
                instructor: format!("instructor {}", i % 97),
                dept: DEPTS[i % DEPTS.len()].to_string(),
                year: (1900 + i % 120) as f64,
                avg: 50.0 + (i % 5000) as f64 / 100.0,
                pass: (i % 200) as f64,
                fail: (i % 20) as f64,
                audit: (i % 3) as f64,
            })
        })
        .collect();

    let mut store = DatasetStore::new();
    store
        .add(Dataset::new("sections", Kind::Sections, records).unwrap())
        .unwrap();
    store
}

fn filter_query() -> Value {
    json!({
        "WHERE": {
            "AND": [
                {"GT": {"sections_avg": 97}},
                {"NOT": {"IS": {"sections_dept": "c*"}}},
                {"OR": [{"EQ": {"sections_year": 2015}}, {"LT": {"sections_fail": 5}}]}
            ]
        },
        "OPTIONS": {
            "COLUMNS": ["sections_dept", "sections_id", "sections_avg"],
            "ORDER": {"dir": "DOWN", "keys": ["sections_avg", "sections_id"]}
        }
    })
}

fn group_query() -> Value {
    json!({
        "WHERE": {},
        "OPTIONS": {
            "COLUMNS": ["sections_dept", "sections_year", "avgGrade", "sections"],
            "ORDER": {"dir": "UP", "keys": ["sections_dept", "avgGrade"]}
        },
        "TRANSFORMATIONS": {
            "GROUP": ["sections_dept", "sections_year"],
            "APPLY": [
                {"avgGrade": {"AVG": "sections_avg"}},
                {"sections": {"COUNT": "sections_uuid"}}
            ]
        }
    })
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");
    let store = create_test_store(10);
    let validator = QueryValidator::new(&store);

    let filter = filter_query();
    group.bench_function("filter_query", |b| {
        b.iter(|| validator.validate(black_box(&filter)).unwrap())
    });

    let grouped = group_query();
    group.bench_function("group_query", |b| {
        b.iter(|| validator.validate(black_box(&grouped)).unwrap())
    });

    group.finish();
}

fn bench_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("execution");
    let executor = QueryExecutor::new(usize::MAX);

    for size in [1_000, 10_000, 60_000] {
        let store = create_test_store(size);
        let validator = QueryValidator::new(&store);
        let filter_plan = validator.validate(&filter_query()).unwrap();
        let group_plan = validator.validate(&group_query()).unwrap();

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("filter_{}", size), |b| {
            b.iter(|| executor.execute(black_box(&filter_plan), &store).unwrap())
        });

        group.bench_function(format!("group_{}", size), |b| {
            b.iter(|| executor.execute(black_box(&group_plan), &store).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_validation, bench_execution);
criterion_main!(benches);

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use scoop::{Cond, Dialect};
use std::collections::BTreeMap;

/// `col0 = ? AND col1 = ? ...` built through the comparison helpers.
fn build_cond(dialect: Dialect, n: usize) -> Cond {
    let mut cond = Cond::new(dialect);
    for i in 0..n {
        cond = cond.eq(&format!("col{i}"), i as i64);
    }
    cond
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("cond/build");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_cond(Dialect::MySql, n).to_sql()));
        });
    }

    group.finish();
}

fn bench_map_clause(c: &mut Criterion) {
    let mut group = c.benchmark_group("cond/map_clause");

    for n in [5, 20, 100] {
        let map: BTreeMap<String, i64> = (0..n).map(|i| (format!("col{i}"), i)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &map, |b, map| {
            b.iter(|| black_box(Cond::new(Dialect::Sqlite).where_(map.clone()).to_sql()));
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("cond/in_list");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| black_box(Cond::new(Dialect::Postgres).in_list("id", values).to_sql()));
        });
    }

    group.finish();
}

fn bench_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("cond/finalize_postgres");

    for n in [1, 10, 100] {
        let sql = build_cond(Dialect::Postgres, n).to_sql();
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| black_box(Dialect::Postgres.finalize(sql).into_owned()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_map_clause, bench_in_list, bench_finalize);
criterion_main!(benches);

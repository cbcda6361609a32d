//! Benchmarks for the pure translation layers

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use redis_compat::translate::{params, results};
use redis_compat_core::{CallerValue, DriverReply, ScoredMember};

fn bench_params(c: &mut Criterion) {
    let flat: Vec<CallerValue> = (0..64)
        .map(|i| CallerValue::from(format!("value-{i}")))
        .collect();
    c.bench_function("flat_args/64", |b| {
        b.iter(|| params::flat_args(black_box(&flat)))
    });

    let pairs: Vec<CallerValue> = (0..32)
        .flat_map(|i| {
            [
                CallerValue::from(i as f64 + 0.5),
                CallerValue::from(format!("member-{i}")),
            ]
        })
        .collect();
    c.bench_function("score_member_args/32", |b| {
        b.iter(|| params::score_member_args(black_box(&pairs)).unwrap())
    });

    let map = vec![CallerValue::Map(
        (0..32)
            .map(|i| (format!("field-{i}"), CallerValue::from(i as i64)))
            .collect(),
    )];
    c.bench_function("field_map_args/32", |b| {
        b.iter(|| params::field_map_args(black_box(&map)).unwrap())
    });
}

fn bench_results(c: &mut Criterion) {
    let scored = DriverReply::Scored(
        (0..64)
            .map(|i| ScoredMember::new(format!("member-{i}"), i as f64 * 1.5))
            .collect(),
    );
    c.bench_function("caller_reply/scored-64", |b| {
        b.iter(|| results::caller_reply(black_box(scored.clone())))
    });

    c.bench_function("format_double", |b| {
        b.iter(|| {
            results::format_double(black_box(1.5));
            results::format_double(black_box(9007199254740991.0));
            results::format_double(black_box(f64::INFINITY));
        })
    });
}

criterion_group!(benches, bench_params, bench_results);
criterion_main!(benches);

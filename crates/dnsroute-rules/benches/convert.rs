//! Benchmarks for rule-list conversion.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use dnsroute_rules::{RuleSetMatcher, convert_document, normalize_line};

fn clash_document(n: usize) -> String {
    (0..n)
        .map(|i| match i % 4 {
            0 => format!("DOMAIN-SUFFIX,site{i}.com"),
            1 => format!("DOMAIN,www.site{i}.net"),
            2 => format!("DOMAIN-KEYWORD,kw{i}"),
            _ => format!("IP-CIDR,10.{}.0.0/16,no-resolve", i % 256),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn wildcard_document(n: usize) -> String {
    (0..n)
        .map(|i| match i % 3 {
            0 => format!("+.site{i}.com"),
            1 => format!(".site{i}.org"),
            _ => format!("*.site{i}.net"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_document");
    for n in [100, 1_000, 10_000] {
        let clash = clash_document(n);
        group.throughput(Throughput::Bytes(clash.len() as u64));
        group.bench_with_input(BenchmarkId::new("clash", n), &clash, |b, text| {
            b.iter(|| convert_document(black_box(text)))
        });

        let wildcard = wildcard_document(n);
        group.bench_with_input(BenchmarkId::new("wildcard", n), &wildcard, |b, text| {
            b.iter(|| convert_document(black_box(text)))
        });
    }
    group.finish();
}

fn bench_normalize_line(c: &mut Criterion) {
    let lines = [
        "DOMAIN-SUFFIX,example.com,Proxy",
        "domain:example.com",
        "*.example.com",
        "2001:db8::/32",
    ];
    let mut group = c.benchmark_group("normalize_line");
    for line in lines {
        group.bench_with_input(BenchmarkId::from_parameter(line), line, |b, l| {
            b.iter(|| normalize_line(black_box(l)))
        });
    }
    group.finish();
}

fn bench_matcher(c: &mut Criterion) {
    let converted = convert_document(&wildcard_document(10_000));
    let Ok(matcher) = RuleSetMatcher::build(&converted.rules) else {
        return;
    };

    c.bench_function("matcher_hit", |b| {
        b.iter(|| matcher.matches(black_box("a.site3.com")))
    });
    c.bench_function("matcher_miss", |b| {
        b.iter(|| matcher.matches(black_box("nothing.example")))
    });
}

criterion_group!(benches, bench_convert, bench_normalize_line, bench_matcher);
criterion_main!(benches);

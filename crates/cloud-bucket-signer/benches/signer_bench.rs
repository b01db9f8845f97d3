// Cloud Bucket - uniform object storage access
// Copyright (C) 2025 Cloud Bucket Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
#![allow(clippy::unwrap_used)]
//! URL signing benchmarks
//!
//! Measures:
//! - One-off policy and HMAC signing (key parsed on every call)
//! - Amortized signing of many paths below a wildcard base

use cloud_bucket_signer::{sign_url, url_signer, SignUrlOptions, SigningScheme};
use std::hint::black_box;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const PKCS1_KEY: &str = include_str!("../tests/fixtures/test_key_pkcs1.pem");
const HMAC_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZg==";
const EXPIRES: u64 = 1_700_000_000;

fn policy_opts() -> SignUrlOptions {
    SignUrlOptions::new(SigningScheme::Policy, "K2JCJMDEHXQW5F", PKCS1_KEY).expires_at(EXPIRES)
}

fn hmac_opts() -> SignUrlOptions {
    SignUrlOptions::new(SigningScheme::Hmac, "my-key", HMAC_KEY).expires_at(EXPIRES)
}

/// Benchmark single URL signing per scheme
fn bench_sign_url(c: &mut Criterion) {
    let mut group = c.benchmark_group("sign_url");
    let url = "https://cdn.example.com/videos/intro.mp4";

    let policy = policy_opts();
    group.bench_function("policy", |b| {
        b.iter(|| black_box(sign_url(black_box(url), &policy).unwrap()))
    });

    let hmac = hmac_opts();
    group.bench_function("hmac", |b| {
        b.iter(|| black_box(sign_url(black_box(url), &hmac).unwrap()))
    });

    group.finish();
}

/// Benchmark signing batches of paths with a reusable signer
fn bench_url_signer(c: &mut Criterion) {
    let mut group = c.benchmark_group("url_signer");

    for count in [10usize, 100] {
        let paths: Vec<String> = (0..count).map(|i| format!("clip-{i}.mp4")).collect();
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("policy_wildcard", count), &paths, |b, paths| {
            b.iter(|| {
                let signer = url_signer("https://cdn.example.com/videos/*", &policy_opts()).unwrap();
                for path in paths {
                    black_box(signer.sign(path).unwrap());
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("hmac", count), &paths, |b, paths| {
            b.iter(|| {
                let signer = url_signer("https://cdn.example.com/videos/", &hmac_opts()).unwrap();
                for path in paths {
                    black_box(signer.sign(path).unwrap());
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sign_url, bench_url_signer);
criterion_main!(benches);

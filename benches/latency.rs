//! Latency benchmarks for request-path operations.
//!
//! Run with: `cargo bench --bench latency`

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use fulfillment_core::testing::template_pdf;
use plans_fulfillment::core::{WatermarkRenderer, WatermarkSpec};
use plans_fulfillment::signing::{Signer, UrlSigner};

fn spec() -> WatermarkSpec {
    WatermarkSpec {
        order_id: "1001".to_string(),
        customer_email: "a@example.com".to_string(),
        customer_name: Some("Ada Carpenter".to_string()),
        issued_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    }
}

/// Benchmark webhook signature checks for typical body sizes.
fn bench_webhook_signature(c: &mut Criterion) {
    let mut group = c.benchmark_group("webhook_signature");
    let signer = Signer::new("whsec_benchmark");

    for size in [512usize, 4 * 1024, 64 * 1024].iter() {
        let body = vec![b'x'; *size];
        let signature = signer.sign(&body).unwrap();

        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("sign", size), &body, |b, body| {
            b.iter(|| signer.sign(black_box(body)))
        });
        group.bench_with_input(BenchmarkId::new("verify", size), &body, |b, body| {
            b.iter(|| signer.verify(black_box(body), black_box(&signature)))
        });
    }

    group.finish();
}

/// Benchmark signed URL issue and redemption checks.
fn bench_signed_url(c: &mut Criterion) {
    let mut group = c.benchmark_group("signed_url");
    let signer = UrlSigner::new("url_benchmark", Duration::seconds(3600));
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let token = signer.issue("chairs/adirondack.glb", now).unwrap();
    let expires = token.expires_at_ms.to_string();

    group.bench_function("issue", |b| {
        b.iter(|| signer.issue(black_box("chairs/adirondack.glb"), now))
    });
    group.bench_function("verify", |b| {
        b.iter(|| {
            signer.verify(
                black_box("chairs/adirondack.glb"),
                Some(expires.as_str()),
                Some(token.signature.as_str()),
                now,
            )
        })
    });

    group.finish();
}

/// Benchmark watermark rendering by page count.
fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("watermark_render");
    group.sample_size(20);
    let renderer = WatermarkRenderer::default();
    let spec = spec();

    for pages in [1usize, 10, 50].iter() {
        let template = template_pdf(&vec![(612.0, 792.0); *pages]);

        group.throughput(Throughput::Elements(*pages as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pages), &template, |b, template| {
            b.iter(|| renderer.render(black_box(template), &spec))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_webhook_signature, bench_signed_url, bench_render);
criterion_main!(benches);

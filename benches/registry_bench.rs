//! Benchmarks for the handle registry and hot buffer paths

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use fatstd::bytes::BytesBuffer;
use fatstd::codec::compress::{self, Format};
use fatstd::HandleRegistry;

/// Register then release one string per iteration
fn bench_register_release(c: &mut Criterion) {
    let reg = HandleRegistry::new();

    c.bench_function("register_release", |b| {
        b.iter(|| {
            let h = reg.register(String::from("payload"));
            black_box(reg.release::<String>(h));
        })
    });
}

/// Typed lookups against a populated table
fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for &live in &[16usize, 1024, 65536] {
        let reg = HandleRegistry::new();
        let handles: Vec<_> = (0..live).map(|i| reg.register(i.to_string())).collect();
        let target = handles[live / 2];

        group.bench_function(format!("{}_live", live), |b| {
            b.iter(|| black_box(reg.resolve::<String>(black_box(target))))
        });
    }

    group.finish();
}

/// Lookups from several threads sharing one registry
fn bench_contended_resolve(c: &mut Criterion) {
    let reg = Arc::new(HandleRegistry::new());
    let h = reg.register(vec![0u8; 64]);

    c.bench_function("contended_resolve_4_threads", |b| {
        b.iter(|| {
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    let reg = Arc::clone(&reg);
                    std::thread::spawn(move || {
                        for _ in 0..256 {
                            black_box(reg.resolve::<Vec<u8>>(h));
                        }
                    })
                })
                .collect();
            for w in workers {
                let _ = w.join();
            }
        })
    });
}

/// Buffer write and drain
fn bench_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("bytes_buffer");
    let chunk = vec![b'x'; 4096];
    group.throughput(Throughput::Bytes(chunk.len() as u64 * 16));

    group.bench_function("write_16x4k_then_read", |b| {
        b.iter(|| {
            let buf = BytesBuffer::new();
            for _ in 0..16 {
                buf.write(&chunk);
            }
            let mut dst = [0u8; 8192];
            while !buf.read(&mut dst).eof {}
            black_box(buf.len())
        })
    });

    group.finish();
}

/// gzip over a compressible payload
fn bench_gzip(c: &mut Criterion) {
    let payload = "the quick brown fox ".repeat(4096).into_bytes();
    let mut group = c.benchmark_group("gzip");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("compress", |b| {
        b.iter(|| black_box(compress::compress(Format::Gzip, &payload)))
    });

    let packed = compress::compress(Format::Gzip, &payload).unwrap();
    group.bench_function("decompress", |b| {
        b.iter(|| black_box(compress::decompress(Format::Gzip, &packed)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_register_release,
    bench_resolve,
    bench_contended_resolve,
    bench_buffer,
    bench_gzip,
);
criterion_main!(benches);

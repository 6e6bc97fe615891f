//! Producer-path benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use irq_log::{irq_log, AsyncIrqLog, LogConfig, RingBuffer};

fn ring_push_pop(c: &mut Criterion) {
    let mut ring = RingBuffer::with_capacity(2048).unwrap();
    let mut out = [0u8; 128];
    let message = b"gpio irq 12 level=1 ts=0001234567";

    c.bench_function("ring_push_pop_34b", |b| {
        b.iter(|| {
            ring.push_frame(black_box(message)).unwrap();
            black_box(ring.pop_frame(&mut out));
        })
    });
}

fn transport_enqueue(c: &mut Criterion) {
    let log = AsyncIrqLog::new(LogConfig::burst(), |msg: &[u8]| {
        black_box(msg);
    })
    .unwrap();
    log.init().unwrap();

    c.bench_function("enqueue_raw", |b| {
        b.iter(|| {
            let _ = log.enqueue(black_box(b"sdio rx 512 bytes"));
        })
    });

    c.bench_function("enqueue_formatted", |b| {
        b.iter(|| {
            let _ = irq_log!(log, "sdio rx {} bytes on fn {}", black_box(512), black_box(1));
        })
    });

    log.deinit().unwrap();
}

criterion_group!(benches, ring_push_pop, transport_enqueue);
criterion_main!(benches);

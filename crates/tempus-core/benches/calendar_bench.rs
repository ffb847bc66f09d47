use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tempus_core::calendar::{decode, encode};

fn bench_encode(c: &mut Criterion) {
    c.bench_function("calendar_encode", |b| {
        b.iter(|| {
            let mut epoch: i64 = 0;
            while epoch < 1 << 31 {
                black_box(encode(black_box(epoch)));
                epoch += 99_999_989;
            }
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let samples: Vec<_> = (0..32).map(|i| encode(i * 66_000_000)).collect();
    c.bench_function("calendar_decode", |b| {
        b.iter(|| {
            for t in &samples {
                let mut t = *t;
                black_box(decode(black_box(&mut t)).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);

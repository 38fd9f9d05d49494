use criterion::{criterion_group, criterion_main};

use nektar_vox::policy::CombinePolicy;
use nektar_vox::volume::Volume;

fn criterion_benchmark(c: &mut criterion::Criterion) {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let side = 64i64;
    let mut volume: Volume<f32> = Volume::new(3, 2, 3, 0.0);
    for _ in 0..100_000 {
        volume
            .set(rng.gen_range(0..side), rng.gen_range(0..side), rng.gen_range(0..side), rng.gen_range(0.0..1.0))
            .expect("set to succeed");
    }

    c.bench_function("volume set", |b| {
        b.iter(|| {
            volume
                .set(
                    rng.gen_range(0..side),
                    rng.gen_range(0..side),
                    rng.gen_range(0..side),
                    rng.gen_range(0.0..1.0),
                )
                .ok()
        });
    });

    c.bench_function("volume update", |b| {
        b.iter(|| {
            volume
                .update(
                    rng.gen_range(0..side),
                    rng.gen_range(0..side),
                    rng.gen_range(0..side),
                    rng.gen_range(0.0..1.0),
                    CombinePolicy::Add,
                )
                .ok()
        });
    });

    c.bench_function("volume get", |b| {
        b.iter(|| {
            volume.get(rng.gen_range(0..side), rng.gen_range(0..side), rng.gen_range(0..side))
        });
    });

    #[cfg(feature = "bytecode")]
    {
        use bendy::decoding::FromBencode;
        use bendy::encoding::ToBencode;

        c.bench_function("volume encode", |b| {
            b.iter(|| volume.to_bencode().unwrap());
        });

        let bytes = volume.to_bencode().unwrap();
        c.bench_function("volume decode", |b| {
            b.iter(|| Volume::<f32>::from_bencode(&bytes).unwrap());
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

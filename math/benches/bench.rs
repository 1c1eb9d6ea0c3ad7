use criterion::{Criterion, black_box, criterion_group, criterion_main};
use kestrel_math::{FieldElement, PrimeField, SmallFieldElement};
use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand_chacha::{ChaCha8Rng, rand_core::SeedableRng};

const ITERS: usize = 1024;

fn secp256k1_field() -> PrimeField {
    let p = (BigUint::one() << 256u32) - (BigUint::one() << 32u32) - BigUint::from(977u32);
    PrimeField::new(p).unwrap()
}

fn bench_prime_field(c: &mut Criterion) {
    let field = secp256k1_field();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let one: Vec<_> = (0..ITERS).map(|_| field.reduce(&rng.gen_biguint(256))).collect();
    let two: Vec<_> = (0..ITERS).map(|_| field.reduce(&rng.gen_biguint(256))).collect();
    let exponent = rng.gen_biguint(256);

    let mut group = c.benchmark_group("prime field");
    group.bench_function("addition", |b| {
        b.iter(|| {
            for (a, b) in one.iter().zip(two.iter()) {
                black_box(a.add(b));
            }
        });
    });
    group.bench_function("multiplication", |b| {
        b.iter(|| {
            for (a, b) in one.iter().zip(two.iter()) {
                black_box(a.mul(b));
            }
        });
    });
    group.bench_function("division", |b| {
        b.iter(|| {
            for (a, b) in one.iter().zip(two.iter()).take(64) {
                black_box(a.div(b));
            }
        });
    });
    group.bench_function("pow", |b| {
        b.iter(|| {
            for a in one.iter().take(64) {
                black_box(a.pow(&exponent));
            }
        });
    });
    group.finish();
}

fn bench_small_field(c: &mut Criterion) {
    let elements: Vec<_> = (1..223).map(|v| SmallFieldElement::new(v, 223).unwrap()).collect();
    c.bench_function("small field division", |b| {
        b.iter(|| {
            for (a, b) in elements.iter().zip(elements.iter().rev()) {
                black_box(a.div(b));
            }
        });
    });
}

criterion_group!(benches, bench_prime_field, bench_small_field);
criterion_main!(benches);

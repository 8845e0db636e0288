use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{
    mine::find_proof_parallel,
    pow::{find_proof, valid_proof},
    Ledger, LedgerConfig,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn bench_pow(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let seeds: Vec<u64> = (0..16).map(|_| rng.gen_range(0..1_000_000)).collect();
    let config = LedgerConfig::with_difficulty(4);

    c.bench_function("find_proof_difficulty_4", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % seeds.len();
            find_proof(seeds[i], &config)
        });
    });

    c.bench_function("find_proof_parallel_difficulty_4", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % seeds.len();
            find_proof_parallel(seeds[i], &config)
        });
    });

    c.bench_function("valid_proof", |b| {
        b.iter(|| valid_proof(100, 35293, &config));
    });

    c.bench_function("mine_block_with_100_txs_difficulty_3", |b| {
        let ledger = Ledger::new(LedgerConfig::with_difficulty(3)).expect("valid config");
        b.iter(|| {
            for i in 0..100 {
                ledger.add_transaction(format!("alice-{i} pays bob"));
            }
            ledger.mine()
        });
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);

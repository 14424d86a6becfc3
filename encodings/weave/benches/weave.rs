#![allow(clippy::unwrap_used)]

use divan::Bencher;
use ovt_weave::{unweave_2d, unweave_3d, weave_2d, weave_3d};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() {
    divan::main();
}

#[divan::bench(args = [1_024, 65_536])]
fn weave_unweave_2d(bencher: Bencher, len: usize) {
    let mut rng = StdRng::seed_from_u64(0);
    let pairs = (0..len)
        .map(|_| (rng.random_range(0..8192_u32), rng.random_range(0..8192_u32)))
        .collect::<Vec<_>>();
    bencher.bench(|| {
        pairs
            .iter()
            .map(|&(a, b)| unweave_2d(weave_2d(a, b)).0)
            .sum::<u32>()
    });
}

#[divan::bench(args = [1_024, 65_536])]
fn weave_unweave_3d(bencher: Bencher, len: usize) {
    let mut rng = StdRng::seed_from_u64(0);
    let triples = (0..len)
        .map(|_| {
            (
                rng.random_range(0..8192_u32),
                rng.random_range(0..8192_u32),
                rng.random_range(0..8192_u32),
            )
        })
        .collect::<Vec<_>>();
    bencher.bench(|| {
        triples
            .iter()
            .map(|&(a, b, c)| unweave_3d(weave_3d(a, b, c)).2)
            .sum::<u32>()
    });
}

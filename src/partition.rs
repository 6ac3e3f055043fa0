use bitvec::prelude::BitVec;
use rayon::ThreadPool;

use crate::error::{ModelError, Result};
use crate::neighbors::Neighborhood;
use crate::system::SpinSystem;

/// Largest active spin count the enumerator accepts.
pub const MAX_ENUMERATED_SPINS: usize = 63;

/// Exact partition function: the sum of `exp(-βH)` over every assignment
/// of the active spins, found by branching on each active site in turn.
///
/// The top `log2(threads) + 2` levels of the branching tree are forked onto
/// `pool`; deeper subtrees run on the worker that reached them.
pub fn partition_function<N: Neighborhood>(
    system: &SpinSystem<N>,
    pool: &ThreadPool,
) -> Result<f64> {
    let active = system.active_indices();
    if active.len() > MAX_ENUMERATED_SPINS {
        return Err(ModelError::TooManySpins {
            spins: active.len(),
        });
    }

    let fork_depth = usize::BITS as usize - pool.current_num_threads().leading_zeros() as usize + 1;

    let mut flips = system.flip_mask();
    let unflipped = system.effective_hamiltonian_masked(&flips).exp();

    Ok(pool.install(|| unflipped + branch(system, active, 0, &mut flips, fork_depth)))
}

/// Sum over every assignment of `active[k..]` that flips `active[k]`, plus
/// both continuations from `k + 1`. Leaves `flips` as it found it.
fn branch<N: Neighborhood>(
    system: &SpinSystem<N>,
    active: &[usize],
    k: usize,
    flips: &mut BitVec,
    fork_depth: usize,
) -> f64 {
    let Some(&site) = active.get(k) else {
        return 0.0;
    };

    flips.set(site, true);
    let mut z = system.effective_hamiltonian_masked(flips).exp();

    if fork_depth > 0 && k + 1 < active.len() {
        let mut kept = flips.clone();
        kept.set(site, false);
        let (with, without) = rayon::join(
            || branch(system, active, k + 1, flips, fork_depth - 1),
            || branch(system, active, k + 1, &mut kept, fork_depth - 1),
        );
        z += with + without;
        flips.set(site, false);
    } else {
        z += branch(system, active, k + 1, flips, 0);
        flips.set(site, false);
        z += branch(system, active, k + 1, flips, 0);
    }

    z
}

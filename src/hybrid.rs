use rand::Rng;
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::debug;

use crate::config::GroupUpdate;
use crate::metropolis::AcceptanceRule;
use crate::neighbors::Neighborhood;
use crate::system::SpinSystem;

/// Adapts the hybrid group size from step to step.
///
/// Each step reports the mean accepted energy change of the step before it.
/// The size halves (down to 1) when that mean more than doubled, did not
/// grow, or is zero; otherwise it doubles (up to the active spin count)
/// while the magnetization stays below half the spin count.
#[derive(Clone, Debug)]
pub struct GranularityController {
    spins_per_group: usize,
    n_spins: usize,
    previous: Option<f64>,
}

impl GranularityController {
    pub fn new(n_spins: usize, threads: usize) -> Self {
        Self {
            spins_per_group: (n_spins / threads.max(1)).max(1),
            n_spins,
            previous: None,
        }
    }

    #[inline(always)]
    pub fn spins_per_group(&self) -> usize {
        self.spins_per_group
    }

    pub fn adapt(&mut self, average: f64, magnetization: i64) -> usize {
        let growing_fast = self.previous.map_or(true, |p| average > 2.0 * p);
        let converging = self.previous.map_or(false, |p| average <= p);
        let stuck = average == 0.0;

        if self.spins_per_group > 1 && (growing_fast || converging || stuck) {
            self.spins_per_group = (self.spins_per_group / 2).max(1);
            debug!(spins_per_group = self.spins_per_group, "hybrid: finer granularity");
        } else if magnetization.unsigned_abs() < (self.n_spins / 2) as u64 {
            self.spins_per_group = (self.spins_per_group * 2).min(self.n_spins.max(1));
            debug!(spins_per_group = self.spins_per_group, "hybrid: coarser granularity");
        }

        self.previous = Some(average);
        self.spins_per_group
    }
}

/// Partition `pool` into groups of `size` sites drawn uniformly at random
/// without replacement. The last group takes whatever remains.
pub fn draw_groups(mut pool: Vec<usize>, size: usize, rng: &mut impl Rng) -> Vec<Vec<usize>> {
    let size = size.max(1);
    let mut groups = Vec::with_capacity(pool.len() / size + 1);

    while !pool.is_empty() {
        if size >= pool.len() {
            groups.push(std::mem::take(&mut pool));
            break;
        }

        let group: Vec<usize> = (0..size)
            .map(|_| pool.swap_remove(rng.gen_range(0..pool.len())))
            .collect();
        groups.push(group);
    }

    groups
}

/// One hybrid step: every group is proposed as an all-or-nothing flip under
/// the Metropolis rule, using one pre-drawn uniform per group.
pub fn hybrid_step<N: Neighborhood>(
    system: &mut SpinSystem<N>,
    groups: &[Vec<usize>],
    uniforms: &[f64],
    update: GroupUpdate,
    pool: &ThreadPool,
    deltas: &mut Vec<f64>,
) {
    match update {
        GroupUpdate::Serialized => serialized_step(system, groups, uniforms, deltas),
        GroupUpdate::Snapshot => snapshot_step(system, groups, uniforms, pool, deltas),
    }
}

fn serialized_step<N: Neighborhood>(
    system: &mut SpinSystem<N>,
    groups: &[Vec<usize>],
    uniforms: &[f64],
    deltas: &mut Vec<f64>,
) {
    for (group, &u) in groups.iter().zip(uniforms) {
        let trial = system.effective_hamiltonian(group);
        let current = system.energy();
        if AcceptanceRule::Metropolis.accepts(current, trial, u) {
            system.apply_flips(group, trial);
            deltas.push((trial - current).abs());
        }
    }
}

/// Groups are disjoint, so every decision is taken against the same pre-step
/// configuration on the worker pool; the accepted groups are then applied
/// together and the cached energy rebuilt, since their pair terms interact.
fn snapshot_step<N: Neighborhood>(
    system: &mut SpinSystem<N>,
    groups: &[Vec<usize>],
    uniforms: &[f64],
    pool: &ThreadPool,
    deltas: &mut Vec<f64>,
) {
    let current = system.energy();

    let decisions: Vec<Option<f64>> = {
        let snapshot = &*system;
        pool.install(|| {
            groups
                .par_iter()
                .zip(uniforms)
                .map(|(group, &u)| {
                    let trial = snapshot.effective_hamiltonian(group);
                    AcceptanceRule::Metropolis
                        .accepts(current, trial, u)
                        .then_some(trial)
                })
                .collect()
        })
    };

    let mut accepted = 0;
    for (group, decision) in groups.iter().zip(decisions) {
        if let Some(trial) = decision {
            system.reverse_spins(group.iter().copied());
            deltas.push((trial - current).abs());
            accepted += 1;
        }
    }

    if accepted > 0 {
        system.recalculate_energy();
    }
}

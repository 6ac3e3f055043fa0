use rand::Rng;
use rayon::ThreadPool;
use tracing::{debug, info};

use crate::config::{GroupUpdate, McMethod, ModelConfig};
use crate::hybrid::{draw_groups, hybrid_step, GranularityController};
use crate::metropolis::{single_flip_sweep, AcceptanceRule};
use crate::neighbors::Neighborhood;
use crate::system::SpinSystem;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloSettings {
    pub steps: usize,
    pub method: McMethod,
    pub group_update: GroupUpdate,
    pub threads: usize,
}

impl From<&ModelConfig> for MonteCarloSettings {
    fn from(config: &ModelConfig) -> Self {
        Self {
            steps: config.mc_steps(),
            method: config.mc_method(),
            group_update: config.group_update(),
            threads: config.threads(),
        }
    }
}

/// Accepted energy changes, step by step.
#[derive(Debug, Clone, Default)]
pub struct StepLog {
    current: Vec<f64>,
    last: Vec<f64>,
    averages: Vec<f64>,
}

impl StepLog {
    /// Record `initial` as the entry preceding the first step; later runs
    /// append to the same trace.
    fn open(&mut self, initial: f64) {
        if self.averages.is_empty() {
            self.averages.push(initial);
        }
    }

    /// Close the running step and return the mean `|ΔE|` of its accepted
    /// moves (0 when nothing was accepted).
    fn finish_step(&mut self) -> f64 {
        let average = if self.current.is_empty() {
            0.0
        } else {
            self.current.iter().sum::<f64>() / self.current.len() as f64
        };
        self.averages.push(average);
        self.last = std::mem::take(&mut self.current);
        average
    }

    /// Accepted `|ΔE|` values of the most recent step.
    #[inline(always)]
    pub fn last_deltas(&self) -> &[f64] {
        &self.last
    }

    /// Per-step mean `|ΔE|`, without the opening entry.
    pub fn convergence_trace(&self) -> &[f64] {
        self.averages.get(1..).unwrap_or(&[])
    }
}

/// Advance `system` by `settings.steps` Monte Carlo steps.
pub fn run_monte_carlo<N: Neighborhood>(
    system: &mut SpinSystem<N>,
    settings: &MonteCarloSettings,
    rng: &mut impl Rng,
    pool: &ThreadPool,
    log: &mut StepLog,
) {
    system.recalculate_energy();

    let mut controller =
        GranularityController::new(system.active_indices().len(), settings.threads);
    let mut average = 0.0;
    log.open(average);
    let report_every = (settings.steps / 10).max(1);

    for step in 0..settings.steps {
        match settings.method {
            McMethod::Metropolis => {
                single_flip_sweep(system, AcceptanceRule::Metropolis, rng, &mut log.current)
            }
            McMethod::HeatBath => {
                single_flip_sweep(system, AcceptanceRule::HeatBath, rng, &mut log.current)
            }
            McMethod::Hybrid => {
                let size = controller.adapt(average, system.magnetization());
                let groups = draw_groups(system.active_indices().to_vec(), size, rng);
                let uniforms: Vec<f64> = groups.iter().map(|_| rng.gen()).collect();
                hybrid_step(
                    system,
                    &groups,
                    &uniforms,
                    settings.group_update,
                    pool,
                    &mut log.current,
                );
            }
        }

        average = log.finish_step();

        if (step + 1) % report_every == 0 {
            debug!(
                step = step + 1,
                steps = settings.steps,
                energy = system.energy(),
                magnetization = system.magnetization(),
                average_delta = average,
                "monte carlo progress"
            );
        }
    }

    info!(
        method = %settings.method,
        steps = settings.steps,
        energy = system.energy(),
        magnetization = system.magnetization(),
        "monte carlo run finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::Couplings;
    use crate::spin::Spin;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rayon::ThreadPoolBuilder;

    fn square(side: usize, couplings: Couplings) -> SpinSystem {
        let step = 1.0 / (side - 1) as f64;
        let mut spins = Vec::new();
        for x in 0..side {
            for y in 0..side {
                spins.push(Spin::new(vec![x as f64 * step, y as f64 * step]));
            }
        }
        SpinSystem::on_grid(spins, vec![side, side], couplings)
    }

    fn settings(method: McMethod, group_update: GroupUpdate) -> MonteCarloSettings {
        MonteCarloSettings {
            steps: 25,
            method,
            group_update,
            threads: 2,
        }
    }

    #[test]
    fn every_policy_keeps_observables_consistent() {
        let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let couplings = Couplings {
            k: 0.5,
            h: 0.1,
            sigma: 1.0,
        };

        for (method, update) in [
            (McMethod::Metropolis, GroupUpdate::Snapshot),
            (McMethod::HeatBath, GroupUpdate::Snapshot),
            (McMethod::Hybrid, GroupUpdate::Snapshot),
            (McMethod::Hybrid, GroupUpdate::Serialized),
        ] {
            let mut system = square(4, couplings);
            let mut log = StepLog::default();
            let mut rng = StdRng::seed_from_u64(21);
            run_monte_carlo(&mut system, &settings(method, update), &mut rng, &pool, &mut log);

            assert_eq!(log.convergence_trace().len(), 25);

            let cached = system.energy();
            system.recalculate_energy();
            assert_relative_eq!(cached, system.energy(), epsilon = 1e-9);

            let magnetization = system.magnetization();
            system.recalculate_magnetization();
            assert_eq!(magnetization, system.magnetization());
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let pool = ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let couplings = Couplings {
            k: 0.3,
            h: 0.0,
            sigma: 2.0,
        };

        let run = || {
            let mut system = square(3, couplings);
            let mut log = StepLog::default();
            let mut rng = StdRng::seed_from_u64(99);
            run_monte_carlo(
                &mut system,
                &settings(McMethod::Hybrid, GroupUpdate::Snapshot),
                &mut rng,
                &pool,
                &mut log,
            );
            (system.spin_values(), log.convergence_trace().to_vec())
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn step_log_averages_accepted_deltas() {
        let mut log = StepLog::default();
        log.open(0.0);
        log.current.extend([1.0, 3.0]);
        assert_eq!(log.finish_step(), 2.0);
        assert_eq!(log.finish_step(), 0.0);
        log.current.push(4.0);
        assert_eq!(log.finish_step(), 4.0);
        log.open(0.0);

        assert_eq!(log.last_deltas(), &[4.0]);
        assert_eq!(log.convergence_trace(), &[2.0, 0.0, 4.0]);
    }

    #[test]
    fn trace_keeps_the_first_step() {
        let pool = ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let spins = (0..8).map(|i| Spin::new(vec![i as f64 / 7.0])).collect();
        let mut system = SpinSystem::on_grid(
            spins,
            vec![8],
            Couplings {
                k: 0.0,
                h: -5.0,
                sigma: 1.0,
            },
        );
        let mut log = StepLog::default();
        let mut rng = StdRng::seed_from_u64(1);
        let one_step = MonteCarloSettings {
            steps: 1,
            ..settings(McMethod::Metropolis, GroupUpdate::Snapshot)
        };

        run_monte_carlo(&mut system, &one_step, &mut rng, &pool, &mut log);
        assert_eq!(log.last_deltas(), &[10.0; 8]);
        assert_eq!(log.convergence_trace(), &[10.0]);

        run_monte_carlo(&mut system, &one_step, &mut rng, &pool, &mut log);
        assert_eq!(log.convergence_trace().len(), 2);
        assert_eq!(log.convergence_trace()[0], 10.0);
    }
}

use rand::Rng;

use crate::neighbors::Neighborhood;
use crate::system::SpinSystem;

/// Acceptance rule for a proposed move from `current` to `trial`
/// effective energy.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AcceptanceRule {
    Metropolis,
    HeatBath,
}

impl AcceptanceRule {
    pub fn probability(self, current: f64, trial: f64) -> f64 {
        if trial < current {
            return 1.0;
        }

        let boltzmann = (current - trial).exp();
        match self {
            Self::Metropolis => boltzmann,
            // an overflowing exp(ΔE) drives the ratio to 0
            Self::HeatBath => boltzmann / ((trial - current).exp() + boltzmann),
        }
    }

    /// Decide with a uniform sample `u` in `[0, 1)`.
    #[inline(always)]
    pub fn accepts(self, current: f64, trial: f64, u: f64) -> bool {
        u < self.probability(current, trial)
    }
}

/// One pass over the active spins in index order, proposing each spin alone.
///
/// Accepted flips update the system's cached energy in place and push
/// `|trial - current|` onto `deltas`.
pub fn single_flip_sweep<N: Neighborhood>(
    system: &mut SpinSystem<N>,
    rule: AcceptanceRule,
    rng: &mut impl Rng,
    deltas: &mut Vec<f64>,
) {
    let mut mask = system.flip_mask();

    for k in 0..system.active_indices().len() {
        let spin = system.active_indices()[k];

        mask.set(spin, true);
        let trial = system.effective_hamiltonian_masked(&mask);
        mask.set(spin, false);

        let current = system.energy();
        let p = rule.probability(current, trial);
        if p >= 1.0 || rng.gen::<f64>() < p {
            system.apply_flips(&[spin], trial);
            deltas.push((trial - current).abs());
        }
    }
}

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::config::{GroupUpdate, McMethod, ModelConfig, ScalingMethod};
use crate::energy::Couplings;
use crate::error::{ModelError, Result};
use crate::generators::{FractalGeometry, LatticeGenerator};
use crate::partition::partition_function;
use crate::runner::{run_monte_carlo, MonteCarloSettings, StepLog};
use crate::system::SpinSystem;

/// Everything built by `setup`; dropped by any configuration change.
struct Simulation {
    geometry: FractalGeometry,
    system: SpinSystem,
    pool: ThreadPool,
    rng: StdRng,
    log: StepLog,
}

/// Ising model on a fractal lattice of configurable Hausdorff dimension.
///
/// Configure, call [`IsingModel::setup`], then query observables or run
/// Monte Carlo. Every accepted setter call returns the model to the
/// pre-setup state, even when the value is unchanged.
pub struct IsingModel {
    config: ModelConfig,
    simulation: Option<Simulation>,
}

impl Default for IsingModel {
    fn default() -> Self {
        Self::new(ModelConfig::default())
    }
}

impl IsingModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            simulation: None,
        }
    }

    #[inline(always)]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn configure(&mut self, f: impl FnOnce(&mut ModelConfig) -> bool) {
        if f(&mut self.config) {
            self.simulation = None;
        }
    }

    pub fn set_num_threads(&mut self, threads: usize) {
        self.configure(|c| c.set_threads(threads));
    }

    pub fn set_num_mc_steps(&mut self, steps: usize) {
        self.configure(|c| c.set_mc_steps(steps));
    }

    pub fn set_lattice_depth(&mut self, depth: usize) {
        self.configure(|c| c.set_depth(depth));
    }

    pub fn set_hausdorff_dimension(&mut self, dim: f64) {
        self.configure(|c| c.set_hausdorff_dim(dim));
    }

    pub fn set_hausdorff_method(&mut self, method: ScalingMethod) {
        self.configure(|c| c.set_scaling(method));
    }

    pub fn set_hausdorff_slices(&mut self, slices: usize) {
        self.configure(|c| c.set_slices(slices));
    }

    pub fn set_hausdorff_scale(&mut self, scale: f64) {
        self.configure(|c| c.set_scale(scale));
    }

    pub fn set_interaction_sigma(&mut self, sigma: f64) {
        self.configure(|c| c.set_sigma(sigma));
    }

    pub fn set_mc_method(&mut self, method: McMethod) {
        self.configure(|c| c.set_mc_method(method));
    }

    pub fn set_group_update(&mut self, update: GroupUpdate) {
        self.configure(|c| c.set_group_update(update));
    }

    pub fn set_coupling_consts(&mut self, field: f64, exchange: f64) {
        self.configure(|c| c.set_couplings(field, exchange));
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.configure(|c| c.set_temperature(temperature));
    }

    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.configure(|c| c.set_seed(seed));
    }

    /// Build the lattice, the worker pool and the random source.
    pub fn setup(&mut self) -> Result<()> {
        let geometry = FractalGeometry::from_config(&self.config)?;
        let spins = LatticeGenerator::fractal(&geometry);
        let couplings = Couplings {
            k: self.config.k(),
            h: self.config.h(),
            sigma: self.config.sigma(),
        };
        let system = SpinSystem::on_grid(spins, geometry.shape(), couplings);

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.threads())
            .build()?;

        let rng = match self.config.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            spins = system.size(),
            scale = geometry.scale,
            slices = geometry.slices,
            depth = geometry.depth,
            "model set up"
        );

        self.simulation = Some(Simulation {
            geometry,
            system,
            pool,
            rng,
            log: StepLog::default(),
        });
        Ok(())
    }

    /// Drop the lattice and every derived observable.
    pub fn reset(&mut self) {
        debug!("model reset");
        self.simulation = None;
    }

    #[inline(always)]
    pub fn is_set_up(&self) -> bool {
        self.simulation.is_some()
    }

    fn simulation(&self) -> Result<&Simulation> {
        self.simulation.as_ref().ok_or(ModelError::NotSetUp)
    }

    fn simulation_mut(&mut self) -> Result<&mut Simulation> {
        self.simulation.as_mut().ok_or(ModelError::NotSetUp)
    }

    pub fn run_monte_carlo(&mut self) -> Result<()> {
        let settings = MonteCarloSettings::from(&self.config);
        let Simulation {
            system,
            pool,
            rng,
            log,
            ..
        } = self.simulation_mut()?;

        run_monte_carlo(system, &settings, rng, pool, log);
        Ok(())
    }

    pub fn partition_function(&self) -> Result<f64> {
        let simulation = self.simulation()?;
        partition_function(&simulation.system, &simulation.pool)
    }

    /// Effective Hamiltonian `-βH` with the listed sites hypothetically
    /// reversed. Indices outside the lattice are ignored.
    pub fn effective_hamiltonian(&self, flips: &[usize]) -> Result<f64> {
        let system = &self.simulation()?.system;
        let flips: Vec<usize> = flips
            .iter()
            .copied()
            .filter(|&i| i < system.size())
            .collect();
        Ok(system.effective_hamiltonian(&flips))
    }

    /// Cached effective Hamiltonian, as tracked by the Monte Carlo engine.
    pub fn current_energy(&self) -> Result<f64> {
        Ok(self.simulation()?.system.energy())
    }

    pub fn magnetization(&self) -> Result<i64> {
        Ok(self.simulation()?.system.magnetization())
    }

    /// Spin values, 0 for inactive sites.
    pub fn spin_array(&self) -> Result<Vec<i8>> {
        Ok(self.simulation()?.system.spin_values())
    }

    pub fn lattice_dimensions(&self) -> Result<Vec<usize>> {
        Ok(self.simulation()?.system.shape().to_vec())
    }

    pub fn num_spins(&self) -> Result<usize> {
        Ok(self.simulation()?.system.size())
    }

    pub fn num_active_spins(&self) -> Result<usize> {
        Ok(self.simulation()?.system.active_indices().len())
    }

    pub fn geometry(&self) -> Result<&FractalGeometry> {
        Ok(&self.simulation()?.geometry)
    }

    /// Mean accepted `|ΔE|` of every Monte Carlo step since setup.
    pub fn convergence_trace(&self) -> Result<&[f64]> {
        Ok(self.simulation()?.log.convergence_trace())
    }

    pub fn last_step_deltas(&self) -> Result<&[f64]> {
        Ok(self.simulation()?.log.last_deltas())
    }

    /// Reduced exchange coupling `K = J / k_BT`.
    #[inline(always)]
    pub fn k(&self) -> f64 {
        self.config.k()
    }

    /// Reduced field `h = H / k_BT`.
    #[inline(always)]
    pub fn h(&self) -> f64 {
        self.config.h()
    }

    /// Reverse each spin with probability 1/2. Returns how many flipped.
    pub fn randomize_spins(&mut self) -> Result<usize> {
        let Simulation { system, rng, .. } = self.simulation_mut()?;
        let flipped = system.randomize(rng);
        debug!(flipped, spins = system.size(), "randomized spins");
        Ok(flipped)
    }

    pub fn set_all_spins(&mut self, direction: i8) -> Result<()> {
        self.simulation_mut()?.system.set_all_spins(direction);
        Ok(())
    }

    /// Switch a site on or off. Indices outside the lattice are ignored.
    pub fn set_spin_active(&mut self, index: usize, active: bool) -> Result<()> {
        let system = &mut self.simulation_mut()?.system;
        if index < system.size() {
            system.set_active(index, active);
        }
        Ok(())
    }

    /// Printable summary of the model state.
    pub fn status(&self) -> Status<'_> {
        Status(self)
    }
}

pub struct Status<'a>(&'a IsingModel);

impl fmt::Display for Status<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self.0;
        let config = model.config();

        if let Some(simulation) = &model.simulation {
            let system = &simulation.system;
            writeln!(f, "| Magnetization:      {}", system.magnetization())?;
            writeln!(f, "| Eff. energy:        {}", system.energy())?;
            writeln!(f, "| Hausdorff dim.:     {}", config.hausdorff_dim())?;
            writeln!(f, "| Lattice copies:     {}", simulation.geometry.slices)?;
            writeln!(f, "| Lattice scaling:    {}", simulation.geometry.scale)?;
            writeln!(f, "| Number of spins:    {}", system.size())?;
        } else {
            writeln!(f, "| Hausdorff dim.:     {}", config.hausdorff_dim())?;
        }
        writeln!(f, "| Scaling method:     {}", config.scaling())?;
        writeln!(f, "| MC method:          {}", config.mc_method())?;
        writeln!(f, "| Number MC steps:    {}", config.mc_steps())?;
        writeln!(f, "| Number threads:     {}", config.threads())?;
        writeln!(f, "| Beta * Hamiltonian: -1/{} *", config.temperature())?;
        writeln!(
            f,
            "|                     ({}/|r_i-r_j|^{} * S_i*S_j",
            config.exchange(),
            config.sigma()
        )?;
        writeln!(f, "|                      + {}*S_i)", config.field())?;

        if !model.is_set_up() {
            writeln!(f)?;
            writeln!(f, "WARNING: Model has not been setup properly!")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn one_dimensional() -> IsingModel {
        let mut model = IsingModel::default();
        model.set_hausdorff_dimension(1.0);
        model.set_lattice_depth(1);
        model.set_seed(Some(1));
        model
    }

    #[test]
    fn use_before_setup_is_an_error() {
        let mut model = one_dimensional();
        assert!(matches!(model.run_monte_carlo(), Err(ModelError::NotSetUp)));
        assert!(matches!(model.partition_function(), Err(ModelError::NotSetUp)));
        assert!(matches!(model.magnetization(), Err(ModelError::NotSetUp)));
    }

    #[test]
    fn setup_builds_lattice() {
        let mut model = one_dimensional();
        model.setup().unwrap();

        assert_eq!(model.lattice_dimensions().unwrap(), vec![4]);
        assert_eq!(model.spin_array().unwrap(), vec![1, 1, 1, 1]);
        assert_eq!(model.magnetization().unwrap(), 4);
        assert_relative_eq!(model.geometry().unwrap().scale, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn setters_invalidate_setup() {
        let mut model = one_dimensional();
        model.setup().unwrap();

        model.set_temperature(-1.0);
        assert!(model.is_set_up(), "ignored value keeps the model");

        model.set_temperature(2.0);
        assert!(!model.is_set_up());
        assert_eq!(model.k(), 0.5);
    }

    #[test]
    fn repeating_a_setter_reseeds() {
        let mut model = one_dimensional();
        model.set_lattice_depth(3);
        model.setup().unwrap();
        model.randomize_spins().unwrap();
        let first = model.spin_array().unwrap();

        model.set_seed(Some(1));
        assert!(!model.is_set_up());
        model.setup().unwrap();
        model.randomize_spins().unwrap();
        assert_eq!(model.spin_array().unwrap(), first);
    }

    #[test]
    fn reset_returns_to_pre_setup() {
        let mut model = one_dimensional();
        model.setup().unwrap();
        model.run_monte_carlo().unwrap();
        model.reset();
        assert!(!model.is_set_up());
        assert!(model.spin_array().is_err());
    }

    #[test]
    fn invalid_scale_fails_setup() {
        let mut model = one_dimensional();
        model.set_hausdorff_method(ScalingMethod::Splitting);
        model.set_hausdorff_scale(0.4);
        assert!(matches!(model.setup(), Err(ModelError::InvalidScale { .. })));
        assert!(!model.is_set_up());
    }

    #[test]
    fn status_warns_before_setup() {
        let mut model = one_dimensional();
        assert!(model.status().to_string().contains("WARNING"));
        model.setup().unwrap();
        let report = model.status().to_string();
        assert!(!report.contains("WARNING"));
        assert!(report.contains("Number of spins:    4"));
    }
}

use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// How the fractal geometry is derived from the target Hausdorff dimension.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScalingMethod {
    /// Keep the branching factor, derive the self-similarity ratio.
    Scaling,
    /// Keep the self-similarity ratio, derive the branching factor.
    Splitting,
}

impl FromStr for ScalingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scaling" => Ok(Self::Scaling),
            "splitting" => Ok(Self::Splitting),
            _ => Err(format!(
                "unknown scaling method '{s}', expected 'scaling' or 'splitting'"
            )),
        }
    }
}

impl fmt::Display for ScalingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scaling => write!(f, "SCALING"),
            Self::Splitting => write!(f, "SPLITTING"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum McMethod {
    Metropolis,
    HeatBath,
    Hybrid,
}

impl FromStr for McMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metropolis" => Ok(Self::Metropolis),
            "heatbath" | "heat-bath" => Ok(Self::HeatBath),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(format!(
                "unknown mc method '{s}', expected 'metropolis', 'heatbath' or 'hybrid'"
            )),
        }
    }
}

impl fmt::Display for McMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metropolis => write!(f, "METROPOLIS"),
            Self::HeatBath => write!(f, "HEATBATH"),
            Self::Hybrid => write!(f, "HYBRID"),
        }
    }
}

/// How the groups of one hybrid step are applied.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum GroupUpdate {
    /// Groups are decided against the pre-step configuration on the worker
    /// pool and the accepted ones are applied together afterwards.
    Snapshot,
    /// Groups are decided and applied one at a time, each against the
    /// configuration left by the previous group.
    Serialized,
}

impl FromStr for GroupUpdate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "snapshot" => Ok(Self::Snapshot),
            "serialized" => Ok(Self::Serialized),
            _ => Err(format!(
                "unknown group update '{s}', expected 'snapshot' or 'serialized'"
            )),
        }
    }
}

impl fmt::Display for GroupUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot => write!(f, "SNAPSHOT"),
            Self::Serialized => write!(f, "SERIALIZED"),
        }
    }
}

/// Run parameters. Immutable once a model has been set up.
///
/// Setters keep the previous value when handed something invalid and return
/// whether the new value was taken; callers are expected to validate input
/// themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    threads: usize,
    mc_steps: usize,
    depth: usize,
    hausdorff_dim: f64,
    scaling: ScalingMethod,
    slices: usize,
    scale: f64,
    sigma: f64,
    mc_method: McMethod,
    group_update: GroupUpdate,
    field: f64,
    exchange: f64,
    temperature: f64,
    seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            mc_steps: 10000,
            depth: 1,
            hausdorff_dim: 1.0,
            scaling: ScalingMethod::Scaling,
            slices: 2,
            scale: 1.0 / 3.0,
            sigma: 1.0,
            mc_method: McMethod::Metropolis,
            group_update: GroupUpdate::Snapshot,
            field: 1.0,
            exchange: 1.0,
            temperature: 1.0,
            seed: None,
        }
    }
}

impl ModelConfig {
    pub fn set_threads(&mut self, threads: usize) -> bool {
        if threads < 1 {
            warn!(threads, "ignoring thread count");
            return false;
        }
        self.threads = threads;
        true
    }

    pub fn set_mc_steps(&mut self, steps: usize) -> bool {
        if steps < 1 {
            warn!(steps, "ignoring Monte Carlo step count");
            return false;
        }
        self.mc_steps = steps;
        true
    }

    pub fn set_depth(&mut self, depth: usize) -> bool {
        self.depth = depth;
        true
    }

    pub fn set_hausdorff_dim(&mut self, dim: f64) -> bool {
        if !(dim > 0.0) || !dim.is_finite() {
            warn!(dim, "ignoring Hausdorff dimension");
            return false;
        }
        self.hausdorff_dim = dim;
        true
    }

    pub fn set_scaling(&mut self, scaling: ScalingMethod) -> bool {
        self.scaling = scaling;
        true
    }

    /// Branching factor used by [`ScalingMethod::Scaling`].
    pub fn set_slices(&mut self, slices: usize) -> bool {
        if slices < 2 {
            warn!(slices, "ignoring slice count");
            return false;
        }
        self.slices = slices;
        true
    }

    /// Self-similarity ratio used by [`ScalingMethod::Splitting`].
    pub fn set_scale(&mut self, scale: f64) -> bool {
        if !(scale > 0.0 && scale < 1.0) {
            warn!(scale, "ignoring Hausdorff scale");
            return false;
        }
        self.scale = scale;
        true
    }

    pub fn set_sigma(&mut self, sigma: f64) -> bool {
        self.sigma = sigma;
        true
    }

    pub fn set_mc_method(&mut self, method: McMethod) -> bool {
        self.mc_method = method;
        true
    }

    pub fn set_group_update(&mut self, update: GroupUpdate) -> bool {
        self.group_update = update;
        true
    }

    pub fn set_couplings(&mut self, field: f64, exchange: f64) -> bool {
        self.field = field;
        self.exchange = exchange;
        true
    }

    pub fn set_temperature(&mut self, temperature: f64) -> bool {
        if temperature < 0.0 || temperature.is_nan() {
            warn!(temperature, "ignoring temperature");
            return false;
        }
        self.temperature = temperature;
        true
    }

    pub fn set_seed(&mut self, seed: Option<u64>) -> bool {
        self.seed = seed;
        true
    }

    #[inline(always)]
    pub fn threads(&self) -> usize {
        self.threads
    }

    #[inline(always)]
    pub fn mc_steps(&self) -> usize {
        self.mc_steps
    }

    #[inline(always)]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline(always)]
    pub fn hausdorff_dim(&self) -> f64 {
        self.hausdorff_dim
    }

    #[inline(always)]
    pub fn scaling(&self) -> ScalingMethod {
        self.scaling
    }

    #[inline(always)]
    pub fn slices(&self) -> usize {
        self.slices
    }

    #[inline(always)]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline(always)]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    #[inline(always)]
    pub fn mc_method(&self) -> McMethod {
        self.mc_method
    }

    #[inline(always)]
    pub fn group_update(&self) -> GroupUpdate {
        self.group_update
    }

    #[inline(always)]
    pub fn field(&self) -> f64 {
        self.field
    }

    #[inline(always)]
    pub fn exchange(&self) -> f64 {
        self.exchange
    }

    #[inline(always)]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    #[inline(always)]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Reduced exchange coupling `K = J / k_BT`.
    #[inline(always)]
    pub fn k(&self) -> f64 {
        self.exchange / self.temperature
    }

    /// Reduced field `h = H / k_BT`.
    #[inline(always)]
    pub fn h(&self) -> f64 {
        self.field / self.temperature
    }

    /// Number of lattice axes, `ceil` of the target dimension.
    #[inline(always)]
    pub fn axes(&self) -> usize {
        self.hausdorff_dim.ceil() as usize
    }
}

use anyhow::Context;
use fractal_ising::{GroupUpdate, IsingModel, McMethod, ModelConfig, ScalingMethod};
use itertools::Itertools;
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "fractal-ising",
    about = "Ising model on lattices of fractional Hausdorff dimension"
)]
struct Args {
    /// worker thread count
    #[structopt(long, default_value = "1")]
    threads: usize,
    /// Monte Carlo steps per run
    #[structopt(long, default_value = "10000")]
    steps: usize,
    /// subdivision depth of the fractal lattice
    #[structopt(long, default_value = "1")]
    depth: usize,
    /// target Hausdorff dimension
    #[structopt(long, default_value = "1")]
    dim: f64,
    /// scaling | splitting
    #[structopt(long, default_value = "scaling")]
    method: ScalingMethod,
    /// copies per axis, used by the scaling method
    #[structopt(long, default_value = "2")]
    slices: usize,
    /// self-similarity ratio, used by the splitting method
    #[structopt(long, default_value = "0.3333333333333333")]
    scale: f64,
    /// exponent of the pair distance decay
    #[structopt(long, default_value = "1")]
    sigma: f64,
    /// metropolis | heatbath | hybrid
    #[structopt(long, default_value = "metropolis")]
    mc: McMethod,
    /// snapshot | serialized, for the hybrid method
    #[structopt(long, default_value = "snapshot")]
    group_update: GroupUpdate,
    /// external field H
    #[structopt(long, default_value = "1")]
    field: f64,
    /// exchange coupling J
    #[structopt(long, default_value = "1")]
    exchange: f64,
    /// temperature k_B T
    #[structopt(long, default_value = "1")]
    temperature: f64,
    /// random seed, entropy when omitted
    #[structopt(long)]
    seed: Option<u64>,
    /// randomize spins before the run
    #[structopt(long)]
    randomize: bool,
    /// also compute the exact partition function
    #[structopt(long)]
    partition: bool,
    /// print the per-step convergence trace
    #[structopt(long)]
    trace: bool,
}

impl Args {
    fn config(&self) -> ModelConfig {
        let mut config = ModelConfig::default();
        config.set_threads(self.threads);
        config.set_mc_steps(self.steps);
        config.set_depth(self.depth);
        config.set_hausdorff_dim(self.dim);
        config.set_scaling(self.method);
        config.set_slices(self.slices);
        config.set_scale(self.scale);
        config.set_sigma(self.sigma);
        config.set_mc_method(self.mc);
        config.set_group_update(self.group_update);
        config.set_couplings(self.field, self.exchange);
        config.set_temperature(self.temperature);
        config.set_seed(self.seed);
        config
    }
}

fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fractal_ising=info"));
    fmt().with_env_filter(filter).with_target(false).compact().init();

    let args = Args::from_args();
    let mut model = IsingModel::new(args.config());
    {
        measure_time::print_time!("Setup");
        model.setup().context("failed to set up the model")?;
    }

    info!(
        shape = %model.lattice_dimensions()?.iter().join("x"),
        spins = model.num_spins()?,
        "lattice ready"
    );

    if args.randomize {
        model.randomize_spins()?;
    }

    if args.partition {
        let z = {
            measure_time::print_time!("Partition function");
            model.partition_function()?
        };
        println!("Z = {z}");
    }

    {
        measure_time::print_time!("Monte Carlo");
        model.run_monte_carlo()?;
    }

    print!("{}", model.status());

    if args.trace {
        println!("{}", model.convergence_trace()?.iter().join(" "));
    }

    Ok(())
}

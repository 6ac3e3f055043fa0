//! Ising model on lattices of fractional Hausdorff dimension.
//!
//! The lattice is a self-similar subset of a hypercube grid, built by
//! [`generators::LatticeGenerator`]. [`model::IsingModel`] ties the lattice to
//! an energy model, an exact partition function enumerator and three Monte
//! Carlo policies.

pub mod config;
pub mod energy;
pub mod error;
pub mod generators;
pub mod hybrid;
pub mod metropolis;
pub mod model;
pub mod neighbors;
pub mod odometer;
pub mod partition;
pub mod runner;
pub mod spin;
pub mod system;

pub use config::{GroupUpdate, McMethod, ModelConfig, ScalingMethod};
pub use error::{ModelError, Result};
pub use model::IsingModel;

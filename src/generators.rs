use tap::Tap;
use tracing::debug;

use crate::config::{ModelConfig, ScalingMethod};
use crate::error::{ModelError, Result};
use crate::odometer::Odometer;
use crate::spin::Spin;

const SCALE_TOLERANCE: f64 = 1e-12;

/// Self-similar subdivision of the unit hypercube.
#[derive(Clone, Debug, PartialEq)]
pub struct FractalGeometry {
    pub axes: usize,
    pub depth: usize,
    pub scale: f64,
    pub slices: usize,
}

impl FractalGeometry {
    /// Derive scale and branching factor for the configured target dimension.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let dim = config.hausdorff_dim();
        let axes = config.axes();

        let (scale, slices) = match config.scaling() {
            ScalingMethod::Scaling => {
                let slices = config.slices();
                let scale = (-(axes as f64) * (slices as f64).ln() / dim).exp();
                (scale, slices)
            }
            ScalingMethod::Splitting => {
                let scale = config.scale();
                let slices = scale.powf(-dim / axes as f64).round().max(2.0) as usize;
                (scale, slices)
            }
        };

        debug!(dim, axes, scale, slices, "derived fractal geometry");

        Self::new(axes, config.depth(), scale, slices)
    }

    pub fn new(axes: usize, depth: usize, scale: f64, slices: usize) -> Result<Self> {
        if scale > (1.0 + SCALE_TOLERANCE) / slices as f64 {
            return Err(ModelError::InvalidScale { scale, slices });
        }

        Ok(Self {
            axes,
            depth,
            scale,
            slices,
        })
    }

    /// Distinct site positions along each axis, `2 * slices^depth`.
    pub fn shape(&self) -> Vec<usize> {
        vec![2 * self.slices.pow(self.depth as u32); self.axes]
    }

    pub fn spin_count(&self) -> usize {
        self.shape().iter().product()
    }

    /// Spacing factor between neighbouring self-similar copies.
    #[inline(always)]
    fn adjustment(&self) -> f64 {
        let slices = self.slices as f64;
        1.0 + (1.0 / self.scale - slices) / (slices - 1.0)
    }
}

pub struct LatticeGenerator;

impl LatticeGenerator {
    /// One spin at every corner of every smallest hypercube of the fractal,
    /// sorted lexicographically by coordinate.
    pub fn fractal(geometry: &FractalGeometry) -> Vec<Spin> {
        let FractalGeometry {
            axes,
            depth,
            scale,
            slices,
        } = *geometry;

        let adjustment = geometry.adjustment();
        let side = scale.powi(depth as i32);
        let level_scales: Vec<f64> = (0..depth)
            .map(|level| adjustment * scale.powi((depth - level) as i32))
            .collect();

        let cells = Odometer::new(axes * depth, slices);
        let corners = Odometer::new(axes, 2);
        let mut spins = Vec::with_capacity(cells.count() * corners.count());

        cells.for_each(|branches| {
            let corner: Vec<f64> = (0..axes)
                .map(|axis| {
                    branches[axis * depth..(axis + 1) * depth]
                        .iter()
                        .zip(&level_scales)
                        .map(|(&branch, level_scale)| level_scale * branch as f64)
                        .sum()
                })
                .collect();

            corners.clone().for_each(|offsets| {
                let coords = corner
                    .iter()
                    .zip(offsets)
                    .map(|(c, &o)| c + o as f64 * side)
                    .collect();
                spins.push(Spin::new(coords));
            });
        });

        spins.tap_mut(|s| s.sort_by(Spin::coord_cmp))
    }
}

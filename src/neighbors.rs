use crate::spin::Spin;

/// Which sites couple to which.
///
/// `for_each_neighbor` must be symmetric: if `j` is reported for `i`, then
/// `i` is reported for `j`. The energy model halves every pair term because
/// each pair is visited from both ends.
pub trait Neighborhood: Sync {
    fn for_each_neighbor(&self, spins: &[Spin], i: usize, f: impl FnMut(usize));
}

/// Neighbors found by linear index arithmetic on a coordinate-sorted array,
/// as if it were a regular grid of `shape`. Boundaries are open: a step that
/// would leave the lattice extremes on its axis is dropped instead of
/// wrapping onto the next row.
#[derive(Clone, Debug)]
pub struct StrideNeighbors {
    shape: Vec<usize>,
    /// Row-major strides: `strides[d] = product of shape[d+1..]`.
    strides: Vec<usize>,
    min: Vec<f64>,
    max: Vec<f64>,
}

impl StrideNeighbors {
    pub fn new(shape: Vec<usize>, spins: &[Spin]) -> Self {
        let n_dims = shape.len();

        let mut strides = vec![1usize; n_dims];
        for d in (0..n_dims.saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * shape[d + 1];
        }

        let mut min = vec![f64::INFINITY; n_dims];
        let mut max = vec![f64::NEG_INFINITY; n_dims];
        for spin in spins {
            for (d, &c) in spin.coords.iter().enumerate().take(n_dims) {
                min[d] = min[d].min(c);
                max[d] = max[d].max(c);
            }
        }

        Self {
            shape,
            strides,
            min,
            max,
        }
    }

    #[inline(always)]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline(always)]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Lowest coordinate present on each axis.
    #[inline(always)]
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Highest coordinate present on each axis.
    #[inline(always)]
    pub fn max(&self) -> &[f64] {
        &self.max
    }
}

impl Neighborhood for StrideNeighbors {
    #[inline]
    fn for_each_neighbor(&self, spins: &[Spin], i: usize, mut f: impl FnMut(usize)) {
        let n_spins = spins.len();
        let coords = &spins[i].coords;

        for (d, &stride) in self.strides.iter().enumerate() {
            if i >= stride && coords[d] != self.min[d] {
                let j = i - stride;
                if spins[j].coords[d] != self.max[d] {
                    f(j);
                }
            }

            if i + stride < n_spins && coords[d] != self.max[d] {
                let j = i + stride;
                if spins[j].coords[d] != self.min[d] {
                    f(j);
                }
            }
        }
    }
}

use std::cmp::Ordering;

use ordered_float::OrderedFloat;

#[derive(Clone, Debug, PartialEq)]
pub struct Spin {
    pub value: i8,
    pub active: bool,
    pub coords: Vec<f64>,
}

impl Spin {
    pub fn new(coords: Vec<f64>) -> Self {
        Self {
            value: 1,
            active: true,
            coords,
        }
    }

    /// Signed contribution to the magnetization, 0 for inactive sites.
    #[inline(always)]
    pub fn signed_value(&self) -> i8 {
        if self.active {
            self.value
        } else {
            0
        }
    }

    #[inline(always)]
    pub fn reverse(&mut self) {
        self.value = -self.value;
    }

    /// Squared Euclidean distance used by the coupling term.
    ///
    /// Collapses to 1 when `sigma == 0` (contact coupling) or when the two
    /// sites coincide.
    pub fn distance_sq(&self, other: &Spin, sigma: f64) -> f64 {
        if sigma == 0.0 {
            return 1.0;
        }

        let distance: f64 = self
            .coords
            .iter()
            .zip(&other.coords)
            .map(|(a, b)| (a - b).powi(2))
            .sum();

        if distance == 0.0 {
            1.0
        } else {
            distance
        }
    }

    /// Lexicographic order over the axes.
    pub fn coord_cmp(&self, other: &Spin) -> Ordering {
        self.coords
            .iter()
            .copied()
            .map(OrderedFloat)
            .cmp(other.coords.iter().copied().map(OrderedFloat))
    }
}

/// Mixed-radix counter over `len` digits of base `radix`.
///
/// Digit 0 is the lowest one: `advance` increments it and carries upward.
/// A counter with zero digits yields exactly one (empty) combination.
#[derive(Clone, Debug)]
pub struct Odometer {
    digits: Vec<usize>,
    radix: usize,
    done: bool,
}

impl Odometer {
    pub fn new(len: usize, radix: usize) -> Self {
        Self {
            digits: vec![0; len],
            radix,
            done: radix == 0 && len > 0,
        }
    }

    #[inline(always)]
    pub fn digits(&self) -> &[usize] {
        &self.digits
    }

    /// Total number of combinations, `radix^len`.
    pub fn count(&self) -> usize {
        self.radix.pow(self.digits.len() as u32)
    }

    /// Step to the next combination. Returns `false` once every combination
    /// has been visited.
    pub fn advance(&mut self) -> bool {
        for digit in self.digits.iter_mut() {
            if *digit + 1 < self.radix {
                *digit += 1;
                return true;
            }
            *digit = 0;
        }
        self.done = true;
        false
    }

    /// Visit every combination, starting from the current one.
    pub fn for_each(mut self, mut f: impl FnMut(&[usize])) {
        while !self.done {
            f(&self.digits);
            self.advance();
        }
    }
}

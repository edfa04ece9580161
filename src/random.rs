use rand::{distributions::Alphanumeric, Rng};

/// Where the attacker and the service draw their randomness from.
///
/// Every `rand::Rng` is a `RandomSource`. Tests can substitute a scripted
/// one to pin down exact messages and choices.
pub trait RandomSource {
    /// A string of `len` chars drawn from `[A-Za-z0-9]`.
    fn alphanumeric(&mut self, len: usize) -> String;

    /// A uniformly chosen index in `0..n`. `n` is never zero.
    fn index_below(&mut self, n: usize) -> usize;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn alphanumeric(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(self.sample(Alphanumeric)))
            .collect()
    }

    fn index_below(&mut self, n: usize) -> usize {
        self.gen_range(0..n)
    }
}

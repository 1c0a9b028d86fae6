//! Random Source Port - Injectable Uniform Sampling
//!
//! Trade outcomes, mock candles and mentor lines all draw from this
//! trait so tests can force wins and losses deterministically.

/// Uniform random source in `[0, 1)`.
pub trait RandomSource: Send + 'static {
  /// Next uniform sample in `[0, 1)`.
  fn next_f64(&mut self) -> f64;

  /// Uniform index in `0..len`. `len` must be non-zero.
  #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
  fn next_index(&mut self, len: usize) -> usize {
    let idx = (self.next_f64() * len as f64) as usize;
    idx.min(len.saturating_sub(1))
  }

  /// Uniform sample in `[-0.5, 0.5)`, the shape used for price jitter.
  fn centered(&mut self) -> f64 {
    self.next_f64() - 0.5
  }
}

/// Pick one element of a non-empty slice.
pub fn pick<'a, T, R: RandomSource + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
  if items.is_empty() {
    return None;
  }
  items.get(rng.next_index(items.len()))
}

//! Uniform random selection over a [`Catalog`].

// crates.io
use rand::{Rng, SeedableRng, rngs::StdRng};
// self
use crate::{
	_prelude::*,
	catalog::{Catalog, CatalogEntry},
};

/// Source of selection indices.
pub trait SelectionSource {
	/// Returns an index in `0..len`; `len` is never zero.
	fn pick(&mut self, len: usize) -> usize;
}
impl<F> SelectionSource for F
where
	F: FnMut(usize) -> usize,
{
	fn pick(&mut self, len: usize) -> usize {
		self(len)
	}
}

/// Draws indices uniformly with replacement from an RNG.
#[derive(Clone, Debug)]
pub struct RandomSelection<R = StdRng>(pub R);
impl RandomSelection<StdRng> {
	/// Seeds a generator from the operating system.
	pub fn from_os_rng() -> Self {
		Self(StdRng::from_os_rng())
	}

	/// Deterministic generator for reproducible runs.
	pub fn seeded(seed: u64) -> Self {
		Self(StdRng::seed_from_u64(seed))
	}
}
impl<R> SelectionSource for RandomSelection<R>
where
	R: Rng,
{
	fn pick(&mut self, len: usize) -> usize {
		self.0.random_range(0..len)
	}
}

/// Picks one entry of `catalog`.
///
/// Indices a source returns beyond the catalog wrap around.
pub fn select<S>(catalog: &Catalog, source: &mut S) -> Result<CatalogEntry>
where
	S: ?Sized + SelectionSource,
{
	let len = catalog.len();

	if len == 0 {
		return Err(Error::EmptyCatalog);
	}

	catalog.entry_at(source.pick(len) % len).ok_or(Error::EmptyCatalog)
}

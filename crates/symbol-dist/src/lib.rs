//! Probability distributions over the atomic symbols of an alphabet.
//!
//! Every distribution is a [`Distribution`] behind a shared [`DistRef`]
//! handle. The concrete behavior is one of a closed set of variants
//! ([`DistributionKind`]):
//!
//! - **simple**: dense, array-backed weights for any finite alphabet
//! - **uniform** and **gap**: fixed, immutable distributions
//! - **dna**: four hard-wired slots for the DNA alphabet
//! - **order-N**: one sub-distribution per conditioning context over a
//!   composite alphabet
//! - **complement**, **translated** and **pair**: live views derived from
//!   other distributions, canonicalised by a [`ViewCache`]
//!
//! Weights are learned through a [`TrainerContext`]: counts are accumulated
//! per distribution, then committed in one step, smoothed by each
//! distribution's null model. Every mutation is announced to registered
//! [`ChangeListener`]s before it happens (any of them may veto it) and
//! after it has been applied.
//!
//! # Example
//!
//! ```
//! use symbol_core::dna;
//! use symbol_dist::{Distribution, TrainerContext};
//!
//! let dist = Distribution::dna();
//! let mut ctx = TrainerContext::new();
//! ctx.register_distribution(&dist);
//! for sym in dna::parse("aacg").unwrap() {
//!     ctx.add_count(&dist, &sym, 1.0).unwrap();
//! }
//! ctx.train().unwrap();
//!
//! assert_eq!(dist.weight(&dna::a().into()).unwrap(), 0.5);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

mod change;
mod distribution;
mod error;
mod order_n;
mod snapshot;
mod trainer;
mod views;

pub use change::{ChangeEvent, ChangeKind, ChangeListener, ChangeSupport, ListenerId, WeightChange};
pub use distribution::{Distribution, DistributionFactory, DistributionKind, SimpleFactory, UniformFactory};
pub use error::DistError;
pub use order_n::{INDEXED_CONDITIONING_LIMIT, Storage};
pub use snapshot::WeightSnapshot;
pub use trainer::TrainerContext;
pub use views::ViewCache;

/// Shared handle to a distribution.
pub type DistRef = Arc<Distribution>;

/// Tolerance used when checking that weights sum to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

static NEXT_DIST_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a distribution.
///
/// Ids are never reused, so they stay valid cache and registry keys after the
/// distribution they named has been dropped.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct DistId(u64);

impl DistId {
    fn next() -> Self {
        DistId(NEXT_DIST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// A panic inside a listener must not wedge every later reader, so poisoned
// locks are recovered rather than propagated.

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

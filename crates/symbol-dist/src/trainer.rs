//! Count accumulation and training.
//!
//! A [`TrainerContext`] owns one trainer per registered distribution. Counts
//! are added to the context, never to the distributions themselves, and are
//! committed only when [`TrainerContext::train`] runs. Derived distributions
//! (order-N, views) do not count anything: their trainers route each count to
//! the distributions they are built from.
//!
//! Training smooths toward the null model:
//!
//! ```text
//! weight(s) = (count(s) + null_weight * null(s)) / sum over all s'
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};
use symbol_core::{AtomicSymbol, Symbol, SymbolError, TranslationTable, dna};
use symbol_count::IndexedCount;

use crate::distribution::null_shares;
use crate::{DistError, DistId, DistRef};

/// Per-distribution training strategy.
pub(crate) enum Trainer {
    /// Dense counts for a simple distribution.
    Counting(IndexedCount),
    /// a, c, g, t counts for a DNA distribution.
    Dna([f64; 4]),
    /// Fixed distributions accept and drop counts.
    Ignore,
    /// Split the composite symbol and count the suffix in the context's
    /// sub-distribution.
    OrderN,
    /// Count the translated symbol in the source.
    Translated {
        table: Arc<TranslationTable>,
        source: DistRef,
    },
    /// Count each half of the pair in its own source.
    Pair { first: DistRef, second: DistRef },
}

struct Registered {
    dist: DistRef,
    trainer: Trainer,
}

/// Collects counts for a set of distributions and trains them together.
///
/// # Example
///
/// ```
/// use symbol_core::{Symbol, dna};
/// use symbol_dist::{Distribution, TrainerContext};
///
/// let dist = Distribution::dna();
/// let mut ctx = TrainerContext::new();
/// ctx.set_null_model_weight(4.0);
/// ctx.register_distribution(&dist);
/// ctx.add_count(&dist, &Symbol::Atomic(dna::a()), 4.0).unwrap();
/// ctx.train().unwrap();
///
/// // (4 + 4 * 0.25) / (4 + 4)
/// assert_eq!(dist.weight(&Symbol::Atomic(dna::a())).unwrap(), 0.625);
/// ```
#[derive(Default)]
pub struct TrainerContext {
    null_model_weight: f64,
    overrides: HashMap<DistId, f64>,
    entries: HashMap<DistId, Registered>,
    /// Registration order; training commits in this order.
    order: Vec<DistId>,
}

impl TrainerContext {
    /// An empty context with null-model weight 0 (plain maximum likelihood).
    pub fn new() -> Self {
        Self::default()
    }

    /// Pseudo-count mass given to the null model by default.
    pub fn null_model_weight(&self) -> f64 {
        self.null_model_weight
    }

    pub fn set_null_model_weight(&mut self, weight: f64) {
        self.null_model_weight = weight;
    }

    /// Override the null-model weight for one distribution.
    pub fn set_null_model_weight_for(&mut self, dist: &DistRef, weight: f64) {
        self.overrides.insert(dist.id(), weight);
    }

    /// The null-model weight that will be used when training `dist`.
    pub fn null_model_weight_for(&self, dist: &DistRef) -> f64 {
        self.overrides
            .get(&dist.id())
            .copied()
            .unwrap_or(self.null_model_weight)
    }

    /// Register `dist` for training, along with every distribution its
    /// counts are routed to. Registering twice is a no-op.
    pub fn register_distribution(&mut self, dist: &DistRef) {
        if self.entries.contains_key(&dist.id()) {
            return;
        }
        dist.register_with_trainer(self);
    }

    pub(crate) fn register_trainer(&mut self, dist: &DistRef, trainer: Trainer) {
        if self.entries.contains_key(&dist.id()) {
            return;
        }
        debug!("registered {} distribution {} for training", dist.kind(), dist.id());
        self.order.push(dist.id());
        self.entries.insert(
            dist.id(),
            Registered {
                dist: Arc::clone(dist),
                trainer,
            },
        );
    }

    pub fn is_registered(&self, dist: &DistRef) -> bool {
        self.entries.contains_key(&dist.id())
    }

    /// Number of registered distributions, including routed-to ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add `amount` observations of `sym` to `dist`.
    ///
    /// An ambiguity symbol splits `amount` across its matches in proportion
    /// to their null-model weight. The gap is accepted and ignored.
    ///
    /// # Panics
    /// Panics if `dist` was never registered with this context.
    pub fn add_count(&mut self, dist: &DistRef, sym: &Symbol, amount: f64) -> Result<(), DistError> {
        self.assert_registered(dist);
        dist.alphabet().validate(sym)?;
        match sym {
            Symbol::Atomic(a) => self.add_atomic(dist, a, amount),
            Symbol::Ambiguity(amb) if amb.is_gap() => Ok(()),
            Symbol::Ambiguity(amb) => {
                let shares = dist.with_null(|null| null_shares(null, amb.matches()))?;
                for (m, share) in shares {
                    self.add_atomic(dist, &m, amount * share)?;
                }
                Ok(())
            }
        }
    }

    fn add_atomic(&mut self, dist: &DistRef, sym: &AtomicSymbol, amount: f64) -> Result<(), DistError> {
        trace!("count {amount} of {sym} in {}", dist.id());
        let routes = match &mut self.entry_mut(dist).trainer {
            Trainer::Counting(counts) => return Ok(counts.increase_count(sym, amount)?),
            Trainer::Dna(slots) => {
                slots[dna_slot(dist, sym)?] += amount;
                return Ok(());
            }
            Trainer::Ignore => {
                dist.alphabet().validate_atomic(sym)?;
                return Ok(());
            }
            Trainer::OrderN => {
                let (prefix, suffix) = dist.alphabet().split_symbol(sym)?;
                vec![(dist.distribution_for(&prefix)?, suffix)]
            }
            Trainer::Translated { table, source } => {
                vec![(Arc::clone(source), table.translate(sym)?)]
            }
            Trainer::Pair { first, second } => match sym.parts() {
                [x, y] => vec![(Arc::clone(first), x.clone()), (Arc::clone(second), y.clone())],
                _ => return Err(SymbolError::invalid(sym, dist.alphabet()).into()),
            },
        };

        for (target, sym) in routes {
            // A sub-distribution swapped in after registration.
            if !self.is_registered(&target) {
                self.register_distribution(&target);
            }
            self.add_atomic(&target, &sym, amount)?;
        }
        Ok(())
    }

    /// The count accumulated for `sym` in `dist`.
    ///
    /// Routed trainers report the count held by the distribution they route
    /// to. Fixed distributions and pairs hold no counts of their own and
    /// report zero.
    ///
    /// # Panics
    /// Panics if `dist` was never registered with this context.
    pub fn count(&self, dist: &DistRef, sym: &AtomicSymbol) -> Result<f64, DistError> {
        match &self.entry(dist).trainer {
            Trainer::Counting(counts) => Ok(counts.count(sym)?),
            Trainer::Dna(slots) => Ok(slots[dna_slot(dist, sym)?]),
            Trainer::Ignore | Trainer::Pair { .. } => {
                dist.alphabet().validate_atomic(sym)?;
                Ok(0.0)
            }
            Trainer::OrderN => {
                let (prefix, suffix) = dist.alphabet().split_symbol(sym)?;
                let sub = dist.distribution_for(&prefix)?;
                if self.is_registered(&sub) {
                    self.count(&sub, &suffix)
                } else {
                    Ok(0.0)
                }
            }
            Trainer::Translated { table, source } => self.count(source, &table.translate(sym)?),
        }
    }

    /// Commit smoothed weights to every counting distribution, in
    /// registration order. Each distribution changes in a single event.
    ///
    /// Stops at the first error (typically a veto); distributions committed
    /// before it keep their new weights.
    pub fn train(&mut self) -> Result<(), DistError> {
        for id in &self.order {
            let Some(entry) = self.entries.get(id) else {
                continue;
            };
            let counts: Vec<f64> = match &entry.trainer {
                Trainer::Counting(counts) => (0..counts.len()).map(|i| counts.count_at(i)).collect(),
                Trainer::Dna(slots) => slots.to_vec(),
                _ => continue,
            };
            let weight = self
                .overrides
                .get(id)
                .copied()
                .unwrap_or(self.null_model_weight);
            commit_smoothed(&entry.dist, &counts, weight)?;
        }
        Ok(())
    }

    /// Zero every accumulated count.
    pub fn clear_counts(&mut self) {
        for entry in self.entries.values_mut() {
            match &mut entry.trainer {
                Trainer::Counting(counts) => counts.zero_counts(),
                Trainer::Dna(slots) => *slots = [0.0; 4],
                _ => {}
            }
        }
    }

    fn assert_registered(&self, dist: &DistRef) {
        assert!(
            self.is_registered(dist),
            "distribution {} is not registered with this trainer context",
            dist.id()
        );
    }

    fn entry(&self, dist: &DistRef) -> &Registered {
        match self.entries.get(&dist.id()) {
            Some(entry) => entry,
            None => panic!("distribution {} is not registered with this trainer context", dist.id()),
        }
    }

    fn entry_mut(&mut self, dist: &DistRef) -> &mut Registered {
        match self.entries.get_mut(&dist.id()) {
            Some(entry) => entry,
            None => panic!("distribution {} is not registered with this trainer context", dist.id()),
        }
    }
}

fn dna_slot(dist: &DistRef, sym: &AtomicSymbol) -> Result<usize, DistError> {
    dna::index_of(sym).ok_or_else(|| SymbolError::invalid(sym, dist.alphabet()).into())
}

/// `counts` are in alphabet order.
fn commit_smoothed(dist: &DistRef, counts: &[f64], null_weight: f64) -> Result<(), DistError> {
    let null = dist.null_model();
    let mut weights = Vec::with_capacity(counts.len());
    for (sym, count) in dist.alphabet().iter().zip(counts) {
        let prior = if null_weight == 0.0 {
            0.0
        } else {
            null_weight * null.weight_atomic(&sym)?
        };
        weights.push(count + prior);
    }

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        debug!("no counts or pseudo-counts for {}, weights left unchanged", dist.id());
        return Ok(());
    }
    for w in &mut weights {
        *w /= total;
    }
    debug!("training {} from {total} observations", dist.id());
    dist.replace_weights(&weights)
}

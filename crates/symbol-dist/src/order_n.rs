//! Order-N conditional distributions.
//!
//! An order-N distribution lives over a composite alphabet `C x S` (or
//! `A1 x .. x An x S`). Its weights are never stored directly: the weight of
//! `(c, s)` is the weight of `s` in the sub-distribution registered for
//! context `c`. Each sub-distribution is an ordinary distribution over the
//! conditioned alphabet `S`, so it can be trained, smoothed and observed on
//! its own.
//!
//! Every context gets its sub-distribution at construction. They are kept
//! either in a dense vector addressed by the conditioning alphabet's index,
//! or in a hash map keyed by context when the conditioning alphabet is too
//! large for an index.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::debug;
use symbol_core::{Alphabet, AtomicSymbol, SymbolError};
use symbol_index::AlphabetIndex;

use crate::change::ForwardMode;
use crate::distribution::{LinkRole, Variant};
use crate::{DistError, DistRef, Distribution, DistributionFactory, read, write};

/// Conditioning alphabets up to this size use [`Storage::Indexed`] by default.
pub const INDEXED_CONDITIONING_LIMIT: usize = 1 << 16;

/// How an order-N distribution stores its sub-distributions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Storage {
    /// Dense vector addressed by the conditioning symbol's index.
    Indexed,
    /// Hash map keyed by conditioning symbol.
    Mapped,
}

enum SubDistributions {
    Indexed { index: AlphabetIndex, dists: Vec<DistRef> },
    Mapped(HashMap<AtomicSymbol, DistRef>),
}

pub(crate) struct OrderN {
    conditioning: Alphabet,
    conditioned: Alphabet,
    subs: RwLock<SubDistributions>,
}

impl OrderN {
    pub(crate) fn conditioned(&self) -> &Alphabet {
        &self.conditioned
    }

    pub(crate) fn distribution_for(&self, context: &AtomicSymbol) -> Result<DistRef, DistError> {
        match &*read(&self.subs) {
            SubDistributions::Indexed { index, dists } => Ok(Arc::clone(&dists[index.index_for(context)?])),
            SubDistributions::Mapped(map) => map
                .get(context)
                .cloned()
                .ok_or_else(|| SymbolError::invalid(context, &self.conditioning).into()),
        }
    }

    /// Every sub-distribution, in conditioning-alphabet order.
    pub(crate) fn distributions(&self) -> Vec<DistRef> {
        match &*read(&self.subs) {
            SubDistributions::Indexed { dists, .. } => dists.clone(),
            SubDistributions::Mapped(map) => self
                .conditioning
                .iter()
                .filter_map(|c| map.get(&c).cloned())
                .collect(),
        }
    }

    fn replace(&self, context: &AtomicSymbol, dist: DistRef) -> Result<Option<DistRef>, DistError> {
        match &mut *write(&self.subs) {
            SubDistributions::Indexed { index, dists } => {
                let i = index.index_for(context)?;
                Ok(Some(std::mem::replace(&mut dists[i], dist)))
            }
            SubDistributions::Mapped(map) => Ok(map.insert(context.clone(), dist)),
        }
    }
}

impl Distribution {
    /// An order-N distribution over the composite `alphabet`, with one
    /// sub-distribution per conditioning context built by `factory`.
    ///
    /// Storage is chosen from the size of the conditioning alphabet. Fails
    /// with [`DistError::IncompatibleAlphabet`] if `alphabet` has fewer than
    /// two components or the factory builds over the wrong alphabet.
    ///
    /// ```
    /// use symbol_core::{Alphabet, dna};
    /// use symbol_dist::{Distribution, SimpleFactory};
    ///
    /// let pairs = Alphabet::power(&dna::alphabet(), 2).unwrap();
    /// let dist = Distribution::order_n(&pairs, &SimpleFactory).unwrap();
    /// assert_eq!(dist.conditioning_alphabet().unwrap().size(), 4);
    /// ```
    pub fn order_n<F>(alphabet: &Alphabet, factory: &F) -> Result<DistRef, DistError>
    where
        F: DistributionFactory + ?Sized,
    {
        let (conditioning, _) = alphabet.split_conditioning()?;
        let storage = if conditioning.size() <= INDEXED_CONDITIONING_LIMIT {
            Storage::Indexed
        } else {
            Storage::Mapped
        };
        Self::order_n_with_storage(alphabet, factory, storage)
    }

    /// As [`Distribution::order_n`], with explicit storage.
    pub fn order_n_with_storage<F>(
        alphabet: &Alphabet,
        factory: &F,
        storage: Storage,
    ) -> Result<DistRef, DistError>
    where
        F: DistributionFactory + ?Sized,
    {
        let (conditioning, conditioned) = alphabet.split_conditioning()?;

        let mut contexts = Vec::new();
        let mut dists = Vec::new();
        for context in conditioning.iter() {
            let dist = factory.create(&conditioned)?;
            if dist.alphabet() != &conditioned {
                return Err(SymbolError::incompatible(&conditioned, dist.alphabet()).into());
            }
            contexts.push(context);
            dists.push(dist);
        }

        let subs = match storage {
            Storage::Indexed => SubDistributions::Indexed {
                index: AlphabetIndex::new(&conditioning)?,
                dists: dists.clone(),
            },
            Storage::Mapped => {
                SubDistributions::Mapped(contexts.into_iter().zip(dists.iter().cloned()).collect())
            }
        };
        debug!(
            "order-N over {alphabet}: {} contexts, {storage:?} storage",
            conditioning.size()
        );

        let order_n = OrderN {
            conditioning,
            conditioned,
            subs: RwLock::new(subs),
        };
        Ok(Distribution::order_n_from(alphabet.clone(), order_n, &dists))
    }

    fn as_order_n(&self) -> Result<&OrderN, DistError> {
        match self.variant() {
            Variant::OrderN(order_n) => Ok(order_n),
            _ => Err(DistError::IncompatibleAlphabet {
                expected: "order-N distribution".to_string(),
                got: format!("{} distribution over {}", self.kind(), self.alphabet()),
            }),
        }
    }

    /// The alphabet of contexts, for an order-N distribution.
    pub fn conditioning_alphabet(&self) -> Option<&Alphabet> {
        self.as_order_n().ok().map(|o| &o.conditioning)
    }

    /// The alphabet each sub-distribution is over, for an order-N distribution.
    pub fn conditioned_alphabet(&self) -> Option<&Alphabet> {
        self.as_order_n().ok().map(|o| &o.conditioned)
    }

    /// The sub-distribution for `context`.
    pub fn distribution_for(&self, context: &AtomicSymbol) -> Result<DistRef, DistError> {
        self.as_order_n()?.distribution_for(context)
    }

    /// Every sub-distribution of an order-N distribution, in context order.
    /// Empty for any other variant.
    pub fn sub_distributions(&self) -> Vec<DistRef> {
        self.as_order_n().map(OrderN::distributions).unwrap_or_default()
    }

    /// Replace the sub-distribution for `context`.
    ///
    /// `dist` must be over the conditioned alphabet. Trainer contexts that
    /// already registered this distribution pick the new sub-distribution up
    /// the next time a count is routed to it.
    pub fn set_distribution_for(
        self: &Arc<Self>,
        context: &AtomicSymbol,
        dist: &DistRef,
    ) -> Result<(), DistError> {
        let order_n = self.as_order_n()?;
        order_n.conditioning.validate_atomic(context)?;
        if dist.alphabet() != &order_n.conditioned {
            return Err(SymbolError::incompatible(&order_n.conditioned, dist.alphabet()).into());
        }

        if let Some(old) = order_n.replace(context, Arc::clone(dist))? {
            self.unlink(LinkRole::Source, Some(old.id()));
        }
        self.link(dist, LinkRole::Source, ForwardMode::Weights);
        Ok(())
    }
}

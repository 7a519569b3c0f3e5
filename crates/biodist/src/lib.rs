//! Symbol probability distributions over biological alphabets.
//!
//! This is the facade crate that wires together the lower-level components:
//! - [`symbol_core`]: symbols, alphabets, DNA and translation tables
//! - [`symbol_count`]: dense per-symbol counts
//! - [`symbol_dist`]: distributions, change notification, training and views
//! - [`tools`]: comparison, information measures and sequence generation
//!
//! [`SequenceModel`] bundles an order-K DNA model with its trainer.
//!
//! # Quick Start
//!
//! ```
//! use biodist::SequenceModel;
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! let mut model = SequenceModel::new(1)?;
//! model.set_null_model_weight(1.0);
//! model.learn("acgtacgtaacc")?;
//! model.train()?;
//! let seq = model.generate(20, &mut SmallRng::seed_from_u64(7))?;
//! assert_eq!(seq.len(), 20);
//! # Ok::<(), biodist::DistError>(())
//! ```

pub mod tools;

use std::fs;
use std::io;
use std::path::Path;

use log::debug;
use rand::Rng;

pub use symbol_core::{
    Alphabet, AmbiguitySymbol, AtomicSymbol, Symbol, SymbolError, TableId, TranslationTable, dna,
};
pub use symbol_count::IndexedCount;
pub use symbol_dist::{
    ChangeEvent, ChangeKind, ChangeListener, ChangeSupport, DistError, DistId, DistRef, Distribution,
    DistributionFactory, DistributionKind, INDEXED_CONDITIONING_LIMIT, ListenerId, SimpleFactory,
    Storage, TrainerContext, UniformFactory, ViewCache, WEIGHT_TOLERANCE, WeightChange, WeightSnapshot,
};

/// A DNA model conditioned on the previous `order` nucleotides.
///
/// Order 0 is a single DNA distribution. Order K > 0 is an order-N
/// distribution over DNA^(K+1) with one DNA sub-distribution per context.
pub struct SequenceModel {
    order: usize,
    dist: DistRef,
    trainer: TrainerContext,
}

impl SequenceModel {
    pub fn new(order: usize) -> Result<Self, DistError> {
        let dist = if order == 0 {
            Distribution::dna()
        } else {
            let alphabet = Alphabet::power(&dna::alphabet(), order + 1)?;
            Distribution::order_n(&alphabet, &|_: &Alphabet| Ok::<_, DistError>(Distribution::dna()))?
        };
        let mut trainer = TrainerContext::new();
        trainer.register_distribution(&dist);
        debug!("created order-{order} model over {}", dist.alphabet());
        Ok(SequenceModel { order, dist, trainer })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn distribution(&self) -> &DistRef {
        &self.dist
    }

    /// Pseudo-count weight given to the uniform null model when training.
    pub fn set_null_model_weight(&mut self, weight: f64) {
        self.trainer.set_null_model_weight(weight);
    }

    /// Count one nucleotide string. Returns the number of observations.
    ///
    /// Nothing changes until [`train`](Self::train) is called.
    pub fn learn(&mut self, text: &str) -> Result<usize, DistError> {
        let seq = dna::parse(text)?;
        let counted = tools::count_sequence(&mut self.trainer, &self.dist, &seq)?;
        debug!("learned {counted} observations from {} symbols", seq.len());
        Ok(counted)
    }

    /// Set the weights from everything learned so far.
    ///
    /// Counts accumulate across calls; a context that has seen nothing and
    /// has no null-model weight keeps its previous weights.
    pub fn train(&mut self) -> Result<(), DistError> {
        self.trainer.train()
    }

    /// Forget every count without touching the weights.
    pub fn clear_counts(&mut self) {
        self.trainer.clear_counts();
    }

    /// Every (context, distribution) pair, in alphabet order.
    ///
    /// An order-0 model has one entry with no context.
    pub fn contexts(&self) -> Vec<(Option<AtomicSymbol>, DistRef)> {
        let Some(conditioning) = self.dist.conditioning_alphabet() else {
            return vec![(None, self.dist.clone())];
        };
        conditioning
            .iter()
            .filter_map(|ctx| {
                let sub = self.dist.distribution_for(&ctx).ok()?;
                Some((Some(ctx), sub))
            })
            .collect()
    }

    /// Contexts whose distribution cannot be sampled yet, rendered as text.
    pub fn untrained_contexts(&self) -> Result<Vec<String>, DistError> {
        let mut out = Vec::new();
        for (ctx, dist) in self.contexts() {
            if !tools::is_normalized(&dist)? {
                out.push(ctx.as_ref().map(tokens).unwrap_or_default());
            }
        }
        Ok(out)
    }

    /// The complementary-strand view of every context's distribution.
    pub fn complement(&self, cache: &ViewCache) -> Result<Vec<(Option<AtomicSymbol>, DistRef)>, DistError> {
        self.contexts()
            .into_iter()
            .map(|(ctx, dist)| Ok((ctx, cache.complement(&dist)?)))
            .collect()
    }

    pub fn generate<R: Rng>(&self, len: usize, rng: &mut R) -> Result<Vec<Symbol>, DistError> {
        tools::generate_sequence(&self.dist, len, rng)
    }
}

/// The tokens of `sym`'s parts, e.g. `"ac"` for the pair (a, c).
pub fn tokens(sym: &AtomicSymbol) -> String {
    sym.parts().iter().map(|p| p.token().unwrap_or('?')).collect()
}

/// Load a sequence file: one sequence per line, `#` starts a comment line.
pub fn load_sequences(path: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_sequences(&content))
}

/// The non-blank, non-comment lines of `content`, trimmed.
pub fn parse_sequences(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

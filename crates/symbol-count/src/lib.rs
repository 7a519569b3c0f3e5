//! Dense per-symbol count accumulator.
//!
//! [`IndexedCount`] stores one `f64` count per atomic symbol of an alphabet in
//! a contiguous array addressed by an [`AlphabetIndex`]. Counts are real-valued
//! because ambiguous observations are split fractionally across the symbols
//! they may stand for.
//!
//! Lifecycle: created empty (all zero), incremented with
//! [`IndexedCount::increase_count`], reset with [`IndexedCount::zero_counts`].

use symbol_core::{Alphabet, AtomicSymbol, SymbolError};
use symbol_index::AlphabetIndex;

/// Per-symbol counts over one alphabet.
///
/// # Example
///
/// ```
/// use symbol_core::dna;
/// use symbol_count::IndexedCount;
///
/// let mut counts = IndexedCount::new(&dna::alphabet()).unwrap();
/// counts.increase_count(&dna::a(), 2.0).unwrap();
/// counts.increase_count(&dna::a(), 1.0).unwrap();
/// assert_eq!(counts.count(&dna::a()).unwrap(), 3.0);
/// assert_eq!(counts.total(), 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct IndexedCount {
    index: AlphabetIndex,
    counts: Vec<f64>,
}

impl IndexedCount {
    /// Create an all-zero accumulator for `alphabet`.
    pub fn new(alphabet: &Alphabet) -> Result<Self, SymbolError> {
        Ok(Self::with_index(AlphabetIndex::new(alphabet)?))
    }

    /// Create an all-zero accumulator over an existing index.
    pub fn with_index(index: AlphabetIndex) -> Self {
        let counts = vec![0.0; index.len()];
        IndexedCount { index, counts }
    }

    pub fn alphabet(&self) -> &Alphabet {
        self.index.alphabet()
    }

    pub fn count(&self, sym: &AtomicSymbol) -> Result<f64, SymbolError> {
        Ok(self.counts[self.index.index_for(sym)?])
    }

    pub fn set_count(&mut self, sym: &AtomicSymbol, count: f64) -> Result<(), SymbolError> {
        let i = self.index.index_for(sym)?;
        self.counts[i] = count;
        Ok(())
    }

    /// Add `amount` to the count of `sym`.
    pub fn increase_count(&mut self, sym: &AtomicSymbol, amount: f64) -> Result<(), SymbolError> {
        let i = self.index.index_for(sym)?;
        self.counts[i] += amount;
        Ok(())
    }

    /// Copy every count from `other`, which must share this alphabet.
    pub fn set_counts(&mut self, other: &IndexedCount) -> Result<(), SymbolError> {
        if other.alphabet() != self.alphabet() {
            return Err(SymbolError::incompatible(self.alphabet(), other.alphabet()));
        }
        self.counts.copy_from_slice(&other.counts);
        Ok(())
    }

    /// Reset every count to zero.
    pub fn zero_counts(&mut self) {
        self.counts.fill(0.0);
    }

    /// Sum of all counts.
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Count at a raw index position.
    #[inline]
    pub fn count_at(&self, index: usize) -> f64 {
        self.counts[index]
    }

    /// `(symbol, count)` pairs in alphabet order.
    pub fn iter(&self) -> impl Iterator<Item = (AtomicSymbol, f64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &c)| (self.index.symbol_for(i), c))
    }

    /// Number of symbols counted.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use symbol_core::dna;

    #[test]
    fn new_counts_are_zero() {
        let counts = IndexedCount::new(&dna::alphabet()).unwrap();
        assert_eq!(counts.len(), 4);
        for (_, c) in counts.iter() {
            assert_eq!(c, 0.0);
        }
        assert_eq!(counts.total(), 0.0);
    }

    #[test]
    fn increase_accumulates_fractions() {
        let mut counts = IndexedCount::new(&dna::alphabet()).unwrap();
        counts.increase_count(&dna::g(), 0.25).unwrap();
        counts.increase_count(&dna::g(), 0.5).unwrap();
        counts.increase_count(&dna::t(), 1.0).unwrap();

        assert!((counts.count(&dna::g()).unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(counts.count(&dna::a()).unwrap(), 0.0);
        assert!((counts.total() - 1.75).abs() < 1e-12);
    }

    #[test]
    fn set_count_overwrites() {
        let mut counts = IndexedCount::new(&dna::alphabet()).unwrap();
        counts.increase_count(&dna::c(), 4.0).unwrap();
        counts.set_count(&dna::c(), 1.5).unwrap();
        assert_eq!(counts.count(&dna::c()).unwrap(), 1.5);
    }

    #[test]
    fn zero_counts_resets() {
        let mut counts = IndexedCount::new(&dna::alphabet()).unwrap();
        counts.increase_count(&dna::a(), 3.0).unwrap();
        counts.zero_counts();
        assert_eq!(counts.total(), 0.0);
    }

    #[test]
    fn foreign_symbol_rejected() {
        let mut counts = IndexedCount::new(&dna::alphabet()).unwrap();
        let uracil = AtomicSymbol::basic("uracil", 'u');
        assert!(counts.increase_count(&uracil, 1.0).is_err());
        assert!(counts.count(&uracil).is_err());
    }

    #[test]
    fn set_counts_copies_matching_alphabet() {
        let mut src = IndexedCount::new(&dna::alphabet()).unwrap();
        src.increase_count(&dna::a(), 2.0).unwrap();
        let mut dst = IndexedCount::new(&dna::alphabet()).unwrap();
        dst.set_counts(&src).unwrap();
        assert_eq!(dst.count(&dna::a()).unwrap(), 2.0);

        let pairs = Alphabet::power(&dna::alphabet(), 2).unwrap();
        let mut other = IndexedCount::new(&pairs).unwrap();
        assert!(matches!(
            other.set_counts(&src),
            Err(SymbolError::IncompatibleAlphabet { .. })
        ));
    }

    #[test]
    fn composite_counts() {
        let pairs = Alphabet::power(&dna::alphabet(), 2).unwrap();
        let mut counts = IndexedCount::new(&pairs).unwrap();
        let ag = pairs.symbol_from_parts(&[dna::a(), dna::g()]).unwrap();
        counts.increase_count(&ag, 1.0).unwrap();

        let (sym, c) = counts.iter().nth(2).unwrap();
        assert_eq!(sym, ag);
        assert_eq!(c, 1.0);
        assert_eq!(counts.count_at(2), 1.0);
    }
}

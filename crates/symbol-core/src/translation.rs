//! Reversible symbol translation between two alphabets of equal size.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Alphabet, AtomicSymbol, Symbol, SymbolError};

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identifier of a [`TranslationTable`].
///
/// Identifiers are never reused, so they are safe cache keys even after the
/// table they named has been dropped.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TableId(u64);

impl TableId {
    fn next() -> Self {
        TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A bijection from the atomic symbols of `source` to those of `target`.
#[derive(Debug)]
pub struct TranslationTable {
    id: TableId,
    source: Alphabet,
    target: Alphabet,
    forward: HashMap<AtomicSymbol, AtomicSymbol>,
    reverse: HashMap<AtomicSymbol, AtomicSymbol>,
}

impl TranslationTable {
    /// Build a table from `(source symbol, target symbol)` pairs.
    ///
    /// Fails with [`SymbolError::IncompatibleAlphabet`] if the alphabets differ
    /// in size, and with [`SymbolError::InvalidSymbol`] if a pair names a
    /// non-member, maps a symbol twice, or leaves a source symbol unmapped.
    pub fn new(
        source: Alphabet,
        target: Alphabet,
        pairs: &[(AtomicSymbol, AtomicSymbol)],
    ) -> Result<Self, SymbolError> {
        if source.size() != target.size() {
            return Err(SymbolError::incompatible(&source, &target));
        }

        let mut forward = HashMap::with_capacity(pairs.len());
        let mut reverse = HashMap::with_capacity(pairs.len());
        for (from, to) in pairs {
            source.validate_atomic(from)?;
            target.validate_atomic(to)?;
            if forward.insert(from.clone(), to.clone()).is_some() {
                return Err(SymbolError::invalid(from, &source));
            }
            if reverse.insert(to.clone(), from.clone()).is_some() {
                return Err(SymbolError::invalid(to, &target));
            }
        }

        if let Some(missing) = source.iter().find(|s| !forward.contains_key(s)) {
            return Err(SymbolError::invalid(missing, &source));
        }

        Ok(Self::from_maps(source, target, forward, reverse))
    }

    /// Build a table whose pairs are known to form a bijection.
    pub(crate) fn from_pairs_unchecked(
        source: Alphabet,
        target: Alphabet,
        pairs: &[(AtomicSymbol, AtomicSymbol)],
    ) -> Self {
        let forward = pairs.iter().cloned().collect();
        let reverse = pairs.iter().map(|(f, t)| (t.clone(), f.clone())).collect();
        Self::from_maps(source, target, forward, reverse)
    }

    fn from_maps(
        source: Alphabet,
        target: Alphabet,
        forward: HashMap<AtomicSymbol, AtomicSymbol>,
        reverse: HashMap<AtomicSymbol, AtomicSymbol>,
    ) -> Self {
        TranslationTable {
            id: TableId::next(),
            source,
            target,
            forward,
            reverse,
        }
    }

    #[inline]
    pub fn id(&self) -> TableId {
        self.id
    }

    /// The alphabet symbols are translated from.
    pub fn source(&self) -> &Alphabet {
        &self.source
    }

    /// The alphabet symbols are translated into.
    pub fn target(&self) -> &Alphabet {
        &self.target
    }

    /// Map a source symbol to its target symbol.
    pub fn translate(&self, sym: &AtomicSymbol) -> Result<AtomicSymbol, SymbolError> {
        self.forward
            .get(sym)
            .cloned()
            .ok_or_else(|| SymbolError::invalid(sym, &self.source))
    }

    /// Map a target symbol back to its source symbol.
    pub fn untranslate(&self, sym: &AtomicSymbol) -> Result<AtomicSymbol, SymbolError> {
        self.reverse
            .get(sym)
            .cloned()
            .ok_or_else(|| SymbolError::invalid(sym, &self.target))
    }

    /// Translate any source symbol. Ambiguity symbols translate match by match.
    pub fn translate_symbol(&self, sym: &Symbol) -> Result<Symbol, SymbolError> {
        match sym {
            Symbol::Atomic(a) => Ok(Symbol::Atomic(self.translate(a)?)),
            Symbol::Ambiguity(amb) => {
                self.source.validate(sym)?;
                let mapped = amb
                    .matches()
                    .iter()
                    .map(|m| self.translate(m))
                    .collect::<Result<Vec<_>, _>>()?;
                self.target.ambiguity_for(&mapped)
            }
        }
    }

    /// Untranslate any target symbol. Ambiguity symbols untranslate match by match.
    pub fn untranslate_symbol(&self, sym: &Symbol) -> Result<Symbol, SymbolError> {
        match sym {
            Symbol::Atomic(a) => Ok(Symbol::Atomic(self.untranslate(a)?)),
            Symbol::Ambiguity(amb) => {
                self.target.validate(sym)?;
                let mapped = amb
                    .matches()
                    .iter()
                    .map(|m| self.untranslate(m))
                    .collect::<Result<Vec<_>, _>>()?;
                self.source.ambiguity_for(&mapped)
            }
        }
    }
}

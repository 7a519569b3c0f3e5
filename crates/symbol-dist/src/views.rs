//! Derived views: complement, translation and pairing.
//!
//! A view stores no weights of its own. Every query is answered live from
//! its source distributions, and changes to a source are forwarded to the
//! view's listeners. Views are canonicalised through a [`ViewCache`] so that
//! asking twice for the same view of the same source yields the same
//! distribution for as long as somebody holds it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, Weak};

use log::trace;
use rand::Rng;
use symbol_core::{Alphabet, AtomicSymbol, Symbol, SymbolError, TableId, TranslationTable, dna};

use crate::change::ForwardMode;
use crate::distribution::Variant;
use crate::{DistError, DistId, DistRef, Distribution, lock};

/// A view that reads its source through a translation table.
///
/// The view is over `table.source()`; its source distribution is over
/// `table.target()`.
pub(crate) struct TranslatedView {
    table: Arc<TranslationTable>,
    source: DistRef,
    cache: ViewCache,
    complement: bool,
}

impl TranslatedView {
    pub(crate) fn table(&self) -> &Arc<TranslationTable> {
        &self.table
    }

    pub(crate) fn source(&self) -> &DistRef {
        &self.source
    }

    pub(crate) fn is_complement(&self) -> bool {
        self.complement
    }

    pub(crate) fn weight(&self, sym: &AtomicSymbol) -> Result<f64, DistError> {
        let target = self.table.translate(sym)?;
        self.source.weight_atomic(&target)
    }

    /// `entries` re-expressed in the source's alphabet.
    pub(crate) fn translate_entries(
        &self,
        entries: &[(AtomicSymbol, f64)],
    ) -> Result<Vec<(AtomicSymbol, f64)>, DistError> {
        entries
            .iter()
            .map(|(sym, w)| Ok((self.table.translate(sym)?, *w)))
            .collect()
    }

    pub(crate) fn sample<R: Rng>(&self, rng: &mut R) -> Symbol {
        let drawn = self.source.sample_symbol(rng);
        match self.table.untranslate_symbol(&drawn) {
            Ok(sym) => sym,
            Err(err) => panic!("translation table {:?} is not a bijection: {err}", self.table.id()),
        }
    }

    pub(crate) fn null_model(&self) -> DistRef {
        let null = self.source.null_model();
        if self.complement {
            self.cache.complement_of(&null)
        } else {
            self.cache.translation_of(&self.table, &null)
        }
    }
}

/// A view over `first x second` whose weights are products.
pub(crate) struct PairView {
    first: DistRef,
    second: DistRef,
    cache: ViewCache,
}

impl PairView {
    pub(crate) fn first(&self) -> &DistRef {
        &self.first
    }

    pub(crate) fn second(&self) -> &DistRef {
        &self.second
    }

    /// `sym` must already be validated against the pair alphabet.
    pub(crate) fn weight(&self, sym: &AtomicSymbol) -> Result<f64, DistError> {
        match sym.parts() {
            [x, y] => Ok(self.first.weight_atomic(x)? * self.second.weight_atomic(y)?),
            _ => Err(DistError::InvalidSymbol {
                symbol: sym.name(),
                alphabet: format!("({} x {})", self.first.alphabet(), self.second.alphabet()),
            }),
        }
    }

    pub(crate) fn sample<R: Rng>(&self, rng: &mut R) -> Symbol {
        let x = self.first.sample_symbol(rng);
        let y = self.second.sample_symbol(rng);
        match (x, y) {
            (Symbol::Atomic(x), Symbol::Atomic(y)) => Symbol::Atomic(AtomicSymbol::tuple(vec![x, y])),
            (x, y) => panic!("pair sources must sample atomic symbols, got {x} and {y}"),
        }
    }

    pub(crate) fn null_model(&self, alphabet: &Alphabet) -> DistRef {
        let first = self.first.null_model();
        let second = self.second.null_model();
        self.cache.pair_of(alphabet, &first, &second)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum ViewKey {
    Complement(DistId),
    Translated(TableId, DistId),
    Pair(DistId, DistId),
}

/// Weak identity cache for derived views.
///
/// Entries are keyed by view type and source identity and hold the view
/// weakly: once every caller drops a view, the next lookup builds a fresh one
/// and the dead entry is pruned. Cloning a cache shares it.
#[derive(Clone, Default)]
pub struct ViewCache {
    views: Arc<Mutex<HashMap<ViewKey, Weak<Distribution>>>>,
}

static GLOBAL: OnceLock<ViewCache> = OnceLock::new();

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> ViewCache {
        GLOBAL.get_or_init(ViewCache::new).clone()
    }

    /// The complementary-strand view of a DNA distribution:
    /// `weight(x) = source.weight(complement(x))`.
    pub fn complement(&self, source: &DistRef) -> Result<DistRef, DistError> {
        if !dna::is_dna(source.alphabet()) {
            return Err(SymbolError::incompatible(&dna::alphabet(), source.alphabet()).into());
        }
        Ok(self.complement_of(source))
    }

    /// A view over `table.source()` reading `source` through `table`.
    /// `source` must be over `table.target()`.
    pub fn translated(&self, table: &Arc<TranslationTable>, source: &DistRef) -> Result<DistRef, DistError> {
        if table.target() != source.alphabet() {
            return Err(SymbolError::incompatible(table.target(), source.alphabet()).into());
        }
        Ok(self.translation_of(table, source))
    }

    /// The joint view of two independent distributions over
    /// `first.alphabet() x second.alphabet()`.
    pub fn pair(&self, first: &DistRef, second: &DistRef) -> Result<DistRef, DistError> {
        let alphabet = Alphabet::composite(vec![first.alphabet().clone(), second.alphabet().clone()])?;
        Ok(self.pair_of(&alphabet, first, second))
    }

    /// Number of live views.
    pub fn len(&self) -> usize {
        let mut views = lock(&self.views);
        views.retain(|_, v| v.strong_count() > 0);
        views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn complement_of(&self, source: &DistRef) -> DistRef {
        self.get_or_build(ViewKey::Complement(source.id()), || {
            let table = dna::complement_table();
            let view = TranslatedView {
                table: Arc::clone(&table),
                source: Arc::clone(source),
                cache: self.clone(),
                complement: true,
            };
            Distribution::view(
                dna::alphabet(),
                Variant::Translated(view),
                vec![(Arc::clone(source), ForwardMode::Translate(table))],
            )
        })
    }

    fn translation_of(&self, table: &Arc<TranslationTable>, source: &DistRef) -> DistRef {
        self.get_or_build(ViewKey::Translated(table.id(), source.id()), || {
            let view = TranslatedView {
                table: Arc::clone(table),
                source: Arc::clone(source),
                cache: self.clone(),
                complement: false,
            };
            Distribution::view(
                table.source().clone(),
                Variant::Translated(view),
                vec![(Arc::clone(source), ForwardMode::Translate(Arc::clone(table)))],
            )
        })
    }

    fn pair_of(&self, alphabet: &Alphabet, first: &DistRef, second: &DistRef) -> DistRef {
        self.get_or_build(ViewKey::Pair(first.id(), second.id()), || {
            let view = PairView {
                first: Arc::clone(first),
                second: Arc::clone(second),
                cache: self.clone(),
            };
            let mut sources = vec![(Arc::clone(first), ForwardMode::Opaque)];
            if !Arc::ptr_eq(first, second) {
                sources.push((Arc::clone(second), ForwardMode::Opaque));
            }
            Distribution::view(alphabet.clone(), Variant::Pair(view), sources)
        })
    }

    // `build` must not touch the cache: the map lock is held while it runs.
    fn get_or_build(&self, key: ViewKey, build: impl FnOnce() -> DistRef) -> DistRef {
        let mut views = lock(&self.views);
        views.retain(|_, v| v.strong_count() > 0);
        if let Some(live) = views.get(&key).and_then(Weak::upgrade) {
            trace!("view cache hit for {key:?}");
            return live;
        }
        let view = build();
        trace!("view cache miss for {key:?}, built {}", view.id());
        views.insert(key, Arc::downgrade(&view));
        view
    }
}

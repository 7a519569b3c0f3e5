//! Stable mapping between an alphabet's atomic symbols and dense integer indices.
//!
//! An [`AlphabetIndex`] assigns every atomic symbol its position in alphabet
//! order, so array-backed storage can address weights and counts directly.
//!
//! Simple alphabets keep two parallel structures:
//! - `entries`: symbols in alphabet order (position = index)
//! - `sorted_index`: indices sorted by the symbol they reference, for O(log n) lookup
//!
//! Composite alphabets do not store their tuples at all. A tuple's index is the
//! mixed-radix number formed by its component indices, first component most
//! significant, which matches composite iteration order.
//!
//! Alphabets are immutable, so an index built from one never goes stale.

use symbol_core::{Alphabet, AtomicSymbol, SymbolError};

/// Largest alphabet an index will be built for.
pub const MAX_INDEX_SIZE: usize = 1 << 24;

/// Whether `alphabet` is small enough to be addressed by an [`AlphabetIndex`].
pub fn is_indexable(alphabet: &Alphabet) -> bool {
    alphabet.size() <= MAX_INDEX_SIZE
}

/// Dense index over the atomic symbols of one alphabet.
#[derive(Debug, Clone)]
pub struct AlphabetIndex {
    alphabet: Alphabet,
    repr: IndexRepr,
}

#[derive(Debug, Clone)]
enum IndexRepr {
    Simple {
        /// Symbols in alphabet order. `entries[i]` is the symbol for index `i`.
        entries: Vec<AtomicSymbol>,
        /// Positions into `entries`, kept sorted by the symbol they reference.
        sorted_index: Vec<u32>,
    },
    Composite {
        components: Vec<AlphabetIndex>,
        /// Multiplier applied to each component's index.
        strides: Vec<usize>,
    },
}

impl AlphabetIndex {
    /// Build the index for `alphabet`.
    ///
    /// Fails with [`SymbolError::IncompatibleAlphabet`] if the alphabet has more
    /// than [`MAX_INDEX_SIZE`] atomic symbols.
    pub fn new(alphabet: &Alphabet) -> Result<Self, SymbolError> {
        if !is_indexable(alphabet) {
            return Err(SymbolError::IncompatibleAlphabet {
                expected: format!("alphabet of at most {MAX_INDEX_SIZE} symbols"),
                got: alphabet.name().to_string(),
            });
        }

        let repr = if alphabet.is_composite() {
            let components = alphabet
                .components()
                .iter()
                .map(AlphabetIndex::new)
                .collect::<Result<Vec<_>, _>>()?;

            let mut strides = vec![1usize; components.len()];
            for d in (0..components.len().saturating_sub(1)).rev() {
                strides[d] = strides[d + 1] * components[d + 1].len();
            }
            IndexRepr::Composite {
                components,
                strides,
            }
        } else {
            let entries: Vec<AtomicSymbol> = alphabet.iter().collect();
            let mut sorted_index: Vec<u32> = (0..entries.len() as u32).collect();
            sorted_index.sort_by(|&x, &y| entries[x as usize].cmp(&entries[y as usize]));
            IndexRepr::Simple {
                entries,
                sorted_index,
            }
        };

        Ok(AlphabetIndex {
            alphabet: alphabet.clone(),
            repr,
        })
    }

    /// The alphabet this index was built from.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Index of `sym`, or [`SymbolError::InvalidSymbol`] if it is not a member.
    pub fn index_for(&self, sym: &AtomicSymbol) -> Result<usize, SymbolError> {
        match &self.repr {
            IndexRepr::Simple {
                entries,
                sorted_index,
            } => sorted_index
                .binary_search_by(|&i| entries[i as usize].cmp(sym))
                .map(|pos| sorted_index[pos] as usize)
                .map_err(|_| SymbolError::invalid(sym, &self.alphabet)),
            IndexRepr::Composite {
                components,
                strides,
            } => {
                let parts = sym.parts();
                if !sym.is_tuple() || parts.len() != components.len() {
                    return Err(SymbolError::invalid(sym, &self.alphabet));
                }
                let mut index = 0;
                for ((component, part), stride) in components.iter().zip(parts).zip(strides) {
                    let i = component
                        .index_for(part)
                        .map_err(|_| SymbolError::invalid(sym, &self.alphabet))?;
                    index += i * stride;
                }
                Ok(index)
            }
        }
    }

    /// The symbol at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn symbol_for(&self, index: usize) -> AtomicSymbol {
        assert!(
            index < self.len(),
            "index {index} out of bounds for alphabet {} of size {}",
            self.alphabet.name(),
            self.len()
        );
        match &self.repr {
            IndexRepr::Simple { entries, .. } => entries[index].clone(),
            IndexRepr::Composite {
                components,
                strides,
            } => {
                let parts = components
                    .iter()
                    .zip(strides)
                    .map(|(component, stride)| component.symbol_for((index / stride) % component.len()))
                    .collect();
                AtomicSymbol::tuple(parts)
            }
        }
    }

    /// Number of indexed symbols.
    #[inline]
    pub fn len(&self) -> usize {
        match &self.repr {
            IndexRepr::Simple { entries, .. } => entries.len(),
            IndexRepr::Composite {
                components,
                strides,
            } => match (components.first(), strides.first()) {
                (Some(first), Some(stride)) => first.len() * stride,
                _ => 0,
            },
        }
    }

    /// Whether the alphabet has no symbols.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

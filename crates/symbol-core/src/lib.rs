//! Core symbol and alphabet types for probability distributions over sequences.
//!
//! This crate defines the contract every distribution is built on:
//!
//! - [`AtomicSymbol`]: a single, non-ambiguous alphabet element. Composite
//!   alphabets have atomic symbols that are tuples of component symbols.
//! - [`AmbiguitySymbol`]: stands for "one of" a set of atomic symbols. The
//!   empty set is the gap symbol.
//! - [`Symbol`]: either of the above.
//! - [`Alphabet`]: an immutable, finite, ordered set of atomic symbols, either
//!   simple (a list of symbols) or composite (a product of component alphabets).
//!
//! Symbols and alphabets are shared handles (`Arc` inside), so cloning is cheap
//! and equality first checks identity before falling back to structure.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use thiserror::Error;

pub mod dna;
mod translation;

pub use translation::{TableId, TranslationTable};

/// Errors raised when a symbol or alphabet does not fit where it is used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SymbolError {
    /// The symbol does not belong to (or cannot be resolved against) the alphabet.
    #[error("Symbol {symbol} is not in alphabet {alphabet}")]
    InvalidSymbol { symbol: String, alphabet: String },

    /// Two objects expected to share an alphabet do not.
    #[error("Alphabet mismatch: expected {expected}, got {got}")]
    IncompatibleAlphabet { expected: String, got: String },
}

impl SymbolError {
    /// Build an [`SymbolError::InvalidSymbol`] for `symbol` against `alphabet`.
    pub fn invalid(symbol: impl fmt::Display, alphabet: &Alphabet) -> Self {
        SymbolError::InvalidSymbol {
            symbol: symbol.to_string(),
            alphabet: alphabet.name().to_string(),
        }
    }

    /// Build an [`SymbolError::IncompatibleAlphabet`] from the two alphabets.
    pub fn incompatible(expected: &Alphabet, got: &Alphabet) -> Self {
        SymbolError::IncompatibleAlphabet {
            expected: expected.name().to_string(),
            got: got.name().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Atomic symbols
// ---------------------------------------------------------------------------

/// A single, non-ambiguous element of an alphabet.
///
/// Basic symbols carry a name and a one-character token. Tuple symbols belong
/// to composite alphabets and decompose into one atomic symbol per component.
#[derive(Clone)]
pub struct AtomicSymbol(Arc<AtomicData>);

#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
enum AtomicData {
    Basic { name: String, token: char },
    Tuple(Vec<AtomicSymbol>),
}

impl AtomicSymbol {
    /// Create a basic symbol. Two basic symbols with the same name and token are equal.
    pub fn basic(name: &str, token: char) -> Self {
        AtomicSymbol(Arc::new(AtomicData::Basic {
            name: name.to_string(),
            token,
        }))
    }

    /// Create a tuple symbol from its component parts.
    ///
    /// Membership in any particular composite alphabet is not checked here;
    /// use [`Alphabet::symbol_from_parts`] for a validated construction.
    pub fn tuple(parts: Vec<AtomicSymbol>) -> Self {
        AtomicSymbol(Arc::new(AtomicData::Tuple(parts)))
    }

    /// Human-readable name. Tuples render as `(a c)`.
    pub fn name(&self) -> String {
        match &*self.0 {
            AtomicData::Basic { name, .. } => name.clone(),
            AtomicData::Tuple(parts) => {
                let names: Vec<String> = parts.iter().map(|p| p.name()).collect();
                format!("({})", names.join(" "))
            }
        }
    }

    /// The token character of a basic symbol. Tuples have no token.
    pub fn token(&self) -> Option<char> {
        match &*self.0 {
            AtomicData::Basic { token, .. } => Some(*token),
            AtomicData::Tuple(_) => None,
        }
    }

    /// Component parts. A basic symbol is its own single part.
    pub fn parts(&self) -> &[AtomicSymbol] {
        match &*self.0 {
            AtomicData::Basic { .. } => std::slice::from_ref(self),
            AtomicData::Tuple(parts) => parts,
        }
    }

    /// Whether this is a tuple over a composite alphabet.
    pub fn is_tuple(&self) -> bool {
        matches!(&*self.0, AtomicData::Tuple(_))
    }

    /// Identity comparison: true only when both handles share one allocation.
    #[inline]
    pub fn same(&self, other: &AtomicSymbol) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for AtomicSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.same(other) || self.0 == other.0
    }
}

impl Eq for AtomicSymbol {}

impl Hash for AtomicSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialOrd for AtomicSymbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AtomicSymbol {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.same(other) {
            return Ordering::Equal;
        }
        self.0.cmp(&other.0)
    }
}

impl fmt::Debug for AtomicSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AtomicSymbol({})", self.name())
    }
}

impl fmt::Display for AtomicSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// ---------------------------------------------------------------------------
// Ambiguity symbols
// ---------------------------------------------------------------------------

/// A symbol standing for "one of" a set of atomic symbols.
///
/// The match set may be empty, in which case the symbol is a gap.
#[derive(Clone)]
pub struct AmbiguitySymbol(Arc<AmbiguityData>);

#[derive(PartialEq, Eq, Hash)]
struct AmbiguityData {
    name: String,
    token: Option<char>,
    matches: Vec<AtomicSymbol>,
}

impl AmbiguitySymbol {
    /// Create an ambiguity symbol. Matches are kept in the order given.
    pub fn new(name: &str, token: Option<char>, matches: Vec<AtomicSymbol>) -> Self {
        AmbiguitySymbol(Arc::new(AmbiguityData {
            name: name.to_string(),
            token,
            matches,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn token(&self) -> Option<char> {
        self.0.token
    }

    /// The atomic symbols this symbol may stand for.
    pub fn matches(&self) -> &[AtomicSymbol] {
        &self.0.matches
    }

    /// A gap matches nothing.
    pub fn is_gap(&self) -> bool {
        self.0.matches.is_empty()
    }
}

impl PartialEq for AmbiguitySymbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for AmbiguitySymbol {}

impl Hash for AmbiguitySymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for AmbiguitySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AmbiguitySymbol({} -> {:?})", self.0.name, self.0.matches)
    }
}

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

/// Any symbol a distribution can be queried with.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Symbol {
    Atomic(AtomicSymbol),
    Ambiguity(AmbiguitySymbol),
}

impl Symbol {
    /// The atomic symbols this symbol stands for. An atomic symbol matches itself.
    pub fn matches(&self) -> &[AtomicSymbol] {
        match self {
            Symbol::Atomic(a) => std::slice::from_ref(a),
            Symbol::Ambiguity(amb) => amb.matches(),
        }
    }

    pub fn as_atomic(&self) -> Option<&AtomicSymbol> {
        match self {
            Symbol::Atomic(a) => Some(a),
            Symbol::Ambiguity(_) => None,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Symbol::Ambiguity(amb) if amb.is_gap())
    }

    pub fn name(&self) -> String {
        match self {
            Symbol::Atomic(a) => a.name(),
            Symbol::Ambiguity(amb) => amb.name().to_string(),
        }
    }

    pub fn token(&self) -> Option<char> {
        match self {
            Symbol::Atomic(a) => a.token(),
            Symbol::Ambiguity(amb) => amb.token(),
        }
    }
}

impl From<AtomicSymbol> for Symbol {
    fn from(a: AtomicSymbol) -> Self {
        Symbol::Atomic(a)
    }
}

impl From<&AtomicSymbol> for Symbol {
    fn from(a: &AtomicSymbol) -> Self {
        Symbol::Atomic(a.clone())
    }
}

impl From<AmbiguitySymbol> for Symbol {
    fn from(amb: AmbiguitySymbol) -> Self {
        Symbol::Ambiguity(amb)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// ---------------------------------------------------------------------------
// Alphabets
// ---------------------------------------------------------------------------

/// An immutable, finite, ordered set of atomic symbols.
///
/// Iteration order is stable and significant: array-backed storage and
/// inverse-CDF sampling both depend on it. Composite alphabets iterate their
/// tuples lexicographically with the first component most significant.
#[derive(Clone)]
pub struct Alphabet(Arc<AlphabetData>);

#[derive(PartialEq)]
struct AlphabetData {
    name: String,
    kind: AlphabetKind,
    gap: AmbiguitySymbol,
}

#[derive(PartialEq)]
enum AlphabetKind {
    Simple {
        /// Symbols in alphabet order.
        symbols: Vec<AtomicSymbol>,
        /// The same symbols sorted, for O(log n) membership tests.
        sorted: Vec<AtomicSymbol>,
        ambiguities: Vec<AmbiguitySymbol>,
    },
    Composite {
        components: Vec<Alphabet>,
    },
}

impl Alphabet {
    /// Create a simple alphabet from its atomic symbols and named ambiguity symbols.
    ///
    /// Fails with [`SymbolError::InvalidSymbol`] if a symbol is repeated, is a
    /// tuple, or if an ambiguity symbol matches something outside the alphabet.
    pub fn simple(
        name: &str,
        symbols: Vec<AtomicSymbol>,
        ambiguities: Vec<AmbiguitySymbol>,
    ) -> Result<Self, SymbolError> {
        let mut sorted = symbols.clone();
        sorted.sort();

        let duplicate = sorted.windows(2).find(|w| w[0] == w[1]).map(|w| w[0].clone());
        let nested = symbols.iter().find(|s| s.is_tuple()).cloned();
        if let Some(bad) = duplicate.or(nested) {
            return Err(SymbolError::InvalidSymbol {
                symbol: bad.name(),
                alphabet: name.to_string(),
            });
        }

        for amb in &ambiguities {
            if let Some(bad) = amb
                .matches()
                .iter()
                .find(|m| sorted.binary_search(*m).is_err())
            {
                return Err(SymbolError::InvalidSymbol {
                    symbol: bad.name(),
                    alphabet: name.to_string(),
                });
            }
        }

        Ok(Self::simple_unchecked(name, symbols, ambiguities))
    }

    /// Build a simple alphabet from symbols already known to be well formed.
    pub(crate) fn simple_unchecked(
        name: &str,
        symbols: Vec<AtomicSymbol>,
        ambiguities: Vec<AmbiguitySymbol>,
    ) -> Self {
        let mut sorted = symbols.clone();
        sorted.sort();
        Alphabet(Arc::new(AlphabetData {
            name: name.to_string(),
            kind: AlphabetKind::Simple {
                symbols,
                sorted,
                ambiguities,
            },
            gap: AmbiguitySymbol::new("gap", Some('-'), Vec::new()),
        }))
    }

    /// Create a composite alphabet whose atomic symbols are tuples over `components`.
    ///
    /// Fails with [`SymbolError::IncompatibleAlphabet`] when `components` is empty.
    pub fn composite(components: Vec<Alphabet>) -> Result<Self, SymbolError> {
        if components.is_empty() {
            return Err(SymbolError::IncompatibleAlphabet {
                expected: "at least one component alphabet".to_string(),
                got: "()".to_string(),
            });
        }
        let names: Vec<&str> = components.iter().map(|a| a.name()).collect();
        let name = format!("({})", names.join(" x "));

        Ok(Alphabet(Arc::new(AlphabetData {
            name,
            kind: AlphabetKind::Composite { components },
            gap: AmbiguitySymbol::new("gap", Some('-'), Vec::new()),
        })))
    }

    /// The `n`-fold composite of `base` with itself.
    pub fn power(base: &Alphabet, n: usize) -> Result<Self, SymbolError> {
        Alphabet::composite(vec![base.clone(); n])
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Number of atomic symbols. Composite sizes saturate at `usize::MAX`.
    pub fn size(&self) -> usize {
        match &self.0.kind {
            AlphabetKind::Simple { symbols, .. } => symbols.len(),
            AlphabetKind::Composite { components } => components
                .iter()
                .fold(1usize, |acc, c| acc.saturating_mul(c.size())),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.0.kind, AlphabetKind::Composite { .. })
    }

    /// Component alphabets. A simple alphabet is its own single component.
    pub fn components(&self) -> &[Alphabet] {
        match &self.0.kind {
            AlphabetKind::Simple { .. } => std::slice::from_ref(self),
            AlphabetKind::Composite { components } => components,
        }
    }

    /// Identity comparison: true only when both handles share one allocation.
    #[inline]
    pub fn same(&self, other: &Alphabet) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Whether `sym` is one of this alphabet's atomic symbols.
    pub fn contains(&self, sym: &AtomicSymbol) -> bool {
        match &self.0.kind {
            AlphabetKind::Simple { sorted, .. } => sorted.binary_search(sym).is_ok(),
            AlphabetKind::Composite { components } => {
                sym.is_tuple()
                    && sym.parts().len() == components.len()
                    && components.iter().zip(sym.parts()).all(|(a, s)| a.contains(s))
            }
        }
    }

    /// Fail with [`SymbolError::InvalidSymbol`] unless `sym` is an atomic member.
    pub fn validate_atomic(&self, sym: &AtomicSymbol) -> Result<(), SymbolError> {
        if self.contains(sym) {
            Ok(())
        } else {
            Err(SymbolError::invalid(sym, self))
        }
    }

    /// Validate any symbol: atomic symbols must be members, ambiguity symbols
    /// must match only members. The gap (empty match set) is always valid.
    pub fn validate(&self, sym: &Symbol) -> Result<(), SymbolError> {
        match sym {
            Symbol::Atomic(a) => self.validate_atomic(a),
            Symbol::Ambiguity(amb) => {
                if amb.matches().iter().all(|m| self.contains(m)) {
                    Ok(())
                } else {
                    Err(SymbolError::invalid(amb.name(), self))
                }
            }
        }
    }

    /// Iterate atomic symbols in alphabet order.
    pub fn iter(&self) -> AlphabetIter {
        AlphabetIter::new(self)
    }

    /// Build the atomic symbol made of `parts`, one per component.
    ///
    /// For a simple alphabet this is the single part itself.
    pub fn symbol_from_parts(&self, parts: &[AtomicSymbol]) -> Result<AtomicSymbol, SymbolError> {
        match &self.0.kind {
            AlphabetKind::Simple { .. } => match parts {
                [only] => {
                    self.validate_atomic(only)?;
                    Ok(only.clone())
                }
                _ => Err(SymbolError::invalid(AtomicSymbol::tuple(parts.to_vec()), self)),
            },
            AlphabetKind::Composite { components } => {
                let sym = AtomicSymbol::tuple(parts.to_vec());
                if parts.len() != components.len() {
                    return Err(SymbolError::invalid(sym, self));
                }
                for (alpha, part) in components.iter().zip(parts) {
                    if !alpha.contains(part) {
                        return Err(SymbolError::invalid(sym, self));
                    }
                }
                Ok(sym)
            }
        }
    }

    /// Split a composite alphabet into its conditioning prefix (all but the
    /// last component) and conditioned suffix (the last component).
    ///
    /// A two-component alphabet conditions on its first component directly;
    /// longer ones condition on the composite of the leading components.
    pub fn split_conditioning(&self) -> Result<(Alphabet, Alphabet), SymbolError> {
        let components = self.components();
        if !self.is_composite() || components.len() < 2 {
            return Err(SymbolError::IncompatibleAlphabet {
                expected: "composite alphabet with at least two components".to_string(),
                got: self.name().to_string(),
            });
        }
        let last = components.len() - 1;
        let conditioning = if last == 1 {
            components[0].clone()
        } else {
            Alphabet::composite(components[..last].to_vec())?
        };
        Ok((conditioning, components[last].clone()))
    }

    /// Decompose an atomic symbol of a split alphabet into its conditioning
    /// prefix and conditioned suffix, mirroring [`Alphabet::split_conditioning`].
    pub fn split_symbol(
        &self,
        sym: &AtomicSymbol,
    ) -> Result<(AtomicSymbol, AtomicSymbol), SymbolError> {
        self.validate_atomic(sym)?;
        let parts = sym.parts();
        if parts.len() < 2 {
            return Err(SymbolError::invalid(sym, self));
        }
        let last = parts.len() - 1;
        let prefix = if last == 1 {
            parts[0].clone()
        } else {
            AtomicSymbol::tuple(parts[..last].to_vec())
        };
        Ok((prefix, parts[last].clone()))
    }

    /// The gap symbol: an ambiguity symbol matching nothing.
    pub fn gap_symbol(&self) -> Symbol {
        Symbol::Ambiguity(self.0.gap.clone())
    }

    /// Named ambiguity symbols of a simple alphabet.
    pub fn ambiguities(&self) -> &[AmbiguitySymbol] {
        match &self.0.kind {
            AlphabetKind::Simple { ambiguities, .. } => ambiguities,
            AlphabetKind::Composite { .. } => &[],
        }
    }

    /// The symbol standing for exactly `matches`.
    ///
    /// One match yields that atomic symbol, no matches yields the gap, a set
    /// equal to a named ambiguity symbol yields it, anything else yields an
    /// anonymous ambiguity symbol.
    pub fn ambiguity_for(&self, matches: &[AtomicSymbol]) -> Result<Symbol, SymbolError> {
        for m in matches {
            self.validate_atomic(m)?;
        }
        let mut set = matches.to_vec();
        set.sort();
        set.dedup();

        match set.as_slice() {
            [] => return Ok(self.gap_symbol()),
            [only] => return Ok(Symbol::Atomic(only.clone())),
            _ => {}
        }

        for amb in self.ambiguities() {
            let mut named = amb.matches().to_vec();
            named.sort();
            if named == set {
                return Ok(Symbol::Ambiguity(amb.clone()));
            }
        }

        let names: Vec<String> = set.iter().map(|s| s.name()).collect();
        let name = format!("[{}]", names.join(" "));
        Ok(Symbol::Ambiguity(AmbiguitySymbol::new(&name, None, set)))
    }

    /// Resolve a token character against a simple alphabet.
    ///
    /// Atomic tokens are tried first, then ambiguity tokens, then the gap.
    /// Lookup falls back to the lowercase token when the exact one is unknown.
    pub fn parse_token(&self, token: char) -> Result<Symbol, SymbolError> {
        let AlphabetKind::Simple {
            symbols,
            ambiguities,
            ..
        } = &self.0.kind
        else {
            return Err(SymbolError::invalid(token, self));
        };

        for candidate in [token, token.to_ascii_lowercase()] {
            if let Some(s) = symbols.iter().find(|s| s.token() == Some(candidate)) {
                return Ok(Symbol::Atomic(s.clone()));
            }
            if let Some(amb) = ambiguities.iter().find(|a| a.token() == Some(candidate)) {
                return Ok(Symbol::Ambiguity(amb.clone()));
            }
            if self.0.gap.token() == Some(candidate) {
                return Ok(self.gap_symbol());
            }
        }
        Err(SymbolError::invalid(token, self))
    }
}

impl PartialEq for Alphabet {
    fn eq(&self, other: &Self) -> bool {
        self.same(other) || self.0 == other.0
    }
}

impl Eq for Alphabet {}

impl Hash for Alphabet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Alphabet({})", self.0.name)
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

impl<'a> IntoIterator for &'a Alphabet {
    type Item = AtomicSymbol;
    type IntoIter = AlphabetIter;

    fn into_iter(self) -> AlphabetIter {
        self.iter()
    }
}

/// Iterator over an alphabet's atomic symbols in alphabet order.
///
/// Composite alphabets are walked like an odometer: the last component
/// advances fastest.
pub struct AlphabetIter {
    /// Symbols of each component, in component order.
    lists: Vec<Vec<AtomicSymbol>>,
    /// Current position within each component list.
    cursor: Vec<usize>,
    composite: bool,
    done: bool,
}

impl AlphabetIter {
    fn new(alphabet: &Alphabet) -> Self {
        let (lists, composite) = match &alphabet.0.kind {
            AlphabetKind::Simple { symbols, .. } => (vec![symbols.clone()], false),
            AlphabetKind::Composite { components } => {
                (
                    components
                        .iter()
                        .map(|c| c.iter().collect::<Vec<_>>())
                        .collect(),
                    true,
                )
            }
        };
        let done = lists.iter().any(|l: &Vec<AtomicSymbol>| l.is_empty());
        AlphabetIter {
            cursor: vec![0; lists.len()],
            lists,
            composite,
            done,
        }
    }
}

impl Iterator for AlphabetIter {
    type Item = AtomicSymbol;

    fn next(&mut self) -> Option<AtomicSymbol> {
        if self.done {
            return None;
        }

        let item = if self.composite {
            let parts = self
                .cursor
                .iter()
                .zip(&self.lists)
                .map(|(&i, list)| list[i].clone())
                .collect();
            AtomicSymbol::tuple(parts)
        } else {
            self.lists[0][self.cursor[0]].clone()
        };

        // Advance the odometer from the last component.
        let mut d = self.cursor.len();
        loop {
            if d == 0 {
                self.done = true;
                break;
            }
            d -= 1;
            self.cursor[d] += 1;
            if self.cursor[d] < self.lists[d].len() {
                break;
            }
            self.cursor[d] = 0;
        }

        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Alphabet {
        let a = AtomicSymbol::basic("alpha", 'a');
        let b = AtomicSymbol::basic("beta", 'b');
        let c = AtomicSymbol::basic("gamma", 'c');
        let ab = AmbiguitySymbol::new("alpha-or-beta", Some('x'), vec![a.clone(), b.clone()]);
        Alphabet::simple("ABC", vec![a, b, c], vec![ab]).unwrap()
    }

    #[test]
    fn simple_alphabet_iterates_in_declared_order() {
        let alpha = abc();
        let names: Vec<String> = alpha.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
        assert_eq!(alpha.size(), 3);
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let a = AtomicSymbol::basic("alpha", 'a');
        let result = Alphabet::simple("dup", vec![a.clone(), a], vec![]);
        assert!(matches!(result, Err(SymbolError::InvalidSymbol { .. })));
    }

    #[test]
    fn ambiguity_outside_alphabet_rejected() {
        let a = AtomicSymbol::basic("alpha", 'a');
        let z = AtomicSymbol::basic("zeta", 'z');
        let amb = AmbiguitySymbol::new("bad", None, vec![a.clone(), z]);
        let result = Alphabet::simple("bad", vec![a], vec![amb]);
        assert!(matches!(result, Err(SymbolError::InvalidSymbol { .. })));
    }

    #[test]
    fn structural_equality_of_symbols() {
        let one = AtomicSymbol::basic("alpha", 'a');
        let two = AtomicSymbol::basic("alpha", 'a');
        assert!(!one.same(&two));
        assert_eq!(one, two);
    }

    #[test]
    fn composite_iterates_lexicographically() {
        let alpha = abc();
        let pair = Alphabet::power(&alpha, 2).unwrap();
        assert_eq!(pair.size(), 9);
        assert_eq!(pair.name(), "(ABC x ABC)");

        let all: Vec<AtomicSymbol> = pair.iter().collect();
        assert_eq!(all.len(), 9);
        assert_eq!(all[0].name(), "(alpha alpha)");
        assert_eq!(all[1].name(), "(alpha beta)");
        assert_eq!(all[3].name(), "(beta alpha)");
        assert_eq!(all[8].name(), "(gamma gamma)");
    }

    #[test]
    fn composite_membership() {
        let alpha = abc();
        let pair = Alphabet::power(&alpha, 2).unwrap();
        let a = alpha.iter().next().unwrap();
        let good = pair.symbol_from_parts(&[a.clone(), a.clone()]).unwrap();
        assert!(pair.contains(&good));
        assert!(!pair.contains(&a));
        assert!(pair.symbol_from_parts(&[a.clone()]).is_err());

        let stranger = AtomicSymbol::basic("omega", 'o');
        assert!(pair.symbol_from_parts(&[a, stranger]).is_err());
    }

    #[test]
    fn composite_alphabets_compare_structurally() {
        let alpha = abc();
        let one = Alphabet::power(&alpha, 2).unwrap();
        let two = Alphabet::composite(vec![alpha.clone(), alpha.clone()]).unwrap();
        assert!(!one.same(&two));
        assert_eq!(one, two);
        assert_ne!(one, alpha);
    }

    #[test]
    fn split_conditioning_two_components() {
        let alpha = abc();
        let pair = Alphabet::power(&alpha, 2).unwrap();
        let (cond, last) = pair.split_conditioning().unwrap();
        assert_eq!(cond, alpha);
        assert_eq!(last, alpha);
    }

    #[test]
    fn split_conditioning_three_components() {
        let alpha = abc();
        let triple = Alphabet::power(&alpha, 3).unwrap();
        let (cond, last) = triple.split_conditioning().unwrap();
        assert_eq!(cond, Alphabet::power(&alpha, 2).unwrap());
        assert_eq!(last, alpha);

        let sym = triple.iter().nth(5).unwrap();
        let (prefix, suffix) = triple.split_symbol(&sym).unwrap();
        assert!(cond.contains(&prefix));
        assert!(last.contains(&suffix));
    }

    #[test]
    fn split_conditioning_rejects_simple() {
        assert!(matches!(
            abc().split_conditioning(),
            Err(SymbolError::IncompatibleAlphabet { .. })
        ));
    }

    #[test]
    fn validate_ambiguity_and_gap() {
        let alpha = abc();
        let x = alpha.parse_token('x').unwrap();
        assert!(alpha.validate(&x).is_ok());
        assert_eq!(x.matches().len(), 2);
        assert!(alpha.validate(&alpha.gap_symbol()).is_ok());
        assert!(alpha.gap_symbol().is_gap());
    }

    #[test]
    fn ambiguity_for_reuses_named_symbols() {
        let alpha = abc();
        let syms: Vec<AtomicSymbol> = alpha.iter().collect();

        let named = alpha.ambiguity_for(&[syms[1].clone(), syms[0].clone()]).unwrap();
        assert_eq!(named.name(), "alpha-or-beta");

        let single = alpha.ambiguity_for(&[syms[2].clone()]).unwrap();
        assert_eq!(single, Symbol::Atomic(syms[2].clone()));

        let anon = alpha.ambiguity_for(&[syms[0].clone(), syms[2].clone()]).unwrap();
        assert_eq!(anon.matches().len(), 2);

        assert!(alpha.ambiguity_for(&[]).unwrap().is_gap());
    }

    #[test]
    fn parse_token_falls_back_to_lowercase() {
        let alpha = abc();
        assert_eq!(alpha.parse_token('B').unwrap().name(), "beta");
        assert!(alpha.parse_token('q').is_err());
    }

    #[test]
    fn empty_composite_rejected() {
        assert!(Alphabet::composite(vec![]).is_err());
    }
}

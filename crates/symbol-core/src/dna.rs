//! The DNA alphabet: four nucleotides, IUPAC ambiguity codes and the gap.
//!
//! The alphabet and its four atomic symbols are process-wide singletons, so
//! code on a hot path can compare nucleotides by identity ([`index_of`]).

use std::sync::{Arc, OnceLock};

use crate::{Alphabet, AmbiguitySymbol, AtomicSymbol, Symbol, SymbolError, TranslationTable};

struct Dna {
    alphabet: Alphabet,
    /// a, c, g, t in alphabet order.
    nucleotides: [AtomicSymbol; 4],
    complement: Arc<TranslationTable>,
}

static DNA: OnceLock<Dna> = OnceLock::new();

/// IUPAC codes as (name, token, indices into a/c/g/t).
const IUPAC: &[(&str, char, &[usize])] = &[
    ("purine", 'r', &[0, 2]),
    ("pyrimidine", 'y', &[1, 3]),
    ("keto", 'k', &[2, 3]),
    ("amino", 'm', &[0, 1]),
    ("strong", 's', &[1, 2]),
    ("weak", 'w', &[0, 3]),
    ("not-adenine", 'b', &[1, 2, 3]),
    ("not-cytosine", 'd', &[0, 2, 3]),
    ("not-guanine", 'h', &[0, 1, 3]),
    ("not-thymine", 'v', &[0, 1, 2]),
    ("any", 'n', &[0, 1, 2, 3]),
];

fn dna() -> &'static Dna {
    DNA.get_or_init(|| {
        let nucleotides = [
            AtomicSymbol::basic("adenine", 'a'),
            AtomicSymbol::basic("cytosine", 'c'),
            AtomicSymbol::basic("guanine", 'g'),
            AtomicSymbol::basic("thymine", 't'),
        ];

        let ambiguities = IUPAC
            .iter()
            .map(|(name, token, idx)| {
                let matches = idx.iter().map(|&i| nucleotides[i].clone()).collect();
                AmbiguitySymbol::new(name, Some(*token), matches)
            })
            .collect();

        let alphabet = Alphabet::simple_unchecked("DNA", nucleotides.to_vec(), ambiguities);

        // a <-> t, c <-> g
        let pairs: Vec<(AtomicSymbol, AtomicSymbol)> = (0..4)
            .map(|i| (nucleotides[i].clone(), nucleotides[3 - i].clone()))
            .collect();
        let complement = Arc::new(TranslationTable::from_pairs_unchecked(
            alphabet.clone(),
            alphabet.clone(),
            &pairs,
        ));

        Dna {
            alphabet,
            nucleotides,
            complement,
        }
    })
}

/// The DNA alphabet.
pub fn alphabet() -> Alphabet {
    dna().alphabet.clone()
}

/// Whether `alphabet` is the DNA alphabet.
pub fn is_dna(alphabet: &Alphabet) -> bool {
    alphabet.same(&dna().alphabet) || *alphabet == dna().alphabet
}

pub fn a() -> AtomicSymbol {
    dna().nucleotides[0].clone()
}

pub fn c() -> AtomicSymbol {
    dna().nucleotides[1].clone()
}

pub fn g() -> AtomicSymbol {
    dna().nucleotides[2].clone()
}

pub fn t() -> AtomicSymbol {
    dna().nucleotides[3].clone()
}

/// The four nucleotides in alphabet order.
pub fn nucleotides() -> [AtomicSymbol; 4] {
    dna().nucleotides.clone()
}

/// The fully ambiguous nucleotide `n`.
pub fn n() -> Symbol {
    let any = IUPAC.len() - 1;
    Symbol::Ambiguity(dna().alphabet.ambiguities()[any].clone())
}

/// Slot of a nucleotide (a=0, c=1, g=2, t=3).
///
/// The singletons are matched by identity first; structurally equal copies
/// made elsewhere still resolve.
#[inline]
pub fn index_of(sym: &AtomicSymbol) -> Option<usize> {
    let nts = &dna().nucleotides;
    nts.iter()
        .position(|n| n.same(sym))
        .or_else(|| nts.iter().position(|n| n == sym))
}

/// Watson-Crick complement of a nucleotide.
pub fn complement(sym: &AtomicSymbol) -> Result<AtomicSymbol, SymbolError> {
    match index_of(sym) {
        Some(i) => Ok(dna().nucleotides[3 - i].clone()),
        None => Err(SymbolError::invalid(sym, &dna().alphabet)),
    }
}

/// Complement any DNA symbol. Ambiguity codes complement match by match and
/// the gap complements to itself.
pub fn complement_symbol(sym: &Symbol) -> Result<Symbol, SymbolError> {
    dna().complement.translate_symbol(sym)
}

/// The complement as a reversible translation table over DNA.
pub fn complement_table() -> Arc<TranslationTable> {
    Arc::clone(&dna().complement)
}

/// Parse a nucleotide string. Whitespace is skipped; case is ignored.
pub fn parse(seq: &str) -> Result<Vec<Symbol>, SymbolError> {
    let alphabet = &dna().alphabet;
    seq.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| alphabet.parse_token(c))
        .collect()
}

/// Render symbols back to their tokens. Symbols without a token render as `?`.
pub fn to_text(symbols: &[Symbol]) -> String {
    symbols.iter().map(|s| s.token().unwrap_or('?')).collect()
}

//! Whole-distribution utilities: comparison, information measures,
//! averaging, column profiles and sequence generation.

use std::collections::VecDeque;

use log::trace;
use rand::Rng;
use symbol_core::{Alphabet, AtomicSymbol, Symbol, SymbolError, dna};
use symbol_count::IndexedCount;
use symbol_dist::{DistError, DistRef, Distribution, TrainerContext, WEIGHT_TOLERANCE};

/// Steps an order-N walk takes before it starts emitting.
pub const BURN_IN: usize = 1000;

/// A fresh, untrained distribution suited to `alphabet`: the DNA variant for
/// DNA, a simple distribution otherwise.
pub fn new_distribution(alphabet: &Alphabet) -> Result<DistRef, DistError> {
    if dna::is_dna(alphabet) {
        Ok(Distribution::dna())
    } else {
        Distribution::simple(alphabet)
    }
}

/// Train `dist` from one uniformly random pseudo-count per symbol.
pub fn randomize<R: Rng>(dist: &DistRef, rng: &mut R) -> Result<(), DistError> {
    let mut ctx = TrainerContext::new();
    ctx.register_distribution(dist);
    for sym in dist.alphabet().iter() {
        let amount: f64 = rng.random();
        ctx.add_count(dist, &Symbol::Atomic(sym), amount)?;
    }
    ctx.train()
}

/// A distribution whose weights are `counts` normalised.
pub fn count_to_distribution(counts: &IndexedCount) -> Result<DistRef, DistError> {
    let dist = new_distribution(counts.alphabet())?;
    let mut ctx = TrainerContext::new();
    ctx.register_distribution(&dist);
    for (sym, count) in counts.iter() {
        ctx.add_count(&dist, &Symbol::Atomic(sym), count)?;
    }
    ctx.train()?;
    Ok(dist)
}

/// Whether `a` and `b` give every symbol exactly the same weight.
///
/// Distributions over different alphabets are never equal.
pub fn emission_spectra_equal(a: &DistRef, b: &DistRef) -> Result<bool, DistError> {
    if a.alphabet() != b.alphabet() {
        return Ok(false);
    }
    for sym in a.alphabet().iter() {
        if a.weight_atomic(&sym)? != b.weight_atomic(&sym)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Pairwise [`emission_spectra_equal`] over two equally long slices.
pub fn all_emission_spectra_equal(a: &[DistRef], b: &[DistRef]) -> Result<bool, DistError> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (x, y) in a.iter().zip(b) {
        if !emission_spectra_equal(x, y)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Per-symbol Kullback-Leibler terms `p * log(p / q)` in base `log_base`.
/// Symbols with `p = 0` contribute 0.
pub fn kl_distance(
    observed: &DistRef,
    expected: &DistRef,
    log_base: f64,
) -> Result<Vec<(AtomicSymbol, f64)>, DistError> {
    let ln_base = log_base.ln();
    observed
        .alphabet()
        .iter()
        .map(|sym| {
            let p = observed.weight_atomic(&sym)?;
            let q = expected.weight_atomic(&sym)?;
            let term = if p == 0.0 { 0.0 } else { p * (p / q).ln() / ln_base };
            Ok((sym, term))
        })
        .collect()
}

/// Per-symbol surprisal `-log(p)` in base `log_base`. Zero-weight symbols
/// are left out.
pub fn shannon_entropy(observed: &DistRef, log_base: f64) -> Result<Vec<(AtomicSymbol, f64)>, DistError> {
    let ln_base = log_base.ln();
    let mut out = Vec::new();
    for sym in observed.alphabet().iter() {
        let p = observed.weight_atomic(&sym)?;
        if p != 0.0 {
            out.push((sym, -p.ln() / ln_base));
        }
    }
    Ok(out)
}

/// Entropy of `observed` in bits.
pub fn bits_of_information(observed: &DistRef) -> Result<f64, DistError> {
    let mut total = 0.0;
    for (sym, surprisal) in shannon_entropy(observed, 2.0)? {
        total += observed.weight_atomic(&sym)? * surprisal;
    }
    Ok(total)
}

/// The mean of `dists`, which must share one alphabet.
pub fn average(dists: &[DistRef]) -> Result<DistRef, DistError> {
    let Some(first) = dists.first() else {
        return Err(DistError::IncompatibleAlphabet {
            expected: "at least one distribution".to_string(),
            got: "none".to_string(),
        });
    };
    let alphabet = first.alphabet();
    if let Some(odd) = dists.iter().find(|d| d.alphabet() != alphabet) {
        return Err(SymbolError::incompatible(alphabet, odd.alphabet()).into());
    }

    let avg = new_distribution(alphabet)?;
    let mut ctx = TrainerContext::new();
    ctx.register_distribution(&avg);
    for dist in dists {
        for (sym, w) in dist.weights()? {
            ctx.add_count(&avg, &Symbol::Atomic(sym), w)?;
        }
    }
    ctx.train()?;
    Ok(avg)
}

/// One trained distribution per column of `rows`, e.g. the positions of an
/// alignment.
///
/// Every row must have the same length. With `count_gaps` unset, gaps are
/// skipped before they reach the trainer; the trainer drops them anyway, so
/// the flag only matters for callers that count gaps some other way.
pub fn column_distributions(
    alphabet: &Alphabet,
    rows: &[Vec<Symbol>],
    count_gaps: bool,
    null_weight: f64,
) -> Result<Vec<DistRef>, DistError> {
    let width = rows.first().map_or(0, Vec::len);
    if let Some(ragged) = rows.iter().find(|r| r.len() != width) {
        return Err(DistError::IncompatibleAlphabet {
            expected: format!("rows of length {width}"),
            got: format!("row of length {}", ragged.len()),
        });
    }

    let mut ctx = TrainerContext::new();
    ctx.set_null_model_weight(null_weight);
    let mut columns = Vec::with_capacity(width);
    for col in 0..width {
        let dist = new_distribution(alphabet)?;
        ctx.register_distribution(&dist);
        for row in rows {
            let sym = &row[col];
            if sym.is_gap() && !count_gaps {
                continue;
            }
            ctx.add_count(&dist, sym, 1.0)?;
        }
        columns.push(dist);
    }
    ctx.train()?;
    Ok(columns)
}

/// One distribution over the tuples found in columns `cols` of an alignment.
///
/// The result is over `alphabet` to the power `cols.len()`, and each row
/// contributes one count for its tuple. An ambiguous cell spreads its row's
/// count over every tuple it could stand for. Rows with a gap in a selected
/// column are skipped unless `count_gaps` is set.
pub fn joint_column_distribution(
    alphabet: &Alphabet,
    rows: &[Vec<Symbol>],
    cols: &[usize],
    count_gaps: bool,
    null_weight: f64,
) -> Result<DistRef, DistError> {
    let joint = Alphabet::power(alphabet, cols.len())?;
    if let Some(&col) = cols.iter().find(|&&c| rows.iter().any(|r| c >= r.len())) {
        return Err(DistError::IncompatibleAlphabet {
            expected: format!("every row to reach column {col}"),
            got: "a shorter row".to_string(),
        });
    }

    let dist = new_distribution(&joint)?;
    let mut ctx = TrainerContext::new();
    ctx.set_null_model_weight(null_weight);
    ctx.register_distribution(&dist);
    for row in rows {
        let cells: Vec<&Symbol> = cols.iter().map(|&c| &row[c]).collect();
        if !count_gaps && cells.iter().any(|s| s.is_gap()) {
            trace!("skipping gapped row {cells:?}");
            continue;
        }
        ctx.add_count(&dist, &joint_symbol(&joint, &cells)?, 1.0)?;
    }
    ctx.train()?;
    Ok(dist)
}

/// The symbol of `joint` standing for every tuple `cells` could spell.
fn joint_symbol(joint: &Alphabet, cells: &[&Symbol]) -> Result<Symbol, DistError> {
    let mut tuples: Vec<Vec<AtomicSymbol>> = vec![Vec::new()];
    for cell in cells {
        tuples = tuples
            .iter()
            .flat_map(|prefix| {
                cell.matches().iter().map(move |m| {
                    let mut tuple = prefix.clone();
                    tuple.push(m.clone());
                    tuple
                })
            })
            .collect();
    }
    let matches = tuples
        .iter()
        .map(|t| joint.symbol_from_parts(t))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(joint.ambiguity_for(&matches)?)
}

/// Whether `dist` can be sampled: every weight is finite and they sum to one
/// within [`WEIGHT_TOLERANCE`].
pub fn is_normalized(dist: &DistRef) -> Result<bool, DistError> {
    let mut total = 0.0;
    for (_, w) in dist.weights()? {
        if !w.is_finite() {
            return Ok(false);
        }
        total += w;
    }
    Ok((total - 1.0).abs() < WEIGHT_TOLERANCE)
}

/// Draw `len` symbols from `dist`.
///
/// An order-N distribution is walked as a Markov chain: the context starts
/// at a uniformly random conditioning symbol, each draw comes from the
/// current context's sub-distribution and shifts into the context, and the
/// first [`BURN_IN`] draws are discarded.
pub fn generate_sequence<R: Rng>(dist: &DistRef, len: usize, rng: &mut R) -> Result<Vec<Symbol>, DistError> {
    let Some(conditioning) = dist.conditioning_alphabet() else {
        return Ok((0..len).map(|_| dist.sample_symbol(rng)).collect());
    };

    let seed = match Distribution::uniform(conditioning).sample_symbol(rng) {
        Symbol::Atomic(s) => s,
        other => return Err(SymbolError::invalid(other, conditioning).into()),
    };
    let mut history: VecDeque<AtomicSymbol> = seed.parts().iter().cloned().collect();
    let mut out = Vec::with_capacity(len);

    for step in 0..BURN_IN + len {
        let context = match history.make_contiguous() {
            [only] => only.clone(),
            parts => conditioning.symbol_from_parts(parts)?,
        };
        let sub = dist.distribution_for(&context)?;
        let next = match sub.sample_symbol(rng) {
            Symbol::Atomic(s) => s,
            other => return Err(SymbolError::invalid(other, sub.alphabet()).into()),
        };
        if step >= BURN_IN {
            out.push(Symbol::Atomic(next.clone()));
        }
        history.push_back(next);
        history.pop_front();
    }
    Ok(out)
}

/// Add every window of `seq` as one observation of `dist`.
///
/// The window is as wide as `dist`'s alphabet has components (one for a
/// simple alphabet). Windows that contain an ambiguity symbol or a gap are
/// skipped for composite alphabets. Returns the number of observations made.
pub fn count_sequence(ctx: &mut TrainerContext, dist: &DistRef, seq: &[Symbol]) -> Result<usize, DistError> {
    let alphabet = dist.alphabet();
    if !alphabet.is_composite() {
        for sym in seq {
            ctx.add_count(dist, sym, 1.0)?;
        }
        return Ok(seq.len());
    }

    let width = alphabet.components().len();
    let mut counted = 0;
    for window in seq.windows(width) {
        let parts: Option<Vec<AtomicSymbol>> = window.iter().map(|s| s.as_atomic().cloned()).collect();
        let Some(parts) = parts else {
            trace!("skipping ambiguous window {window:?}");
            continue;
        };
        let sym = alphabet.symbol_from_parts(&parts)?;
        ctx.add_count(dist, &Symbol::Atomic(sym), 1.0)?;
        counted += 1;
    }
    Ok(counted)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use symbol_dist::SimpleFactory;

    fn trained(weights: [f64; 4]) -> DistRef {
        let dist = Distribution::dna();
        for (nt, w) in dna::nucleotides().iter().zip(weights) {
            dist.set_weight(&Symbol::Atomic(nt.clone()), w).unwrap();
        }
        dist
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn randomized_distribution_is_normalized() {
        let dist = Distribution::simple(&dna::alphabet()).unwrap();
        randomize(&dist, &mut SmallRng::seed_from_u64(9)).unwrap();
        assert!(is_normalized(&dist).unwrap());
        assert!(dist.weights().unwrap().iter().all(|(_, w)| *w > 0.0));
    }

    #[test]
    fn counts_become_weights() {
        let mut counts = IndexedCount::new(&dna::alphabet()).unwrap();
        counts.increase_count(&dna::a(), 3.0).unwrap();
        counts.increase_count(&dna::t(), 1.0).unwrap();
        let dist = count_to_distribution(&counts).unwrap();
        assert_eq!(dist.weight_atomic(&dna::a()).unwrap(), 0.75);
        assert_eq!(dist.weight_atomic(&dna::c()).unwrap(), 0.0);
    }

    #[test]
    fn spectra_comparison() {
        let a = trained([0.1, 0.2, 0.3, 0.4]);
        let b = trained([0.1, 0.2, 0.3, 0.4]);
        let c = trained([0.4, 0.3, 0.2, 0.1]);
        assert!(emission_spectra_equal(&a, &b).unwrap());
        assert!(!emission_spectra_equal(&a, &c).unwrap());

        let pairs = Alphabet::power(&dna::alphabet(), 2).unwrap();
        let other = Distribution::uniform(&pairs);
        assert!(!emission_spectra_equal(&a, &other).unwrap());

        assert!(all_emission_spectra_equal(&[a.clone(), c.clone()], &[b.clone(), c.clone()]).unwrap());
        assert!(!all_emission_spectra_equal(&[a.clone()], &[b, c]).unwrap());
    }

    #[test]
    fn kl_distance_of_identical_is_zero() {
        let a = trained([0.1, 0.2, 0.3, 0.4]);
        for (_, term) in kl_distance(&a, &a, 2.0).unwrap() {
            assert!(close(term, 0.0));
        }
    }

    #[test]
    fn kl_distance_skips_zero_observed() {
        let observed = trained([0.5, 0.5, 0.0, 0.0]);
        let expected = trained([0.25; 4]);
        let terms = kl_distance(&observed, &expected, 2.0).unwrap();
        assert!(close(terms[0].1, 0.5));
        assert_eq!(terms[2].1, 0.0);
    }

    #[test]
    fn entropy_and_information() {
        let uniform = trained([0.25; 4]);
        assert!(close(bits_of_information(&uniform).unwrap(), 2.0));

        let skewed = trained([1.0, 0.0, 0.0, 0.0]);
        let entropy = shannon_entropy(&skewed, 2.0).unwrap();
        assert_eq!(entropy.len(), 1);
        assert!(close(bits_of_information(&skewed).unwrap(), 0.0));
    }

    #[test]
    fn average_of_two() {
        let a = trained([1.0, 0.0, 0.0, 0.0]);
        let b = trained([0.0, 0.0, 0.0, 1.0]);
        let avg = average(&[a, b]).unwrap();
        assert!(close(avg.weight_atomic(&dna::a()).unwrap(), 0.5));
        assert!(close(avg.weight_atomic(&dna::t()).unwrap(), 0.5));
    }

    #[test]
    fn average_rejects_mixed_alphabets() {
        let pairs = Alphabet::power(&dna::alphabet(), 2).unwrap();
        let result = average(&[trained([0.25; 4]), Distribution::uniform(&pairs)]);
        assert!(matches!(result, Err(DistError::IncompatibleAlphabet { .. })));
        assert!(average(&[]).is_err());
    }

    #[test]
    fn columns_of_an_alignment() {
        let rows: Vec<Vec<Symbol>> = ["ac-", "ag-", "tgc"]
            .iter()
            .map(|r| dna::parse(r).unwrap())
            .collect();
        let cols = column_distributions(&dna::alphabet(), &rows, false, 0.0).unwrap();
        assert_eq!(cols.len(), 3);
        assert!(close(cols[0].weight_atomic(&dna::a()).unwrap(), 2.0 / 3.0));
        assert!(close(cols[1].weight_atomic(&dna::g()).unwrap(), 2.0 / 3.0));
        assert_eq!(cols[2].weight_atomic(&dna::c()).unwrap(), 1.0);

        let ragged = vec![dna::parse("ac").unwrap(), dna::parse("a").unwrap()];
        assert!(column_distributions(&dna::alphabet(), &ragged, false, 0.0).is_err());
    }

    #[test]
    fn joint_distribution_over_selected_columns() {
        let rows: Vec<Vec<Symbol>> = ["ac-", "ag-", "tgc", "ar-"]
            .iter()
            .map(|r| dna::parse(r).unwrap())
            .collect();
        let pairs = Alphabet::power(&dna::alphabet(), 2).unwrap();
        let tuple = |x: AtomicSymbol, y: AtomicSymbol| pairs.symbol_from_parts(&[x, y]).unwrap();

        let joint = joint_column_distribution(&dna::alphabet(), &rows, &[0, 1], false, 0.0).unwrap();
        assert_eq!(joint.alphabet(), &pairs);
        // The purine in the last row splits between (a, a) and (a, g).
        assert!(close(joint.weight_atomic(&tuple(dna::a(), dna::c())).unwrap(), 0.25));
        assert!(close(joint.weight_atomic(&tuple(dna::a(), dna::g())).unwrap(), 0.375));
        assert!(close(joint.weight_atomic(&tuple(dna::a(), dna::a())).unwrap(), 0.125));
        assert!(close(joint.weight_atomic(&tuple(dna::t(), dna::g())).unwrap(), 0.25));
        assert!(is_normalized(&joint).unwrap());

        // Only the last column has gaps; three rows drop out.
        let gapped = joint_column_distribution(&dna::alphabet(), &rows, &[1, 2], false, 0.0).unwrap();
        assert_eq!(gapped.weight_atomic(&tuple(dna::g(), dna::c())).unwrap(), 1.0);

        assert!(joint_column_distribution(&dna::alphabet(), &rows, &[0, 3], false, 0.0).is_err());
        assert!(joint_column_distribution(&dna::alphabet(), &rows, &[], false, 0.0).is_err());
    }

    #[test]
    fn generates_from_plain_distribution() {
        let dist = trained([0.0, 0.0, 1.0, 0.0]);
        let seq = generate_sequence(&dist, 5, &mut SmallRng::seed_from_u64(2)).unwrap();
        assert_eq!(dna::to_text(&seq), "ggggg");
    }

    #[test]
    fn generates_markov_walk() {
        // a -> c -> g -> t -> a deterministically
        let pairs = Alphabet::power(&dna::alphabet(), 2).unwrap();
        let dist = Distribution::order_n(&pairs, &SimpleFactory).unwrap();
        let nts = dna::nucleotides();
        for (i, from) in nts.iter().enumerate() {
            let sub = dist.distribution_for(from).unwrap();
            for (j, to) in nts.iter().enumerate() {
                let w = if j == (i + 1) % 4 { 1.0 } else { 0.0 };
                sub.set_weight(&Symbol::Atomic(to.clone()), w).unwrap();
            }
        }

        let seq = generate_sequence(&dist, 8, &mut SmallRng::seed_from_u64(4)).unwrap();
        let text = dna::to_text(&seq);
        assert_eq!(text.len(), 8);
        assert!("acgtacgtacgt".contains(&text), "unexpected walk {text}");
    }

    #[test]
    fn counts_sliding_windows() {
        let pairs = Alphabet::power(&dna::alphabet(), 2).unwrap();
        let dist = Distribution::order_n(&pairs, &SimpleFactory).unwrap();
        let mut ctx = TrainerContext::new();
        ctx.register_distribution(&dist);

        let seq = dna::parse("acnga").unwrap();
        // ac, ga counted; cn, ng skipped
        assert_eq!(count_sequence(&mut ctx, &dist, &seq).unwrap(), 2);
        let ga = pairs.symbol_from_parts(&[dna::g(), dna::a()]).unwrap();
        assert_eq!(ctx.count(&dist, &ga).unwrap(), 1.0);
    }

    #[test]
    fn counts_plain_sequence() {
        let dist = Distribution::dna();
        let mut ctx = TrainerContext::new();
        ctx.register_distribution(&dist);
        let seq = dna::parse("aag").unwrap();
        assert_eq!(count_sequence(&mut ctx, &dist, &seq).unwrap(), 3);
        assert_eq!(ctx.count(&dist, &dna::a()).unwrap(), 2.0);
    }
}

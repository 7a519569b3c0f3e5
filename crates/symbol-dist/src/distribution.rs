//! The distribution contract and its leaf variants.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use log::{debug, trace};
use rand::Rng;
use symbol_core::{Alphabet, AtomicSymbol, Symbol, SymbolError, dna};
use symbol_count::IndexedCount;
use symbol_index::AlphabetIndex;

use crate::change::{
    ChangeEvent, ChangeKind, ChangeListener, ChangeSupport, ForwardMode, Forwarder, ListenerId,
    WeightChange,
};
use crate::order_n::OrderN;
use crate::trainer::{Trainer, TrainerContext};
use crate::views::{PairView, TranslatedView};
use crate::{DistError, DistId, DistRef, WEIGHT_TOLERANCE, lock, read, write};

/// Which variant a distribution is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DistributionKind {
    Simple,
    Uniform,
    Gap,
    Dna,
    OrderN,
    /// The default null model of an order-N distribution.
    ConditionedUniform,
    Complement,
    Translated,
    Pair,
}

impl DistributionKind {
    pub fn name(self) -> &'static str {
        match self {
            DistributionKind::Simple => "simple",
            DistributionKind::Uniform => "uniform",
            DistributionKind::Gap => "gap",
            DistributionKind::Dna => "dna",
            DistributionKind::OrderN => "order-N",
            DistributionKind::ConditionedUniform => "conditioned-uniform",
            DistributionKind::Complement => "complement",
            DistributionKind::Translated => "translated",
            DistributionKind::Pair => "pair",
        }
    }

    /// Whether this variant derives its weights from other distributions.
    pub fn is_view(self) -> bool {
        matches!(
            self,
            DistributionKind::Complement | DistributionKind::Translated | DistributionKind::Pair
        )
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dense weights addressed through an alphabet index. Unset weights are NaN.
pub(crate) struct DenseWeights {
    pub(crate) index: AlphabetIndex,
    pub(crate) weights: RwLock<Vec<f64>>,
}

pub(crate) enum Variant {
    Simple(DenseWeights),
    Uniform,
    Gap,
    /// a, c, g, t slots.
    Dna(RwLock<[f64; 4]>),
    OrderN(OrderN),
    ConditionedUniform { conditioned: usize },
    Translated(TranslatedView),
    Pair(PairView),
}

enum NullSlot {
    /// The distribution is its own null model.
    Itself,
    Dist(DistRef),
    /// Views compute their null model from their sources' null models.
    Derived,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LinkRole {
    NullModel,
    Source,
}

/// A forwarder this distribution installed on one of its sources.
struct Link {
    role: LinkRole,
    source: Weak<Distribution>,
    source_id: DistId,
    listener: ListenerId,
}

/// A probability distribution over the atomic symbols of an alphabet.
///
/// Always handled through a [`DistRef`]. Equality is identity: two handles
/// are the same distribution only if they point at the same allocation.
pub struct Distribution {
    id: DistId,
    alphabet: Alphabet,
    variant: Variant,
    null_model: RwLock<NullSlot>,
    changes: ChangeSupport,
    links: Mutex<Vec<Link>>,
}

impl Distribution {
    fn build(alphabet: Alphabet, variant: Variant, null: NullSlot) -> DistRef {
        let upstream = match &null {
            NullSlot::Dist(d) => Some(Arc::clone(d)),
            NullSlot::Itself | NullSlot::Derived => None,
        };
        let dist = Arc::new(Distribution {
            id: DistId::next(),
            alphabet,
            variant,
            null_model: RwLock::new(null),
            changes: ChangeSupport::new(),
            links: Mutex::new(Vec::new()),
        });
        if let Some(null) = upstream {
            dist.link(&null, LinkRole::NullModel, ForwardMode::NullModel);
        }
        debug!("created {} distribution {} over {}", dist.kind(), dist.id, dist.alphabet);
        dist
    }

    /// A dense distribution over any indexable alphabet. Weights start unset
    /// (NaN); the null model is uniform.
    pub fn simple(alphabet: &Alphabet) -> Result<DistRef, DistError> {
        let index = AlphabetIndex::new(alphabet)?;
        let weights = RwLock::new(vec![f64::NAN; index.len()]);
        let null = Distribution::uniform(alphabet);
        Ok(Self::build(
            alphabet.clone(),
            Variant::Simple(DenseWeights { index, weights }),
            NullSlot::Dist(null),
        ))
    }

    /// Every symbol weighs `1 / size`. Immutable, and its own null model.
    pub fn uniform(alphabet: &Alphabet) -> DistRef {
        Self::build(alphabet.clone(), Variant::Uniform, NullSlot::Itself)
    }

    /// Emits only the gap. Immutable, and its own null model.
    pub fn gap(alphabet: &Alphabet) -> DistRef {
        Self::build(alphabet.clone(), Variant::Gap, NullSlot::Itself)
    }

    /// A distribution over the DNA alphabet with four fixed slots.
    pub fn dna() -> DistRef {
        let alphabet = dna::alphabet();
        let null = Distribution::uniform(&alphabet);
        Self::build(
            alphabet,
            Variant::Dna(RwLock::new([f64::NAN; 4])),
            NullSlot::Dist(null),
        )
    }

    /// Null model of an order-N distribution: `1 / size(conditioned)` for
    /// every symbol of the full composite alphabet.
    pub(crate) fn conditioned_uniform(alphabet: &Alphabet, conditioned: &Alphabet) -> DistRef {
        Self::build(
            alphabet.clone(),
            Variant::ConditionedUniform {
                conditioned: conditioned.size(),
            },
            NullSlot::Itself,
        )
    }

    pub(crate) fn order_n_from(alphabet: Alphabet, order_n: OrderN, subs: &[DistRef]) -> DistRef {
        let null = Distribution::conditioned_uniform(&alphabet, order_n.conditioned());
        let dist = Self::build(alphabet, Variant::OrderN(order_n), NullSlot::Dist(null));
        for sub in subs {
            dist.link(sub, LinkRole::Source, ForwardMode::Weights);
        }
        dist
    }

    pub(crate) fn view(
        alphabet: Alphabet,
        variant: Variant,
        sources: Vec<(DistRef, ForwardMode)>,
    ) -> DistRef {
        let dist = Self::build(alphabet, variant, NullSlot::Derived);
        for (source, mode) in sources {
            dist.link(&source, LinkRole::Source, mode);
        }
        dist
    }

    #[inline]
    pub fn id(&self) -> DistId {
        self.id
    }

    #[inline]
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn kind(&self) -> DistributionKind {
        match &self.variant {
            Variant::Simple(_) => DistributionKind::Simple,
            Variant::Uniform => DistributionKind::Uniform,
            Variant::Gap => DistributionKind::Gap,
            Variant::Dna(_) => DistributionKind::Dna,
            Variant::OrderN(_) => DistributionKind::OrderN,
            Variant::ConditionedUniform { .. } => DistributionKind::ConditionedUniform,
            Variant::Translated(view) if view.is_complement() => DistributionKind::Complement,
            Variant::Translated(_) => DistributionKind::Translated,
            Variant::Pair(_) => DistributionKind::Pair,
        }
    }

    pub(crate) fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Listener registry for this distribution.
    pub fn changes(&self) -> &ChangeSupport {
        &self.changes
    }

    pub fn add_listener(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        self.changes.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.changes.remove_listener(id)
    }

    /// Weight of any symbol.
    ///
    /// Ambiguity symbols weigh the sum of the symbols they match; the gap
    /// weighs zero everywhere except in a gap distribution.
    pub fn weight(&self, sym: &Symbol) -> Result<f64, DistError> {
        match sym {
            Symbol::Atomic(a) => self.weight_atomic(a),
            Symbol::Ambiguity(amb) => {
                self.alphabet.validate(sym)?;
                if amb.is_gap() {
                    return Ok(if matches!(self.variant, Variant::Gap) { 1.0 } else { 0.0 });
                }
                amb.matches()
                    .iter()
                    .try_fold(0.0, |acc, m| Ok(acc + self.weight_atomic(m)?))
            }
        }
    }

    /// Weight of an atomic symbol.
    pub fn weight_atomic(&self, sym: &AtomicSymbol) -> Result<f64, DistError> {
        match &self.variant {
            Variant::Simple(dense) => {
                let i = dense.index.index_for(sym)?;
                Ok(read(&dense.weights)[i])
            }
            Variant::Uniform => {
                self.alphabet.validate_atomic(sym)?;
                Ok(1.0 / self.alphabet.size() as f64)
            }
            Variant::Gap => {
                self.alphabet.validate_atomic(sym)?;
                Ok(0.0)
            }
            Variant::Dna(cells) => {
                let i = self.dna_slot(sym)?;
                Ok(read(cells)[i])
            }
            Variant::OrderN(order_n) => {
                let (prefix, suffix) = self.alphabet.split_symbol(sym)?;
                order_n.distribution_for(&prefix)?.weight_atomic(&suffix)
            }
            Variant::ConditionedUniform { conditioned } => {
                self.alphabet.validate_atomic(sym)?;
                Ok(1.0 / *conditioned as f64)
            }
            Variant::Translated(view) => view.weight(sym),
            Variant::Pair(view) => {
                self.alphabet.validate_atomic(sym)?;
                view.weight(sym)
            }
        }
    }

    /// `(symbol, weight)` for every atomic symbol, in alphabet order.
    pub fn weights(&self) -> Result<Vec<(AtomicSymbol, f64)>, DistError> {
        self.alphabet
            .iter()
            .map(|sym| {
                let w = self.weight_atomic(&sym)?;
                Ok((sym, w))
            })
            .collect()
    }

    /// Set the weight of a symbol.
    ///
    /// An ambiguity symbol spreads `weight` over the symbols it matches in
    /// proportion to their null-model weight, as one change. Immutable
    /// variants fail with [`DistError::ChangeRejected`].
    pub fn set_weight(&self, sym: &Symbol, weight: f64) -> Result<(), DistError> {
        self.alphabet.validate(sym)?;
        match sym {
            Symbol::Atomic(a) => self.set_weights_atomic(&[(a.clone(), weight)]),
            Symbol::Ambiguity(amb) => {
                if amb.is_gap() {
                    return Err(SymbolError::invalid(amb.name(), &self.alphabet).into());
                }
                let shares = self.with_null(|null| null_shares(null, amb.matches()))?;
                let entries: Vec<_> = shares
                    .into_iter()
                    .map(|(sym, share)| (sym, weight * share))
                    .collect();
                self.set_weights_atomic(&entries)
            }
        }
    }

    /// Set atomic weights as one change.
    ///
    /// Writes that land on several storing distributions (an order-N's
    /// sub-distributions, or a view's source) are proposed on all of them
    /// before any is applied, so one veto leaves every weight untouched.
    pub(crate) fn set_weights_atomic(&self, entries: &[(AtomicSymbol, f64)]) -> Result<(), DistError> {
        let mut staged = Vec::new();
        stage(WriteTarget::This(self), entries, &mut staged)?;
        commit_staged(staged)
    }

    fn storage_slot(&self, sym: &AtomicSymbol) -> Result<usize, DistError> {
        match &self.variant {
            Variant::Simple(dense) => Ok(dense.index.index_for(sym)?),
            Variant::Dna(_) => self.dna_slot(sym),
            _ => Err(DistError::rejected(format!(
                "{} distribution {} does not store weights",
                self.kind(),
                self.id
            ))),
        }
    }

    fn write_slots(&self, slots: &[(usize, f64)]) {
        let fill = |weights: &mut [f64]| {
            for &(i, w) in slots {
                weights[i] = w;
            }
        };
        match &self.variant {
            Variant::Simple(dense) => fill(&mut write(&dense.weights)[..]),
            Variant::Dna(cells) => fill(&mut write(cells)[..]),
            _ => {}
        }
    }

    /// Replace every weight at once, in alphabet order. Used by training.
    pub(crate) fn replace_weights(&self, weights: &[f64]) -> Result<(), DistError> {
        let event = ChangeEvent::new(ChangeKind::Weights, self.id);
        match &self.variant {
            Variant::Simple(dense) => self.changes.commit(&event, || {
                write(&dense.weights).copy_from_slice(weights);
                Ok(())
            }),
            Variant::Dna(cells) => self.changes.commit(&event, || {
                write(cells).copy_from_slice(weights);
                Ok(())
            }),
            _ => Err(DistError::rejected(format!(
                "{} distribution {} does not store weights",
                self.kind(),
                self.id
            ))),
        }
    }

    fn weight_event(&self, entries: &[(AtomicSymbol, f64)]) -> Result<ChangeEvent, DistError> {
        let event = ChangeEvent::new(ChangeKind::Weights, self.id);
        match entries {
            [(symbol, weight)] => {
                let previous = self.weight_atomic(symbol)?;
                Ok(event.with_weights(
                    WeightChange {
                        symbol: symbol.clone(),
                        weight: previous,
                    },
                    WeightChange {
                        symbol: symbol.clone(),
                        weight: *weight,
                    },
                ))
            }
            _ => Ok(event),
        }
    }

    fn dna_slot(&self, sym: &AtomicSymbol) -> Result<usize, DistError> {
        dna::index_of(sym).ok_or_else(|| SymbolError::invalid(sym, &self.alphabet).into())
    }

    /// Draw a symbol.
    ///
    /// # Panics
    /// Panics if the weights do not sum to one (for instance, an untrained
    /// distribution whose weights are all NaN).
    pub fn sample_symbol<R: Rng>(&self, rng: &mut R) -> Symbol {
        match &self.variant {
            Variant::Gap => self.alphabet.gap_symbol(),
            Variant::Translated(view) => view.sample(rng),
            Variant::Pair(view) => view.sample(rng),
            _ => self.sample_by_weight(rng),
        }
    }

    fn sample_by_weight<R: Rng>(&self, rng: &mut R) -> Symbol {
        let mut p: f64 = rng.random();
        let mut last = None;
        for sym in self.alphabet.iter() {
            let w = match self.weight_atomic(&sym) {
                Ok(w) => w,
                Err(err) => panic!("alphabet {} yielded a symbol it rejects: {err}", self.alphabet),
            };
            p -= w;
            if p <= 0.0 {
                return Symbol::Atomic(sym);
            }
            if w > 0.0 {
                last = Some(sym);
            }
        }
        // Rounding can leave the cumulative sum a hair below one.
        match last {
            Some(sym) if p < WEIGHT_TOLERANCE => Symbol::Atomic(sym),
            _ => panic!(
                "could not sample from {} distribution {}: weights do not sum to 1.0",
                self.kind(),
                self.id
            ),
        }
    }

    /// The distribution used to smooth training and to split ambiguous
    /// observations.
    pub fn null_model(self: &Arc<Self>) -> DistRef {
        self.null_handle().unwrap_or_else(|| Arc::clone(self))
    }

    /// `None` when the distribution is its own null model.
    fn null_handle(&self) -> Option<DistRef> {
        match &*read(&self.null_model) {
            NullSlot::Itself => None,
            NullSlot::Dist(d) => Some(Arc::clone(d)),
            NullSlot::Derived => match &self.variant {
                Variant::Translated(view) => Some(view.null_model()),
                Variant::Pair(view) => Some(view.null_model(&self.alphabet)),
                _ => None,
            },
        }
    }

    pub(crate) fn with_null<T>(&self, f: impl FnOnce(&Distribution) -> T) -> T {
        match self.null_handle() {
            Some(null) => f(&null),
            None => f(self),
        }
    }

    /// Replace the null model.
    ///
    /// The new null model must share this alphabet. Fixed variants and views
    /// reject the change. Listeners see a [`ChangeKind::NullModel`] event.
    pub fn set_null_model(self: &Arc<Self>, null: &DistRef) -> Result<(), DistError> {
        if null.alphabet() != &self.alphabet {
            return Err(SymbolError::incompatible(&self.alphabet, null.alphabet()).into());
        }
        if self.kind().is_view() {
            return Err(DistError::rejected(format!(
                "{} view {} derives its null model from its sources",
                self.kind(),
                self.id
            )));
        }
        if !matches!(
            self.variant,
            Variant::Simple(_) | Variant::Dna(_) | Variant::OrderN(_)
        ) {
            return Err(DistError::rejected(format!(
                "{} distribution {} has a fixed null model",
                self.kind(),
                self.id
            )));
        }

        let itself = Arc::ptr_eq(null, self);
        let slot = if itself {
            NullSlot::Itself
        } else {
            NullSlot::Dist(Arc::clone(null))
        };
        let event = ChangeEvent::new(ChangeKind::NullModel, self.id);
        self.changes.commit(&event, || {
            *write(&self.null_model) = slot;
            self.unlink(LinkRole::NullModel, None);
            if !itself {
                self.link(null, LinkRole::NullModel, ForwardMode::NullModel);
            }
            Ok(())
        })?;
        debug!("distribution {} now uses null model {}", self.id, null.id);
        Ok(())
    }

    /// Install the trainer matching this variant into `ctx`, registering any
    /// distributions it forwards counts to first.
    ///
    /// [`TrainerContext::register_distribution`] calls this; calling it
    /// directly on an already registered distribution does nothing.
    pub fn register_with_trainer(self: &Arc<Self>, ctx: &mut TrainerContext) {
        let trainer = match &self.variant {
            Variant::Simple(dense) => Trainer::Counting(IndexedCount::with_index(dense.index.clone())),
            Variant::Dna(_) => Trainer::Dna([0.0; 4]),
            Variant::Uniform | Variant::Gap | Variant::ConditionedUniform { .. } => Trainer::Ignore,
            Variant::OrderN(order_n) => {
                for sub in order_n.distributions() {
                    ctx.register_distribution(&sub);
                }
                Trainer::OrderN
            }
            Variant::Translated(view) => {
                ctx.register_distribution(view.source());
                Trainer::Translated {
                    table: Arc::clone(view.table()),
                    source: Arc::clone(view.source()),
                }
            }
            Variant::Pair(view) => {
                ctx.register_distribution(view.first());
                ctx.register_distribution(view.second());
                Trainer::Pair {
                    first: Arc::clone(view.first()),
                    second: Arc::clone(view.second()),
                }
            }
        };
        ctx.register_trainer(self, trainer);
    }

    /// Forward `source`'s events onto this distribution.
    pub(crate) fn link(self: &Arc<Self>, source: &DistRef, role: LinkRole, mode: ForwardMode) {
        let forwarder = Arc::new(Forwarder {
            target: Arc::downgrade(self),
            mode,
        });
        let listener = source.changes.add_listener(forwarder);
        lock(&self.links).push(Link {
            role,
            source: Arc::downgrade(source),
            source_id: source.id,
            listener,
        });
    }

    /// Remove one link with `role`, optionally restricted to one source.
    pub(crate) fn unlink(&self, role: LinkRole, source: Option<DistId>) {
        let mut links = lock(&self.links);
        let found = links
            .iter()
            .position(|l| l.role == role && source.is_none_or(|id| l.source_id == id));
        if let Some(pos) = found {
            let link = links.remove(pos);
            if let Some(src) = link.source.upgrade() {
                src.changes.remove_listener(link.listener);
            }
        }
    }
}

/// The storing distribution a staged write lands on.
enum WriteTarget<'a> {
    This(&'a Distribution),
    Shared(DistRef),
}

impl Deref for WriteTarget<'_> {
    type Target = Distribution;

    fn deref(&self) -> &Distribution {
        match self {
            WriteTarget::This(dist) => dist,
            WriteTarget::Shared(dist) => dist,
        }
    }
}

/// Validated weight writes for one storing distribution, not yet applied.
struct StagedWrite<'a> {
    target: WriteTarget<'a>,
    event: ChangeEvent,
    slots: Vec<(usize, f64)>,
}

/// Resolve `entries` down to the distributions that store them. Nothing is
/// written; any invalid symbol or fixed variant fails here.
fn stage<'a>(
    target: WriteTarget<'a>,
    entries: &[(AtomicSymbol, f64)],
    out: &mut Vec<StagedWrite<'a>>,
) -> Result<(), DistError> {
    let dist: &Distribution = &target;
    match &dist.variant {
        Variant::Simple(_) | Variant::Dna(_) => {}
        Variant::OrderN(order_n) => {
            let mut by_context: Vec<(AtomicSymbol, Vec<(AtomicSymbol, f64)>)> = Vec::new();
            for (sym, w) in entries {
                let (prefix, suffix) = dist.alphabet.split_symbol(sym)?;
                match by_context.iter_mut().find(|(ctx, _)| *ctx == prefix) {
                    Some((_, group)) => group.push((suffix, *w)),
                    None => by_context.push((prefix, vec![(suffix, *w)])),
                }
            }
            for (ctx, group) in by_context {
                stage(WriteTarget::Shared(order_n.distribution_for(&ctx)?), &group, out)?;
            }
            return Ok(());
        }
        Variant::Translated(view) => {
            let translated = view.translate_entries(entries)?;
            return stage(WriteTarget::Shared(Arc::clone(view.source())), &translated, out);
        }
        Variant::Uniform | Variant::Gap | Variant::ConditionedUniform { .. } | Variant::Pair(_) => {
            for (sym, _) in entries {
                dist.alphabet.validate_atomic(sym)?;
            }
            return Err(DistError::rejected(format!(
                "{} distribution {} has fixed weights",
                dist.kind(),
                dist.id
            )));
        }
    }

    let slots = entries
        .iter()
        .map(|(sym, w)| Ok((dist.storage_slot(sym)?, *w)))
        .collect::<Result<Vec<_>, DistError>>()?;
    let event = dist.weight_event(entries)?;
    out.push(StagedWrite { target, event, slots });
    Ok(())
}

/// Propose every staged event, then apply and notify, holding each target's
/// commit lock throughout.
fn commit_staged(mut staged: Vec<StagedWrite<'_>>) -> Result<(), DistError> {
    staged.sort_by_key(|s| s.target.id);
    let mut merged: Vec<StagedWrite<'_>> = Vec::with_capacity(staged.len());
    for next in staged {
        match merged.last_mut() {
            Some(last) if last.target.id == next.target.id => {
                last.slots.extend(next.slots);
                last.event = ChangeEvent::new(ChangeKind::Weights, last.target.id);
            }
            _ => merged.push(next),
        }
    }

    // Locks are taken in id order.
    let _guards: Vec<_> = merged.iter().map(|s| s.target.changes.hold()).collect();
    for s in &merged {
        s.target.changes.propose(&s.event)?;
    }
    for s in &merged {
        s.target.write_slots(&s.slots);
        trace!("committed {:?} on {}", s.event.kind, s.event.source);
    }
    for s in &merged {
        s.target.changes.notify(&s.event);
    }
    Ok(())
}

/// Each of `matches`' share of `null`'s mass over them. Falls back to an even
/// split when the null model gives them no mass at all.
pub(crate) fn null_shares(
    null: &Distribution,
    matches: &[AtomicSymbol],
) -> Result<Vec<(AtomicSymbol, f64)>, DistError> {
    let masses = matches
        .iter()
        .map(|m| null.weight_atomic(m))
        .collect::<Result<Vec<_>, _>>()?;
    let total: f64 = masses.iter().sum();
    let even = 1.0 / matches.len() as f64;
    Ok(matches
        .iter()
        .cloned()
        .zip(masses)
        .map(|(m, mass)| {
            let share = if total > 0.0 { mass / total } else { even };
            (m, share)
        })
        .collect())
}

impl Drop for Distribution {
    fn drop(&mut self) {
        let links = self.links.get_mut().unwrap_or_else(PoisonError::into_inner);
        for link in links.drain(..) {
            if let Some(src) = link.source.upgrade() {
                src.changes.remove_listener(link.listener);
            }
        }
    }
}

impl fmt::Debug for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Distribution")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("alphabet", &self.alphabet.name())
            .finish()
    }
}

/// Creates distributions over a given alphabet, e.g. the sub-distributions
/// of an order-N distribution.
///
/// Any `Fn(&Alphabet) -> Result<DistRef, DistError>` is a factory.
pub trait DistributionFactory {
    fn create(&self, alphabet: &Alphabet) -> Result<DistRef, DistError>;
}

impl<F> DistributionFactory for F
where
    F: Fn(&Alphabet) -> Result<DistRef, DistError>,
{
    fn create(&self, alphabet: &Alphabet) -> Result<DistRef, DistError> {
        self(alphabet)
    }
}

/// Creates [`Distribution::simple`] distributions.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleFactory;

impl DistributionFactory for SimpleFactory {
    fn create(&self, alphabet: &Alphabet) -> Result<DistRef, DistError> {
        Distribution::simple(alphabet)
    }
}

/// Creates [`Distribution::uniform`] distributions.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformFactory;

impl DistributionFactory for UniformFactory {
    fn create(&self, alphabet: &Alphabet) -> Result<DistRef, DistError> {
        Ok(Distribution::uniform(alphabet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sym(s: &AtomicSymbol) -> Symbol {
        Symbol::Atomic(s.clone())
    }

    fn letters(tokens: &[char]) -> Alphabet {
        let syms = tokens
            .iter()
            .map(|&t| AtomicSymbol::basic(&t.to_string(), t))
            .collect();
        Alphabet::simple("letters", syms, vec![]).unwrap()
    }

    fn trained_dna(weights: [f64; 4]) -> DistRef {
        let dist = Distribution::dna();
        for (nt, w) in dna::nucleotides().iter().zip(weights) {
            dist.set_weight(&sym(nt), w).unwrap();
        }
        dist
    }

    struct Veto;

    impl ChangeListener for Veto {
        fn pre_change(&self, _: &ChangeEvent) -> Result<(), DistError> {
            Err(DistError::rejected("read-only"))
        }
    }

    struct Kinds(Mutex<Vec<ChangeKind>>);

    impl ChangeListener for Kinds {
        fn post_change(&self, event: &ChangeEvent) {
            self.0.lock().unwrap().push(event.kind);
        }
    }

    #[test]
    fn new_weights_are_unset() {
        let dist = Distribution::simple(&letters(&['x', 'y'])).unwrap();
        for (_, w) in dist.weights().unwrap() {
            assert!(w.is_nan());
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        for dist in [Distribution::dna(), Distribution::simple(&dna::alphabet()).unwrap()] {
            dist.set_weight(&sym(&dna::g()), 0.375).unwrap();
            assert_eq!(dist.weight(&sym(&dna::g())).unwrap(), 0.375);
        }
    }

    #[test]
    fn ambiguity_weight_is_sum_of_matches() {
        let dist = trained_dna([0.1, 0.2, 0.3, 0.4]);
        let purine = dna::alphabet().parse_token('r').unwrap();
        assert!(close(dist.weight(&purine).unwrap(), 0.4));
        assert!(close(dist.weight(&dna::n()).unwrap(), 1.0));
    }

    #[test]
    fn gap_weighs_nothing_outside_gap_distribution() {
        let dist = trained_dna([0.25; 4]);
        let gap = dna::alphabet().gap_symbol();
        assert_eq!(dist.weight(&gap).unwrap(), 0.0);

        let gaps = Distribution::gap(&dna::alphabet());
        assert_eq!(gaps.weight(&gap).unwrap(), 1.0);
        assert_eq!(gaps.weight(&sym(&dna::a())).unwrap(), 0.0);
    }

    #[test]
    fn foreign_symbol_is_invalid() {
        let dist = Distribution::dna();
        let uracil = sym(&AtomicSymbol::basic("uracil", 'u'));
        assert!(matches!(dist.weight(&uracil), Err(DistError::InvalidSymbol { .. })));
        assert!(matches!(
            dist.set_weight(&uracil, 0.5),
            Err(DistError::InvalidSymbol { .. })
        ));
    }

    #[test]
    fn uniform_is_fixed() {
        let alpha = letters(&['p', 'q', 'r', 's', 't']);
        let dist = Distribution::uniform(&alpha);
        for s in alpha.iter() {
            assert!(close(dist.weight_atomic(&s).unwrap(), 0.2));
        }
        let first = sym(&alpha.iter().next().unwrap());
        assert!(matches!(
            dist.set_weight(&first, 0.5),
            Err(DistError::ChangeRejected { .. })
        ));
        assert!(close(dist.weight(&first).unwrap(), 0.2));
    }

    #[test]
    fn fixed_variants_are_their_own_null_model() {
        let alpha = dna::alphabet();
        for dist in [Distribution::uniform(&alpha), Distribution::gap(&alpha)] {
            assert!(Arc::ptr_eq(&dist.null_model(), &dist));
            let other = Distribution::uniform(&alpha);
            assert!(matches!(
                dist.set_null_model(&other),
                Err(DistError::ChangeRejected { .. })
            ));
        }
    }

    #[test]
    fn default_null_model_is_uniform() {
        let dist = Distribution::dna();
        let null = dist.null_model();
        assert_eq!(null.kind(), DistributionKind::Uniform);
        assert!(close(null.weight(&sym(&dna::c())).unwrap(), 0.25));
    }

    #[test]
    fn ambiguity_set_spreads_by_null_model() {
        let dist = Distribution::dna();
        let skewed = trained_dna([0.1, 0.2, 0.3, 0.4]);
        dist.set_null_model(&skewed).unwrap();
        for nt in dna::nucleotides() {
            dist.set_weight(&sym(&nt), 0.0).unwrap();
        }

        let purine = dna::alphabet().parse_token('r').unwrap();
        dist.set_weight(&purine, 0.8).unwrap();
        assert!(close(dist.weight(&sym(&dna::a())).unwrap(), 0.2));
        assert!(close(dist.weight(&sym(&dna::g())).unwrap(), 0.6));
        assert!(close(dist.weight(&purine).unwrap(), 0.8));
    }

    #[test]
    fn gap_cannot_be_set() {
        let dist = Distribution::dna();
        let gap = dna::alphabet().gap_symbol();
        assert!(matches!(dist.set_weight(&gap, 1.0), Err(DistError::InvalidSymbol { .. })));
    }

    #[test]
    fn translated_view_writes_reach_source() {
        let source = trained_dna([0.25; 4]);
        let view = crate::ViewCache::new().complement(&source).unwrap();
        assert!(view.kind().is_view());
        match view.set_null_model(&trained_dna([0.25; 4])) {
            Err(DistError::ChangeRejected { reason }) => assert!(reason.contains("derives its null model")),
            other => panic!("expected a rejected change, got {other:?}"),
        }
        view.set_weight(&sym(&dna::a()), 0.7).unwrap();
        assert_eq!(source.weight(&sym(&dna::t())).unwrap(), 0.7);

        source.add_listener(Arc::new(Veto));
        assert!(matches!(
            view.set_weight(&sym(&dna::c()), 0.1),
            Err(DistError::ChangeRejected { .. })
        ));
        assert_eq!(source.weight(&sym(&dna::g())).unwrap(), 0.25);
    }

    #[test]
    fn veto_leaves_weights_unchanged() {
        let dist = trained_dna([0.25; 4]);
        dist.add_listener(Arc::new(Veto));
        let result = dist.set_weight(&sym(&dna::a()), 0.9);
        assert!(matches!(result, Err(DistError::ChangeRejected { .. })));
        assert_eq!(dist.weight(&sym(&dna::a())).unwrap(), 0.25);
    }

    #[test]
    fn single_weight_event_carries_old_and_new() {
        struct Capture(Mutex<Option<ChangeEvent>>);
        impl ChangeListener for Capture {
            fn pre_change(&self, event: &ChangeEvent) -> Result<(), DistError> {
                *self.0.lock().unwrap() = Some(event.clone());
                Ok(())
            }
        }

        let dist = trained_dna([0.25; 4]);
        let capture = Arc::new(Capture(Mutex::new(None)));
        dist.add_listener(capture.clone());
        dist.set_weight(&sym(&dna::t()), 0.5).unwrap();

        let event = capture.0.lock().unwrap().clone().unwrap();
        assert_eq!(event.kind, ChangeKind::Weights);
        assert_eq!(event.source, dist.id());
        assert_eq!(event.previous.unwrap().weight, 0.25);
        assert_eq!(event.change.unwrap().weight, 0.5);
    }

    #[test]
    fn set_null_model_notifies() {
        let dist = Distribution::dna();
        let kinds = Arc::new(Kinds(Mutex::new(Vec::new())));
        dist.add_listener(kinds.clone());

        let null = trained_dna([0.25; 4]);
        dist.set_null_model(&null).unwrap();
        assert!(Arc::ptr_eq(&dist.null_model(), &null));
        assert_eq!(*kinds.0.lock().unwrap(), vec![ChangeKind::NullModel]);
    }

    #[test]
    fn null_model_weight_change_propagates() {
        let dist = Distribution::dna();
        let null = trained_dna([0.25; 4]);
        dist.set_null_model(&null).unwrap();

        let kinds = Arc::new(Kinds(Mutex::new(Vec::new())));
        dist.add_listener(kinds.clone());
        null.set_weight(&sym(&dna::a()), 0.4).unwrap();
        assert_eq!(*kinds.0.lock().unwrap(), vec![ChangeKind::NullModel]);
    }

    #[test]
    fn replaced_null_model_is_unlinked() {
        let dist = Distribution::dna();
        let first = trained_dna([0.25; 4]);
        dist.set_null_model(&first).unwrap();
        assert_eq!(first.changes().listener_count(), 1);

        let second = trained_dna([0.25; 4]);
        dist.set_null_model(&second).unwrap();
        assert_eq!(first.changes().listener_count(), 0);
        assert_eq!(second.changes().listener_count(), 1);

        drop(dist);
        assert_eq!(second.changes().listener_count(), 0);
    }

    #[test]
    fn racing_null_model_swaps_leave_one_link() {
        use std::sync::Barrier;
        use std::thread;

        let dist = Distribution::dna();
        let first = trained_dna([0.25; 4]);
        let second = trained_dna([0.25; 4]);
        for _ in 0..500 {
            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = [&first, &second]
                .into_iter()
                .map(|null| {
                    let (dist, null, barrier) = (Arc::clone(&dist), Arc::clone(null), Arc::clone(&barrier));
                    thread::spawn(move || {
                        barrier.wait();
                        dist.set_null_model(&null).unwrap();
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            let (current, other) = if Arc::ptr_eq(&dist.null_model(), &first) {
                (&first, &second)
            } else {
                (&second, &first)
            };
            assert_eq!(current.changes().listener_count(), 1);
            assert_eq!(other.changes().listener_count(), 0);
        }
    }

    #[test]
    fn self_null_model() {
        let dist = trained_dna([0.25; 4]);
        dist.set_null_model(&dist).unwrap();
        assert!(Arc::ptr_eq(&dist.null_model(), &dist));
    }

    #[test]
    fn null_model_alphabet_must_match() {
        let dist = Distribution::dna();
        let other = Distribution::uniform(&letters(&['x']));
        assert!(matches!(
            dist.set_null_model(&other),
            Err(DistError::IncompatibleAlphabet { .. })
        ));
    }

    #[test]
    fn sampling_follows_weights() {
        let dist = trained_dna([0.7, 0.1, 0.1, 0.1]);
        let mut rng = SmallRng::seed_from_u64(7);
        let draws = 10_000;
        let hits = (0..draws)
            .filter(|_| dist.sample_symbol(&mut rng) == sym(&dna::a()))
            .count();
        let freq = hits as f64 / draws as f64;
        assert!((freq - 0.7).abs() < 0.03, "frequency of a was {freq}");
    }

    #[test]
    fn gap_distribution_samples_gap() {
        let dist = Distribution::gap(&dna::alphabet());
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(dist.sample_symbol(&mut rng).is_gap());
    }

    #[test]
    #[should_panic(expected = "weights do not sum to 1.0")]
    fn sampling_untrained_panics() {
        let dist = Distribution::dna();
        let mut rng = SmallRng::seed_from_u64(1);
        dist.sample_symbol(&mut rng);
    }

    #[test]
    fn closures_are_factories() {
        let factory = |alpha: &Alphabet| Ok::<_, DistError>(Distribution::uniform(alpha));
        let dist = factory.create(&dna::alphabet()).unwrap();
        assert_eq!(dist.kind(), DistributionKind::Uniform);
        assert_eq!(SimpleFactory.create(&dna::alphabet()).unwrap().kind(), DistributionKind::Simple);
    }
}

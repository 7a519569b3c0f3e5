//! Change notification with veto.
//!
//! A mutation is delivered to listeners in two phases. `pre_change` runs
//! before anything is modified and may veto by returning an error, in which
//! case the mutation is abandoned and the caller receives
//! [`DistError::ChangeRejected`]. `post_change` runs after the mutation has
//! been applied.
//!
//! Derived objects (a parent order-N distribution, a view, a distribution
//! smoothed by a null model) observe their sources through [`Forwarder`]s,
//! which re-emit the source's event on the dependent as a chained event.
//! A veto from anywhere along that chain therefore reaches the original
//! mutator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

use log::{debug, trace};
use symbol_core::{AtomicSymbol, TranslationTable};

use crate::{DistError, DistId, Distribution, lock, read, write};

/// What a change touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// One or more weights.
    Weights,
    /// The null model, or the weights of the null model.
    NullModel,
}

/// A single weight, as carried in a change event.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightChange {
    pub symbol: AtomicSymbol,
    pub weight: f64,
}

/// Description of a change, delivered to listeners in both phases.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// The distribution being changed.
    pub source: DistId,
    /// New value, when a single weight is being set.
    pub change: Option<WeightChange>,
    /// Old value, when a single weight is being set.
    pub previous: Option<WeightChange>,
    /// The upstream event that caused this one, if any.
    pub chained: Option<Box<ChangeEvent>>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, source: DistId) -> Self {
        ChangeEvent {
            kind,
            source,
            change: None,
            previous: None,
            chained: None,
        }
    }

    /// An event on `source` caused by `cause`.
    pub fn chain(kind: ChangeKind, source: DistId, cause: &ChangeEvent) -> Self {
        ChangeEvent {
            chained: Some(Box::new(cause.clone())),
            ..ChangeEvent::new(kind, source)
        }
    }

    pub fn with_weights(mut self, previous: WeightChange, change: WeightChange) -> Self {
        self.previous = Some(previous);
        self.change = Some(change);
        self
    }

    /// The first event in the chain.
    pub fn root_cause(&self) -> &ChangeEvent {
        let mut event = self;
        while let Some(cause) = &event.chained {
            event = cause;
        }
        event
    }
}

/// Observer of changes on a [`ChangeSupport`].
///
/// Both methods have no-op defaults. Listeners must not mutate the
/// distribution that is notifying them from inside a callback: the commit
/// lock is held for the whole change and the call would deadlock.
pub trait ChangeListener: Send + Sync {
    /// Called before the change is applied. Returning an error vetoes it.
    fn pre_change(&self, event: &ChangeEvent) -> Result<(), DistError> {
        let _ = event;
        Ok(())
    }

    /// Called after the change has been applied.
    fn post_change(&self, event: &ChangeEvent) {
        let _ = event;
    }
}

/// Handle returned by [`ChangeSupport::add_listener`], used to remove it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener registry and commit protocol for one changeable object.
pub struct ChangeSupport {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn ChangeListener>)>>,
    next_id: AtomicU64,
    commit_lock: Mutex<()>,
}

impl Default for ChangeSupport {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSupport {
    pub fn new() -> Self {
        ChangeSupport {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        write(&self.listeners).push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = write(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        read(&self.listeners).len()
    }

    /// Run the pre-change phase. The first veto stops the phase.
    ///
    /// Vetoes are reported as [`DistError::ChangeRejected`] whatever error the
    /// listener returned.
    pub fn propose(&self, event: &ChangeEvent) -> Result<(), DistError> {
        for listener in self.snapshot() {
            if let Err(err) = listener.pre_change(event) {
                debug!("change on {} vetoed: {err}", event.source);
                return Err(match err {
                    DistError::ChangeRejected { .. } => err,
                    other => DistError::rejected(other.to_string()),
                });
            }
        }
        Ok(())
    }

    /// Run the post-change phase.
    pub fn notify(&self, event: &ChangeEvent) {
        for listener in self.snapshot() {
            listener.post_change(event);
        }
    }

    /// Hold the commit lock, for changes that span several objects and run
    /// `propose`, apply and `notify` themselves.
    pub(crate) fn hold(&self) -> MutexGuard<'_, ()> {
        lock(&self.commit_lock)
    }

    /// Propose `event`, apply the mutation if nobody vetoed, then notify.
    ///
    /// Commits on the same object are serialised.
    pub fn commit<T>(
        &self,
        event: &ChangeEvent,
        apply: impl FnOnce() -> Result<T, DistError>,
    ) -> Result<T, DistError> {
        let _guard = lock(&self.commit_lock);
        self.propose(event)?;
        let out = apply()?;
        trace!("committed {:?} on {}", event.kind, event.source);
        self.notify(event);
        Ok(out)
    }

    // Callbacks run without the registry lock so listeners may add or remove
    // listeners themselves.
    fn snapshot(&self) -> Vec<Arc<dyn ChangeListener>> {
        read(&self.listeners).iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}

/// How a [`Forwarder`] re-expresses a source event on its dependent.
pub(crate) enum ForwardMode {
    /// A sub-distribution's weights changed: the parent's weights changed.
    Weights,
    /// A null model's weights changed: the dependent's null model changed.
    NullModel,
    /// A translated source changed; single-weight payloads are mapped back
    /// into the view's alphabet.
    Translate(Arc<TranslationTable>),
    /// Forward the kind, drop the payload.
    Opaque,
}

/// Listener installed on a source that re-emits its events on a dependent.
pub(crate) struct Forwarder {
    pub(crate) target: Weak<Distribution>,
    pub(crate) mode: ForwardMode,
}

impl Forwarder {
    fn retag(&self, target: DistId, event: &ChangeEvent) -> Option<ChangeEvent> {
        match (&self.mode, event.kind) {
            (ForwardMode::Weights, ChangeKind::Weights) => {
                Some(ChangeEvent::chain(ChangeKind::Weights, target, event))
            }
            (ForwardMode::NullModel, ChangeKind::Weights) => {
                Some(ChangeEvent::chain(ChangeKind::NullModel, target, event))
            }
            (ForwardMode::Weights | ForwardMode::NullModel, ChangeKind::NullModel) => None,
            (ForwardMode::Translate(table), kind) => {
                let mut out = ChangeEvent::chain(kind, target, event);
                let back = |w: &WeightChange| {
                    table.untranslate(&w.symbol).ok().map(|symbol| WeightChange {
                        symbol,
                        weight: w.weight,
                    })
                };
                if let (Some(prev), Some(change)) = (&event.previous, &event.change) {
                    out.previous = back(prev);
                    out.change = back(change);
                }
                Some(out)
            }
            (ForwardMode::Opaque, kind) => Some(ChangeEvent::chain(kind, target, event)),
        }
    }
}

impl ChangeListener for Forwarder {
    fn pre_change(&self, event: &ChangeEvent) -> Result<(), DistError> {
        match self.target.upgrade() {
            Some(target) => match self.retag(target.id(), event) {
                Some(forwarded) => target.changes().propose(&forwarded),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn post_change(&self, event: &ChangeEvent) {
        if let Some(target) = self.target.upgrade()
            && let Some(forwarded) = self.retag(target.id(), event)
        {
            target.changes().notify(&forwarded);
        }
    }
}

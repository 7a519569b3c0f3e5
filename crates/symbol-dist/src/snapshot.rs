//! Serializable weight snapshots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use symbol_core::AtomicSymbol;

use crate::{DistError, Distribution};

/// Every weight of a distribution, keyed by symbol name, in alphabet order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSnapshot {
    pub alphabet: String,
    pub weights: Vec<(String, f64)>,
}

impl Distribution {
    pub fn snapshot(&self) -> Result<WeightSnapshot, DistError> {
        let weights = self
            .weights()?
            .into_iter()
            .map(|(sym, w)| (sym.name(), w))
            .collect();
        Ok(WeightSnapshot {
            alphabet: self.alphabet().name().to_string(),
            weights,
        })
    }

    /// Set every weight named in `snapshot` as one change.
    ///
    /// Symbols the snapshot does not mention keep their weight.
    pub fn apply_snapshot(&self, snapshot: &WeightSnapshot) -> Result<(), DistError> {
        if snapshot.alphabet != self.alphabet().name() {
            return Err(DistError::IncompatibleAlphabet {
                expected: self.alphabet().name().to_string(),
                got: snapshot.alphabet.clone(),
            });
        }
        let by_name: HashMap<String, AtomicSymbol> =
            self.alphabet().iter().map(|s| (s.name(), s)).collect();
        let entries = snapshot
            .weights
            .iter()
            .map(|(name, w)| match by_name.get(name) {
                Some(sym) => Ok((sym.clone(), *w)),
                None => Err(DistError::InvalidSymbol {
                    symbol: name.clone(),
                    alphabet: snapshot.alphabet.clone(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.set_weights_atomic(&entries)
    }
}

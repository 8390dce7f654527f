use std::collections::BTreeMap;

use crate::learner::{portfolio::Portfolio, state::StateKey};

/// The best portfolio observed on arrival at each `(index, state key)` pair.
///
/// Planning replays actions against these snapshots instead of any one trajectory's
/// cash/stock path, so synthesized rewards reflect the best-known way of reaching a state.
/// An entry is replaced only when a strictly higher portfolio value arrives, which makes the
/// stored value non-decreasing over a whole training run.
#[derive(Debug, Clone, Default)]
pub struct BestCaseLedger {
    best: BTreeMap<usize, BTreeMap<StateKey, Portfolio>>,
}

impl BestCaseLedger {
    pub fn observe(&mut self, index: usize, key: StateKey, portfolio: Portfolio) {
        self.best
            .entry(index)
            .or_default()
            .entry(key)
            .and_modify(|stored| {
                if portfolio.value() > stored.value() {
                    *stored = portfolio;
                }
            })
            .or_insert(portfolio);
    }

    pub fn get(&self, index: usize, key: &StateKey) -> Option<Portfolio> {
        self.best.get(&index).and_then(|slot| slot.get(key)).copied()
    }

    pub fn len(&self) -> usize {
        self.best.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tag: f64) -> StateKey {
        StateKey::parse(&format!(
            r#"{{"bb":{tag},"hasCash":true,"hasStock":false}}"#
        ))
        .unwrap()
    }

    fn portfolio(cash: f64) -> Portfolio {
        Portfolio::with_cash(cash)
    }

    #[test]
    fn test_first_observation_is_stored() {
        let mut ledger = BestCaseLedger::default();
        ledger.observe(0, key(0.0), portfolio(100.0));

        assert_eq!(ledger.get(0, &key(0.0)).unwrap().value(), 100.0);
        assert_eq!(ledger.get(1, &key(0.0)), None);
    }

    #[test]
    fn test_only_strict_improvements_replace() {
        let mut ledger = BestCaseLedger::default();
        let k = key(0.0);

        ledger.observe(0, k.clone(), portfolio(100.0));
        ledger.observe(0, k.clone(), portfolio(90.0));
        assert_eq!(ledger.get(0, &k).unwrap().value(), 100.0);

        // Equal value does not replace.
        ledger.observe(0, k.clone(), portfolio(100.0));
        assert_eq!(ledger.get(0, &k).unwrap().cash(), 100.0);

        ledger.observe(0, k.clone(), portfolio(120.0));
        assert_eq!(ledger.get(0, &k).unwrap().value(), 120.0);
    }

    #[test]
    fn test_stored_value_is_monotone_under_random_observations() {
        let mut ledger = BestCaseLedger::default();
        let k = key(0.0);
        let mut last_best = f64::MIN;

        for cash in [50.0, 20.0, 80.0, 10.0, 80.0, 200.0, 150.0] {
            ledger.observe(3, k.clone(), portfolio(cash));
            let stored = ledger.get(3, &k).unwrap().value();
            assert!(stored >= last_best, "best-case value regressed");
            last_best = stored;
        }
        assert_eq!(last_best, 200.0);
    }

    #[test]
    fn test_entries_are_keyed_by_index_and_state() {
        let mut ledger = BestCaseLedger::default();
        ledger.observe(0, key(0.0), portfolio(100.0));
        ledger.observe(1, key(0.0), portfolio(110.0));
        ledger.observe(1, key(1.0), portfolio(120.0));

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.get(1, &key(1.0)).unwrap().value(), 120.0);
    }
}

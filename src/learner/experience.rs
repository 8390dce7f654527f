use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::learner::{action::Action, state::StateKey};

/// The record of real experience: for every episode index, which state keys were departed
/// from and which actions were taken there.
///
/// Grows monotonically with append-only union semantics: re-recording a `(state, action)`
/// pair is a no-op. This is the sampling pool for the planning loop; planning itself never
/// writes here.
#[derive(Debug, Clone, Default)]
pub struct ExperienceLog {
    visits: BTreeMap<usize, BTreeMap<StateKey, BTreeSet<Action>>>,
}

impl ExperienceLog {
    pub fn record(&mut self, index: usize, key: StateKey, action: Action) {
        self.visits
            .entry(index)
            .or_default()
            .entry(key)
            .or_default()
            .insert(action);
    }

    /// Draws one recorded `(index, state key, action)` triple.
    ///
    /// The draw is nested-uniform: uniform over indices, then uniform over the keys recorded
    /// at that index, then uniform over that key's actions. This is NOT uniform over the
    /// flattened triple space; sparsely populated indices and keys are oversampled. The bias
    /// is deliberate contract: it shapes convergence and must stay reproducible.
    pub fn sample(&self, rng: &mut impl Rng) -> Option<(usize, &StateKey, Action)> {
        let (index, states) = pick(&self.visits, rng)?;
        let (key, actions) = pick(states, rng)?;
        let action = *pick_set(actions, rng)?;
        Some((*index, key, action))
    }

    /// Total number of recorded `(index, state, action)` triples.
    pub fn len(&self) -> usize {
        self.visits
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn actions_at(&self, index: usize, key: &StateKey) -> Option<&BTreeSet<Action>> {
        self.visits.get(&index).and_then(|states| states.get(key))
    }
}

fn pick<'a, K, V>(map: &'a BTreeMap<K, V>, rng: &mut impl Rng) -> Option<(&'a K, &'a V)> {
    if map.is_empty() {
        return None;
    }
    map.iter().nth(rng.random_range(0..map.len()))
}

fn pick_set<'a, T>(set: &'a BTreeSet<T>, rng: &mut impl Rng) -> Option<&'a T> {
    if set.is_empty() {
        return None;
    }
    set.iter().nth(rng.random_range(0..set.len()))
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn key(flags: (bool, bool), tag: f64) -> StateKey {
        StateKey::parse(&format!(
            r#"{{"bb":{tag},"hasCash":{},"hasStock":{}}}"#,
            flags.0, flags.1
        ))
        .unwrap()
    }

    #[test]
    fn test_record_union_semantics() {
        let mut log = ExperienceLog::default();
        let k = key((true, false), 0.0);

        log.record(0, k.clone(), Action::Buy);
        log.record(0, k.clone(), Action::Buy);
        log.record(0, k.clone(), Action::Hold);

        assert_eq!(log.len(), 2);
        let actions = log.actions_at(0, &k).unwrap();
        assert!(actions.contains(&Action::Buy) && actions.contains(&Action::Hold));
    }

    #[test]
    fn test_sample_empty_is_none() {
        let log = ExperienceLog::default();
        assert!(log.sample(&mut StdRng::seed_from_u64(1)).is_none());
    }

    #[test]
    fn test_sample_only_returns_recorded_triples() {
        let mut log = ExperienceLog::default();
        let k0 = key((true, false), 0.0);
        let k1 = key((false, true), 1.0);
        log.record(0, k0.clone(), Action::Buy);
        log.record(1, k1.clone(), Action::Sell);
        log.record(1, k1.clone(), Action::Hold);

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let (index, sampled_key, action) = log.sample(&mut rng).unwrap();
            assert!(log.actions_at(index, sampled_key).unwrap().contains(&action));
        }
    }

    #[test]
    fn test_sampling_is_nested_uniform_not_flat() {
        // Index 0 holds a single action, index 1 holds three. Nested-uniform sampling gives
        // index 0 half the draws; flat sampling would give it a quarter.
        let mut log = ExperienceLog::default();
        let k0 = key((true, false), 0.0);
        let k1 = key((true, false), 1.0);
        log.record(0, k0.clone(), Action::Hold);
        log.record(1, k1.clone(), Action::Hold);
        log.record(1, k1.clone(), Action::Buy);
        log.record(1, key((false, true), 1.0), Action::Sell);

        let mut rng = StdRng::seed_from_u64(9);
        let draws = 4000;
        let index0_hits = (0..draws)
            .filter(|_| log.sample(&mut rng).unwrap().0 == 0)
            .count();

        let share = index0_hits as f64 / draws as f64;
        assert!(
            (share - 0.5).abs() < 0.05,
            "index 0 drawn with share {share}, expected ~0.5"
        );
    }

    #[test]
    fn test_sampling_is_reproducible_for_a_fixed_seed() {
        let mut log = ExperienceLog::default();
        log.record(0, key((true, false), 0.0), Action::Buy);
        log.record(1, key((false, true), 1.0), Action::Sell);
        log.record(2, key((false, true), 2.0), Action::Hold);

        let draw = |seed: u64| -> Vec<(usize, Action)> {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..50)
                .map(|_| {
                    let (i, _, a) = log.sample(&mut rng).unwrap();
                    (i, a)
                })
                .collect()
        };

        assert_eq!(draw(3), draw(3));
        assert_ne!(draw(3), draw(4));
    }
}

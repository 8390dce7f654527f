use std::{collections::BTreeMap, fs, path::Path};

use rand::Rng;

use crate::{
    data::domain::{QValue, Reward},
    error::{DynaqResult, IoError, LearnError},
    learner::{action::Action, policy::Policy, state::StateKey},
};

/// Seed ceiling for fresh Q-entries: small enough not to bias greedy selection, large enough
/// to distinguish "untried" from a deliberately learned zero.
const INIT_SCALE: f64 = 1e-9;

/// The tabular action-value function: `(state key, action) → Q`.
///
/// Entries are created lazily via [`ValueTable::initialize`] and never deleted. Both maps are
/// ordered, so iteration (and therefore greedy tie-breaking and export order) is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    entries: BTreeMap<StateKey, BTreeMap<Action, QValue>>,
}

impl ValueTable {
    /// Seeds a Q-entry for every listed action that does not have one yet, drawing
    /// `uniform(0,1) * 1e-9`. Idempotent: existing entries are never overwritten.
    pub fn initialize(&mut self, key: &StateKey, actions: &[Action], rng: &mut impl Rng) {
        let slot = self.entries.entry(key.clone()).or_default();
        for action in actions {
            slot.entry(*action)
                .or_insert_with(|| QValue(rng.random_range(0.0..1.0) * INIT_SCALE));
        }
    }

    /// The Bellman update: `Q[s,a] += α·(r + γ·max_a' Q[s',a'] − Q[s,a])`.
    ///
    /// Both `(s, a)` and at least one entry for `s'` must already be initialized; a miss here
    /// means a state bypassed the canonical initialization path and is fatal.
    pub fn update(
        &mut self,
        key: &StateKey,
        action: Action,
        next_key: &StateKey,
        reward: Reward,
        alpha: f64,
        gamma: f64,
    ) -> DynaqResult<()> {
        let max_next = self.max_value(next_key)?;

        let q = self
            .entries
            .get_mut(key)
            .and_then(|slot| slot.get_mut(&action))
            .ok_or_else(|| LearnError::UninitializedAction {
                key: key.canonical(),
                action: action.to_string(),
            })?;

        q.0 += alpha * (reward.0 + gamma * max_next.0 - q.0);
        Ok(())
    }

    /// The highest estimated value over the state's initialized actions.
    pub fn max_value(&self, key: &StateKey) -> DynaqResult<QValue> {
        self.slot(key)?
            .values()
            .copied()
            .reduce(|best, q| if q.0 > best.0 { q } else { best })
            .ok_or_else(|| LearnError::UninitializedState(key.canonical()).into())
    }

    /// The action attaining [`ValueTable::max_value`]. Ties break toward the first action in
    /// iteration order (the derived `Action` ordering), which is stable but not meaningful.
    pub fn greedy_action(&self, key: &StateKey) -> DynaqResult<Action> {
        self.slot(key)?
            .iter()
            .reduce(|best, candidate| if candidate.1.0 > best.1.0 { candidate } else { best })
            .map(|(action, _)| *action)
            .ok_or_else(|| LearnError::UninitializedState(key.canonical()).into())
    }

    pub fn q_value(&self, key: &StateKey, action: Action) -> Option<QValue> {
        self.entries.get(key).and_then(|slot| slot.get(&action)).copied()
    }

    /// Number of distinct state keys with entries. This is what scales the planning budget.
    pub fn state_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of `(state, action)` entries.
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn contains_state(&self, key: &StateKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn state_keys(&self) -> impl Iterator<Item = &StateKey> {
        self.entries.keys()
    }

    /// The greedy policy over every state with entries, keys in sorted order.
    pub fn export_policy(&self) -> DynaqResult<Policy> {
        let mut choices = BTreeMap::new();
        for key in self.entries.keys() {
            choices.insert(key.clone(), self.greedy_action(key)?);
        }
        Ok(Policy::new(choices))
    }

    /// The full table as a JSON value: `{state_key: {action: value}}`, sorted by key.
    pub fn to_json(&self) -> DynaqResult<serde_json::Value> {
        serde_json::to_value(&self.entries).map_err(|e| IoError::Json(e).into())
    }

    /// Writes [`ValueTable::to_json`] to disk as a pretty-printed artifact.
    pub fn write_json(&self, path: impl AsRef<Path>) -> DynaqResult<()> {
        let rendered =
            serde_json::to_string_pretty(&self.entries).map_err(IoError::Json)?;
        fs::write(path, rendered).map_err(IoError::Io)?;
        Ok(())
    }

    fn slot(&self, key: &StateKey) -> DynaqResult<&BTreeMap<Action, QValue>> {
        self.entries
            .get(key)
            .ok_or_else(|| LearnError::UninitializedState(key.canonical()).into())
    }
}

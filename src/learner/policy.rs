use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{DynaqResult, IoError},
    learner::{action::Action, state::StateKey},
};

/// A frozen greedy policy: `state key → action`, the deployable artifact of a training run.
///
/// Serializes as a flat JSON object whose keys are canonical state-key strings in sorted
/// order, so the exported file is byte-stable for a given table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Policy {
    choices: BTreeMap<StateKey, Action>,
}

impl Policy {
    pub fn new(choices: BTreeMap<StateKey, Action>) -> Self {
        Self { choices }
    }

    pub fn get(&self, key: &StateKey) -> Option<Action> {
        self.choices.get(key).copied()
    }

    /// The action to take in `key`, falling back to `Hold` for states the policy has never
    /// seen. Replay over fresh market data must not fail on novel states.
    pub fn action_for(&self, key: &StateKey) -> Action {
        self.get(key).unwrap_or(Action::Hold)
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, Action)> {
        self.choices.iter().map(|(key, action)| (key, *action))
    }

    /// The feature names this policy's states were built from, taken from the first key.
    /// Every key shares one schema, so one key is enough. `None` for an empty policy.
    pub fn feature_names(&self) -> Option<BTreeSet<String>> {
        self.choices
            .keys()
            .next()
            .map(|key| key.feature_names().map(str::to_string).collect())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> DynaqResult<()> {
        let rendered = serde_json::to_string_pretty(self).map_err(IoError::Json)?;
        fs::write(path, rendered).map_err(IoError::Io)?;
        Ok(())
    }

    pub fn read_json(path: impl AsRef<Path>) -> DynaqResult<Self> {
        let raw = fs::read_to_string(path).map_err(IoError::Io)?;
        let policy = serde_json::from_str(&raw).map_err(IoError::Json)?;
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(bb: f64, has_cash: bool) -> StateKey {
        StateKey::parse(&format!(
            r#"{{"bb":{bb},"hasCash":{has_cash},"hasStock":{}}}"#,
            !has_cash
        ))
        .unwrap()
    }

    fn sample_policy() -> Policy {
        let mut choices = BTreeMap::new();
        choices.insert(key(0.5, true), Action::Buy);
        choices.insert(key(1.5, false), Action::Sell);
        Policy::new(choices)
    }

    #[test]
    fn test_lookup_hits_and_misses() {
        let policy = sample_policy();
        assert_eq!(policy.get(&key(0.5, true)), Some(Action::Buy));
        assert_eq!(policy.get(&key(-2.0, true)), None);
    }

    #[test]
    fn test_unknown_state_falls_back_to_hold() {
        let policy = sample_policy();
        assert_eq!(policy.action_for(&key(-2.0, true)), Action::Hold);
        assert_eq!(policy.action_for(&key(1.5, false)), Action::Sell);
    }

    #[test]
    fn test_serializes_as_flat_object_with_canonical_keys() {
        let policy = sample_policy();
        let json = serde_json::to_value(&policy).unwrap();

        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(
            obj.get(r#"{"bb":0.5,"hasCash":true,"hasStock":false}"#)
                .unwrap(),
            "buy"
        );
    }

    #[test]
    fn test_json_round_trip() {
        let policy = sample_policy();
        let raw = serde_json::to_string(&policy).unwrap();
        let back: Policy = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn test_feature_names_reflect_the_key_schema() {
        let policy = sample_policy();
        let names = policy.feature_names().unwrap();
        assert_eq!(names, BTreeSet::from(["bb".to_string()]));

        assert_eq!(Policy::default().feature_names(), None);
    }
}

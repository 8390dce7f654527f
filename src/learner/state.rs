use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::{Map, Value};

use crate::{
    data::{
        domain::FeatureValue,
        table::{FeatureTable, Features},
    },
    error::{DataError, DynaqResult, LearnError},
    learner::action::{Action, LegalActions},
};

/// JSON field names reserved for the position flags inside a canonical state key.
pub const HAS_CASH_KEY: &str = "hasCash";
pub const HAS_STOCK_KEY: &str = "hasStock";

// ================================================================================================
// State
// ================================================================================================

/// One point of an episode: a feature row plus the portfolio position flags.
///
/// States are immutable values. Transitions construct a fresh `State` for the next index;
/// nothing ever mutates a row in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    index: usize,
    features: Features,
    has_cash: bool,
    has_stock: bool,
}

impl State {
    /// The canonical initial state: index 0, all cash, no stock.
    pub fn initial(table: &FeatureTable) -> DynaqResult<Self> {
        let row = table.row(0).ok_or(DataError::EmptyFeatureTable)?;
        Ok(Self {
            index: 0,
            features: row.clone(),
            has_cash: true,
            has_stock: false,
        })
    }

    /// Rebuilds the state a recorded key described, for planning replay.
    pub fn from_key(index: usize, key: &StateKey) -> Self {
        Self {
            index,
            features: key.features.clone(),
            has_cash: key.has_cash,
            has_stock: key.has_stock,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn has_cash(&self) -> bool {
        self.has_cash
    }

    pub fn has_stock(&self) -> bool {
        self.has_stock
    }

    pub fn legal_actions(&self) -> LegalActions {
        Action::legal_for(self.has_cash, self.has_stock)
    }

    pub fn key(&self) -> StateKey {
        StateKey {
            features: self.features.clone(),
            has_cash: self.has_cash,
            has_stock: self.has_stock,
        }
    }

    /// Whether a feature row exists after this one. Must be checked before [`State::next`].
    pub fn has_next(&self, table: &FeatureTable) -> bool {
        self.index + 1 < table.num_states()
    }

    /// The state reached by taking `action` here: the next feature row, with position flags
    /// set by the action (`Buy` → stock, `Sell` → cash, `Hold` → unchanged).
    pub fn next(&self, action: Action, table: &FeatureTable) -> DynaqResult<Self> {
        let row = table
            .row(self.index + 1)
            .ok_or(LearnError::TerminalTransition(self.index))?;

        let (has_cash, has_stock) = match action {
            Action::Buy => (false, true),
            Action::Sell => (true, false),
            Action::Hold => (self.has_cash, self.has_stock),
        };

        Ok(Self {
            index: self.index + 1,
            features: row.clone(),
            has_cash,
            has_stock,
        })
    }
}

// ================================================================================================
// StateKey
// ================================================================================================

/// The canonical identity of an abstract market state: the full feature mapping plus the two
/// position flags, ordered by feature name.
///
/// Two states at different episode indices that share features and flags share a key; that
/// collapsing is what lets value estimates generalize across revisits. The key is structural
/// (`Eq + Ord + Hash` on the sorted pairs) and only rendered to its canonical JSON string at
/// serialization boundaries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey {
    features: Features,
    has_cash: bool,
    has_stock: bool,
}

impl StateKey {
    pub fn has_cash(&self) -> bool {
        self.has_cash
    }

    pub fn has_stock(&self) -> bool {
        self.has_stock
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.names()
    }

    pub fn legal_actions(&self) -> LegalActions {
        Action::legal_for(self.has_cash, self.has_stock)
    }

    /// Renders the key as a JSON object string with sorted keys, e.g.
    /// `{"bb":-0.5,"hasCash":true,"hasStock":false,"momentum":"up"}`.
    pub fn canonical(&self) -> String {
        let mut map = Map::new();
        for (name, value) in self.features.iter() {
            map.insert(name.to_string(), value.as_json());
        }
        map.insert(HAS_CASH_KEY.to_string(), Value::Bool(self.has_cash));
        map.insert(HAS_STOCK_KEY.to_string(), Value::Bool(self.has_stock));
        Value::Object(map).to_string()
    }

    /// Parses a canonical key string back into its structural form.
    pub fn parse(raw: &str) -> DynaqResult<Self> {
        let invalid = |msg: &str| DataError::InvalidStateKey {
            key: raw.to_string(),
            msg: msg.to_string(),
        };

        let mut map: Map<String, Value> =
            serde_json::from_str(raw).map_err(|e| invalid(&e.to_string()))?;

        let flag = |value: Option<Value>, name: &str| match value {
            Some(Value::Bool(b)) => Ok(b),
            _ => Err(invalid(&format!("missing boolean '{name}' flag"))),
        };
        let has_cash = flag(map.remove(HAS_CASH_KEY), HAS_CASH_KEY)?;
        let has_stock = flag(map.remove(HAS_STOCK_KEY), HAS_STOCK_KEY)?;

        let mut pairs = Vec::with_capacity(map.len());
        for (name, value) in map {
            let value = match value {
                Value::Number(n) => {
                    let n = n.as_f64().ok_or_else(|| invalid("non-f64 number"))?;
                    FeatureValue::num(n)
                }
                Value::String(s) => FeatureValue::Text(s),
                _ => return Err(invalid(&format!("unsupported value for '{name}'")).into()),
            };
            pairs.push((name, value));
        }

        Ok(Self {
            features: Features::new(pairs)?,
            has_cash,
            has_stock,
        })
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl Serialize for StateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for StateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        StateKey::parse(&raw).map_err(de::Error::custom)
    }
}

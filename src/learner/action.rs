use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum_macros::{Display, EnumCount, EnumIter, EnumString};

/// The legal action set for a state; never larger than the full action space.
pub type LegalActions = SmallVec<[Action; 3]>;

/// A trading decision against the single tracked asset.
///
/// The derived `Ord` (declaration order) is what breaks greedy-lookup ties in the
/// [`ValueTable`](crate::learner::value_table::ValueTable): deterministic, but
/// implementation-defined.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Convert all cash into whole shares at the current close.
    Buy,
    /// Liquidate the entire stock position at the current close.
    Sell,
    /// Do nothing.
    Hold,
}

impl Action {
    /// The actions legal for a position: `Hold` always, `Buy` only with cash on hand,
    /// `Sell` only with stock on hand.
    pub fn legal_for(has_cash: bool, has_stock: bool) -> LegalActions {
        let mut actions = LegalActions::new();
        actions.push(Action::Hold);
        if has_cash {
            actions.push(Action::Buy);
        }
        if has_stock {
            actions.push(Action::Sell);
        }
        actions
    }
}

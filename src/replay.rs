use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    data::table::{FeatureTable, PriceSeries},
    error::{DataError, DynaqResult, LearnError},
    learner::{action::Action, policy::Policy, portfolio::Portfolio, state::State},
};

/// Replays a frozen [`Policy`] over a market, typically one the policy never trained on.
///
/// Replay is pure execution: no exploration, no learning, no table writes. States the policy
/// has never seen fall back to `Hold` and are counted, not failed.
#[derive(Debug, Clone)]
pub struct MarketReplay {
    features: FeatureTable,
    prices: PriceSeries,
    policy: Policy,
    initial_cash: f64,
}

impl MarketReplay {
    /// Validates that the market and the policy describe the same feature schema before any
    /// step runs. A policy trained on different feature names would silently fall back to
    /// `Hold` on every single step, so the mismatch is rejected up front.
    pub fn new(
        features: FeatureTable,
        prices: PriceSeries,
        policy: Policy,
        initial_cash: f64,
    ) -> DynaqResult<Self> {
        if !initial_cash.is_finite() || initial_cash <= 0.0 {
            return Err(LearnError::InvalidConfig(format!(
                "initial_cash must be positive and finite, got {initial_cash}"
            ))
            .into());
        }
        if features.num_states() != prices.len() {
            return Err(DataError::RowCountMismatch {
                features: features.num_states(),
                prices: prices.len(),
            }
            .into());
        }
        if let Some(policy_names) = policy.feature_names() {
            let market_names: BTreeSet<String> =
                features.feature_names().map(str::to_string).collect();
            if policy_names != market_names {
                return Err(DataError::MetadataMismatch(format!(
                    "policy states use features {policy_names:?}, market rows carry {market_names:?}"
                ))
                .into());
            }
        }

        Ok(Self {
            features,
            prices,
            policy,
            initial_cash,
        })
    }

    /// Walks the market once under the policy, using the same two-step valuation as
    /// training: execute at the departure close, mark to the arrival close.
    #[tracing::instrument(skip(self))]
    pub fn run(&self) -> DynaqResult<ReplayOutcome> {
        let mut portfolio = Portfolio::with_cash(self.initial_cash);
        let mut state = State::initial(&self.features)?;

        let mut equity = vec![portfolio.value()];
        let mut moves = Vec::new();
        let mut policy_misses = 0usize;

        while state.has_next(&self.features) {
            let key = state.key();
            let (action, from_policy) = match self.policy.get(&key) {
                Some(action) => (action, true),
                None => {
                    policy_misses += 1;
                    (Action::Hold, false)
                }
            };

            portfolio.apply(action, self.prices.close(state.index())?);
            let next = state.next(action, &self.features)?;
            portfolio.revalue(self.prices.close(next.index())?);

            moves.push(StepRecord {
                index: state.index(),
                action,
                from_policy,
                value: portfolio.value(),
            });
            equity.push(portfolio.value());
            state = next;
        }

        let final_value = portfolio.value();
        info!(
            final_value,
            steps = moves.len(),
            policy_misses,
            "replay finished"
        );

        Ok(ReplayOutcome {
            initial_value: self.initial_cash,
            final_value,
            total_return: (final_value - self.initial_cash) / self.initial_cash,
            equity,
            moves,
            policy_misses,
        })
    }
}

/// One executed replay step: the action taken at a departure index and the portfolio value
/// after marking to the arrival close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub action: Action,
    /// `false` when the state was unknown and the step fell back to `Hold`.
    pub from_policy: bool,
    pub value: f64,
}

/// The result of one full replay pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayOutcome {
    pub initial_value: f64,
    pub final_value: f64,
    /// Fractional return over the whole pass.
    pub total_return: f64,
    /// Portfolio value per index, starting with the initial cash.
    pub equity: Vec<f64>,
    pub moves: Vec<StepRecord>,
    pub policy_misses: usize,
}

use serde::{Deserialize, Serialize};

use crate::{
    data::domain::{Price, Reward},
    error::{DynaqResult, LearnError},
    learner::action::Action,
};

/// The cash/stock ledger backing one episode (or one planning rollout).
///
/// `value` is derived, never stored stale: it is recomputed from the executing price whenever
/// holdings change and from the arrival price whenever the episode index advances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    cash: f64,
    stock: f64,
    value: f64,
}

impl Portfolio {
    pub fn with_cash(cash: f64) -> Self {
        Self {
            cash,
            stock: 0.0,
            value: cash,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn stock(&self) -> f64 {
        self.stock
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Executes an action at the given close price and revalues the holdings at that same
    /// price. Buying rounds down to whole shares; an unaffordable (or free-priced) buy is a
    /// zero-share no-op, not an error.
    pub fn apply(&mut self, action: Action, price: Price) {
        match action {
            Action::Buy => {
                if price.0 > 0.0 && self.cash >= price.0 {
                    let shares = (self.cash / price.0).floor();
                    self.stock += shares;
                    self.cash -= shares * price.0;
                }
            }
            Action::Sell => {
                self.cash += self.stock * price.0;
                self.stock = 0.0;
            }
            Action::Hold => {}
        }
        self.revalue(price);
    }

    /// Marks the holdings to a new close price, e.g. on arrival at the next index.
    pub fn revalue(&mut self, price: Price) {
        self.value = self.cash + self.stock * price.0;
    }
}

/// The per-step reward: the fractional change in portfolio value.
///
/// A zero previous value makes the reward undefined; with positive initial cash that can only
/// happen through misconfiguration, so it surfaces as a fatal error instead of a NaN reward.
pub fn step_reward(prev_value: f64, new_value: f64) -> DynaqResult<Reward> {
    if prev_value == 0.0 {
        return Err(LearnError::ZeroPortfolioValue.into());
    }
    Ok(Reward((new_value - prev_value) / prev_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_floors_to_whole_shares() {
        let mut portfolio = Portfolio::with_cash(100.0);
        portfolio.apply(Action::Buy, Price(10.0));

        assert_eq!(portfolio.stock(), 10.0);
        assert_eq!(portfolio.cash(), 0.0);
        assert_eq!(portfolio.value(), 100.0);
    }

    #[test]
    fn test_buy_keeps_remainder_cash() {
        let mut portfolio = Portfolio::with_cash(25.0);
        portfolio.apply(Action::Buy, Price(10.0));

        assert_eq!(portfolio.stock(), 2.0);
        assert_eq!(portfolio.cash(), 5.0);
        assert_eq!(portfolio.value(), 25.0);
    }

    #[test]
    fn test_unaffordable_buy_is_a_no_op() {
        let mut portfolio = Portfolio::with_cash(5.0);
        portfolio.apply(Action::Buy, Price(10.0));

        assert_eq!(portfolio.stock(), 0.0);
        assert_eq!(portfolio.cash(), 5.0);
    }

    #[test]
    fn test_zero_price_buy_is_a_no_op() {
        let mut portfolio = Portfolio::with_cash(100.0);
        portfolio.apply(Action::Buy, Price(0.0));

        assert_eq!(portfolio.stock(), 0.0);
        assert_eq!(portfolio.cash(), 100.0);
    }

    #[test]
    fn test_sell_liquidates_everything() {
        let mut portfolio = Portfolio::with_cash(100.0);
        portfolio.apply(Action::Buy, Price(10.0));
        portfolio.apply(Action::Sell, Price(12.0));

        assert_eq!(portfolio.stock(), 0.0);
        assert_eq!(portfolio.cash(), 120.0);
        assert_eq!(portfolio.value(), 120.0);
    }

    #[test]
    fn test_hold_only_revalues() {
        let mut portfolio = Portfolio::with_cash(100.0);
        portfolio.apply(Action::Buy, Price(10.0));
        portfolio.apply(Action::Hold, Price(11.0));

        assert_eq!(portfolio.stock(), 10.0);
        assert_eq!(portfolio.value(), 110.0);
    }

    #[test]
    fn test_reward_is_the_fractional_value_change() {
        // Buy at 10 with 100 cash, revalue at 12: reward is (120 - 100) / 100 = 0.20.
        let mut portfolio = Portfolio::with_cash(100.0);
        let prev_value = portfolio.value();
        portfolio.apply(Action::Buy, Price(10.0));
        portfolio.revalue(Price(12.0));

        let reward = step_reward(prev_value, portfolio.value()).unwrap();
        assert!((reward.0 - 0.20).abs() < 1e-12);
    }

    #[test]
    fn test_reward_zero_denominator_is_fatal() {
        assert!(step_reward(0.0, 10.0).is_err());
    }
}

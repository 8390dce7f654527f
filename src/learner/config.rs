use serde::{Deserialize, Serialize};

use crate::error::{DynaqResult, LearnError};

/// Hyperparameters for a training run.
///
/// Defaults mirror a conservative tabular setup: high learning rate and discount, a 10%
/// exploration rate, and a deliberately small bankroll so whole-share buys stay coarse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Learning rate α of the Bellman update.
    pub alpha: f64,
    /// Discount factor γ.
    pub gamma: f64,
    /// Probability of exploring (picking uniformly among the non-greedy legal actions).
    pub p_explore: f64,
    /// Starting cash of every episode. Must be positive: a zero-value portfolio makes the
    /// fractional-return reward undefined.
    pub initial_cash: f64,
    /// Seed for the single RNG behind exploration draws, Q-seeding, and planning samples.
    /// A fixed seed reproduces the exact training trajectory.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            alpha: 0.9,
            gamma: 0.9,
            p_explore: 0.1,
            initial_cash: 5.0,
            seed: 0,
        }
    }
}

impl TrainConfig {
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    pub fn with_gamma(self, gamma: f64) -> Self {
        Self { gamma, ..self }
    }

    pub fn with_p_explore(self, p_explore: f64) -> Self {
        Self { p_explore, ..self }
    }

    pub fn with_initial_cash(self, initial_cash: f64) -> Self {
        Self {
            initial_cash,
            ..self
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    pub fn validate(&self) -> DynaqResult<()> {
        let unit_bounded = [
            ("alpha", self.alpha),
            ("gamma", self.gamma),
            ("p_explore", self.p_explore),
        ];
        for (name, value) in unit_bounded {
            if !(0.0..=1.0).contains(&value) {
                return Err(LearnError::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {value}"
                ))
                .into());
            }
        }
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(LearnError::InvalidConfig(format!(
                "initial_cash must be positive and finite, got {}",
                self.initial_cash
            ))
            .into());
        }
        Ok(())
    }
}

pub mod data;
pub mod error;
pub mod features;
pub mod learner;
mod macros;
pub mod replay;

pub use data::{
    domain::{FeatureValue, Price, QValue, Reward},
    table::{FeatureTable, Features, PriceSeries},
};
pub use error::{DataError, DynaqError, DynaqResult, LearnError};
pub use features::builder::StateRecipe;
pub use learner::{action::Action, config::TrainConfig, policy::Policy, trainer::Trainer};
pub use replay::{MarketReplay, ReplayOutcome};

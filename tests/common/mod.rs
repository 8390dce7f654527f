use dynaq::{PriceSeries, StateRecipe, TrainConfig};

/// A deterministic oscillating series with a mild upward drift, long enough to survive
/// indicator warmup with room to trade.
pub fn setup_prices(len: usize) -> PriceSeries {
    let closes = (0..len).map(|i| {
        let t = i as f64;
        100.0 + 0.05 * t + 5.0 * (t / 3.0).sin()
    });
    PriceSeries::new(closes).unwrap()
}

pub fn setup_recipe() -> StateRecipe {
    StateRecipe::BollingerZone {
        window: 20,
        momentum_window: 2,
    }
}

pub fn setup_config(seed: u64) -> TrainConfig {
    TrainConfig::default()
        .with_initial_cash(1_000.0)
        .with_seed(seed)
}

pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

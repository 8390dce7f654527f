use serde::{Deserialize, Serialize};

use crate::{
    data::{
        domain::FeatureValue,
        table::{FeatureTable, Features, PriceSeries},
    },
    error::{DataError, DynaqResult},
    features::indicator::{StreamingBollingerZ, StreamingIndicator, StreamingMomentum},
};

/// A named recipe turning a raw close-price series into the discretized feature rows an
/// episode walks over.
///
/// Both recipes emit a `bb` Bollinger feature and a `momentum` direction label; they differ
/// in how the Bollinger signal is bucketed. Rolling indicators need warmup, so the produced
/// table is shorter than the input series; [`StateRecipe::build`] trims the price series to
/// match and returns both, index-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateRecipe {
    /// `bb` = rolling z-score floored to the nearest 0.5 below (a numeric zone).
    BollingerZone {
        window: usize,
        momentum_window: usize,
    },
    /// `bb` = `"1"` above the upper band, `"-1"` below the lower band, `"0"` inside,
    /// with bands at `band_width` standard deviations.
    BollingerBreakout {
        window: usize,
        momentum_window: usize,
        band_width: f64,
    },
}

impl StateRecipe {
    pub fn build(&self, prices: &PriceSeries) -> DynaqResult<(FeatureTable, PriceSeries)> {
        match *self {
            Self::BollingerZone {
                window,
                momentum_window,
            } => build_rows(prices, window, momentum_window, |z| {
                FeatureValue::num((z * 2.0).floor() / 2.0)
            }),
            Self::BollingerBreakout {
                window,
                momentum_window,
                band_width,
            } => build_rows(prices, window, momentum_window, move |z| {
                if z > band_width {
                    FeatureValue::text("1")
                } else if z < -band_width {
                    FeatureValue::text("-1")
                } else {
                    FeatureValue::text("0")
                }
            }),
        }
    }
}

fn build_rows(
    prices: &PriceSeries,
    window: usize,
    momentum_window: usize,
    bucket: impl Fn(f64) -> FeatureValue,
) -> DynaqResult<(FeatureTable, PriceSeries)> {
    let len = prices.len();
    // The std needs at least two samples; momentum needs its lagged close to exist.
    if window < 2 || window > len {
        return Err(DataError::InvalidWindow { window, len }.into());
    }
    if momentum_window == 0 || momentum_window + 1 > len {
        return Err(DataError::InvalidWindow {
            window: momentum_window,
            len,
        }
        .into());
    }

    let mut bollinger = StreamingBollingerZ::new(window);
    let mut momentum = StreamingMomentum::new(momentum_window);

    let mut rows = Vec::new();
    let mut start = None;
    for (index, close) in prices.closes().enumerate() {
        let z = bollinger.update(close);
        let diff = momentum.update(close);
        if let (Some(z), Some(diff)) = (z, diff) {
            start.get_or_insert(index);
            rows.push(Features::new([
                ("bb", bucket(z)),
                ("momentum", momentum_label(diff)),
            ])?);
        }
    }

    // Both indicators are warm by max(window, momentum_window + 1) samples, which the
    // length checks above guarantee fits the series.
    let start = start.ok_or(DataError::InvalidWindow { window, len })?;
    Ok((FeatureTable::new(rows)?, prices.slice_from(start)))
}

fn momentum_label(diff: f64) -> FeatureValue {
    if diff > 0.0 {
        FeatureValue::text("up")
    } else if diff < 0.0 {
        FeatureValue::text("down")
    } else {
        FeatureValue::text("same")
    }
}

use serde::{Deserialize, Serialize};

use crate::{
    data::domain::{FeatureValue, Price},
    error::{DataError, DynaqResult},
};

// ================================================================================================
// Feature Rows
// ================================================================================================

/// One row of named, discretized market features.
///
/// Pairs are held sorted by feature name, which gives every row (and every state key derived
/// from it) a single canonical ordering regardless of construction order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Features(Vec<(String, FeatureValue)>);

impl Features {
    pub fn new<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> DynaqResult<Self>
    where
        N: Into<String>,
        V: Into<FeatureValue>,
    {
        let mut entries: Vec<(String, FeatureValue)> = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for window in entries.windows(2) {
            if window[0].0 == window[1].0 {
                return Err(DataError::DuplicateFeature(window[0].0.clone()).into());
            }
        }
        for (name, value) in &entries {
            if name == crate::learner::state::HAS_CASH_KEY
                || name == crate::learner::state::HAS_STOCK_KEY
            {
                return Err(DataError::ReservedFeature(name.clone()).into());
            }
            if !value.is_finite() {
                return Err(DataError::NonFiniteFeature(name.clone()).into());
            }
        }

        Ok(Self(entries))
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
            .map(|idx| &self.0[idx].1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ================================================================================================
// Input Tables
// ================================================================================================

/// The ordered sequence of feature rows driving an episode; row count equals the number of
/// abstract market states.
///
/// All rows must expose the same feature names. Position flags are NOT part of the table;
/// they belong to [`State`](crate::learner::state::State), which layers them on top of a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureTable {
    rows: Vec<Features>,
}

impl FeatureTable {
    pub fn new(rows: Vec<Features>) -> DynaqResult<Self> {
        let Some(first) = rows.first() else {
            return Err(DataError::EmptyFeatureTable.into());
        };

        let names: Vec<&str> = first.names().collect();
        for (idx, row) in rows.iter().enumerate().skip(1) {
            if row.names().ne(names.iter().copied()) {
                return Err(DataError::InconsistentRow { row: idx }.into());
            }
        }

        Ok(Self { rows })
    }

    pub fn num_states(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<&Features> {
        self.rows.get(index)
    }

    /// Feature names shared by every row, in canonical (sorted) order.
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.rows[0].names()
    }
}

/// The close-price series aligned by index to a [`FeatureTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries(Vec<Price>);

impl PriceSeries {
    pub fn new(closes: impl IntoIterator<Item = f64>) -> DynaqResult<Self> {
        let closes: Vec<Price> = closes.into_iter().map(Price).collect();
        for (index, price) in closes.iter().enumerate() {
            if !price.0.is_finite() || price.0 < 0.0 {
                return Err(DataError::InvalidPrice {
                    index,
                    price: price.0,
                }
                .into());
            }
        }
        Ok(Self(closes))
    }

    pub fn close(&self, index: usize) -> DynaqResult<Price> {
        self.0
            .get(index)
            .copied()
            .ok_or_else(|| DataError::MissingPrice(index).into())
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> {
        self.0.iter().map(|p| p.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The tail of the series starting at `start`, used to keep prices aligned with a
    /// feature table whose warmup rows were trimmed.
    pub fn slice_from(&self, start: usize) -> Self {
        Self(self.0[start.min(self.0.len())..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, f64)]) -> Features {
        Features::new(pairs.iter().map(|(n, v)| (*n, *v))).unwrap()
    }

    // ============================================================================
    // Feature Rows
    // ============================================================================

    #[test]
    fn test_features_sorted_regardless_of_insertion_order() {
        let a = row(&[("momentum", 1.0), ("bb", -0.5)]);
        let b = row(&[("bb", -0.5), ("momentum", 1.0)]);

        assert_eq!(a, b);
        assert_eq!(a.names().collect::<Vec<_>>(), vec!["bb", "momentum"]);
    }

    #[test]
    fn test_features_reject_duplicates_and_non_finite() {
        let dup = Features::new([("bb", 1.0), ("bb", 2.0)]);
        assert!(dup.is_err());

        let nan = Features::new([("bb", f64::NAN)]);
        assert!(nan.is_err());
    }

    #[test]
    fn test_features_reject_reserved_flag_names() {
        assert!(Features::new([("hasCash", 1.0)]).is_err());
        assert!(Features::new([("hasStock", 0.0)]).is_err());
    }

    #[test]
    fn test_features_get() {
        let features = row(&[("bb", -0.5), ("momentum", 2.0)]);
        assert_eq!(features.get("bb"), Some(&FeatureValue::num(-0.5)));
        assert_eq!(features.get("missing"), None);
    }

    // ============================================================================
    // Tables
    // ============================================================================

    #[test]
    fn test_feature_table_rejects_empty() {
        assert!(FeatureTable::new(Vec::new()).is_err());
    }

    #[test]
    fn test_feature_table_rejects_inconsistent_rows() {
        let rows = vec![row(&[("bb", 0.0)]), row(&[("momentum", 0.0)])];
        assert!(FeatureTable::new(rows).is_err());
    }

    #[test]
    fn test_price_series_rejects_negative_and_nan() {
        assert!(PriceSeries::new([10.0, -1.0]).is_err());
        assert!(PriceSeries::new([10.0, f64::NAN]).is_err());
        assert!(PriceSeries::new([10.0, 0.0]).is_ok());
    }

    #[test]
    fn test_price_series_lookup() {
        let prices = PriceSeries::new([10.0, 12.0, 11.0]).unwrap();
        assert_eq!(prices.close(1).unwrap(), Price(12.0));
        assert!(prices.close(3).is_err());
    }

    #[test]
    fn test_price_series_slice_from() {
        let prices = PriceSeries::new([10.0, 12.0, 11.0]).unwrap();
        let tail = prices.slice_from(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.close(0).unwrap(), Price(12.0));

        // Slicing past the end yields an empty series, not a panic.
        assert!(prices.slice_from(9).is_empty());
    }
}

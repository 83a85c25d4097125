//! Appliance fee schedule

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Appliance key to fee, one table per term
///
/// Keys absent from the table are free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeTable(BTreeMap<String, u64>);

impl FeeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fee for one appliance key (0 when not listed)
    pub fn fee(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, fee: u64) {
        self.0.insert(key.into(), fee);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(key, fee)| (key.as_str(), *fee))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of the selected appliance fees plus the "other appliances" override
    ///
    /// Unknown keys contribute 0. The override counts only when it parses to
    /// a finite, non-negative number (see [`parse_override`]).
    pub fn total_fee(&self, selected: &BTreeSet<String>, other_cost: Option<&str>) -> u64 {
        let appliances = selected.iter().fold(0u64, |total, key| {
            if !self.contains(key) {
                debug!("appliance {key:?} has no fee entry, counted as free");
            }
            total.saturating_add(self.fee(key))
        });

        appliances.saturating_add(other_cost.map(parse_override).unwrap_or(0))
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for FeeTable {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(key, fee)| (key.into(), fee)).collect())
    }
}

/// Largest "other appliances" cost accepted
pub const MAX_OVERRIDE: u64 = 1_000_000_000;

/// Parse the free-text "other appliances" cost
///
/// Surrounding whitespace and `,` thousands separators are accepted and
/// fractions are rounded to the nearest unit. Anything unparseable, negative,
/// non-finite or above [`MAX_OVERRIDE`] is 0.
pub fn parse_override(text: &str) -> u64 {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 && value.round() <= MAX_OVERRIDE as f64 => {
            value.round() as u64
        }
        _ => {
            if !cleaned.is_empty() {
                debug!("ignoring other appliance cost {text:?}");
            }
            0
        }
    }
}

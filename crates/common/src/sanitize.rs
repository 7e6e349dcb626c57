//! Finite-float serialization.
//!
//! Every numeric value leaving the engine must be finite in JSON. Instead of
//! walking serialized trees after the fact, the record types that can carry
//! non-finite floats ([`Channel`], and `Option<f64>` fields built with
//! [`finite`]) encode the policy directly in their `Serialize` impls.

use std::collections::BTreeMap;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// Map a possibly non-finite float to its JSON-safe form. NaN and ±∞ become
/// `None`, which serde writes as null.
pub fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// One indicator channel, index-aligned with the bar series. Holes
/// (insufficient lookback, guarded divisions) are NaN in memory and null on
/// the wire; length is preserved either way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel(pub Vec<f64>);

impl Channel {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f64>> for Channel {
    fn from(values: Vec<f64>) -> Self {
        Channel(values)
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for &v in &self.0 {
            seq.serialize_element(&finite(v))?;
        }
        seq.end()
    }
}

/// Named indicator channels for one strategy run. BTreeMap keeps wire order
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorSeries(pub BTreeMap<&'static str, Channel>);

impl IndicatorSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, values: Vec<f64>) {
        self.0.insert(name, Channel(values));
    }

    pub fn single(name: &'static str, values: Vec<f64>) -> Self {
        let mut series = Self::new();
        series.insert(name, values);
        series
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.0.get(name)
    }

    pub fn channels(&self) -> impl Iterator<Item = (&&'static str, &Channel)> {
        self.0.iter()
    }
}

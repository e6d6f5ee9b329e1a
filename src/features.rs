pub mod assemble;
pub mod color;
pub mod texture;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::errors::{ImgFeatError, Result};

pub use assemble::{assemble, match_schema, merge};
pub use color::extract_color_features;
pub use texture::extract_texture_features;

/// Ordered `(name, value)` pairs with unique names.
///
/// Order is insertion order and is part of the contract: models trained on a
/// fixed feature layout read the vector positionally when no schema is given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMap {
    entries: Vec<(String, f64)>,
}

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert or replace. A replaced entry keeps its original position.
    ///
    /// Values are stored as given; [`FeatureMap::check_finite`] rejects
    /// NaN and infinities before a map reaches a predictor.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find_map(|(n, v)| (n == name).then_some(*v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Fails with `InvalidInput` naming the first non-finite feature.
    pub fn check_finite(&self) -> Result<()> {
        match self.entries.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, value)) => Err(ImgFeatError::invalid_input(
                "feature validation",
                format!("feature {} is not finite ({})", name, value),
            )),
            None => Ok(()),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureMap {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

impl Serialize for FeatureMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

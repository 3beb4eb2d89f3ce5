//! Bidirectional name <-> destination index registry.

use std::collections::HashMap;

use crate::types::{Destination, Result, SplitterError};

/// Human-readable names for destination indices.
///
/// Both directions are stored so lookups are O(1) either way. All writes go
/// through [`DestinationRegistry::register`], which keeps the two maps in
/// lockstep: re-registering a name or an index drops its previous pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationRegistry {
    name_to_index: HashMap<String, Destination>,
    index_to_name: HashMap<Destination, String>,
}

impl DestinationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `name` with `index`, replacing any earlier pairing of either.
    pub fn register(&mut self, name: impl Into<String>, index: Destination) {
        let name = name.into();
        if let Some(old_name) = self.index_to_name.remove(&index) {
            self.name_to_index.remove(&old_name);
        }
        if let Some(old_index) = self.name_to_index.remove(&name) {
            self.index_to_name.remove(&old_index);
        }
        self.name_to_index.insert(name.clone(), index);
        self.index_to_name.insert(index, name);
    }

    #[must_use]
    pub fn index_for_name(&self, name: &str) -> Option<Destination> {
        self.name_to_index.get(name).copied()
    }

    #[must_use]
    pub fn name_for_index(&self, index: Destination) -> Option<&str> {
        self.index_to_name.get(&index).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index_to_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index_to_name.is_empty()
    }

    /// Name of `index` for labelling outputs.
    ///
    /// With a non-zero `numerical_shift` the registered name must be an
    /// integer, and the shifted integer is returned (e.g. to number outputs
    /// from 1 instead of 0).
    pub fn display_name(&self, index: Destination, numerical_shift: i32) -> Result<String> {
        let name = self
            .name_for_index(index)
            .ok_or(SplitterError::UnknownDestination { index })?;
        if numerical_shift == 0 {
            return Ok(name.to_string());
        }
        let number: i64 = name
            .trim()
            .parse()
            .map_err(|_| SplitterError::NonNumericName {
                name: name.to_string(),
            })?;
        Ok((number + i64::from(numerical_shift)).to_string())
    }
}

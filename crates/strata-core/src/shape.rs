//! Batch result shaping: turning per-key lookups into sparse, dense, or
//! reduced arrays.
//!
//! A *sparse* result keeps one slot per requested key. Missing keys leave a
//! hole that counts towards [`BatchArray::len`] and reads back as `None` by
//! position, but iteration skips it. A *dense* result has the same slots and
//! iteration visits every one of them. A *reduced* (`Skip`) result only
//! holds the records that were found.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Requested shape of a batch read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayType {
    #[default]
    Sparse,
    Dense,
    Skip,
}

/// Outcome of one lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Present(Value),
    Absent,
}

impl Slot {
    pub fn as_record(&self) -> Option<&Value> {
        match self {
            Slot::Present(record) => Some(record),
            Slot::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Slot::Present(_))
    }
}

impl From<Option<Value>> for Slot {
    fn from(record: Option<Value>) -> Self {
        match record {
            Some(record) => Slot::Present(record),
            None => Slot::Absent,
        }
    }
}

/// The shaped result of a batch read.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchArray {
    shape: ArrayType,
    slots: Vec<Slot>,
}

impl BatchArray {
    /// Shape positional lookup results. `lookups[i]` answers the i-th key.
    pub fn shape(lookups: Vec<Option<Value>>, shape: ArrayType) -> Self {
        let slots = match shape {
            ArrayType::Sparse | ArrayType::Dense => lookups.into_iter().map(Slot::from).collect(),
            ArrayType::Skip => lookups.into_iter().flatten().map(Slot::Present).collect(),
        };
        Self { shape, slots }
    }

    pub fn array_type(&self) -> ArrayType {
        self.shape
    }

    /// Number of positions, holes included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Record at `index`; `None` for holes, absent markers, and out-of-range.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.slots.get(index).and_then(Slot::as_record)
    }

    /// Positional slots, regardless of shape.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Enumerable elements: holes are skipped for sparse arrays, absent
    /// markers are visited for dense ones.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        let skip_holes = self.shape == ArrayType::Sparse;
        self.slots
            .iter()
            .filter(move |slot| !skip_holes || slot.is_present())
    }

    /// Number of elements [`iter`](Self::iter) visits.
    pub fn enumerable_len(&self) -> usize {
        self.iter().count()
    }

    /// Found records only, in request order.
    pub fn records(&self) -> impl Iterator<Item = &Value> {
        self.slots.iter().filter_map(Slot::as_record)
    }

    pub fn into_slots(self) -> Vec<Slot> {
        self.slots
    }

    /// Positional options; holes and absent markers become `None`.
    pub fn into_options(self) -> Vec<Option<Value>> {
        self.slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Present(record) => Some(record),
                Slot::Absent => None,
            })
            .collect()
    }
}

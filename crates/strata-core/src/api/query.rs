//! Single-index range queries.

use std::ops::Bound;

use serde::Deserialize;
use tracing::trace;

use crate::encoding::{encode_key, prefix_successor};
use crate::engine::{Engine, EngineTxn};
use crate::error::{Error, Result};
use crate::key::Key;
use crate::key_range::{KeyRange, KeyRangeSpec};
use crate::types::Record;

use super::transaction::{StoreTxn, decode_primary_key, decode_record};

/// Scan direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    #[serde(alias = "asc", alias = "ASC")]
    Ascending,
    #[serde(alias = "desc", alias = "DESC")]
    Descending,
}

/// A query over the primary key space or one index.
///
/// ```
/// use strata_core::{KeyRange, Order, Query};
///
/// let query = Query::new()
///     .index("basic")
///     .range(KeyRange::only("John".into()))
///     .order(Order::Descending)
///     .limit(10);
/// assert_eq!(query.index_name(), Some("basic"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "QuerySpec")]
pub struct Query {
    index: Option<String>,
    range: Option<KeyRange>,
    order: Order,
    limit: Option<usize>,
    offset: usize,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan this index instead of the primary key space.
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(name.into());
        self
    }

    pub fn range(mut self, range: KeyRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of leading matches to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index.as_deref()
    }

    pub fn key_range(&self) -> Option<&KeyRange> {
        self.range.as_ref()
    }
}

/// Declarative form of a [`Query`], as found in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default, alias = "range")]
    pub key_range: Option<KeyRangeSpec>,
    #[serde(default)]
    pub order: Order,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl TryFrom<QuerySpec> for Query {
    type Error = Error;

    fn try_from(spec: QuerySpec) -> Result<Self> {
        Ok(Self {
            index: spec.index,
            range: spec.key_range.map(KeyRange::try_from).transpose()?,
            order: spec.order,
            limit: spec.limit,
            offset: spec.offset,
        })
    }
}

/// Byte bounds for scanning entries whose leading encoded key lies in
/// `range`. Entries may carry a suffix after the key (index entries append
/// the primary key), so open lower and closed upper bounds step past every
/// entry sharing the bound's prefix.
///
/// Returns `None` when no entry can match.
pub(crate) fn compute_scan_bounds(
    range: Option<&KeyRange>,
) -> Result<Option<(Bound<Vec<u8>>, Bound<Vec<u8>>)>> {
    let Some(range) = range else {
        return Ok(Some((Bound::Unbounded, Bound::Unbounded)));
    };

    let lower = match range.lower() {
        None => Bound::Unbounded,
        Some(key) => {
            let encoded = encode_key(key)?;
            if range.lower_open() {
                match prefix_successor(&encoded) {
                    Some(successor) => Bound::Included(successor),
                    None => return Ok(None),
                }
            } else {
                Bound::Included(encoded)
            }
        }
    };

    let upper = match range.upper() {
        None => Bound::Unbounded,
        Some(key) => {
            let encoded = encode_key(key)?;
            if range.upper_open() {
                Bound::Excluded(encoded)
            } else {
                prefix_successor(&encoded).map_or(Bound::Unbounded, Bound::Excluded)
            }
        }
    };

    Ok(Some((lower, upper)))
}

/// One scan match: the encoded primary key, plus the record bytes when the
/// scan ran over the primary key space.
struct Hit {
    primary_key: Vec<u8>,
    record: Option<Vec<u8>>,
}

impl<E: Engine> StoreTxn<'_, E> {
    /// Records matching `query`, in scan order.
    pub async fn query(&self, query: &Query) -> Result<Vec<Record>> {
        let hits = self.scan_hits(query).await?;
        let mut records = Vec::with_capacity(hits.len());
        for hit in hits {
            let record = match hit.record {
                Some(bytes) => Some(decode_record(&bytes)?),
                None => self.read_record(&hit.primary_key).await?,
            };
            // Index entries always point at a live record within a txn.
            records.extend(record);
        }
        Ok(records)
    }

    /// Primary keys of the records matching `query`, in scan order.
    pub async fn query_keys(&self, query: &Query) -> Result<Vec<Key>> {
        self.scan_hits(query)
            .await?
            .iter()
            .map(|hit| decode_primary_key(&hit.primary_key))
            .collect()
    }

    /// Number of entries `query` visits.
    pub async fn count(&self, query: &Query) -> Result<usize> {
        Ok(self.scan_hits(query).await?.len())
    }

    async fn scan_hits(&self, query: &Query) -> Result<Vec<Hit>> {
        let store = self.store;
        let space = match &query.index {
            Some(name) => store.schema.index_space(&store.indexes.resolve(name)?.name),
            None => store.records_space.clone(),
        };

        let Some((lower, upper)) = compute_scan_bounds(query.range.as_ref())? else {
            return Ok(Vec::new());
        };
        let entries = self
            .txn
            .scan(&space, lower.as_ref().map(Vec::as_slice), upper.as_ref().map(Vec::as_slice))
            .await?;
        trace!(space = %space, entries = entries.len(), "scanned");

        let by_index = query.index.is_some();
        let hits = entries.into_iter().map(|(key, value)| {
            if by_index {
                Hit {
                    primary_key: value,
                    record: None,
                }
            } else {
                Hit {
                    primary_key: key,
                    record: Some(value),
                }
            }
        });

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(match query.order {
            Order::Ascending => hits.skip(query.offset).take(limit).collect(),
            Order::Descending => hits.rev().skip(query.offset).take(limit).collect(),
        })
    }
}

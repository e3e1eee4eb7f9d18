// In-memory vector store
// Named collections of records searched by cosine distance

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, info};

use crate::{RagError, Result};

/// A stored piece of text with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: u64,
    pub value: String,
    pub vector: Vec<f32>,
    /// Optional tag that searches can filter on
    pub product_id: Option<i64>,
}

/// Equality predicate applied before ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Keep records whose `product_id` equals the value; `None` keeps only untagged records
    ProductIdEquals(Option<i64>),
}

impl Filter {
    #[inline]
    pub fn matches(&self, record: &VectorRecord) -> bool {
        match self {
            Self::ProductIdEquals(product_id) => record.product_id == *product_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    pub filter: Option<Filter>,
    pub include_vectors: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            filter: None,
            include_vectors: false,
        }
    }
}

/// Search result from vector similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: u64,
    pub value: String,
    pub product_id: Option<i64>,
    /// Only populated when the search asked for vectors
    pub vector: Option<Vec<f32>>,
    pub distance: f32,
    pub similarity: f32,
}

/// Owner of all collections for one run
#[derive(Debug, Default)]
pub struct VectorStore {
    collections: HashMap<String, Collection>,
}

impl VectorStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the named collection, creating it if needed.
    ///
    /// Asking for an existing collection with a different dimension is an invariant violation.
    #[inline]
    pub fn ensure_collection(&mut self, name: &str, dimension: usize) -> Result<&mut Collection> {
        match self.collections.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                let collection = entry.into_mut();
                if collection.dimension != dimension {
                    return Err(RagError::InvariantViolation(format!(
                        "Collection '{}' has dimension {}, requested {}",
                        name, collection.dimension, dimension
                    )));
                }
                debug!("Collection '{}' already exists", name);
                Ok(collection)
            }
            Entry::Vacant(entry) => {
                info!(
                    "Creating collection '{}' with {} dimensions",
                    name, dimension
                );
                Ok(entry.insert(Collection::new(name, dimension)))
            }
        }
    }

    #[inline]
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }
}

/// Records stored in an arena with an id index on the side
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    dimension: usize,
    records: Vec<VectorRecord>,
    index: HashMap<u64, usize>,
}

impl Collection {
    #[inline]
    pub fn new(name: &str, dimension: usize) -> Self {
        Self {
            name: name.to_string(),
            dimension,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, id: u64) -> Option<&VectorRecord> {
        self.index.get(&id).map(|&slot| &self.records[slot])
    }

    /// Insert a record, replacing any record with the same id
    #[inline]
    pub fn upsert(&mut self, record: VectorRecord) -> Result<()> {
        self.check_vector(&record.vector)?;

        match self.index.get(&record.id) {
            Some(&slot) => {
                debug!("Replacing record {} in '{}'", record.id, self.name);
                self.records[slot] = record;
            }
            None => {
                debug!("Inserting record {} into '{}'", record.id, self.name);
                self.index.insert(record.id, self.records.len());
                self.records.push(record);
            }
        }
        Ok(())
    }

    /// Nearest records to `query` by cosine distance, closest first.
    ///
    /// Equal distances are ordered by ascending id.
    #[inline]
    pub fn search(&self, query: &[f32], options: &SearchOptions) -> Result<Vec<SearchResult>> {
        self.check_vector(query)?;

        if options.top_k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(f32, &VectorRecord)> = self
            .records
            .iter()
            .filter(|record| options.filter.is_none_or(|filter| filter.matches(record)))
            .map(|record| (cosine_distance(query, &record.vector), record))
            .collect();

        ranked.sort_by(|(a_distance, a), (b_distance, b)| {
            a_distance
                .total_cmp(b_distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        ranked.truncate(options.top_k);

        debug!(
            "Search in '{}' returned {} of {} records",
            self.name,
            ranked.len(),
            self.records.len()
        );

        Ok(ranked
            .into_iter()
            .map(|(distance, record)| SearchResult {
                id: record.id,
                value: record.value.clone(),
                product_id: record.product_id,
                vector: options.include_vectors.then(|| record.vector.clone()),
                distance,
                similarity: 1.0 - distance,
            })
            .collect())
    }

    fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(RagError::InvariantViolation(format!(
                "Vector has {} dimensions but collection '{}' expects {}",
                vector.len(),
                self.name,
                self.dimension
            )));
        }
        if let Some(position) = vector.iter().position(|v| !v.is_finite()) {
            return Err(RagError::InvariantViolation(format!(
                "Vector for collection '{}' has a non-finite value at position {}",
                self.name, position
            )));
        }
        Ok(())
    }
}

/// `1 - cos(a, b)`; a zero-length vector is treated as orthogonal to everything.
///
/// Accumulates in `f64` so finite inputs near `f32::MAX` cannot overflow into `NaN`.
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (f64::from(x), f64::from(y)))
        .fold((0.0_f64, 0.0_f64, 0.0_f64), |(dot, na, nb), (x, y)| {
            (x.mul_add(y, dot), x.mul_add(x, na), y.mul_add(y, nb))
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

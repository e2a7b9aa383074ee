//! Splits large ordered collections into size-bounded chunks.
//!
//! Chunk IDs are `<collection>_chunk_<index:03>`. Reassembly orders chunks by
//! the parsed numeric index, so ordering stays correct past index 999 where
//! zero-padded IDs would stop sorting lexicographically.

use crate::config::ChunkingConfig;
use serde_json::Value;
use tracing::debug;

/// One slice of a chunked collection.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub index: usize,
    pub items: Vec<Value>,
}

/// Formats a chunk ID.
pub fn chunk_id(collection: &str, index: usize) -> String {
    format!("{collection}_chunk_{index:03}")
}

/// Parses the index out of a chunk ID belonging to `collection`.
///
/// Returns `None` for IDs of other collections, including ones that merely
/// share a prefix (`transactions_archive_chunk_000` is not a `transactions` chunk).
pub fn parse_chunk_index(collection: &str, id: &str) -> Option<usize> {
    id.strip_prefix(collection)?
        .strip_prefix("_chunk_")?
        .parse()
        .ok()
}

/// Partitions collections according to a [`ChunkingConfig`].
#[derive(Clone, Debug)]
pub struct ChunkSplitter {
    config: ChunkingConfig,
}

impl ChunkSplitter {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Collections at or below the threshold stay inline.
    pub fn should_chunk(&self, len: usize) -> bool {
        len > self.config.chunk_threshold
    }

    /// Average serialized size of the leading sample, in bytes.
    pub fn average_item_size(&self, items: &[Value]) -> f64 {
        let sample_len = items.len().min(self.config.sample_size);
        if sample_len == 0 {
            return 0.0;
        }
        let total: usize = items[..sample_len]
            .iter()
            .map(|item| serde_json::to_vec(item).map(|v| v.len()).unwrap_or(0))
            .sum();
        total as f64 / sample_len as f64
    }

    /// `min(max_items, max(min_items, floor(max_bytes / avg_item_size)))`.
    pub fn items_per_chunk(&self, items: &[Value]) -> usize {
        let avg = self.average_item_size(items);
        if avg <= 0.0 {
            return self.config.max_items_per_chunk;
        }
        let by_size = (self.config.max_chunk_size_bytes as f64 / avg).floor() as usize;
        by_size
            .max(self.config.min_items_per_chunk)
            .min(self.config.max_items_per_chunk)
            .max(1)
    }

    /// Chunks a collection regardless of the threshold.
    ///
    /// An empty collection still yields one empty chunk so the key keeps a
    /// chunk entry downstream.
    pub fn chunk_items(&self, collection: &str, items: &[Value]) -> Vec<Chunk> {
        if items.is_empty() {
            return vec![Chunk {
                id: chunk_id(collection, 0),
                index: 0,
                items: Vec::new(),
            }];
        }

        let per_chunk = self.items_per_chunk(items);
        debug!(
            "chunking {collection}: {} items, {per_chunk} per chunk",
            items.len()
        );

        items
            .chunks(per_chunk)
            .enumerate()
            .map(|(index, slice)| Chunk {
                id: chunk_id(collection, index),
                index,
                items: slice.to_vec(),
            })
            .collect()
    }

    /// Chunks a collection only if it is above the threshold.
    pub fn split(&self, collection: &str, items: &[Value]) -> Vec<Chunk> {
        if !self.should_chunk(items.len()) {
            return Vec::new();
        }
        self.chunk_items(collection, items)
    }
}

/// Concatenates the chunks of `collection` in index order.
///
/// Chunks of other collections are ignored. Missing indices are simply absent
/// from the result.
pub fn reassemble<'a, I>(collection: &str, chunks: I) -> Vec<Value>
where
    I: IntoIterator<Item = (&'a str, &'a [Value])>,
{
    let mut matching: Vec<(usize, &[Value])> = chunks
        .into_iter()
        .filter_map(|(id, items)| parse_chunk_index(collection, id).map(|idx| (idx, items)))
        .collect();
    matching.sort_by_key(|(idx, _)| *idx);

    matching
        .into_iter()
        .flat_map(|(_, items)| items.iter().cloned())
        .collect()
}

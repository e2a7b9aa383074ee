use budgetsync_cloud::chunker::{ChunkSplitter, chunk_id, reassemble};
use budgetsync_cloud::config::ChunkingConfig;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};

fn splitter(threshold: usize, max_items: usize, min_items: usize) -> ChunkSplitter {
    ChunkSplitter::new(ChunkingConfig {
        chunk_threshold: threshold,
        max_items_per_chunk: max_items,
        min_items_per_chunk: min_items,
        ..ChunkingConfig::default()
    })
}

fn items(n: usize) -> Vec<Value> {
    (0..n).map(|i| json!({ "i": i, "payee": "store" })).collect()
}

#[test]
fn default_limits_keep_small_items_in_one_chunk() {
    let s = ChunkSplitter::new(ChunkingConfig::default());
    let chunks = s.split("transactions", &items(250));
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].id, "transactions_chunk_000");
    assert_eq!(chunks[0].items.len(), 250);
}

#[test]
fn collection_at_threshold_is_not_split() {
    let s = ChunkSplitter::new(ChunkingConfig::default());
    assert!(s.split("transactions", &items(100)).is_empty());
    assert_eq!(s.split("transactions", &items(101)).len(), 1);
}

#[test]
fn empty_collection_gets_one_empty_chunk_when_chunked_directly() {
    let s = ChunkSplitter::new(ChunkingConfig::default());
    let chunks = s.chunk_items("payees", &[]);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].id, "payees_chunk_000");
    assert!(chunks[0].items.is_empty());
    assert!(s.split("payees", &[]).is_empty());
}

#[test]
fn large_items_shrink_chunks_down_to_the_floor() {
    let s = ChunkSplitter::new(ChunkingConfig {
        max_chunk_size_bytes: 100 * 1024,
        ..ChunkingConfig::default()
    });
    // ~1 KiB per item: 100 KiB / 1 KiB is about 100 items per chunk.
    let big: Vec<Value> = (0..450).map(|i| json!({ "i": i, "memo": "m".repeat(1000) })).collect();
    let per_chunk = s.items_per_chunk(&big);
    assert_eq!(per_chunk, 100);
    let chunks = s.split("transactions", &big);
    assert_eq!(chunks.len(), 5);
    assert_eq!(chunks[4].items.len(), 50);
}

#[test]
fn reassemble_ignores_other_collections() {
    let a = items(2);
    let b = items(3);
    let out = reassemble(
        "transactions",
        [
            (chunk_id("transactions", 1).as_str(), &b[..]),
            ("bills_chunk_000", &a[..]),
            (chunk_id("transactions", 0).as_str(), &a[..]),
        ],
    );
    let expected: Vec<Value> = a.iter().chain(b.iter()).cloned().collect();
    assert_eq!(out, expected);
}

proptest! {
    #[test]
    fn split_then_reassemble_is_identity(
        len in 0usize..600,
        threshold in 0usize..200,
        max_items in 1usize..120,
    ) {
        let s = splitter(threshold, max_items, 1);
        let original = items(len);
        let chunks = s.split("tx", &original);

        if len <= threshold {
            prop_assert!(chunks.is_empty());
        } else {
            for chunk in &chunks {
                prop_assert!(chunk.items.len() <= max_items);
                prop_assert_eq!(&chunk.id, &chunk_id("tx", chunk.index));
            }
            // Feed chunks back in reverse to show order comes from the IDs.
            let rebuilt = reassemble(
                "tx",
                chunks.iter().rev().map(|c| (c.id.as_str(), c.items.as_slice())),
            );
            prop_assert_eq!(rebuilt, original);
        }
    }

    #[test]
    fn chunk_ids_sort_like_indices_below_one_thousand(a in 0usize..1000, b in 0usize..1000) {
        prop_assert_eq!(chunk_id("tx", a).cmp(&chunk_id("tx", b)), a.cmp(&b));
    }
}

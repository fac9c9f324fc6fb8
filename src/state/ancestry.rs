//! Ancestor skip-index
//!
//! Every connected block at height 2 or above carries a `search_block_id`
//! pointer to the ancestor at [search_height] of its own height. Following
//! skip pointers where they land at-or-above the target height, and parent
//! links otherwise, reaches any ancestor height in O(log n) hops.

use crate::{
    block::{store::BlockStore, BlockId},
    store::IndexerStore,
};
use anyhow::Context;
use std::collections::HashMap;

/// Height targeted by a block's skip pointer
///
/// Undefined below height 2 (too close to genesis to need a shortcut). Odd
/// heights jump between a quarter and half the way back depending on bit 1;
/// even heights drop their lowest set bit above bit 0.
pub fn search_height(height: u32) -> Option<u32> {
    if height < 2 {
        return None;
    }
    Some(if height & 1 == 1 {
        if height & 2 != 0 {
            height >> 1
        } else {
            height - (height >> 2)
        }
    } else {
        let mut bit = 2;
        while height & bit == 0 {
            bit <<= 1;
        }
        height - bit
    })
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    height: Option<u32>,
    prev: Option<BlockId>,
    search: Option<BlockId>,
}

/// Advisory cache of block linkage, scoped to one engine operation
///
/// Entries mirror persisted state and must be [primed](Self::prime) for any
/// block whose linkage changes mid-operation. Dropping the cache at any time
/// is safe: every entry is re-derivable from the store.
#[derive(Debug, Default)]
pub struct AncestryCache {
    entries: HashMap<BlockId, Entry>,
}

impl AncestryCache {
    fn entry(&mut self, store: &IndexerStore, id: BlockId) -> anyhow::Result<Entry> {
        if let Some(entry) = self.entries.get(&id) {
            return Ok(*entry);
        }
        let block = store
            .get_block(id)?
            .with_context(|| format!("ancestry walk reached unknown block {id}"))?;
        let entry = Entry {
            height: block.height,
            prev: block.prev_block_id,
            search: block.search_block_id,
        };
        self.entries.insert(id, entry);
        Ok(entry)
    }

    /// Record fresh linkage for a block updated within the current operation
    pub fn prime(
        &mut self,
        id: BlockId,
        height: Option<u32>,
        prev: Option<BlockId>,
        search: Option<BlockId>,
    ) {
        self.entries.insert(id, Entry { height, prev, search });
    }
}

/// Locate the ancestor of `descendant` at `height`
///
/// Returns `None` when ancestry cannot be determined, i.e. any block along
/// the walk is not yet connected. Callers treat that as "not on this chain
/// yet", never as an error.
pub fn get_block_id_at_height(
    store: &IndexerStore,
    cache: &mut AncestryCache,
    height: u32,
    descendant: BlockId,
) -> anyhow::Result<Option<BlockId>> {
    let mut current = descendant;
    loop {
        let entry = cache.entry(store, current)?;
        let Some(current_height) = entry.height else {
            return Ok(None);
        };
        if current_height == height {
            return Ok(Some(current));
        }
        if current_height < height {
            return Ok(None);
        }
        current = match entry.search {
            Some(search) if search_height(current_height).is_some_and(|sh| sh >= height) => search,
            _ => match entry.prev {
                Some(prev) => prev,
                None => return Ok(None),
            },
        };
    }
}

/// Whether `ancestor` lies on `block`'s own path back to genesis
pub fn is_descended_from(
    store: &IndexerStore,
    cache: &mut AncestryCache,
    block: BlockId,
    ancestor: BlockId,
) -> anyhow::Result<bool> {
    let ancestor_height = match cache.entry(store, ancestor)?.height {
        Some(height) => height,
        None => return Ok(false),
    };
    match cache.entry(store, block)?.height {
        Some(height) if height >= ancestor_height => Ok(get_block_id_at_height(
            store,
            cache,
            ancestor_height,
            block,
        )? == Some(ancestor)),
        _ => Ok(false),
    }
}

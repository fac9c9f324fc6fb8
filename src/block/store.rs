use crate::block::{BlockHash, BlockId, BlockRecord};
use speedb::WriteBatch;

pub trait BlockStore {
    /// Allocate the next block surrogate id
    fn next_block_id(&self) -> anyhow::Result<BlockId>;

    /// Stage a block record and its hash index entry
    fn put_block_batch(
        &self,
        id: BlockId,
        block: &BlockRecord,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()>;

    /// Get a block record by id
    fn get_block(&self, id: BlockId) -> anyhow::Result<Option<BlockRecord>>;

    /// Get a block id by hash
    fn get_block_id(&self, hash: &BlockHash) -> anyhow::Result<Option<BlockId>>;

    /// Get a block record by hash
    fn get_block_by_hash(&self, hash: &BlockHash)
        -> anyhow::Result<Option<(BlockId, BlockRecord)>>;

    /// Stage the full child list of a block (the `block_next` index)
    fn put_block_children_batch(
        &self,
        parent: BlockId,
        children: &[BlockId],
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()>;

    /// Get the stored children of a block
    fn get_block_children(&self, parent: BlockId) -> anyhow::Result<Vec<BlockId>>;

    /// Stage the list of orphans awaiting a parent hash (empty list clears)
    fn put_orphans_waiting_batch(
        &self,
        awaited_parent: &BlockHash,
        orphans: &[BlockId],
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()>;

    /// Get the orphans awaiting a parent hash
    fn get_orphans_waiting(&self, awaited_parent: &BlockHash) -> anyhow::Result<Vec<BlockId>>;
}

use crate::{
    block::BlockId,
    tx::{TxHash, TxId, TxInId, TxInRecord, TxOutRecord, TxRecord},
};
use speedb::WriteBatch;

pub trait TxStore {
    /// Allocate the next transaction surrogate id
    fn next_tx_id(&self) -> anyhow::Result<TxId>;

    /// Allocate the next transaction-input surrogate id
    fn next_txin_id(&self) -> anyhow::Result<TxInId>;

    /// Stage a transaction record and its hash index entry
    fn put_tx_batch(&self, id: TxId, tx: &TxRecord, batch: &mut WriteBatch)
        -> anyhow::Result<()>;

    /// Get a transaction record by id
    fn get_tx(&self, id: TxId) -> anyhow::Result<Option<TxRecord>>;

    /// Get a transaction id by hash
    fn get_tx_id(&self, hash: &TxHash) -> anyhow::Result<Option<TxId>>;

    /// Stage an output of a transaction
    fn put_txout_batch(
        &self,
        tx_id: TxId,
        n: u32,
        txout: &TxOutRecord,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()>;

    /// Get an output by (tx, position)
    fn get_txout(&self, tx_id: TxId, n: u32) -> anyhow::Result<Option<TxOutRecord>>;

    /// Stage an input record
    fn put_txin_batch(
        &self,
        id: TxInId,
        txin: &TxInRecord,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()>;

    /// Get an input record by id
    fn get_txin(&self, id: TxInId) -> anyhow::Result<Option<TxInRecord>>;

    /// Stage the list of blocks containing a transaction
    fn put_tx_blocks_batch(
        &self,
        tx_id: TxId,
        blocks: &[BlockId],
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()>;

    /// Get the blocks containing a transaction
    fn get_tx_blocks(&self, tx_id: TxId) -> anyhow::Result<Vec<BlockId>>;

    /// Stage the inputs waiting on a not-yet-seen prevout transaction
    /// (empty list clears the retry entry)
    fn put_unlinked_txins_batch(
        &self,
        prevout_hash: &TxHash,
        txins: &[TxInId],
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()>;

    /// Get the inputs waiting on a prevout transaction hash
    fn get_unlinked_txins(&self, prevout_hash: &TxHash) -> anyhow::Result<Vec<TxInId>>;

    /// Stage an input-provenance entry: within `block`, `txin` spends an
    /// output created in ancestor block `origin`
    fn put_provenance_batch(
        &self,
        block: BlockId,
        txin: TxInId,
        origin: BlockId,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()>;

    /// Get all recorded input provenance for a block
    fn get_block_provenance(&self, block: BlockId) -> anyhow::Result<Vec<(TxInId, BlockId)>>;
}

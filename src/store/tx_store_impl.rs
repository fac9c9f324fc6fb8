use super::{column_families::ColumnFamilyHelpers, fixed_keys::FixedKeys, IndexerStore};
use crate::{
    block::BlockId,
    store::{provenance_key, txout_key, u64_be_bytes, u64_from_be_bytes},
    tx::{store::TxStore, TxHash, TxId, TxInId, TxInRecord, TxOutRecord, TxRecord},
};
use log::trace;
use speedb::{Direction, IteratorMode, WriteBatch};

impl TxStore for IndexerStore {
    fn next_tx_id(&self) -> anyhow::Result<TxId> {
        self.next_seq(Self::NEXT_TX_ID_KEY)
    }

    fn next_txin_id(&self) -> anyhow::Result<TxInId> {
        self.next_seq(Self::NEXT_TXIN_ID_KEY)
    }

    fn put_tx_batch(
        &self,
        id: TxId,
        tx: &TxRecord,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!("Staging tx {id}: {}", tx.hash);
        self.put_json_batch(self.txs_cf(), &u64_be_bytes(id), tx, batch)?;
        batch.put_cf(self.txs_hash_cf(), tx.hash.0, u64_be_bytes(id));
        Ok(())
    }

    fn get_tx(&self, id: TxId) -> anyhow::Result<Option<TxRecord>> {
        trace!("Getting tx {id}");
        self.get_json(self.txs_cf(), &u64_be_bytes(id))
    }

    fn get_tx_id(&self, hash: &TxHash) -> anyhow::Result<Option<TxId>> {
        trace!("Getting tx id for {hash}");
        self.database
            .get_pinned_cf(self.txs_hash_cf(), hash.0)?
            .map(u64_from_be_bytes)
            .transpose()
    }

    fn put_txout_batch(
        &self,
        tx_id: TxId,
        n: u32,
        txout: &TxOutRecord,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!("Staging txout {tx_id}:{n}");
        self.put_json_batch(self.txouts_cf(), &txout_key(tx_id, n), txout, batch)
    }

    fn get_txout(&self, tx_id: TxId, n: u32) -> anyhow::Result<Option<TxOutRecord>> {
        trace!("Getting txout {tx_id}:{n}");
        self.get_json(self.txouts_cf(), &txout_key(tx_id, n))
    }

    fn put_txin_batch(
        &self,
        id: TxInId,
        txin: &TxInRecord,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!("Staging txin {id}");
        self.put_json_batch(self.txins_cf(), &u64_be_bytes(id), txin, batch)
    }

    fn get_txin(&self, id: TxInId) -> anyhow::Result<Option<TxInRecord>> {
        trace!("Getting txin {id}");
        self.get_json(self.txins_cf(), &u64_be_bytes(id))
    }

    fn put_tx_blocks_batch(
        &self,
        tx_id: TxId,
        blocks: &[BlockId],
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!("Staging blocks containing tx {tx_id}: {blocks:?}");
        self.put_json_batch(self.txs_blocks_cf(), &u64_be_bytes(tx_id), &blocks, batch)
    }

    fn get_tx_blocks(&self, tx_id: TxId) -> anyhow::Result<Vec<BlockId>> {
        trace!("Getting blocks containing tx {tx_id}");
        Ok(self
            .get_json(self.txs_blocks_cf(), &u64_be_bytes(tx_id))?
            .unwrap_or_default())
    }

    fn put_unlinked_txins_batch(
        &self,
        prevout_hash: &TxHash,
        txins: &[TxInId],
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!("Staging unlinked txins waiting on {prevout_hash}: {txins:?}");
        if txins.is_empty() {
            batch.delete_cf(self.txins_unlinked_cf(), prevout_hash.0);
            return Ok(());
        }
        self.put_json_batch(self.txins_unlinked_cf(), &prevout_hash.0, &txins, batch)
    }

    fn get_unlinked_txins(&self, prevout_hash: &TxHash) -> anyhow::Result<Vec<TxInId>> {
        trace!("Getting unlinked txins waiting on {prevout_hash}");
        Ok(self
            .get_json(self.txins_unlinked_cf(), &prevout_hash.0)?
            .unwrap_or_default())
    }

    fn put_provenance_batch(
        &self,
        block: BlockId,
        txin: TxInId,
        origin: BlockId,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!("Staging provenance: block {block} txin {txin} spends from {origin}");
        batch.put_cf(
            self.txins_provenance_cf(),
            provenance_key(block, txin),
            u64_be_bytes(origin),
        );
        Ok(())
    }

    fn get_block_provenance(&self, block: BlockId) -> anyhow::Result<Vec<(TxInId, BlockId)>> {
        trace!("Getting input provenance of block {block}");
        let prefix = u64_be_bytes(block);
        let mut provenance = vec![];
        for entry in self.database.iterator_cf(
            self.txins_provenance_cf(),
            IteratorMode::From(&prefix, Direction::Forward),
        ) {
            let (key, value) = entry?;
            if key[..8] != prefix {
                break;
            }
            provenance.push((u64_from_be_bytes(&key[8..])?, u64_from_be_bytes(&value)?));
        }
        Ok(provenance)
    }
}

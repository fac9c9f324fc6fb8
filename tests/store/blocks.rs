use crate::helpers::setup_new_db_dir;
use pretty_assertions::assert_eq;
use speedb::WriteBatch;
use utxo_indexer::{
    block::{store::BlockStore, BlockHash, BlockHeader, BlockRecord},
    store::IndexerStore,
    tx::{store::TxStore, TxHash},
};

fn test_block(tag: u8) -> BlockRecord {
    BlockRecord {
        hash: BlockHash([tag; 32]),
        header: BlockHeader {
            version: 1,
            prev_hash: BlockHash::GENESIS_PREV,
            merkle_root: TxHash([2; 32]),
            time: 1_000_000,
            bits: 0x1d00ffff,
            nonce: 7,
        },
        num_tx: 0,
        tx_ids: vec![],
        value_in: Some(0),
        value_out: 0,
        value_destroyed: 0,
        height: Some(0),
        prev_block_id: None,
        search_block_id: None,
        cumulative: None,
    }
}

#[test]
fn add_and_get() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("block-store-db")?;
    let db = IndexerStore::new(store_dir.path())?;

    let id = db.next_block_id()?;
    let block = test_block(1);
    let mut batch = WriteBatch::default();
    db.put_block_batch(id, &block, &mut batch)?;
    db.write_batch(batch)?;

    assert_eq!(db.get_block(id)?, Some(block.clone()));
    assert_eq!(db.get_block_id(&block.hash)?, Some(id));
    assert_eq!(db.get_block_by_hash(&block.hash)?, Some((id, block)));
    assert_eq!(db.get_block(id + 1)?, None);
    assert_eq!(db.get_block_id(&BlockHash([9; 32]))?, None);
    Ok(())
}

#[test]
fn children_and_orphan_indices() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("block-store-indices")?;
    let db = IndexerStore::new(store_dir.path())?;

    let mut batch = WriteBatch::default();
    db.put_block_children_batch(1, &[2, 3], &mut batch)?;
    db.put_orphans_waiting_batch(&BlockHash([5; 32]), &[7], &mut batch)?;
    db.write_batch(batch)?;

    assert_eq!(db.get_block_children(1)?, vec![2, 3]);
    assert_eq!(db.get_block_children(2)?, Vec::<u64>::new());
    assert_eq!(db.get_orphans_waiting(&BlockHash([5; 32]))?, vec![7]);

    // an empty list clears the retry entry
    let mut batch = WriteBatch::default();
    db.put_orphans_waiting_batch(&BlockHash([5; 32]), &[], &mut batch)?;
    db.write_batch(batch)?;
    assert!(db.get_orphans_waiting(&BlockHash([5; 32]))?.is_empty());
    Ok(())
}

#[test]
fn sequences_are_independent_and_monotonic() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("block-store-seq")?;
    let db = IndexerStore::new(store_dir.path())?;

    assert_eq!(db.next_block_id()?, 1);
    assert_eq!(db.next_block_id()?, 2);
    assert_eq!(db.next_tx_id()?, 1);
    assert_eq!(db.next_txin_id()?, 1);
    assert_eq!(db.next_block_id()?, 3);
    Ok(())
}

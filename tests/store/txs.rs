use crate::helpers::setup_new_db_dir;
use pretty_assertions::assert_eq;
use speedb::WriteBatch;
use utxo_indexer::{
    store::IndexerStore,
    tx::{store::TxStore, OutPoint, Owner, OwnerKey, TxHash, TxInRecord, TxOutRecord, TxRecord},
};

#[test]
fn add_and_get() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("tx-store-db")?;
    let db = IndexerStore::new(store_dir.path())?;

    let id = db.next_tx_id()?;
    let tx = TxRecord {
        hash: TxHash([3; 32]),
        version: 1,
        locktime: 0,
        num_in: 1,
        num_out: 2,
        txin_ids: vec![1],
        is_coinbase: false,
        value_in: Some(100),
        value_out: 90,
        value_destroyed: 10,
    };
    let txin = TxInRecord {
        tx_id: id,
        index: 0,
        prevout_hash: TxHash([4; 32]),
        prevout_n: 1,
        prevout: Some(OutPoint { tx_id: 9, n: 1 }),
    };
    let txout = TxOutRecord {
        value: 90,
        owner: Owner::Key(OwnerKey([6; 20])),
    };

    let mut batch = WriteBatch::default();
    db.put_tx_batch(id, &tx, &mut batch)?;
    db.put_txin_batch(1, &txin, &mut batch)?;
    db.put_txout_batch(id, 0, &txout, &mut batch)?;
    db.put_tx_blocks_batch(id, &[11], &mut batch)?;
    db.write_batch(batch)?;

    assert_eq!(db.get_tx(id)?, Some(tx.clone()));
    assert_eq!(db.get_tx_id(&tx.hash)?, Some(id));
    assert_eq!(db.get_txin(1)?, Some(txin));
    assert_eq!(db.get_txout(id, 0)?, Some(txout));
    assert_eq!(db.get_txout(id, 1)?, None);
    assert_eq!(db.get_tx_blocks(id)?, vec![11]);
    Ok(())
}

#[test]
fn unlinked_retry_list_clears_when_empty() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("tx-store-unlinked")?;
    let db = IndexerStore::new(store_dir.path())?;

    let hash = TxHash([8; 32]);
    let mut batch = WriteBatch::default();
    db.put_unlinked_txins_batch(&hash, &[4, 5], &mut batch)?;
    db.write_batch(batch)?;
    assert_eq!(db.get_unlinked_txins(&hash)?, vec![4, 5]);

    let mut batch = WriteBatch::default();
    db.put_unlinked_txins_batch(&hash, &[], &mut batch)?;
    db.write_batch(batch)?;
    assert!(db.get_unlinked_txins(&hash)?.is_empty());
    Ok(())
}

#[test]
fn provenance_is_scoped_to_the_block() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("tx-store-provenance")?;
    let db = IndexerStore::new(store_dir.path())?;

    let mut batch = WriteBatch::default();
    db.put_provenance_batch(1, 10, 1, &mut batch)?;
    db.put_provenance_batch(1, 11, 2, &mut batch)?;
    db.put_provenance_batch(2, 12, 1, &mut batch)?;
    db.write_batch(batch)?;

    assert_eq!(db.get_block_provenance(1)?, vec![(10, 1), (11, 2)]);
    assert_eq!(db.get_block_provenance(2)?, vec![(12, 1)]);
    assert_eq!(db.get_block_provenance(3)?, Vec::<(u64, u64)>::new());
    Ok(())
}

use crate::{
    generators::{coinbase, p2pkh_script, TestBlock},
    helpers::{import, setup_new_db_dir, test_state, CHAIN},
};
use pretty_assertions::assert_eq;
use utxo_indexer::{
    block::{store::BlockStore, BlockHash},
    constants::COIN,
    state::ImportError,
    tx::store::TxStore,
};

const REWARD: u64 = 50 * COIN;
const START: i64 = 1_000_000;

#[test]
fn merkle_mismatch_commits_nothing() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("state-rejects-merkle")?;
    let state = test_state(&store_dir)?;

    let genesis = TestBlock::new(BlockHash::GENESIS_PREV, START, vec![coinbase(REWARD, 0)]);
    let g = import(&state, &genesis)?;

    let b1 = TestBlock::new(genesis.hash(), START + 600, vec![coinbase(REWARD, 1)]);
    let mut bytes = b1.encode();
    // flip a byte of the declared merkle root
    bytes[36] ^= 0xff;

    let err = state.import_block(&bytes, &[CHAIN]).unwrap_err();
    assert!(matches!(err, ImportError::InvalidMerkleRoot { .. }));

    // nothing committed: no tx row, no child link, tip untouched
    assert_eq!(state.store.get_tx_id(&b1.txs[0].hash())?, None);
    assert!(state.store.get_block_children(g)?.is_empty());
    assert_eq!(state.get_chain_tip(CHAIN)?, Some(g));

    // the untampered bytes still import
    let b1_id = import(&state, &b1)?;
    assert_eq!(state.get_chain_tip(CHAIN)?, Some(b1_id));
    Ok(())
}

#[test]
fn malformed_bytes_are_rejected() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("state-rejects-malformed")?;
    let state = test_state(&store_dir)?;

    let err = state.import_block(&[0; 40], &[CHAIN]).unwrap_err();
    assert!(matches!(err, ImportError::Malformed(_)));
    Ok(())
}

#[test]
fn output_value_overflow_is_rejected() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("state-rejects-overflow")?;
    let state = test_state(&store_dir)?;

    let genesis = TestBlock::new(BlockHash::GENESIS_PREV, START, vec![coinbase(REWARD, 0)]);
    import(&state, &genesis)?;

    // outputs sum past u64::MAX in a structurally valid block
    let mut cb = coinbase(u64::MAX, 1);
    cb.outputs.push((1, p2pkh_script(0xbb)));
    let block = TestBlock::new(genesis.hash(), START + 600, vec![cb.clone()]);

    let err = state.import_block(&block.encode(), &[CHAIN]).unwrap_err();
    assert!(matches!(err, ImportError::ValueOverflow(_)));
    assert_eq!(state.store.get_tx_id(&cb.hash())?, None);
    Ok(())
}

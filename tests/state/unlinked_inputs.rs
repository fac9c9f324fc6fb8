use crate::{
    generators::{coinbase, op_return_script, p2pkh_script, spend, TestBlock},
    helpers::{import, setup_new_db_dir, test_state, CHAIN},
};
use pretty_assertions::assert_eq;
use utxo_indexer::{
    block::{store::BlockStore, BlockHash},
    constants::COIN,
    stats::Outstanding,
    tx::store::TxStore,
};

const REWARD: u64 = 50 * COIN;
const START: i64 = 1_000_000;

#[test]
fn spend_of_unseen_tx_heals_on_arrival() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("state-unlinked")?;
    let state = test_state(&store_dir)?;

    let genesis = TestBlock::new(BlockHash::GENESIS_PREV, START, vec![coinbase(REWARD, 0)]);
    let cb1 = coinbase(REWARD, 1);
    let t = spend((cb1.hash(), 0), vec![(REWARD, p2pkh_script(0xbb))]);
    let b1 = TestBlock::new(genesis.hash(), START + 600, vec![cb1, t.clone()]);
    let s = spend((t.hash(), 0), vec![(REWARD, p2pkh_script(0xcc))]);
    let x = TestBlock::new(b1.hash(), START + 1200, vec![coinbase(REWARD, 2), s.clone()]);

    import(&state, &genesis)?;

    // the spending block arrives first: its input cannot link yet
    let x_id = import(&state, &x)?;
    let record = state.store.get_block(x_id)?.expect("block stored");
    assert_eq!(record.height, None);
    assert_eq!(record.value_in, None);
    assert_eq!(record.cumulative, None);

    let s_id = state.store.get_tx_id(&s.hash())?.expect("spender indexed");
    let spender = state.store.get_tx(s_id)?.expect("spender stored");
    assert_eq!(spender.value_in, None);
    assert_eq!(state.store.get_unlinked_txins(&t.hash())?, spender.txin_ids);

    // the block holding the spent output arrives: everything back-fills
    let b1_id = import(&state, &b1)?;
    assert!(state.store.get_unlinked_txins(&t.hash())?.is_empty());
    assert_eq!(
        state.store.get_tx(s_id)?.expect("spender stored").value_in,
        Some(REWARD)
    );

    let record = state.store.get_block(x_id)?.expect("block stored");
    assert_eq!(record.height, Some(2));
    assert_eq!(record.prev_block_id, Some(b1_id));
    assert_eq!(record.value_in, Some(REWARD));

    let stats = record.cumulative.expect("stats resolved");
    assert_eq!(stats.outstanding, Outstanding::Known(3 * REWARD));
    let r = REWARD as i128;
    assert_eq!(stats.ss_destroyed, Some(600 * r));
    assert_eq!(stats.total_ss, Some(1800 * r));
    assert_eq!(stats.satoshi_seconds, Some(1200 * r));

    assert_eq!(state.get_chain_tip(CHAIN)?, Some(x_id));
    Ok(())
}

#[test]
fn burn_outputs_reduce_the_outstanding_total() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("state-burn")?;
    let state = test_state(&store_dir)?;

    let genesis = TestBlock::new(BlockHash::GENESIS_PREV, START, vec![coinbase(REWARD, 0)]);
    let cb1 = coinbase(REWARD, 1);
    let t = spend(
        (cb1.hash(), 0),
        vec![(REWARD - 10, p2pkh_script(0xbb)), (10, op_return_script())],
    );
    let b1 = TestBlock::new(genesis.hash(), START + 600, vec![cb1, t.clone()]);

    import(&state, &genesis)?;
    let b1_id = import(&state, &b1)?;

    let record = state.store.get_block(b1_id)?.expect("block stored");
    assert_eq!(record.value_destroyed, 10);
    let stats = record.cumulative.expect("stats resolved");
    assert_eq!(stats.outstanding, Outstanding::Known(2 * REWARD - 10));
    Ok(())
}

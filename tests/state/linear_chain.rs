use crate::{
    generators::{coinbase, TestBlock, TEST_BITS},
    helpers::{import, setup_new_db_dir, test_state, CHAIN},
};
use pretty_assertions::assert_eq;
use utxo_indexer::{
    block::{store::BlockStore, BlockHash},
    canonicity::store::CanonicityStore,
    constants::COIN,
    stats::{work_from_bits, ChainWork, Outstanding},
};

const REWARD: u64 = 50 * COIN;
const START: i64 = 1_000_000;

#[test]
fn five_block_chain_accumulates_work_and_value() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("state-linear")?;
    let state = test_state(&store_dir)?;

    let mut blocks = vec![TestBlock::new(
        BlockHash::GENESIS_PREV,
        START,
        vec![coinbase(REWARD, 0)],
    )];
    for i in 1..5_i64 {
        blocks.push(TestBlock::new(
            blocks[i as usize - 1].hash(),
            START + 600 * i,
            vec![coinbase(REWARD, i as u32)],
        ));
    }

    let mut ids = vec![];
    for block in &blocks {
        ids.push(import(&state, block)?);
    }

    let tip = state.get_chain_tip(CHAIN)?.expect("chain has a tip");
    assert_eq!(tip, ids[4]);

    let stats = state.get_cumulative_stats(tip)?.expect("tip stats resolved");
    assert_eq!(stats.chain_work, Some(ChainWork(work_from_bits(TEST_BITS) * 5u32)));
    assert_eq!(stats.total_seconds, Some(2400));
    assert_eq!(stats.outstanding, Outstanding::Known(5 * REWARD));

    // the outstanding total integrated over each 600 second interval
    let expected_ss: i128 = (1..5).map(|i| i as i128 * REWARD as i128 * 600).sum();
    assert_eq!(stats.total_ss, Some(expected_ss));
    assert_eq!(stats.satoshi_seconds, Some(expected_ss));

    for (height, id) in ids.iter().enumerate() {
        assert!(state.is_in_best_chain(CHAIN, *id)?);
        assert_eq!(
            state
                .store
                .get_canonical_block_at_height(CHAIN, height as u32)?,
            Some(*id)
        );
    }
    Ok(())
}

#[test]
fn outstanding_value_is_conserved_along_the_path() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("state-conservation")?;
    let state = test_state(&store_dir)?;

    let mut previous = TestBlock::new(BlockHash::GENESIS_PREV, START, vec![coinbase(REWARD, 0)]);
    let mut ids = vec![import(&state, &previous)?];
    for i in 1..8_i64 {
        let block = TestBlock::new(
            previous.hash(),
            START + 600 * i,
            vec![coinbase(REWARD, i as u32)],
        );
        ids.push(import(&state, &block)?);
        previous = block;
    }

    for (i, id) in ids.iter().enumerate() {
        let block = state.store.get_block(*id)?.expect("block exists");
        assert_eq!(block.height, Some(i as u32));
        let stats = block.cumulative.expect("stats resolved");
        assert_eq!(stats.outstanding, Outstanding::Known((i as u64 + 1) * REWARD));
    }
    Ok(())
}

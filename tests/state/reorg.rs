use crate::{
    generators::{coinbase, TestBlock},
    helpers::{import, setup_new_db_dir, test_state, CHAIN},
};
use pretty_assertions::assert_eq;
use utxo_indexer::{block::BlockHash, canonicity::store::CanonicityStore, constants::COIN};

const REWARD: u64 = 50 * COIN;
const START: i64 = 1_000_000;

#[test]
fn heavier_branch_displaces_the_tip() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("state-reorg")?;
    let state = test_state(&store_dir)?;

    let genesis = TestBlock::new(BlockHash::GENESIS_PREV, START, vec![coinbase(REWARD, 0)]);
    let a1 = TestBlock::new(genesis.hash(), START + 600, vec![coinbase(REWARD, 1)]);
    let a2 = TestBlock::new(a1.hash(), START + 1200, vec![coinbase(REWARD, 2)]);
    let b1 = TestBlock::new(genesis.hash(), START + 600, vec![coinbase(REWARD, 10)]);
    let b2 = TestBlock::new(b1.hash(), START + 1200, vec![coinbase(REWARD, 11)]);
    let b3 = TestBlock::new(b2.hash(), START + 1800, vec![coinbase(REWARD, 12)]);

    let g = import(&state, &genesis)?;
    let a1_id = import(&state, &a1)?;
    let a2_id = import(&state, &a2)?;
    assert_eq!(state.get_chain_tip(CHAIN)?, Some(a2_id));

    // one block behind, then tied on work: the existing tip holds
    let b1_id = import(&state, &b1)?;
    assert_eq!(state.get_chain_tip(CHAIN)?, Some(a2_id));
    let b2_id = import(&state, &b2)?;
    assert_eq!(state.get_chain_tip(CHAIN)?, Some(a2_id));

    // strictly more work: reorg
    let b3_id = import(&state, &b3)?;
    assert_eq!(state.get_chain_tip(CHAIN)?, Some(b3_id));

    for id in [g, b1_id, b2_id, b3_id] {
        assert!(state.is_in_best_chain(CHAIN, id)?);
    }
    for id in [a1_id, a2_id] {
        assert!(!state.is_in_best_chain(CHAIN, id)?);
    }

    assert_eq!(state.store.get_canonical_block_at_height(CHAIN, 0)?, Some(g));
    assert_eq!(state.store.get_canonical_block_at_height(CHAIN, 1)?, Some(b1_id));
    assert_eq!(state.store.get_canonical_block_at_height(CHAIN, 2)?, Some(b2_id));
    assert_eq!(state.store.get_canonical_block_at_height(CHAIN, 3)?, Some(b3_id));
    Ok(())
}

#[test]
fn reorg_back_to_the_original_branch() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("state-reorg-back")?;
    let state = test_state(&store_dir)?;

    let genesis = TestBlock::new(BlockHash::GENESIS_PREV, START, vec![coinbase(REWARD, 0)]);
    let a1 = TestBlock::new(genesis.hash(), START + 600, vec![coinbase(REWARD, 1)]);
    let b1 = TestBlock::new(genesis.hash(), START + 600, vec![coinbase(REWARD, 10)]);
    let b2 = TestBlock::new(b1.hash(), START + 1200, vec![coinbase(REWARD, 11)]);
    let a2 = TestBlock::new(a1.hash(), START + 1200, vec![coinbase(REWARD, 2)]);
    let a3 = TestBlock::new(a2.hash(), START + 1800, vec![coinbase(REWARD, 3)]);

    import(&state, &genesis)?;
    let a1_id = import(&state, &a1)?;
    let b1_id = import(&state, &b1)?;
    let b2_id = import(&state, &b2)?;
    assert_eq!(state.get_chain_tip(CHAIN)?, Some(b2_id));
    assert!(!state.is_in_best_chain(CHAIN, a1_id)?);

    let a2_id = import(&state, &a2)?;
    assert_eq!(state.get_chain_tip(CHAIN)?, Some(b2_id));
    let a3_id = import(&state, &a3)?;
    assert_eq!(state.get_chain_tip(CHAIN)?, Some(a3_id));

    assert!(state.is_in_best_chain(CHAIN, a1_id)?);
    assert!(state.is_in_best_chain(CHAIN, a2_id)?);
    assert!(!state.is_in_best_chain(CHAIN, b1_id)?);
    assert!(!state.is_in_best_chain(CHAIN, b2_id)?);
    assert_eq!(state.store.get_canonical_block_at_height(CHAIN, 3)?, Some(a3_id));
    Ok(())
}

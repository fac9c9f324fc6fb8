use crate::{
    generators::{coinbase, TestBlock},
    helpers::{import, setup_new_db_dir, test_state},
};
use pretty_assertions::assert_eq;
use utxo_indexer::{
    block::{store::BlockStore, BlockHash},
    constants::COIN,
    state::ancestry::{get_block_id_at_height, is_descended_from, search_height, AncestryCache},
};

const REWARD: u64 = 50 * COIN;
const START: i64 = 1_000_000;

#[test]
fn skip_walk_matches_the_parent_walk_at_every_height() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("state-ancestry")?;
    let state = test_state(&store_dir)?;

    let mut blocks = vec![TestBlock::new(
        BlockHash::GENESIS_PREV,
        START,
        vec![coinbase(REWARD, 0)],
    )];
    for i in 1..30_i64 {
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

    // every skip pointer lands exactly at its derived height
    for (height, id) in ids.iter().enumerate() {
        let record = state.store.get_block(*id)?.expect("block exists");
        match search_height(height as u32) {
            Some(target) => assert_eq!(record.search_block_id, Some(ids[target as usize])),
            None => assert_eq!(record.search_block_id, None),
        }
    }

    // the indexed walk agrees with a naive parent walk for every pair
    let mut cache = AncestryCache::default();
    for (height, id) in ids.iter().enumerate() {
        for target in 0..=height {
            assert_eq!(
                get_block_id_at_height(&state.store, &mut cache, target as u32, *id)?,
                Some(ids[target])
            );
        }
    }
    Ok(())
}

#[test]
fn fork_blocks_are_not_ancestors_of_the_other_branch() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("state-ancestry-fork")?;
    let state = test_state(&store_dir)?;

    let genesis = TestBlock::new(BlockHash::GENESIS_PREV, START, vec![coinbase(REWARD, 0)]);
    let a1 = TestBlock::new(genesis.hash(), START + 600, vec![coinbase(REWARD, 1)]);
    let a2 = TestBlock::new(a1.hash(), START + 1200, vec![coinbase(REWARD, 2)]);
    let b1 = TestBlock::new(genesis.hash(), START + 600, vec![coinbase(REWARD, 10)]);

    let g = import(&state, &genesis)?;
    let a1_id = import(&state, &a1)?;
    let a2_id = import(&state, &a2)?;
    let b1_id = import(&state, &b1)?;

    let mut cache = AncestryCache::default();
    assert!(is_descended_from(&state.store, &mut cache, a2_id, g)?);
    assert!(is_descended_from(&state.store, &mut cache, a2_id, a1_id)?);
    assert!(!is_descended_from(&state.store, &mut cache, a2_id, b1_id)?);
    assert!(!is_descended_from(&state.store, &mut cache, b1_id, a1_id)?);
    assert_eq!(
        get_block_id_at_height(&state.store, &mut cache, 1, a2_id)?,
        Some(a1_id)
    );
    Ok(())
}

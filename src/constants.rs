// indexer constants

pub const BLOCK_REPORTING_FREQ: u64 = 1000;

// currency constants

pub const COIN: u64 = 100_000_000;
pub const MAINNET_MAGIC: [u8; 4] = [0xf9, 0xbe, 0xb4, 0xd9];
pub const TESTNET_MAGIC: [u8; 4] = [0x0b, 0x11, 0x09, 0x07];
pub const REGTEST_MAGIC: [u8; 4] = [0xfa, 0xbf, 0xb5, 0xda];
pub const MAINNET_ADDRESS_VERSION: u8 = 0x00;
pub const TESTNET_ADDRESS_VERSION: u8 = 0x6f;

// sentinels

/// Declared parent hash of a genesis block
pub const GENESIS_PREV_HASH: [u8; 32] = [0; 32];

/// Prevout hash of a generation (coinbase) input
pub const COINBASE_PREVOUT_HASH: [u8; 32] = [0; 32];

/// Prevout index of a generation (coinbase) input
pub const COINBASE_PREVOUT_N: u32 = u32::MAX;

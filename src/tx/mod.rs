use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{Debug, Display, Formatter};

pub mod store;

pub type TxId = u64;
pub type TxInId = u64;

#[derive(Default, Hash, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

/// Opaque fixed-size key crediting an output to a tracked owner
#[derive(Hash, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct OwnerKey(pub [u8; 20]);

/// Where an output's value goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    /// Credited to a tracked owner
    Key(OwnerKey),
    /// Provably destroyed (contributes to `value_destroyed`)
    Burn,
    /// Not attributable (unparseable script)
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptKind {
    Address,
    Pubkey,
    Multisig,
    ScriptHash,
    Burn,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOwner {
    pub kind: ScriptKind,
    pub owner: Owner,
}

/// Maps a raw output script to a normalized owner identity
///
/// Only the burn/non-burn distinction feeds back into the engine's
/// arithmetic; which owner an output credits never does.
pub trait ScriptResolver: Send + Sync {
    fn resolve_owner(&self, script: &[u8]) -> ResolvedOwner;
}

/// Reference to a stored previous output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_id: TxId,
    pub n: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub hash: TxHash,
    pub version: i32,
    pub locktime: u32,
    pub num_in: u32,
    pub num_out: u32,
    pub txin_ids: Vec<TxInId>,
    pub is_coinbase: bool,

    /// `None` while any input is unlinked (generation inputs count as 0)
    pub value_in: Option<u64>,
    pub value_out: u64,
    pub value_destroyed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInRecord {
    /// Spending transaction
    pub tx_id: TxId,
    /// Position within the spending transaction
    pub index: u32,
    pub prevout_hash: TxHash,
    pub prevout_n: u32,
    /// `None` while the referenced output has not been seen (unlinked)
    pub prevout: Option<OutPoint>,
}

impl TxInRecord {
    /// Whether this is a generation (coinbase) input, which consumes nothing
    pub fn is_generation(&self) -> bool {
        self.prevout_hash.0 == crate::constants::COINBASE_PREVOUT_HASH
            && self.prevout_n == crate::constants::COINBASE_PREVOUT_N
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutRecord {
    pub value: u64,
    pub owner: Owner,
}

impl TxOutRecord {
    pub fn is_burn(&self) -> bool {
        self.owner == Owner::Burn
    }
}

/// Recognizes the standard bitcoin-style output patterns
///
/// Owner keys are 20 bytes: the embedded hash for pay-to-address and
/// pay-to-script-hash outputs, a truncated SHA-256 otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardScriptResolver;

impl StandardScriptResolver {
    fn script_key(script: &[u8]) -> OwnerKey {
        let digest = Sha256::digest(script);
        let mut key = [0; 20];
        key.copy_from_slice(&digest[..20]);
        OwnerKey(key)
    }
}

impl ScriptResolver for StandardScriptResolver {
    fn resolve_owner(&self, script: &[u8]) -> ResolvedOwner {
        // OP_RETURN
        if script.first() == Some(&0x6a) {
            return ResolvedOwner {
                kind: ScriptKind::Burn,
                owner: Owner::Burn,
            };
        }

        // OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
        if script.len() == 25
            && script[..3] == [0x76, 0xa9, 0x14]
            && script[23..] == [0x88, 0xac]
        {
            let mut key = [0; 20];
            key.copy_from_slice(&script[3..23]);
            return ResolvedOwner {
                kind: ScriptKind::Address,
                owner: Owner::Key(OwnerKey(key)),
            };
        }

        // OP_HASH160 <20> OP_EQUAL
        if script.len() == 23 && script[..2] == [0xa9, 0x14] && script[22] == 0x87 {
            let mut key = [0; 20];
            key.copy_from_slice(&script[2..22]);
            return ResolvedOwner {
                kind: ScriptKind::ScriptHash,
                owner: Owner::Key(OwnerKey(key)),
            };
        }

        // <pubkey> OP_CHECKSIG
        if script.last() == Some(&0xac)
            && (script.len() == 35 && script[0] == 33 || script.len() == 67 && script[0] == 65)
        {
            return ResolvedOwner {
                kind: ScriptKind::Pubkey,
                owner: Owner::Key(Self::script_key(&script[1..script.len() - 1])),
            };
        }

        // OP_CHECKMULTISIG-terminated
        if script.last() == Some(&0xae) && script.len() > 1 {
            return ResolvedOwner {
                kind: ScriptKind::Multisig,
                owner: Owner::Key(Self::script_key(script)),
            };
        }

        ResolvedOwner {
            kind: ScriptKind::Unknown,
            owner: Owner::Unknown,
        }
    }
}

impl Display for TxHash {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Debug for TxHash {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "TxHash({self})")
    }
}

impl Debug for OwnerKey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "OwnerKey({})", hex::encode(self.0))
    }
}

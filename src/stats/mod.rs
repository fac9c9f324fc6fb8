//! Pure cumulative-statistics arithmetic
//!
//! No I/O happens here: the engine feeds parent snapshots in and persists the
//! results. All stored quantities are exact integers: chain work is a
//! [BigUint] with well past 256 bits of headroom, and the coin-age integrals
//! are `i128` (signed, since header timestamps may regress).

use num::{bigint::Sign, BigInt, BigUint, One, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display, Formatter};

/// Cumulative proof of work, exact precision
#[derive(Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainWork(pub BigUint);

/// Value outstanding after a block
///
/// `Pending` replaces the original sentinel for "not computable until inputs
/// resolve": the destroyed tally is still recorded so it survives back-fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outstanding {
    Known(u64),
    Pending { destroyed: u64 },
}

/// Cumulative snapshot of a connected block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cumulative {
    pub chain_work: Option<ChainWork>,
    /// Block time minus chain start time
    pub total_seconds: Option<i64>,
    pub outstanding: Outstanding,
    /// Integral of outstanding value over elapsed time
    pub total_ss: Option<i128>,
    /// Running coin-age: created satoshi-seconds minus destroyed
    pub satoshi_seconds: Option<i128>,
    /// This block's own destroyed satoshi-seconds contribution
    pub ss_destroyed: Option<i128>,
}

/// A block's own deltas, inputs to the calculator
#[derive(Debug, Clone)]
pub struct OwnValues {
    pub time: i64,
    pub bits: u32,
    pub value_in: Option<u64>,
    pub value_out: u64,
    pub value_destroyed: u64,
    /// Sum over linked inputs of `prev value * (time - origin block time)`,
    /// `None` while any input's provenance is unresolved
    pub ss_destroyed: Option<i128>,
}

/// Decodes the compact (exponent, mantissa) target encoding, sign-aware
pub fn compact_target(bits: u32) -> BigInt {
    let exponent = (bits >> 24) as i32;
    let mantissa = bits & 0x007f_ffff;
    let negative = bits & 0x0080_0000 != 0;

    let magnitude = if exponent <= 3 {
        BigUint::from(mantissa >> (8 * (3 - exponent)))
    } else {
        BigUint::from(mantissa) << (8 * (exponent - 3) as usize)
    };
    BigInt::from_biguint(if negative { Sign::Minus } else { Sign::Plus }, magnitude)
}

/// Expected hashes represented by one header: `2^256 / (target + 1)`
///
/// Non-positive targets carry no work.
pub fn work_from_bits(bits: u32) -> BigUint {
    let target = compact_target(bits);
    if target.sign() == Sign::Minus {
        return BigUint::zero();
    }
    let target = target.to_biguint().unwrap_or_default();
    (BigUint::one() << 256u32) / (target + 1u32)
}

/// Cumulative snapshot of a genesis block (no parent)
pub fn genesis_cumulative(own: &OwnValues) -> Cumulative {
    let value_in = own.value_in.unwrap_or(0);
    Cumulative {
        chain_work: Some(ChainWork(work_from_bits(own.bits))),
        total_seconds: Some(0),
        outstanding: Outstanding::Known(
            own.value_out
                .saturating_sub(value_in)
                .saturating_sub(own.value_destroyed),
        ),
        total_ss: Some(0),
        satoshi_seconds: Some(0),
        ss_destroyed: Some(0),
    }
}

/// Computes a child block's cumulative snapshot from its parent's
///
/// Any unknown operand propagates as unknown; nothing is fabricated.
pub fn next_cumulative(parent: &Cumulative, parent_time: i64, own: &OwnValues) -> Cumulative {
    let elapsed = own.time - parent_time;

    let chain_work = parent
        .chain_work
        .as_ref()
        .map(|work| ChainWork(&work.0 + work_from_bits(own.bits)));

    let total_seconds = parent.total_seconds.map(|secs| secs + elapsed);

    // satoshi-seconds created over the interval, defined only while the
    // parent's outstanding total is known
    let created = match parent.outstanding {
        Outstanding::Known(satoshis) => Some(satoshis as i128 * elapsed as i128),
        Outstanding::Pending { .. } => None,
    };

    let outstanding = match (parent.outstanding, own.value_in) {
        (Outstanding::Known(satoshis), Some(value_in)) => {
            let total = satoshis as i128 + own.value_out as i128
                - value_in as i128
                - own.value_destroyed as i128;
            u64::try_from(total)
                .map(Outstanding::Known)
                .unwrap_or(Outstanding::Pending {
                    destroyed: own.value_destroyed,
                })
        }
        _ => Outstanding::Pending {
            destroyed: own.value_destroyed,
        },
    };

    let total_ss = match (parent.total_ss, created) {
        (Some(total), Some(created)) => Some(total + created),
        _ => None,
    };

    let satoshi_seconds = match (parent.satoshi_seconds, created, own.ss_destroyed) {
        (Some(ss), Some(created), Some(destroyed)) => Some(ss + created - destroyed),
        _ => None,
    };

    Cumulative {
        chain_work,
        total_seconds,
        outstanding,
        total_ss,
        satoshi_seconds,
        ss_destroyed: own.ss_destroyed,
    }
}

impl Serialize for ChainWork {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_str_radix(16))
    }
}

impl<'de> Deserialize<'de> for ChainWork {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        BigUint::parse_bytes(hex.as_bytes(), 16)
            .map(ChainWork)
            .ok_or_else(|| serde::de::Error::custom("invalid chain work"))
    }
}

impl Display for ChainWork {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0.to_str_radix(16))
    }
}

impl Debug for ChainWork {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "ChainWork({self})")
    }
}

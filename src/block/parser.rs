//! Bitcoin-style wire decoding of raw block bytes
//!
//! The parser is chain-agnostic: it produces structured records plus the raw
//! byte ranges the chain's hashers need ([crate::chain::BlockHasher],
//! [crate::chain::TxHasher]).

use crate::{block::BlockHash, tx::TxHash};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use thiserror::Error;

use super::BlockHeader;

pub const HEADER_LEN: usize = 80;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected end of block data")]
    UnexpectedEof,

    #[error("varint out of range")]
    VarIntOverflow,

    #[error("implausible count {0}")]
    ImplausibleCount(u64),

    #[error("{0} trailing bytes after block")]
    TrailingBytes(usize),
}

/// A structurally decoded block, not yet validated or stored
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub header: BlockHeader,
    /// Serialized header, input to the chain's block hasher
    pub header_bytes: Vec<u8>,
    pub txs: Vec<RawTx>,
}

#[derive(Debug, Clone)]
pub struct RawTx {
    pub version: i32,
    pub locktime: u32,
    pub inputs: Vec<RawTxIn>,
    pub outputs: Vec<RawTxOut>,
    /// Serialized transaction, input to the chain's tx hasher
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RawTxIn {
    pub prevout_hash: TxHash,
    pub prevout_n: u32,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

#[derive(Debug, Clone)]
pub struct RawTxOut {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl RawTxIn {
    /// Whether this is a generation (coinbase) input
    pub fn is_generation(&self) -> bool {
        self.prevout_hash.0 == crate::constants::COINBASE_PREVOUT_HASH
            && self.prevout_n == crate::constants::COINBASE_PREVOUT_N
    }
}

pub fn parse_block(bytes: &[u8]) -> Result<RawBlock, ParseError> {
    let mut cursor = Cursor::new(bytes);
    let header = parse_header(&mut cursor)?;
    let header_bytes = bytes[..HEADER_LEN].to_vec();

    let num_tx = read_varint(&mut cursor)?;
    if num_tx > bytes.len() as u64 {
        return Err(ParseError::ImplausibleCount(num_tx));
    }

    let mut txs = Vec::with_capacity(num_tx as usize);
    for _ in 0..num_tx {
        txs.push(parse_tx(&mut cursor)?);
    }

    let trailing = bytes.len() - cursor.position() as usize;
    if trailing > 0 {
        return Err(ParseError::TrailingBytes(trailing));
    }
    Ok(RawBlock {
        header,
        header_bytes,
        txs,
    })
}

fn parse_header(cursor: &mut Cursor<&[u8]>) -> Result<BlockHeader, ParseError> {
    let version = cursor.read_i32::<LittleEndian>().eof()?;
    let prev_hash = BlockHash(read_hash(cursor)?);
    let merkle_root = TxHash(read_hash(cursor)?);
    let time = cursor.read_u32::<LittleEndian>().eof()? as i64;
    let bits = cursor.read_u32::<LittleEndian>().eof()?;
    let nonce = cursor.read_u32::<LittleEndian>().eof()?;
    Ok(BlockHeader {
        version,
        prev_hash,
        merkle_root,
        time,
        bits,
        nonce,
    })
}

fn parse_tx(cursor: &mut Cursor<&[u8]>) -> Result<RawTx, ParseError> {
    let start = cursor.position() as usize;
    let version = cursor.read_i32::<LittleEndian>().eof()?;

    let num_in = read_varint(cursor)?;
    if num_in > cursor.get_ref().len() as u64 {
        return Err(ParseError::ImplausibleCount(num_in));
    }
    let mut inputs = Vec::with_capacity(num_in as usize);
    for _ in 0..num_in {
        let prevout_hash = TxHash(read_hash(cursor)?);
        let prevout_n = cursor.read_u32::<LittleEndian>().eof()?;
        let script_sig = read_bytes(cursor)?;
        let sequence = cursor.read_u32::<LittleEndian>().eof()?;
        inputs.push(RawTxIn {
            prevout_hash,
            prevout_n,
            script_sig,
            sequence,
        });
    }

    let num_out = read_varint(cursor)?;
    if num_out > cursor.get_ref().len() as u64 {
        return Err(ParseError::ImplausibleCount(num_out));
    }
    let mut outputs = Vec::with_capacity(num_out as usize);
    for _ in 0..num_out {
        let value = cursor.read_u64::<LittleEndian>().eof()?;
        let script_pubkey = read_bytes(cursor)?;
        outputs.push(RawTxOut {
            value,
            script_pubkey,
        });
    }

    let locktime = cursor.read_u32::<LittleEndian>().eof()?;
    let raw = cursor.get_ref()[start..cursor.position() as usize].to_vec();
    Ok(RawTx {
        version,
        locktime,
        inputs,
        outputs,
        raw,
    })
}

pub fn read_varint(cursor: &mut Cursor<&[u8]>) -> Result<u64, ParseError> {
    match cursor.read_u8().eof()? {
        0xff => {
            let n = cursor.read_u64::<LittleEndian>().eof()?;
            if n < 0x1_0000_0000 {
                return Err(ParseError::VarIntOverflow);
            }
            Ok(n)
        }
        0xfe => Ok(cursor.read_u32::<LittleEndian>().eof()? as u64),
        0xfd => Ok(cursor.read_u16::<LittleEndian>().eof()? as u64),
        n => Ok(n as u64),
    }
}

fn read_hash(cursor: &mut Cursor<&[u8]>) -> Result<[u8; 32], ParseError> {
    let mut hash = [0; 32];
    cursor.read_exact(&mut hash).eof()?;
    Ok(hash)
}

fn read_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>, ParseError> {
    let len = read_varint(cursor)?;
    if len > cursor.get_ref().len() as u64 {
        return Err(ParseError::ImplausibleCount(len));
    }
    let mut bytes = vec![0; len as usize];
    cursor.read_exact(&mut bytes).eof()?;
    Ok(bytes)
}

trait EofExt<T> {
    fn eof(self) -> Result<T, ParseError>;
}

impl<T> EofExt<T> for std::io::Result<T> {
    fn eof(self) -> Result<T, ParseError> {
        self.map_err(|_| ParseError::UnexpectedEof)
    }
}
